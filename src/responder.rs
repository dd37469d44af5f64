//! Fortune response generation
//!
//! Turns visitor text into a spoken reply. The primary provider routes
//! the question by keyword into one of the persona's fortune categories
//! and fills that category's template with a random detail line. The
//! fallback cycles a fixed set of stock deflections so the character
//! never goes silent.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::Error;
use crate::persona::{FortuneCategory, Persona};

/// Placeholder replaced with a detail line when a template is filled.
const DETAIL_SLOT: &str = "{details}";

/// Lines the fallback provider cycles through.
const STOCK_LINES: [&str; 4] = [
    "The crystal is clouded... ask me once more.",
    "The spirits withhold their answer... try another question.",
    "Something disturbs the veil... say that again, more slowly.",
    "The mists will not part for that... tell me more of what you seek.",
];

/// Produces one spoken reply per visitor utterance.
///
/// Implementations are infallible by contract: a reply is always
/// produced, even if it is a canned line.
pub trait ResponseProvider: Send + Sync {
    /// Compose a reply to the visitor's words.
    fn generate_response(&self, user_text: &str) -> String;

    /// Implementation name for logs and the status report.
    fn name(&self) -> &'static str;
}

/// Primary provider: keyword routing over the persona's fortune tables.
///
/// The visitor's text is lowercased and matched against each keyed
/// category in persona order; the first category with a keyword
/// contained in the text wins. Text matching nothing lands in the
/// catch-all category.
pub struct TemplateOracle {
    keyed: Vec<FortuneCategory>,
    catch_all: FortuneCategory,
    rng: Mutex<StdRng>,
}

impl TemplateOracle {
    /// Build an oracle from the persona's fortune tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the persona defines no fortune categories.
    pub fn new(persona: &Persona) -> crate::Result<Self> {
        Self::with_rng(persona, StdRng::from_entropy())
    }

    /// Build an oracle with a caller-supplied RNG, for deterministic
    /// selection in tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the persona defines no fortune categories.
    pub fn with_rng(persona: &Persona, rng: StdRng) -> crate::Result<Self> {
        let keyed: Vec<FortuneCategory> = persona
            .fortunes
            .iter()
            .filter(|c| !c.keywords.is_empty())
            .cloned()
            .collect();

        // Prefer an explicit catch-all; a persona with only keyed
        // categories reuses its last one for unmatched text.
        let catch_all = persona
            .fortunes
            .iter()
            .find(|c| c.keywords.is_empty())
            .or_else(|| persona.fortunes.last())
            .cloned()
            .ok_or_else(|| Error::Content("persona defines no fortune categories".into()))?;

        Ok(Self {
            keyed,
            catch_all,
            rng: Mutex::new(rng),
        })
    }

    fn route(&self, lowered: &str) -> &FortuneCategory {
        self.keyed
            .iter()
            .find(|c| c.keywords.iter().any(|k| lowered.contains(k.as_str())))
            .unwrap_or(&self.catch_all)
    }
}

impl ResponseProvider for TemplateOracle {
    fn generate_response(&self, user_text: &str) -> String {
        let lowered = user_text.to_lowercase();
        let category = self.route(&lowered);
        tracing::debug!(topic = %category.topic, "routed visitor question");

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        fill(category, &mut *rng)
    }

    fn name(&self) -> &'static str {
        "template-oracle"
    }
}

fn fill<R: Rng + ?Sized>(category: &FortuneCategory, rng: &mut R) -> String {
    match category.details.choose(rng) {
        Some(detail) => category.template.replace(DETAIL_SLOT, detail),
        None => category
            .template
            .replace(DETAIL_SLOT, "")
            .trim_end()
            .to_string(),
    }
}

/// Fallback provider: cycles stock deflections in order.
#[derive(Debug, Default)]
pub struct StockResponder {
    next: AtomicUsize,
}

impl StockResponder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseProvider for StockResponder {
    fn generate_response(&self, _user_text: &str) -> String {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % STOCK_LINES.len();
        STOCK_LINES[index].to_string()
    }

    fn name(&self) -> &'static str {
        "stock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_oracle() -> TemplateOracle {
        TemplateOracle::with_rng(&Persona::default(), StdRng::seed_from_u64(7)).unwrap()
    }

    #[test]
    fn routes_by_keyword() {
        let oracle = seeded_oracle();
        let reply = oracle.generate_response("Will I ever find love?");
        assert!(reply.starts_with("I see matters of the heart..."), "{reply}");

        let reply = oracle.generate_response("tell me about my job");
        assert!(reply.starts_with("The stars turn toward your work..."), "{reply}");
    }

    #[test]
    fn routing_ignores_case() {
        let oracle = seeded_oracle();
        let reply = oracle.generate_response("WHAT ABOUT MY MONEY?");
        assert!(reply.starts_with("Fortune weighs your purse..."), "{reply}");
    }

    #[test]
    fn unmatched_text_lands_in_catch_all() {
        let oracle = seeded_oracle();
        let reply = oracle.generate_response("what color is the sky");
        assert!(reply.starts_with("The crystal shows..."), "{reply}");
    }

    #[test]
    fn reply_carries_one_detail_line() {
        let persona = Persona::default();
        let oracle = TemplateOracle::with_rng(&persona, StdRng::seed_from_u64(1)).unwrap();
        let reply = oracle.generate_response("is there romance ahead");
        let love = &persona.fortunes[0];
        assert!(
            love.details.iter().any(|d| reply.ends_with(d.as_str())),
            "{reply}"
        );
    }

    #[test]
    fn empty_detail_pool_yields_bare_template() {
        let persona = Persona {
            fortunes: vec![FortuneCategory {
                topic: "terse".to_string(),
                keywords: Vec::new(),
                template: "The cards are silent. {details}".to_string(),
                details: Vec::new(),
            }],
            ..Persona::default()
        };
        let oracle = TemplateOracle::with_rng(&persona, StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(oracle.generate_response("anything"), "The cards are silent.");
    }

    #[test]
    fn persona_without_fortunes_is_rejected() {
        let persona = Persona {
            fortunes: Vec::new(),
            ..Persona::default()
        };
        assert!(TemplateOracle::new(&persona).is_err());
    }

    #[test]
    fn keyed_only_persona_reuses_last_category_for_unmatched_text() {
        let persona = Persona {
            fortunes: vec![FortuneCategory {
                topic: "travel".to_string(),
                keywords: vec!["journey".to_string()],
                template: "The road calls... {details}".to_string(),
                details: vec!["pack lightly".to_string()],
            }],
            ..Persona::default()
        };
        let oracle = TemplateOracle::with_rng(&persona, StdRng::seed_from_u64(3)).unwrap();
        let reply = oracle.generate_response("no matching words here");
        assert!(reply.starts_with("The road calls..."), "{reply}");
    }

    #[test]
    fn stock_responder_cycles_in_order() {
        let stock = StockResponder::new();
        let first: Vec<String> = (0..4).map(|_| stock.generate_response("x")).collect();
        assert_eq!(first[0], STOCK_LINES[0]);
        assert_eq!(first[3], STOCK_LINES[3]);
        assert_eq!(stock.generate_response("x"), STOCK_LINES[0]);
    }
}
