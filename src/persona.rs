//! Persona definition for the projected character
//!
//! A persona bundles everything the character says that is not driven by
//! the visitor: the lines it opens and closes a session with, and the
//! fortune material the oracle draws on when composing answers. Personas
//! load from a TOML file; when none is configured, a built-in character
//! is used.

use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// A spoken identity for the projected character.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Persona {
    /// Display name, used as the speaker label in transcripts.
    pub name: String,

    /// Lines spoken when a session opens. One is chosen at random.
    pub greetings: Vec<String>,

    /// Lines spoken when a session ends. One is chosen at random.
    pub farewells: Vec<String>,

    /// Fortune material, routed by keyword. Order matters: the first
    /// category with a matching keyword wins.
    pub fortunes: Vec<FortuneCategory>,
}

/// One themed pool of fortune lines.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FortuneCategory {
    /// Short label used in logs.
    pub topic: String,

    /// Lowercase fragments matched against visitor text. An empty list
    /// marks the catch-all category.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Response template. `{details}` is replaced with one detail line.
    pub template: String,

    /// Interchangeable fragments the template draws from.
    #[serde(default)]
    pub details: Vec<String>,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "Madame Sybil".to_string(),
            greetings: strings(&[
                "Welcome, wanderer... the cards whispered you would come. Sit, and let us look upon your path.",
                "Ah, a visitor... the crystal stirs already. Come closer and ask what you will.",
                "Greetings, child of fortune... I am Madame Sybil, and the veil is thin tonight.",
            ]),
            farewells: strings(&[
                "The veil closes... carry what you have learned, and return when the road darkens.",
                "The crystal dims... your path is your own now. Farewell, seeker.",
                "The spirits grow quiet... go well, and remember that nothing is written in stone.",
            ]),
            fortunes: vec![
                FortuneCategory {
                    topic: "love".to_string(),
                    keywords: strings(&["love", "romance", "relationship", "marriage", "heart"]),
                    template: "I see matters of the heart... {details}".to_string(),
                    details: strings(&[
                        "A stranger will soon cross your path.",
                        "An old flame still thinks of you.",
                        "What you seek is closer than you believe.",
                        "Patience will be repaid twofold.",
                    ]),
                },
                FortuneCategory {
                    topic: "career".to_string(),
                    keywords: strings(&["career", "job", "work", "business"]),
                    template: "The stars turn toward your work... {details}".to_string(),
                    details: strings(&[
                        "An opportunity approaches from an unexpected quarter.",
                        "Your effort has not gone unseen.",
                        "A change of direction will serve you well.",
                        "Trust your own judgment in the days ahead.",
                    ]),
                },
                FortuneCategory {
                    topic: "wealth".to_string(),
                    keywords: strings(&["money", "wealth", "fortune", "gold", "financial"]),
                    template: "Fortune weighs your purse... {details}".to_string(),
                    details: strings(&[
                        "Prosperity gathers slowly but surely.",
                        "An unexpected windfall approaches.",
                        "What you plant now will bear fruit later.",
                        "Generosity returns to the giver in strange ways.",
                    ]),
                },
                FortuneCategory {
                    topic: "general".to_string(),
                    keywords: Vec::new(),
                    template: "The crystal shows... {details}".to_string(),
                    details: strings(&[
                        "The stars lean in your favor.",
                        "A journey will bring more than you expect.",
                        "Watch for the sign you have been waiting for.",
                        "Your path unfolds exactly as it must.",
                    ]),
                },
            ],
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

impl Persona {
    /// Load a persona from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let persona: Self = toml::from_str(&raw)?;
        Ok(persona)
    }

    /// Load a persona from an optional path, falling back to the
    /// built-in character when the path is absent or unreadable.
    #[must_use]
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(path) => match Self::load(path) {
                Ok(persona) => {
                    tracing::info!(path = %path.display(), name = %persona.name, "loaded persona");
                    persona
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to load persona, using built-in character"
                    );
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    /// Pick a greeting line, or `None` if the persona defines none.
    pub fn random_greeting<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.greetings.choose(rng).map(String::as_str)
    }

    /// Pick a farewell line, or `None` if the persona defines none.
    pub fn random_farewell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.farewells.choose(rng).map(String::as_str)
    }
}
