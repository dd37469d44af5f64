//! Capability resolution
//!
//! Every subsystem (speech synthesis, speech recognition, response
//! generation, face detection, projection, animation) is bound through the
//! same primary-or-fallback pattern: try to construct the real
//! implementation, and on any failure fall back to a safe-degradation
//! implementation that satisfies the same contract. Resolution happens once
//! per binding and is never retried; a reload constructs a fresh binding.

use std::sync::Arc;

use crate::events;

/// Which implementation a binding resolved to
#[derive(Debug, Clone)]
pub enum Selection {
    /// The primary implementation constructed successfully
    Primary,
    /// The primary failed and the fallback is active
    Fallback {
        /// Why the primary was unavailable
        cause: String,
    },
}

/// A resolved pairing of a capability contract and its active implementation
pub struct CapabilityBinding<T: ?Sized> {
    family: &'static str,
    active: Arc<T>,
    selection: Selection,
}

impl<T: ?Sized> CapabilityBinding<T> {
    /// Resolve a binding from an attempted primary construction.
    ///
    /// The fallback must always satisfy the full contract of `T`; it is the
    /// capability's safe-degradation implementation and is assumed never to
    /// fail to construct. Emits a `capability_resolved` event recording the
    /// outcome.
    #[must_use]
    pub fn resolve(
        family: &'static str,
        primary: crate::Result<Arc<T>>,
        fallback: Arc<T>,
    ) -> Self {
        match primary {
            Ok(active) => {
                tracing::info!(family, "capability bound to primary");
                events::capability_resolved(family, false, None);
                Self {
                    family,
                    active,
                    selection: Selection::Primary,
                }
            }
            Err(e) => {
                let cause = e.to_string();
                tracing::warn!(family, error = %cause, "primary unavailable, using fallback");
                events::capability_resolved(family, true, Some(&cause));
                Self {
                    family,
                    active: fallback,
                    selection: Selection::Fallback { cause },
                }
            }
        }
    }

    /// Clone a handle to the active implementation
    #[must_use]
    pub fn active(&self) -> Arc<T> {
        Arc::clone(&self.active)
    }

    /// The capability family this binding covers
    #[must_use]
    pub const fn family(&self) -> &'static str {
        self.family
    }

    /// Whether the fallback implementation is active
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.selection, Selection::Fallback { .. })
    }

    /// How this binding resolved
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }
}

impl<T: ?Sized> std::fmt::Debug for CapabilityBinding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityBinding")
            .field("family", &self.family)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}
