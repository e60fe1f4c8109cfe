//! Base filename derivation for exported artifact pairs.

use serde::Deserialize;

use crate::location::ViewPosition;

/// Default prefix for sequential names (`annotate_1`, `annotate_2`, ...).
pub const DEFAULT_PREFIX: &str = "annotate";

/// How the shared base filename of an export is chosen.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum NamingStrategy {
    /// `<prefix>_<N>`, where N is the export counter.
    Sequential {
        #[serde(default = "default_prefix")]
        prefix: String,
    },
    /// The current view position's values joined by `_`.
    Coordinates,
}

impl Default for NamingStrategy {
    fn default() -> Self {
        Self::Sequential {
            prefix: default_prefix(),
        }
    }
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl NamingStrategy {
    /// Base filename for export number `counter`.
    ///
    /// The coordinates strategy falls back to a sequential name when no view
    /// position is known.
    pub fn basename(&self, counter: u64, view: Option<&ViewPosition>) -> String {
        match (self, view) {
            (NamingStrategy::Sequential { prefix }, _) => format!("{prefix}_{counter}"),
            (NamingStrategy::Coordinates, Some(view)) => view.to_basename(),
            (NamingStrategy::Coordinates, None) => {
                tracing::warn!("no view position known; using sequential export name");
                format!("{DEFAULT_PREFIX}_{counter}")
            }
        }
    }
}
