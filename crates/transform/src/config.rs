use serde::{Deserialize, Serialize};

/// Runtime behaviour of [`crate::TransformationEngine::transform`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Turn a non-empty error list into `TransformError::Visit`
    #[serde(default = "default_fail_on_error")]
    pub fail_on_error: bool,
    /// Remove values of disabled fields from the output document
    #[serde(default = "default_drop_disabled_fields")]
    pub drop_disabled_fields: bool,
    /// Cap on the errors kept per document; the rest are only counted
    #[serde(default)]
    pub max_errors_per_document: Option<usize>,
}

fn default_fail_on_error() -> bool {
    false
}

fn default_drop_disabled_fields() -> bool {
    true
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            fail_on_error: default_fail_on_error(),
            drop_disabled_fields: default_drop_disabled_fields(),
            max_errors_per_document: None,
        }
    }
}
