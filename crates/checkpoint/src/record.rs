//! Classification result rows

/// Label recorded for identifiers whose retry budget ran out.
pub const FAILED_LABEL: &str = "failed";

/// One terminal result: an identifier and its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub identifier: String,
    pub label: String,
}

impl ClassificationResult {
    pub fn new(identifier: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            label: label.into(),
        }
    }

    /// Whether this result goes to the failure log as well.
    pub fn is_failure(&self) -> bool {
        self.label == FAILED_LABEL
    }
}
