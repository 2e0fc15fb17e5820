//! Classification labels and the rule that derives them

use std::fmt;

use tracing::debug;

use crate::payload::VideoListResponse;

/// Terminal classification of one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// Short duration and a portrait (or square) player
    Short,
    /// Everything else, including payloads that could not be interpreted
    Standard,
    /// Retry budget exhausted without a successful lookup
    Failed,
}

impl Label {
    /// Value written to the output store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Short => "short",
            Label::Standard => "standard",
            Label::Failed => "failed",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for the short/standard decision.
#[derive(Debug, Clone, Copy)]
pub struct LabelRules {
    /// Longest duration, inclusive, that can still be short.
    pub short_max_secs: u64,
}

impl Default for LabelRules {
    fn default() -> Self {
        Self { short_max_secs: 60 }
    }
}

/// Classify a successful (HTTP 200) lookup body.
///
/// Short requires both a parsed duration `<= short_max_secs` and embed
/// dimensions with height >= width. Any parse failure, whether a malformed
/// body, an empty item list or a missing field, yields `Standard`.
pub fn derive_label(body: &str, rules: &LabelRules) -> Label {
    let response: VideoListResponse = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            debug!(error = %e, "unparseable lookup payload, treating as standard");
            return Label::Standard;
        }
    };

    let Some(item) = response.items.first() else {
        debug!("lookup payload has no items, treating as standard");
        return Label::Standard;
    };

    let duration = item
        .content_details
        .as_ref()
        .and_then(|d| d.duration.as_deref())
        .and_then(crate::payload::parse_duration_secs);
    let vertical = item
        .player
        .as_ref()
        .and_then(|p| p.dimensions())
        .map(|d| d.is_vertical());

    match (duration, vertical) {
        (Some(secs), Some(true)) if secs <= rules.short_max_secs => Label::Short,
        _ => Label::Standard,
    }
}
