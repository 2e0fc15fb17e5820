//! Response payload types for the video metadata endpoint
//!
//! Mirrors the subset of a `videos.list` response the classifier reads:
//! `items[].contentDetails.duration` (ISO-8601) and `items[].player`
//! (embed width/height, or the embed HTML carrying them as attributes).
//! Every field is optional so a sparse or unexpected payload still parses;
//! missing values surface as `None` and are treated as not-short upstream.

use serde::Deserialize;

/// Top-level list response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

/// One video resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content_details: Option<ContentDetails>,
    #[serde(default)]
    pub player: Option<Player>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentDetails {
    #[serde(default)]
    pub duration: Option<String>,
}

/// Embed descriptor. The API encodes dimensions as numeric strings, so they
/// are kept as raw JSON and read by [`Player::dimensions`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default)]
    pub embed_html: Option<String>,
    #[serde(default)]
    pub embed_width: Option<serde_json::Value>,
    #[serde(default)]
    pub embed_height: Option<serde_json::Value>,
}

/// Width and height of the embedded player, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedDimensions {
    pub width: u64,
    pub height: u64,
}

impl EmbedDimensions {
    /// Portrait or square player.
    pub fn is_vertical(&self) -> bool {
        self.height >= self.width
    }
}

impl Player {
    /// Embed dimensions from the explicit fields, else from the embed HTML.
    pub fn dimensions(&self) -> Option<EmbedDimensions> {
        let explicit = match (&self.embed_width, &self.embed_height) {
            (Some(w), Some(h)) => json_dimension(w).zip(json_dimension(h)),
            _ => None,
        };
        explicit
            .or_else(|| {
                let html = self.embed_html.as_deref()?;
                html_dimension(html, "width").zip(html_dimension(html, "height"))
            })
            .map(|(width, height)| EmbedDimensions { width, height })
    }
}

fn json_dimension(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read `name="123"` from an HTML tag. Requires a preceding space so
/// `max-width="…"` style attributes do not match.
fn html_dimension(html: &str, name: &str) -> Option<u64> {
    let needle = format!(" {name}=\"");
    let start = html.find(&needle)? + needle.len();
    let rest = &html[start..];
    let end = rest.find('"')?;
    rest[..end].trim().parse().ok()
}

/// Parse a duration into whole seconds.
///
/// Accepts ISO-8601 durations with week/day date components and
/// hour/minute/second time components (`PT1M5S`, `P1DT2H`, `P0D`), or a
/// plain integer number of seconds. Fractions, years and months are rejected.
pub fn parse_duration_secs(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(secs);
    }

    let rest = raw.strip_prefix('P')?;
    let mut total: u64 = 0;
    let mut in_time = false;
    let mut saw_component = false;
    let mut digits = String::new();

    for ch in rest.chars() {
        match ch {
            '0'..='9' => digits.push(ch),
            'T' if !in_time && digits.is_empty() => in_time = true,
            unit => {
                let value: u64 = digits.parse().ok()?;
                digits.clear();
                let scale = match (in_time, unit) {
                    (false, 'W') => 7 * 86_400,
                    (false, 'D') => 86_400,
                    (true, 'H') => 3_600,
                    (true, 'M') => 60,
                    (true, 'S') => 1,
                    _ => return None,
                };
                total = total.checked_add(value.checked_mul(scale)?)?;
                saw_component = true;
            }
        }
    }

    if !digits.is_empty() || !saw_component {
        return None;
    }
    Some(total)
}
