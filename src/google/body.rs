//! Best-effort text extraction from Gmail message bodies.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Gmail sends URL-safe base64, sometimes without padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static DROPPED_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|head)\b[^>]*>.*?</(script|style|head)\s*>").unwrap()
});
static LINE_BREAKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6])\s*>").unwrap()
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

#[derive(Error, Debug)]
pub enum BodyError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("body is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Decode a URL-safe base64 body part into text.
pub fn decode_body(data: &str) -> Result<String, BodyError> {
    let bytes = URL_SAFE_LENIENT.decode(data.trim())?;
    Ok(String::from_utf8(bytes)?)
}

/// Reduce HTML to readable text. Plain text passes through unchanged apart
/// from whitespace trimming.
pub fn html_to_text(html: &str) -> String {
    let text = DROPPED_BLOCKS.replace_all(html, "");
    let text = LINE_BREAKS.replace_all(&text, "\n");
    let text = TAGS.replace_all(&text, "");
    let text = html_escape::decode_html_entities(&text);

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

/// Decoded text of a body part, or an empty string if it cannot be decoded.
pub fn body_text(data: &str) -> String {
    match decode_body(data) {
        Ok(decoded) => html_to_text(&decoded),
        Err(e) => {
            debug!("Dropping undecodable body: {}", e);
            String::new()
        }
    }
}
