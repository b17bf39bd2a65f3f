//! Voice parameter normalization.
//!
//! TTS engines expect `rate` and `volume` as signed percentages (`+10%`,
//! `-5%`) and `pitch` as a signed hertz offset (`+0Hz`). Callers hand us
//! whatever the user typed; [`VoiceParams::normalized`] coerces it.
//!
//! | Input    | Output  |
//! |----------|---------|
//! | `"10%"`  | `"+10%"`|
//! | `"-5%"`  | `"-5%"` |
//! | `"abc"`  | `"+0%"` |
//! | `"12Hz"` | `"+12Hz"` |

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Neutral rate / volume.
pub const NEUTRAL_PERCENT: &str = "+0%";
/// Neutral pitch.
pub const NEUTRAL_HERTZ: &str = "+0Hz";

static UNSIGNED_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?%$").expect("static regex"));
static SIGNED_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]\d+(\.\d+)?%$").expect("static regex"));
static UNSIGNED_HERTZ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d+(\.\d+)?hz$").expect("static regex"));
static SIGNED_HERTZ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[+-]\d+(\.\d+)?hz$").expect("static regex"));

/// Per-item voice shaping parameters in edge-tts / azure-tts notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceParams {
    #[serde(deserialize_with = "lenient_percent")]
    pub rate: String,
    #[serde(deserialize_with = "lenient_percent")]
    pub volume: String,
    #[serde(deserialize_with = "lenient_hertz")]
    pub pitch: String,
}

/// Accept any JSON value: strings pass through, numbers keep their text,
/// everything else becomes `neutral`.
fn lenient_value<'de, D>(deserializer: D, neutral: &str) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => neutral.to_string(),
    })
}

fn lenient_percent<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_value(deserializer, NEUTRAL_PERCENT)
}

fn lenient_hertz<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_value(deserializer, NEUTRAL_HERTZ)
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            rate: NEUTRAL_PERCENT.into(),
            volume: NEUTRAL_PERCENT.into(),
            pitch: NEUTRAL_HERTZ.into(),
        }
    }
}

impl VoiceParams {
    /// Return a copy with every field coerced into the signed grammar.
    ///
    /// Malformed values never propagate; they collapse to the neutral
    /// default instead of erroring.
    pub fn normalized(&self) -> Self {
        Self {
            rate: normalize_percent(&self.rate),
            volume: normalize_percent(&self.volume),
            pitch: normalize_hertz(&self.pitch),
        }
    }
}

/// Normalize a rate or volume value.
pub fn normalize_percent(raw: &str) -> String {
    let raw = raw.trim();
    if UNSIGNED_PERCENT.is_match(raw) {
        return format!("+{raw}");
    }
    if SIGNED_PERCENT.is_match(raw) {
        return raw.to_string();
    }
    NEUTRAL_PERCENT.to_string()
}

/// Normalize a pitch value.
pub fn normalize_hertz(raw: &str) -> String {
    let raw = raw.trim();
    if UNSIGNED_HERTZ.is_match(raw) {
        return format!("+{raw}");
    }
    if SIGNED_HERTZ.is_match(raw) {
        return raw.to_string();
    }
    NEUTRAL_HERTZ.to_string()
}
