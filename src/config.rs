//! Widget configuration, read from `ACADEMY_CHAT_*` environment variables

use crate::speech::Voice;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_LOOKUP_DELAY_MS: u64 = 1500;
const DEFAULT_CLOSE_DELAY_MS: u64 = 3000;
const DEFAULT_SPEAK_DELAY_MS: u64 = 300;
const DEFAULT_CONTACT_URL: &str = "https://wa.me/6397255377?text=Hello!%20I'm%20interested%20in%20learning%20Hindi%20at%20Raanuva%20Veeran%20Spoken%20Hindi%20Academy.%20Could%20you%20please%20provide%20more%20information%3F";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Latency of the simulated lookup service
    pub lookup_delay: Duration,
    /// Time between the farewell and the widget closing
    pub close_delay: Duration,
    /// Pause before a reply is read aloud
    pub speak_delay: Duration,
    pub speech_rate: f32,
    pub speech_pitch: f32,
    /// JSONL file for captured leads; unset means leads are only logged
    pub leads_path: Option<PathBuf>,
    /// WhatsApp link the farewell points visitors to
    pub contact_url: String,
    pub log_json: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let voice = Voice::default();
        Self {
            lookup_delay: Duration::from_millis(DEFAULT_LOOKUP_DELAY_MS),
            close_delay: Duration::from_millis(DEFAULT_CLOSE_DELAY_MS),
            speak_delay: Duration::from_millis(DEFAULT_SPEAK_DELAY_MS),
            speech_rate: voice.rate,
            speech_pitch: voice.pitch,
            leads_path: None,
            contact_url: DEFAULT_CONTACT_URL.to_string(),
            log_json: false,
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            lookup_delay: millis(&lookup, "ACADEMY_CHAT_LOOKUP_DELAY_MS", defaults.lookup_delay),
            close_delay: millis(&lookup, "ACADEMY_CHAT_CLOSE_DELAY_MS", defaults.close_delay),
            speak_delay: millis(&lookup, "ACADEMY_CHAT_SPEAK_DELAY_MS", defaults.speak_delay),
            speech_rate: positive(&lookup, "ACADEMY_CHAT_SPEECH_RATE", defaults.speech_rate),
            speech_pitch: positive(&lookup, "ACADEMY_CHAT_SPEECH_PITCH", defaults.speech_pitch),
            leads_path: lookup("ACADEMY_CHAT_LEADS_PATH")
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
                .map(PathBuf::from),
            contact_url: lookup("ACADEMY_CHAT_CONTACT_URL")
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
                .unwrap_or(defaults.contact_url),
            log_json: lookup("ACADEMY_CHAT_LOG_JSON").is_some_and(|raw| {
                let raw = raw.trim();
                raw == "1" || raw.eq_ignore_ascii_case("true")
            }),
        }
    }

    pub fn voice(&self) -> Voice {
        Voice {
            rate: self.speech_rate,
            pitch: self.speech_pitch,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparseable setting, using default");
                default
            }
        },
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(parse_or(lookup, key, default_ms))
}

/// Rate and pitch must be finite and above zero
fn positive(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f32) -> f32 {
    let value = parse_or(lookup, key, default);
    if value.is_finite() && value > 0.0 {
        value
    } else {
        tracing::warn!(key, value, "Setting out of range, using default");
        default
    }
}
