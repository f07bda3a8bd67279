//! Speech presentation helpers
//!
//! Picks a voice language from the script of the text being spoken. The
//! speech engine itself lives behind `runtime::Speaker`.

use serde::{Deserialize, Serialize};

/// BCP-47 tag handed to the synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageTag {
    #[serde(rename = "hi-IN")]
    Hindi,
    #[serde(rename = "ta-IN")]
    Tamil,
    #[serde(rename = "en-US")]
    English,
}

impl LanguageTag {
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageTag::Hindi => "hi-IN",
            LanguageTag::Tamil => "ta-IN",
            LanguageTag::English => "en-US",
        }
    }
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

fn is_tamil(c: char) -> bool {
    ('\u{0B80}'..='\u{0BFF}').contains(&c)
}

/// Script sniffing: any Devanagari wins, then Tamil, else English
pub fn language_tag(text: &str) -> LanguageTag {
    if text.chars().any(is_devanagari) {
        LanguageTag::Hindi
    } else if text.chars().any(is_tamil) {
        LanguageTag::Tamil
    } else {
        LanguageTag::English
    }
}

/// Voice parameters shared by every utterance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub rate: f32,
    pub pitch: f32,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            rate: 0.8,
            pitch: 1.0,
        }
    }
}

/// A single request to the speech collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub language: LanguageTag,
    pub voice: Voice,
}

impl Utterance {
    pub fn new(text: impl Into<String>, language: LanguageTag, voice: Voice) -> Self {
        Self {
            text: text.into(),
            language,
            voice,
        }
    }
}
