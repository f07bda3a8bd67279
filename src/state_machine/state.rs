//! Conversation state types

use crate::curriculum::{Curriculum, Lesson, LessonCursor};
use crate::lead::LeadRecord;
use crate::responder::{academy_suggestions, Suggestion, SuggestionId, TopicTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Conversation State
// ============================================================================

/// Step of the widget's conversation funnel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Walking the lesson curriculum
    GuidedLearning {
        /// A free-form question broke into the lesson flow
        #[serde(default)]
        interrupted: bool,
    },

    /// Lead capture, one field per turn
    LeadName,
    LeadEmail,
    LeadPhone,

    /// Quick-reply buttons are on offer
    ShowSuggestions,

    /// Free-text questions
    GeneralQuery,

    /// Waiting for a yes/no button: another question, or close
    QueryOrEnd,

    /// Farewell sent; the widget closes on a timer
    Closing,
}

impl Default for ConvState {
    fn default() -> Self {
        ConvState::GuidedLearning { interrupted: false }
    }
}

impl ConvState {
    /// Check if this is the terminal state (only a reset leaves it)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConvState::Closing)
    }

    pub fn is_lead_capture(&self) -> bool {
        matches!(
            self,
            ConvState::LeadName | ConvState::LeadEmail | ConvState::LeadPhone
        )
    }

    /// Stable snake_case name, as used in logs and state-change notifications
    pub fn name(&self) -> &'static str {
        match self {
            ConvState::GuidedLearning { .. } => "guided_learning",
            ConvState::LeadName => "lead_name",
            ConvState::LeadEmail => "lead_email",
            ConvState::LeadPhone => "lead_phone",
            ConvState::ShowSuggestions => "show_suggestions",
            ConvState::GeneralQuery => "general_query",
            ConvState::QueryOrEnd => "query_or_end",
            ConvState::Closing => "closing",
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Sequential within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    User,
    Assistant,
}

/// Clickable controls rendered under a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "options", rename_all = "snake_case")]
pub enum Controls {
    #[default]
    None,
    YesNo,
    Suggestions(Vec<Suggestion>),
}

/// A transcript entry. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub origin: Origin,
    pub text: String,
    /// Spoken variant; `None` means the message is not read aloud
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spoken_text: Option<String>,
    #[serde(default)]
    pub controls: Controls,
    /// Transient "Typing..." indicator, removed when the answer lands
    #[serde(default)]
    pub placeholder: bool,
}

impl Message {
    pub fn is_assistant(&self) -> bool {
        self.origin == Origin::Assistant
    }
}

// ============================================================================
// Pending lookup
// ============================================================================

/// Where the conversation picks up once a lookup answer arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOrigin {
    /// A question typed in the middle of a lesson
    Lesson,
    /// A suggestion click or text typed while suggestions were on offer
    Suggestions,
    /// General free-text mode
    FreeQuery,
}

/// The one lookup allowed in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQuery {
    pub query_id: u64,
    pub placeholder: MessageId,
    pub origin: QueryOrigin,
    /// Clicked suggestion; marked used only once it is answered
    #[serde(default)]
    pub suggestion: Option<SuggestionId>,
}

// ============================================================================
// Session
// ============================================================================

/// Everything one open widget knows. Owned, cloned into each transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub state: ConvState,
    pub cursor: LessonCursor,
    pub lead: LeadRecord,
    pub transcript: Vec<Message>,
    pub pending: Option<PendingQuery>,
    pub used_suggestions: BTreeSet<SuggestionId>,
    /// Bumped on reset so timers from an earlier session are ignored
    pub epoch: u64,
    pub(crate) next_message_id: u64,
    pub(crate) next_query_id: u64,
}

impl ConversationSession {
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            ..Self::default()
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the lesson has already been posted, judged by its heading line
    pub fn lesson_shown(&self, lesson: &Lesson) -> bool {
        let heading = lesson.heading();
        self.transcript
            .iter()
            .any(|msg| msg.is_assistant() && msg.text.starts_with(heading))
    }

    /// Spoken variant of an assistant message still in the transcript
    pub fn spoken_text(&self, id: MessageId) -> Option<&str> {
        self.transcript
            .iter()
            .find(|msg| msg.id == id && msg.is_assistant())
            .and_then(|msg| msg.spoken_text.as_deref())
    }

    /// Controls the visitor can click right now, if any
    pub fn active_controls(&self) -> Option<&Controls> {
        if self.is_busy() {
            return None;
        }
        let latest = self
            .transcript
            .iter()
            .rev()
            .find(|msg| msg.controls != Controls::None)?;
        match (&latest.controls, self.state) {
            (Controls::YesNo, ConvState::QueryOrEnd)
            | (Controls::Suggestions(_), ConvState::ShowSuggestions) => Some(&latest.controls),
            _ => None,
        }
    }

    /// Suggestions not yet clicked this session
    pub fn remaining_suggestions(&self, ctx: &ConvContext) -> Vec<Suggestion> {
        ctx.suggestions
            .iter()
            .filter(|s| !self.used_suggestions.contains(&s.id))
            .cloned()
            .collect()
    }

    /// Placeholder text and enabled flag for the input box
    pub fn input_hint(&self, ctx: &ConvContext) -> InputHint {
        if self.is_busy() {
            return InputHint::disabled("Typing...");
        }
        match self.state {
            ConvState::GuidedLearning { interrupted } => {
                let lesson = ctx.curriculum.lesson_at(self.cursor);
                if interrupted {
                    InputHint::enabled(format!(
                        "Type '{}' to resume the lesson...",
                        lesson.advance_token
                    ))
                } else {
                    InputHint::enabled(format!("Type '{}' to proceed...", lesson.advance_token))
                }
            }
            ConvState::LeadName => InputHint::enabled("Enter your full name..."),
            ConvState::LeadEmail => InputHint::enabled("Enter your email address..."),
            ConvState::LeadPhone => InputHint::enabled("Enter your phone number..."),
            ConvState::ShowSuggestions => {
                InputHint::enabled("Pick a suggestion or type your question...")
            }
            ConvState::GeneralQuery => {
                InputHint::enabled("Ask your question or type 'stop' to close...")
            }
            ConvState::QueryOrEnd => InputHint::disabled("Please click a button above..."),
            ConvState::Closing => InputHint::disabled("Chat closing..."),
        }
    }
}

/// What the input box should look like in the current state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputHint {
    pub placeholder: String,
    pub enabled: bool,
}

impl InputHint {
    fn enabled(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            enabled: true,
        }
    }

    fn disabled(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            enabled: false,
        }
    }
}

// ============================================================================
// Context
// ============================================================================

/// Fixed content for a widget (immutable configuration)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub session_id: String,
    pub curriculum: Curriculum,
    pub topics: TopicTable,
    pub suggestions: Vec<Suggestion>,
}

impl ConvContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            curriculum: Curriculum::default(),
            topics: TopicTable::default(),
            suggestions: academy_suggestions(),
        }
    }

    pub fn with_curriculum(mut self, curriculum: Curriculum) -> Self {
        self.curriculum = curriculum;
        self
    }

    pub fn with_topics(mut self, topics: TopicTable) -> Self {
        self.topics = topics;
        self
    }

    pub fn suggestion(&self, id: SuggestionId) -> Option<&Suggestion> {
        self.suggestions.iter().find(|s| s.id == id)
    }
}
