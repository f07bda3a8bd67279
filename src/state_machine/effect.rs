//! Effects produced by state transitions

use crate::lead::LeadRecord;
use crate::speech::{language_tag, LanguageTag};
use crate::state_machine::state::{ConvState, Message, MessageId};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Render a new transcript entry
    ShowMessage(Message),

    /// Drop a transient entry (typing indicator, stale suggestion buttons)
    RetractMessage { id: MessageId },

    /// Read text aloud
    Speak { text: String, language: LanguageTag },

    /// Run the lookup; the answer comes back as `Event::QueryResolved`
    ResolveQuery {
        epoch: u64,
        query_id: u64,
        text: String,
    },

    /// Hand the completed lead to whoever stores it
    PersistLead(LeadRecord),

    /// Start the auto-close timer; it fires `Event::CloseTimeout`
    ScheduleClose { epoch: u64 },

    /// Close the widget UI
    CloseWidget,

    /// Notify the renderer that the state changed
    NotifyState { state: ConvState },
}

impl Effect {
    pub fn speak(text: impl Into<String>) -> Self {
        let text = text.into();
        Effect::Speak {
            language: language_tag(&text),
            text,
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(self, Effect::ShowMessage(_))
    }
}
