//! Events that can occur in a conversation

use crate::responder::{Reply, SuggestionId};
use serde::{Deserialize, Serialize};

/// Answer to a yes/no button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Yes,
    No,
}

impl Choice {
    /// Button label, echoed into the transcript as the visitor's message
    pub fn label(self) -> &'static str {
        match self {
            Choice::Yes => "Yes, I have a query",
            Choice::No => "No, please close",
        }
    }
}

/// Result of a lookup dispatched by `Effect::ResolveQuery`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Answered(Reply),
    Failed { message: String },
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Visitor events
    SubmitText {
        text: String,
    },
    SubmitChoice {
        choice: Choice,
    },
    PickSuggestion {
        id: SuggestionId,
    },

    // Collaborator events
    QueryResolved {
        epoch: u64,
        query_id: u64,
        outcome: QueryOutcome,
    },
    CloseTimeout {
        epoch: u64,
    },

    // Lifecycle
    Reset,
}

impl Event {
    pub fn text(text: impl Into<String>) -> Self {
        Event::SubmitText { text: text.into() }
    }

    pub fn choice(choice: Choice) -> Self {
        Event::SubmitChoice { choice }
    }
}
