//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::{Choice, Event, QueryOutcome};
pub use state::{
    Controls, ConvContext, ConvState, ConversationSession, InputHint, Message, MessageId, Origin,
};
pub use transition::{open_session, transition, TransitionError, TransitionResult};
