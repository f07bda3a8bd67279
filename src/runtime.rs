//! Runtime for chat widgets
//!
//! Owns one session per open widget, feeds visitor input through the pure
//! transition function and executes the resulting effects.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;
pub use traits::*;

use crate::config::ChatConfig;
use crate::curriculum::Curriculum;
use crate::responder::{SuggestionId, TopicTable};
use crate::speech::Voice;
use crate::state_machine::{Choice, ConvContext, ConvState, Event, InputHint, Message, MessageId};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Type alias for the runtime the binary uses
pub type ProductionWidget = ChatWidget<SimulatedResolver, LoggingSpeaker, Arc<dyn LeadSink>>;

/// Timings and voice the executor applies to effects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeSettings {
    pub close_delay: Duration,
    pub speak_delay: Duration,
    pub voice: Voice,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            close_delay: Duration::from_millis(3000),
            speak_delay: Duration::from_millis(300),
            voice: Voice::default(),
        }
    }
}

impl From<&ChatConfig> for RuntimeSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            close_delay: config.close_delay,
            speak_delay: config.speak_delay,
            voice: config.voice(),
        }
    }
}

/// Inbound messages for a running widget
#[derive(Debug, Clone)]
pub enum Command {
    /// Goes through the state machine
    Event(Event),
    /// Silence the current utterance; conversation state is untouched
    StopSpeaking,
    /// Read an earlier assistant message aloud again
    Replay { id: MessageId },
    /// Visitor closed the widget
    Close,
}

/// Events sent to whatever renders the widget
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetEvent {
    Message {
        message: Message,
    },
    Retracted {
        id: MessageId,
    },
    StateChanged {
        state: ConvState,
        hint: InputHint,
    },
    Rejected {
        reason: String,
    },
    /// Transcript restarted; drop everything shown so far
    Cleared,
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Chat widget is no longer running")]
pub struct WidgetClosed;

/// Factory for widget sessions sharing the same collaborators
pub struct ChatWidget<R, S, L>
where
    R: QueryResolver + 'static,
    S: Speaker + 'static,
    L: LeadSink + 'static,
{
    resolver: Arc<R>,
    speaker: Arc<S>,
    lead_sink: Arc<L>,
    settings: RuntimeSettings,
    curriculum: Curriculum,
    topics: TopicTable,
}

impl<R, S, L> ChatWidget<R, S, L>
where
    R: QueryResolver + 'static,
    S: Speaker + 'static,
    L: LeadSink + 'static,
{
    pub fn new(resolver: R, speaker: S, lead_sink: L, settings: RuntimeSettings) -> Self {
        Self {
            resolver: Arc::new(resolver),
            speaker: Arc::new(speaker),
            lead_sink: Arc::new(lead_sink),
            settings,
            curriculum: Curriculum::default(),
            topics: TopicTable::default(),
        }
    }

    #[allow(dead_code)] // Used by tests
    pub fn with_curriculum(mut self, curriculum: Curriculum) -> Self {
        self.curriculum = curriculum;
        self
    }

    #[allow(dead_code)] // Used by tests
    pub fn with_topics(mut self, topics: TopicTable) -> Self {
        self.topics = topics;
        self
    }

    /// Open a fresh widget session and start its runtime task
    pub fn open(&self) -> ChatHandle {
        let session_id = uuid::Uuid::new_v4().to_string();
        let context = ConvContext::new(&session_id)
            .with_curriculum(self.curriculum.clone())
            .with_topics(self.topics.clone());

        let (command_tx, command_rx) = mpsc::channel(32);
        let (broadcast_tx, events) = broadcast::channel(128);

        let runtime = ConversationRuntime::new(
            context,
            self.settings,
            self.resolver.clone(),
            self.speaker.clone(),
            self.lead_sink.clone(),
            command_rx,
            command_tx.clone(),
            broadcast_tx,
        );
        let task = tokio::spawn(runtime.run());

        ChatHandle {
            session_id,
            command_tx,
            events,
            task: Some(task),
        }
    }
}

/// Handle to interact with a running widget
pub struct ChatHandle {
    session_id: String,
    command_tx: mpsc::Sender<Command>,
    /// Subscribed before the runtime starts so the greeting is never missed
    events: broadcast::Receiver<WidgetEvent>,
    task: Option<JoinHandle<()>>,
}

impl ChatHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn send(&self, command: Command) -> Result<(), WidgetClosed> {
        self.command_tx.send(command).await.map_err(|_| WidgetClosed)
    }

    pub async fn submit_text(&self, text: impl Into<String>) -> Result<(), WidgetClosed> {
        self.send(Command::Event(Event::text(text))).await
    }

    pub async fn submit_choice(&self, choice: Choice) -> Result<(), WidgetClosed> {
        self.send(Command::Event(Event::choice(choice))).await
    }

    pub async fn pick_suggestion(&self, id: SuggestionId) -> Result<(), WidgetClosed> {
        self.send(Command::Event(Event::PickSuggestion { id })).await
    }

    pub async fn reset(&self) -> Result<(), WidgetClosed> {
        self.send(Command::Event(Event::Reset)).await
    }

    pub async fn stop_speaking(&self) -> Result<(), WidgetClosed> {
        self.send(Command::StopSpeaking).await
    }

    pub async fn replay(&self, id: MessageId) -> Result<(), WidgetClosed> {
        self.send(Command::Replay { id }).await
    }

    /// An additional event stream, starting from now
    #[allow(dead_code)] // Used by tests
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.resubscribe()
    }

    /// Next event from the stream opened with the widget. `None` once the
    /// runtime is gone.
    pub async fn next_event(&mut self) -> Option<WidgetEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(session_id = %self.session_id, skipped, "Widget event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Close the widget and wait for its runtime to stop
    pub async fn close(&mut self) {
        let _ = self.command_tx.send(Command::Close).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(session_id = %self.session_id, error = %e, "Widget runtime panicked");
            }
        }
    }
}

impl Drop for ChatHandle {
    fn drop(&mut self) {
        // The runtime holds its own sender, so it has to be told to stop
        let _ = self.command_tx.try_send(Command::Close);
    }
}
