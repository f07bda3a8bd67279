//! Conversation runtime executor

use super::traits::{LeadSink, QueryResolver, Speaker};
use super::{Command, RuntimeSettings, WidgetEvent};

use crate::speech::{language_tag, LanguageTag, Utterance};
use crate::state_machine::{
    open_session, transition, ConvContext, ConvState, ConversationSession, Effect, Event,
    InputHint, QueryOutcome, TransitionError,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Generic widget runtime that can work with any resolver, speaker, and lead sink
pub struct ConversationRuntime<R, S, L>
where
    R: QueryResolver + 'static,
    S: Speaker + 'static,
    L: LeadSink + 'static,
{
    context: ConvContext,
    session: ConversationSession,
    settings: RuntimeSettings,
    resolver: Arc<R>,
    speaker: Arc<S>,
    lead_sink: Arc<L>,
    command_rx: mpsc::Receiver<Command>,
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<WidgetEvent>,
    /// Token to cancel the utterance being spoken
    speech_cancel_token: Option<CancellationToken>,
    /// Token to cancel the lookup in flight
    lookup_cancel_token: Option<CancellationToken>,
    /// Effects from opening the session, run when the loop starts
    opening_effects: Vec<Effect>,
    /// Last state and input hint sent to subscribers
    published: Option<(ConvState, InputHint)>,
    closed: bool,
}

impl<R, S, L> ConversationRuntime<R, S, L>
where
    R: QueryResolver + 'static,
    S: Speaker + 'static,
    L: LeadSink + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: ConvContext,
        settings: RuntimeSettings,
        resolver: Arc<R>,
        speaker: Arc<S>,
        lead_sink: Arc<L>,
        command_rx: mpsc::Receiver<Command>,
        command_tx: mpsc::Sender<Command>,
        broadcast_tx: broadcast::Sender<WidgetEvent>,
    ) -> Self {
        let opened = open_session(0);
        Self {
            context,
            session: opened.new_session,
            settings,
            resolver,
            speaker,
            lead_sink,
            command_rx,
            command_tx,
            broadcast_tx,
            speech_cancel_token: None,
            lookup_cancel_token: None,
            opening_effects: opened.effects,
            published: None,
            closed: false,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting chat widget runtime");

        for effect in std::mem::take(&mut self.opening_effects) {
            self.execute_effect(effect).await;
        }
        self.publish_state();

        // Process commands in a loop - no recursion
        while !self.closed {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    self.handle_command(command).await;
                }
                else => break,
            }
        }

        self.stop_speaking();
        self.cancel_lookup();
        tracing::info!(session_id = %self.context.session_id, "Chat widget runtime stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Event(event) => {
                if let Err(e) = self.process_event(event).await {
                    self.report_rejection(&e);
                }
            }
            Command::StopSpeaking => self.stop_speaking(),
            Command::Replay { id } => match self.session.spoken_text(id) {
                Some(text) => {
                    let text = text.to_string();
                    let language = language_tag(&text);
                    self.start_utterance(text, language);
                }
                None => {
                    tracing::info!(session_id = %self.context.session_id, message_id = id.0, "Nothing to replay");
                    let _ = self.broadcast_tx.send(WidgetEvent::Rejected {
                        reason: format!("Message {} cannot be read aloud", id.0),
                    });
                }
            },
            Command::Close => {
                tracing::info!(session_id = %self.context.session_id, "Widget closed by visitor");
                self.execute_effect(Effect::CloseWidget).await;
            }
        }
    }

    async fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        let is_reset = matches!(event, Event::Reset);
        if is_reset {
            // Anything still running belongs to the old session
            self.cancel_lookup();
            self.stop_speaking();
        }

        // Pure state transition
        let result = transition(&self.session, &self.context, event)?;

        if is_reset {
            let _ = self.broadcast_tx.send(WidgetEvent::Cleared);
            self.published = None;
        }

        let old_state = self.session.state;
        self.session = result.new_session;
        if old_state != self.session.state {
            tracing::debug!(
                session_id = %self.context.session_id,
                from = old_state.name(),
                to = self.session.state.name(),
                "State changed"
            );
        }

        for effect in result.effects {
            self.execute_effect(effect).await;
        }

        // The hint also changes when a lookup starts or lands
        if !self.closed {
            self.publish_state();
        }
        Ok(())
    }

    fn report_rejection(&self, error: &TransitionError) {
        match error {
            // Late timers and lookups are expected after a reset
            TransitionError::StaleQuery(_) | TransitionError::StaleTimer(_) => {
                tracing::debug!(session_id = %self.context.session_id, error = %error, "Dropped stale event");
            }
            _ => {
                tracing::info!(session_id = %self.context.session_id, error = %error, "Input rejected");
                let _ = self.broadcast_tx.send(WidgetEvent::Rejected {
                    reason: error.to_string(),
                });
            }
        }
    }

    fn publish_state(&mut self) {
        let current = (self.session.state, self.session.input_hint(&self.context));
        if self.published.as_ref() == Some(&current) {
            return;
        }
        let _ = self.broadcast_tx.send(WidgetEvent::StateChanged {
            state: current.0,
            hint: current.1.clone(),
        });
        self.published = Some(current);
    }

    fn stop_speaking(&mut self) {
        if let Some(token) = self.speech_cancel_token.take() {
            token.cancel();
        }
    }

    /// A new utterance interrupts the previous one
    fn start_utterance(&mut self, text: String, language: LanguageTag) {
        self.stop_speaking();
        let cancel_token = CancellationToken::new();
        self.speech_cancel_token = Some(cancel_token.clone());

        let speaker = self.speaker.clone();
        let utterance = Utterance::new(text, language, self.settings.voice);
        let delay = self.settings.speak_delay;
        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = cancel_token.cancelled() => {
                    tracing::debug!("Utterance cancelled before it started");
                }

                () = tokio::time::sleep(delay) => {
                    speaker.speak(utterance, cancel_token.clone()).await;
                }
            }
        });
    }

    fn cancel_lookup(&mut self) {
        if let Some(token) = self.lookup_cancel_token.take() {
            token.cancel();
        }
    }

    async fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::ShowMessage(message) => {
                let _ = self.broadcast_tx.send(WidgetEvent::Message { message });
            }

            Effect::RetractMessage { id } => {
                let _ = self.broadcast_tx.send(WidgetEvent::Retracted { id });
            }

            Effect::Speak { text, language } => self.start_utterance(text, language),

            Effect::ResolveQuery {
                epoch,
                query_id,
                text,
            } => {
                let cancel_token = CancellationToken::new();
                self.lookup_cancel_token = Some(cancel_token.clone());

                let resolver = self.resolver.clone();
                let command_tx = self.command_tx.clone();
                let session_id = self.context.session_id.clone();
                tokio::spawn(async move {
                    tracing::info!(session_id = %session_id, query_id, "Resolving query (background)");

                    // Race the lookup against cancellation
                    tokio::select! {
                        biased;

                        () = cancel_token.cancelled() => {
                            tracing::info!(session_id = %session_id, query_id, "Lookup cancelled");
                        }

                        result = resolver.resolve(&text) => {
                            let outcome = match result {
                                Ok(reply) => QueryOutcome::Answered(reply),
                                Err(e) => QueryOutcome::Failed { message: e.to_string() },
                            };
                            let _ = command_tx
                                .send(Command::Event(Event::QueryResolved {
                                    epoch,
                                    query_id,
                                    outcome,
                                }))
                                .await;
                        }
                    }
                });
            }

            Effect::PersistLead(lead) => {
                if let Err(e) = self
                    .lead_sink
                    .persist_lead(&self.context.session_id, &lead)
                    .await
                {
                    tracing::error!(session_id = %self.context.session_id, error = %e, "Failed to persist lead");
                }
            }

            Effect::ScheduleClose { epoch } => {
                let command_tx = self.command_tx.clone();
                let delay = self.settings.close_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = command_tx
                        .send(Command::Event(Event::CloseTimeout { epoch }))
                        .await;
                });
            }

            Effect::CloseWidget => {
                self.stop_speaking();
                self.cancel_lookup();
                self.closed = true;
                let _ = self.broadcast_tx.send(WidgetEvent::Closed);
            }

            // Subscribers get the state once the whole turn has run
            Effect::NotifyState { state } => {
                tracing::info!(session_id = %self.context.session_id, state = state.name(), "Conversation state");
            }
        }
    }
}
