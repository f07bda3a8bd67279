//! Pure state transition function
//!
//! Given the same session, context and event this always produces the same
//! session and effects. Timers, lookups, speech and lead storage happen in
//! the runtime when it executes the effects.

use super::event::{Choice, QueryOutcome};
use super::state::{
    Controls, ConvContext, ConvState, ConversationSession, Message, MessageId, Origin,
    PendingQuery, QueryOrigin,
};
use super::{Effect, Event};
use crate::lead::{validate_email, validate_name, validate_phone, LeadError, LeadField};
use crate::responder::{is_termination, Reply, Suggestion, SuggestionId};
use thiserror::Error;

const GREETING: &str = "नमस्ते! (Namaste / வணக்கம்) I'm your Hindi learning assistant. Would you like a quick guided lesson on basic words before proceeding? Type **YES** or **NO**.";
const GREETING_SPEECH: &str = "नमस्ते! मैं आपकी हिंदी सीखने में मदद कर सकता हूं";
const LEAD_AFTER_LESSONS: &str = "That completes your lessons for now! We'd love to send you a complete vocabulary guide. Could you please provide your **full name** to continue?";
const LEAD_SKIPPED: &str = "No problem! We'd love to send you a complete vocabulary guide. Could you please provide your **full name** to continue?";
const ASK_PHONE: &str = "Thank you. Finally, what's your contact number so we can reach you?";
const LEAD_RECEIVED: &str = "Perfect, thank you! Our team will be in touch. Do you have any immediate questions about the courses or Hindi language?";
const MORE_SUGGESTIONS: &str = "Great! Pick a topic below or type your question.";
const ASK_FREELY: &str = "Great! Go ahead and ask your question.";
const ANY_OTHER: &str = "Do you have any *other* questions before I close the chat?";
const USE_BUTTONS: &str = "Please choose one of the buttons below to proceed.";
const FAREWELL: &str = "Understood! I'm closing the chat now. If you need us, use the WhatsApp button below. Have a great day!";
const TYPING: &str = "Typing...";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: ConversationSession,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: ConversationSession) -> Self {
        Self {
            new_session: session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Events the current session cannot accept. None of these end the session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Still answering the previous question")]
    Busy,
    #[error("Chat is closing")]
    SessionClosed,
    #[error("No yes/no buttons are on offer in state {0}")]
    NoButtons(&'static str),
    #[error("No suggestions are on offer in state {0}")]
    NoSuggestions(&'static str),
    #[error("Suggestion {0:?} is not on offer")]
    UnknownSuggestion(SuggestionId),
    #[error("No lookup {0} is pending")]
    StaleQuery(u64),
    #[error("Close timer from epoch {0} no longer applies")]
    StaleTimer(u64),
    #[error("Lead capture out of order: {0}")]
    Lead(#[from] LeadError),
}

/// Start a fresh session and greet the visitor
pub fn open_session(epoch: u64) -> TransitionResult {
    let mut turn = Turn::begin(&ConversationSession::new(epoch));
    turn.say(Reply::new(GREETING, GREETING_SPEECH));
    turn.finish()
}

/// Pure transition function
pub fn transition(
    session: &ConversationSession,
    ctx: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // Lifecycle and collaborator events
        // ============================================================
        Event::Reset => {
            let result = open_session(session.epoch + 1);
            let state = result.new_session.state;
            if session.state == state {
                Ok(result)
            } else {
                Ok(result.with_effect(Effect::NotifyState { state }))
            }
        }

        Event::CloseTimeout { epoch } => {
            if epoch == session.epoch && session.state.is_terminal() {
                Ok(TransitionResult::new(session.clone()).with_effect(Effect::CloseWidget))
            } else {
                Err(TransitionError::StaleTimer(epoch))
            }
        }

        Event::QueryResolved {
            epoch,
            query_id,
            outcome,
        } => match session.pending {
            Some(pending) if epoch == session.epoch && pending.query_id == query_id => {
                let mut turn = Turn::begin(session);
                turn.session.pending = None;
                turn.retract(pending.placeholder);
                match outcome {
                    QueryOutcome::Answered(reply) => {
                        if let Some(id) = pending.suggestion {
                            turn.session.used_suggestions.insert(id);
                        }
                        turn.say(reply);
                        after_answer(&mut turn, ctx, pending.origin);
                    }
                    QueryOutcome::Failed { message } => {
                        tracing::warn!(query_id, error = %message, "Lookup failed, apologising");
                        turn.say(Reply::apology());
                        after_failed_lookup(&mut turn, ctx, pending.origin);
                    }
                }
                Ok(turn.finish())
            }
            _ => Err(TransitionError::StaleQuery(query_id)),
        },

        // ============================================================
        // Visitor input
        // ============================================================
        _ if session.state.is_terminal() => Err(TransitionError::SessionClosed),
        _ if session.is_busy() => Err(TransitionError::Busy),

        Event::SubmitText { text } => submit_text(session, ctx, &text),

        Event::SubmitChoice { choice } => {
            if session.state != ConvState::QueryOrEnd {
                return Err(TransitionError::NoButtons(session.state.name()));
            }
            let mut turn = Turn::begin(session);
            turn.user(choice.label());
            match choice {
                Choice::Yes => offer_more(&mut turn, ctx),
                Choice::No => close(&mut turn),
            }
            Ok(turn.finish())
        }

        Event::PickSuggestion { id } => {
            if session.state != ConvState::ShowSuggestions {
                return Err(TransitionError::NoSuggestions(session.state.name()));
            }
            let suggestion = ctx
                .suggestion(id)
                .filter(|_| !session.used_suggestions.contains(&id))
                .ok_or(TransitionError::UnknownSuggestion(id))?;
            let mut turn = Turn::begin(session);
            turn.user(&suggestion.label);
            answer(&mut turn, ctx, &suggestion.query, QueryOrigin::Suggestions);
            match turn.session.pending.as_mut() {
                Some(pending) => pending.suggestion = Some(id),
                None => {
                    turn.session.used_suggestions.insert(id);
                }
            }
            Ok(turn.finish())
        }
    }
}

fn submit_text(
    session: &ConversationSession,
    ctx: &ConvContext,
    raw: &str,
) -> Result<TransitionResult, TransitionError> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(TransitionResult::new(session.clone()));
    }

    let mut turn = Turn::begin(session);
    turn.user(text);

    // Termination keywords outrank state dispatch, except inside the lead form
    if is_termination(text) && !session.state.is_lead_capture() {
        if turn.session.lead.has_name() {
            close(&mut turn);
        } else {
            start_lead_capture(&mut turn, ctx);
        }
        return Ok(turn.finish());
    }

    match session.state {
        ConvState::GuidedLearning { .. } => guided_learning(&mut turn, ctx, text),
        ConvState::LeadName | ConvState::LeadEmail | ConvState::LeadPhone => {
            capture_lead(&mut turn, ctx, text)?;
        }
        ConvState::ShowSuggestions => answer(&mut turn, ctx, text, QueryOrigin::Suggestions),
        ConvState::GeneralQuery => answer(&mut turn, ctx, text, QueryOrigin::FreeQuery),
        ConvState::QueryOrEnd => turn.say(Reply::plain(USE_BUTTONS)),
        ConvState::Closing => return Err(TransitionError::SessionClosed),
    }
    Ok(turn.finish())
}

// ============================================================================
// Guided learning
// ============================================================================

fn guided_learning(turn: &mut Turn, ctx: &ConvContext, text: &str) {
    let lower = text.to_lowercase();
    let cursor = turn.session.cursor;
    let lesson = ctx.curriculum.lesson_at(cursor);

    // Opening yes/no; never falls through to token matching
    if cursor.is_start() && (lower.contains("yes") || lower.contains("no")) {
        if lower.contains("yes") {
            if turn.session.lesson_shown(lesson) {
                turn.say(Reply::plain(format!(
                    "You are already on Lesson 1. Type **{}** to continue.",
                    lesson.advance_token
                )));
            } else {
                turn.say(Reply::new(&lesson.text, &lesson.speech));
            }
        } else {
            start_lead_capture(turn, ctx);
        }
        return;
    }

    if lesson.is_advance(text) {
        match cursor.advance(&ctx.curriculum) {
            Some(next) => {
                let next_lesson = ctx.curriculum.lesson_at(next);
                turn.session.cursor = next;
                turn.enter(ConvState::GuidedLearning { interrupted: false });
                turn.say(Reply::new(&next_lesson.text, &next_lesson.speech));
            }
            None => start_lead_capture(turn, ctx),
        }
        return;
    }

    turn.enter(ConvState::GuidedLearning { interrupted: true });
    answer(turn, ctx, text, QueryOrigin::Lesson);
}

fn nudge_lesson(turn: &mut Turn, ctx: &ConvContext) {
    let lesson = ctx.curriculum.lesson_at(turn.session.cursor);
    turn.say(Reply::plain(format!(
        "To proceed, please type **{}** to see the next lesson.",
        lesson.advance_token
    )));
}

// ============================================================================
// Lead capture
// ============================================================================

/// The prompt acknowledges the lessons only if the visitor actually saw the last one
fn start_lead_capture(turn: &mut Turn, ctx: &ConvContext) {
    let lessons = ctx.curriculum.lessons();
    let finished = lessons
        .last()
        .is_some_and(|last| turn.session.lesson_shown(last));
    turn.enter(ConvState::LeadName);
    turn.say(Reply::plain(if finished {
        LEAD_AFTER_LESSONS
    } else {
        LEAD_SKIPPED
    }));
}

fn capture_lead(turn: &mut Turn, ctx: &ConvContext, text: &str) -> Result<(), LeadError> {
    let (field, validated) = match turn.session.state {
        ConvState::LeadName => (LeadField::Name, validate_name(text)),
        ConvState::LeadEmail => (LeadField::Email, validate_email(text)),
        _ => (LeadField::Phone, validate_phone(text)),
    };

    let value = match validated {
        Ok(value) => value,
        Err(invalid) => {
            turn.say(Reply::plain(invalid.to_string()));
            return Ok(());
        }
    };

    turn.session.lead.record(field, value.clone())?;
    match field {
        LeadField::Name => {
            turn.enter(ConvState::LeadEmail);
            turn.say(Reply::plain(format!(
                "Great, {value}! Next, what's your best email address?"
            )));
        }
        LeadField::Email => {
            turn.enter(ConvState::LeadPhone);
            turn.say(Reply::plain(ASK_PHONE));
        }
        LeadField::Phone => {
            turn.effects
                .push(Effect::PersistLead(turn.session.lead.clone()));
            let offered = turn.session.remaining_suggestions(ctx);
            show_suggestions(turn, LEAD_RECEIVED, offered);
        }
    }
    Ok(())
}

// ============================================================================
// Questions and answers
// ============================================================================

fn show_suggestions(turn: &mut Turn, prompt: &str, offered: Vec<Suggestion>) {
    turn.enter(ConvState::ShowSuggestions);
    turn.say_with(Reply::plain(prompt), Controls::Suggestions(offered));
}

/// Local topic table first, else hand the question to the lookup
fn answer(turn: &mut Turn, ctx: &ConvContext, text: &str, origin: QueryOrigin) {
    if let Some(reply) = ctx.topics.lookup(text) {
        turn.say(reply.clone());
        after_answer(turn, ctx, origin);
        return;
    }

    let placeholder = turn.placeholder();
    let query_id = turn.session.next_query_id;
    turn.session.next_query_id += 1;
    turn.session.pending = Some(PendingQuery {
        query_id,
        placeholder,
        origin,
        suggestion: None,
    });
    let epoch = turn.session.epoch;
    turn.effects.push(Effect::ResolveQuery {
        epoch,
        query_id,
        text: text.to_string(),
    });
}

fn after_answer(turn: &mut Turn, ctx: &ConvContext, origin: QueryOrigin) {
    match origin {
        QueryOrigin::Lesson => nudge_lesson(turn, ctx),
        QueryOrigin::Suggestions | QueryOrigin::FreeQuery => {
            turn.retract_suggestions();
            turn.enter(ConvState::QueryOrEnd);
            turn.say_with(Reply::plain(ANY_OTHER), Controls::YesNo);
        }
    }
}

/// The apology is already posted; stay where the visitor can keep typing
fn after_failed_lookup(turn: &mut Turn, ctx: &ConvContext, origin: QueryOrigin) {
    match origin {
        QueryOrigin::Lesson => nudge_lesson(turn, ctx),
        QueryOrigin::Suggestions | QueryOrigin::FreeQuery => {
            turn.retract_suggestions();
            turn.enter(ConvState::GeneralQuery);
        }
    }
}

fn offer_more(turn: &mut Turn, ctx: &ConvContext) {
    let offered = turn.session.remaining_suggestions(ctx);
    if offered.is_empty() {
        turn.enter(ConvState::GeneralQuery);
        turn.say(Reply::plain(ASK_FREELY));
    } else {
        show_suggestions(turn, MORE_SUGGESTIONS, offered);
    }
}

fn close(turn: &mut Turn) {
    turn.enter(ConvState::Closing);
    turn.say(Reply::plain(FAREWELL));
    let epoch = turn.session.epoch;
    turn.effects.push(Effect::ScheduleClose { epoch });
}

// ============================================================================
// Turn builder
// ============================================================================

/// Accumulates the new session and its effects so the transcript and the
/// emitted `ShowMessage`/`RetractMessage` effects never drift apart.
struct Turn {
    initial_state: ConvState,
    session: ConversationSession,
    effects: Vec<Effect>,
}

impl Turn {
    fn begin(session: &ConversationSession) -> Self {
        Self {
            initial_state: session.state,
            session: session.clone(),
            effects: vec![],
        }
    }

    fn enter(&mut self, state: ConvState) {
        self.session.state = state;
    }

    fn next_id(&mut self) -> MessageId {
        let id = MessageId(self.session.next_message_id);
        self.session.next_message_id += 1;
        id
    }

    fn push(&mut self, message: Message) {
        self.effects.push(Effect::ShowMessage(message.clone()));
        self.session.transcript.push(message);
    }

    fn user(&mut self, text: &str) {
        let id = self.next_id();
        self.push(Message {
            id,
            origin: Origin::User,
            text: text.to_string(),
            spoken_text: None,
            controls: Controls::None,
            placeholder: false,
        });
    }

    fn say(&mut self, reply: Reply) {
        self.say_with(reply, Controls::None);
    }

    fn say_with(&mut self, reply: Reply, controls: Controls) {
        let id = self.next_id();
        self.push(Message {
            id,
            origin: Origin::Assistant,
            text: reply.text,
            spoken_text: Some(reply.speech.clone()),
            controls,
            placeholder: false,
        });
        self.effects.push(Effect::speak(reply.speech));
    }

    fn placeholder(&mut self) -> MessageId {
        let id = self.next_id();
        self.push(Message {
            id,
            origin: Origin::Assistant,
            text: TYPING.to_string(),
            spoken_text: None,
            controls: Controls::None,
            placeholder: true,
        });
        id
    }

    fn retract(&mut self, id: MessageId) {
        let before = self.session.transcript.len();
        self.session.transcript.retain(|msg| msg.id != id);
        if self.session.transcript.len() != before {
            self.effects.push(Effect::RetractMessage { id });
        }
    }

    fn retract_suggestions(&mut self) {
        let stale: Vec<MessageId> = self
            .session
            .transcript
            .iter()
            .filter(|msg| matches!(msg.controls, Controls::Suggestions(_)))
            .map(|msg| msg.id)
            .collect();
        for id in stale {
            self.retract(id);
        }
    }

    fn finish(mut self) -> TransitionResult {
        if self.session.state != self.initial_state {
            self.effects.push(Effect::NotifyState {
                state: self.session.state,
            });
        }
        TransitionResult::new(self.session).with_effects(self.effects)
    }
}
