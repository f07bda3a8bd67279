//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{ChatHandle, ChatWidget, RuntimeSettings, WidgetEvent};
use crate::curriculum::Curriculum;
use crate::lead::LeadRecord;
use crate::responder::{Reply, TopicTable};
use crate::speech::Utterance;
use crate::state_machine::{ConvState, InputHint, Message};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Resolver
// ============================================================================

/// Mock resolver that returns queued replies
pub struct MockResolver {
    responses: Mutex<VecDeque<Result<Reply, ResolveError>>>,
    /// Record of all queries made
    pub queries: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_reply(&self, reply: Reply) {
        self.responses.lock().unwrap().push_back(Ok(reply));
    }

    pub fn queue_error(&self, error: ResolveError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn next(&self, query: &str) -> Result<Reply, ResolveError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ResolveError::Unavailable("No mock reply queued".into())))
    }
}

impl Default for MockResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryResolver for MockResolver {
    async fn resolve(&self, query: &str) -> Result<Reply, ResolveError> {
        self.next(query)
    }
}

/// Mock resolver with a fixed latency (for testing busy input and resets)
pub struct DelayedMockResolver {
    inner: MockResolver,
    delay: Duration,
    /// Notified when a lookup starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl DelayedMockResolver {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockResolver::new(),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_reply(&self, reply: Reply) {
        self.inner.queue_reply(reply);
    }
}

#[async_trait]
impl QueryResolver for DelayedMockResolver {
    async fn resolve(&self, query: &str) -> Result<Reply, ResolveError> {
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.next(query)
    }
}

// ============================================================================
// Recording collaborators
// ============================================================================

/// Speaker that keeps every utterance it was asked to say
#[derive(Default)]
pub struct RecordingSpeaker {
    utterances: Mutex<Vec<Utterance>>,
}

impl RecordingSpeaker {
    pub fn spoken(&self) -> Vec<Utterance> {
        self.utterances.lock().unwrap().clone()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, utterance: Utterance, cancel: CancellationToken) {
        if !cancel.is_cancelled() {
            self.utterances.lock().unwrap().push(utterance);
        }
    }
}

/// Lead sink that keeps leads in memory, or fails on demand
#[derive(Default)]
pub struct RecordingLeadSink {
    leads: Mutex<Vec<(String, LeadRecord)>>,
    failing: bool,
}

impl RecordingLeadSink {
    pub fn failing() -> Self {
        Self {
            leads: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn leads(&self) -> Vec<(String, LeadRecord)> {
        self.leads.lock().unwrap().clone()
    }
}

#[async_trait]
impl LeadSink for RecordingLeadSink {
    async fn persist_lead(&self, session_id: &str, lead: &LeadRecord) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::Io(std::io::Error::other("disk full")));
        }
        self.leads
            .lock()
            .unwrap()
            .push((session_id.to_string(), lead.clone()));
        Ok(())
    }
}

// ============================================================================
// Test Widget Builder
// ============================================================================

/// An open widget plus its mocks, mirroring what a renderer would show
pub struct TestWidget<R: QueryResolver + 'static> {
    pub handle: ChatHandle,
    pub resolver: Arc<R>,
    pub speaker: Arc<RecordingSpeaker>,
    pub leads: Arc<RecordingLeadSink>,
    pub messages: Vec<Message>,
    pub rejections: Vec<String>,
    pub state: Option<ConvState>,
    pub hint: Option<InputHint>,
    pub closed: bool,
}

impl TestWidget<MockResolver> {
    /// Create a test widget with instant mocks
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> TestWidgetBuilder<MockResolver> {
        TestWidgetBuilder::new()
    }
}

pub struct TestWidgetBuilder<R> {
    resolver: R,
    leads: RecordingLeadSink,
    settings: RuntimeSettings,
    curriculum: Curriculum,
    topics: TopicTable,
}

impl TestWidgetBuilder<MockResolver> {
    pub fn new() -> Self {
        Self {
            resolver: MockResolver::new(),
            leads: RecordingLeadSink::default(),
            settings: RuntimeSettings {
                close_delay: Duration::from_millis(20),
                speak_delay: Duration::ZERO,
                ..RuntimeSettings::default()
            },
            curriculum: Curriculum::default(),
            topics: TopicTable::default(),
        }
    }
}

impl Default for TestWidgetBuilder<MockResolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: QueryResolver + 'static> TestWidgetBuilder<R> {
    pub fn resolver<R2: QueryResolver + 'static>(self, resolver: R2) -> TestWidgetBuilder<R2> {
        TestWidgetBuilder {
            resolver,
            leads: self.leads,
            settings: self.settings,
            curriculum: self.curriculum,
            topics: self.topics,
        }
    }

    pub fn curriculum(mut self, curriculum: Curriculum) -> Self {
        self.curriculum = curriculum;
        self
    }

    pub fn topics(mut self, topics: TopicTable) -> Self {
        self.topics = topics;
        self
    }

    pub fn leads(mut self, leads: RecordingLeadSink) -> Self {
        self.leads = leads;
        self
    }

    pub fn close_delay(mut self, delay: Duration) -> Self {
        self.settings.close_delay = delay;
        self
    }

    pub fn speak_delay(mut self, delay: Duration) -> Self {
        self.settings.speak_delay = delay;
        self
    }

    pub fn build(self) -> TestWidget<R> {
        let resolver = Arc::new(self.resolver);
        let speaker = Arc::new(RecordingSpeaker::default());
        let leads = Arc::new(self.leads);

        let widget = ChatWidget::new(
            resolver.clone(),
            speaker.clone(),
            leads.clone(),
            self.settings,
        )
        .with_curriculum(self.curriculum)
        .with_topics(self.topics);

        TestWidget {
            handle: widget.open(),
            resolver,
            speaker,
            leads,
            messages: Vec::new(),
            rejections: Vec::new(),
            state: None,
            hint: None,
            closed: false,
        }
    }
}

impl<R: QueryResolver + 'static> TestWidget<R> {
    pub async fn say(&self, text: &str) {
        self.handle
            .submit_text(text)
            .await
            .expect("Failed to submit text");
    }

    fn record(&mut self, event: &WidgetEvent) {
        match event {
            WidgetEvent::Message { message } => self.messages.push(message.clone()),
            WidgetEvent::Retracted { id } => self.messages.retain(|msg| msg.id != *id),
            WidgetEvent::StateChanged { state, hint } => {
                self.state = Some(*state);
                self.hint = Some(hint.clone());
            }
            WidgetEvent::Rejected { reason } => self.rejections.push(reason.clone()),
            WidgetEvent::Cleared => self.messages.clear(),
            WidgetEvent::Closed => self.closed = true,
        }
    }

    /// Consume events until one matches, with timeout
    pub async fn wait_for(
        &mut self,
        matches: impl Fn(&WidgetEvent) -> bool,
        timeout: Duration,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match tokio::time::timeout(remaining, self.handle.next_event()).await {
                Ok(Some(event)) => {
                    self.record(&event);
                    if matches(&event) {
                        return true;
                    }
                }
                Ok(None) | Err(_) => return false,
            }
        }
    }

    /// Wait for a specific state (by snake_case name) with timeout
    pub async fn wait_for_state(&mut self, expected: &str, timeout: Duration) -> bool {
        self.wait_for(
            |event| matches!(event, WidgetEvent::StateChanged { state, .. } if state.name() == expected),
            timeout,
        )
        .await
    }

    /// Wait for an assistant message containing `needle`
    pub async fn wait_for_message(&mut self, needle: &str, timeout: Duration) -> bool {
        self.wait_for(
            |event| {
                matches!(event, WidgetEvent::Message { message }
                    if message.is_assistant() && message.text.contains(needle))
            },
            timeout,
        )
        .await
    }

    pub async fn wait_for_closed(&mut self, timeout: Duration) -> bool {
        self.wait_for(|event| matches!(event, WidgetEvent::Closed), timeout)
            .await
    }

    /// Consume whatever arrives within `window`
    pub async fn drain(&mut self, window: Duration) {
        self.wait_for(|_| false, window).await;
    }

    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().map(|msg| msg.text.as_str()).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::SuggestionId;
    use crate::speech::LanguageTag;
    use crate::state_machine::Choice;

    const WAIT: Duration = Duration::from_secs(2);

    /// Walk the lead form from a fresh widget
    async fn complete_lead_form<R: QueryResolver + 'static>(widget: &mut TestWidget<R>) {
        widget.say("no").await;
        assert!(widget.wait_for_state("lead_name", WAIT).await);
        widget.say("Asha Rao").await;
        assert!(widget.wait_for_state("lead_email", WAIT).await);
        widget.say("asha@example.com").await;
        assert!(widget.wait_for_state("lead_phone", WAIT).await);
        widget.say("98765 43210").await;
        assert!(widget.wait_for_state("show_suggestions", WAIT).await);
    }

    #[tokio::test]
    async fn test_mock_resolver() {
        let mock = MockResolver::new();
        mock.queue_reply(Reply::plain("Paani"));

        let first = mock.resolve("water?").await.unwrap();
        assert_eq!(first.text, "Paani");

        // Nothing left in the queue
        assert!(matches!(
            mock.resolve("again").await,
            Err(ResolveError::Unavailable(_))
        ));
        assert_eq!(mock.recorded_queries(), vec!["water?", "again"]);
    }

    #[tokio::test]
    async fn test_simulated_resolver_applies_rules() {
        let resolver = SimulatedResolver::new(Duration::ZERO);
        let reply = resolver.resolve("What is the word for food?").await.unwrap();
        assert!(reply.text.contains("Khaana"));

        let reply = resolver.resolve("Dosa recipe").await.unwrap();
        assert!(reply.text.contains("**Dosa**"));
    }

    #[tokio::test]
    async fn test_greeting_on_open() {
        let mut widget = TestWidget::new().build();

        assert!(widget.wait_for_message("Namaste", WAIT).await);
        assert!(widget.wait_for_state("guided_learning", WAIT).await);
        assert_eq!(
            widget.hint.as_ref().map(|h| h.placeholder.as_str()),
            Some("Type 'NEXT' to proceed...")
        );

        // Greeting is spoken in Hindi with the default voice
        tokio::time::sleep(Duration::from_millis(50)).await;
        let spoken = widget.speaker.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].language, LanguageTag::Hindi);
        assert!((spoken[0].voice.rate - 0.8).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_full_funnel_persists_lead_and_closes() {
        let mut widget = TestWidget::new().build();
        complete_lead_form(&mut widget).await;

        let leads = widget.leads.leads();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].0, widget.handle.session_id());
        assert_eq!(leads[0].1.name(), Some("Asha Rao"));
        assert_eq!(leads[0].1.email(), Some("asha@example.com"));
        assert_eq!(leads[0].1.phone(), Some("98765 43210"));

        // Courses are answered from the local topic table
        widget.handle.pick_suggestion(SuggestionId(0)).await.unwrap();
        assert!(widget.wait_for_state("query_or_end", WAIT).await);
        assert!(widget.texts().iter().any(|t| t.contains("Our Hindi Courses")));
        assert!(widget.resolver.recorded_queries().is_empty());

        widget.handle.submit_choice(Choice::No).await.unwrap();
        assert!(widget.wait_for_state("closing", WAIT).await);
        assert!(widget.wait_for_closed(WAIT).await);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!widget.handle.is_running());
    }

    #[tokio::test]
    async fn test_lookup_shows_placeholder_then_answer() {
        let mut widget = TestWidget::new().build();
        widget.resolver.queue_reply(Reply::plain("Water is **Paani** (पानी)."));
        assert!(widget.wait_for_state("guided_learning", WAIT).await);

        widget.say("how do I say water").await;

        // Typing indicator while the lookup runs
        assert!(
            widget
                .wait_for(
                    |e| matches!(e, WidgetEvent::Message { message } if message.placeholder),
                    WAIT
                )
                .await
        );
        assert!(widget.wait_for_message("Paani", WAIT).await);
        assert!(widget.wait_for_message("To proceed", WAIT).await);
        widget.drain(Duration::from_millis(50)).await;

        assert!(widget.messages.iter().all(|m| !m.placeholder));
        assert_eq!(widget.resolver.recorded_queries(), vec!["how do I say water"]);
        assert_eq!(
            widget.state,
            Some(ConvState::GuidedLearning { interrupted: true })
        );
        assert!(widget.hint.as_ref().is_some_and(|h| h.enabled));
    }

    #[tokio::test]
    async fn test_lookup_failure_apologises() {
        let mut widget = TestWidget::new().build();
        widget
            .resolver
            .queue_error(ResolveError::Unavailable("503".into()));
        complete_lead_form(&mut widget).await;

        widget.say("how do I say water").await;
        assert!(widget.wait_for_message("currently unavailable", WAIT).await);
        assert!(widget.wait_for_state("general_query", WAIT).await);

        // Still usable afterwards
        widget.say("fees?").await;
        assert!(widget.wait_for_state("query_or_end", WAIT).await);
        assert!(widget.texts().iter().any(|t| t.contains("Course Fees")));
    }

    #[tokio::test]
    async fn test_input_rejected_while_lookup_pending() {
        let resolver = DelayedMockResolver::new(Duration::from_millis(300));
        resolver.queue_reply(Reply::plain("Water is Paani."));
        let started = resolver.request_started.clone();
        let mut widget = TestWidget::new().resolver(resolver).build();

        widget.say("how do I say water").await;
        tokio::time::timeout(WAIT, started.notified())
            .await
            .expect("lookup should start");

        widget.say("NEXT").await;
        assert!(
            widget
                .wait_for(|e| matches!(e, WidgetEvent::Rejected { .. }), WAIT)
                .await
        );
        assert_eq!(widget.rejections, vec!["Still answering the previous question"]);
        assert_eq!(
            widget.hint.as_ref().map(|h| (h.placeholder.as_str(), h.enabled)),
            Some(("Typing...", false))
        );

        // Once the answer lands the input opens again
        assert!(widget.wait_for_message("Paani", WAIT).await);
        widget.say("NEXT").await;
        assert!(widget.wait_for_message("Lesson 2", WAIT).await);
    }

    #[tokio::test]
    async fn test_reset_drops_pending_lookup() {
        let resolver = DelayedMockResolver::new(Duration::from_millis(100));
        resolver.queue_reply(Reply::plain("late answer"));
        let started = resolver.request_started.clone();
        let mut widget = TestWidget::new().resolver(resolver).build();

        widget.say("how do I say water").await;
        tokio::time::timeout(WAIT, started.notified())
            .await
            .expect("lookup should start");

        widget.handle.reset().await.unwrap();
        assert!(
            widget
                .wait_for(|e| matches!(e, WidgetEvent::Cleared), WAIT)
                .await
        );
        assert!(widget.wait_for_message("Namaste", WAIT).await);

        widget.drain(Duration::from_millis(300)).await;
        assert!(!widget.texts().iter().any(|t| t.contains("late answer")));
        assert_eq!(widget.messages.len(), 1);
        assert_eq!(
            widget.state,
            Some(ConvState::GuidedLearning { interrupted: false })
        );
    }

    #[tokio::test]
    async fn test_termination_keyword_closes_after_lead() {
        let mut widget = TestWidget::new()
            .close_delay(Duration::from_millis(300))
            .build();
        complete_lead_form(&mut widget).await;

        // Name is known, so a termination keyword goes straight to the farewell
        widget.say("bye").await;
        assert!(widget.wait_for_state("closing", WAIT).await);

        // Input during the farewell is refused
        widget.say("wait").await;
        assert!(
            widget
                .wait_for(|e| matches!(e, WidgetEvent::Rejected { .. }), WAIT)
                .await
        );
        assert_eq!(widget.rejections, vec!["Chat is closing"]);
        assert!(widget.wait_for_closed(WAIT).await);
    }

    #[tokio::test]
    async fn test_stop_speaking_cancels_pending_utterance() {
        let mut widget = TestWidget::new()
            .speak_delay(Duration::from_millis(200))
            .build();
        assert!(widget.wait_for_message("Namaste", WAIT).await);

        widget.handle.stop_speaking().await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(widget.speaker.spoken().is_empty());
        // Conversation is untouched
        widget.say("yes").await;
        assert!(widget.wait_for_message("Lesson 1", WAIT).await);
    }

    #[tokio::test]
    async fn test_lead_sink_failure_is_not_fatal() {
        let mut widget = TestWidget::new()
            .leads(RecordingLeadSink::failing())
            .build();
        complete_lead_form(&mut widget).await;

        assert!(widget.leads.leads().is_empty());
        assert!(widget.texts().iter().any(|t| t.starts_with("Perfect, thank you")));
        assert!(!widget.texts().iter().any(|t| t.contains("saved")));
        assert!(widget.handle.is_running());
    }

    #[tokio::test]
    async fn test_replay_reads_message_again() {
        let mut widget = TestWidget::new().build();
        assert!(widget.wait_for_message("Namaste", WAIT).await);
        let greeting = widget.messages[0].id;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(widget.speaker.spoken().len(), 1);

        widget.handle.replay(greeting).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let spoken = widget.speaker.spoken();
        assert_eq!(spoken.len(), 2);
        assert_eq!(spoken[1].text, spoken[0].text);
        assert_eq!(spoken[1].language, LanguageTag::Hindi);

        // Visitor messages have nothing to read aloud
        widget.say("yes").await;
        assert!(widget.wait_for_message("Lesson 1", WAIT).await);
        let echo = widget
            .messages
            .iter()
            .find(|m| !m.is_assistant())
            .map(|m| m.id)
            .unwrap();
        widget.handle.replay(echo).await.unwrap();
        assert!(
            widget
                .wait_for(|e| matches!(e, WidgetEvent::Rejected { .. }), WAIT)
                .await
        );
        assert_eq!(
            widget.rejections,
            vec![format!("Message {} cannot be read aloud", echo.0)]
        );
    }

    #[tokio::test]
    async fn test_stop_speaking_cancels_replay() {
        let mut widget = TestWidget::new()
            .speak_delay(Duration::from_millis(200))
            .build();
        assert!(widget.wait_for_message("Namaste", WAIT).await);
        let greeting = widget.messages[0].id;
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(widget.speaker.spoken().len(), 1);

        widget.handle.replay(greeting).await.unwrap();
        widget.handle.stop_speaking().await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(widget.speaker.spoken().len(), 1);
    }

    fn is_water(lower: &str) -> bool {
        lower.contains("water")
    }

    fn water_reply(_input: &str) -> Reply {
        Reply::new("Water is **Paani** (पानी).", "पानी")
    }

    #[tokio::test]
    async fn test_custom_course_content() {
        use crate::curriculum::Lesson;
        use crate::responder::{Rule, RuleSet, TopicEntry};

        let curriculum = Curriculum::new(vec![Lesson::new(
            "Colours",
            "**Colours**\n\nRed: **Laal** (लाल)",
            "Red is laal",
            "GO",
        )])
        .unwrap();
        let topics = TopicTable::new(vec![TopicEntry::new(
            "mango|aam",
            Reply::new("Mango is **Aam** (आम).", "आम"),
        )]);
        let rules = RuleSet::new(vec![Rule {
            name: "water",
            predicate: is_water,
            respond: water_reply,
        }]);

        let mut widget = TestWidget::new()
            .resolver(SimulatedResolver::new(Duration::ZERO).with_rules(rules))
            .curriculum(curriculum)
            .topics(topics)
            .build();
        // A second renderer sees the same stream
        let mut mirror = widget.handle.subscribe();
        assert!(widget.wait_for_state("guided_learning", WAIT).await);
        assert_eq!(
            widget.hint.as_ref().map(|h| h.placeholder.as_str()),
            Some("Type 'GO' to proceed...")
        );

        widget.say("yes").await;
        assert!(widget.wait_for_message("**Colours**", WAIT).await);

        widget.say("what is water").await;
        assert!(widget.wait_for_message("Paani", WAIT).await);
        assert!(widget.wait_for_message("type **GO**", WAIT).await);

        widget.say("mango?").await;
        assert!(widget.wait_for_message("Aam", WAIT).await);

        // Single-lesson course: its token finishes the lessons
        widget.say("go").await;
        assert!(widget.wait_for_state("lead_name", WAIT).await);
        assert!(widget
            .texts()
            .iter()
            .any(|t| t.starts_with("That completes your lessons")));

        let mut mirrored = 0;
        while let Ok(event) = mirror.try_recv() {
            if matches!(event, WidgetEvent::Message { .. }) {
                mirrored += 1;
            }
        }
        assert!(mirrored >= 8, "mirror saw {mirrored} messages");
    }

    #[tokio::test]
    async fn test_close_command_stops_runtime() {
        let mut widget = TestWidget::new().build();
        assert!(widget.wait_for_message("Namaste", WAIT).await);

        widget.handle.close().await;
        assert!(!widget.handle.is_running());
        assert!(widget.handle.submit_text("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_jsonl_lead_sink_appends_lines() {
        use crate::lead::LeadField;

        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlLeadSink::new(dir.path().join("leads.jsonl"));

        let mut lead = LeadRecord::default();
        lead.record(LeadField::Name, "Asha Rao".into()).unwrap();
        lead.record(LeadField::Email, "asha@example.com".into()).unwrap();
        lead.record(LeadField::Phone, "98765 43210".into()).unwrap();

        sink.persist_lead("session-1", &lead).await.unwrap();
        sink.persist_lead("session-2", &lead).await.unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["session_id"], "session-1");
        assert_eq!(lines[1]["session_id"], "session-2");
        assert_eq!(lines[0]["email"], "asha@example.com");
        assert!(lines[0]["captured_at"].is_string());
    }

    #[tokio::test]
    async fn test_jsonl_lead_sink_rejects_incomplete_lead() {
        use crate::lead::LeadField;

        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlLeadSink::new(dir.path().join("leads.jsonl"));

        let mut lead = LeadRecord::default();
        lead.record(LeadField::Name, "Asha Rao".into()).unwrap();

        assert!(matches!(
            sink.persist_lead("session-1", &lead).await,
            Err(SinkError::Incomplete)
        ));
        assert!(!sink.path().exists());
    }
}
