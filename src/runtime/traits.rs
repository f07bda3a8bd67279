//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::lead::LeadRecord;
use crate::responder::{Reply, RuleSet};
use crate::speech::Utterance;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Lookup failure. Becomes the apology message, never ends the chat.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Lookup service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to encode lead: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to write lead file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Lead is incomplete")]
    Incomplete,
}

/// Answers free-form questions that the topic table does not cover
#[async_trait]
pub trait QueryResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Reply, ResolveError>;
}

/// Text-to-speech output
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Speak one utterance. Implementations stop early once `cancel` fires.
    async fn speak(&self, utterance: Utterance, cancel: CancellationToken);
}

/// Storage for completed leads
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn persist_lead(&self, session_id: &str, lead: &LeadRecord) -> Result<(), SinkError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: QueryResolver + ?Sized> QueryResolver for Arc<T> {
    async fn resolve(&self, query: &str) -> Result<Reply, ResolveError> {
        (**self).resolve(query).await
    }
}

#[async_trait]
impl<T: Speaker + ?Sized> Speaker for Arc<T> {
    async fn speak(&self, utterance: Utterance, cancel: CancellationToken) {
        (**self).speak(utterance, cancel).await;
    }
}

#[async_trait]
impl<T: LeadSink + ?Sized> LeadSink for Arc<T> {
    async fn persist_lead(&self, session_id: &str, lead: &LeadRecord) -> Result<(), SinkError> {
        (**self).persist_lead(session_id, lead).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Stand-in for the remote answer service: waits, then applies the
/// heuristic rule list
pub struct SimulatedResolver {
    rules: RuleSet,
    delay: Duration,
}

impl SimulatedResolver {
    pub fn new(delay: Duration) -> Self {
        Self {
            rules: RuleSet::academy(),
            delay,
        }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }
}

#[async_trait]
impl QueryResolver for SimulatedResolver {
    async fn resolve(&self, query: &str) -> Result<Reply, ResolveError> {
        tokio::time::sleep(self.delay).await;
        let rule = self.rules.classify(query);
        tracing::debug!(rule, "Simulated lookup answered");
        Ok(self.rules.answer(query))
    }
}

/// Speaker that only logs what would have been said
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSpeaker;

#[async_trait]
impl Speaker for LoggingSpeaker {
    async fn speak(&self, utterance: Utterance, cancel: CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        tracing::info!(
            lang = %utterance.language,
            rate = utterance.voice.rate,
            pitch = utterance.voice.pitch,
            text = %utterance.text,
            "Speaking"
        );
    }
}

/// Default lead sink: the lead only shows up in the logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingLeadSink;

#[async_trait]
impl LeadSink for LoggingLeadSink {
    async fn persist_lead(&self, session_id: &str, lead: &LeadRecord) -> Result<(), SinkError> {
        let stored = StoredLead::from_record(session_id, lead)?;
        tracing::info!(
            session_id,
            name = stored.name,
            email = stored.email,
            phone = stored.phone,
            "Lead captured"
        );
        Ok(())
    }
}

/// One line of the JSONL lead file
#[derive(Debug, Serialize)]
struct StoredLead<'a> {
    session_id: &'a str,
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    captured_at: DateTime<Utc>,
}

impl<'a> StoredLead<'a> {
    fn from_record(session_id: &'a str, lead: &'a LeadRecord) -> Result<Self, SinkError> {
        match (lead.name(), lead.email(), lead.phone()) {
            (Some(name), Some(email), Some(phone)) => Ok(Self {
                session_id,
                name,
                email,
                phone,
                captured_at: Utc::now(),
            }),
            _ => Err(SinkError::Incomplete),
        }
    }
}

/// Appends one JSON object per lead to a file
pub struct JsonlLeadSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlLeadSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LeadSink for JsonlLeadSink {
    async fn persist_lead(&self, session_id: &str, lead: &LeadRecord) -> Result<(), SinkError> {
        let stored = StoredLead::from_record(session_id, lead)?;
        let mut line = serde_json::to_string(&stored)?;
        line.push('\n');

        // Concurrent widgets share the file; keep lines whole
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::info!(session_id, path = %self.path.display(), "Lead appended");
        Ok(())
    }
}
