//! Analysis session lifecycle
//!
//! Tracks the single in-flight analysis (idle → loading → success | error)
//! and publishes an immutable [`AnalysisSession`] snapshot after every
//! transition. Each submission is stamped with a generation; a reset bumps
//! it, so a response that arrives for an abandoned submission is ignored
//! instead of overwriting the new state.

use crate::models::{CanonicalImage, PromptResult};
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

const SNAPSHOT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Loading,
    Success,
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Loading => "loading",
            SessionStatus::Success => "success",
            SessionStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Status plus the payload that only exists in that status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Success(PromptResult),
    Error(String),
}

/// Snapshot of the current session, as seen by the presentation layer.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    state: SessionState,
    image: Option<Arc<CanonicalImage>>,
    generation: u64,
}

impl AnalysisSession {
    fn idle(generation: u64) -> Self {
        Self {
            state: SessionState::Idle,
            image: None,
            generation,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        match self.state {
            SessionState::Idle => SessionStatus::Idle,
            SessionState::Loading => SessionStatus::Loading,
            SessionState::Success(_) => SessionStatus::Success,
            SessionState::Error(_) => SessionStatus::Error,
        }
    }

    pub fn result(&self) -> Option<&PromptResult> {
        match &self.state {
            SessionState::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SessionState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// The image being (or last) analyzed; absent when idle.
    pub fn image(&self) -> Option<&CanonicalImage> {
        self.image.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }
}

/// Proof of one submission; completes it via `resolve` or `reject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

pub struct AnalysisStateMachine {
    current: Mutex<AnalysisSession>,
    events: broadcast::Sender<AnalysisSession>,
}

impl AnalysisStateMachine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            current: Mutex::new(AnalysisSession::idle(0)),
            events,
        }
    }

    pub fn snapshot(&self) -> AnalysisSession {
        self.lock().clone()
    }

    /// Receives every snapshot from now on, in transition order.
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisSession> {
        self.events.subscribe()
    }

    /// `idle | success | error → loading` with `image` as the current image.
    pub fn submit(&self, image: impl Into<Arc<CanonicalImage>>) -> Result<Ticket> {
        self.enter_loading(Some(image.into()))
    }

    /// Enters loading before the image is available, so a failed
    /// acquisition is still reported as `loading → error`.
    pub fn submit_pending(&self) -> Result<Ticket> {
        self.enter_loading(None)
    }

    /// Attaches the acquired image to a pending submission.
    ///
    /// Returns `Ok(false)` if the ticket went stale (the session was reset).
    pub fn record_image(&self, ticket: &Ticket, image: Arc<CanonicalImage>) -> Result<bool> {
        self.complete(ticket, "record image", |session| {
            session.image = Some(image);
        })
    }

    /// `loading → success`.
    pub fn resolve(&self, ticket: &Ticket, result: PromptResult) -> Result<bool> {
        self.complete(ticket, "resolve", |session| {
            session.state = SessionState::Success(result);
        })
    }

    /// `loading → error` with a short, user-presentable message.
    pub fn reject(&self, ticket: &Ticket, message: impl Into<String>) -> Result<bool> {
        let message = message.into();
        self.complete(ticket, "reject", |session| {
            session.state = SessionState::Error(message);
        })
    }

    /// Any state `→ idle`. Outstanding tickets become stale.
    pub fn reset(&self) {
        let mut current = self.lock();
        if current.is_loading() {
            tracing::info!(
                "Session reset while analysis {} was in flight; its result will be discarded",
                current.generation
            );
        }
        *current = AnalysisSession::idle(current.generation + 1);
        self.publish(&current);
    }

    fn enter_loading(&self, image: Option<Arc<CanonicalImage>>) -> Result<Ticket> {
        let mut current = self.lock();
        if current.is_loading() {
            tracing::warn!("Rejected submission: analysis {} still loading", current.generation);
            return Err(Error::SubmissionInFlight);
        }

        *current = AnalysisSession {
            state: SessionState::Loading,
            image,
            generation: current.generation + 1,
        };
        tracing::debug!("Session {} entered loading", current.generation);
        self.publish(&current);

        Ok(Ticket {
            generation: current.generation,
        })
    }

    fn complete<F>(&self, ticket: &Ticket, event: &'static str, apply: F) -> Result<bool>
    where
        F: FnOnce(&mut AnalysisSession),
    {
        let mut current = self.lock();
        if ticket.generation != current.generation {
            tracing::debug!(
                "Ignoring stale {} for analysis {} (current is {})",
                event,
                ticket.generation,
                current.generation
            );
            return Ok(false);
        }

        if !current.is_loading() {
            let status = current.status();
            tracing::warn!("Invalid session transition: {} while {}", event, status);
            return Err(Error::InvalidTransition { status, event });
        }

        apply(&mut *current);
        tracing::debug!("Session {} is now {}", current.generation, current.status());
        self.publish(&current);
        Ok(true)
    }

    fn publish(&self, session: &AnalysisSession) {
        // No subscribers is fine; snapshot() still reflects the state.
        let _ = self.events.send(session.clone());
    }

    fn lock(&self) -> MutexGuard<'_, AnalysisSession> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AnalysisStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
