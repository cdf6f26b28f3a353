//! Capture session
//!
//! A `Session` collects events from any number of threads until it is stopped.
//! Writers take a cheap atomic look at the stopped flag first and re-check
//! under the lock before appending; `stop` copies the event list under the
//! same lock, so a report never sees a half-appended event.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::event::{Event, Metadata};
use crate::options::{CaptureSource, Options};
use crate::report::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Running,
    Stopped,
    /// Torn down without producing a report. Implies stopped.
    Disposed,
}

#[derive(Debug)]
struct State {
    lifecycle: Lifecycle,
    events: Vec<Event>,
    stopped_at: Option<OffsetDateTime>,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    options: Arc<Options>,
    started_at: OffsetDateTime,
    stopped: AtomicBool,
    state: Mutex<State>,
}

impl Session {
    pub fn start(options: Options) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            options: Arc::new(options),
            started_at: OffsetDateTime::now_utc(),
            stopped: AtomicBool::new(false),
            state: Mutex::new(State {
                lifecycle: Lifecycle::Running,
                events: Vec::new(),
                stopped_at: None,
            }),
        };
        tracing::debug!(session = %session.id, "capture session started");
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record one execution using the global text capture toggle.
    pub fn record(&self, text: &str, duration: Duration, metadata: Option<Metadata>) -> Result<()> {
        self.append(self.options.captures_text(), text, duration, metadata)
    }

    /// Record one execution on behalf of an adapter, honouring its override.
    pub fn record_from(
        &self,
        source: CaptureSource,
        text: &str,
        duration: Duration,
        metadata: Option<Metadata>,
    ) -> Result<()> {
        self.append(self.options.captures_text_for(source), text, duration, metadata)
    }

    fn append(
        &self,
        capture_text: bool,
        text: &str,
        duration: Duration,
        metadata: Option<Metadata>,
    ) -> Result<()> {
        // Fast path for a draining session; the locked check below is the real one.
        if self.is_stopped() {
            return Err(SessionError::SessionStopped);
        }

        let text = if capture_text {
            self.options.redactors().apply(text)
        } else {
            String::new()
        };
        let event = Event::new(text, duration, OffsetDateTime::now_utc(), metadata);

        let mut state = self.state.lock();
        if state.lifecycle != Lifecycle::Running {
            return Err(SessionError::SessionStopped);
        }
        state.events.push(event);
        Ok(())
    }

    /// Stop the session and take its report. Succeeds exactly once.
    pub fn stop(&self) -> Result<Report> {
        let mut state = self.state.lock();
        if state.lifecycle != Lifecycle::Running {
            return Err(SessionError::AlreadyStopped);
        }

        let stopped_at = OffsetDateTime::now_utc();
        state.lifecycle = Lifecycle::Stopped;
        state.stopped_at = Some(stopped_at);
        self.stopped.store(true, Ordering::Release);
        let events = state.events.clone();
        drop(state);

        tracing::debug!(session = %self.id, events = events.len(), "capture session stopped");

        Ok(Report::new(
            self.id,
            self.started_at,
            stopped_at,
            Arc::clone(&self.options),
            events,
        ))
    }

    /// Tear the session down. Idempotent, never fails, never yields a report.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        if state.lifecycle == Lifecycle::Running {
            state.lifecycle = Lifecycle::Disposed;
            state.stopped_at = Some(OffsetDateTime::now_utc());
            self.stopped.store(true, Ordering::Release);
            tracing::debug!(
                session = %self.id,
                dropped_events = state.events.len(),
                "capture session disposed without stop"
            );
        }
    }

    pub fn stopped_at(&self) -> Option<OffsetDateTime> {
        self.state.lock().stopped_at
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}
