//! Workbook editing sessions
//!
//! A session batches a run of writes into one persisted change set. Opening
//! is allowed to fail: the writer then proceeds without a session. Closing
//! is best-effort and never fails the run.

use super::retry::RetryExecutor;
use super::transport::Method;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Header carrying the session id on every workbook call
pub const SESSION_HEADER: &str = "Workbook-Session-Id";

const CREATE_SESSION: &str = "/drives/{driveId}/items/{fileId}/workbook/createSession";
const CLOSE_SESSION: &str = "/drives/{driveId}/items/{fileId}/workbook/closeSession";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLLS: u32 = 150;

/// An open session bound to one workbook. The id is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditingSession {
    drive_id: String,
    file_id: String,
    id: String,
}

impl EditingSession {
    pub fn new(drive_id: impl Into<String>, file_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            drive_id: drive_id.into(),
            file_id: file_id.into(),
            id: id.into(),
        }
    }

    pub fn drive_id(&self) -> &str {
        &self.drive_id
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn header(&self) -> (&'static str, &str) {
        (SESSION_HEADER, &self.id)
    }
}

pub trait SessionProvider {
    /// `None` means "proceed without a session"
    fn open(&self, drive_id: &str, file_id: &str) -> Option<EditingSession>;

    /// Best-effort; failures are logged only
    fn close(&self, session: &EditingSession);
}

/// Never opens a session
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSessionProvider;

impl SessionProvider for NoSessionProvider {
    fn open(&self, _drive_id: &str, _file_id: &str) -> Option<EditingSession> {
        None
    }

    fn close(&self, _session: &EditingSession) {}
}

/// Sessions created through the workbook API
pub struct GraphSessionProvider<'a> {
    executor: &'a RetryExecutor,
    poll_interval: Duration,
}

impl<'a> GraphSessionProvider<'a> {
    pub fn new(executor: &'a RetryExecutor) -> Self {
        Self {
            executor,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Wait for a long-running session creation, then read the session id
    fn poll(&self, location: &str) -> Option<String> {
        for _ in 0..MAX_POLLS {
            let operation = match self.executor.get(location, &[]) {
                Ok(operation) => operation,
                Err(e) => {
                    warn!("Cannot check session status: {}", e);
                    return None;
                }
            };

            match operation["status"].as_str() {
                Some("running") | Some("notStarted") => {
                    debug!("Session creation still running");
                    std::thread::sleep(self.poll_interval);
                }
                Some("succeeded") => {
                    let resource = operation["resourceLocation"].as_str()?;
                    return match self.executor.get(resource, &[]) {
                        Ok(session) => session_id(&session),
                        Err(e) => {
                            warn!("Cannot load created session: {}", e);
                            None
                        }
                    };
                }
                other => {
                    warn!("Session creation ended with status {:?}", other);
                    return None;
                }
            }
        }

        warn!("Session creation did not finish after {} checks", MAX_POLLS);
        None
    }
}

impl SessionProvider for GraphSessionProvider<'_> {
    fn open(&self, drive_id: &str, file_id: &str) -> Option<EditingSession> {
        let response = match self.executor.execute(
            Method::Post,
            CREATE_SESSION,
            &[("driveId", drive_id), ("fileId", file_id)],
            Some(&json!({ "persistChanges": true })),
            &[("Prefer", "respond-async")],
        ) {
            Ok(response) => response,
            Err(e) => {
                warn!("Cannot create session, continuing without it: {}", e);
                return None;
            }
        };

        let id = match response.status {
            201 => response.json().ok().as_ref().and_then(session_id),
            202 => response.header("location").and_then(|location| self.poll(location)),
            status => {
                warn!(status, "Unexpected session response, continuing without session");
                None
            }
        }?;

        info!("Session created.");
        Some(EditingSession::new(drive_id, file_id, id))
    }

    fn close(&self, session: &EditingSession) {
        let result = self.executor.execute(
            Method::Post,
            CLOSE_SESSION,
            &[("driveId", session.drive_id()), ("fileId", session.file_id())],
            Some(&json!({})),
            &[session.header()],
        );

        match result {
            Ok(_) => info!("Session closed."),
            Err(e) => warn!("Cannot close session: {}", e),
        }
    }
}

fn session_id(body: &Value) -> Option<String> {
    body["id"].as_str().map(str::to_string)
}
