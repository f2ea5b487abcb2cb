//! Remote workbook API
//!
//! Every outbound call funnels through [`RetryExecutor`], whose retry
//! decisions come from [`ErrorClassifier`]. [`BatchMultiplexer`] groups
//! independent reads, and [`GraphClient`] wraps the typed calls.

pub mod batch;
pub mod classifier;
pub mod client;
pub mod models;
pub mod retry;
pub mod session;
pub mod transport;

pub use batch::{BatchMultiplexer, BatchResults, ResponseMapper, DEFAULT_BATCH_CAP};
pub use classifier::{ErrorClassifier, FailureDescription, RetryDecision, RETRY_HTTP_CODES, RETRY_MESSAGES};
pub use client::GraphClient;
pub use models::{DriveFile, SheetRef, Site, Worksheet, XLSX_MIME_TYPE};
pub use retry::{RetryExecutor, RetryPolicy, Sleeper};
pub use session::{EditingSession, GraphSessionProvider, NoSessionProvider, SessionProvider, SESSION_HEADER};
pub use transport::{
    AuthError, HttpRequest, HttpResponse, Method, ReqwestTransport, StaticTokenProvider, TokenProvider, Transport,
    TransportError,
};
