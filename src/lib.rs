//! Sheetwriter - write CSV tables into Excel workbooks over the Graph API
//!
//! This library resolves a workbook on OneDrive or SharePoint, picks a
//! worksheet and writes a row stream into it in bounded chunks, either
//! replacing the sheet content or appending below it.
//!
//! # Features
//!
//! - Workbook locators: drive paths, `drive://`, `site://` and sharing links
//! - Retries with exponential backoff and a `Retry-After` ceiling
//! - `$batch` multiplexing with lazy, paginated results
//! - Header drift detection and formula-injection escaping
//! - Workbook editing sessions
//!
//! # Example
//!
//! ```no_run
//! use royalbit_sheetwriter::api::{GraphClient, NoSessionProvider, ReqwestTransport, RetryExecutor, StaticTokenProvider};
//! use royalbit_sheetwriter::config::{ClientConfig, WriterConfig};
//! use royalbit_sheetwriter::writer::{csv_rows, SheetProvider, Writer};
//! use std::path::Path;
//!
//! let config = WriterConfig::from_path(Path::new("config.json"))?;
//! let client_config = config.client_config();
//! let executor = RetryExecutor::new(
//!     ReqwestTransport::new(client_config.timeout)?,
//!     StaticTokenProvider::new("token"),
//!     client_config.base_url,
//!     client_config.retry,
//! );
//! let client = GraphClient::new(executor, client_config.batch_cap);
//!
//! let sheet = SheetProvider::new(&client, &config).sheet()?;
//! let summary = Writer::new(&client, &NoSessionProvider, &config)
//!     .write(&sheet, csv_rows(Path::new("data.csv"))?)?;
//! println!("{:?}", summary);
//! # Ok::<(), royalbit_sheetwriter::error::SheetError>(())
//! ```

pub mod address;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod insert;
pub mod workbooks;
pub mod writer;

// Re-export commonly used types
pub use address::{TableHeader, TableRange};
pub use error::{SheetError, SheetResult};
pub use insert::{InsertRowsManager, InsertSummary, Row};
pub use workbooks::{Locator, Resolution, WorkbooksResolver};
