//! Writer: drives one CSV-like row stream into the configured worksheet

mod provider;

pub use provider::{SheetProvider, Workbook, WorkbookCreator};

use crate::api::{EditingSession, GraphClient, SessionProvider, SheetRef};
use crate::config::WriterConfig;
use crate::error::{SheetError, SheetResult};
use crate::insert::{InsertRowsManager, InsertSummary, Row};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct Writer<'a> {
    client: &'a GraphClient,
    sessions: &'a dyn SessionProvider,
    config: &'a WriterConfig,
}

impl<'a> Writer<'a> {
    pub fn new(client: &'a GraphClient, sessions: &'a dyn SessionProvider, config: &'a WriterConfig) -> Self {
        Self {
            client,
            sessions,
            config,
        }
    }

    /// Write `rows` (header first) into `sheet`.
    ///
    /// Returns `None` when the input has no header row. The editing session,
    /// if one could be opened, is closed whatever the outcome.
    pub fn write<I>(&self, sheet: &SheetRef, rows: I) -> SheetResult<Option<InsertSummary>>
    where
        I: IntoIterator<Item = SheetResult<Row>>,
    {
        let mut rows = rows.into_iter().peekable();
        let empty = match rows.peek() {
            None => true,
            Some(Ok(header)) => header.is_empty(),
            Some(Err(_)) => false,
        };
        if empty {
            warn!("Ignored empty input, no header row found.");
            return Ok(None);
        }

        let session = self.sessions.open(&sheet.drive_id, &sheet.file_id);
        let result = self.write_rows(sheet, rows, session.as_ref());
        if let Some(session) = &session {
            self.sessions.close(session);
        }
        result.map(Some)
    }

    fn write_rows<I>(&self, sheet: &SheetRef, rows: I, session: Option<&EditingSession>) -> SheetResult<InsertSummary>
    where
        I: IntoIterator<Item = SheetResult<Row>>,
    {
        if let Some(name) = self.config.worksheet.name.as_deref() {
            if name != sheet.name {
                self.client.rename_sheet(sheet, name, session)?;
                info!("Worksheet \"{}\" renamed to \"{}\".", sheet.name, name);
            }
        }

        InsertRowsManager::new(self.client).insert(sheet, self.config.append, rows, self.config.bulk_size, session)
    }
}

/// Stream a CSV file as rows, header first. Errors surface per row.
pub fn csv_rows(path: &Path) -> SheetResult<impl Iterator<Item = SheetResult<Row>>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    Ok(reader.into_records().map(|record| {
        record
            .map(|r| r.iter().map(str::to_string).collect())
            .map_err(SheetError::from)
    }))
}

/// The CSV file to write: `path` itself, or the only `*.csv` file in the
/// directory `path`.
pub fn input_csv(path: &Path) -> SheetResult<PathBuf> {
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();

    match files.len() {
        0 => Err(SheetError::Config(format!(
            "No CSV file found in \"{}\".",
            path.display()
        ))),
        1 => {
            let file = files.remove(0);
            info!("Found input CSV file \"{}\".", file.display());
            Ok(file)
        }
        _ => Err(SheetError::Config(format!(
            "Expected one CSV file, found multiple: {}.",
            crate::format::format_list(
                files
                    .iter()
                    .map(|f| f.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default())
            )
        ))),
    }
}
