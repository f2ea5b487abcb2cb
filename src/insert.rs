//! Incremental row insertion
//!
//! Writes a forward-only row stream into a worksheet in bounded chunks,
//! either replacing the sheet content or appending below the used range.
//! Chunks already written stay written when a later chunk fails.

use crate::address::{column_letters_to_number, column_number_to_letters, TableHeader, TableRange};
use crate::api::{EditingSession, GraphClient, SheetRef};
use crate::error::{SheetError, SheetResult};
use crate::format::format_list;
use serde_json::Value;
use tracing::{info, warn};

/// One row of cells; the first row of a stream is the header
pub type Row = Vec<String>;

/// What an insertion did to the sheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertSummary {
    /// The previous content was cleared first
    pub sheet_cleared: bool,
    /// Rows written, the header row included when it was written
    pub rows: usize,
    pub chunks: usize,
}

/// Top-left corner of the next chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InsertionCursor {
    start_column: u32,
    start_row: u32,
}

impl InsertionCursor {
    fn origin() -> Self {
        Self {
            start_column: 1,
            start_row: 1,
        }
    }

    /// First free row below a non-empty used range
    fn below(range: &TableRange) -> SheetResult<Self> {
        Ok(Self {
            start_column: column_letters_to_number(range.start_column())?,
            start_row: range.last_row() + 1,
        })
    }
}

pub struct InsertRowsManager<'a> {
    client: &'a GraphClient,
}

impl<'a> InsertRowsManager<'a> {
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    /// Write `rows` into `sheet`, at most `chunk_row_count` rows per call.
    ///
    /// Without `append` the sheet is cleared first (unless it was just
    /// created). With `append` the rows go below the used range, and an
    /// existing header is kept even when the incoming one differs.
    pub fn insert<I>(
        &self,
        sheet: &SheetRef,
        append: bool,
        rows: I,
        chunk_row_count: usize,
        session: Option<&EditingSession>,
    ) -> SheetResult<InsertSummary>
    where
        I: IntoIterator<Item = SheetResult<Row>>,
    {
        if chunk_row_count == 0 {
            return Err(SheetError::Config(
                "Bulk size must be greater than zero".to_string(),
            ));
        }

        let mut summary = InsertSummary::default();

        if !append && !sheet.is_new {
            self.client.clear_sheet(sheet, session)?;
            info!("Sheet cleared.");
            summary.sheet_cleared = true;
        }

        let prior_range = if append && !sheet.is_new {
            self.prior_range(sheet, session)?
        } else {
            None
        };
        let prior_header = match &prior_range {
            Some(_) => Some(self.prior_header(sheet, session)?),
            None => None,
        };
        let mut cursor = match &prior_range {
            Some(range) => InsertionCursor::below(range)?,
            None => InsertionCursor::origin(),
        };

        let mut rows = rows.into_iter();
        let header = match rows.next() {
            Some(header) => header?,
            None => return Ok(summary),
        };
        if header.is_empty() {
            return Ok(summary);
        }

        let width = header.len();
        let end_column = column_number_to_letters(cursor.start_column + width as u32 - 1)?;
        let start_column = column_number_to_letters(cursor.start_column)?;

        let existing_header = prior_header.filter(|h| !h.is_empty());
        if let Some(existing) = &existing_header {
            if existing.columns() != header.as_slice() {
                warn!("Headers mismatch. Ignored new header: {}", format_list(&header));
            }
        }

        // The header goes out as the first data row unless the sheet has one
        let mut pending_header = match existing_header {
            Some(_) => None,
            None => Some(header),
        };

        loop {
            let mut chunk: Vec<Row> = Vec::new();
            chunk.extend(pending_header.take());
            for row in rows.by_ref().take(chunk_row_count - chunk.len()) {
                chunk.push(row?);
            }
            if chunk.is_empty() {
                break;
            }

            let count = chunk.len();
            let end_row = cursor.start_row + count as u32 - 1;
            let range = TableRange::new(start_column.as_str(), end_column.as_str(), cursor.start_row, end_row)?;

            let mut values = chunk_values(chunk, width);
            escape_formulas(&mut values);
            self.client.write_range(sheet, &range, &values, session)?;
            info!(rows = count, "Inserted {} rows.", count);

            summary.rows += count;
            summary.chunks += 1;
            cursor.start_row = end_row + 1;
        }

        Ok(summary)
    }

    fn prior_range(&self, sheet: &SheetRef, session: Option<&EditingSession>) -> SheetResult<Option<TableRange>> {
        let range = self.client.sheet_range(sheet, session)?;
        if range.is_empty() {
            info!("Sheet is empty.");
            return Ok(None);
        }
        info!("Current sheet range: \"{}\"", range.address());
        Ok(Some(range))
    }

    fn prior_header(&self, sheet: &SheetRef, session: Option<&EditingSession>) -> SheetResult<TableHeader> {
        let header = self.client.sheet_header(sheet, session)?;
        info!(
            "Current sheet header \"{}\": {}",
            header.address(),
            format_list(header.columns())
        );
        Ok(header)
    }
}

/// Rows as a JSON matrix; short rows are padded to `width` with empty cells
fn chunk_values(chunk: Vec<Row>, width: usize) -> Value {
    Value::Array(
        chunk
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                Value::Array(row.into_iter().map(Value::String).collect())
            })
            .collect(),
    )
}

/// Prefix every string starting with `=` with `'`, so the service stores it
/// as text instead of evaluating a formula.
pub fn escape_formulas(value: &mut Value) {
    match value {
        Value::String(s) if s.starts_with('=') => s.insert(0, '\''),
        Value::Array(items) => items.iter_mut().for_each(escape_formulas),
        Value::Object(map) => map.values_mut().for_each(escape_formulas),
        _ => {}
    }
}
