//! Table range and header addresses
//!
//! The API reports used ranges as `Sheet1!B123:I456`, or a single cell such as
//! `Sheet1!A1` when the sheet holds nothing.

use super::columns::normalize_columns;
use crate::error::{SheetError, SheetResult};
use regex::Regex;
use serde::Serialize;

/// Rectangular range of a worksheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRange {
    start_column: String,
    end_column: String,
    first_row: u32,
    last_row: u32,
}

impl TableRange {
    pub fn new(
        start_column: impl Into<String>,
        end_column: impl Into<String>,
        first_row: u32,
        last_row: u32,
    ) -> SheetResult<Self> {
        let range = Self {
            start_column: start_column.into(),
            end_column: end_column.into(),
            first_row,
            last_row,
        };
        range.check()?;
        Ok(range)
    }

    /// Parse `[<sheet>!]<col><row>[:<col><row>]`.
    ///
    /// Only the rightmost well-formed cell pair counts, so sheet names may
    /// contain any characters, including `!`.
    pub fn parse(address: &str) -> SheetResult<Self> {
        let pattern = Regex::new(r"([A-Z]+)([0-9]+)(?::([A-Z]+)([0-9]+))?$")
            .map_err(|e| SheetError::Config(format!("Regex error: {}", e)))?;

        let captures = pattern
            .captures(address)
            .ok_or_else(|| SheetError::MalformedAddress(address.to_string()))?;

        let row = |index: usize| -> SheetResult<Option<u32>> {
            captures
                .get(index)
                .map(|m| {
                    m.as_str()
                        .parse::<u32>()
                        .map_err(|_| SheetError::MalformedAddress(address.to_string()))
                })
                .transpose()
        };

        let start_column = captures[1].to_string();
        let first_row = row(2)?.unwrap_or_default();
        let end_column = captures
            .get(3)
            .map_or_else(|| start_column.clone(), |m| m.as_str().to_string());
        let last_row = row(4)?.unwrap_or(first_row);

        let range = Self {
            start_column,
            end_column,
            first_row,
            last_row,
        };
        range
            .check()
            .map_err(|_| SheetError::MalformedAddress(address.to_string()))?;
        Ok(range)
    }

    fn check(&self) -> SheetResult<()> {
        let valid_column = |c: &str| !c.is_empty() && c.chars().all(|ch| ch.is_ascii_uppercase());
        if !valid_column(&self.start_column) || !valid_column(&self.end_column) {
            return Err(SheetError::MalformedAddress(self.address()));
        }
        if self.first_row == 0 || self.first_row > self.last_row {
            return Err(SheetError::MalformedAddress(self.address()));
        }
        Ok(())
    }

    pub fn start_column(&self) -> &str {
        &self.start_column
    }

    pub fn end_column(&self) -> &str {
        &self.end_column
    }

    pub fn first_row(&self) -> u32 {
        self.first_row
    }

    pub fn last_row(&self) -> u32 {
        self.last_row
    }

    pub fn start_cell(&self) -> String {
        format!("{}{}", self.start_column, self.first_row)
    }

    pub fn end_cell(&self) -> String {
        format!("{}{}", self.end_column, self.last_row)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.start_cell(), self.end_cell())
    }

    /// A single-cell range is how the API says "nothing written yet"
    pub fn is_empty(&self) -> bool {
        self.start_column == self.end_column && self.first_row == self.last_row
    }
}

/// First row of a table: its range plus normalized column names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableHeader {
    #[serde(skip)]
    range: TableRange,
    columns: Vec<String>,
}

impl TableHeader {
    /// Build a header from the API's row address and the raw first-row cells.
    ///
    /// For an empty sheet the API returns a single empty cell, which is
    /// treated as "no columns".
    pub fn parse<S: AsRef<str>>(address: &str, cells: &[S]) -> SheetResult<Self> {
        let parsed = TableRange::parse(address)?;
        let no_data = cells.len() <= 1 && cells.first().map_or(true, |c| c.as_ref().is_empty());
        let columns = if no_data {
            Vec::new()
        } else {
            normalize_columns(cells)?
        };

        // Header is one row even when the address spans more
        let range = TableRange {
            last_row: parsed.first_row,
            ..parsed
        };

        Ok(Self { range, columns })
    }

    pub fn range(&self) -> &TableRange {
        &self.range
    }

    pub fn address(&self) -> String {
        self.range.address()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
