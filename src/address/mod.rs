//! Spreadsheet addressing
//!
//! - Range and header addresses returned by the API (`Sheet1!A1:C3`)
//! - Column letter arithmetic (`A` ⇄ 1, `AA` ⇄ 27)
//! - Header-name normalization
//! - URI templates used to address remote resources

mod columns;
mod range;
mod uri;

pub use columns::{column_letters_to_number, column_number_to_letters, normalize_columns, to_ascii};
pub use range::{TableHeader, TableRange};
pub use uri::{drive_item_path, expand_uri, UriArgs};
