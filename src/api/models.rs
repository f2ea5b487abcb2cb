//! Typed views of API resources

use crate::address::TableHeader;
use crate::error::{SheetError, SheetResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only content type the workbook API can edit
pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A file resolved to its drive and item ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub drive_id: String,
    pub file_id: String,
    pub name: String,
    /// Folders between the drive root and the file
    pub path: Vec<String>,
    pub mime_type: Option<String>,
}

impl DriveFile {
    /// Build from a `driveItem` resource
    pub fn from_item(item: &Value) -> SheetResult<Self> {
        let field = |value: &Value, name: &str| {
            value[name]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| SheetError::UnexpectedResponse(format!("driveItem without \"{}\"", name)))
        };

        let parent = &item["parentReference"];
        let path = parent["path"]
            .as_str()
            .and_then(|p| p.split_once("root:"))
            .map(|(_, rest)| {
                rest.split('/')
                    .filter(|segment| !segment.is_empty())
                    .map(|segment| {
                        urlencoding::decode(segment)
                            .map(|s| s.into_owned())
                            .unwrap_or_else(|_| segment.to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            drive_id: field(parent, "driveId")?,
            file_id: field(item, "id")?,
            name: field(item, "name")?,
            path,
            mime_type: item["file"]["mimeType"].as_str().map(str::to_string),
        })
    }

    /// `path/to/name.xlsx`
    pub fn full_path(&self) -> String {
        let mut parts = self.path.clone();
        parts.push(self.name.clone());
        parts.join("/")
    }

    pub fn is_spreadsheet(&self) -> bool {
        self.mime_type.as_deref() == Some(XLSX_MIME_TYPE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Site {
    pub id: String,
    pub name: String,
}

/// A worksheet inside a workbook, optionally with its header loaded
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Worksheet {
    pub id: String,
    pub position: u32,
    pub name: String,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub header: Option<TableHeader>,
}

/// Everything needed to address one worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef {
    pub drive_id: String,
    pub file_id: String,
    pub worksheet_id: String,
    pub name: String,
    /// Created during this run, so it holds no data yet
    pub is_new: bool,
}

impl SheetRef {
    /// Template arguments for workbook URIs
    pub fn uri_args(&self) -> [(&str, &str); 3] {
        [
            ("driveId", self.drive_id.as_str()),
            ("fileId", self.file_id.as_str()),
            ("worksheetId", self.worksheet_id.as_str()),
        ]
    }
}

/// Items of a collection response, `{"value": [...]}`
pub(crate) fn collection<T: for<'de> Deserialize<'de>>(body: &Value) -> SheetResult<Vec<T>> {
    let items = body["value"]
        .as_array()
        .ok_or_else(|| SheetError::UnexpectedResponse("collection without \"value\"".to_string()))?;
    items
        .iter()
        .map(|item| serde_json::from_value(item.clone()).map_err(SheetError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_drive_file_from_item() {
        let item = json!({
            "id": "01ABC",
            "name": "report.xlsx",
            "parentReference": {"driveId": "b!xyz", "path": "/drive/root:/Shared%20Files/2024"},
            "file": {"mimeType": XLSX_MIME_TYPE}
        });
        let file = DriveFile::from_item(&item).unwrap();
        assert_eq!(file.drive_id, "b!xyz");
        assert_eq!(file.file_id, "01ABC");
        assert_eq!(file.path, vec!["Shared Files", "2024"]);
        assert_eq!(file.full_path(), "Shared Files/2024/report.xlsx");
        assert!(file.is_spreadsheet());
    }

    #[test]
    fn test_drive_file_in_root() {
        let item = json!({
            "id": "01ABC",
            "name": "a.csv",
            "parentReference": {"driveId": "d", "path": "/drive/root:"},
            "file": {"mimeType": "text/csv"}
        });
        let file = DriveFile::from_item(&item).unwrap();
        assert!(file.path.is_empty());
        assert!(!file.is_spreadsheet());
    }

    #[test]
    fn test_drive_file_missing_ids() {
        assert!(DriveFile::from_item(&json!({"name": "x"})).is_err());
    }

    #[test]
    fn test_worksheet_collection() {
        let body = json!({"value": [
            {"id": "{1}", "position": 0, "name": "Sheet1", "visibility": "Visible"},
            {"id": "{2}", "position": 1, "name": "Data"}
        ]});
        let sheets: Vec<Worksheet> = collection(&body).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[1].name, "Data");
        assert_eq!(sheets[1].visibility, None);
        assert!(collection::<Worksheet>(&json!({})).is_err());
    }
}
