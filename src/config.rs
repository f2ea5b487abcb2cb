//! Client and writer configuration

use crate::api::{RetryPolicy, DEFAULT_BATCH_CAP};
use crate::error::{SheetError, SheetResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_BULK_SIZE: usize = 10_000;

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Sub-requests per `$batch` call
    pub batch_cap: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            batch_cap: DEFAULT_BATCH_CAP,
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

/// Target workbook: by ids, or by locator
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Target worksheet: by id, by zero-based position, or by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorksheetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Overrides for the retry policy
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    pub initial_interval_ms: Option<u64>,
    pub multiplier: Option<f64>,
    pub max_interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub max_retry_after_secs: Option<u64>,
}

impl RetrySettings {
    pub fn apply(&self, mut policy: RetryPolicy) -> RetryPolicy {
        if let Some(ms) = self.initial_interval_ms {
            policy = policy.with_initial_interval(Duration::from_millis(ms));
        }
        if let Some(multiplier) = self.multiplier {
            policy = policy.with_multiplier(multiplier);
        }
        if let Some(ms) = self.max_interval_ms {
            policy = policy.with_max_interval(Duration::from_millis(ms));
        }
        if let Some(attempts) = self.max_attempts {
            policy = policy.with_max_attempts(attempts);
        }
        if let Some(secs) = self.max_retry_after_secs {
            policy = policy.with_max_retry_after(Duration::from_secs(secs));
        }
        policy
    }
}

/// How the workbook is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookTarget<'a> {
    Ids { drive_id: &'a str, file_id: &'a str },
    Locator(&'a str),
}

/// How the worksheet is addressed, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorksheetTarget<'a> {
    Id(&'a str),
    Position(i64),
    Name(&'a str),
}

/// Writer job configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterConfig {
    pub workbook: WorkbookConfig,
    pub worksheet: WorksheetConfig,
    #[serde(default)]
    pub append: bool,
    #[serde(default = "default_bulk_size")]
    pub bulk_size: usize,
    #[serde(default = "default_use_session")]
    pub use_session: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetrySettings>,
}

fn default_bulk_size() -> usize {
    DEFAULT_BULK_SIZE
}

fn default_use_session() -> bool {
    true
}

impl WriterConfig {
    /// Load and validate a configuration file.
    ///
    /// Files ending in `.yaml`/`.yml` are read as YAML, anything else as JSON.
    /// The options may sit at the top level or under a `parameters` key.
    ///
    /// # Example
    /// ```no_run
    /// use royalbit_sheetwriter::config::WriterConfig;
    /// use std::path::Path;
    ///
    /// let config = WriterConfig::from_path(Path::new("config.json"))?;
    /// println!("Bulk size: {}", config.bulk_size);
    /// # Ok::<(), royalbit_sheetwriter::error::SheetError>(())
    /// ```
    pub fn from_path(path: &Path) -> SheetResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    pub fn from_json(content: &str) -> SheetResult<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value)
    }

    pub fn from_yaml(content: &str) -> SheetResult<Self> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
        Self::from_value(serde_json::to_value(yaml)?)
    }

    fn from_value(mut value: Value) -> SheetResult<Self> {
        if let Some(parameters) = value.get_mut("parameters").map(Value::take) {
            value = parameters;
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SheetResult<()> {
        self.workbook_target()?;
        self.worksheet_target()?;

        if self.worksheet.id.is_some() && self.worksheet.position.is_some() {
            return Err(config_error(
                "Only one of \"worksheet.id\" or \"worksheet.position\" may be configured, both given.",
            ));
        }
        if self.bulk_size == 0 {
            return Err(config_error("\"bulkSize\" must be greater than zero."));
        }
        Ok(())
    }

    pub fn workbook_target(&self) -> SheetResult<WorkbookTarget<'_>> {
        let drive_id = non_empty(&self.workbook.drive_id, "workbook.driveId")?;
        let file_id = non_empty(&self.workbook.file_id, "workbook.fileId")?;
        let path = non_empty(&self.workbook.path, "workbook.path")?;

        match (drive_id, file_id, path) {
            (Some(drive_id), Some(file_id), None) => Ok(WorkbookTarget::Ids { drive_id, file_id }),
            (None, None, Some(path)) => Ok(WorkbookTarget::Locator(path)),
            (None, None, None) => Err(config_error(
                "\"workbook.path\" or (\"workbook.driveId\" and \"workbook.fileId\") must be configured.",
            )),
            (_, _, Some(_)) => Err(config_error(
                "\"workbook.path\" is configured, therefore \"workbook.driveId\" and \"workbook.fileId\" are not expected.",
            )),
            _ => Err(config_error(
                "Both \"workbook.driveId\" and \"workbook.fileId\" must be configured.",
            )),
        }
    }

    pub fn worksheet_target(&self) -> SheetResult<WorksheetTarget<'_>> {
        let id = non_empty(&self.worksheet.id, "worksheet.id")?;
        let name = non_empty(&self.worksheet.name, "worksheet.name")?;

        if let Some(id) = id {
            return Ok(WorksheetTarget::Id(id));
        }
        if let Some(position) = self.worksheet.position {
            if position < 0 {
                return Err(config_error("\"worksheet.position\" must be greater than or equal to 0."));
            }
            return Ok(WorksheetTarget::Position(position));
        }
        name.map(WorksheetTarget::Name).ok_or_else(|| {
            config_error("One of \"worksheet.name\", \"worksheet.id\" or \"worksheet.position\" must be configured.")
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match &self.retry {
            Some(settings) => settings.apply(RetryPolicy::default()),
            None => RetryPolicy::default(),
        }
    }

    /// Client configuration with this job's retry overrides
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            retry: self.retry_policy(),
            ..ClientConfig::default()
        }
    }
}

fn non_empty<'a>(value: &'a Option<String>, key: &str) -> SheetResult<Option<&'a str>> {
    match value.as_deref() {
        Some(v) if v.trim().is_empty() => Err(config_error(&format!("\"{}\" cannot be empty.", key))),
        other => Ok(other),
    }
}

fn config_error(message: &str) -> SheetError {
    SheetError::Config(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = WriterConfig::from_json(
            r#"{"workbook": {"path": "/file.xlsx"}, "worksheet": {"name": "Data"}}"#,
        )
        .unwrap();
        assert!(!config.append);
        assert_eq!(config.bulk_size, 10_000);
        assert!(config.use_session);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.workbook_target().unwrap(), WorkbookTarget::Locator("/file.xlsx"));
        assert_eq!(config.worksheet_target().unwrap(), WorksheetTarget::Name("Data"));
    }

    #[test]
    fn test_parameters_wrapper() {
        let config = WriterConfig::from_json(
            r#"{"parameters": {"workbook": {"driveId": "d", "fileId": "f"}, "worksheet": {"position": 2}, "append": true, "bulkSize": 50}}"#,
        )
        .unwrap();
        assert!(config.append);
        assert_eq!(config.bulk_size, 50);
        assert_eq!(
            config.workbook_target().unwrap(),
            WorkbookTarget::Ids {
                drive_id: "d",
                file_id: "f"
            }
        );
        assert_eq!(config.worksheet_target().unwrap(), WorksheetTarget::Position(2));
    }

    #[test]
    fn test_yaml_with_retry_overrides() {
        let yaml = r#"
workbook:
  path: drive://abc/file.xlsx
worksheet:
  id: "{00000000-0001-0000-0000-000000000000}"
  name: Renamed
useSession: false
retry:
  maxAttempts: 3
  initialIntervalMs: 10
"#;
        let config = WriterConfig::from_yaml(yaml).unwrap();
        assert!(!config.use_session);
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_interval, Duration::from_millis(10));
        assert_eq!(policy.max_interval, Duration::from_millis(5000));
        assert!(matches!(config.worksheet_target().unwrap(), WorksheetTarget::Id(_)));
    }

    #[test]
    fn test_invalid_workbook() {
        let cases = [
            r#"{"workbook": {}, "worksheet": {"name": "x"}}"#,
            r#"{"workbook": {"driveId": "d"}, "worksheet": {"name": "x"}}"#,
            r#"{"workbook": {"path": "p", "fileId": "f"}, "worksheet": {"name": "x"}}"#,
            r#"{"workbook": {"path": ""}, "worksheet": {"name": "x"}}"#,
        ];
        for case in cases {
            assert!(
                matches!(WriterConfig::from_json(case), Err(SheetError::Config(_))),
                "{}",
                case
            );
        }
    }

    #[test]
    fn test_invalid_worksheet() {
        let cases = [
            r#"{"workbook": {"path": "p"}, "worksheet": {}}"#,
            r#"{"workbook": {"path": "p"}, "worksheet": {"id": "1", "position": 0}}"#,
            r#"{"workbook": {"path": "p"}, "worksheet": {"position": -1}}"#,
            r#"{"workbook": {"path": "p"}, "worksheet": {"name": "x"}, "bulkSize": 0}"#,
        ];
        for case in cases {
            assert!(
                matches!(WriterConfig::from_json(case), Err(SheetError::Config(_))),
                "{}",
                case
            );
        }
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://graph.microsoft.com/v1.0");
        assert_eq!(config.batch_cap, 20);
    }
}
