use thiserror::Error;

pub type SheetResult<T> = Result<T, SheetError>;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Malformed range address: \"{0}\"")]
    MalformedAddress(String),

    #[error("Invalid column name \"{0}\", expected letters A-Z")]
    InvalidColumnName(String),

    #[error("Column number must be greater than zero, given {0}")]
    InvalidColumnNumber(u32),

    #[error("Remote call failed after {attempts} attempts (status {}): {message}", display_status(.status))]
    TransientRemoteFailure {
        attempts: u32,
        status: Option<u16>,
        message: String,
    },

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Unexpected locator format \"{0}\"")]
    UnrecognizedLocatorFormat(String),

    #[error("Multiple sites found when searching for \"{0}\"")]
    MultipleSitesMatched(String),

    #[error("OneDrive API error: {0} Make sure nobody is editing it.")]
    RemoteLockedOrBusy(String),

    #[error("OneDrive API error: {0} Please try again later.")]
    RemoteServiceUnavailable(String),

    #[error("OneDrive API error: Request took too long. {0}")]
    RemoteRequestTooSlow(String),

    #[error("Unexpected status \"{status}\" for request \"{uri}\": {code}, {message}")]
    GenericBatchFailure {
        status: u16,
        code: String,
        message: String,
        uri: String,
        retryable: bool,
    },

    #[error(
        "Too many requests: the API asked to wait {retry_after_secs}s, longer than the allowed {ceiling_secs}s"
    )]
    TooManyRequestsExceededCeiling {
        retry_after_secs: u64,
        ceiling_secs: u64,
    },

    #[error("API error ({status}) for \"{uri}\": {message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
        uri: String,
    },

    #[error("Bad request error. Please check configuration. API error: {0}")]
    BadRequest(String),

    #[error("{0}")]
    SharingLink(String),

    #[error("Authorization error: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected API response: {0}")]
    UnexpectedResponse(String),

    #[error("Worksheet \"{0}\" already exists")]
    WorksheetAlreadyExists(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

impl SheetError {
    /// Errors the user can fix (configuration, file content, sharing, locks),
    /// as opposed to application or infrastructure failures.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SheetError::MalformedAddress(_)
                | SheetError::InvalidColumnName(_)
                | SheetError::InvalidColumnNumber(_)
                | SheetError::ResourceNotFound(_)
                | SheetError::UnsupportedFileType(_)
                | SheetError::UnrecognizedLocatorFormat(_)
                | SheetError::MultipleSitesMatched(_)
                | SheetError::RemoteLockedOrBusy(_)
                | SheetError::RemoteServiceUnavailable(_)
                | SheetError::RemoteRequestTooSlow(_)
                | SheetError::TooManyRequestsExceededCeiling { .. }
                | SheetError::BadRequest(_)
                | SheetError::SharingLink(_)
                | SheetError::Auth(_)
                | SheetError::WorksheetAlreadyExists(_)
                | SheetError::Config(_)
                | SheetError::Csv(_)
        )
    }
}
