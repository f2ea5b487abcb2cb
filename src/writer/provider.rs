//! Resolves the configured workbook and worksheet

use crate::api::{DriveFile, GraphClient, SheetRef};
use crate::config::{WorkbookTarget, WorksheetTarget, WriterConfig};
use crate::error::{SheetError, SheetResult};
use crate::workbooks::{Resolution, WorkbooksResolver};
use tracing::info;

/// Creates a blank workbook where a locator found nothing
pub trait WorkbookCreator {
    /// `endpoint` is the drive-item address the resolver tried, `path` the
    /// path as configured.
    fn create(&self, client: &GraphClient, endpoint: &str, path: &str) -> SheetResult<DriveFile>;
}

/// A resolved workbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workbook {
    pub drive_id: String,
    pub file_id: String,
    /// Created during this run
    pub is_new: bool,
}

pub struct SheetProvider<'a> {
    client: &'a GraphClient,
    config: &'a WriterConfig,
    creator: Option<&'a dyn WorkbookCreator>,
}

impl<'a> SheetProvider<'a> {
    pub fn new(client: &'a GraphClient, config: &'a WriterConfig) -> Self {
        Self {
            client,
            config,
            creator: None,
        }
    }

    pub fn with_creator(mut self, creator: &'a dyn WorkbookCreator) -> Self {
        self.creator = Some(creator);
        self
    }

    pub fn workbook(&self) -> SheetResult<Workbook> {
        match self.config.workbook_target()? {
            WorkbookTarget::Ids { drive_id, file_id } => self.workbook_by_ids(drive_id, file_id),
            WorkbookTarget::Locator(locator) => self.workbook_by_locator(locator),
        }
    }

    fn workbook_by_ids(&self, drive_id: &str, file_id: &str) -> SheetResult<Workbook> {
        match self.client.worksheets(drive_id, file_id, None) {
            Ok(_) => Ok(Workbook {
                drive_id: drive_id.to_string(),
                file_id: file_id.to_string(),
                is_new: false,
            }),
            Err(SheetError::ResourceNotFound(_)) => Err(SheetError::ResourceNotFound(
                "Configured workbook XLSX file not found.".to_string(),
            )),
            Err(e) => Err(e),
        }
    }

    fn workbook_by_locator(&self, locator: &str) -> SheetResult<Workbook> {
        let (file, is_new) = match WorkbooksResolver::new(self.client).resolve(locator)? {
            Resolution::Found(file) => (file, false),
            Resolution::NotFound { path, endpoint } => match self.creator {
                Some(creator) => {
                    info!("Creating new workbook \"{}\".", path);
                    (creator.create(self.client, &endpoint, &path)?, true)
                }
                None => {
                    return Err(SheetError::ResourceNotFound(format!(
                        "No file found when searching for \"{}\".",
                        locator
                    )))
                }
            },
        };

        Ok(Workbook {
            drive_id: file.drive_id,
            file_id: file.file_id,
            is_new,
        })
    }

    /// The configured worksheet; a worksheet addressed by name is created
    /// when missing.
    pub fn sheet(&self) -> SheetResult<SheetRef> {
        let workbook = self.workbook()?;
        match self.config.worksheet_target()? {
            WorksheetTarget::Id(id) => self.sheet_by_id(&workbook, id),
            WorksheetTarget::Position(position) => {
                let id = self
                    .client
                    .sheet_id_by_position(&workbook.drive_id, &workbook.file_id, position, None)?
                    .ok_or_else(worksheet_not_found)?;
                self.sheet_by_id(&workbook, &id)
            }
            WorksheetTarget::Name(name) => self.sheet_by_name(&workbook, name),
        }
    }

    /// Create the named worksheet, failing when it already exists
    pub fn create_worksheet(&self) -> SheetResult<SheetRef> {
        let name = self.config.worksheet.name.as_deref().ok_or_else(|| {
            SheetError::Config("To create worksheet please configure \"worksheet.name\".".to_string())
        })?;

        let sheet = self.sheet_by_name(&self.workbook()?, name)?;
        if !sheet.is_new {
            return Err(SheetError::WorksheetAlreadyExists(name.to_string()));
        }
        Ok(sheet)
    }

    fn sheet_by_id(&self, workbook: &Workbook, id: &str) -> SheetResult<SheetRef> {
        let name = self
            .client
            .sheet_name(&workbook.drive_id, &workbook.file_id, id, None)?
            .ok_or_else(worksheet_not_found)?;

        Ok(SheetRef {
            drive_id: workbook.drive_id.clone(),
            file_id: workbook.file_id.clone(),
            worksheet_id: id.to_string(),
            name,
            is_new: false,
        })
    }

    fn sheet_by_name(&self, workbook: &Workbook, name: &str) -> SheetResult<SheetRef> {
        let existing = self
            .client
            .sheet_id_by_name(&workbook.drive_id, &workbook.file_id, name, None)?;

        let (worksheet_id, is_new) = match existing {
            Some(id) => (id, false),
            None => {
                let created = self
                    .client
                    .create_sheet(&workbook.drive_id, &workbook.file_id, name, None)?;
                info!("Worksheet \"{}\" created.", name);
                (created.id, true)
            }
        };

        Ok(SheetRef {
            drive_id: workbook.drive_id.clone(),
            file_id: workbook.file_id.clone(),
            worksheet_id,
            name: name.to_string(),
            is_new,
        })
    }
}

fn worksheet_not_found() -> SheetError {
    SheetError::ResourceNotFound("Worksheet not found.".to_string())
}
