//! Workbook resolution
//!
//! A locator names a workbook in one of four shapes, tried in this order:
//!
//! | Shape                       | Resolved against            |
//! |-----------------------------|-----------------------------|
//! | `path/to/file.xlsx`         | the signed-in user's drive  |
//! | `drive://<driveId>/<path>`  | an explicit drive           |
//! | `site://<siteName>/<path>`  | the drive of a named site   |
//! | `https://...`               | a sharing link              |

use crate::address::drive_item_path;
use crate::api::{DriveFile, GraphClient};
use crate::error::{SheetError, SheetResult};
use crate::format::truncate;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use tracing::info;

const SELECT_ITEM: &str = "?$select=id,name,parentReference,file";
const SHARING_URL_EXCERPT: usize = 32;

/// A classified locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    MyDrivePath(String),
    DrivePath { drive_id: String, path: String },
    SitePath { site_name: String, path: String },
    SharingUrl(String),
}

impl Locator {
    pub fn parse(locator: &str) -> SheetResult<Self> {
        let file_path = regex(r"^(/?[^/]+)(/[^/]+)*$")?;
        let drive_path = regex(r"^drive://([^/]+)/(.+)$")?;
        let site_path = regex(r"^site://([^/]+)/(.+)$")?;

        if file_path.is_match(locator) {
            return Ok(Locator::MyDrivePath(locator.to_string()));
        }
        if let Some(caps) = drive_path.captures(locator) {
            return Ok(Locator::DrivePath {
                drive_id: decode(&caps[1]),
                path: decode(&caps[2]),
            });
        }
        if let Some(caps) = site_path.captures(locator) {
            return Ok(Locator::SitePath {
                site_name: decode(&caps[1]),
                path: decode(&caps[2]),
            });
        }
        if locator.starts_with("https://") {
            return Ok(Locator::SharingUrl(locator.to_string()));
        }

        Err(SheetError::UnrecognizedLocatorFormat(locator.to_string()))
    }
}

fn regex(pattern: &str) -> SheetResult<Regex> {
    Regex::new(pattern).map_err(|e| SheetError::Config(format!("Regex error: {}", e)))
}

fn decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Opaque share id for a sharing URL: `u!` + unpadded base64url of the URL
pub fn sharing_token(url: &str) -> String {
    let encoded = STANDARD.encode(url);
    let encoded = encoded.trim_end_matches('=').replace('/', "_").replace('+', "-");
    format!("u!{}", encoded)
}

/// Outcome of resolving a locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(DriveFile),
    /// Nothing at the path; a new workbook could be created at `endpoint`
    NotFound { path: String, endpoint: String },
}

pub struct WorkbooksResolver<'a> {
    client: &'a GraphClient,
}

impl<'a> WorkbooksResolver<'a> {
    pub fn new(client: &'a GraphClient) -> Self {
        Self { client }
    }

    /// Resolve to a file, treating a missing file as an error
    pub fn search(&self, locator: &str) -> SheetResult<DriveFile> {
        match self.resolve(locator)? {
            Resolution::Found(file) => Ok(file),
            Resolution::NotFound { path, endpoint } => Err(SheetError::ResourceNotFound(format!(
                "File \"{}\" not found in \"{}\".",
                path, endpoint
            ))),
        }
    }

    pub fn resolve(&self, locator: &str) -> SheetResult<Resolution> {
        match Locator::parse(locator)? {
            Locator::MyDrivePath(path) => {
                info!("Searching for \"{}\" in personal OneDrive.", path);
                self.in_drive("/me/drive", &path)
            }
            Locator::DrivePath { drive_id, path } => {
                info!("Searching for \"{}\" in drive \"{}\".", path, truncate(&drive_id, 15));
                let prefix = format!("/drives/{}", urlencoding::encode(&drive_id));
                self.in_drive(&prefix, &path)
            }
            Locator::SitePath { site_name, path } => {
                info!("Searching for \"{}\" in site \"{}\".", path, site_name);
                let site = self.client.site(&site_name)?;
                let prefix = format!("/sites/{}/drive", urlencoding::encode(&site.id));
                self.in_drive(&prefix, &path)
            }
            Locator::SharingUrl(url) => {
                info!("Searching by link \"{}\".", truncate(&url, 20));
                self.by_sharing_url(&url).map(Resolution::Found)
            }
        }
    }

    fn in_drive(&self, drive_prefix: &str, path: &str) -> SheetResult<Resolution> {
        let endpoint = format!("{}/root{}", drive_prefix, drive_item_path(path));
        let item = match self
            .client
            .get(&format!("{}{}", endpoint, SELECT_ITEM), &[], None)
        {
            Ok(item) => item,
            Err(SheetError::ResourceNotFound(_)) => {
                return Ok(Resolution::NotFound {
                    path: path.to_string(),
                    endpoint,
                })
            }
            Err(e) => return Err(e),
        };

        checked(DriveFile::from_item(&item)?).map(Resolution::Found)
    }

    fn by_sharing_url(&self, url: &str) -> SheetResult<DriveFile> {
        let uri = format!("/shares/{}/driveItem", sharing_token(url));
        let excerpt: String = url.chars().take(SHARING_URL_EXCERPT).collect();

        let item = self.client.get(&uri, &[], None).map_err(|e| match e {
            SheetError::Remote { code: Some(code), .. } if code.eq_ignore_ascii_case("accessDenied") => {
                SheetError::SharingLink(format!(
                    "The sharing link \"{}...\" not exists, or you do not have permission to access it.",
                    excerpt
                ))
            }
            SheetError::ResourceNotFound(_) => SheetError::SharingLink(format!(
                "The sharing link \"{}...\" not exists, or you do not have permission to access it.",
                excerpt
            )),
            SheetError::BadRequest(_) => {
                SheetError::SharingLink(format!("The sharing link \"{}...\" is invalid.", excerpt))
            }
            other => other,
        })?;

        checked(DriveFile::from_item(&item)?)
    }
}

fn checked(file: DriveFile) -> SheetResult<DriveFile> {
    if file.is_spreadsheet() {
        return Ok(file);
    }
    Err(SheetError::UnsupportedFileType(format!(
        "File is not in the \"XLSX\" Excel format. Mime type: \"{}\"",
        file.mime_type.as_deref().unwrap_or("undefined-mime-type")
    )))
}
