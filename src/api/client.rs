//! Workbook API facade
//!
//! Typed calls used by the resolver, the inserter and the writer. Every
//! workbook call forwards the editing session header when one is held.

use super::batch::BatchMultiplexer;
use super::models::{collection, SheetRef, Site, Worksheet};
use super::retry::RetryExecutor;
use super::session::EditingSession;
use super::transport::Method;
use crate::address::{TableHeader, TableRange, UriArgs};
use crate::error::{SheetError, SheetResult};
use serde_json::{json, Value};
use tracing::debug;

const WORKSHEET: &str = "/drives/{driveId}/items/{fileId}/workbook/worksheets/{worksheetId}";
const LIST_WORKSHEETS: &str =
    "/drives/{driveId}/items/{fileId}/workbook/worksheets?$select=id,position,name,visibility";
const ADD_WORKSHEET: &str = "/drives/{driveId}/items/{fileId}/workbook/worksheets/add";
const CLEAR_RANGE: &str =
    "/drives/{driveId}/items/{fileId}/workbook/worksheets/{worksheetId}/range/clear";
const USED_RANGE: &str =
    "/drives/{driveId}/items/{fileId}/workbook/worksheets/{worksheetId}/usedRange(valuesOnly=true)?$select=address";
const HEADER_ROW: &str =
    "/drives/{driveId}/items/{fileId}/workbook/worksheets/{worksheetId}/usedRange(valuesOnly=true)/row(row=0)?$select=address,text";
const WRITE_RANGE: &str =
    "/drives/{driveId}/items/{fileId}/workbook/worksheets/{worksheetId}/range(address='{start}:{end}')";
const SITE_SEARCH: &str = "/sites?search={name}&$select=id,name";
const ME: &str = "/me?$select=displayName,userPrincipalName";

pub struct GraphClient {
    executor: RetryExecutor,
    batch_cap: usize,
}

impl GraphClient {
    pub fn new(executor: RetryExecutor, batch_cap: usize) -> Self {
        Self {
            executor,
            batch_cap,
        }
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    /// New batch bound to this client's executor and session
    pub fn batch<T>(&self, session: Option<&EditingSession>) -> BatchMultiplexer<'_, T> {
        BatchMultiplexer::new(&self.executor, self.batch_cap).with_session(session)
    }

    pub fn get(&self, uri: &str, params: &UriArgs, session: Option<&EditingSession>) -> SheetResult<Value> {
        self.call(Method::Get, uri, params, None, session)
    }

    pub fn post(
        &self,
        uri: &str,
        params: &UriArgs,
        body: &Value,
        session: Option<&EditingSession>,
    ) -> SheetResult<Value> {
        self.call(Method::Post, uri, params, Some(body), session)
    }

    pub fn patch(
        &self,
        uri: &str,
        params: &UriArgs,
        body: &Value,
        session: Option<&EditingSession>,
    ) -> SheetResult<Value> {
        self.call(Method::Patch, uri, params, Some(body), session)
    }

    fn call(
        &self,
        method: Method,
        uri: &str,
        params: &UriArgs,
        body: Option<&Value>,
        session: Option<&EditingSession>,
    ) -> SheetResult<Value> {
        let headers: Vec<(&str, &str)> = session.map(|s| vec![s.header()]).unwrap_or_default();
        self.executor
            .execute(method, uri, params, body, &headers)?
            .json()
    }

    /// Display name of the signed-in account
    pub fn account_name(&self) -> SheetResult<String> {
        let me = self.get(ME, &[], None)?;
        me["displayName"]
            .as_str()
            .or_else(|| me["userPrincipalName"].as_str())
            .map(str::to_string)
            .ok_or_else(|| SheetError::UnexpectedResponse("account without a name".to_string()))
    }

    /// Clear values and formats of the whole sheet
    pub fn clear_sheet(&self, sheet: &SheetRef, session: Option<&EditingSession>) -> SheetResult<()> {
        self.post(CLEAR_RANGE, &sheet.uri_args(), &json!({ "applyTo": "all" }), session)?;
        Ok(())
    }

    /// Used range of the sheet; a single-cell range means the sheet is empty
    pub fn sheet_range(&self, sheet: &SheetRef, session: Option<&EditingSession>) -> SheetResult<TableRange> {
        let body = self.get(USED_RANGE, &sheet.uri_args(), session)?;
        TableRange::parse(address_of(&body)?)
    }

    /// First row of the used range
    pub fn sheet_header(&self, sheet: &SheetRef, session: Option<&EditingSession>) -> SheetResult<TableHeader> {
        let body = self.get(HEADER_ROW, &sheet.uri_args(), session)?;
        parse_header(&body)
    }

    /// Write `values` (rows of cells) into `range`
    pub fn write_range(
        &self,
        sheet: &SheetRef,
        range: &TableRange,
        values: &Value,
        session: Option<&EditingSession>,
    ) -> SheetResult<()> {
        let start = range.start_cell();
        let end = range.end_cell();
        let [drive, file, worksheet] = sheet.uri_args();
        let args = [drive, file, worksheet, ("start", start.as_str()), ("end", end.as_str())];

        self.patch(WRITE_RANGE, &args, &json!({ "values": values }), session)?;
        Ok(())
    }

    /// Worksheets sorted by position, each with its header loaded through one batch
    pub fn sheets(
        &self,
        drive_id: &str,
        file_id: &str,
        session: Option<&EditingSession>,
    ) -> SheetResult<Vec<Worksheet>> {
        let mut sheets = self.worksheets(drive_id, file_id, session)?;
        sheets.sort_by_key(|sheet| sheet.position);

        let mut batch = self.batch::<TableHeader>(session);
        for sheet in &sheets {
            batch.add_request(
                HEADER_ROW,
                &[
                    ("driveId", drive_id),
                    ("fileId", file_id),
                    ("worksheetId", sheet.id.as_str()),
                ],
                |body| Ok(vec![parse_header(body)?]),
            )?;
        }

        let headers = batch.execute().collect::<SheetResult<Vec<_>>>()?;
        for (sheet, header) in sheets.iter_mut().zip(headers) {
            sheet.header = Some(header);
        }
        Ok(sheets)
    }

    /// Worksheets without headers, in API order
    pub fn worksheets(
        &self,
        drive_id: &str,
        file_id: &str,
        session: Option<&EditingSession>,
    ) -> SheetResult<Vec<Worksheet>> {
        let body = self.get(LIST_WORKSHEETS, &[("driveId", drive_id), ("fileId", file_id)], session)?;
        collection(&body)
    }

    pub fn sheet_id_by_name(
        &self,
        drive_id: &str,
        file_id: &str,
        name: &str,
        session: Option<&EditingSession>,
    ) -> SheetResult<Option<String>> {
        Ok(self
            .worksheets(drive_id, file_id, session)?
            .into_iter()
            .find(|sheet| sheet.name == name)
            .map(|sheet| sheet.id))
    }

    /// Worksheet id at a zero-based position; negative positions are rejected
    pub fn sheet_id_by_position(
        &self,
        drive_id: &str,
        file_id: &str,
        position: i64,
        session: Option<&EditingSession>,
    ) -> SheetResult<Option<String>> {
        if position < 0 {
            return Err(SheetError::Config(format!(
                "Worksheet position must be greater than or equal to 0, given {}",
                position
            )));
        }

        Ok(self
            .worksheets(drive_id, file_id, session)?
            .into_iter()
            .find(|sheet| i64::from(sheet.position) == position)
            .map(|sheet| sheet.id))
    }

    /// Name of the worksheet, `None` when it does not exist
    pub fn sheet_name(
        &self,
        drive_id: &str,
        file_id: &str,
        worksheet_id: &str,
        session: Option<&EditingSession>,
    ) -> SheetResult<Option<String>> {
        let args = [("driveId", drive_id), ("fileId", file_id), ("worksheetId", worksheet_id)];
        match self.get(WORKSHEET, &args, session) {
            Ok(body) => Ok(body["name"].as_str().map(str::to_string)),
            Err(SheetError::ResourceNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn create_sheet(
        &self,
        drive_id: &str,
        file_id: &str,
        name: &str,
        session: Option<&EditingSession>,
    ) -> SheetResult<Worksheet> {
        debug!(name, "Creating worksheet");
        let body = self.post(
            ADD_WORKSHEET,
            &[("driveId", drive_id), ("fileId", file_id)],
            &json!({ "name": name }),
            session,
        )?;
        Ok(serde_json::from_value(body)?)
    }

    pub fn rename_sheet(
        &self,
        sheet: &SheetRef,
        name: &str,
        session: Option<&EditingSession>,
    ) -> SheetResult<()> {
        self.patch(WORKSHEET, &sheet.uri_args(), &json!({ "name": name }), session)?;
        Ok(())
    }

    /// The one site matching `name`
    pub fn site(&self, name: &str) -> SheetResult<Site> {
        let body = self.get(SITE_SEARCH, &[("name", name)], None)?;
        let mut sites: Vec<Site> = collection(&body)?;

        if sites.len() > 1 {
            // search is fuzzy, an exact name still picks one site
            let exact: Vec<Site> = sites
                .iter()
                .filter(|site| site.name.eq_ignore_ascii_case(name))
                .cloned()
                .collect();
            if exact.len() == 1 {
                sites = exact;
            }
        }

        match sites.len() {
            0 => Err(SheetError::ResourceNotFound(format!("Site \"{}\" not found.", name))),
            1 => Ok(sites.remove(0)),
            _ => Err(SheetError::MultipleSitesMatched(name.to_string())),
        }
    }
}

fn address_of(body: &Value) -> SheetResult<&str> {
    body["address"]
        .as_str()
        .ok_or_else(|| SheetError::UnexpectedResponse("range without \"address\"".to_string()))
}

/// `{"address": "Sheet1!A1:C1", "text": [["a", "b", "c"]]}`
fn parse_header(body: &Value) -> SheetResult<TableHeader> {
    let cells: Vec<String> = body["text"][0]
        .as_array()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    TableHeader::parse(address_of(body)?, &cells)
}
