//! Shared fixtures: a scripted transport that records every request

#![allow(dead_code)]

use royalbit_sheetwriter::api::{
    GraphClient, HttpRequest, HttpResponse, RetryExecutor, RetryPolicy, SheetRef, StaticTokenProvider, Transport,
    TransportError,
};
use royalbit_sheetwriter::insert::Row;
use royalbit_sheetwriter::SheetResult;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

pub const BASE_URL: &str = "https://graph.test/v1.0";
pub const TOKEN: &str = "test-token";

/// Replays scripted responses in order and records the requests
#[derive(Default)]
pub struct MockTransport {
    responses: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn push(&self, response: HttpResponse) -> &Self {
        self.responses.borrow_mut().push_back(Ok(response));
        self
    }

    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.push(HttpResponse::new(status, body.to_string()))
    }

    pub fn push_error(&self, error: TransportError) -> &Self {
        self.responses.borrow_mut().push_back(Err(error));
        self
    }

    /// `{"error": {"code": ..., "message": ...}}` with `status`
    pub fn push_api_error(&self, status: u16, code: &str, message: &str) -> &Self {
        self.push_json(status, api_error(code, message))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Request URLs without the base URL
    pub fn paths(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|r| r.url.strip_prefix(BASE_URL).unwrap_or(&r.url).to_string())
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other(format!("no scripted response for {}", request.url))))
    }
}

pub fn api_error(code: &str, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message } })
}

/// Delays passed to the executor's sleeper
pub type Delays = Rc<RefCell<Vec<Duration>>>;

pub fn executor_with(transport: &Rc<MockTransport>, policy: RetryPolicy) -> (RetryExecutor, Delays) {
    let delays: Delays = Rc::default();
    let recorded = Rc::clone(&delays);
    let executor = RetryExecutor::new(Rc::clone(transport), StaticTokenProvider::new(TOKEN), BASE_URL, policy)
        .with_sleeper(move |delay| recorded.borrow_mut().push(delay));
    (executor, delays)
}

pub fn executor(transport: &Rc<MockTransport>) -> RetryExecutor {
    executor_with(transport, RetryPolicy::default()).0
}

pub fn client(transport: &Rc<MockTransport>) -> GraphClient {
    GraphClient::new(executor(transport), 20)
}

pub fn sheet_ref(is_new: bool) -> SheetRef {
    SheetRef {
        drive_id: "drive1".to_string(),
        file_id: "file1".to_string(),
        worksheet_id: "ws1".to_string(),
        name: "Sheet1".to_string(),
        is_new,
    }
}

pub fn rows(data: &[&[&str]]) -> Vec<SheetResult<Row>> {
    data.iter()
        .map(|row| Ok(row.iter().map(|c| c.to_string()).collect()))
        .collect()
}

/// `$batch` response with `(id, status, body)` entries
pub fn batch_response(entries: &[(&str, u16, Value)]) -> HttpResponse {
    let responses: Vec<Value> = entries
        .iter()
        .map(|(id, status, body)| json!({ "id": id, "status": status, "body": body }))
        .collect();
    HttpResponse::new(200, json!({ "responses": responses }).to_string())
}

/// `driveItem` resource
pub fn drive_item(drive_id: &str, id: &str, name: &str, mime: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "parentReference": { "driveId": drive_id, "path": "/drive/root:/Reports" },
        "file": { "mimeType": mime }
    })
}

pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// JSON body of a recorded request
pub fn body(request: &HttpRequest) -> Value {
    request.body.clone().unwrap_or(Value::Null)
}
