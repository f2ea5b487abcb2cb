//! Batch multiplexer
//!
//! Groups independent sub-requests into `$batch` calls of at most `cap`
//! requests each, and yields the mapped values lazily:
//!
//! - groups are sent one at a time, only when the caller consumes that far
//! - sub-responses are matched back by id and processed in insertion order
//! - `@odata.nextLink` continuations are followed per sub-request
//! - the first failed sub-response ends the sequence with its error
//!
//! Only the physical `$batch` call is retried (by the executor); failed
//! sub-responses are classified but never retried on their own.

use super::classifier::FailureDescription;
use super::retry::RetryExecutor;
use super::session::{EditingSession, SESSION_HEADER};
use super::transport::Method;
use crate::address::{expand_uri, UriArgs};
use crate::error::{SheetError, SheetResult};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Per-call ceiling imposed by the API
pub const DEFAULT_BATCH_CAP: usize = 20;

const BATCH_URI: &str = "/$batch";
const NEXT_LINK: &str = "@odata.nextLink";

/// Turns one sub-response body into zero or more values
pub type ResponseMapper<'a, T> = Box<dyn Fn(&Value) -> SheetResult<Vec<T>> + 'a>;

struct SubRequest<'a, T> {
    id: String,
    method: Method,
    uri: String,
    mapper: ResponseMapper<'a, T>,
}

#[derive(Debug, Deserialize)]
struct SubResponse {
    id: String,
    status: u16,
    #[serde(default)]
    body: Value,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    responses: Vec<SubResponse>,
}

pub struct BatchMultiplexer<'a, T> {
    executor: &'a RetryExecutor,
    requests: Vec<SubRequest<'a, T>>,
    next_id: u32,
    cap: usize,
    limit: Option<usize>,
    session_id: Option<String>,
}

impl<'a, T> BatchMultiplexer<'a, T> {
    pub fn new(executor: &'a RetryExecutor, cap: usize) -> Self {
        Self {
            executor,
            requests: Vec::new(),
            next_id: 1,
            cap: cap.max(1),
            limit: None,
            session_id: None,
        }
    }

    /// Forward the session header inside every sub-request
    pub fn with_session(mut self, session: Option<&EditingSession>) -> Self {
        self.session_id = session.map(|s| s.id().to_string());
        self
    }

    /// Stop after `limit` values in total, across all sub-requests.
    /// A limit of 0 means no limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    /// Queue a GET sub-request
    pub fn add_request(
        &mut self,
        template: &str,
        args: &UriArgs,
        mapper: impl Fn(&Value) -> SheetResult<Vec<T>> + 'a,
    ) -> SheetResult<&mut Self> {
        self.add_request_with_method(Method::Get, template, args, mapper)
    }

    pub fn add_request_with_method(
        &mut self,
        method: Method,
        template: &str,
        args: &UriArgs,
        mapper: impl Fn(&Value) -> SheetResult<Vec<T>> + 'a,
    ) -> SheetResult<&mut Self> {
        let uri = expand_uri(template, args)?;
        let id = self.next_id.to_string();
        self.next_id += 1;

        self.requests.push(SubRequest {
            id,
            method,
            uri,
            mapper: Box::new(mapper),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Lazy sequence of mapped values. Nothing is sent until it is consumed,
    /// and an empty batch never calls the API.
    pub fn execute(self) -> BatchResults<'a, T> {
        BatchResults {
            executor: self.executor,
            pending: self.requests.into(),
            cap: self.cap,
            session_id: self.session_id,
            group: VecDeque::new(),
            current: None,
            values: VecDeque::new(),
            limit: ResultLimit::new(self.limit),
            done: false,
        }
    }
}

impl<'a> BatchMultiplexer<'a, Value> {
    /// Queue a GET sub-request yielding the raw response body
    pub fn add_raw_request(&mut self, template: &str, args: &UriArgs) -> SheetResult<&mut Self> {
        self.add_request(template, args, |body| Ok(vec![body.clone()]))
    }
}

/// Values admitted so far against the optional shared limit
struct ResultLimit {
    max: Option<usize>,
    yielded: usize,
}

impl ResultLimit {
    fn new(max: Option<usize>) -> Self {
        Self { max, yielded: 0 }
    }

    fn is_reached(&self) -> bool {
        self.max.is_some_and(|max| self.yielded >= max)
    }

    /// Count one value; `false` once the limit is used up
    fn admit(&mut self) -> bool {
        if self.is_reached() {
            return false;
        }
        self.yielded += 1;
        true
    }
}

/// Iterator returned by [`BatchMultiplexer::execute`]
pub struct BatchResults<'a, T> {
    executor: &'a RetryExecutor,
    pending: VecDeque<SubRequest<'a, T>>,
    cap: usize,
    session_id: Option<String>,
    /// Sent sub-requests with their sub-response, not yet processed
    group: VecDeque<(SubRequest<'a, T>, Option<SubResponse>)>,
    /// Sub-request being paginated, with its continuation link
    current: Option<(SubRequest<'a, T>, String)>,
    values: VecDeque<T>,
    limit: ResultLimit,
    done: bool,
}

impl<'a, T> BatchResults<'a, T> {
    fn fail(&mut self, error: SheetError) -> Option<SheetResult<T>> {
        self.done = true;
        Some(Err(error))
    }

    fn session_headers(&self) -> Vec<(&str, &str)> {
        self.session_id
            .as_deref()
            .map(|id| vec![(SESSION_HEADER, id)])
            .unwrap_or_default()
    }

    /// Send the next group of at most `cap` sub-requests
    fn send_group(&mut self) -> SheetResult<()> {
        let take = self.cap.min(self.pending.len());
        let requests: Vec<SubRequest<'a, T>> = self.pending.drain(..take).collect();

        let payload: Vec<Value> = requests
            .iter()
            .map(|request| {
                let mut entry = json!({
                    "id": request.id,
                    "method": request.method.as_str(),
                    "url": request.uri,
                });
                if let Some(id) = &self.session_id {
                    let mut headers = Map::new();
                    headers.insert(SESSION_HEADER.to_string(), Value::String(id.clone()));
                    entry["headers"] = Value::Object(headers);
                }
                entry
            })
            .collect();

        debug!(requests = payload.len(), "Sending batch");
        let body = json!({ "requests": payload });
        let response = self
            .executor
            .execute(Method::Post, BATCH_URI, &[], Some(&body), &[])?;

        let parsed: BatchResponse = serde_json::from_value(response.json()?).map_err(|e| {
            SheetError::UnexpectedResponse(format!("malformed batch response: {}", e))
        })?;

        let mut by_id: HashMap<String, SubResponse> = parsed
            .responses
            .into_iter()
            .map(|sub| (sub.id.clone(), sub))
            .collect();

        self.group = requests
            .into_iter()
            .map(|request| {
                let sub = by_id.remove(&request.id);
                (request, sub)
            })
            .collect();
        Ok(())
    }

    /// Map one successful page and remember its continuation
    fn accept_page(&mut self, request: SubRequest<'a, T>, body: &Value) -> SheetResult<()> {
        self.values.extend((request.mapper)(body)?);
        if let Some(link) = body[NEXT_LINK].as_str() {
            self.current = Some((request, link.to_string()));
        }
        Ok(())
    }

    fn next_page(&mut self, request: SubRequest<'a, T>, link: String) -> SheetResult<()> {
        debug!(id = %request.id, "Following continuation link");
        let headers = self.session_headers();
        let body = self
            .executor
            .execute(Method::Get, &link, &[], None, &headers)?
            .json()?;
        self.accept_page(request, &body)
    }

    fn process_sub_response(
        &mut self,
        request: SubRequest<'a, T>,
        sub: Option<SubResponse>,
    ) -> SheetResult<()> {
        let sub = sub.ok_or_else(|| {
            SheetError::UnexpectedResponse(format!(
                "batch response has no sub-response for request \"{}\"",
                request.id
            ))
        })?;

        if !(200..300).contains(&sub.status) {
            let failure = FailureDescription::from_sub_response(sub.status, &sub.body);
            return Err(self
                .executor
                .classifier()
                .sub_response_error(&failure, &request.uri));
        }

        self.accept_page(request, &sub.body)
    }
}

impl<'a, T> Iterator for BatchResults<'a, T> {
    type Item = SheetResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if self.limit.is_reached() {
                self.done = true;
                return None;
            }

            if !self.values.is_empty() {
                if !self.limit.admit() {
                    self.done = true;
                    return None;
                }
                return self.values.pop_front().map(Ok);
            }

            let step = if let Some((request, link)) = self.current.take() {
                self.next_page(request, link)
            } else if let Some((request, sub)) = self.group.pop_front() {
                self.process_sub_response(request, sub)
            } else if !self.pending.is_empty() {
                self.send_group()
            } else {
                self.done = true;
                return None;
            };

            if let Err(e) = step {
                return self.fail(e);
            }
        }
    }
}
