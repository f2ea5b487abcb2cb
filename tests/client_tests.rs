//! Workbook API facade tests

mod common;

use common::*;
use pretty_assertions::assert_eq;
use royalbit_sheetwriter::api::{EditingSession, Method};
use royalbit_sheetwriter::{SheetError, TableRange};
use serde_json::json;

const WORKBOOK: &str = "/drives/drive1/items/file1/workbook";

fn worksheets_path() -> String {
    format!("{}/worksheets?$select=id,position,name,visibility", WORKBOOK)
}

fn worksheet_list() -> serde_json::Value {
    json!({"value": [
        {"id": "{B}", "position": 1, "name": "Data", "visibility": "Visible"},
        {"id": "{A}", "position": 0, "name": "Sheet1", "visibility": "Visible"}
    ]})
}

// ═══════════════════════════════════════════════════════════════════════════
// WORKSHEET TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_sheets_are_sorted_with_headers() {
    let transport = MockTransport::new();
    transport.push_json(200, worksheet_list()).push(batch_response(&[
        ("2", 200, json!({"address": "Data!A1:B1", "text": [["Name", "Name"]]})),
        ("1", 200, json!({"address": "Sheet1!A1", "text": [[""]]})),
    ]));
    let client = client(&transport);

    let sheets = client.sheets("drive1", "file1", None).unwrap();

    let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Sheet1", "Data"]);
    assert!(sheets[0].header.as_ref().unwrap().is_empty());
    assert_eq!(
        sheets[1].header.as_ref().unwrap().columns(),
        ["Name".to_string(), "Name-1".to_string()]
    );

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    let sub_requests = &body(&requests[1])["requests"];
    assert_eq!(
        sub_requests[0]["url"],
        format!(
            "{}/worksheets/%7BA%7D/usedRange(valuesOnly=true)/row(row=0)?$select=address,text",
            WORKBOOK
        )
    );
}

#[test]
fn test_sheet_lookup_by_name_and_position() {
    let transport = MockTransport::new();
    transport
        .push_json(200, worksheet_list())
        .push_json(200, worksheet_list())
        .push_json(200, worksheet_list());
    let client = client(&transport);

    assert_eq!(
        client.sheet_id_by_name("drive1", "file1", "Data", None).unwrap(),
        Some("{B}".to_string())
    );
    assert_eq!(
        client.sheet_id_by_position("drive1", "file1", 0, None).unwrap(),
        Some("{A}".to_string())
    );
    assert_eq!(
        client.sheet_id_by_name("drive1", "file1", "data", None).unwrap(),
        None
    );
    assert_eq!(transport.paths()[0], worksheets_path());
}

#[test]
fn test_negative_position_is_rejected_without_calls() {
    let transport = MockTransport::new();
    let client = client(&transport);

    let err = client
        .sheet_id_by_position("drive1", "file1", -1, None)
        .unwrap_err();

    assert!(matches!(err, SheetError::Config(_)));
    assert_eq!(transport.request_count(), 0);
}

#[test]
fn test_sheet_name_of_missing_sheet() {
    let transport = MockTransport::new();
    transport
        .push_json(200, json!({"id": "{A}", "name": "Sheet1", "position": 0}))
        .push_api_error(404, "itemNotFound", "The requested resource doesn't exist.");
    let client = client(&transport);

    assert_eq!(
        client.sheet_name("drive1", "file1", "{A}", None).unwrap(),
        Some("Sheet1".to_string())
    );
    assert_eq!(client.sheet_name("drive1", "file1", "{X}", None).unwrap(), None);
}

#[test]
fn test_create_and_rename_sheet() {
    let transport = MockTransport::new();
    transport
        .push_json(201, json!({"id": "{C}", "position": 2, "name": "New"}))
        .push_json(200, json!({"id": "ws1", "position": 0, "name": "Renamed"}));
    let client = client(&transport);
    let session = EditingSession::new("drive1", "file1", "s1");

    let created = client
        .create_sheet("drive1", "file1", "New", Some(&session))
        .unwrap();
    client
        .rename_sheet(&sheet_ref(false), "Renamed", Some(&session))
        .unwrap();

    assert_eq!(created.id, "{C}");
    assert_eq!(created.position, 2);

    let requests = transport.requests();
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(transport.paths()[0], format!("{}/worksheets/add", WORKBOOK));
    assert_eq!(body(&requests[0]), json!({"name": "New"}));
    assert_eq!(requests[1].method, Method::Patch);
    assert_eq!(transport.paths()[1], format!("{}/worksheets/ws1", WORKBOOK));
    assert_eq!(body(&requests[1]), json!({"name": "Renamed"}));
    assert!(requests.iter().all(|r| r.header("Workbook-Session-Id") == Some("s1")));
}

// ═══════════════════════════════════════════════════════════════════════════
// RANGE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_sheet_range_and_header() {
    let transport = MockTransport::new();
    transport
        .push_json(200, json!({"address": "Sheet1!B2:D9"}))
        .push_json(
            200,
            json!({"address": "Sheet1!B2:D2", "text": [["Čas", "", "Value"]]}),
        );
    let client = client(&transport);
    let sheet = sheet_ref(false);

    let range = client.sheet_range(&sheet, None).unwrap();
    let header = client.sheet_header(&sheet, None).unwrap();

    assert_eq!(range, TableRange::new("B", "D", 2, 9).unwrap());
    assert_eq!(header.address(), "B2:D2");
    assert_eq!(header.columns(), ["Cas", "column-2", "Value"]);
}

#[test]
fn test_malformed_range_address() {
    let transport = MockTransport::new();
    transport.push_json(200, json!({"address": "Sheet1!"}));
    let client = client(&transport);

    let err = client.sheet_range(&sheet_ref(false), None).unwrap_err();

    assert!(matches!(err, SheetError::MalformedAddress(_)));
}

#[test]
fn test_write_range() {
    let transport = MockTransport::new();
    transport.push_json(200, json!({}));
    let client = client(&transport);

    let range = TableRange::new("A", "B", 4, 5).unwrap();
    let values = json!([["1", "a"], ["2", "b"]]);
    client
        .write_range(&sheet_ref(false), &range, &values, None)
        .unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::Patch);
    assert_eq!(
        transport.paths()[0],
        format!("{}/worksheets/ws1/range(address='A4:B5')", WORKBOOK)
    );
    assert_eq!(body(request), json!({"values": [["1", "a"], ["2", "b"]]}));
}

#[test]
fn test_clear_sheet() {
    let transport = MockTransport::new();
    transport.push(royalbit_sheetwriter::api::HttpResponse::new(204, ""));
    let client = client(&transport);

    client.clear_sheet(&sheet_ref(false), None).unwrap();

    assert_eq!(
        transport.paths(),
        vec![format!("{}/worksheets/ws1/range/clear", WORKBOOK)]
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// ACCOUNT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_account_name() {
    let transport = MockTransport::new();
    transport
        .push_json(200, json!({"displayName": "Ada Lovelace", "userPrincipalName": "ada@contoso.com"}))
        .push_json(200, json!({"displayName": null, "userPrincipalName": "svc@contoso.com"}))
        .push_json(200, json!({}));
    let client = client(&transport);

    assert_eq!(client.account_name().unwrap(), "Ada Lovelace");
    assert_eq!(client.account_name().unwrap(), "svc@contoso.com");
    assert!(matches!(
        client.account_name(),
        Err(SheetError::UnexpectedResponse(_))
    ));
    assert_eq!(transport.paths()[0], "/me?$select=displayName,userPrincipalName");
}
