use httpmock::prelude::*;
use hubspot_etl::core::fetcher::{Endpoint, HubSpotClient, QueryParams};
use hubspot_etl::EtlError;
use serde_json::json;
use std::time::Duration;

fn client(server: &MockServer, max_pages: usize) -> HubSpotClient {
    HubSpotClient::new(
        &server.base_url(),
        "pat-test-token",
        Duration::from_secs(5),
        max_pages,
    )
    .unwrap()
}

fn page(ids: &[&str], next: Option<&str>) -> serde_json::Value {
    let results: Vec<_> = ids
        .iter()
        .map(|id| json!({"id": id, "properties": {"email": format!("{}@example.com", id)}}))
        .collect();
    match next {
        Some(after) => json!({
            "results": results,
            "paging": {"next": {"after": after, "link": "ignored"}}
        }),
        None => json!({"results": results}),
    }
}

#[tokio::test]
async fn test_follows_cursor_until_last_page() {
    let server = MockServer::start();

    // 帶 cursor 的頁面要先註冊，才不會被第一頁的 mock 吃掉
    let third = server.mock(|when, then| {
        when.method(GET)
            .path("/crm/v3/objects/contacts")
            .query_param("after", "c3");
        then.status(200).json_body(page(&["5"], None));
    });
    let second = server.mock(|when, then| {
        when.method(GET)
            .path("/crm/v3/objects/contacts")
            .query_param("after", "c2");
        then.status(200).json_body(page(&["3", "4"], Some("c3")));
    });
    let first = server.mock(|when, then| {
        when.method(GET)
            .path("/crm/v3/objects/contacts")
            .query_param("limit", "2");
        then.status(200).json_body(page(&["1", "2"], Some("c2")));
    });

    let mut query = QueryParams::new();
    query.push("limit", "2");
    let records = client(&server, 100)
        .fetch_all(Endpoint::Objects("contacts"), &query)
        .await
        .unwrap();

    let ids: Vec<_> = records
        .iter()
        .map(|r| r.get("id").and_then(|v| v.as_str()).unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    first.assert();
    second.assert();
    third.assert();
}

#[tokio::test]
async fn test_sends_bearer_token() {
    let server = MockServer::start();
    let owners = server.mock(|when, then| {
        when.method(GET)
            .path("/crm/v3/owners")
            .header("authorization", "Bearer pat-test-token")
            .header("content-type", "application/json");
        then.status(200)
            .json_body(json!({"results": [{"id": "9", "email": "owner@example.com"}]}));
    });

    let records = client(&server, 10)
        .fetch_all(Endpoint::Owners, &QueryParams::new())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    owners.assert();
}

#[tokio::test]
async fn test_first_page_error_carries_status_and_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/crm/v3/objects/widgets");
        then.status(404)
            .json_body(json!({"status": "error", "message": "Object type not found"}));
    });

    let err = client(&server, 10)
        .fetch_all(Endpoint::Objects("widgets"), &QueryParams::new())
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        EtlError::RemoteError { status: 404, message } if message == "Object type not found"
    ));
    assert_eq!(err.to_string(), "Error 404: Object type not found");
}

#[tokio::test]
async fn test_later_page_error_discards_partial_results() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/crm/v3/objects/deals")
            .query_param("after", "next");
        then.status(502).body("Bad Gateway from upstream");
    });
    let first = server.mock(|when, then| {
        when.method(GET).path("/crm/v3/objects/deals");
        then.status(200).json_body(page(&["1"], Some("next")));
    });

    let err = client(&server, 10)
        .fetch_all(Endpoint::Objects("deals"), &QueryParams::new())
        .await
        .unwrap_err();

    first.assert();
    assert!(matches!(
        err,
        EtlError::RemoteError { status: 502, ref message } if message == "Bad Gateway from upstream"
    ));
}

#[tokio::test]
async fn test_page_cap_stops_endless_cursor() {
    let server = MockServer::start();
    let endless = server.mock(|when, then| {
        when.method(GET).path("/crm/v3/objects/tickets");
        then.status(200).json_body(page(&["x"], Some("again")));
    });

    let err = client(&server, 3)
        .fetch_all(Endpoint::Objects("tickets"), &QueryParams::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::PaginationLimitExceeded { max_pages: 3 }));
    endless.assert_hits(3);
}

#[tokio::test]
async fn test_empty_first_page_yields_no_records() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/crm/v3/objects/contacts");
        then.status(200).json_body(json!({"results": []}));
    });

    let records = client(&server, 10)
        .fetch_all(Endpoint::Objects("contacts"), &QueryParams::new())
        .await
        .unwrap();
    assert!(records.is_empty());
}
