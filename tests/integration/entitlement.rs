//! Integration tests for entitlement resolution on the wire

use reqwest::Client;
use vantage_dataflow::fetcher::vantage_config::{EntitlementOverride, VantageConfig};
use vantage_dataflow::fetcher::vantage_http::VantageHttpClient;
use vantage_dataflow::{RequestDescriptor, Transport};

use crate::support::stub_server::{api_key_env, daily_csv, StubResponse, StubServer};

async fn sent_entitlement(
    server: &StubServer,
    client: &VantageHttpClient,
    request: RequestDescriptor,
) -> Option<String> {
    client.execute(&request).await.unwrap();
    server.queries().last().unwrap().get("entitlement").cloned()
}

fn client_with(server: &StubServer, key_env: &str, entitlement: EntitlementOverride) -> VantageHttpClient {
    let config = VantageConfig::default()
        .with_base_url(server.url())
        .with_api_key_env(key_env)
        .with_entitlement(entitlement);
    VantageHttpClient::new(Client::new(), config)
}

#[tokio::test]
async fn test_no_entitlement_sends_no_param() {
    let server = StubServer::start(vec![StubResponse::Ok(daily_csv(1, 1))]).await;
    let client = client_with(&server, &api_key_env("ent_none"), EntitlementOverride::default());

    let sent = sent_entitlement(&server, &client, RequestDescriptor::new("GLOBAL_QUOTE")).await;
    assert_eq!(sent, None);
}

#[tokio::test]
async fn test_override_applies_when_request_has_none() {
    let server = StubServer::start(vec![StubResponse::Ok(daily_csv(1, 1))]).await;
    let entitlement = EntitlementOverride::new(Some("delayed".into()));
    let client = client_with(&server, &api_key_env("ent_override"), entitlement);

    let sent = sent_entitlement(&server, &client, RequestDescriptor::new("GLOBAL_QUOTE")).await;
    assert_eq!(sent.as_deref(), Some("delayed"));
}

#[tokio::test]
async fn test_request_entitlement_beats_override() {
    let server = StubServer::start(vec![StubResponse::Ok(daily_csv(1, 1))]).await;
    let entitlement = EntitlementOverride::new(Some("delayed".into()));
    let client = client_with(&server, &api_key_env("ent_request_wins"), entitlement);

    let request = RequestDescriptor::new("GLOBAL_QUOTE")
        .param("symbol", "IBM")
        .entitlement("realtime");
    let sent = sent_entitlement(&server, &client, request).await;
    assert_eq!(sent.as_deref(), Some("realtime"));
}

#[tokio::test]
async fn test_override_changes_apply_to_later_requests() {
    let server = StubServer::start(vec![StubResponse::Ok(daily_csv(1, 1))]).await;
    let entitlement = EntitlementOverride::default();
    let client = client_with(&server, &api_key_env("ent_live_update"), entitlement.clone());

    let first = sent_entitlement(&server, &client, RequestDescriptor::new("GLOBAL_QUOTE")).await;
    entitlement.set("realtime");
    let second = sent_entitlement(&server, &client, RequestDescriptor::new("GLOBAL_QUOTE")).await;
    entitlement.clear();
    let third = sent_entitlement(&server, &client, RequestDescriptor::new("GLOBAL_QUOTE")).await;

    assert_eq!(first, None);
    assert_eq!(second.as_deref(), Some("realtime"));
    assert_eq!(third, None);
}

#[tokio::test]
async fn test_override_shared_across_concurrent_requests() {
    let server = StubServer::start(vec![StubResponse::Ok(daily_csv(1, 1))]).await;
    let entitlement = EntitlementOverride::new(Some("delayed".into()));
    let client = std::sync::Arc::new(client_with(
        &server,
        &api_key_env("ent_concurrent"),
        entitlement,
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.execute(&RequestDescriptor::new("GLOBAL_QUOTE")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let queries = server.queries();
    assert_eq!(queries.len(), 8);
    assert!(queries
        .iter()
        .all(|q| q.get("entitlement").map(String::as_str) == Some("delayed")));
}
