//! Integration tests for the single-attempt HTTP transport

use reqwest::Client;
use vantage_dataflow::fetcher::retry_formatter::RetryErrorType;
use vantage_dataflow::fetcher::vantage_config::VantageConfig;
use vantage_dataflow::fetcher::vantage_http::VantageHttpClient;
use vantage_dataflow::{ApiPayload, FetcherError, RequestDescriptor, Transport};

use crate::support::stub_server::{api_key_env, daily_csv, StubResponse, StubServer};

fn transport(server: &StubServer, key_env: &str) -> VantageHttpClient {
    let config = VantageConfig::default()
        .with_base_url(server.url())
        .with_api_key_env(key_env);
    VantageHttpClient::new(Client::new(), config)
}

#[tokio::test]
async fn test_missing_credential_fails_before_network() {
    let server = StubServer::start(vec![StubResponse::Ok(daily_csv(1, 2))]).await;
    let client = transport(&server, "VANTAGE_TEST_KEY_DEFINITELY_UNSET");

    let err = client
        .execute(&RequestDescriptor::new("TIME_SERIES_DAILY").param("symbol", "IBM"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::Configuration(_)), "got {err:?}");
    assert!(err.to_string().contains("VANTAGE_TEST_KEY_DEFINITELY_UNSET"));
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn test_csv_body_returned_unchanged() {
    let csv = daily_csv(1, 3);
    let server = StubServer::start(vec![StubResponse::Ok(csv.clone())]).await;
    let client = transport(&server, &api_key_env("transport_csv"));

    let payload = client
        .execute(&RequestDescriptor::new("TIME_SERIES_DAILY").param("symbol", "IBM"))
        .await
        .unwrap();

    assert_eq!(payload, ApiPayload::Text(csv));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_query_carries_function_params_key_and_tag() {
    let server = StubServer::start(vec![StubResponse::Ok(daily_csv(1, 1))]).await;
    let client = transport(&server, &api_key_env("transport_query"));

    client
        .execute(
            &RequestDescriptor::new("TIME_SERIES_DAILY_ADJUSTED")
                .param("symbol", "NVDA")
                .param("outputsize", "full")
                .param("datatype", "csv"),
        )
        .await
        .unwrap();

    let queries = server.queries();
    assert_eq!(queries.len(), 1);
    let query = &queries[0];
    assert_eq!(query["function"], "TIME_SERIES_DAILY_ADJUSTED");
    assert_eq!(query["symbol"], "NVDA");
    assert_eq!(query["outputsize"], "full");
    assert_eq!(query["datatype"], "csv");
    assert_eq!(query["apikey"], "test-key");
    assert_eq!(query["source"], "trading_agents");
    assert!(!query.contains_key("entitlement"));
}

#[tokio::test]
async fn test_json_payload_without_notice() {
    let body = r#"{"Symbol": "IBM", "Sector": "TECHNOLOGY"}"#.to_string();
    let server = StubServer::start(vec![StubResponse::Ok(body.clone())]).await;
    let client = transport(&server, &api_key_env("transport_json"));

    let payload = client
        .execute(&RequestDescriptor::new("OVERVIEW").param("symbol", "IBM"))
        .await
        .unwrap();

    assert!(payload.is_json());
    assert_eq!(payload.text(), body);
    assert_eq!(payload.json().unwrap()["Sector"], "TECHNOLOGY");
}

#[tokio::test]
async fn test_rate_limit_notice_in_200_body() {
    let server = StubServer::start(vec![StubResponse::Ok(
        r#"{"Information": "We have detected your API key as ABC and our standard API rate limit is 25 requests per day."}"#
            .to_string(),
    )])
    .await;
    let client = transport(&server, &api_key_env("transport_rate_limit"));

    let err = client
        .execute(&RequestDescriptor::new("NEWS_SENTIMENT"))
        .await
        .unwrap_err();

    match err {
        FetcherError::RateLimited { message } => assert!(message.contains("rate limit")),
        other => panic!("expected rate limit, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transport_fault() {
    let server = StubServer::start(vec![StubResponse::Status(503, "busy".into())]).await;
    let client = transport(&server, &api_key_env("transport_503"));

    let err = client
        .execute(&RequestDescriptor::new("GLOBAL_QUOTE"))
        .await
        .unwrap_err();

    match err {
        FetcherError::Transport(fault) => {
            assert_eq!(fault.kind, RetryErrorType::ServerError(503));
            assert!(fault.message.contains("busy"));
        }
        other => panic!("expected transport fault, got {other:?}"),
    }
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_dropped_connection_is_transport_fault() {
    let server = StubServer::start(vec![StubResponse::Drop]).await;
    let client = transport(&server, &api_key_env("transport_drop"));

    let err = client
        .execute(&RequestDescriptor::new("GLOBAL_QUOTE"))
        .await
        .unwrap_err();

    assert!(err.is_retryable(), "got {err:?}");
    assert!(!err.to_string().contains("test-key"), "API key leaked: {err}");
}

#[tokio::test]
async fn test_unbuildable_url_is_invalid_request() {
    let key_env = api_key_env("transport_bad_url");
    let config = VantageConfig::default()
        .with_base_url("not a url")
        .with_api_key_env(key_env);
    let client = VantageHttpClient::new(Client::new(), config);

    let err = client
        .execute(&RequestDescriptor::new("GLOBAL_QUOTE"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::InvalidRequest(_)), "got {err:?}");
}
