use super::*;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde_json::{json, Value};
use shared::{
    domain::{Segment, Territory},
    error::RemoteQueryError,
    protocol::QueryRequest,
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::config::ReadModelCredentials;

#[derive(Default)]
struct RecordingSource {
    calls: Mutex<Vec<(Action, CanonicalFilter, Pagination)>>,
    fail: bool,
}

#[async_trait]
impl QuerySource for RecordingSource {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn fetch(
        &self,
        action: Action,
        filter: &CanonicalFilter,
        pagination: Pagination,
    ) -> Result<RawQueryResponse, QueryError> {
        self.calls
            .lock()
            .await
            .push((action, filter.clone(), pagination));
        if self.fail {
            return Err(RemoteQueryError::new("permission denied for table company").into());
        }
        Ok(RawQueryResponse::Sequence(vec![json!({"id": 1})]))
    }
}

#[derive(Clone, Default)]
struct EndpointState {
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn handle_query(
    State(state): State<EndpointState>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let action = body["action"].as_str().unwrap_or_default().to_string();
    state.bodies.lock().await.push(body);
    if action == "predict_score" {
        Json(json!({"model_used": "catboost_v2", "prediction_proba": [[0.35, 0.65]]}))
    } else {
        Json(json!({"results": [{"id": 9, "name": "Endpoint Co"}], "total": 12}))
    }
}

async fn read_model_failure() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"code": "PGRST301", "message": "JWT expired", "hint": "refresh the key"})),
    )
}

async fn spawn_backends() -> (String, EndpointState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = EndpointState::default();
    let app = Router::new()
        .route("/query", post(handle_query))
        .route("/rest/v1/company", get(read_model_failure))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

fn endpoint(url: &str) -> ActionEndpoint {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    ActionEndpoint::new(Client::new(), url)
}

fn filter_from_mask(mask: u8) -> CanonicalFilter {
    CanonicalFilter {
        territory: (mask & 1 != 0).then(|| Territory {
            country: Some("Argentina".into()),
            ..Territory::default()
        }),
        client_name: (mask & 2 != 0).then(|| "Acme".to_string()),
        industry: (mask & 4 != 0).then(|| "Telco".to_string()),
        segment: (mask & 8 != 0).then_some(Segment::Territory),
    }
}

#[test]
fn action_is_search_exactly_when_a_filter_key_is_set() {
    for mask in 0u8..16 {
        let expected = if mask == 0 {
            Action::ListCompanies
        } else {
            Action::SearchCompany
        };
        assert_eq!(action_for(&filter_from_mask(mask)), expected, "mask {mask:04b}");
    }
}

#[test]
fn empty_nested_territory_still_lists() {
    let filter = CanonicalFilter {
        territory: Some(Territory::default()),
        ..CanonicalFilter::default()
    };
    assert_eq!(action_for(&filter), Action::ListCompanies);
}

#[tokio::test]
async fn listing_actions_use_injected_source_once() {
    let source = Arc::new(RecordingSource::default());
    let dispatcher =
        QueryDispatcher::with_listing_source(endpoint("http://127.0.0.1:9"), source.clone());
    assert_eq!(dispatcher.listing_backend(), "recording");

    let filter = filter_from_mask(1);
    let response = dispatcher
        .dispatch(Action::SearchCompany, &filter, Pagination::default())
        .await
        .expect("dispatch");
    assert_eq!(response, RawQueryResponse::Sequence(vec![json!({"id": 1})]));

    let calls = source.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, Action::SearchCompany);
    assert_eq!(calls[0].1, filter);
}

#[tokio::test]
async fn listing_errors_are_not_retried_against_the_endpoint() {
    let (url, state) = spawn_backends().await;
    let source = Arc::new(RecordingSource {
        fail: true,
        ..RecordingSource::default()
    });
    let dispatcher = QueryDispatcher::with_listing_source(endpoint(&url), source.clone());

    let err = dispatcher
        .dispatch(Action::ListCompanies, &CanonicalFilter::default(), Pagination::default())
        .await
        .expect_err("source fails");
    assert!(matches!(err, QueryError::RemoteQuery(_)));
    assert!(err.to_string().contains("permission denied"));
    assert_eq!(source.calls.lock().await.len(), 1);
    assert!(state.bodies.lock().await.is_empty());
}

#[tokio::test]
async fn configured_read_model_errors_surface_verbatim() {
    let (url, state) = spawn_backends().await;
    let read_model = RelationalReadModel::new(
        Client::new(),
        ReadModelCredentials {
            url: url.clone(),
            key: "stale".into(),
        },
    );
    let dispatcher = QueryDispatcher::new(endpoint(&url), Some(read_model));
    assert_eq!(dispatcher.listing_backend(), "read_model");

    let err = dispatcher
        .dispatch(Action::SearchCompany, &filter_from_mask(2), Pagination::default())
        .await
        .expect_err("read model rejects");
    let remote = match err {
        QueryError::RemoteQuery(remote) => remote,
        other => panic!("expected remote query error, got {other:?}"),
    };
    assert_eq!(remote.code.as_deref(), Some("PGRST301"));
    assert_eq!(remote.message, "JWT expired");
    assert_eq!(remote.hint.as_deref(), Some("refresh the key"));
    assert!(state.bodies.lock().await.is_empty());
}

#[tokio::test]
async fn without_read_model_listing_posts_to_query_endpoint() {
    let (url, state) = spawn_backends().await;
    let dispatcher = QueryDispatcher::new(endpoint(&url), None);
    assert_eq!(dispatcher.listing_backend(), "action_endpoint");

    let filter = filter_from_mask(2);
    let response = dispatcher
        .dispatch(Action::SearchCompany, &filter, Pagination::new(Some(10), 0))
        .await
        .expect("dispatch");
    assert!(matches!(response, RawQueryResponse::Results { total: Some(12), .. }));

    let bodies = state.bodies.lock().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0],
        json!({
            "action": "search_company",
            "params": {"clientName": "Acme"},
            "pagination": {"limit": 10, "offset": 0}
        })
    );
    let decoded: QueryRequest<CanonicalFilter> =
        serde_json::from_value(bodies[0].clone()).expect("request decodes");
    assert_eq!(decoded.params, filter);
}

#[tokio::test]
async fn predict_score_always_uses_the_endpoint() {
    let (url, state) = spawn_backends().await;
    let read_model = RelationalReadModel::new(
        Client::new(),
        ReadModelCredentials {
            url: url.clone(),
            key: "k".into(),
        },
    );
    let dispatcher = QueryDispatcher::new(endpoint(&url), Some(read_model));

    let input = PredictInput {
        revenue_band: "$1M-$2.49M".into(),
        partner_classification: "Cloud Service Provider (CSP)".into(),
        ..PredictInput::default()
    };
    let response = dispatcher.predict_score(&input).await.expect("predict");
    assert_eq!(response.model_used, "catboost_v2");
    assert_eq!(response.positive_probability(), Some(0.65));

    let raw = dispatcher
        .dispatch(Action::PredictScore, &CanonicalFilter::default(), Pagination::default())
        .await
        .expect("dispatch predict");
    assert!(matches!(raw, RawQueryResponse::Unrecognized(_)));

    let bodies = state.bodies.lock().await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(
        bodies[0],
        json!({
            "action": "predict_score",
            "params": {
                "revenue_band": "$1M-$2.49M",
                "partner_classification": "Cloud Service Provider (CSP)"
            }
        })
    );
}

#[tokio::test]
async fn transport_failure_names_the_base_url() {
    let dispatcher = QueryDispatcher::new(endpoint("http://127.0.0.1:9"), None);
    let err = dispatcher
        .dispatch(Action::ListCompanies, &CanonicalFilter::default(), Pagination::default())
        .await
        .expect_err("nothing listens on port 9");
    assert!(matches!(err, QueryError::Backend { .. }));
    assert!(err.to_string().contains("http://127.0.0.1:9"));
}

#[tokio::test]
async fn sectors_are_empty_without_read_model() {
    let dispatcher = QueryDispatcher::new(endpoint("http://127.0.0.1:9"), None);
    assert!(dispatcher.industry_sectors(100).await.expect("sectors").is_empty());
}

#[test]
fn from_settings_rejects_half_configured_read_model() {
    let settings = Settings {
        read_model_key: Some("anon".into()),
        ..Settings::default()
    };
    assert!(matches!(
        QueryDispatcher::from_settings(&settings),
        Err(QueryError::Config(_))
    ));
}
