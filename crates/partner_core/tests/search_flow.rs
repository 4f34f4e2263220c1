use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use partner_core::{PartnerSearch, QueryDispatcher, QueryError, SearchForm, SearchSession, Settings};
use serde_json::{json, Value};
use shared::domain::CompanyRecord;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct Backend {
    endpoint_response: Arc<Mutex<(StatusCode, Value)>>,
    endpoint_hits: Arc<Mutex<u32>>,
    read_model_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl Backend {
    fn new() -> Self {
        Self {
            endpoint_response: Arc::new(Mutex::new((StatusCode::OK, json!([])))),
            endpoint_hits: Arc::new(Mutex::new(0)),
            read_model_queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn respond_with(&self, status: StatusCode, body: Value) {
        *self.endpoint_response.lock().await = (status, body);
    }
}

async fn query_endpoint(State(backend): State<Backend>) -> impl IntoResponse {
    *backend.endpoint_hits.lock().await += 1;
    let (status, body) = backend.endpoint_response.lock().await.clone();
    (status, Json(body))
}

async fn company_table(
    State(backend): State<Backend>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    backend.read_model_queries.lock().await.push(query);
    (
        StatusCode::OK,
        [(header::CONTENT_RANGE, "0-1/2")],
        Json(json!([
            {
                "id": 1,
                "name": "Andes Cloud",
                "company_location": [
                    {"location_master": {"country": "Argentina", "city": "Cordoba", "global_region": "LATAM"}}
                ],
                "company_industry": [
                    {"industry_master": {"sector": "Telco", "detail": "Mobile"}},
                    {"industry_master": {"sector": "Finance", "detail": null}}
                ],
                "partner_classification": [{"classification": "Territory"}],
                "score": [{"relevance": 4}, {"relevance": 6}, {"relevance": "x"}]
            },
            {"id": 2, "name": "No Joins SA"}
        ])),
    )
}

async fn spawn_backend() -> (String, Backend) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let backend = Backend::new();
    let app = Router::new()
        .route("/query", post(query_endpoint))
        .route("/rest/v1/company", get(company_table))
        .with_state(backend.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), backend)
}

fn search_for(settings: &Settings) -> PartnerSearch {
    PartnerSearch::new(QueryDispatcher::from_settings(settings).expect("dispatcher"))
}

#[tokio::test]
async fn endpoint_results_shape_keeps_reported_total() {
    let (url, backend) = spawn_backend().await;
    backend
        .respond_with(
            StatusCode::OK,
            json!({"results": [{"id": 1, "name": "Acme"}], "total": 42}),
        )
        .await;
    let search = search_for(&Settings {
        api_base: format!("{url}/"),
        ..Settings::default()
    });

    let page = search.run(&SearchForm::default()).await.expect("search");
    assert_eq!(page.records, vec![json!({"id": 1, "name": "Acme"})]);
    assert_eq!(page.total, 42);
}

#[tokio::test]
async fn endpoint_unrecognized_shape_yields_no_results() {
    let (url, backend) = spawn_backend().await;
    backend.respond_with(StatusCode::OK, json!({"foo": "bar"})).await;
    let search = search_for(&Settings {
        api_base: url,
        ..Settings::default()
    });

    let page = search.run(&SearchForm::default()).await.expect("search");
    assert!(page.records.is_empty());
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn endpoint_error_detail_is_reported_with_base_url() {
    let (url, backend) = spawn_backend().await;
    backend
        .respond_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"detail": "Para 'search_company', se requiere 'territory' o 'clientName'."}),
        )
        .await;
    let search = search_for(&Settings {
        api_base: url.clone(),
        ..Settings::default()
    });

    let mut session = SearchSession::default();
    let ticket = session.begin();
    let outcome = search
        .run(&SearchForm {
            industry: "Telco".into(),
            ..SearchForm::default()
        })
        .await;
    assert!(matches!(outcome, Err(QueryError::Backend { .. })));
    session.complete(ticket, outcome);

    let message = session.error().expect("error recorded");
    assert!(message.contains(&url), "{message}");
    assert!(message.contains("422"), "{message}");
    assert!(message.contains("se requiere"), "{message}");
}

#[tokio::test]
async fn read_model_rows_are_adapted_and_endpoint_is_untouched() {
    let (url, backend) = spawn_backend().await;
    let search = search_for(&Settings {
        api_base: url.clone(),
        read_model_url: Some(url.clone()),
        read_model_key: Some("anon".into()),
        ..Settings::default()
    });
    assert_eq!(search.dispatcher().listing_backend(), "read_model");

    let page = search
        .run(&SearchForm {
            country: "Argentina".into(),
            limit: "2".into(),
            ..SearchForm::default()
        })
        .await
        .expect("search");
    assert_eq!(page.total, 2);

    let companies: Vec<CompanyRecord> = page.records.iter().map(CompanyRecord::from_raw).collect();
    let andes = &companies[0];
    assert_eq!(andes.industry.as_deref(), Some("Telco | Finance"));
    assert_eq!(andes.industry_details, vec!["Mobile".to_string()]);
    assert_eq!(andes.segment.as_deref(), Some("Territory"));
    assert_eq!(andes.partner_score, Some(5.0));
    assert_eq!(andes.territory.global_region.as_deref(), Some("LATAM"));

    let bare = &companies[1];
    assert_eq!(bare.industry, None);
    assert_eq!(bare.segment, None);
    assert_eq!(bare.partner_score, None);
    assert!(bare.classifications.is_empty());
    assert_eq!(bare.territory.country, None);

    let queries = backend.read_model_queries.lock().await;
    assert_eq!(
        queries[0]["company_location.location_master.country"],
        "eq.Argentina"
    );
    assert_eq!(*backend.endpoint_hits.lock().await, 0);
}
