// End-to-end flow: an Axum handler builds a RequestContext, compiles the
// query, and answers with the structured descriptor plus pagination headers,
// the way a record-store-backed collection endpoint would.

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;
use tower::ServiceExt;

use listquery::{
    ApiConfig, ApiError, AssociationArity, AttributeType, EntitySchema, ListParams,
    QueryCompiler, RequestContext, RouteOptions, SchemaRegistry, pagination_headers,
};

const MATCHING_RECORDS: u64 = 95;

#[derive(Clone)]
struct AppState {
    compiler: Arc<QueryCompiler>,
    registry: Arc<SchemaRegistry>,
}

fn test_state() -> AppState {
    let mut registry = SchemaRegistry::new();
    registry.register(
        EntitySchema::new("user", "userId")
            .attr("name", AttributeType::String)
            .attr("age", AttributeType::Number)
            .attr("password", AttributeType::String)
            .attr("createdAt", AttributeType::Date)
            .assoc("posts", AssociationArity::Many),
    );
    AppState {
        compiler: Arc::new(QueryCompiler::new(ApiConfig::default())),
        registry: Arc::new(registry),
    }
}

fn request_context(uri: &Uri) -> Result<RequestContext, ApiError> {
    RequestContext::parse(&format!("http://api.test{uri}"))
        .map_err(|err| ApiError::configuration(err.to_string()))
        .map(|req| {
            req.with_options(RouteOptions {
                entity: Some("user".to_string()),
                ..RouteOptions::default()
            })
        })
}

// `Query<ListParams>` validates the recognized parameters' types at the
// edge before the compiler sees anything.
async fn list_users(
    State(state): State<AppState>,
    Query(_params): Query<ListParams>,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let req = request_context(&uri)?;
    let schema = state.registry.resolve(req.options.entity.as_deref())?;

    let query = state.compiler.compile(&req, schema)?;
    // A real handler would hand `query` to the record store here; the store
    // would come back with the records and the total match count.
    let urls = state.compiler.pagination_urls(&req, schema, MATCHING_RECORDS)?;
    let headers = pagination_headers(MATCHING_RECORDS, &urls);

    Ok((
        headers,
        Json(serde_json::json!({"query": query, "links": urls})),
    ))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let req = request_context(&uri)?.with_route_param("id", id);
    let schema = state.registry.resolve(req.options.entity.as_deref())?;

    let pk = state.compiler.parse_required_pk(&req, schema)?;
    let query = state.compiler.compile(&req, schema)?;
    Ok(Json(serde_json::json!({"pk": pk, "query": query})))
}

async fn current_user(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let req = request_context(&uri)?;
    let schema = state.registry.resolve(req.options.entity.as_deref())?;
    // No identifier anywhere on this route
    let pk = state.compiler.parse_required_pk(&req, schema)?;
    Ok(Json(serde_json::json!({"pk": pk})))
}

fn test_app() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/current", get(current_user))
        .route("/users/{id}", get(get_user))
        .with_state(test_state())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, headers, json)
}

#[tokio::test]
async fn collection_request_compiles_and_paginates() {
    let uri = "/users?name=Max&age=%3E%3D18&sort=-id&page=2&limit=10&fields=-password";
    let (status, headers, body) = get_json(test_app(), uri).await;
    assert_eq!(status, StatusCode::OK);

    // Headers carry the total count and the replayed links
    assert_eq!(headers.get("X-Total-Count").unwrap(), "95");
    let link = headers.get("Link").unwrap().to_str().unwrap();
    assert!(link.contains("rel=\"next\""));
    assert!(link.contains("page=3"));
    assert!(link.contains("age=%3E%3D18"));
    assert!(link.contains("sort=-userId"));
    assert!(link.contains("fields=-password"));

    // The structured descriptor the record store would receive
    assert_eq!(
        body["query"]["where"],
        serde_json::json!({"name": "Max", "age": {">=": "18"}})
    );
    assert_eq!(body["query"]["sort"], serde_json::json!({"userId": 0}));
    assert_eq!(
        body["query"]["select"],
        serde_json::json!(["userId", "name", "age", "createdAt"])
    );
    assert_eq!(
        body["query"]["pagination"],
        serde_json::json!({"page": 2, "limit": 10})
    );

    // ceil(95 / 10) = 10 pages
    assert_eq!(
        body["links"]["last"],
        serde_json::json!(
            "http://api.test/users?page=10&limit=10&sort=-userId&name=Max&age=%3E%3D18&fields=-password"
        )
    );
}

#[tokio::test]
async fn unknown_filter_fields_drop_silently() {
    let (status, _, body) = get_json(test_app(), "/users?bogusField=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"]["where"], serde_json::json!({}));
}

#[tokio::test]
async fn limit_is_clamped_against_the_maximum() {
    let (status, _, body) = get_json(test_app(), "/users?limit=500").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"]["pagination"]["limit"], serde_json::json!(100));
}

#[tokio::test]
async fn typed_parameters_reject_garbage_at_the_edge() {
    let (status, _, _) = get_json(test_app(), "/users?page=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn route_identifier_becomes_a_primary_key_filter() {
    let (status, _, body) = get_json(test_app(), "/users/7?userId=99").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pk"], serde_json::json!("7"));
    // The query-string value for the pk is blacklisted; the route id wins
    assert_eq!(body["query"]["where"], serde_json::json!({"userId": "7"}));
}

#[tokio::test]
async fn missing_identifier_is_a_client_error() {
    let (status, _, body) = get_json(test_app(), "/users/current").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("`id`"));
}
