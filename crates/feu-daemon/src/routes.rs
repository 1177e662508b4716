//! Axum router and all HTTP handlers for feu-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers are thin: decode, call the
//! [`ComplianceService`](feu_compliance::ComplianceService), publish a bus
//! event on mutation, encode.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use feu_compliance::{
    BankEntry, ComplianceError, ComplianceResult, PoolRecord, Route, RouteComparison, RouteFilter,
};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info};

use crate::{
    api_types::{
        ApplyRequest, BankRequest, BaselineRequest, ErrorResponse, HealthResponse, PoolRequest,
        RecordsQuery, RouteYearQuery, RoutesQuery, YearQuery,
    },
    state::{uptime_secs, AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/routes", get(routes_list))
        .route("/v1/routes/comparison", get(routes_comparison))
        .route("/v1/routes/:route_id/baseline", post(routes_set_baseline))
        .route("/v1/compliance/cb", get(compliance_cb))
        .route("/v1/compliance/adjusted-cb", get(compliance_adjusted_cb))
        .route("/v1/banking/records", get(banking_records))
        .route("/v1/banking/bank", post(banking_bank))
        .route("/v1/banking/apply", post(banking_apply))
        .route("/v1/pools", post(pools_create))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Handler error. Domain errors carried inside the `anyhow::Error` pick the
/// status; anything else is a 500 with a generic body.
pub(crate) struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError(e)
    }
}

pub(crate) fn status_for(err: &ComplianceError) -> StatusCode {
    if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0.downcast_ref::<ComplianceError>() {
            Some(domain) => (
                status_for(domain),
                Json(ErrorResponse {
                    error: domain.to_string(),
                    kind: domain.kind().to_string(),
                }),
            )
                .into_response(),
            None => {
                error!("request failed: {:#}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "internal error".to_string(),
                        kind: "internal".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            backend: st.service.backend_name().to_string(),
            uptime_secs: uptime_secs(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub(crate) async fn routes_list(
    State(st): State<Arc<AppState>>,
    Query(q): Query<RoutesQuery>,
) -> ApiResult<Vec<Route>> {
    let filter = RouteFilter::from(q);
    Ok(Json(st.service.list_routes(&filter).await?))
}

pub(crate) async fn routes_set_baseline(
    State(st): State<Arc<AppState>>,
    Path(route_id): Path<String>,
    Json(req): Json<BaselineRequest>,
) -> ApiResult<Route> {
    let route = st.service.set_baseline(&route_id, req.year).await?;
    st.publish(BusMsg::Baseline {
        route_id: route.route_id.clone(),
        year: route.year,
    });
    Ok(Json(route))
}

pub(crate) async fn routes_comparison(
    State(st): State<Arc<AppState>>,
    Query(q): Query<YearQuery>,
) -> ApiResult<Vec<RouteComparison>> {
    Ok(Json(st.service.comparison(q.year).await?))
}

// ---------------------------------------------------------------------------
// Compliance balance
// ---------------------------------------------------------------------------

pub(crate) async fn compliance_cb(
    State(st): State<Arc<AppState>>,
    Query(q): Query<RouteYearQuery>,
) -> ApiResult<ComplianceResult> {
    Ok(Json(st.service.compute_balance(&q.route_id, q.year).await?))
}

pub(crate) async fn compliance_adjusted_cb(
    State(st): State<Arc<AppState>>,
    Query(q): Query<YearQuery>,
) -> ApiResult<Vec<ComplianceResult>> {
    Ok(Json(st.service.adjusted_balances(q.year).await?))
}

// ---------------------------------------------------------------------------
// Banking
// ---------------------------------------------------------------------------

pub(crate) async fn banking_records(
    State(st): State<Arc<AppState>>,
    Query(q): Query<RecordsQuery>,
) -> ApiResult<Vec<BankEntry>> {
    Ok(Json(st.service.bank_records(&q.route_id, q.year).await?))
}

pub(crate) async fn banking_bank(
    State(st): State<Arc<AppState>>,
    Json(req): Json<BankRequest>,
) -> ApiResult<BankEntry> {
    let entry = st.service.bank_surplus(&req.route_id, req.year).await?;
    st.publish(BusMsg::from(&entry));
    Ok(Json(entry))
}

pub(crate) async fn banking_apply(
    State(st): State<Arc<AppState>>,
    Json(req): Json<ApplyRequest>,
) -> ApiResult<BankEntry> {
    let entry = st
        .service
        .apply_banked(&req.route_id, req.year, req.amount)
        .await?;
    st.publish(BusMsg::from(&entry));
    Ok(Json(entry))
}

// ---------------------------------------------------------------------------
// POST /v1/pools
// ---------------------------------------------------------------------------

pub(crate) async fn pools_create(
    State(st): State<Arc<AppState>>,
    Json(req): Json<PoolRequest>,
) -> ApiResult<PoolRecord> {
    let record = st.service.create_pool(req.year, &req.members).await?;
    info!(pool_id = %record.pool_id, valid = record.outcome.valid, "pools/create");
    st.publish(BusMsg::from(&record));
    Ok(Json(record))
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
