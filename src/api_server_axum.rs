use crate::cache::ChainCache;
use crate::config::AppConfig;
use crate::error::{ApiError, CacheError};
use crate::expiry::format_expiry;
use crate::models::{OptionChainSnapshot, OptionType};
use crate::nse_client::NSEClient;
use crate::resolver::{parse_strike, resolve_premium};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

// -----------------------------------------------
// API REQUEST/RESPONSE MODELS
// -----------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchLiveQuery {
    pub sell_call: Option<String>,
    pub sell_put: Option<String>,
    pub hedge_call: Option<String>,
    pub hedge_put: Option<String>,
    pub expiry: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FetchLiveResponse {
    pub sell_call_premium: f64,
    pub sell_put_premium: f64,
    pub hedge_call_premium: f64,
    pub hedge_put_premium: f64,
    pub expiry: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FetchPremiumsQuery {
    pub call: Option<String>,
    pub put: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FetchPremiumsResponse {
    pub call_premium: f64,
    pub put_premium: f64,
}

#[derive(Debug, Serialize)]
struct FetchFailedBody {
    error: &'static str,
    message: String,
}

// -----------------------------------------------
// APPLICATION STATE
// -----------------------------------------------

#[derive(Clone)]
pub struct AppState {
    cache: Arc<ChainCache>,
}

impl AppState {
    pub fn new(cache: Arc<ChainCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ChainCache> {
        &self.cache
    }
}

// -----------------------------------------------
// API HANDLERS
// -----------------------------------------------

/// GET /fetch-live?sellCall=26500&sellPut=25900&hedgeCall=27500&hedgePut=24900&expiry=20250227
async fn fetch_live(
    State(app_state): State<AppState>,
    Query(query): Query<FetchLiveQuery>,
) -> Result<Json<FetchLiveResponse>, ApiError> {
    let (Some(sell_call), Some(sell_put)) = (
        required(query.sell_call.as_deref()),
        required(query.sell_put.as_deref()),
    ) else {
        return Err(ApiError::InvalidRequest(
            "sellCall and sellPut required".to_string(),
        ));
    };

    let formatted_expiry = format_expiry(query.expiry.as_deref());

    let chain = app_state.cache.get_current().await.map_err(|e| {
        error!(error = %e, "fetch-live error");
        ApiError::from(e)
    })?;

    let expiry = formatted_expiry.as_deref();
    let premium = |strike: Option<&str>, option_type| {
        strike.map_or(0.0, |s| leg_premium(&chain, s, option_type, expiry))
    };

    Ok(Json(FetchLiveResponse {
        sell_call_premium: premium(Some(sell_call), OptionType::Call),
        sell_put_premium: premium(Some(sell_put), OptionType::Put),
        hedge_call_premium: premium(required(query.hedge_call.as_deref()), OptionType::Call),
        hedge_put_premium: premium(required(query.hedge_put.as_deref()), OptionType::Put),
        expiry: formatted_expiry.clone().unwrap_or_else(|| "any".to_string()),
    }))
}

/// GET /fetch-premiums?call=26500&put=25900
async fn fetch_premiums(
    State(app_state): State<AppState>,
    Query(query): Query<FetchPremiumsQuery>,
) -> Response {
    let (Some(call), Some(put)) = (
        required(query.call.as_deref()),
        required(query.put.as_deref()),
    ) else {
        return ApiError::InvalidRequest("call and put required".to_string()).into_response();
    };

    match app_state.cache.get_current().await {
        Ok(chain) => Json(FetchPremiumsResponse {
            call_premium: leg_premium(&chain, call, OptionType::Call, None),
            put_premium: leg_premium(&chain, put, OptionType::Put, None),
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "fetch-premiums error");
            fetch_failed(e).into_response()
        }
    }
}

// -----------------------------------------------
// HELPER FUNCTIONS
// -----------------------------------------------

/// Query values that are missing or blank count as absent.
fn required(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn leg_premium(
    chain: &OptionChainSnapshot,
    strike: &str,
    option_type: OptionType,
    expiry: Option<&str>,
) -> f64 {
    parse_strike(strike).map_or(0.0, |strike| {
        resolve_premium(chain, strike, option_type, expiry)
    })
}

/// A panic while pricing turns into the generic 500 instead of a dropped connection.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    error!(panic = %detail, "fetch-live handler panicked");

    ApiError::Internal.into_response()
}

fn fetch_failed(err: CacheError) -> (StatusCode, Json<FetchFailedBody>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(FetchFailedBody {
            error: "fetch_failed",
            // Display of CacheError is generic; upstream detail stays in the logs
            message: err.to_string(),
        }),
    )
}

// -----------------------------------------------
// SERVER SETUP
// -----------------------------------------------

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/fetch-live",
            get(fetch_live).layer(CatchPanicLayer::custom(panic_response)),
        )
        .route("/fetch-premiums", get(fetch_premiums))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn start_server(config: &AppConfig) -> Result<()> {
    let client = NSEClient::new(config.symbol.clone())?;
    let cache = Arc::new(ChainCache::new(Arc::new(client), config.cache_ttl));

    // Runs for the lifetime of the process
    let _refresher = cache.spawn_background_refresh(config.refresh_interval);

    let app = router(AppState::new(cache));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, symbol = %config.symbol, "NSE premium server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
