//! HTTP API over the translator.
//!
//! The tenant always comes from the `X-Tenant-Id` header, which the gateway in front of us sets
//! after authenticating the caller. It is never taken from the body or from the query itself.
use crate::engine::assist::{suggestions, validate, Validation};
use crate::engine::{render, RenderOptions, SqlQuery, TenantContext};
use crate::error::{Error, ErrorKind};
use crate::rate_limit::RateLimiter;
use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub const TENANT_HEADER: &str = "x-tenant-id";

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub options: RenderOptions,
    /// Per tenant, per window.
    pub max_requests: u32,
    pub window: Duration,
    /// Any origin is allowed when this is missing.
    pub allow_origin: Option<HeaderValue>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            options: RenderOptions::default(),
            max_requests: 60,
            window: Duration::from_secs(60),
            allow_origin: None,
        }
    }
}

struct AppState {
    limiter: RateLimiter,
    options: RenderOptions,
    max_requests: u32,
    window: Duration,
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
}

#[derive(Debug, Deserialize)]
struct SuggestionsRequest {
    query: String,
    /// In chars. Defaults to the end of the query.
    cursor: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SuggestionsResponse {
    suggestions: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

/// An error, as the API reports it.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

/// Like [Json], but malformed bodies get the same error body as every other failure.
struct JsonBody<T>(T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;

        Ok(JsonBody(value))
    }
}

pub fn router(settings: ServerSettings) -> Router {
    let allow_origin = match settings.allow_origin {
        Some(origin) => AllowOrigin::exact(origin),
        None => AllowOrigin::any(),
    };

    let state = Arc::new(AppState {
        limiter: RateLimiter::new(),
        options: settings.options,
        max_requests: settings.max_requests,
        window: settings.window,
    });

    Router::new()
        .route("/api/v1/health", get(|| async { "ok" }))
        .route("/api/v1/tql/translate", post(translate))
        .route("/api/v1/tql/validate", post(validate_query))
        .route("/api/v1/tql/suggestions", post(suggest))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(allow_origin)
                .allow_headers([CONTENT_TYPE, HeaderName::from_static(TENANT_HEADER)])
                .allow_methods([Method::GET, Method::POST]),
        )
}

async fn translate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonBody(request): JsonBody<QueryRequest>,
) -> Result<Json<SqlQuery>, ApiError> {
    let tenant = TenantContext::from_optional(tenant_header(&headers)).map_err(Error::from)?;

    if !state
        .limiter
        .check(tenant.as_str(), state.max_requests, state.window)
    {
        tracing::warn!(tenant = %tenant, "rate limit exceeded");
        return Err(ApiError::rate_limited());
    }

    let query = render(&request.query, Some(tenant.as_str()), &state.options)?;
    tracing::debug!(tenant = %tenant, params = query.params.len(), "translated query");

    Ok(Json(query))
}

async fn validate_query(JsonBody(request): JsonBody<QueryRequest>) -> Json<Validation> {
    Json(validate(&request.query))
}

async fn suggest(JsonBody(request): JsonBody<SuggestionsRequest>) -> Json<SuggestionsResponse> {
    let cursor = request
        .cursor
        .unwrap_or_else(|| request.query.chars().count());

    Json(SuggestionsResponse {
        suggestions: suggestions(&request.query, cursor),
    })
}

/// Headers that aren't valid text count as missing.
fn tenant_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
}

impl ApiError {
    fn rate_limited() -> Self {
        ApiError {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: ErrorBody {
                error: "Too many requests, try again later".to_string(),
                kind: "rate_limited",
            },
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let (status, kind) = match error.kind() {
            ErrorKind::SyntaxError(_) => (StatusCode::BAD_REQUEST, "syntax_error"),
            ErrorKind::UnsupportedCondition(_) => {
                (StatusCode::BAD_REQUEST, "unsupported_condition")
            }
            ErrorKind::MissingTenant(_) => (StatusCode::UNAUTHORIZED, "missing_tenant"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = if error.is_query_error() || status == StatusCode::UNAUTHORIZED {
            error.summary()
        } else {
            tracing::error!(error = %error, "failed to translate query");
            "Internal error".to_string()
        };

        ApiError {
            status,
            body: ErrorBody {
                error: message,
                kind,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError {
            status: rejection.status(),
            body: ErrorBody {
                error: rejection.body_text(),
                kind: "invalid_request",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
