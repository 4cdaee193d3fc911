use crate::{
    api::handlers::auth::{require_token, AuthState},
    cli::globals::GlobalArgs,
    store::{schema, seed, PgStore, SharedStore},
    vault,
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware, Extension, Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::mpsc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

pub mod error;
pub mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Server options that are not part of auth.
#[derive(Clone, Debug, Default)]
pub struct ServeOptions {
    /// Exact browser origin allowed by CORS; any origin when unset.
    pub frontend_origin: Option<String>,
    /// Load the sample catalog at startup when the events table is empty.
    pub seed_sample_events: bool,
}

/// Build the full application router over `store`.
///
/// Public routes (`/health`, `/auth/*`, docs) are merged with the event
/// routes, and only the event routes pass through [`require_token`].
#[must_use]
pub fn app(store: SharedStore, auth_state: Arc<AuthState>) -> Router {
    let (public, mut api) = openapi::public_router().split_for_parts();
    let (protected, protected_api) = openapi::protected_router().split_for_parts();
    api.merge(protected_api);

    let protected = protected.route_layer(middleware::from_fn(require_token));

    public
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", api))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state))
                .layer(Extension(store)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    globals: &GlobalArgs,
    auth_state: Arc<AuthState>,
    options: ServeOptions,
) -> Result<()> {
    // Renew vault token, gracefully shutdown if failed
    let (tx, rx) = mpsc::unbounded_channel();

    if globals.vault_enabled() {
        vault::renew::try_renew(globals, tx).await?;
    }

    let pg = PgStore::connect(&dsn).await?;

    schema::apply_schema(pg.pool())
        .await
        .context("Failed to apply database schema")?;

    if options.seed_sample_events {
        // A failed seed leaves an empty catalog; the server still starts.
        if let Err(err) = seed::seed_if_empty(&pg).await {
            error!("Failed to seed sample events: {:#}", err);
        }
    }

    let store: SharedStore = Arc::new(pg);

    let cors = cors_layer(options.frontend_origin.as_deref())?;
    let app = app(store, auth_state).layer(cors);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(rx))
        .await?;

    Ok(())
}

async fn shutdown_signal(mut rx: mpsc::UnboundedReceiver<()>) {
    tokio::select! {
        Some(()) = rx.recv() => info!("Vault token renewal stopped"),
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                error!("Failed to listen for ctrl-c: {}", err);
            }
        }
    }
    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

/// CORS for the browser client: exact origin when configured, otherwise any.
///
/// # Errors
/// Returns an error if the configured origin is not a valid URL.
pub fn cors_layer(frontend_origin: Option<&str>) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    match frontend_origin {
        Some(url) => Ok(cors.allow_origin(AllowOrigin::exact(frontend_origin_header(url)?))),
        None => Ok(cors.allow_origin(Any)),
    }
}

fn frontend_origin_header(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend origin: {frontend_base_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Frontend origin must include a valid host: {frontend_base_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
