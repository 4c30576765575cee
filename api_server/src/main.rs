use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use config_manager::SystemConfig;
use flow_core::{AnalysisError, TransactionSource};
use helius_client::HeliusClient;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

mod handlers;
mod types;

use handlers::*;
use types::*;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: SystemConfig,
    pub source: Arc<dyn TransactionSource>,
    pub helius: Arc<HeliusClient>,
    pub started_at: Instant,
}

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Failed to fetch or analyze data.")]
    Analysis(String),
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(message) => ApiError::Validation(message),
            other => ApiError::Analysis(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            ApiError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, None),
            ApiError::Analysis(details) => {
                error!("Analysis failed: {}", details);
                (StatusCode::INTERNAL_SERVER_ERROR, Some(details.clone()))
            }
        };

        let body = Json(ErrorResponse::new(self.to_string(), details));

        (status, body).into_response()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = SystemConfig::load()?;

    // Initialize tracing
    let default_filter = if config.system.debug_mode {
        "debug"
    } else {
        "info,api_server=debug,tower_http=debug"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    info!("Starting token flow API server...");
    info!("Configuration loaded successfully");

    let helius = Arc::new(HeliusClient::new(config.helius.clone())?);
    info!(
        "Helius client initialized (page size {}, {} concurrent body requests)",
        config.helius.page_size, config.helius.max_concurrent_requests
    );

    let app_state = AppState {
        config: config.clone(),
        source: helius.clone(),
        helius,
        started_at: Instant::now(),
    };

    let app = create_router(app_state);

    info!("📋 Available endpoints:");
    info!("   • POST /api/analyze - Buy/sell activity for a token in a time window");
    info!("   • POST /api/analyze/export.csv - Same analysis as a CSV download");
    info!("   • GET /api/tokens/:address/metadata - Token name and symbol");
    info!("   • GET /health - Health check");

    // Bind and serve
    let bind_addr = config.bind_addr();
    info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Analysis endpoints accept POST only
        .route("/api/analyze", post(analyze).fallback(method_not_allowed))
        .route(
            "/api/analyze/export.csv",
            post(export_analysis_csv).fallback(method_not_allowed),
        )
        // Token metadata
        .route("/api/tokens/:address/metadata", get(get_token_metadata))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use flow_core::{RawTransaction, SourceError, TokenBalanceSnapshot};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const TOKEN: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

    /// Serves one fixed page, then end of history
    struct FixedSource(Vec<RawTransaction>);

    #[async_trait]
    impl TransactionSource for FixedSource {
        async fn get_page(
            &self,
            _account_address: &str,
            _page_limit: u32,
            before: Option<&str>,
        ) -> Result<Vec<RawTransaction>, SourceError> {
            match before {
                None => Ok(self.0.clone()),
                Some(_) => Ok(vec![]),
            }
        }
    }

    struct DownSource;

    #[async_trait]
    impl TransactionSource for DownSource {
        async fn get_page(
            &self,
            _account_address: &str,
            _page_limit: u32,
            _before: Option<&str>,
        ) -> Result<Vec<RawTransaction>, SourceError> {
            Err(SourceError::Unavailable("upstream timed out".to_string()))
        }
    }

    fn transfer(sig: &str, block_time: i64) -> RawTransaction {
        RawTransaction {
            block_time,
            signatures: vec![sig.to_string()],
            failed: false,
            pre_token_balances: Some(vec![TokenBalanceSnapshot::new("Seller", TOKEN, 25.5)]),
            post_token_balances: Some(vec![
                TokenBalanceSnapshot::new("Buyer", TOKEN, 25.5),
                TokenBalanceSnapshot::new("Seller", TOKEN, 0.0),
            ]),
        }
    }

    fn app(source: Arc<dyn TransactionSource>) -> Router {
        let mut config = SystemConfig::default();
        config.helius.enabled = false;
        let helius = Arc::new(HeliusClient::new(config.helius.clone()).unwrap());

        create_router(AppState {
            config,
            source,
            helius,
            started_at: Instant::now(),
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn full_body() -> Value {
        json!({
            "tokenAddress": TOKEN,
            "startDate": "2024-01-01T00:00:00.000Z",
            "endDate": "2024-01-02T00:00:00.000Z",
            "maxWallets": 10,
            "transactionType": "both",
            "minAmount": 0,
            "maxAmount": 1000000
        })
    }

    async fn read_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn analyze_returns_rows() {
        // 2024-01-01T12:00:00Z
        let source = Arc::new(FixedSource(vec![transfer("sig1", 1_704_110_400)]));

        let response = app(source)
            .oneshot(post_json("/api/analyze", full_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let rows = read_json(response).await;
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["wallet"], "Buyer");
        assert_eq!(rows[0]["type"], "buy");
        assert_eq!(rows[0]["isFirstBuy"], true);
        assert_eq!(rows[0]["date"], "2024-01-01T12:00:00.000Z");
        assert_eq!(rows[1]["type"], "sell");
        assert_eq!(rows[1]["sellPercentage"], 100.0);
        assert_eq!(rows[1]["txSignature"], "sig1");
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let response = app(Arc::new(FixedSource(vec![])))
            .oneshot(post_json("/api/analyze", json!({ "tokenAddress": TOKEN })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], "Missing required parameters.");
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app(Arc::new(FixedSource(vec![]))).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn other_methods_are_not_allowed() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/analyze")
            .body(Body::empty())
            .unwrap();

        let response = app(Arc::new(FixedSource(vec![]))).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(read_json(response).await["error"], "Method Not Allowed");
    }

    #[tokio::test]
    async fn source_failure_is_a_server_error_with_details() {
        let response = app(Arc::new(DownSource))
            .oneshot(post_json("/api/analyze", full_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["error"], "Failed to fetch or analyze data.");
        assert!(body["details"].as_str().unwrap().contains("upstream timed out"));
    }

    #[tokio::test]
    async fn export_serves_csv_attachment() {
        let source = Arc::new(FixedSource(vec![transfer("sig1", 1_704_110_400)]));

        let response = app(source)
            .oneshot(post_json("/api/analyze/export.csv", full_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains(&format!("token_flow_{}.csv", TOKEN)));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(
            csv,
            "wallet,type,amount,date,isFirstBuy,sellPercentage,txSignature\n\
             Buyer,buy,25.5,2024-01-01T12:00:00.000Z,true,,sig1\n\
             Seller,sell,25.5,2024-01-01T12:00:00.000Z,,100,sig1"
        );
    }

    #[tokio::test]
    async fn metadata_rejects_invalid_address() {
        let request = Request::builder()
            .uri("/api/tokens/not-an-address/metadata")
            .body(Body::empty())
            .unwrap();

        let response = app(Arc::new(FixedSource(vec![]))).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metadata_unavailable_is_not_found() {
        let request = Request::builder()
            .uri(format!("/api/tokens/{}/metadata", TOKEN))
            .body(Body::empty())
            .unwrap();

        let response = app(Arc::new(FixedSource(vec![]))).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_version() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app(Arc::new(FixedSource(vec![]))).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
