use crate::types::HealthResponse;
use crate::{ApiError, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::{IntoResponse, Json},
};
use flow_core::{
    is_valid_solana_address, run_analysis, to_csv, AnalysisRequest, AnalysisRequestBody,
    ResultRow,
};
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// Run one analysis for a submitted request body
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequestBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, rows) = execute_analysis(&state, payload).await?;
    Ok(Json(rows))
}

/// Same analysis as [`analyze`], served as a CSV attachment
pub async fn export_analysis_csv(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequestBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let (request, rows) = execute_analysis(&state, payload).await?;
    let csv_content = to_csv(&rows)?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"token_flow_{}.csv\"",
                request.token_address
            ),
        ),
    ];

    Ok((headers, csv_content))
}

/// Token name, symbol and decimals
pub async fn get_token_metadata(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_solana_address(&address) {
        return Err(ApiError::Validation(format!(
            "Invalid token address: {}",
            address
        )));
    }

    let metadata = state
        .helius
        .fetch_token_metadata(&address)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No metadata for token {}", address)))?;

    Ok(Json(metadata))
}

/// Any method other than POST on the analysis routes
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn execute_analysis(
    state: &AppState,
    payload: Result<Json<AnalysisRequestBody>, JsonRejection>,
) -> Result<(AnalysisRequest, Vec<ResultRow>), ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        warn!("Rejected analysis body: {}", rejection.body_text());
        ApiError::Validation(rejection.body_text())
    })?;

    let request = body.into_request(state.config.analysis.default_max_wallets)?;

    let analysis_id = Uuid::new_v4();
    let span = info_span!("analysis", id = %analysis_id, token = %request.token_address);
    let deadline = Duration::from_secs(state.config.api.analysis_timeout_seconds);

    let rows = tokio::time::timeout(
        deadline,
        run_analysis(
            state.source.as_ref(),
            &request,
            state.config.helius.page_size,
        )
        .instrument(span),
    )
    .await
    .map_err(|_| {
        warn!("Analysis {} exceeded {:?}", analysis_id, deadline);
        ApiError::Analysis(format!(
            "Analysis did not finish within {} seconds",
            deadline.as_secs()
        ))
    })??;

    info!("Analysis {} returned {} rows", analysis_id, rows.len());
    Ok((request, rows))
}
