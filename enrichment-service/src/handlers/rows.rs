use crate::models::Page;
use crate::pipeline::FetchOptions;
use crate::startup::AppState;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
};
use serde::Serialize;
use service_core::error::AppError;

/// Success envelope: `{"ok": true, "rows": [...], "nextCursor": n|null}`.
#[derive(Debug, Serialize)]
pub struct RowsResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub page: Page,
}

/// `GET /accounts/:account_id/rows`
pub async fn get_account_rows(
    State(state): State<AppState>,
    account_id: Result<Path<i64>, PathRejection>,
    options: Result<Query<FetchOptions>, QueryRejection>,
) -> Result<Json<RowsResponse>, AppError> {
    let Path(account_id) = account_id
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("invalid account id: {e}")))?;
    let Query(options) =
        options.map_err(|e| AppError::BadRequest(anyhow::anyhow!("invalid query: {e}")))?;

    let page = state.pipeline.fetch_all_data(account_id, options).await?;

    Ok(Json(RowsResponse { ok: true, page }))
}
