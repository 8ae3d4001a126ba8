use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use crate::error::AppError;
use crate::services::StatisticsService;
use crate::services::statistics_service::{DateRange, StatisticType, StatisticsResponse};
use crate::state::AppState;

/// Statistics router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_statistics))
}

#[derive(Debug, Deserialize)]
struct StatisticsQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

/// `GET /statistics?type=&from=&to=`: Daily creation counts.
async fn get_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<StatisticsResponse>, AppError> {
    let kind = StatisticType::parse(query.kind.as_deref().ok_or_else(|| {
        AppError::BadRequest("Query parameter 'type' is required".to_string())
    })?)?;
    let range = DateRange::resolve(
        query.from.as_deref(),
        query.to.as_deref(),
        Utc::now().date_naive(),
    )?;

    let stats = StatisticsService::daily_counts(&state.db, kind, range).await?;
    Ok(Json(stats))
}
