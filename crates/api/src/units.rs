use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use practice_core::model::{Topic, Unit, UnitId, UnitProgress, UserId};
use services::AppServices;

use crate::error::ApiError;

pub(crate) fn routes() -> Router<AppServices> {
    Router::new()
        .route("/", get(list_units))
        .route("/:unit_id", get(get_unit))
        .route("/progress/:user_id", get(user_progress))
}

async fn list_units(State(services): State<AppServices>) -> Result<Json<Vec<Unit>>, ApiError> {
    Ok(Json(services.catalog().list_units().await?))
}

#[derive(Debug, Serialize)]
struct UnitResponse {
    #[serde(flatten)]
    unit: Unit,
    topics: Vec<Topic>,
}

async fn get_unit(
    State(services): State<AppServices>,
    Path(unit_id): Path<UnitId>,
) -> Result<Json<UnitResponse>, ApiError> {
    let detail = services.catalog().unit_with_topics(unit_id).await?;
    Ok(Json(UnitResponse {
        unit: detail.unit,
        topics: detail.topics,
    }))
}

async fn user_progress(
    State(services): State<AppServices>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<UnitProgress>>, ApiError> {
    Ok(Json(services.catalog().user_progress(&user_id).await?))
}
