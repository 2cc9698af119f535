use axum::extract::{Path, State};
use serde::Serialize;
use tripweave_itinerary::{OptimizePreferences, OptimizedOrder, TripMetadata};

use super::waypoint::AppliedView;
use super::{AppState, ItineraryView, Json};
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct OptimizedView {
    pub applied: bool,
    pub optimized: OptimizedOrder,
    #[serde(flatten)]
    pub view: ItineraryView,
}

/// POST /itineraries/{id}/route - asks the directions service and re-derives the days
#[tracing::instrument(skip(app))]
pub async fn compute(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AppliedView>, AppError> {
    let store = app.registry.open(&id).await?;
    let applied = store.compute_route(app.directions.as_ref()).await?;

    Ok(Json(AppliedView {
        applied,
        view: ItineraryView::of(&store).await,
    }))
}

#[tracing::instrument(skip(app))]
pub async fn optimize(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(preferences): Json<OptimizePreferences>,
) -> Result<Json<OptimizedView>, AppError> {
    let store = app.registry.open(&id).await?;
    let (applied, optimized) = store
        .optimize(app.optimizer.as_ref(), preferences)
        .await?;

    Ok(Json(OptimizedView {
        applied,
        optimized,
        view: ItineraryView::of(&store).await,
    }))
}

#[tracing::instrument(skip(app))]
pub async fn generate(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(trip): Json<TripMetadata>,
) -> Result<Json<ItineraryView>, AppError> {
    let store = app.registry.open(&id).await?;
    store.generate(app.generator.as_ref(), &trip).await?;

    Ok(Json(ItineraryView::of(&store).await))
}
