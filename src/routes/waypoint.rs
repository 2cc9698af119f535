use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tripweave_itinerary::{Coordinates, WaypointPatch};
use tripweave_shared::Error;
use validator::Validate;

use super::{AppState, ItineraryView, Json};
use crate::error::AppError;

#[derive(Debug, Deserialize, Validate)]
pub struct AddInput {
    #[validate(length(max = 200))]
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub coordinates: Coordinates,
}

#[derive(Debug, Deserialize)]
pub struct MoveInput {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GeocodeInput {
    #[validate(length(min = 1, max = 300))]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct AddedView {
    pub id: String,
    #[serde(flatten)]
    pub view: ItineraryView,
}

#[derive(Debug, Serialize)]
pub struct AppliedView {
    pub applied: bool,
    #[serde(flatten)]
    pub view: ItineraryView,
}

#[tracing::instrument(skip(app))]
pub async fn add(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<AddInput>,
) -> Result<(StatusCode, Json<AddedView>), AppError> {
    input.validate()?;

    let store = app.registry.open(&id).await?;
    let waypoint_id = store
        .update(|planner| planner.add_waypoint(input.name, input.coordinates))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AddedView {
            id: waypoint_id,
            view: ItineraryView::of(&store).await,
        }),
    ))
}

#[tracing::instrument(skip(app))]
pub async fn update(
    State(app): State<AppState>,
    Path((id, waypoint_id)): Path<(String, String)>,
    Json(patch): Json<WaypointPatch>,
) -> Result<Json<ItineraryView>, AppError> {
    let store = app.registry.open(&id).await?;
    let found = store
        .update(|planner| planner.update_waypoint(&waypoint_id, patch))
        .await?;

    if !found {
        return Err(Error::NotFound.into());
    }

    Ok(Json(ItineraryView::of(&store).await))
}

#[tracing::instrument(skip(app))]
pub async fn remove(
    State(app): State<AppState>,
    Path((id, waypoint_id)): Path<(String, String)>,
) -> Result<Json<ItineraryView>, AppError> {
    let store = app.registry.open(&id).await?;
    let found = store
        .update(|planner| planner.remove_waypoint(&waypoint_id))
        .await?;

    if !found {
        return Err(Error::NotFound.into());
    }

    Ok(Json(ItineraryView::of(&store).await))
}

/// POST /itineraries/{id}/waypoints/move - positions are intermediate indices
#[tracing::instrument(skip(app))]
pub async fn reorder(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<MoveInput>,
) -> Result<Json<ItineraryView>, AppError> {
    let store = app.registry.open(&id).await?;
    let moved = store
        .update(|planner| planner.move_waypoint(input.from, input.to))
        .await?;

    if !moved {
        return Err(Error::User("Stop position is out of range".to_owned()).into());
    }

    Ok(Json(ItineraryView::of(&store).await))
}

#[tracing::instrument(skip(app))]
pub async fn geocode(
    State(app): State<AppState>,
    Path((id, waypoint_id)): Path<(String, String)>,
    Json(input): Json<GeocodeInput>,
) -> Result<Json<AppliedView>, AppError> {
    input.validate()?;

    let store = app.registry.open(&id).await?;
    let applied = store
        .geocode_waypoint(app.geocoder.as_ref(), &waypoint_id, &input.query)
        .await?;

    Ok(Json(AppliedView {
        applied,
        view: ItineraryView::of(&store).await,
    }))
}
