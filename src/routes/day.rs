use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tripweave_itinerary::{DayItemKind, DayItemPatch, DaySummary, editor::MoveItem};
use tripweave_shared::Error;

use super::{AppState, ItineraryView, Json};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub kind: DayItemKind,
}

#[derive(Debug, Serialize)]
pub struct SplitView {
    pub first: String,
    pub second: String,
    #[serde(flatten)]
    pub view: ItineraryView,
}

#[derive(Debug, Serialize)]
pub struct ItemView {
    pub id: String,
    #[serde(flatten)]
    pub view: ItineraryView,
}

#[tracing::instrument(skip(app))]
pub async fn add_item(
    State(app): State<AppState>,
    Path((id, day_id)): Path<(String, String)>,
    Json(input): Json<AddItemInput>,
) -> Result<(StatusCode, Json<ItemView>), AppError> {
    let store = app.registry.open(&id).await?;
    let item_id = store
        .update(|planner| planner.add_item(&day_id, input.kind))
        .await?
        .ok_or(Error::NotFound)?;

    Ok((
        StatusCode::CREATED,
        Json(ItemView {
            id: item_id,
            view: ItineraryView::of(&store).await,
        }),
    ))
}

#[tracing::instrument(skip(app))]
pub async fn update_item(
    State(app): State<AppState>,
    Path((id, day_id, item_id)): Path<(String, String, String)>,
    Json(patch): Json<DayItemPatch>,
) -> Result<Json<ItineraryView>, AppError> {
    let store = app.registry.open(&id).await?;
    let found = store
        .update(|planner| planner.update_item(&day_id, &item_id, patch))
        .await?;

    if !found {
        return Err(Error::NotFound.into());
    }

    Ok(Json(ItineraryView::of(&store).await))
}

#[tracing::instrument(skip(app))]
pub async fn remove_item(
    State(app): State<AppState>,
    Path((id, day_id, item_id)): Path<(String, String, String)>,
) -> Result<Json<ItineraryView>, AppError> {
    let store = app.registry.open(&id).await?;
    let found = store
        .update(|planner| planner.remove_item(&day_id, &item_id))
        .await?;

    if !found {
        return Err(Error::NotFound.into());
    }

    Ok(Json(ItineraryView::of(&store).await))
}

/// POST /itineraries/{id}/items/move - drag and drop within or across days
#[tracing::instrument(skip(app))]
pub async fn move_item(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(action): Json<MoveItem>,
) -> Result<Json<ItineraryView>, AppError> {
    let store = app.registry.open(&id).await?;
    let moved = store.update(|planner| planner.move_item(&action)).await?;

    if !moved {
        return Err(Error::NotFound.into());
    }

    Ok(Json(ItineraryView::of(&store).await))
}

#[tracing::instrument(skip(app))]
pub async fn split(
    State(app): State<AppState>,
    Path((id, day_id)): Path<(String, String)>,
) -> Result<Json<SplitView>, AppError> {
    let store = app.registry.open(&id).await?;
    let (first, second) = store
        .update(|planner| planner.split_day(&day_id))
        .await?
        .ok_or(Error::NotFound)?;

    Ok(Json(SplitView {
        first,
        second,
        view: ItineraryView::of(&store).await,
    }))
}

#[tracing::instrument(skip(app))]
pub async fn merge(
    State(app): State<AppState>,
    Path((id, day_id)): Path<(String, String)>,
) -> Result<Json<ItineraryView>, AppError> {
    let store = app.registry.open(&id).await?;
    store
        .update(|planner| planner.merge_with_next(&day_id))
        .await?;

    Ok(Json(ItineraryView::of(&store).await))
}

/// POST /itineraries/{id}/days/regenerate - re-derives days from the current route, dropping edits
#[tracing::instrument(skip(app))]
pub async fn regenerate(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItineraryView>, AppError> {
    let store = app.registry.open(&id).await?;
    store.update(|planner| planner.regenerate_days()).await?;

    Ok(Json(ItineraryView::of(&store).await))
}

/// POST /itineraries/{id}/days/{day_id}/refresh - recomputes the cached day summary
#[tracing::instrument(skip(app))]
pub async fn refresh(
    State(app): State<AppState>,
    Path((id, day_id)): Path<(String, String)>,
) -> Result<Json<DaySummary>, AppError> {
    let store = app.registry.open(&id).await?;
    let summary = store
        .update(|planner| planner.refresh_summary(&day_id))
        .await?
        .ok_or(Error::NotFound)?;

    Ok(Json(summary))
}
