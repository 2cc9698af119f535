use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tripweave_itinerary::{ItinerarySummary, Persisted};
use tripweave_shared::Error;
use validator::Validate;

use super::{AppState, ItineraryView, Json};
use crate::error::AppError;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInput {
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TitleInput {
    #[validate(length(max = 200))]
    pub title: String,
}

/// `null` clears the start date.
#[derive(Debug, Deserialize)]
pub struct StartDateInput {
    #[serde(default)]
    pub start_date: Option<String>,
}

#[tracing::instrument(skip(app))]
pub async fn create(
    State(app): State<AppState>,
    Json(input): Json<CreateInput>,
) -> Result<(StatusCode, Json<ItineraryView>), AppError> {
    input.validate()?;

    let store = app.registry.create(&input.user_id, &input.title).await?;

    Ok((StatusCode::CREATED, Json(ItineraryView::of(&store).await)))
}

#[tracing::instrument(skip(app))]
pub async fn list(
    State(app): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ItinerarySummary>>, AppError> {
    let summaries = app.registry.repository().list_by_user(&user_id).await?;

    Ok(Json(summaries))
}

pub async fn show(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItineraryView>, AppError> {
    let store = app.registry.open(&id).await?;

    Ok(Json(ItineraryView::of(&store).await))
}

#[tracing::instrument(skip(app))]
pub async fn delete(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !app.registry.delete(&id).await? {
        return Err(Error::NotFound.into());
    }

    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(app))]
pub async fn save(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Persisted>, AppError> {
    let store = app.registry.open(&id).await?;

    Ok(Json(store.save().await?))
}

#[tracing::instrument(skip(app))]
pub async fn title(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<TitleInput>,
) -> Result<Json<ItineraryView>, AppError> {
    input.validate()?;

    let store = app.registry.open(&id).await?;
    store
        .update(|planner| planner.set_title(input.title))
        .await?;

    Ok(Json(ItineraryView::of(&store).await))
}

/// PUT /itineraries/{id}/start-date - first travel day, re-dates untouched derived days
#[tracing::instrument(skip(app))]
pub async fn start_date(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<StartDateInput>,
) -> Result<Json<ItineraryView>, AppError> {
    let store = app.registry.open(&id).await?;
    store
        .update(|planner| planner.set_start_date(input.start_date.as_deref()))
        .await?;

    Ok(Json(ItineraryView::of(&store).await))
}
