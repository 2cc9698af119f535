use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tripweave_itinerary::Itinerary;
use tripweave_shared::Error;

use super::{AppState, ItineraryView, Json};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ShareInput {
    pub is_public: bool,
    #[serde(default)]
    pub share_slug: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShareView {
    #[serde(flatten)]
    pub view: ItineraryView,
    pub share_url: Option<String>,
}

/// PUT /itineraries/{id}/share - toggles public visibility; the link works after the next save
#[tracing::instrument(skip(app))]
pub async fn settings(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ShareInput>,
) -> Result<Json<ShareView>, AppError> {
    let store = app.registry.open(&id).await?;
    store
        .update(|planner| planner.update_share_settings(input.is_public, input.share_slug))
        .await?;

    let view = ItineraryView::of(&store).await;
    let share_url = if view.itinerary.is_public {
        Some(app.sharer.share(&view.itinerary).await?)
    } else {
        None
    };

    Ok(Json(ShareView { view, share_url }))
}

#[tracing::instrument(skip(app))]
pub async fn export(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let store = app.registry.open(&id).await?;
    let itinerary = store.snapshot().await;
    let document = app.exporter.export(&itinerary).await?;

    Ok(([(header::CONTENT_TYPE, app.exporter.content_type())], document))
}

/// GET /shared/{slug} - read-only public view
pub async fn shared(
    State(app): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Itinerary>, AppError> {
    let itinerary = app
        .registry
        .repository()
        .find_by_share_slug(&slug)
        .await?
        .ok_or(Error::NotFound)?;

    Ok(Json(itinerary))
}
