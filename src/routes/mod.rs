use std::sync::Arc;

use axum::extract::FromRequest;
use axum::routing::{get, post, put};
use axum::{Router, response::IntoResponse};
use serde::Serialize;
use sqlx::SqlitePool;
use tripweave_itinerary::{
    Directions, Exporter, Geocoder, Itinerary, ItineraryGenerator, ItineraryStore, Lifecycle,
    Planner, RouteOptimizer, Sharer, StoreRegistry,
};

use crate::error::AppError;

mod day;
mod health;
mod itinerary;
mod route;
mod share;
mod waypoint;

#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub registry: Arc<StoreRegistry>,
    pub pool: SqlitePool,
    pub geocoder: Arc<dyn Geocoder>,
    pub directions: Arc<dyn Directions>,
    pub optimizer: Arc<dyn RouteOptimizer>,
    pub generator: Arc<dyn ItineraryGenerator>,
    pub exporter: Arc<dyn Exporter>,
    pub sharer: Arc<dyn Sharer>,
}

/// `axum::Json` with rejections rendered like every other API error.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> axum::response::Response {
        axum::Json(self.0).into_response()
    }
}

/// An itinerary together with its editing state.
#[derive(Debug, Serialize)]
pub struct ItineraryView {
    pub itinerary: Itinerary,
    pub lifecycle: Lifecycle,
    pub revision: u64,
    pub route_current: bool,
}

impl ItineraryView {
    pub fn from_planner(planner: &Planner) -> Self {
        let itinerary = planner.itinerary().clone();
        let route_current = itinerary.current_route().is_some();

        Self {
            itinerary,
            lifecycle: planner.lifecycle(),
            revision: planner.revision(),
            route_current,
        }
    }

    pub async fn of(store: &ItineraryStore) -> Self {
        store.read(Self::from_planner).await
    }
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .with_state(app_state.pool.clone())
        .route("/itineraries", post(itinerary::create))
        .route("/users/{user_id}/itineraries", get(itinerary::list))
        .route(
            "/itineraries/{id}",
            get(itinerary::show).delete(itinerary::delete),
        )
        .route("/itineraries/{id}/save", post(itinerary::save))
        .route("/itineraries/{id}/title", put(itinerary::title))
        .route("/itineraries/{id}/start-date", put(itinerary::start_date))
        .route("/itineraries/{id}/share", put(share::settings))
        .route("/itineraries/{id}/export", get(share::export))
        .route("/shared/{slug}", get(share::shared))
        .route("/itineraries/{id}/waypoints", post(waypoint::add))
        .route("/itineraries/{id}/waypoints/move", post(waypoint::reorder))
        .route(
            "/itineraries/{id}/waypoints/{waypoint_id}",
            put(waypoint::update).delete(waypoint::remove),
        )
        .route(
            "/itineraries/{id}/waypoints/{waypoint_id}/geocode",
            post(waypoint::geocode),
        )
        .route("/itineraries/{id}/route", post(route::compute))
        .route("/itineraries/{id}/optimize", post(route::optimize))
        .route("/itineraries/{id}/generate", post(route::generate))
        .route("/itineraries/{id}/days/{day_id}/items", post(day::add_item))
        .route(
            "/itineraries/{id}/days/{day_id}/items/{item_id}",
            axum::routing::patch(day::update_item).delete(day::remove_item),
        )
        .route("/itineraries/{id}/items/move", post(day::move_item))
        .route("/itineraries/{id}/days/regenerate", post(day::regenerate))
        .route("/itineraries/{id}/days/{day_id}/split", post(day::split))
        .route("/itineraries/{id}/days/{day_id}/merge", post(day::merge))
        .route(
            "/itineraries/{id}/days/{day_id}/refresh",
            post(day::refresh),
        )
        .fallback(fallback)
        .with_state(app_state)
}

async fn fallback() -> AppError {
    AppError::Domain(tripweave_shared::Error::NotFound)
}
