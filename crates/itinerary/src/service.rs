use serde::{Deserialize, Serialize};
use tripweave_shared::{Result, ServiceError};

use crate::{Coordinates, DayItemKind, Itinerary, RouteSummary, TripMetadata, WaypointList};

/// A geocoding hit.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Place {
    pub coordinates: Coordinates,
    pub formatted_address: String,
    #[serde(default)]
    pub place_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OptimizePreferences {
    #[serde(default)]
    pub avoid_tolls: bool,
    #[serde(default)]
    pub avoid_highways: bool,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OptimizeRequest {
    pub start: Coordinates,
    pub end: Coordinates,
    pub intermediates: Vec<Coordinates>,
    #[serde(default)]
    pub preferences: OptimizePreferences,
}

impl OptimizeRequest {
    pub fn from_waypoints(waypoints: &WaypointList, preferences: OptimizePreferences) -> Self {
        Self {
            start: waypoints.start().coordinates,
            end: waypoints.end().coordinates,
            intermediates: waypoints
                .intermediates()
                .iter()
                .map(|w| w.coordinates)
                .collect(),
            preferences,
        }
    }
}

/// Suggested visiting order for the intermediate stops.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OptimizedOrder {
    pub order: Vec<usize>,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub distance_savings_pct: Option<f64>,
    #[serde(default)]
    pub time_savings_pct: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeneratedItem {
    pub kind: DayItemKind,
    pub title: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeneratedDay {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub items: Vec<GeneratedItem>,
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub duration_min: f64,
    #[serde(default)]
    pub estimated_cost: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeneratedPlan {
    pub days: Vec<GeneratedDay>,
    #[serde(default)]
    pub total_estimated_cost: Option<f64>,
}

#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> std::result::Result<Place, ServiceError>;
}

#[async_trait::async_trait]
pub trait Directions: Send + Sync {
    async fn compute_route(
        &self,
        coordinates: &[Coordinates],
    ) -> std::result::Result<RouteSummary, ServiceError>;
}

#[async_trait::async_trait]
pub trait RouteOptimizer: Send + Sync {
    async fn optimize(
        &self,
        request: &OptimizeRequest,
    ) -> std::result::Result<OptimizedOrder, ServiceError>;
}

#[async_trait::async_trait]
pub trait ItineraryGenerator: Send + Sync {
    async fn generate(
        &self,
        waypoints: &WaypointList,
        trip: &TripMetadata,
    ) -> std::result::Result<GeneratedPlan, ServiceError>;
}

#[async_trait::async_trait]
pub trait Exporter: Send + Sync {
    fn content_type(&self) -> &'static str;

    async fn export(&self, itinerary: &Itinerary) -> std::result::Result<Vec<u8>, ServiceError>;
}

#[async_trait::async_trait]
pub trait Sharer: Send + Sync {
    async fn share(&self, itinerary: &Itinerary) -> std::result::Result<String, ServiceError>;
}

/// What the store hands back after a write.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Persisted {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ItinerarySummary {
    pub id: String,
    pub title: String,
    pub is_public: bool,
    pub share_slug: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[async_trait::async_trait]
pub trait ItineraryRepository: Send + Sync {
    async fn create(&self, itinerary: &Itinerary) -> Result<Persisted>;

    /// Overwrites an existing itinerary. `Error::NotFound` when it is gone.
    async fn update(&self, itinerary: &Itinerary) -> Result<Persisted>;

    async fn find(&self, id: &str) -> Result<Option<Itinerary>>;

    /// Only public itineraries are returned.
    async fn find_by_share_slug(&self, slug: &str) -> Result<Option<Itinerary>>;

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<ItinerarySummary>>;

    async fn delete(&self, id: &str) -> Result<bool>;
}
