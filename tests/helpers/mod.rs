//! Shared setup for router tests: an on-disk database, fake upstream services and a
//! request helper.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use temp_dir::TempDir;
use tower::ServiceExt;
use tripweave::config::{
    Config, DatabaseConfig, ObservabilityConfig, PlannerConfig, ProvidersConfig, ServerConfig,
};
use tripweave::{AppState, create_app};
use tripweave_itinerary::{
    Coordinates, Directions, DocumentExporter, GeneratedDay, GeneratedItem, GeneratedPlan,
    Geocoder, ItineraryGenerator, LinkSharer, OptimizeRequest, OptimizedOrder, Place,
    RouteOptimizer, RouteSummary, SqliteRepository, StoreRegistry, TripMetadata, WaypointList,
};
use tripweave_shared::{ServiceError, State};

pub const PUBLIC_BASE_URL: &str = "https://tripweave.test";

pub fn test_config(database_url: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        database: DatabaseConfig {
            url: database_url.to_string(),
            max_connections: 2,
        },
        planner: PlannerConfig {
            // Long enough that no auto-save fires while a test runs
            autosave_delay_secs: 600,
            ..PlannerConfig::default()
        },
        providers: ProvidersConfig {
            public_base_url: PUBLIC_BASE_URL.to_string(),
            ..ProvidersConfig::default()
        },
        observability: ObservabilityConfig::default(),
    }
}

fn city(name: &str) -> Option<Coordinates> {
    match name {
        "Delhi" => Some(Coordinates::new(28.61, 77.20)),
        "Lucknow" => Some(Coordinates::new(26.85, 80.95)),
        "Patna" => Some(Coordinates::new(25.59, 85.14)),
        "Shillong" => Some(Coordinates::new(25.57, 91.88)),
        _ => None,
    }
}

/// Knows four cities; every leg is 450 km and 9 hours.
pub struct FakeMaps;

#[async_trait::async_trait]
impl Geocoder for FakeMaps {
    async fn geocode(&self, query: &str) -> Result<Place, ServiceError> {
        let coordinates = city(query).ok_or(ServiceError::NotFound)?;

        Ok(Place {
            coordinates,
            formatted_address: format!("{query}, India"),
            place_id: Some(format!("place-{}", query.to_lowercase())),
        })
    }
}

#[async_trait::async_trait]
impl Directions for FakeMaps {
    async fn compute_route(
        &self,
        coordinates: &[Coordinates],
    ) -> Result<RouteSummary, ServiceError> {
        let legs = coordinates.len().saturating_sub(1) as f64;

        Ok(RouteSummary::new(450.0 * legs, 540.0 * legs))
    }
}

/// Reverses the stops and plans one day per stop.
pub struct FakeGateway;

#[async_trait::async_trait]
impl RouteOptimizer for FakeGateway {
    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizedOrder, ServiceError> {
        Ok(OptimizedOrder {
            order: (0..request.intermediates.len()).rev().collect(),
            rationale: "shorter eastbound".to_owned(),
            distance_savings_pct: Some(12.0),
            time_savings_pct: Some(9.5),
        })
    }
}

#[async_trait::async_trait]
impl ItineraryGenerator for FakeGateway {
    async fn generate(
        &self,
        waypoints: &WaypointList,
        trip: &TripMetadata,
    ) -> Result<GeneratedPlan, ServiceError> {
        let days = waypoints
            .resolved()
            .map(|waypoint| GeneratedDay {
                date: trip.start_date.clone(),
                items: vec![GeneratedItem {
                    kind: tripweave_itinerary::DayItemKind::PointOfInterest,
                    title: format!("Explore {}", waypoint.name),
                    details: None,
                    time: Some("10:00".to_owned()),
                    cost: Some(500.0),
                }],
                distance_km: 0.0,
                duration_min: 0.0,
                estimated_cost: 500.0,
            })
            .collect::<Vec<_>>();

        Ok(GeneratedPlan {
            total_estimated_cost: Some(500.0 * days.len() as f64),
            days,
        })
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _dir: TempDir,
}

pub async fn setup_test_app() -> anyhow::Result<TestApp> {
    let dir = TempDir::new()?;
    let url = format!("sqlite:{}", dir.child("tripweave.db").display());
    let pool = tripweave::db::create_pool(&url, 2).await?;
    tripweave_db::migrate(&pool).await?;

    let config = test_config(&url);
    let repository = Arc::new(SqliteRepository::new(State::single(pool.clone())));
    let registry = Arc::new(StoreRegistry::new(
        repository,
        config.planner.store_settings(),
    ));

    let state = AppState {
        registry,
        pool,
        geocoder: Arc::new(FakeMaps),
        directions: Arc::new(FakeMaps),
        optimizer: Arc::new(FakeGateway),
        generator: Arc::new(FakeGateway),
        exporter: Arc::new(DocumentExporter),
        sharer: Arc::new(LinkSharer::new(&config.providers.public_base_url)?),
        config,
    };

    Ok(TestApp {
        app: create_app(state.clone()),
        state,
        _dir: dir,
    })
}

impl TestApp {
    pub async fn raw(
        &self,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, String) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let (status, text) = self.raw(method, uri, body).await;
        let json = if text.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap()
        };

        (status, json)
    }

    /// Creates an itinerary and returns its id together with the start and end waypoint ids.
    pub async fn create_itinerary(&self, title: &str) -> (String, String, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/itineraries",
                Some(serde_json::json!({ "user_id": "u1", "title": title })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let waypoints = &body["itinerary"]["waypoints"];
        (
            body["itinerary"]["id"].as_str().unwrap().to_owned(),
            waypoints[0]["id"].as_str().unwrap().to_owned(),
            waypoints[1]["id"].as_str().unwrap().to_owned(),
        )
    }

    pub async fn geocode(&self, id: &str, waypoint_id: &str, query: &str) -> serde_json::Value {
        let (status, body) = self
            .send(
                Method::POST,
                &format!("/itineraries/{id}/waypoints/{waypoint_id}/geocode"),
                Some(serde_json::json!({ "query": query })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        body
    }

    /// Delhi to Shillong via Patna, with the route computed.
    pub async fn planned_itinerary(&self, title: &str) -> String {
        let (id, start, end) = self.create_itinerary(title).await;
        self.geocode(&id, &start, "Delhi").await;
        self.geocode(&id, &end, "Shillong").await;

        let (status, body) = self
            .send(
                Method::POST,
                &format!("/itineraries/{id}/waypoints"),
                Some(serde_json::json!({
                    "name": "Patna",
                    "coordinates": { "lat": 25.59, "lng": 85.14 }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let (status, body) = self
            .send(Method::POST, &format!("/itineraries/{id}/route"), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        id
    }
}
