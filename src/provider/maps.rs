use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tripweave_itinerary::{Coordinates, Directions, Geocoder, Place, RouteStep, RouteSummary};
use tripweave_shared::ServiceError;
use url::Url;

use super::{error_for_status, http_client, map_reqwest_error};

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct Measure {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct Step {
    #[serde(default)]
    html_instructions: String,
    distance: Measure,
    duration: Measure,
}

#[derive(Debug, Deserialize)]
struct Leg {
    distance: Measure,
    duration: Measure,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Polyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct Route {
    legs: Vec<Leg>,
    #[serde(default)]
    overview_polyline: Option<Polyline>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

fn status_error(status: &str, message: Option<String>, not_found: ServiceError) -> ServiceError {
    let message = message.unwrap_or_else(|| status.to_owned());

    match status {
        "ZERO_RESULTS" | "NOT_FOUND" => not_found,
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => ServiceError::RateLimited,
        "INVALID_REQUEST" | "MAX_WAYPOINTS_EXCEEDED" | "MAX_ROUTE_LENGTH_EXCEEDED" => {
            ServiceError::InvalidRequest(message)
        }
        _ => ServiceError::Unavailable(message),
    }
}

fn parse_geocode(body: GeocodeResponse) -> Result<Place, ServiceError> {
    if body.status != "OK" {
        return Err(status_error(
            &body.status,
            body.error_message,
            ServiceError::NotFound,
        ));
    }

    let Some(first) = body.results.into_iter().next() else {
        return Err(ServiceError::NotFound);
    };

    Ok(Place {
        coordinates: Coordinates::new(first.geometry.location.lat, first.geometry.location.lng),
        formatted_address: first.formatted_address,
        place_id: first.place_id,
    })
}

static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

fn strip_tags(html: &str) -> String {
    RE_TAG
        .replace_all(html, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_directions(body: DirectionsResponse) -> Result<RouteSummary, ServiceError> {
    if body.status != "OK" {
        return Err(status_error(
            &body.status,
            body.error_message,
            ServiceError::NoRoute,
        ));
    }

    let Some(route) = body.routes.into_iter().next() else {
        return Err(ServiceError::NoRoute);
    };

    let metres: f64 = route.legs.iter().map(|leg| leg.distance.value).sum();
    let seconds: f64 = route.legs.iter().map(|leg| leg.duration.value).sum();

    let mut summary = RouteSummary::new(metres / 1000.0, seconds / 60.0);
    summary.polyline = route.overview_polyline.map(|p| p.points);
    summary.steps = route
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(|step| RouteStep {
            instruction: strip_tags(&step.html_instructions),
            distance_km: step.distance.value / 1000.0,
            duration_min: step.duration.value / 60.0,
        })
        .collect();

    Ok(summary)
}

fn lat_lng(c: &Coordinates) -> String {
    format!("{},{}", c.lat, c.lng)
}

/// Geocoding and driving directions from a Google-style maps JSON API.
#[derive(Debug, Clone)]
pub struct MapsClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl MapsClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Url::parse(&base_url).map_err(|e| ServiceError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            http: http_client(timeout)?,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&format!("{}/{path}", self.base_url))
            .map_err(|e| ServiceError::InvalidRequest(e.to_string()))?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("key", &self.api_key);

        Ok(url)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, ServiceError> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !res.status().is_success() {
            return Err(error_for_status(res).await);
        }

        res.json::<T>()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Geocoder for MapsClient {
    #[tracing::instrument(skip(self))]
    async fn geocode(&self, query: &str) -> Result<Place, ServiceError> {
        let url = self.endpoint("geocode/json", &[("address", query)])?;
        let body = self.get::<GeocodeResponse>(url).await?;

        parse_geocode(body)
    }
}

#[async_trait::async_trait]
impl Directions for MapsClient {
    #[tracing::instrument(skip_all, fields(stops = coordinates.len()))]
    async fn compute_route(&self, coordinates: &[Coordinates]) -> Result<RouteSummary, ServiceError> {
        let [origin, via @ .., destination] = coordinates else {
            return Err(ServiceError::InvalidRequest(
                "a route needs at least two stops".to_owned(),
            ));
        };

        let origin = lat_lng(origin);
        let destination = lat_lng(destination);
        let waypoints = via.iter().map(lat_lng).collect::<Vec<_>>().join("|");

        let mut params = vec![
            ("origin", origin.as_str()),
            ("destination", destination.as_str()),
            ("mode", "driving"),
        ];
        if !waypoints.is_empty() {
            params.push(("waypoints", waypoints.as_str()));
        }

        let url = self.endpoint("directions/json", &params)?;
        let body = self.get::<DirectionsResponse>(url).await?;

        parse_directions(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geocode(value: serde_json::Value) -> Result<Place, ServiceError> {
        parse_geocode(serde_json::from_value(value).unwrap())
    }

    fn directions(value: serde_json::Value) -> Result<RouteSummary, ServiceError> {
        parse_directions(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_geocode_first_result() {
        let place = geocode(serde_json::json!({
            "status": "OK",
            "results": [
                {
                    "geometry": { "location": { "lat": 25.5941, "lng": 85.1376 } },
                    "formatted_address": "Patna, Bihar, India",
                    "place_id": "ChIJ-patna"
                },
                {
                    "geometry": { "location": { "lat": 1.0, "lng": 1.0 } },
                    "formatted_address": "Elsewhere"
                }
            ]
        }))
        .unwrap();

        assert_eq!(place.coordinates, Coordinates::new(25.5941, 85.1376));
        assert_eq!(place.formatted_address, "Patna, Bihar, India");
        assert_eq!(place.place_id.as_deref(), Some("ChIJ-patna"));
    }

    #[test]
    fn test_geocode_status_mapping() {
        let err = geocode(serde_json::json!({ "status": "ZERO_RESULTS", "results": [] }));
        assert_eq!(err, Err(ServiceError::NotFound));

        let err = geocode(serde_json::json!({ "status": "OVER_QUERY_LIMIT" }));
        assert_eq!(err, Err(ServiceError::RateLimited));

        let err = geocode(serde_json::json!({
            "status": "INVALID_REQUEST",
            "error_message": "missing address"
        }));
        assert_eq!(
            err,
            Err(ServiceError::InvalidRequest("missing address".to_owned()))
        );

        let err = geocode(serde_json::json!({ "status": "REQUEST_DENIED" }));
        assert!(matches!(err, Err(ServiceError::Unavailable(_))));
    }

    #[test]
    fn test_directions_sums_legs() {
        let summary = directions(serde_json::json!({
            "status": "OK",
            "routes": [{
                "overview_polyline": { "points": "abc" },
                "legs": [
                    {
                        "distance": { "value": 1000000 },
                        "duration": { "value": 36000 },
                        "steps": [{
                            "html_instructions": "Head <b>east</b> on NH27",
                            "distance": { "value": 1000000 },
                            "duration": { "value": 36000 }
                        }]
                    },
                    {
                        "distance": { "value": 500000 },
                        "duration": { "value": 18000 },
                        "steps": []
                    }
                ]
            }]
        }))
        .unwrap();

        assert_eq!(summary.total_distance_km, 1500.0);
        assert_eq!(summary.total_duration_min, 900.0);
        assert_eq!(summary.polyline.as_deref(), Some("abc"));
        assert_eq!(summary.steps.len(), 1);
        assert_eq!(summary.steps[0].instruction, "Head east on NH27");
        assert_eq!(summary.steps[0].distance_km, 1000.0);
        assert!(summary.computed_for.is_empty());
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(
            strip_tags("Turn <b>left</b> onto <span class=\"road\">NH 6</span>"),
            "Turn left onto NH 6"
        );
        assert_eq!(
            strip_tags("Continue   straight<div style=\"font-size:0.9em\"> Toll road</div>"),
            "Continue straight Toll road"
        );
        assert_eq!(strip_tags("no markup"), "no markup");
    }

    #[test]
    fn test_directions_no_route() {
        let err = directions(serde_json::json!({ "status": "ZERO_RESULTS", "routes": [] }));
        assert_eq!(err, Err(ServiceError::NoRoute));

        let err = directions(serde_json::json!({ "status": "OK", "routes": [] }));
        assert_eq!(err, Err(ServiceError::NoRoute));
    }

    #[tokio::test]
    async fn test_route_needs_two_stops() {
        let client = MapsClient::new("http://127.0.0.1:9", "key", Duration::from_secs(1)).unwrap();
        let err = client
            .compute_route(&[Coordinates::new(28.6, 77.2)])
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }
}
