use std::ops::Add;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantArray};
use validator::{Validate, ValidationError};

use crate::WaypointList;

/// Latitude/longitude pair. `(0, 0)` is reserved for "not resolved yet".
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const UNRESOLVED: Coordinates = Coordinates { lat: 0.0, lng: 0.0 };

    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_resolved(&self) -> bool {
        self.lat != 0.0 || self.lng != 0.0
    }
}

#[derive(
    Serialize,
    Deserialize,
    EnumString,
    VariantArray,
    Display,
    AsRefStr,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WaypointRole {
    Start,
    End,
    Intermediate,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Waypoint {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub coordinates: Coordinates,
    pub role: WaypointRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
}

impl Waypoint {
    pub fn new(role: WaypointRole, name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            id: crate::new_id(),
            name: name.into(),
            coordinates,
            role,
            address: None,
            place_id: None,
        }
    }

    pub fn unresolved(role: WaypointRole) -> Self {
        Self::new(role, "", Coordinates::UNRESOLVED)
    }

    pub fn is_resolved(&self) -> bool {
        self.coordinates.is_resolved()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RouteStep {
    pub instruction: String,
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub duration_min: f64,
}

/// Aggregate distance/duration for one exact waypoint sequence.
///
/// `polyline` and `steps` are carried through for rendering and export only.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RouteSummary {
    pub total_distance_km: f64,
    pub total_duration_min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
    #[serde(default)]
    pub steps: Vec<RouteStep>,
    /// Coordinates the summary was computed for, in route order.
    #[serde(default)]
    pub computed_for: Vec<Coordinates>,
}

impl RouteSummary {
    pub fn new(total_distance_km: f64, total_duration_min: f64) -> Self {
        Self {
            total_distance_km,
            total_duration_min,
            polyline: None,
            steps: vec![],
            computed_for: vec![],
        }
    }

    pub fn is_current_for(&self, coordinates: &[Coordinates]) -> bool {
        self.computed_for == coordinates
    }
}

#[derive(
    Serialize,
    Deserialize,
    EnumString,
    VariantArray,
    Display,
    AsRefStr,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DayItemKind {
    DriveLeg,
    PointOfInterest,
    Lodging,
    Note,
    PhotoOp,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DayItem {
    pub id: String,
    pub kind: DayItemKind,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<f64>,
}

impl DayItem {
    pub fn new(id: impl Into<String>, kind: DayItemKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            details: None,
            time: None,
            cost: None,
            coordinates: None,
            distance_km: None,
            duration_min: None,
        }
    }

    pub fn blank(kind: DayItemKind) -> Self {
        Self::new(crate::new_id(), kind, "")
    }

    pub fn apply(&mut self, patch: DayItemPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(details) = patch.details {
            self.details = Some(details);
        }
        if let Some(time) = patch.time {
            self.time = Some(time);
        }
        if let Some(cost) = patch.cost {
            self.cost = Some(cost);
        }
        if let Some(coordinates) = patch.coordinates {
            self.coordinates = Some(coordinates);
        }
        if let Some(distance_km) = patch.distance_km {
            self.distance_km = Some(distance_km);
        }
        if let Some(duration_min) = patch.duration_min {
            self.duration_min = Some(duration_min);
        }
    }
}

/// Partial update for a [`DayItem`]; absent fields are left untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DayItemPatch {
    pub kind: Option<DayItemKind>,
    pub title: Option<String>,
    pub details: Option<String>,
    pub time: Option<String>,
    pub cost: Option<f64>,
    pub coordinates: Option<Coordinates>,
    pub distance_km: Option<f64>,
    pub duration_min: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct DaySummary {
    pub distance_km: f64,
    pub duration_min: f64,
    pub estimated_cost: f64,
}

impl DaySummary {
    pub fn halved(&self) -> Self {
        Self {
            distance_km: self.distance_km / 2.0,
            duration_min: self.duration_min / 2.0,
            estimated_cost: self.estimated_cost / 2.0,
        }
    }
}

impl Add for DaySummary {
    type Output = DaySummary;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            distance_km: self.distance_km + rhs.distance_km,
            duration_min: self.duration_min + rhs.duration_min,
            estimated_cost: self.estimated_cost + rhs.estimated_cost,
        }
    }
}

/// One calendar day. `summary` is a cached aggregate and is not kept in sync with `items`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DayPlan {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub items: Vec<DayItem>,
    #[serde(default)]
    pub summary: DaySummary,
}

impl DayPlan {
    pub fn new(id: impl Into<String>, date: Option<String>) -> Self {
        Self {
            id: id.into(),
            date,
            items: vec![],
            summary: DaySummary::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Itinerary {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    pub title: String,
    pub waypoints: WaypointList,
    #[serde(default)]
    pub days: Vec<DayPlan>,
    #[serde(default)]
    pub route_summary: Option<RouteSummary>,
    /// First travel day (`YYYY-MM-DD`); derived day dates count from it.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Set once the day list was changed by hand or generated, cleared by a fresh derivation.
    #[serde(default)]
    pub days_edited: bool,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub share_slug: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl Itinerary {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            title: title.into(),
            waypoints: WaypointList::new(),
            days: vec![],
            route_summary: None,
            start_date: None,
            days_edited: false,
            is_public: false,
            share_slug: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// The route summary, unless the waypoints moved since it was computed.
    pub fn current_route(&self) -> Option<&RouteSummary> {
        let coordinates = self.waypoints.route_coordinates();
        self.route_summary
            .as_ref()
            .filter(|route| route.is_current_for(&coordinates))
    }

    pub fn trip_start(&self) -> Option<time::Date> {
        self.start_date
            .as_deref()
            .and_then(tripweave_shared::parse_date)
    }

    pub fn item_count(&self) -> usize {
        self.days.iter().map(|day| day.items.len()).sum()
    }

    /// Share slug, only when the itinerary is public.
    pub fn public_slug(&self) -> Option<&str> {
        if self.is_public {
            self.share_slug.as_deref()
        } else {
            None
        }
    }
}

/// Trip-level inputs for the itinerary generator.
#[derive(Serialize, Deserialize, Validate, Clone, Debug, Default, PartialEq)]
#[validate(schema(function = "validate_trip_dates"))]
pub struct TripMetadata {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[validate(range(min = 0.0))]
    pub budget: Option<f64>,
    #[validate(range(min = 1, max = 50))]
    #[serde(default = "default_travelers")]
    pub travelers: u16,
    #[serde(default)]
    pub interests: Vec<String>,
}

fn default_travelers() -> u16 {
    1
}

fn validate_trip_dates(trip: &TripMetadata) -> Result<(), ValidationError> {
    let start = match trip.start_date.as_deref() {
        Some(value) => Some(
            tripweave_shared::parse_date(value)
                .ok_or_else(|| ValidationError::new("invalid_start_date"))?,
        ),
        None => None,
    };
    let end = match trip.end_date.as_deref() {
        Some(value) => Some(
            tripweave_shared::parse_date(value)
                .ok_or_else(|| ValidationError::new("invalid_end_date"))?,
        ),
        None => None,
    };

    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            Err(ValidationError::new("end_before_start"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_sentinel() {
        assert!(!Coordinates::UNRESOLVED.is_resolved());
        assert!(Coordinates::new(0.0, 77.2).is_resolved());
        assert!(Coordinates::new(28.6, 77.2).is_resolved());
    }

    #[test]
    fn test_day_item_kind_wire_format() {
        assert_eq!(DayItemKind::DriveLeg.to_string(), "drive-leg");
        assert_eq!(
            serde_json::to_string(&DayItemKind::PhotoOp).unwrap(),
            "\"photo-op\""
        );
        assert_eq!(
            "point-of-interest".parse::<DayItemKind>().unwrap(),
            DayItemKind::PointOfInterest
        );
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut item = DayItem::new("a", DayItemKind::Note, "Buy snacks");
        item.details = Some("at the toll plaza".to_owned());

        item.apply(DayItemPatch {
            time: Some("10:30".to_owned()),
            cost: Some(250.0),
            ..Default::default()
        });

        assert_eq!(item.title, "Buy snacks");
        assert_eq!(item.details.as_deref(), Some("at the toll plaza"));
        assert_eq!(item.time.as_deref(), Some("10:30"));
        assert_eq!(item.cost, Some(250.0));
    }

    #[test]
    fn test_trip_metadata_rejects_end_before_start() {
        let trip = TripMetadata {
            start_date: Some("2025-05-10".to_owned()),
            end_date: Some("2025-05-01".to_owned()),
            travelers: 2,
            ..Default::default()
        };
        assert!(trip.validate().is_err());
    }

    #[test]
    fn test_trip_metadata_rejects_negative_budget() {
        let trip = TripMetadata {
            budget: Some(-10.0),
            travelers: 2,
            ..Default::default()
        };
        assert!(trip.validate().is_err());

        let trip = TripMetadata {
            start_date: Some("2025-05-01".to_owned()),
            end_date: Some("2025-05-10".to_owned()),
            budget: Some(30000.0),
            travelers: 2,
            ..Default::default()
        };
        assert!(trip.validate().is_ok());
    }
}
