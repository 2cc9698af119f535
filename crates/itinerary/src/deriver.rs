use time::{Date, Duration};
use tripweave_shared::format_date;

use crate::{DayItem, DayItemKind, DayPlan, DaySummary, RouteSummary, Waypoint, WaypointList};

pub const DEFAULT_DAILY_BUDGET_KM: f64 = 400.0;

/// Tunables for turning a route into day plans.
#[derive(Clone, Debug, PartialEq)]
pub struct DeriveOptions {
    pub daily_budget_km: f64,
    pub start_date: Date,
    pub cost_per_km: f64,
    pub lodging_per_night: f64,
    pub lodging_range: (f64, f64),
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self {
            daily_budget_km: DEFAULT_DAILY_BUDGET_KM,
            start_date: tripweave_shared::today(),
            cost_per_km: 8.0,
            lodging_per_night: 2500.0,
            lodging_range: (2000.0, 4000.0),
        }
    }
}

impl DeriveOptions {
    pub fn starting(mut self, start_date: Date) -> Self {
        self.start_date = start_date;
        self
    }
}

/// Splits a computed route into one [`DayPlan`] per daily budget.
///
/// Returns no days when fewer than two waypoints are resolved or no route is known. Day
/// distances always add up to the route's total distance: every day but the last drives the
/// full budget and the last one takes the remainder.
pub fn derive_days(
    waypoints: &WaypointList,
    route: Option<&RouteSummary>,
    options: &DeriveOptions,
) -> Vec<DayPlan> {
    let stops = waypoints.resolved().collect::<Vec<_>>();
    let Some(route) = route else {
        return vec![];
    };

    if stops.len() < 2 || options.daily_budget_km <= 0.0 {
        return vec![];
    }

    let total_km = route.total_distance_km.max(0.0);
    let total_min = route.total_duration_min.max(0.0);

    day_distances(total_km, options.daily_budget_km)
        .into_iter()
        .enumerate()
        .map(|(i, distance_km)| {
            let duration_min = if total_km > 0.0 {
                distance_km / total_km * total_min
            } else {
                total_min
            };

            derive_day(i, &stops, distance_km, duration_min, options)
        })
        .collect()
}

/// Full budget for every day but the last, which takes `total` minus what came before.
///
/// The day count tolerates float noise so an exact multiple of the budget never grows a
/// near-empty extra day.
fn day_distances(total_km: f64, budget_km: f64) -> Vec<f64> {
    let num_days = ((total_km / budget_km - DAY_COUNT_TOLERANCE).ceil().max(1.0)) as usize;

    let mut distances = Vec::with_capacity(num_days);
    let mut driven = 0.0;
    for _ in 1..num_days {
        distances.push(budget_km);
        driven += budget_km;
    }
    distances.push((total_km - driven).max(0.0));

    distances
}

const DAY_COUNT_TOLERANCE: f64 = 1e-9;

fn derive_day(
    index: usize,
    stops: &[&Waypoint],
    distance_km: f64,
    duration_min: f64,
    options: &DeriveOptions,
) -> DayPlan {
    let number = index + 1;
    let date = options
        .start_date
        .checked_add(Duration::days(index as i64))
        .map(format_date);
    let destination = stops[(index + 1).min(stops.len() - 1)];

    let mut day = DayPlan::new(format!("day-{number}"), date);

    if index + 1 < stops.len() {
        let from = stops[index];
        let mut drive = DayItem::new(
            format!("day-{number}-drive"),
            DayItemKind::DriveLeg,
            format!("{} to {}", label(from), label(destination)),
        );
        drive.details = Some(format_distance(distance_km));
        drive.time = Some(format_duration(duration_min));
        drive.distance_km = Some(distance_km);
        drive.duration_min = Some(duration_min);
        drive.coordinates = Some(destination.coordinates);
        day.items.push(drive);
    }

    let mut arrival = DayItem::new(
        format!("day-{number}-arrival"),
        DayItemKind::PointOfInterest,
        format!("Arrive in {}", label(destination)),
    );
    arrival.details = destination.address.to_owned();
    arrival.coordinates = Some(destination.coordinates);
    day.items.push(arrival);

    let (low, high) = options.lodging_range;
    let mut lodging = DayItem::new(
        format!("day-{number}-lodging"),
        DayItemKind::Lodging,
        format!("Stay near {}", label(destination)),
    );
    lodging.details = Some(format!("Typical rate {low:.0} - {high:.0} per night"));
    lodging.cost = Some(options.lodging_per_night);
    day.items.push(lodging);

    day.summary = DaySummary {
        distance_km,
        duration_min,
        estimated_cost: distance_km * options.cost_per_km + options.lodging_per_night,
    };

    day
}

fn label(waypoint: &Waypoint) -> &str {
    if waypoint.name.is_empty() {
        waypoint.address.as_deref().unwrap_or("unnamed stop")
    } else {
        &waypoint.name
    }
}

pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else if km < 10.0 {
        format!("{km:.1} km")
    } else {
        format!("{km:.0} km")
    }
}

pub fn format_duration(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as u64;
    let (hours, mins) = (total / 60, total % 60);

    match (hours, mins) {
        (0, m) => format!("{m} min"),
        (h, 0) => format!("{h} h"),
        (h, m) => format!("{h} h {m} min"),
    }
}
