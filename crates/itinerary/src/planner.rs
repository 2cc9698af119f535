use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tripweave_shared::{Error, Result};
use validator::Validate;

use crate::editor::{self, MoveItem};
use crate::{
    Coordinates, DayItem, DayItemKind, DayItemPatch, DayPlan, DaySummary, DeriveOptions,
    GeneratedPlan, Itinerary, ItineraryRepository, OptimizePreferences, OptimizeRequest,
    OptimizedOrder, Persisted, Place, RouteSummary, TripMetadata, WaypointList, WaypointPatch,
    derive_days, generate_share_slug, validate_permutation,
};

#[derive(
    Serialize, Deserialize, EnumString, Display, AsRefStr, Clone, Copy, Debug, PartialEq, Eq,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Lifecycle {
    Unsaved,
    Saved,
    Dirty,
    Deleted,
}

/// What happens to the day plans when a new route arrives.
#[derive(
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RegenerationPolicy {
    /// Always re-derive, dropping manual edits.
    #[default]
    Replace,
    /// Keep the current days once the user has edited them.
    PreserveEdited,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouteTicket {
    seq: u64,
    pub coordinates: Vec<Coordinates>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeocodeTicket {
    seq: u64,
    pub waypoint_id: String,
    pub query: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptimizeTicket {
    seq: u64,
    intermediates: Vec<String>,
    pub request: OptimizeRequest,
}

/// Snapshot handed to the persistence layer.
#[derive(Clone, Debug)]
pub struct SaveRequest {
    pub revision: u64,
    pub itinerary: Itinerary,
}

/// Owns one itinerary and tracks whether it still needs saving.
///
/// Every successful mutation bumps `revision`. A save only clears the dirty flag when it
/// persisted the latest revision, so edits made while a save is in flight are never lost.
#[derive(Debug)]
pub struct Planner {
    itinerary: Itinerary,
    options: DeriveOptions,
    policy: RegenerationPolicy,
    revision: u64,
    dirty: bool,
    deleted: bool,
    seq: u64,
    pending_route: Option<u64>,
    pending_optimize: Option<u64>,
    pending_geocodes: HashMap<String, u64>,
}

impl Planner {
    pub fn create_new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        options: DeriveOptions,
        policy: RegenerationPolicy,
    ) -> Self {
        Self::load(Itinerary::new(user_id, title), options, policy)
    }

    /// Opens an existing itinerary. A stored trip start date wins over `options.start_date`.
    pub fn load(
        itinerary: Itinerary,
        mut options: DeriveOptions,
        policy: RegenerationPolicy,
    ) -> Self {
        if let Some(start) = itinerary.trip_start() {
            options.start_date = start;
        }

        Self {
            itinerary,
            options,
            policy,
            revision: 0,
            dirty: false,
            deleted: false,
            seq: 0,
            pending_route: None,
            pending_optimize: None,
            pending_geocodes: HashMap::new(),
        }
    }

    pub fn itinerary(&self) -> &Itinerary {
        &self.itinerary
    }

    pub fn id(&self) -> Option<&str> {
        self.itinerary.id.as_deref()
    }

    pub fn options(&self) -> &DeriveOptions {
        &self.options
    }

    pub fn policy(&self) -> RegenerationPolicy {
        self.policy
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.deleted {
            Lifecycle::Deleted
        } else if self.itinerary.id.is_none() {
            Lifecycle::Unsaved
        } else if self.dirty {
            Lifecycle::Dirty
        } else {
            Lifecycle::Saved
        }
    }

    /// Auto-save only covers itineraries that were saved once and have a usable route.
    pub fn should_autosave(&self) -> bool {
        !self.deleted
            && self.dirty
            && self.itinerary.id.is_some()
            && self.itinerary.waypoints.resolved_count() >= 2
    }

    fn ensure_live(&self) -> Result<()> {
        if self.deleted {
            return Err(Error::Deleted);
        }

        Ok(())
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.dirty = true;
    }

    fn touch_if(&mut self, changed: bool) -> bool {
        if changed {
            self.touch();
        }
        changed
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        self.ensure_live()?;
        self.itinerary.title = title.into();
        self.touch();

        Ok(())
    }

    /// Sets or clears the first travel day. Untouched derived days are re-dated right away;
    /// edited days keep their dates until the next regeneration.
    pub fn set_start_date(&mut self, start_date: Option<&str>) -> Result<()> {
        self.ensure_live()?;
        let start = match start_date {
            Some(value) => match tripweave_shared::parse_date(value) {
                Some(date) => Some(date),
                None => tripweave_shared::user!("Start date must look like 2025-03-14"),
            },
            None => None,
        };

        self.itinerary.start_date = start.map(tripweave_shared::format_date);
        self.options.start_date = start.unwrap_or_else(tripweave_shared::today);

        if !self.itinerary.days_edited && self.itinerary.current_route().is_some() {
            self.derive();
        }
        self.touch();

        Ok(())
    }

    // Waypoints

    pub fn add_waypoint(
        &mut self,
        name: impl Into<String>,
        coordinates: Coordinates,
    ) -> Result<String> {
        self.ensure_live()?;
        let id = self.itinerary.waypoints.add_intermediate(name, coordinates)?;
        self.touch();

        Ok(id)
    }

    pub fn update_waypoint(&mut self, id: &str, patch: WaypointPatch) -> Result<bool> {
        self.ensure_live()?;
        if patch.coordinates.is_some() {
            self.pending_geocodes.remove(id);
        }
        let changed = self.itinerary.waypoints.update(id, patch);

        Ok(self.touch_if(changed))
    }

    pub fn remove_waypoint(&mut self, id: &str) -> Result<bool> {
        self.ensure_live()?;
        self.pending_geocodes.remove(id);
        let changed = self.itinerary.waypoints.remove(id);

        Ok(self.touch_if(changed))
    }

    pub fn move_waypoint(&mut self, from: usize, to: usize) -> Result<bool> {
        self.ensure_live()?;
        let changed = self.itinerary.waypoints.move_intermediate(from, to);

        Ok(self.touch_if(changed))
    }

    // Route

    /// Validates the waypoints and opens a route request. Any older request is superseded.
    pub fn begin_route_request(&mut self) -> Result<RouteTicket> {
        self.ensure_live()?;
        self.itinerary.waypoints.validate_for_route()?;

        let seq = self.next_seq();
        self.pending_route = Some(seq);

        Ok(RouteTicket {
            seq,
            coordinates: self.itinerary.waypoints.route_coordinates(),
        })
    }

    /// Stores a computed route and re-derives days. Returns `false` for a superseded ticket
    /// or when the waypoints changed while the request was in flight.
    pub fn apply_route(&mut self, ticket: RouteTicket, mut summary: RouteSummary) -> Result<bool> {
        self.ensure_live()?;
        if self.pending_route != Some(ticket.seq) {
            tracing::debug!(seq = ticket.seq, "dropping superseded route response");
            return Ok(false);
        }

        self.pending_route = None;
        if self.itinerary.waypoints.route_coordinates() != ticket.coordinates {
            tracing::debug!(seq = ticket.seq, "dropping route for outdated waypoints");
            return Ok(false);
        }

        summary.computed_for = ticket.coordinates;
        self.itinerary.route_summary = Some(summary);
        self.regenerate_on_route_change();
        self.touch();

        Ok(true)
    }

    /// Rolls back after a failed directions call: no stale route is kept.
    pub fn fail_route(&mut self, ticket: &RouteTicket) -> bool {
        if self.deleted || self.pending_route != Some(ticket.seq) {
            return false;
        }

        self.pending_route = None;
        let had_route = self.itinerary.route_summary.take().is_some();
        self.touch_if(had_route);

        true
    }

    fn regenerate_on_route_change(&mut self) {
        let keep = self.policy == RegenerationPolicy::PreserveEdited
            && self.itinerary.days_edited
            && !self.itinerary.days.is_empty();

        if keep {
            tracing::debug!("keeping edited day plans");
            return;
        }

        self.derive();
    }

    fn derive(&mut self) {
        self.itinerary.days = derive_days(
            &self.itinerary.waypoints,
            self.itinerary.current_route(),
            &self.options,
        );
        self.itinerary.days_edited = false;
    }

    /// Re-derives day plans from the current route regardless of the policy.
    pub fn regenerate_days(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.itinerary.current_route().is_none() {
            tripweave_shared::user!("Compute the route before regenerating days");
        }
        self.derive();
        self.touch();

        Ok(())
    }

    // Geocoding

    pub fn begin_geocode(&mut self, waypoint_id: &str, query: &str) -> Result<GeocodeTicket> {
        self.ensure_live()?;
        let query = query.trim();
        if query.is_empty() {
            tripweave_shared::user!("Please enter a location to search for");
        }

        if self.itinerary.waypoints.get(waypoint_id).is_none() {
            return Err(Error::NotFound);
        }

        let seq = self.next_seq();
        self.pending_geocodes.insert(waypoint_id.to_owned(), seq);

        Ok(GeocodeTicket {
            seq,
            waypoint_id: waypoint_id.to_owned(),
            query: query.to_owned(),
        })
    }

    /// Applies a geocoding hit if it answers the latest query for a waypoint that still exists.
    pub fn apply_geocode(&mut self, ticket: GeocodeTicket, place: Place) -> Result<bool> {
        self.ensure_live()?;
        if self.pending_geocodes.get(&ticket.waypoint_id) != Some(&ticket.seq) {
            tracing::debug!(waypoint = %ticket.waypoint_id, "dropping stale geocode result");
            return Ok(false);
        }

        self.pending_geocodes.remove(&ticket.waypoint_id);
        let changed = self.itinerary.waypoints.update(
            &ticket.waypoint_id,
            WaypointPatch {
                name: Some(place.formatted_address.to_owned()),
                coordinates: Some(place.coordinates),
                address: Some(place.formatted_address),
                place_id: place.place_id,
            },
        );

        Ok(self.touch_if(changed))
    }

    pub fn fail_geocode(&mut self, ticket: &GeocodeTicket) {
        if self.pending_geocodes.get(&ticket.waypoint_id) == Some(&ticket.seq) {
            self.pending_geocodes.remove(&ticket.waypoint_id);
        }
    }

    // Optimization and generation

    pub fn begin_optimize(&mut self, preferences: OptimizePreferences) -> Result<OptimizeTicket> {
        self.ensure_live()?;
        let waypoints = &self.itinerary.waypoints;
        waypoints.validate_for_route()?;

        if waypoints.intermediates().iter().any(|w| !w.is_resolved()) {
            tripweave_shared::user!("All stops need a location before optimizing");
        }

        let request = OptimizeRequest::from_waypoints(waypoints, preferences);
        let intermediates = waypoints
            .intermediates()
            .iter()
            .map(|w| w.id.to_owned())
            .collect();
        let seq = self.next_seq();
        self.pending_optimize = Some(seq);

        Ok(OptimizeTicket {
            seq,
            intermediates,
            request,
        })
    }

    /// Reorders intermediates. A permutation that does not match the stops is rejected
    /// with a malformed-response error and nothing changes.
    pub fn apply_optimized_order(
        &mut self,
        ticket: OptimizeTicket,
        optimized: &OptimizedOrder,
    ) -> Result<bool> {
        self.ensure_live()?;
        validate_permutation(ticket.intermediates.len(), &optimized.order)?;

        let current = self
            .itinerary
            .waypoints
            .intermediates()
            .iter()
            .map(|w| w.id.as_str())
            .collect::<Vec<_>>();

        if self.pending_optimize != Some(ticket.seq) || current != ticket.intermediates {
            tracing::debug!(seq = ticket.seq, "dropping stale optimization");
            return Ok(false);
        }

        self.pending_optimize = None;
        self.itinerary
            .waypoints
            .reorder_intermediates(&optimized.order)?;
        let changed = optimized.order.iter().enumerate().any(|(i, &j)| i != j);

        Ok(self.touch_if(changed))
    }

    /// Checks the inputs of an itinerary generation request. A trip without a start date
    /// falls back to the itinerary's own.
    pub fn generation_input(&self, trip: &TripMetadata) -> Result<(WaypointList, TripMetadata)> {
        self.ensure_live()?;
        trip.validate()?;
        self.itinerary.waypoints.validate_for_route()?;

        let mut trip = trip.clone();
        if trip.start_date.is_none() {
            trip.start_date = self.itinerary.start_date.to_owned();
        }

        Ok((self.itinerary.waypoints.clone(), trip))
    }

    /// Replaces the day plans with a generated plan and adopts the trip's start date.
    /// Generated days count as edited.
    pub fn apply_generated_plan(&mut self, plan: GeneratedPlan, trip: &TripMetadata) -> Result<()> {
        self.ensure_live()?;

        if let Some(start) = trip.start_date.as_deref().and_then(tripweave_shared::parse_date) {
            self.itinerary.start_date = Some(tripweave_shared::format_date(start));
            self.options.start_date = start;
        }

        self.itinerary.days = plan
            .days
            .into_iter()
            .map(|day| {
                let items = day
                    .items
                    .into_iter()
                    .map(|generated| {
                        let mut item = DayItem::blank(generated.kind);
                        item.title = generated.title;
                        item.details = generated.details;
                        item.time = generated.time;
                        item.cost = generated.cost;
                        item
                    })
                    .collect();

                DayPlan {
                    id: crate::new_id(),
                    date: day.date,
                    items,
                    summary: DaySummary {
                        distance_km: day.distance_km,
                        duration_min: day.duration_min,
                        estimated_cost: day.estimated_cost,
                    },
                }
            })
            .collect();
        self.itinerary.days_edited = true;
        self.touch();

        Ok(())
    }

    // Day plans

    pub fn add_item(&mut self, day_id: &str, kind: DayItemKind) -> Result<Option<String>> {
        self.ensure_live()?;
        let id = editor::add_item(&mut self.itinerary.days, day_id, kind);
        self.edited(id.is_some());

        Ok(id)
    }

    pub fn update_item(&mut self, day_id: &str, item_id: &str, patch: DayItemPatch) -> Result<bool> {
        self.ensure_live()?;
        let changed = editor::update_item(&mut self.itinerary.days, day_id, item_id, patch);

        Ok(self.edited(changed))
    }

    pub fn remove_item(&mut self, day_id: &str, item_id: &str) -> Result<bool> {
        self.ensure_live()?;
        let removed = editor::remove_item(&mut self.itinerary.days, day_id, item_id);

        Ok(self.edited(removed.is_some()))
    }

    pub fn move_item(&mut self, action: &MoveItem) -> Result<bool> {
        self.ensure_live()?;
        let moved = editor::move_item(&mut self.itinerary.days, action);

        Ok(self.edited(moved))
    }

    pub fn split_day(&mut self, day_id: &str) -> Result<Option<(String, String)>> {
        self.ensure_live()?;
        let ids = editor::split_day(&mut self.itinerary.days, day_id);
        self.edited(ids.is_some());

        Ok(ids)
    }

    /// Folds the following day into `day_id`. Unknown days are not found; the last day
    /// has nothing to merge with.
    pub fn merge_with_next(&mut self, day_id: &str) -> Result<()> {
        self.ensure_live()?;
        let days = &self.itinerary.days;
        match days.iter().position(|day| day.id == day_id) {
            None => return Err(Error::NotFound),
            Some(i) if i + 1 == days.len() => {
                tripweave_shared::user!("The last day has no following day to merge with")
            }
            Some(_) => {}
        }

        let merged = editor::merge_with_next(&mut self.itinerary.days, day_id);
        self.edited(merged);

        Ok(())
    }

    pub fn refresh_summary(&mut self, day_id: &str) -> Result<Option<DaySummary>> {
        self.ensure_live()?;
        let summary =
            editor::refresh_summary(&mut self.itinerary.days, day_id, self.options.cost_per_km);
        self.touch_if(summary.is_some());

        Ok(summary)
    }

    fn edited(&mut self, changed: bool) -> bool {
        if changed {
            self.itinerary.days_edited = true;
        }
        self.touch_if(changed)
    }

    // Sharing

    /// Local change only; persisted by the next save.
    pub fn update_share_settings(&mut self, is_public: bool, share_slug: Option<String>) -> Result<()> {
        self.ensure_live()?;

        if is_public {
            let slug = match share_slug {
                Some(slug) => {
                    validate_slug(&slug)?;
                    slug
                }
                None => match self.itinerary.share_slug.take() {
                    Some(existing) => existing,
                    None => generate_share_slug(&self.itinerary.title),
                },
            };
            self.itinerary.share_slug = Some(slug);
        } else {
            self.itinerary.share_slug = None;
        }

        self.itinerary.is_public = is_public;
        self.touch();

        Ok(())
    }

    // Persistence

    pub fn prepare_save(&self) -> Result<SaveRequest> {
        self.ensure_live()?;

        Ok(SaveRequest {
            revision: self.revision,
            itinerary: self.itinerary.clone(),
        })
    }

    /// Adopts the stored id and timestamps. Stays dirty when edits landed after `revision`.
    pub fn complete_save(&mut self, revision: u64, persisted: Persisted) {
        if self.deleted {
            return;
        }

        if self.itinerary.id.is_none() {
            self.itinerary.id = Some(persisted.id);
        }
        self.itinerary.created_at = Some(persisted.created_at);
        self.itinerary.updated_at = Some(persisted.updated_at);

        if revision == self.revision {
            self.dirty = false;
        }
    }

    /// Creates the itinerary on first save and updates it afterwards.
    pub async fn save(&mut self, repository: &dyn ItineraryRepository) -> Result<Persisted> {
        let request = self.prepare_save()?;
        let persisted = persist(repository, &request).await?;
        self.complete_save(request.revision, persisted.clone());

        Ok(persisted)
    }

    pub async fn delete(&mut self, repository: &dyn ItineraryRepository) -> Result<bool> {
        self.ensure_live()?;

        let existed = match self.itinerary.id.as_deref() {
            Some(id) => repository.delete(id).await?,
            None => false,
        };
        self.deleted = true;
        self.pending_route = None;
        self.pending_optimize = None;
        self.pending_geocodes.clear();

        Ok(existed)
    }
}

/// Writes a snapshot: create when it has no id yet, update otherwise.
pub async fn persist(
    repository: &dyn ItineraryRepository,
    request: &SaveRequest,
) -> Result<Persisted> {
    match request.itinerary.id {
        Some(_) => repository.update(&request.itinerary).await,
        None => repository.create(&request.itinerary).await,
    }
}

static RE_SHARE_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{2,79}$").unwrap());

fn validate_slug(slug: &str) -> Result<()> {
    if !RE_SHARE_SLUG.is_match(slug) {
        tripweave_shared::user!(
            "Share links may only use lowercase letters, digits and dashes (3 to 80 characters)"
        );
    }

    Ok(())
}
