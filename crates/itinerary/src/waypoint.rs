use serde::{Deserialize, Serialize};
use tripweave_shared::{Error, Result, ServiceError};

use crate::{Coordinates, Waypoint, WaypointRole};

pub const MAX_INTERMEDIATES: usize = 10;

/// Route stops in effective order: exactly one `start` first, exactly one `end` last,
/// intermediates in between.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "Vec<Waypoint>", into = "Vec<Waypoint>")]
pub struct WaypointList(Vec<Waypoint>);

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct WaypointPatch {
    pub name: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub address: Option<String>,
    pub place_id: Option<String>,
}

impl Default for WaypointList {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<Waypoint>> for WaypointList {
    type Error = String;

    fn try_from(value: Vec<Waypoint>) -> std::result::Result<Self, Self::Error> {
        let starts = value
            .iter()
            .filter(|w| w.role == WaypointRole::Start)
            .count();
        let ends = value.iter().filter(|w| w.role == WaypointRole::End).count();

        if starts != 1 || ends != 1 {
            return Err(format!(
                "expected exactly one start and one end waypoint, got {starts} start and {ends} end"
            ));
        }

        if value.first().map(|w| w.role) != Some(WaypointRole::Start)
            || value.last().map(|w| w.role) != Some(WaypointRole::End)
        {
            return Err("start must be first and end must be last".to_owned());
        }

        if value.len() - 2 > MAX_INTERMEDIATES {
            return Err(format!("at most {MAX_INTERMEDIATES} stops are allowed"));
        }

        Ok(Self(value))
    }
}

impl From<WaypointList> for Vec<Waypoint> {
    fn from(value: WaypointList) -> Self {
        value.0
    }
}

impl WaypointList {
    /// Two unresolved endpoints and nothing in between.
    pub fn new() -> Self {
        Self(vec![
            Waypoint::unresolved(WaypointRole::Start),
            Waypoint::unresolved(WaypointRole::End),
        ])
    }

    pub fn with_endpoints(
        start: (impl Into<String>, Coordinates),
        end: (impl Into<String>, Coordinates),
    ) -> Self {
        Self(vec![
            Waypoint::new(WaypointRole::Start, start.0, start.1),
            Waypoint::new(WaypointRole::End, end.0, end.1),
        ])
    }

    pub fn as_slice(&self) -> &[Waypoint] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn start(&self) -> &Waypoint {
        &self.0[0]
    }

    pub fn end(&self) -> &Waypoint {
        &self.0[self.0.len() - 1]
    }

    pub fn intermediates(&self) -> &[Waypoint] {
        &self.0[1..self.0.len() - 1]
    }

    pub fn get(&self, id: &str) -> Option<&Waypoint> {
        self.0.iter().find(|w| w.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|w| w.id == id)
    }

    /// Inserts a stop just before the end waypoint and returns its id.
    pub fn add_intermediate(
        &mut self,
        name: impl Into<String>,
        coordinates: Coordinates,
    ) -> Result<String> {
        if self.intermediates().len() >= MAX_INTERMEDIATES {
            tripweave_shared::user!("A route can have at most {MAX_INTERMEDIATES} stops");
        }

        let waypoint = Waypoint::new(WaypointRole::Intermediate, name, coordinates);
        let id = waypoint.id.to_owned();
        let at = self.0.len() - 1;
        self.0.insert(at, waypoint);

        Ok(id)
    }

    pub fn update(&mut self, id: &str, patch: WaypointPatch) -> bool {
        let Some(waypoint) = self.0.iter_mut().find(|w| w.id == id) else {
            return false;
        };

        if let Some(name) = patch.name {
            waypoint.name = name;
        }
        if let Some(coordinates) = patch.coordinates {
            waypoint.coordinates = coordinates;
        }
        if let Some(address) = patch.address {
            waypoint.address = Some(address);
        }
        if let Some(place_id) = patch.place_id {
            waypoint.place_id = Some(place_id);
        }

        true
    }

    /// Removes an intermediate stop. Endpoints cannot disappear, they are reset instead.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };

        match self.0[pos].role {
            WaypointRole::Intermediate => {
                self.0.remove(pos);
            }
            role => {
                let mut blank = Waypoint::unresolved(role);
                blank.id = self.0[pos].id.to_owned();
                self.0[pos] = blank;
            }
        }

        true
    }

    /// Moves an intermediate from one intermediate index to another.
    pub fn move_intermediate(&mut self, from: usize, to: usize) -> bool {
        let count = self.intermediates().len();
        if from >= count || to >= count {
            return false;
        }

        let waypoint = self.0.remove(from + 1);
        self.0.insert(to + 1, waypoint);

        true
    }

    /// Reorders intermediates so that the new i-th stop is the old `order[i]`-th.
    pub fn reorder_intermediates(&mut self, order: &[usize]) -> Result<()> {
        let intermediates = self.intermediates();
        validate_permutation(intermediates.len(), order)?;

        let reordered = order
            .iter()
            .map(|&i| intermediates[i].clone())
            .collect::<Vec<_>>();
        let end = self.0.len() - 1;
        self.0.splice(1..end, reordered);

        Ok(())
    }

    pub fn resolved(&self) -> impl Iterator<Item = &Waypoint> {
        self.0.iter().filter(|w| w.is_resolved())
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved().count()
    }

    pub fn route_coordinates(&self) -> Vec<Coordinates> {
        self.resolved().map(|w| w.coordinates).collect()
    }

    /// Checks the list can be sent to a directions provider.
    pub fn validate_for_route(&self) -> Result<()> {
        if !self.start().is_resolved() {
            tripweave_shared::user!("Please set a starting location");
        }

        if !self.end().is_resolved() {
            tripweave_shared::user!("Please set a destination");
        }

        if self.resolved_count() < 2 {
            tripweave_shared::user!("At least two locations are required");
        }

        Ok(())
    }
}

/// `order` must hold each index in `0..len` exactly once.
pub fn validate_permutation(len: usize, order: &[usize]) -> Result<()> {
    if order.len() != len {
        return Err(Error::Service(ServiceError::Malformed(format!(
            "expected an ordering of {len} stops, got {}",
            order.len()
        ))));
    }

    let mut seen = vec![false; len];
    for &i in order {
        if i >= len || seen[i] {
            return Err(Error::Service(ServiceError::Malformed(format!(
                "invalid stop index {i} in ordering"
            ))));
        }
        seen[i] = true;
    }

    Ok(())
}
