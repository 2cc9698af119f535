//! In-memory edits of a day-plan sequence.
//!
//! Unknown day or item ids turn an operation into a no-op. Nothing here touches
//! persistence; callers mark the itinerary dirty and save.

use serde::{Deserialize, Serialize};
use tripweave_shared::shift_date;

use crate::{DayItem, DayItemKind, DayItemPatch, DayPlan, DaySummary};

/// A drag-and-drop gesture, within one day or across two days.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MoveItem {
    pub source_day: String,
    pub source_index: usize,
    pub dest_day: String,
    pub dest_index: usize,
}

fn day_index(days: &[DayPlan], day_id: &str) -> Option<usize> {
    days.iter().position(|d| d.id == day_id)
}

/// Appends an empty item and returns its id.
pub fn add_item(days: &mut [DayPlan], day_id: &str, kind: DayItemKind) -> Option<String> {
    let day = days.iter_mut().find(|d| d.id == day_id)?;
    let item = DayItem::blank(kind);
    let id = item.id.to_owned();
    day.items.push(item);

    Some(id)
}

pub fn update_item(days: &mut [DayPlan], day_id: &str, item_id: &str, patch: DayItemPatch) -> bool {
    let Some(item) = days
        .iter_mut()
        .find(|d| d.id == day_id)
        .and_then(|d| d.items.iter_mut().find(|i| i.id == item_id))
    else {
        return false;
    };

    item.apply(patch);

    true
}

/// Deletes an item. The day summary is left as is.
pub fn remove_item(days: &mut [DayPlan], day_id: &str, item_id: &str) -> Option<DayItem> {
    let day = days.iter_mut().find(|d| d.id == day_id)?;
    let pos = day.items.iter().position(|i| i.id == item_id)?;

    Some(day.items.remove(pos))
}

/// Moves one item, keeping every other item's relative order.
///
/// The destination index is clamped to the destination list, so dropping past the end
/// appends. Both days are checked before anything is removed.
pub fn move_item(days: &mut [DayPlan], action: &MoveItem) -> bool {
    let (Some(source), Some(dest)) = (
        day_index(days, &action.source_day),
        day_index(days, &action.dest_day),
    ) else {
        return false;
    };

    if action.source_index >= days[source].items.len() {
        return false;
    }

    let item = days[source].items.remove(action.source_index);
    let items = &mut days[dest].items;
    let at = action.dest_index.min(items.len());
    items.insert(at, item);

    true
}

/// Replaces a day with two halves split at `floor(n / 2)`.
///
/// Both halves get fresh ids and half of the cached summary. The second half is dated the
/// next calendar day. Returns the ids of the two new days.
pub fn split_day(days: &mut Vec<DayPlan>, day_id: &str) -> Option<(String, String)> {
    let pos = day_index(days, day_id)?;
    let original = days.remove(pos);

    let mut items = original.items;
    let second_items = items.split_off(items.len() / 2);
    let summary = original.summary.halved();

    let first = DayPlan {
        id: crate::new_id(),
        date: original.date.to_owned(),
        items,
        summary,
    };
    let second = DayPlan {
        id: crate::new_id(),
        date: original.date.as_deref().and_then(|d| shift_date(d, 1)),
        items: second_items,
        summary,
    };
    let ids = (first.id.to_owned(), second.id.to_owned());

    days.splice(pos..pos, [first, second]);

    Some(ids)
}

/// Folds the following day into `day_id`. No-op on the last day.
pub fn merge_with_next(days: &mut Vec<DayPlan>, day_id: &str) -> bool {
    let Some(pos) = day_index(days, day_id) else {
        return false;
    };

    if pos + 1 >= days.len() {
        return false;
    }

    let next = days.remove(pos + 1);
    let day = &mut days[pos];
    day.items.extend(next.items);
    day.summary = day.summary + next.summary;

    true
}

/// Recomputes a day's cached summary from its items.
///
/// Distance and duration come from drive legs; cost is the driving cost plus every item's
/// own cost. Only runs when asked to.
pub fn refresh_summary(days: &mut [DayPlan], day_id: &str, cost_per_km: f64) -> Option<DaySummary> {
    let day = days.iter_mut().find(|d| d.id == day_id)?;

    let (distance_km, duration_min) = day
        .items
        .iter()
        .filter(|i| i.kind == DayItemKind::DriveLeg)
        .fold((0.0, 0.0), |(km, min), i| {
            (
                km + i.distance_km.unwrap_or_default(),
                min + i.duration_min.unwrap_or_default(),
            )
        });
    let item_costs = day.items.iter().filter_map(|i| i.cost).sum::<f64>();

    day.summary = DaySummary {
        distance_km,
        duration_min,
        estimated_cost: distance_km * cost_per_km + item_costs,
    };

    Some(day.summary)
}
