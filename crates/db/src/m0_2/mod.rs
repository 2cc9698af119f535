mod itinerary_plan_state;

use sqlx_migrator::vec_box;

pub struct Migration;

sqlx_migrator::sqlite_migration!(
    Migration,
    "tripweave",
    "m0_2",
    vec_box![crate::m0_1::Migration],
    vec_box![
        itinerary_plan_state::AddStartDate,
        itinerary_plan_state::AddDaysEdited,
    ]
);
