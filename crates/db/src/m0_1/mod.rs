mod itinerary;

use sqlx_migrator::vec_box;

pub struct Migration;

sqlx_migrator::sqlite_migration!(
    Migration,
    "tripweave",
    "m0_1",
    vec_box![],
    vec_box![
        itinerary::CreateTable,
        itinerary::CreateUserIdx,
        itinerary::CreateShareSlugIdx,
    ]
);
