use sea_query::Iden;

#[derive(Iden, Clone, Copy)]
pub enum Itinerary {
    Table,
    Id,
    UserId,
    Title,
    Waypoints,
    Days,
    RouteSummary,
    StartDate,
    DaysEdited,
    IsPublic,
    ShareSlug,
    CreatedAt,
    UpdatedAt,
}
