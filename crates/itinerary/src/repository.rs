use sea_query::{Expr, ExprTrait, Order, Query, SqliteQueryBuilder};
use sea_query_sqlx::SqlxBinder;
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use tripweave_db::table::Itinerary as ItineraryTable;
use tripweave_shared::{Error, Result, State};

use crate::{
    DayPlan, Itinerary, ItineraryRepository, ItinerarySummary, Persisted, RouteSummary,
    WaypointList,
};

#[derive(Debug, FromRow)]
struct ItineraryRow {
    id: String,
    user_id: String,
    title: String,
    waypoints: Json<WaypointList>,
    days: Json<Vec<DayPlan>>,
    route_summary: Option<Json<RouteSummary>>,
    start_date: Option<String>,
    days_edited: bool,
    is_public: bool,
    share_slug: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl From<ItineraryRow> for Itinerary {
    fn from(row: ItineraryRow) -> Self {
        Self {
            id: Some(row.id),
            user_id: row.user_id,
            title: row.title,
            waypoints: row.waypoints.0,
            days: row.days.0,
            route_summary: row.route_summary.map(|r| r.0),
            start_date: row.start_date,
            days_edited: row.days_edited,
            is_public: row.is_public,
            share_slug: row.share_slug,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: String,
    title: String,
    is_public: bool,
    share_slug: Option<String>,
    created_at: i64,
    updated_at: i64,
}

const COLUMNS: [ItineraryTable; 12] = [
    ItineraryTable::Id,
    ItineraryTable::UserId,
    ItineraryTable::Title,
    ItineraryTable::Waypoints,
    ItineraryTable::Days,
    ItineraryTable::RouteSummary,
    ItineraryTable::StartDate,
    ItineraryTable::DaysEdited,
    ItineraryTable::IsPublic,
    ItineraryTable::ShareSlug,
    ItineraryTable::CreatedAt,
    ItineraryTable::UpdatedAt,
];

/// Itineraries in SQLite, one row each with JSON-encoded waypoints, days and route.
#[derive(Clone)]
pub struct SqliteRepository {
    state: State,
}

impl SqliteRepository {
    pub fn new(state: State) -> Self {
        Self { state }
    }

    async fn find_where(&self, condition: Expr) -> Result<Option<Itinerary>> {
        let statement = Query::select()
            .columns(COLUMNS)
            .from(ItineraryTable::Table)
            .and_where(condition)
            .limit(1)
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let row = sqlx::query_as_with::<_, ItineraryRow, _>(&sql, values)
            .fetch_optional(&self.state.read_db)
            .await?;

        Ok(row.map(Into::into))
    }
}

fn encode(itinerary: &Itinerary) -> Result<(String, String, Option<String>)> {
    let waypoints = serde_json::to_string(&itinerary.waypoints)?;
    let days = serde_json::to_string(&itinerary.days)?;
    let route_summary = itinerary
        .route_summary
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    Ok((waypoints, days, route_summary))
}

fn map_write_error(err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Conflict("This share link is already taken".to_owned())
        }
        err => err.into(),
    }
}

#[async_trait::async_trait]
impl ItineraryRepository for SqliteRepository {
    async fn create(&self, itinerary: &Itinerary) -> Result<Persisted> {
        let id = crate::new_id();
        let now = tripweave_shared::now_timestamp();
        let (waypoints, days, route_summary) = encode(itinerary)?;

        let statement = Query::insert()
            .into_table(ItineraryTable::Table)
            .columns(COLUMNS)
            .values_panic([
                id.to_owned().into(),
                itinerary.user_id.to_owned().into(),
                itinerary.title.to_owned().into(),
                waypoints.into(),
                days.into(),
                route_summary.into(),
                itinerary.start_date.to_owned().into(),
                itinerary.days_edited.into(),
                itinerary.is_public.into(),
                itinerary.public_slug().map(str::to_owned).into(),
                now.into(),
                now.into(),
            ])
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        sqlx::query_with(&sql, values)
            .execute(&self.state.write_db)
            .await
            .map_err(map_write_error)?;

        Ok(Persisted {
            id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(&self, itinerary: &Itinerary) -> Result<Persisted> {
        let Some(id) = itinerary.id.to_owned() else {
            return Err(Error::NotFound);
        };
        let now = tripweave_shared::now_timestamp();
        let (waypoints, days, route_summary) = encode(itinerary)?;

        let statement = Query::update()
            .table(ItineraryTable::Table)
            .values([
                (ItineraryTable::Title, itinerary.title.to_owned().into()),
                (ItineraryTable::Waypoints, waypoints.into()),
                (ItineraryTable::Days, days.into()),
                (ItineraryTable::RouteSummary, route_summary.into()),
                (ItineraryTable::StartDate, itinerary.start_date.to_owned().into()),
                (ItineraryTable::DaysEdited, itinerary.days_edited.into()),
                (ItineraryTable::IsPublic, itinerary.is_public.into()),
                (
                    ItineraryTable::ShareSlug,
                    itinerary.public_slug().map(str::to_owned).into(),
                ),
                (ItineraryTable::UpdatedAt, now.into()),
            ])
            .and_where(Expr::col(ItineraryTable::Id).eq(id.to_owned()))
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let result = sqlx::query_with(&sql, values)
            .execute(&self.state.write_db)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }

        Ok(Persisted {
            id,
            created_at: itinerary.created_at.unwrap_or(now),
            updated_at: now,
        })
    }

    async fn find(&self, id: &str) -> Result<Option<Itinerary>> {
        self.find_where(Expr::col(ItineraryTable::Id).eq(id))
            .await
    }

    async fn find_by_share_slug(&self, slug: &str) -> Result<Option<Itinerary>> {
        self.find_where(
            Expr::col(ItineraryTable::ShareSlug)
                .eq(slug)
                .and(Expr::col(ItineraryTable::IsPublic).eq(true)),
        )
        .await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<ItinerarySummary>> {
        let statement = Query::select()
            .columns([
                ItineraryTable::Id,
                ItineraryTable::Title,
                ItineraryTable::IsPublic,
                ItineraryTable::ShareSlug,
                ItineraryTable::CreatedAt,
                ItineraryTable::UpdatedAt,
            ])
            .from(ItineraryTable::Table)
            .and_where(Expr::col(ItineraryTable::UserId).eq(user_id))
            .order_by(ItineraryTable::UpdatedAt, Order::Desc)
            .order_by(ItineraryTable::Id, Order::Desc)
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let rows = sqlx::query_as_with::<_, SummaryRow, _>(&sql, values)
            .fetch_all(&self.state.read_db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ItinerarySummary {
                id: row.id,
                title: row.title,
                is_public: row.is_public,
                share_slug: row.share_slug,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let statement = Query::delete()
            .from_table(ItineraryTable::Table)
            .and_where(Expr::col(ItineraryTable::Id).eq(id))
            .to_owned();

        let (sql, values) = statement.build_sqlx(SqliteQueryBuilder);
        let result = sqlx::query_with(&sql, values)
            .execute(&self.state.write_db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
