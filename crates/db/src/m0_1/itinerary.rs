use sea_query::{
    ColumnDef, Index, IndexCreateStatement, IndexDropStatement, Table, TableCreateStatement,
    TableDropStatement,
};

use crate::table::Itinerary;

pub struct CreateTable;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(Itinerary::Table)
        .col(
            ColumnDef::new(Itinerary::Id)
                .string()
                .not_null()
                .string_len(26)
                .primary_key(),
        )
        .col(
            ColumnDef::new(Itinerary::UserId)
                .string()
                .not_null()
                .string_len(64),
        )
        .col(
            ColumnDef::new(Itinerary::Title)
                .string()
                .not_null()
                .string_len(200)
                .default(""),
        )
        .col(ColumnDef::new(Itinerary::Waypoints).text().not_null())
        .col(ColumnDef::new(Itinerary::Days).text().not_null())
        .col(ColumnDef::new(Itinerary::RouteSummary).text().null())
        .col(
            ColumnDef::new(Itinerary::IsPublic)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(Itinerary::ShareSlug)
                .string()
                .null()
                .string_len(80),
        )
        .col(ColumnDef::new(Itinerary::CreatedAt).big_integer().not_null())
        .col(ColumnDef::new(Itinerary::UpdatedAt).big_integer().not_null())
        .to_owned()
}

fn drop_table() -> TableDropStatement {
    Table::drop().table(Itinerary::Table).to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateTable {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_table().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_table().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}

pub struct CreateUserIdx;

fn create_user_idx() -> IndexCreateStatement {
    Index::create()
        .name("idx_itinerary_user_id")
        .table(Itinerary::Table)
        .col(Itinerary::UserId)
        .col(Itinerary::UpdatedAt)
        .to_owned()
}

fn drop_user_idx() -> IndexDropStatement {
    Index::drop()
        .name("idx_itinerary_user_id")
        .table(Itinerary::Table)
        .to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateUserIdx {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_user_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_user_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}

/// Share slugs must be unique across public itineraries; NULL slugs never collide.
pub struct CreateShareSlugIdx;

fn create_share_slug_idx() -> IndexCreateStatement {
    Index::create()
        .name("idx_itinerary_share_slug")
        .table(Itinerary::Table)
        .unique()
        .col(Itinerary::ShareSlug)
        .to_owned()
}

fn drop_share_slug_idx() -> IndexDropStatement {
    Index::drop()
        .name("idx_itinerary_share_slug")
        .table(Itinerary::Table)
        .to_owned()
}

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for CreateShareSlugIdx {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = create_share_slug_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = drop_share_slug_idx().to_string(sea_query::SqliteQueryBuilder);
        sqlx::query(&statement).execute(connection).await?;

        Ok(())
    }
}
