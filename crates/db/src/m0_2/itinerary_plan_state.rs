use sea_query::{ColumnDef, Table, TableAlterStatement};

use crate::table::Itinerary;

async fn execute(
    connection: &mut sqlx::SqliteConnection,
    statement: TableAlterStatement,
) -> Result<(), sqlx_migrator::Error> {
    let statement = statement.to_string(sea_query::SqliteQueryBuilder);
    sqlx::query(&statement).execute(connection).await?;

    Ok(())
}

fn drop_column(column: Itinerary) -> TableAlterStatement {
    Table::alter()
        .table(Itinerary::Table)
        .drop_column(column)
        .to_owned()
}

/// Trip start date the day plans are dated from.
pub struct AddStartDate;

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for AddStartDate {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = Table::alter()
            .table(Itinerary::Table)
            .add_column(
                ColumnDef::new(Itinerary::StartDate)
                    .string()
                    .null()
                    .string_len(10),
            )
            .to_owned();

        execute(connection, statement).await
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        execute(connection, drop_column(Itinerary::StartDate)).await
    }
}

/// Whether the stored day plans were edited since they were last derived.
pub struct AddDaysEdited;

#[async_trait::async_trait]
impl sqlx_migrator::Operation<sqlx::Sqlite> for AddDaysEdited {
    async fn up(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        let statement = Table::alter()
            .table(Itinerary::Table)
            .add_column(
                ColumnDef::new(Itinerary::DaysEdited)
                    .boolean()
                    .not_null()
                    .default(false),
            )
            .to_owned();

        execute(connection, statement).await
    }

    async fn down(
        &self,
        connection: &mut sqlx::SqliteConnection,
    ) -> Result<(), sqlx_migrator::Error> {
        execute(connection, drop_column(Itinerary::DaysEdited)).await
    }
}
