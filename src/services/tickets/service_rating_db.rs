use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Integer, Nullable, SmallInt};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::Result;
use crate::schema::service_ratings;
use crate::snowflake::Snowflake;

/// Ratings are `1..=5` by convention, validating the range is up to the caller
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS service_ratings(
    "guild_id" int8 NOT NULL,
    "ticket_id" int4 NOT NULL,
    "rating" int2 NOT NULL,
    FOREIGN KEY("guild_id", "ticket_id") REFERENCES tickets("guild_id", "id"),
    PRIMARY KEY("guild_id", "ticket_id")
);
CREATE INDEX IF NOT EXISTS service_ratings_guild_id ON service_ratings("guild_id");
"#;

#[derive(QueryableByName)]
struct Average {
    #[diesel(sql_type = Nullable<Double>)]
    average: Option<f64>,
}

pub async fn get(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
) -> Result<Option<i16>> {
    Ok(service_ratings::table
        .find((guild_id, ticket_id))
        .select(service_ratings::rating)
        .first(db)
        .await
        .optional()?)
}

pub async fn set(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
    rating: i16,
) -> Result<()> {
    diesel::sql_query(
        r#"
INSERT INTO service_ratings("guild_id", "ticket_id", "rating")
VALUES($1, $2, $3)
ON CONFLICT("guild_id", "ticket_id") DO UPDATE SET "rating" = $3;"#,
    )
    .bind::<BigInt, _>(guild_id)
    .bind::<Integer, _>(ticket_id)
    .bind::<SmallInt, _>(rating)
    .execute(db)
    .await?;
    Ok(())
}

/// Mean rating across the guild, [`None`] when nothing has been rated
pub async fn get_average(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<Option<f64>> {
    let row = diesel::sql_query(
        r#"SELECT AVG("rating")::float8 AS average FROM service_ratings WHERE "guild_id" = $1;"#,
    )
    .bind::<BigInt, _>(guild_id)
    .get_result::<Average>(db)
    .await?;
    Ok(row.average)
}

/// Mean rating of the tickets claimed by `user_id`
pub async fn get_average_claimed_by(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
) -> Result<Option<f64>> {
    let row = diesel::sql_query(
        r#"
SELECT AVG(service_ratings.rating)::float8 AS average
FROM service_ratings
INNER JOIN ticket_claims
    ON service_ratings.guild_id = ticket_claims.guild_id
    AND service_ratings.ticket_id = ticket_claims.ticket_id
WHERE service_ratings.guild_id = $1 AND ticket_claims.user_id = $2;"#,
    )
    .bind::<BigInt, _>(guild_id)
    .bind::<BigInt, _>(user_id)
    .get_result::<Average>(db)
    .await?;
    Ok(row.average)
}

pub async fn get_count(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<i64> {
    Ok(service_ratings::table
        .filter(service_ratings::guild_id.eq(guild_id))
        .count()
        .get_result(db)
        .await?)
}
