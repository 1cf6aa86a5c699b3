use chrono::TimeDelta;
use diesel::pg::data_types::PgInterval;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::Result;
use crate::interval::{from_interval, to_interval};
use crate::schema::first_response_time;
use crate::snowflake::Snowflake;

/// Time between a ticket opening and the first staff reply, feeds
/// `first_response_time_guild_view`
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS first_response_time(
    "guild_id" int8 NOT NULL,
    "ticket_id" int4 NOT NULL,
    "user_id" int8 NOT NULL,
    "response_time" interval NOT NULL,
    FOREIGN KEY("guild_id", "ticket_id") REFERENCES tickets("guild_id", "id"),
    PRIMARY KEY("guild_id", "ticket_id")
);
"#;

/// Only the first response counts, later calls for the same ticket are ignored
pub async fn set(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
    user_id: Snowflake,
    response_time: TimeDelta,
) -> Result<()> {
    diesel::insert_into(first_response_time::table)
        .values((
            first_response_time::guild_id.eq(guild_id),
            first_response_time::ticket_id.eq(ticket_id),
            first_response_time::user_id.eq(user_id),
            first_response_time::response_time.eq(to_interval(response_time)?),
        ))
        .on_conflict_do_nothing()
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
) -> Result<Option<(Snowflake, TimeDelta)>> {
    Ok(first_response_time::table
        .find((guild_id, ticket_id))
        .select((first_response_time::user_id, first_response_time::response_time))
        .first::<(Snowflake, PgInterval)>(db)
        .await
        .optional()?
        .map(|(user_id, interval)| (user_id, from_interval(interval))))
}
