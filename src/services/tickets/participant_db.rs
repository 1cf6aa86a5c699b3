use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::Result;
use crate::schema::ticket_members;
use crate::snowflake::Snowflake;

/// Users added to a ticket besides the one who opened it
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ticket_members(
    "guild_id" int8 NOT NULL,
    "ticket_id" int4 NOT NULL,
    "user_id" int8 NOT NULL,
    FOREIGN KEY("guild_id", "ticket_id") REFERENCES tickets("guild_id", "id"),
    PRIMARY KEY("guild_id", "ticket_id", "user_id")
);
CREATE INDEX IF NOT EXISTS ticket_members_guild_id_user_id ON ticket_members("guild_id", "user_id");
"#;

/// Adds `user_id` to the ticket. The opener is never stored, adding them is a no op.
pub async fn add(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
    user_id: Snowflake,
) -> Result<()> {
    diesel::sql_query(
        r#"
INSERT INTO ticket_members("guild_id", "ticket_id", "user_id")
SELECT $1, $2, $3
WHERE NOT EXISTS (
    SELECT 1 FROM tickets WHERE "guild_id" = $1 AND "id" = $2 AND "user_id" = $3
)
ON CONFLICT DO NOTHING;"#,
    )
    .bind::<BigInt, _>(guild_id)
    .bind::<Integer, _>(ticket_id)
    .bind::<BigInt, _>(user_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn get(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
) -> Result<Vec<Snowflake>> {
    Ok(ticket_members::table
        .filter(ticket_members::guild_id.eq(guild_id))
        .filter(ticket_members::ticket_id.eq(ticket_id))
        .order(ticket_members::user_id.asc())
        .select(ticket_members::user_id)
        .load(db)
        .await?)
}

/// Ids of every ticket in the guild the user has been added to
pub async fn get_tickets_for_user(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
) -> Result<Vec<i32>> {
    Ok(ticket_members::table
        .filter(ticket_members::guild_id.eq(guild_id))
        .filter(ticket_members::user_id.eq(user_id))
        .order(ticket_members::ticket_id.asc())
        .select(ticket_members::ticket_id)
        .load(db)
        .await?)
}

pub async fn delete(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
    user_id: Snowflake,
) -> Result<()> {
    diesel::delete(ticket_members::table.find((guild_id, ticket_id, user_id)))
        .execute(db)
        .await?;
    Ok(())
}
