use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::Result;
use crate::schema::{ticket_claims, tickets};
use crate::snowflake::Snowflake;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ticket_claims(
    "guild_id" int8 NOT NULL,
    "ticket_id" int4 NOT NULL,
    "user_id" int8 NOT NULL,
    FOREIGN KEY("guild_id", "ticket_id") REFERENCES tickets("guild_id", "id"),
    PRIMARY KEY("guild_id", "ticket_id")
);
CREATE INDEX IF NOT EXISTS ticket_claims_guild_id_user_id ON ticket_claims("guild_id", "user_id");
"#;

pub async fn get(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
) -> Result<Option<Snowflake>> {
    Ok(ticket_claims::table
        .find((guild_id, ticket_id))
        .select(ticket_claims::user_id)
        .first(db)
        .await
        .optional()?)
}

/// Claims the ticket, replacing any previous claimant
pub async fn set(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
    user_id: Snowflake,
) -> Result<()> {
    diesel::insert_into(ticket_claims::table)
        .values((
            ticket_claims::guild_id.eq(guild_id),
            ticket_claims::ticket_id.eq(ticket_id),
            ticket_claims::user_id.eq(user_id),
        ))
        .on_conflict((ticket_claims::guild_id, ticket_claims::ticket_id))
        .do_update()
        .set(ticket_claims::user_id.eq(excluded(ticket_claims::user_id)))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: &mut AsyncPgConnection, guild_id: Snowflake, ticket_id: i32) -> Result<()> {
    diesel::delete(ticket_claims::table.find((guild_id, ticket_id)))
        .execute(db)
        .await?;
    Ok(())
}

/// Open tickets the user currently holds a claim on
pub async fn get_claimed_count(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
) -> Result<i64> {
    Ok(ticket_claims::table
        .inner_join(
            tickets::table.on(tickets::guild_id
                .eq(ticket_claims::guild_id)
                .and(tickets::id.eq(ticket_claims::ticket_id))),
        )
        .filter(ticket_claims::guild_id.eq(guild_id))
        .filter(ticket_claims::user_id.eq(user_id))
        .filter(tickets::open.eq(true))
        .count()
        .get_result(db)
        .await?)
}
