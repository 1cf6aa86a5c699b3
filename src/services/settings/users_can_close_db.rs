use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::Result;
use crate::schema::users_can_close;
use crate::snowflake::Snowflake;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users_can_close(
    "guild_id" int8 NOT NULL UNIQUE,
    "users_can_close" bool NOT NULL,
    PRIMARY KEY("guild_id")
);
"#;

/// Whether ticket openers may close their own tickets, `true` unless the guild turned it off
pub async fn get(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<bool> {
    Ok(users_can_close::table
        .find(guild_id)
        .select(users_can_close::can_close)
        .first(db)
        .await
        .optional()?
        .unwrap_or(true))
}

pub async fn set(db: &mut AsyncPgConnection, guild_id: Snowflake, can_close: bool) -> Result<()> {
    diesel::insert_into(users_can_close::table)
        .values((
            users_can_close::guild_id.eq(guild_id),
            users_can_close::can_close.eq(can_close),
        ))
        .on_conflict(users_can_close::guild_id)
        .do_update()
        .set(users_can_close::can_close.eq(can_close))
        .execute(db)
        .await?;
    Ok(())
}
