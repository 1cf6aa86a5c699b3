use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::{whitelabel, whitelabel_errors, whitelabel_guilds};
use crate::snowflake::Snowflake;

/// Custom bots run on behalf of whitelabel subscribers. One bot per user, the guilds it serves
/// and the errors it ran into.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS whitelabel(
    "user_id" int8 NOT NULL UNIQUE,
    "bot_id" int8 NOT NULL UNIQUE,
    "token" text NOT NULL UNIQUE,
    "public_key" varchar(64) NOT NULL,
    PRIMARY KEY("user_id")
);
CREATE TABLE IF NOT EXISTS whitelabel_guilds(
    "bot_id" int8 NOT NULL REFERENCES whitelabel("bot_id") ON DELETE CASCADE ON UPDATE CASCADE,
    "guild_id" int8 NOT NULL,
    PRIMARY KEY("bot_id", "guild_id")
);
CREATE INDEX IF NOT EXISTS whitelabel_guilds_guild_id ON whitelabel_guilds("guild_id");
CREATE TABLE IF NOT EXISTS whitelabel_errors(
    "id" SERIAL NOT NULL UNIQUE,
    "user_id" int8 NOT NULL REFERENCES whitelabel("user_id") ON DELETE CASCADE,
    "error" varchar(255) NOT NULL,
    "error_time" timestamptz NOT NULL,
    PRIMARY KEY("id")
);
CREATE INDEX IF NOT EXISTS whitelabel_errors_user_id ON whitelabel_errors("user_id");
"#;

const MAX_ERROR_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = whitelabel)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WhitelabelBot {
    pub user_id: Snowflake,
    pub bot_id: Snowflake,
    #[serde(skip_serializing)]
    pub token: String,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = whitelabel_errors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WhitelabelError {
    pub error: String,
    pub error_time: DateTime<Utc>,
}

pub async fn get_by_user_id(
    db: &mut AsyncPgConnection,
    user_id: Snowflake,
) -> Result<Option<WhitelabelBot>> {
    Ok(whitelabel::table
        .find(user_id)
        .select(WhitelabelBot::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_by_bot_id(
    db: &mut AsyncPgConnection,
    bot_id: Snowflake,
) -> Result<Option<WhitelabelBot>> {
    Ok(whitelabel::table
        .filter(whitelabel::bot_id.eq(bot_id))
        .select(WhitelabelBot::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_by_token(
    db: &mut AsyncPgConnection,
    token: &str,
) -> Result<Option<WhitelabelBot>> {
    Ok(whitelabel::table
        .filter(whitelabel::token.eq(token))
        .select(WhitelabelBot::as_select())
        .first(db)
        .await
        .optional()?)
}

/// Stores the user's bot, replacing the one they had. Guild bindings follow a changed bot id.
pub async fn set(db: &mut AsyncPgConnection, bot: &WhitelabelBot) -> Result<()> {
    diesel::insert_into(whitelabel::table)
        .values(bot)
        .on_conflict(whitelabel::user_id)
        .do_update()
        .set((
            whitelabel::bot_id.eq(excluded(whitelabel::bot_id)),
            whitelabel::token.eq(excluded(whitelabel::token)),
            whitelabel::public_key.eq(excluded(whitelabel::public_key)),
        ))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: &mut AsyncPgConnection, user_id: Snowflake) -> Result<()> {
    diesel::delete(whitelabel::table.find(user_id))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn add_guild(
    db: &mut AsyncPgConnection,
    bot_id: Snowflake,
    guild_id: Snowflake,
) -> Result<()> {
    diesel::insert_into(whitelabel_guilds::table)
        .values((
            whitelabel_guilds::bot_id.eq(bot_id),
            whitelabel_guilds::guild_id.eq(guild_id),
        ))
        .on_conflict_do_nothing()
        .execute(db)
        .await?;
    Ok(())
}

pub async fn remove_guild(
    db: &mut AsyncPgConnection,
    bot_id: Snowflake,
    guild_id: Snowflake,
) -> Result<()> {
    diesel::delete(whitelabel_guilds::table.find((bot_id, guild_id)))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_guilds(db: &mut AsyncPgConnection, bot_id: Snowflake) -> Result<Vec<Snowflake>> {
    Ok(whitelabel_guilds::table
        .filter(whitelabel_guilds::bot_id.eq(bot_id))
        .order(whitelabel_guilds::guild_id.asc())
        .select(whitelabel_guilds::guild_id)
        .load(db)
        .await?)
}

/// The whitelabel bot serving the guild, if any
pub async fn get_bot_by_guild(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
) -> Result<Option<Snowflake>> {
    Ok(whitelabel_guilds::table
        .filter(whitelabel_guilds::guild_id.eq(guild_id))
        .select(whitelabel_guilds::bot_id)
        .first(db)
        .await
        .optional()?)
}

/// Records an error for the user's bot, truncated to fit the column
pub async fn append_error(
    db: &mut AsyncPgConnection,
    user_id: Snowflake,
    error: &str,
) -> Result<()> {
    let error: String = error.chars().take(MAX_ERROR_LENGTH).collect();
    diesel::insert_into(whitelabel_errors::table)
        .values((
            whitelabel_errors::user_id.eq(user_id),
            whitelabel_errors::error.eq(error),
            whitelabel_errors::error_time.eq(diesel::dsl::now),
        ))
        .execute(db)
        .await?;
    Ok(())
}

/// The user's `limit` latest errors, newest first
pub async fn get_recent_errors(
    db: &mut AsyncPgConnection,
    user_id: Snowflake,
    limit: i64,
) -> Result<Vec<WhitelabelError>> {
    Ok(whitelabel_errors::table
        .filter(whitelabel_errors::user_id.eq(user_id))
        .order((whitelabel_errors::error_time.desc(), whitelabel_errors::id.desc()))
        .limit(limit)
        .select(WhitelabelError::as_select())
        .load(db)
        .await?)
}
