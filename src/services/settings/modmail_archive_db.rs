use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::schema::modmail_archive;
use crate::snowflake::Snowflake;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS modmail_archive(
    "uuid" uuid NOT NULL UNIQUE,
    "guild_id" int8 NOT NULL,
    "user_id" int8 NOT NULL,
    "close_time" timestamptz NOT NULL,
    PRIMARY KEY("uuid")
);
CREATE INDEX IF NOT EXISTS modmail_archive_guild_id_user_id ON modmail_archive("guild_id", "user_id");
"#;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = modmail_archive)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ModmailArchive {
    pub uuid: Uuid,
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub close_time: DateTime<Utc>,
}

pub async fn get(db: &mut AsyncPgConnection, uuid: Uuid) -> Result<Option<ModmailArchive>> {
    Ok(modmail_archive::table
        .find(uuid)
        .select(ModmailArchive::as_select())
        .first(db)
        .await
        .optional()?)
}

/// Archived sessions of one user in a guild, newest first
pub async fn get_by_member(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
) -> Result<Vec<ModmailArchive>> {
    Ok(modmail_archive::table
        .filter(modmail_archive::guild_id.eq(guild_id))
        .filter(modmail_archive::user_id.eq(user_id))
        .order(modmail_archive::close_time.desc())
        .select(ModmailArchive::as_select())
        .load(db)
        .await?)
}

pub async fn set(db: &mut AsyncPgConnection, archive: &ModmailArchive) -> Result<()> {
    diesel::insert_into(modmail_archive::table)
        .values(archive)
        .on_conflict_do_nothing()
        .execute(db)
        .await?;
    Ok(())
}
