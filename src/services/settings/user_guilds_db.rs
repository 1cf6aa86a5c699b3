use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::user_guilds;
use crate::snowflake::Snowflake;

/// Guilds each dashboard user belongs to, cached from the chat platform at login
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user_guilds(
    "user_id" int8 NOT NULL,
    "guild_id" int8 NOT NULL,
    "is_owner" bool NOT NULL,
    "permissions" int8 NOT NULL,
    PRIMARY KEY("user_id", "guild_id")
);
"#;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = user_guilds)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserGuild {
    pub guild_id: Snowflake,
    pub is_owner: bool,
    /// Permission bitfield the user holds in the guild
    pub permissions: i64,
}

pub async fn get(db: &mut AsyncPgConnection, user_id: Snowflake) -> Result<Vec<UserGuild>> {
    Ok(user_guilds::table
        .filter(user_guilds::user_id.eq(user_id))
        .order(user_guilds::guild_id.asc())
        .select(UserGuild::as_select())
        .load(db)
        .await?)
}

/// Replaces the user's guild list. Call from within a transaction so readers never see the
/// list empty.
pub async fn set(
    tx: &mut AsyncPgConnection,
    user_id: Snowflake,
    guilds: &[UserGuild],
) -> Result<()> {
    diesel::delete(user_guilds::table.filter(user_guilds::user_id.eq(user_id)))
        .execute(tx)
        .await?;
    if guilds.is_empty() {
        return Ok(());
    }
    let rows: Vec<_> = guilds
        .iter()
        .map(|guild| {
            (
                user_guilds::user_id.eq(user_id),
                user_guilds::guild_id.eq(guild.guild_id),
                user_guilds::is_owner.eq(guild.is_owner),
                user_guilds::permissions.eq(guild.permissions),
            )
        })
        .collect();
    diesel::insert_into(user_guilds::table)
        .values(rows)
        .on_conflict_do_nothing()
        .execute(tx)
        .await?;
    Ok(())
}
