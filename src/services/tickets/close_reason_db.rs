use std::collections::HashMap;

use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::close_reason;
use crate::snowflake::Snowflake;

pub const MAX_REASON_LENGTH: usize = 1024;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS close_reason(
    "guild_id" int8 NOT NULL,
    "ticket_id" int4 NOT NULL,
    "close_reason" text,
    "closed_by" int8,
    FOREIGN KEY("guild_id", "ticket_id") REFERENCES tickets("guild_id", "id"),
    PRIMARY KEY("guild_id", "ticket_id")
);
"#;

#[derive(Debug, Clone, Default, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = close_reason)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CloseMetadata {
    pub reason: Option<String>,
    pub closed_by: Option<Snowflake>,
}

pub async fn get(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
) -> Result<Option<CloseMetadata>> {
    Ok(close_reason::table
        .find((guild_id, ticket_id))
        .select(CloseMetadata::as_select())
        .first(db)
        .await
        .optional()?)
}

/// Close metadata for several tickets of one guild, keyed by ticket id
pub async fn get_multiple(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_ids: &[i32],
) -> Result<HashMap<i32, CloseMetadata>> {
    if ticket_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, CloseMetadata)> = close_reason::table
        .filter(close_reason::guild_id.eq(guild_id))
        .filter(close_reason::ticket_id.eq_any(ticket_ids))
        .select((close_reason::ticket_id, CloseMetadata::as_select()))
        .load(db)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Stores why the ticket was closed, the reason is cut to [`MAX_REASON_LENGTH`] characters
pub async fn set(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
    metadata: CloseMetadata,
) -> Result<()> {
    let reason = metadata
        .reason
        .map(|r| r.chars().take(MAX_REASON_LENGTH).collect::<String>());
    diesel::insert_into(close_reason::table)
        .values((
            close_reason::guild_id.eq(guild_id),
            close_reason::ticket_id.eq(ticket_id),
            close_reason::reason.eq(reason),
            close_reason::closed_by.eq(metadata.closed_by),
        ))
        .on_conflict((close_reason::guild_id, close_reason::ticket_id))
        .do_update()
        .set((
            close_reason::reason.eq(excluded(close_reason::reason)),
            close_reason::closed_by.eq(excluded(close_reason::closed_by)),
        ))
        .execute(db)
        .await?;
    Ok(())
}
