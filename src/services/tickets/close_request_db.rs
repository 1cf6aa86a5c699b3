use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::close_request;
use crate::snowflake::Snowflake;

pub const MAX_REASON_LENGTH: usize = 255;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS close_request(
    "guild_id" int8 NOT NULL,
    "ticket_id" int4 NOT NULL,
    "user_id" int8 NOT NULL,
    "message_id" int8,
    "close_at" timestamptz,
    "close_reason" varchar(255),
    FOREIGN KEY("guild_id", "ticket_id") REFERENCES tickets("guild_id", "id"),
    PRIMARY KEY("guild_id", "ticket_id")
);
CREATE INDEX IF NOT EXISTS close_request_close_at ON close_request("close_at");
"#;

/// A pending close, optionally scheduled for `close_at`
#[derive(
    Debug,
    Clone,
    PartialEq,
    Queryable,
    QueryableByName,
    Selectable,
    Insertable,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = close_request)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CloseRequest {
    pub guild_id: Snowflake,
    pub ticket_id: i32,
    pub user_id: Snowflake,
    pub message_id: Option<Snowflake>,
    pub close_at: Option<DateTime<Utc>>,
    pub close_reason: Option<String>,
}

pub async fn get(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
) -> Result<Option<CloseRequest>> {
    Ok(close_request::table
        .find((guild_id, ticket_id))
        .select(CloseRequest::as_select())
        .first(db)
        .await
        .optional()?)
}

/// Stores the request, the reason is cut to [`MAX_REASON_LENGTH`] characters
pub async fn set(db: &mut AsyncPgConnection, request: &CloseRequest) -> Result<()> {
    let request = CloseRequest {
        close_reason: request
            .close_reason
            .as_ref()
            .map(|r| r.chars().take(MAX_REASON_LENGTH).collect()),
        ..request.clone()
    };
    diesel::insert_into(close_request::table)
        .values(&request)
        .on_conflict((close_request::guild_id, close_request::ticket_id))
        .do_update()
        .set((
            close_request::user_id.eq(excluded(close_request::user_id)),
            close_request::message_id.eq(excluded(close_request::message_id)),
            close_request::close_at.eq(excluded(close_request::close_at)),
            close_request::close_reason.eq(excluded(close_request::close_reason)),
        ))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: &mut AsyncPgConnection, guild_id: Snowflake, ticket_id: i32) -> Result<()> {
    diesel::delete(close_request::table.find((guild_id, ticket_id)))
        .execute(db)
        .await?;
    Ok(())
}

/// Requests whose deadline has passed, on tickets which are still open and not excluded from
/// auto close
pub async fn get_closeable(db: &mut AsyncPgConnection) -> Result<Vec<CloseRequest>> {
    Ok(diesel::sql_query(
        r#"
SELECT close_request.*
FROM close_request
INNER JOIN tickets
    ON close_request.guild_id = tickets.guild_id AND close_request.ticket_id = tickets.id
LEFT OUTER JOIN auto_close_exclude
    ON close_request.guild_id = auto_close_exclude.guild_id
    AND close_request.ticket_id = auto_close_exclude.ticket_id
WHERE close_request.close_at < NOW()
    AND tickets.open
    AND auto_close_exclude.ticket_id IS NULL;"#,
    )
    .load::<CloseRequest>(db)
    .await?)
}

/// Drops requests left behind on tickets that were closed by other means
pub async fn cleanup(db: &mut AsyncPgConnection) -> Result<usize> {
    Ok(diesel::sql_query(
        r#"
DELETE FROM close_request
USING tickets
WHERE close_request.guild_id = tickets.guild_id
    AND close_request.ticket_id = tickets.id
    AND NOT tickets.open;"#,
    )
    .execute(db)
    .await?)
}
