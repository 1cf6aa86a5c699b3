use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Integer};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::ticket_last_message;
use crate::snowflake::Snowflake;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ticket_last_message(
    "guild_id" int8 NOT NULL,
    "ticket_id" int4 NOT NULL,
    "last_message_id" int8,
    "last_message_time" timestamptz,
    "user_id" int8,
    "user_is_staff" bool NOT NULL DEFAULT false,
    FOREIGN KEY("guild_id", "ticket_id") REFERENCES tickets("guild_id", "id"),
    PRIMARY KEY("guild_id", "ticket_id")
);
"#;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = ticket_last_message)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TicketLastMessage {
    pub last_message_id: Option<Snowflake>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub user_id: Option<Snowflake>,
    pub user_is_staff: bool,
}

pub async fn get(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
) -> Result<Option<TicketLastMessage>> {
    Ok(ticket_last_message::table
        .find((guild_id, ticket_id))
        .select(TicketLastMessage::as_select())
        .first(db)
        .await
        .optional()?)
}

/// Records a new message in the ticket, stamped with the database's clock
pub async fn set(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
    message_id: Snowflake,
    user_id: Snowflake,
    user_is_staff: bool,
) -> Result<()> {
    diesel::sql_query(
        r#"
INSERT INTO ticket_last_message("guild_id", "ticket_id", "last_message_id", "last_message_time", "user_id", "user_is_staff")
VALUES($1, $2, $3, NOW(), $4, $5)
ON CONFLICT("guild_id", "ticket_id") DO UPDATE SET
    "last_message_id" = EXCLUDED."last_message_id",
    "last_message_time" = EXCLUDED."last_message_time",
    "user_id" = EXCLUDED."user_id",
    "user_is_staff" = EXCLUDED."user_is_staff";"#,
    )
    .bind::<BigInt, _>(guild_id)
    .bind::<Integer, _>(ticket_id)
    .bind::<BigInt, _>(message_id)
    .bind::<BigInt, _>(user_id)
    .bind::<Bool, _>(user_is_staff)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete(db: &mut AsyncPgConnection, guild_id: Snowflake, ticket_id: i32) -> Result<()> {
    diesel::delete(ticket_last_message::table.find((guild_id, ticket_id)))
        .execute(db)
        .await?;
    Ok(())
}
