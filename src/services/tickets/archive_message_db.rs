use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::archive_messages;
use crate::snowflake::Snowflake;

/// Points at the message in the guild's archive channel holding the transcript
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS archive_messages(
    "guild_id" int8 NOT NULL,
    "ticket_id" int4 NOT NULL,
    "channel_id" int8 NOT NULL,
    "message_id" int8 NOT NULL,
    FOREIGN KEY("guild_id", "ticket_id") REFERENCES tickets("guild_id", "id"),
    PRIMARY KEY("guild_id", "ticket_id")
);
"#;

#[derive(Debug, Clone, Copy, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = archive_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ArchiveMessage {
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
}

pub async fn get(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
) -> Result<Option<ArchiveMessage>> {
    Ok(archive_messages::table
        .find((guild_id, ticket_id))
        .select(ArchiveMessage::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn set(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
    message: ArchiveMessage,
) -> Result<()> {
    diesel::insert_into(archive_messages::table)
        .values((
            archive_messages::guild_id.eq(guild_id),
            archive_messages::ticket_id.eq(ticket_id),
            archive_messages::channel_id.eq(message.channel_id),
            archive_messages::message_id.eq(message.message_id),
        ))
        .on_conflict((archive_messages::guild_id, archive_messages::ticket_id))
        .do_update()
        .set((
            archive_messages::channel_id.eq(excluded(archive_messages::channel_id)),
            archive_messages::message_id.eq(excluded(archive_messages::message_id)),
        ))
        .execute(db)
        .await?;
    Ok(())
}
