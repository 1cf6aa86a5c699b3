use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::webhooks;
use crate::snowflake::Snowflake;

/// Platform webhook credentials used to post into the ticket channel
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS webhooks(
    "guild_id" int8 NOT NULL,
    "ticket_id" int4 NOT NULL,
    "webhook_id" int8 NOT NULL UNIQUE,
    "webhook_token" varchar(100) NOT NULL,
    FOREIGN KEY("guild_id", "ticket_id") REFERENCES tickets("guild_id", "id"),
    PRIMARY KEY("guild_id", "ticket_id")
);
"#;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = webhooks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Webhook {
    pub webhook_id: Snowflake,
    pub webhook_token: String,
}

pub async fn get(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
) -> Result<Option<Webhook>> {
    Ok(webhooks::table
        .find((guild_id, ticket_id))
        .select(Webhook::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn create(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
    webhook: &Webhook,
) -> Result<()> {
    diesel::insert_into(webhooks::table)
        .values((
            webhooks::guild_id.eq(guild_id),
            webhooks::ticket_id.eq(ticket_id),
            webhooks::webhook_id.eq(webhook.webhook_id),
            webhooks::webhook_token.eq(&webhook.webhook_token),
        ))
        .on_conflict((webhooks::guild_id, webhooks::ticket_id))
        .do_update()
        .set((
            webhooks::webhook_id.eq(excluded(webhooks::webhook_id)),
            webhooks::webhook_token.eq(excluded(webhooks::webhook_token)),
        ))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: &mut AsyncPgConnection, guild_id: Snowflake, ticket_id: i32) -> Result<()> {
    diesel::delete(webhooks::table.find((guild_id, ticket_id)))
        .execute(db)
        .await?;
    Ok(())
}
