use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Nullable};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{DbError, Result};
use crate::schema::tickets;
use crate::snowflake::Snowflake;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tickets(
    "id" int4 NOT NULL,
    "guild_id" int8 NOT NULL,
    "channel_id" int8 UNIQUE,
    "user_id" int8 NOT NULL,
    "open" bool NOT NULL,
    "open_time" timestamptz NOT NULL,
    "welcome_message_id" int8,
    "panel_id" int4 REFERENCES panels("panel_id") ON DELETE SET NULL,
    "close_time" timestamptz,
    PRIMARY KEY("guild_id", "id")
);
CREATE INDEX IF NOT EXISTS tickets_channel_id ON tickets("channel_id");
CREATE INDEX IF NOT EXISTS tickets_guild_id_user_id ON tickets("guild_id", "user_id");
CREATE INDEX IF NOT EXISTS tickets_panel_id ON tickets("panel_id");
CREATE INDEX IF NOT EXISTS tickets_open ON tickets("guild_id") WHERE "open";
"#;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = tickets)]
#[diesel(check_for_backend(Pg))]
pub struct Ticket {
    pub id: i32,
    pub guild_id: Snowflake,
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    pub open: bool,
    pub open_time: DateTime<Utc>,
    pub welcome_message_id: Option<Snowflake>,
    /// Panel the ticket was opened from, [`None`] for tickets opened by command
    pub panel_id: Option<i32>,
    /// Stamped by the first [`close`] only
    pub close_time: Option<DateTime<Utc>>,
}

#[derive(QueryableByName)]
struct TicketId {
    #[diesel(sql_type = Integer)]
    id: i32,
}

/// Opens a new ticket, allocating the next id for the guild in the same statement.
///
/// Two concurrent calls for one guild can compute the same id, the loser gets a unique
/// violation from the primary key and may retry, see [`create_with_retry`].
pub async fn create(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
    panel_id: Option<i32>,
) -> Result<i32> {
    let row = diesel::sql_query(
        r#"
INSERT INTO tickets("id", "guild_id", "user_id", "open", "open_time", "panel_id")
SELECT COALESCE(MAX("id"), 0) + 1, $1, $2, true, NOW(), $3
FROM tickets
WHERE "guild_id" = $1
RETURNING "id";"#,
    )
    .bind::<BigInt, _>(guild_id)
    .bind::<BigInt, _>(user_id)
    .bind::<Nullable<Integer>, _>(panel_id)
    .get_result::<TicketId>(db)
    .await?;
    Ok(row.id)
}

/// Runs [`create`] until it stops colliding with concurrent creations in the same guild
pub async fn create_with_retry(
    db: &Database,
    guild_id: Snowflake,
    user_id: Snowflake,
    panel_id: Option<i32>,
    max_attempts: usize,
) -> Result<i32> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let mut conn = db.conn().await?;
        match create(&mut conn, guild_id, user_id, panel_id).await {
            Err(e) if e.is_unique_violation() && attempt < max_attempts => continue,
            res => return res,
        }
    }
}

/// Records the chat platform objects created for the ticket
pub async fn set_properties(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
    channel_id: Snowflake,
    welcome_message_id: Snowflake,
) -> Result<()> {
    let updated = diesel::update(tickets::table.find((guild_id, ticket_id)))
        .set((
            tickets::channel_id.eq(channel_id),
            tickets::welcome_message_id.eq(welcome_message_id),
        ))
        .execute(db)
        .await?;
    if updated == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Marks the ticket as closed. Repeated calls change nothing.
pub async fn close(db: &mut AsyncPgConnection, guild_id: Snowflake, ticket_id: i32) -> Result<()> {
    diesel::sql_query(
        r#"
UPDATE tickets
SET "open" = false, "close_time" = COALESCE("close_time", NOW())
WHERE "guild_id" = $1 AND "id" = $2;"#,
    )
    .bind::<BigInt, _>(guild_id)
    .bind::<Integer, _>(ticket_id)
    .execute(db)
    .await?;
    Ok(())
}

/// Forgets the channel after it has been deleted on the platform
pub async fn delete_channel(db: &mut AsyncPgConnection, channel_id: Snowflake) -> Result<()> {
    diesel::update(tickets::table.filter(tickets::channel_id.eq(channel_id)))
        .set(tickets::channel_id.eq(None::<Snowflake>))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get(
    db: &mut AsyncPgConnection,
    ticket_id: i32,
    guild_id: Snowflake,
) -> Result<Option<Ticket>> {
    Ok(tickets::table
        .find((guild_id, ticket_id))
        .select(Ticket::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_by_channel(
    db: &mut AsyncPgConnection,
    channel_id: Snowflake,
) -> Result<Option<Ticket>> {
    Ok(tickets::table
        .filter(tickets::channel_id.eq(channel_id))
        .select(Ticket::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_open_by_user(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
) -> Result<Vec<Ticket>> {
    Ok(tickets::table
        .filter(tickets::guild_id.eq(guild_id))
        .filter(tickets::user_id.eq(user_id))
        .filter(tickets::open.eq(true))
        .order(tickets::id.asc())
        .select(Ticket::as_select())
        .load(db)
        .await?)
}

pub async fn get_all_by_user(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
) -> Result<Vec<Ticket>> {
    Ok(tickets::table
        .filter(tickets::guild_id.eq(guild_id))
        .filter(tickets::user_id.eq(user_id))
        .order(tickets::id.asc())
        .select(Ticket::as_select())
        .load(db)
        .await?)
}

pub async fn get_guild_open(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
) -> Result<Vec<Ticket>> {
    Ok(tickets::table
        .filter(tickets::guild_id.eq(guild_id))
        .filter(tickets::open.eq(true))
        .order(tickets::id.asc())
        .select(Ticket::as_select())
        .load(db)
        .await?)
}

/// Total tickets ever opened in the guild
pub async fn count(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<i64> {
    Ok(tickets::table
        .filter(tickets::guild_id.eq(guild_id))
        .count()
        .get_result(db)
        .await?)
}

pub async fn count_user_open(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
) -> Result<i64> {
    Ok(tickets::table
        .filter(tickets::guild_id.eq(guild_id))
        .filter(tickets::user_id.eq(user_id))
        .filter(tickets::open.eq(true))
        .count()
        .get_result(db)
        .await?)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    Ascending,
    #[default]
    Descending,
}

/// Filters for the dashboard's ticket list
#[derive(Debug, Clone, Default)]
pub struct TicketQueryOptions {
    pub guild_id: Snowflake,
    pub user_ids: Vec<Snowflake>,
    pub open: Option<bool>,
    pub panel_id: Option<i32>,
    pub order: Order,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn get_by_options(
    db: &mut AsyncPgConnection,
    options: &TicketQueryOptions,
) -> Result<Vec<Ticket>> {
    let mut query: tickets::BoxedQuery<'_, Pg> = tickets::table
        .filter(tickets::guild_id.eq(options.guild_id))
        .into_boxed();
    if !options.user_ids.is_empty() {
        query = query.filter(tickets::user_id.eq_any(options.user_ids.clone()));
    }
    if let Some(open) = options.open {
        query = query.filter(tickets::open.eq(open));
    }
    if let Some(panel_id) = options.panel_id {
        query = query.filter(tickets::panel_id.eq(panel_id));
    }
    query = match options.order {
        Order::Ascending => query.order(tickets::id.asc()),
        Order::Descending => query.order(tickets::id.desc()),
    };
    if let Some(limit) = options.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = options.offset {
        query = query.offset(offset);
    }
    Ok(query.select(Ticket::as_select()).load(db).await?)
}
