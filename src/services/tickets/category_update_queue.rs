use chrono::TimeDelta;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Interval, Nullable, Text};
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interval::to_interval;
use crate::schema::category_update_queue;
use crate::snowflake::Snowflake;
use crate::sql_enum::text_enum;

/// Channel moves waiting to be applied on the platform after a status change. Entries are only
/// ever removed by the consumer, so they survive restarts and are never retried automatically.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS category_update_queue(
    "guild_id" int8 NOT NULL,
    "ticket_id" int4 NOT NULL,
    "new_status" varchar(16) NOT NULL CHECK ("new_status" IN ('open', 'pending', 'closed')),
    "status_changed_at" timestamptz NOT NULL,
    FOREIGN KEY("guild_id", "ticket_id") REFERENCES tickets("guild_id", "id"),
    PRIMARY KEY("guild_id", "ticket_id")
);
CREATE INDEX IF NOT EXISTS category_update_queue_status_changed_at ON category_update_queue("status_changed_at");
"#;

text_enum! {
    pub enum TicketStatus {
        Open => "open",
        Pending => "pending",
        Closed => "closed",
    }
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize, Deserialize)]
pub struct CategoryUpdate {
    #[diesel(sql_type = BigInt)]
    pub guild_id: Snowflake,
    #[diesel(sql_type = Integer)]
    pub ticket_id: i32,
    #[diesel(sql_type = Text)]
    pub new_status: TicketStatus,
    #[diesel(sql_type = Nullable<BigInt>)]
    pub channel_id: Option<Snowflake>,
    #[diesel(sql_type = Nullable<Integer>)]
    pub panel_id: Option<i32>,
}

/// Queues a move for the ticket's channel, replacing any move still pending for it
pub async fn add(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
    new_status: TicketStatus,
) -> Result<()> {
    diesel::insert_into(category_update_queue::table)
        .values((
            category_update_queue::guild_id.eq(guild_id),
            category_update_queue::ticket_id.eq(ticket_id),
            category_update_queue::new_status.eq(new_status),
            category_update_queue::status_changed_at.eq(diesel::dsl::now),
        ))
        .on_conflict((
            category_update_queue::guild_id,
            category_update_queue::ticket_id,
        ))
        .do_update()
        .set((
            category_update_queue::new_status.eq(excluded(category_update_queue::new_status)),
            category_update_queue::status_changed_at
                .eq(excluded(category_update_queue::status_changed_at)),
        ))
        .execute(db)
        .await?;
    Ok(())
}

/// Entries queued more than `delay` ago, with the ticket's current channel and panel.
///
/// Reading does not consume, the same entries come back until [`delete`] is called.
pub async fn get_ready_for_update(
    db: &mut AsyncPgConnection,
    delay: TimeDelta,
) -> Result<Vec<CategoryUpdate>> {
    Ok(diesel::sql_query(
        r#"
SELECT
    category_update_queue.guild_id,
    category_update_queue.ticket_id,
    category_update_queue.new_status,
    tickets.channel_id,
    tickets.panel_id
FROM category_update_queue
INNER JOIN tickets
    ON category_update_queue.guild_id = tickets.guild_id
    AND category_update_queue.ticket_id = tickets.id
WHERE category_update_queue.status_changed_at < NOW() - $1
ORDER BY category_update_queue.status_changed_at;"#,
    )
    .bind::<Interval, _>(to_interval(delay)?)
    .load::<CategoryUpdate>(db)
    .await?)
}

pub async fn delete(db: &mut AsyncPgConnection, guild_id: Snowflake, ticket_id: i32) -> Result<()> {
    diesel::delete(category_update_queue::table.find((guild_id, ticket_id)))
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    #[test]
    fn statuses_parse_from_their_column_text() {
        assert_eq!("pending".parse::<TicketStatus>().ok(), Some(TicketStatus::Pending));
        assert_eq!(TicketStatus::Closed.to_string(), "closed");
        assert!(matches!(
            "archived".parse::<TicketStatus>(),
            Err(DbError::InvalidInput(_))
        ));
    }
}
