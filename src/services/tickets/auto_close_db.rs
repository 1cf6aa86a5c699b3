use chrono::TimeDelta;
use diesel::pg::data_types::PgInterval;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interval::{from_interval_opt, seconds, to_interval_opt};
use crate::schema::{auto_close, auto_close_exclude};
use crate::snowflake::Snowflake;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS auto_close(
    "guild_id" int8 NOT NULL,
    "enabled" bool NOT NULL,
    "since_open_with_no_response" interval,
    "since_last_message" interval,
    "on_user_leave" bool,
    PRIMARY KEY("guild_id")
);
CREATE TABLE IF NOT EXISTS auto_close_exclude(
    "guild_id" int8 NOT NULL,
    "ticket_id" int4 NOT NULL,
    FOREIGN KEY("guild_id", "ticket_id") REFERENCES tickets("guild_id", "id"),
    PRIMARY KEY("guild_id", "ticket_id")
);
"#;

/// Per guild auto close configuration. A missing row reads as [`AutoCloseSettings::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoCloseSettings {
    pub enabled: bool,
    #[serde(with = "seconds::option")]
    pub since_open_with_no_response: Option<TimeDelta>,
    #[serde(with = "seconds::option")]
    pub since_last_message: Option<TimeDelta>,
    pub on_user_leave: Option<bool>,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = auto_close)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct AutoCloseRow {
    enabled: bool,
    since_open_with_no_response: Option<PgInterval>,
    since_last_message: Option<PgInterval>,
    on_user_leave: Option<bool>,
}

impl From<AutoCloseRow> for AutoCloseSettings {
    fn from(row: AutoCloseRow) -> Self {
        Self {
            enabled: row.enabled,
            since_open_with_no_response: from_interval_opt(row.since_open_with_no_response),
            since_last_message: from_interval_opt(row.since_last_message),
            on_user_leave: row.on_user_leave,
        }
    }
}

pub async fn get(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<AutoCloseSettings> {
    Ok(auto_close::table
        .find(guild_id)
        .select(AutoCloseRow::as_select())
        .first(db)
        .await
        .optional()?
        .map(AutoCloseSettings::from)
        .unwrap_or_default())
}

pub async fn set(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    settings: &AutoCloseSettings,
) -> Result<()> {
    let since_open = to_interval_opt(settings.since_open_with_no_response)?;
    let since_last = to_interval_opt(settings.since_last_message)?;
    diesel::insert_into(auto_close::table)
        .values((
            auto_close::guild_id.eq(guild_id),
            auto_close::enabled.eq(settings.enabled),
            auto_close::since_open_with_no_response.eq(since_open),
            auto_close::since_last_message.eq(since_last),
            auto_close::on_user_leave.eq(settings.on_user_leave),
        ))
        .on_conflict(auto_close::guild_id)
        .do_update()
        .set((
            auto_close::enabled.eq(excluded(auto_close::enabled)),
            auto_close::since_open_with_no_response
                .eq(excluded(auto_close::since_open_with_no_response)),
            auto_close::since_last_message.eq(excluded(auto_close::since_last_message)),
            auto_close::on_user_leave.eq(excluded(auto_close::on_user_leave)),
        ))
        .execute(db)
        .await?;
    Ok(())
}

/// Clears both durations but keeps the rest of the configuration
pub async fn reset(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<()> {
    diesel::update(auto_close::table.find(guild_id))
        .set((
            auto_close::since_open_with_no_response.eq(None::<PgInterval>),
            auto_close::since_last_message.eq(None::<PgInterval>),
        ))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<()> {
    diesel::delete(auto_close::table.find(guild_id))
        .execute(db)
        .await?;
    Ok(())
}

/// Opts a single ticket out of auto close
pub async fn exclude(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
) -> Result<()> {
    diesel::insert_into(auto_close_exclude::table)
        .values((
            auto_close_exclude::guild_id.eq(guild_id),
            auto_close_exclude::ticket_id.eq(ticket_id),
        ))
        .on_conflict_do_nothing()
        .execute(db)
        .await?;
    Ok(())
}

/// Opts every currently open ticket in the guild out of auto close
pub async fn exclude_all_open(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<usize> {
    Ok(diesel::sql_query(
        r#"
INSERT INTO auto_close_exclude("guild_id", "ticket_id")
SELECT "guild_id", "id" FROM tickets WHERE "guild_id" = $1 AND "open"
ON CONFLICT DO NOTHING;"#,
    )
    .bind::<diesel::sql_types::BigInt, _>(guild_id)
    .execute(db)
    .await?)
}

pub async fn is_excluded(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
) -> Result<bool> {
    Ok(diesel::select(diesel::dsl::exists(
        auto_close_exclude::table.find((guild_id, ticket_id)),
    ))
    .get_result(db)
    .await?)
}

/// An open ticket that has gone quiet for longer than its guild allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, QueryableByName)]
pub struct AutoCloseCandidate {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub guild_id: Snowflake,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub ticket_id: i32,
}

/// Open, non excluded tickets in guilds with auto close enabled where either
/// - the last message is older than `since_last_message`, or
/// - staff never responded and the ticket is older than `since_open_with_no_response`
pub async fn get_auto_closeable(db: &mut AsyncPgConnection) -> Result<Vec<AutoCloseCandidate>> {
    Ok(diesel::sql_query(
        r#"
SELECT tickets.guild_id, tickets.id AS ticket_id
FROM tickets
INNER JOIN auto_close
    ON tickets.guild_id = auto_close.guild_id
LEFT OUTER JOIN ticket_last_message
    ON tickets.guild_id = ticket_last_message.guild_id
    AND tickets.id = ticket_last_message.ticket_id
LEFT OUTER JOIN first_response_time
    ON tickets.guild_id = first_response_time.guild_id
    AND tickets.id = first_response_time.ticket_id
LEFT OUTER JOIN auto_close_exclude
    ON tickets.guild_id = auto_close_exclude.guild_id
    AND tickets.id = auto_close_exclude.ticket_id
WHERE tickets.open
    AND auto_close.enabled
    AND auto_close_exclude.ticket_id IS NULL
    AND (
        (
            auto_close.since_last_message IS NOT NULL
            AND ticket_last_message.last_message_time IS NOT NULL
            AND ticket_last_message.last_message_time < NOW() - auto_close.since_last_message
        )
        OR (
            auto_close.since_open_with_no_response IS NOT NULL
            AND first_response_time.ticket_id IS NULL
            AND tickets.open_time < NOW() - auto_close.since_open_with_no_response
        )
    )
ORDER BY tickets.guild_id, tickets.id;"#,
    )
    .load::<AutoCloseCandidate>(db)
    .await?)
}
