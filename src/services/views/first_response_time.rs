use chrono::TimeDelta;
use diesel::pg::data_types::PgInterval;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Interval, Nullable};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interval::{from_interval_opt, seconds};
use crate::services::views::{MaterializedView, ViewIndex};
use crate::snowflake::Snowflake;

/// Average time to first staff response per guild
pub struct FirstResponseTimeGuildView;

impl MaterializedView for FirstResponseTimeGuildView {
    fn name(&self) -> &'static str {
        "first_response_time_guild_view"
    }

    fn definition(&self) -> &'static str {
        r#"
SELECT
    first_response_time.guild_id,
    AVG(first_response_time.response_time) AS all_time,
    AVG(first_response_time.response_time) FILTER (WHERE tickets.open_time > NOW() - INTERVAL '30 days') AS monthly,
    AVG(first_response_time.response_time) FILTER (WHERE tickets.open_time > NOW() - INTERVAL '7 days') AS weekly
FROM first_response_time
INNER JOIN tickets
    ON tickets.guild_id = first_response_time.guild_id
    AND tickets.id = first_response_time.ticket_id
GROUP BY first_response_time.guild_id
"#
    }

    fn indexes(&self) -> &'static [ViewIndex] {
        &[ViewIndex {
            suffix: "guild_id_key",
            unique: true,
            columns: "guild_id",
        }]
    }
}

#[derive(QueryableByName)]
struct Row {
    #[diesel(sql_type = Nullable<Interval>)]
    all_time: Option<PgInterval>,
    #[diesel(sql_type = Nullable<Interval>)]
    monthly: Option<PgInterval>,
    #[diesel(sql_type = Nullable<Interval>)]
    weekly: Option<PgInterval>,
}

/// Averages over all tickets, and those opened in the last 30 and 7 days. A window with no
/// responses is [`None`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowedAverages {
    #[serde(with = "seconds::option")]
    pub all_time: Option<TimeDelta>,
    #[serde(with = "seconds::option")]
    pub monthly: Option<TimeDelta>,
    #[serde(with = "seconds::option")]
    pub weekly: Option<TimeDelta>,
}

impl FirstResponseTimeGuildView {
    /// [`None`] until the guild has a response recorded and the view has been refreshed since
    pub async fn get(
        db: &mut AsyncPgConnection,
        guild_id: Snowflake,
    ) -> Result<Option<WindowedAverages>> {
        let row = diesel::sql_query(
            r#"SELECT all_time, monthly, weekly FROM first_response_time_guild_view WHERE guild_id = $1;"#,
        )
        .bind::<BigInt, _>(guild_id)
        .get_result::<Row>(db)
        .await
        .optional()?;
        Ok(row.map(|row| WindowedAverages {
            all_time: from_interval_opt(row.all_time),
            monthly: from_interval_opt(row.monthly),
            weekly: from_interval_opt(row.weekly),
        }))
    }
}
