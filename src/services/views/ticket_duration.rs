use diesel::pg::data_types::PgInterval;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Interval, Nullable};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::Result;
use crate::interval::from_interval_opt;
use crate::services::views::first_response_time::WindowedAverages;
use crate::services::views::{MaterializedView, ViewIndex};
use crate::snowflake::Snowflake;

/// Average time from open to close of closed tickets, per guild
pub struct TicketDurationView;

impl MaterializedView for TicketDurationView {
    fn name(&self) -> &'static str {
        "ticket_duration"
    }

    fn definition(&self) -> &'static str {
        r#"
SELECT
    tickets.guild_id,
    AVG(tickets.close_time - tickets.open_time) AS all_time,
    AVG(tickets.close_time - tickets.open_time) FILTER (WHERE tickets.open_time > NOW() - INTERVAL '30 days') AS monthly,
    AVG(tickets.close_time - tickets.open_time) FILTER (WHERE tickets.open_time > NOW() - INTERVAL '7 days') AS weekly
FROM tickets
WHERE NOT tickets.open AND tickets.close_time IS NOT NULL
GROUP BY tickets.guild_id
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

impl TicketDurationView {
    pub async fn get(
        db: &mut AsyncPgConnection,
        guild_id: Snowflake,
    ) -> Result<Option<WindowedAverages>> {
        let row = diesel::sql_query(
            r#"SELECT all_time, monthly, weekly FROM ticket_duration WHERE guild_id = $1;"#,
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
