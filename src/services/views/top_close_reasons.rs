use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Nullable, Text};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::services::views::{MaterializedView, ViewIndex};
use crate::snowflake::Snowflake;

/// The ten most common close reasons per guild and panel. Tickets opened without a panel are
/// grouped under a `NULL` panel.
pub struct TopCloseReasonsView;

impl MaterializedView for TopCloseReasonsView {
    fn name(&self) -> &'static str {
        "top_close_reasons"
    }

    fn definition(&self) -> &'static str {
        r#"
SELECT guild_id, panel_id, close_reason, ranking, count
FROM (
    SELECT
        tickets.guild_id,
        tickets.panel_id,
        close_reason.close_reason,
        COUNT(*) AS count,
        ROW_NUMBER() OVER (
            PARTITION BY tickets.guild_id, tickets.panel_id
            ORDER BY COUNT(*) DESC, close_reason.close_reason
        ) AS ranking
    FROM close_reason
    INNER JOIN tickets
        ON tickets.guild_id = close_reason.guild_id
        AND tickets.id = close_reason.ticket_id
    WHERE close_reason.close_reason IS NOT NULL
    GROUP BY tickets.guild_id, tickets.panel_id, close_reason.close_reason
) AS ranked
WHERE ranking <= 10
"#
    }

    fn indexes(&self) -> &'static [ViewIndex] {
        &[ViewIndex {
            suffix: "guild_panel_ranking_key",
            unique: true,
            columns: "guild_id, (COALESCE(panel_id, 0)), ranking",
        }]
    }
}

#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize, Deserialize)]
pub struct CloseReasonCount {
    #[diesel(sql_type = Text)]
    pub close_reason: String,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

impl TopCloseReasonsView {
    /// Most common first. `panel_id = None` reads tickets opened without a panel.
    pub async fn get(
        db: &mut AsyncPgConnection,
        guild_id: Snowflake,
        panel_id: Option<i32>,
    ) -> Result<Vec<CloseReasonCount>> {
        Ok(diesel::sql_query(
            r#"
SELECT close_reason, count
FROM top_close_reasons
WHERE guild_id = $1 AND panel_id IS NOT DISTINCT FROM $2
ORDER BY ranking ASC;"#,
        )
        .bind::<BigInt, _>(guild_id)
        .bind::<Nullable<Integer>, _>(panel_id)
        .load(db)
        .await?)
    }
}
