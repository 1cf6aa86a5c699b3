use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::Result;
use crate::services::views::{MaterializedView, ViewIndex};

/// How many guilds run each custom integration
pub struct CustomIntegrationGuildCountsView;

impl MaterializedView for CustomIntegrationGuildCountsView {
    fn name(&self) -> &'static str {
        "custom_integration_guild_counts"
    }

    fn definition(&self) -> &'static str {
        r#"
SELECT custom_integration_guilds.integration_id, COUNT(*) AS count
FROM custom_integration_guilds
GROUP BY custom_integration_guilds.integration_id
"#
    }

    fn indexes(&self) -> &'static [ViewIndex] {
        &[ViewIndex {
            suffix: "integration_id_key",
            unique: true,
            columns: "integration_id",
        }]
    }
}

#[derive(QueryableByName)]
struct Row {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

impl CustomIntegrationGuildCountsView {
    /// 0 for integrations no guild ran at the last refresh
    pub async fn get(db: &mut AsyncPgConnection, integration_id: i32) -> Result<i64> {
        Ok(diesel::sql_query(
            r#"SELECT count FROM custom_integration_guild_counts WHERE integration_id = $1;"#,
        )
        .bind::<Integer, _>(integration_id)
        .get_result::<Row>(db)
        .await
        .optional()?
        .map_or(0, |row| row.count))
    }
}
