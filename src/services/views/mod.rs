//! Materialized views over ticket and integration data, rebuilt periodically by the
//! `view_refresher` binary.
//!
//! A refresh never uses `REFRESH MATERIALIZED VIEW`. It builds `<name>_new` next to the live
//! view, indexes it, then drops the live view and renames the new one into place, all in one
//! transaction. Readers see either the old or the new view with its full index set.

use diesel::sql_types::Text;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl, SimpleAsyncConnection};
use log::debug;

use crate::error::{DbError, Result};

pub mod custom_integration_guild_counts;
pub mod first_response_time;
pub mod ticket_duration;
pub mod top_close_reasons;

pub use custom_integration_guild_counts::CustomIntegrationGuildCountsView;
pub use first_response_time::FirstResponseTimeGuildView;
pub use ticket_duration::TicketDurationView;
pub use top_close_reasons::TopCloseReasonsView;

/// Every managed view, in refresh order
pub const ALL: &[&'static dyn MaterializedView] = &[
    &FirstResponseTimeGuildView,
    &TicketDurationView,
    &TopCloseReasonsView,
    &CustomIntegrationGuildCountsView,
];

/// An index on a view, named `<view>_<suffix>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewIndex {
    pub suffix: &'static str,
    pub unique: bool,
    /// Column list as it appears between the parentheses of `CREATE INDEX`
    pub columns: &'static str,
}

pub trait MaterializedView: Send + Sync {
    fn name(&self) -> &'static str;

    /// The `SELECT` the view materializes
    fn definition(&self) -> &'static str;

    fn indexes(&self) -> &'static [ViewIndex];

    /// Idempotent DDL creating the view and its indexes
    fn schema(&self) -> String {
        let name = self.name();
        let mut ddl = format!(
            "CREATE MATERIALIZED VIEW IF NOT EXISTS {name} AS {} WITH DATA;\n",
            self.definition().trim()
        );
        for index in self.indexes() {
            ddl.push_str(&format!(
                "CREATE {}INDEX IF NOT EXISTS {name}_{} ON {name}({});\n",
                if index.unique { "UNIQUE " } else { "" },
                index.suffix,
                index.columns
            ));
        }
        ddl
    }

    /// Statements of the atomic swap, to be run in order inside one transaction
    fn swap_statements(&self) -> Vec<String> {
        let name = self.name();
        let staging = format!("{name}_new");
        let mut statements = vec![
            format!("DROP MATERIALIZED VIEW IF EXISTS {staging};"),
            format!(
                "CREATE MATERIALIZED VIEW {staging} AS {} WITH DATA;",
                self.definition().trim()
            ),
        ];
        for index in self.indexes() {
            statements.push(format!(
                "CREATE {}INDEX {staging}_{} ON {staging}({});",
                if index.unique { "UNIQUE " } else { "" },
                index.suffix,
                index.columns
            ));
        }
        statements.push(format!("DROP MATERIALIZED VIEW IF EXISTS {name};"));
        statements.push(format!("ALTER MATERIALIZED VIEW {staging} RENAME TO {name};"));
        for index in self.indexes() {
            statements.push(format!(
                "ALTER INDEX {staging}_{suffix} RENAME TO {name}_{suffix};",
                suffix = index.suffix
            ));
        }
        statements
    }
}

/// Rebuilds `view` with the atomic swap. Concurrent refreshes of the same view queue up behind
/// a transaction scoped advisory lock keyed by the view's name.
pub async fn refresh(
    conn: &mut AsyncPgConnection,
    view: &'static dyn MaterializedView,
) -> Result<()> {
    debug!("Refreshing materialized view {}", view.name());
    conn.transaction::<_, DbError, _>(|tx| {
        async move {
            diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1));")
                .bind::<Text, _>(view.name())
                .execute(tx)
                .await?;
            for statement in view.swap_statements() {
                tx.batch_execute(&statement).await?;
            }
            Ok(())
        }
        .scope_boxed()
    })
    .await?;
    debug!("Swapped in new {}", view.name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample;

    impl MaterializedView for Sample {
        fn name(&self) -> &'static str {
            "sample"
        }

        fn definition(&self) -> &'static str {
            "\n  SELECT 1 AS one\n"
        }

        fn indexes(&self) -> &'static [ViewIndex] {
            &[
                ViewIndex {
                    suffix: "one_key",
                    unique: true,
                    columns: "one",
                },
                ViewIndex {
                    suffix: "one",
                    unique: false,
                    columns: "one",
                },
            ]
        }
    }

    #[test]
    fn schema_is_idempotent_ddl() {
        let ddl = Sample.schema();
        assert!(ddl.starts_with(
            "CREATE MATERIALIZED VIEW IF NOT EXISTS sample AS SELECT 1 AS one WITH DATA;"
        ));
        assert!(ddl.contains("CREATE UNIQUE INDEX IF NOT EXISTS sample_one_key ON sample(one);"));
        assert!(ddl.contains("CREATE INDEX IF NOT EXISTS sample_one ON sample(one);"));
    }

    #[test]
    fn swap_builds_indexes_before_dropping_the_live_view() {
        let statements = Sample.swap_statements();
        let position = |needle: &str| {
            statements
                .iter()
                .position(|s| s.starts_with(needle))
                .unwrap_or_else(|| panic!("missing `{needle}`"))
        };

        let create = position("CREATE MATERIALIZED VIEW sample_new");
        let index = position("CREATE UNIQUE INDEX sample_new_one_key ON sample_new(one);");
        let drop = position("DROP MATERIALIZED VIEW IF EXISTS sample;");
        let rename = position("ALTER MATERIALIZED VIEW sample_new RENAME TO sample;");
        let rename_index = position("ALTER INDEX sample_new_one_key RENAME TO sample_one_key;");

        assert!(create < index && index < drop && drop < rename && rename < rename_index);
        assert_eq!(statements.len(), 8);
    }

    #[test]
    fn every_view_has_a_unique_index() {
        for view in ALL {
            assert!(
                view.indexes().iter().any(|index| index.unique),
                "{} has no unique index",
                view.name()
            );
            assert!(view.schema().contains(view.name()));
        }
    }
}
