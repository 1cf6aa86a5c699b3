use std::collections::{HashMap, HashSet};

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};
use crate::schema::{panel_access_control_rules, panels};
use crate::snowflake::Snowflake;
use crate::sql_enum::text_enum;

/// Ordered allow/deny rules deciding who may open a ticket from a panel. A role appears at most
/// once per panel and positions are unique, so the first match is always well defined.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS panel_access_control_rules(
    "panel_id" int4 NOT NULL REFERENCES panels("panel_id") ON DELETE CASCADE,
    "role_id" int8 NOT NULL,
    "position" int4 NOT NULL,
    "action" varchar(8) NOT NULL CHECK ("action" IN ('allow', 'deny')),
    UNIQUE("panel_id", "position"),
    CHECK("position" >= 0),
    PRIMARY KEY("panel_id", "role_id")
);
"#;

text_enum! {
    pub enum RuleAction {
        Allow => "allow",
        Deny => "deny",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = panel_access_control_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AccessControlRule {
    pub role_id: Snowflake,
    pub action: RuleAction,
}

/// First rule in `rules` whose role the user holds. `rules` must be in position order, which
/// is how [`get_all`] returns them.
pub fn first_match<'a>(
    rules: &'a [AccessControlRule],
    role_ids: &[Snowflake],
) -> Option<&'a AccessControlRule> {
    let held: HashSet<&Snowflake> = role_ids.iter().collect();
    rules.iter().find(|rule| held.contains(&rule.role_id))
}

pub async fn get_all(db: &mut AsyncPgConnection, panel_id: i32) -> Result<Vec<AccessControlRule>> {
    Ok(panel_access_control_rules::table
        .filter(panel_access_control_rules::panel_id.eq(panel_id))
        .order(panel_access_control_rules::position.asc())
        .select(AccessControlRule::as_select())
        .load(db)
        .await?)
}

/// Rules of every panel in the guild, keyed by panel id
pub async fn get_all_for_guild(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
) -> Result<HashMap<i32, Vec<AccessControlRule>>> {
    let rows: Vec<(i32, AccessControlRule)> = panel_access_control_rules::table
        .inner_join(panels::table)
        .filter(panels::guild_id.eq(guild_id))
        .order((
            panel_access_control_rules::panel_id.asc(),
            panel_access_control_rules::position.asc(),
        ))
        .select((
            panel_access_control_rules::panel_id,
            AccessControlRule::as_select(),
        ))
        .load(db)
        .await?;
    let mut by_panel: HashMap<i32, Vec<AccessControlRule>> = HashMap::new();
    for (panel_id, rule) in rows {
        by_panel.entry(panel_id).or_default().push(rule);
    }
    Ok(by_panel)
}

/// Replaces the panel's rules, the index in `rules` becomes the position. Call from within a
/// transaction so readers never see a partial list.
pub async fn replace(
    tx: &mut AsyncPgConnection,
    panel_id: i32,
    rules: &[AccessControlRule],
) -> Result<()> {
    let mut seen = HashSet::with_capacity(rules.len());
    if let Some(dup) = rules.iter().find(|rule| !seen.insert(rule.role_id)) {
        return Err(DbError::InvalidInput(format!(
            "role {} appears more than once in the access control rules",
            dup.role_id
        )));
    }

    diesel::delete(
        panel_access_control_rules::table.filter(panel_access_control_rules::panel_id.eq(panel_id)),
    )
    .execute(tx)
    .await?;

    if rules.is_empty() {
        return Ok(());
    }
    let rows: Vec<_> = rules
        .iter()
        .enumerate()
        .map(|(position, rule)| {
            (
                panel_access_control_rules::panel_id.eq(panel_id),
                panel_access_control_rules::role_id.eq(rule.role_id),
                panel_access_control_rules::position.eq(position as i32),
                panel_access_control_rules::action.eq(rule.action),
            )
        })
        .collect();
    diesel::insert_into(panel_access_control_rules::table)
        .values(rows)
        .execute(tx)
        .await?;
    Ok(())
}

/// The lowest positioned rule of the panel matching any of `role_ids`.
///
/// Returns [`DbError::NoRuleMatched`] when the user holds none of the listed roles, including
/// when `role_ids` is empty. Callers decide what an unmatched user may do.
pub async fn get_first_matched(
    db: &mut AsyncPgConnection,
    panel_id: i32,
    role_ids: &[Snowflake],
) -> Result<AccessControlRule> {
    if role_ids.is_empty() {
        return Err(DbError::NoRuleMatched);
    }
    panel_access_control_rules::table
        .filter(panel_access_control_rules::panel_id.eq(panel_id))
        .filter(panel_access_control_rules::role_id.eq_any(role_ids))
        .order(panel_access_control_rules::position.asc())
        .select(AccessControlRule::as_select())
        .first(db)
        .await
        .optional()?
        .ok_or(DbError::NoRuleMatched)
}
