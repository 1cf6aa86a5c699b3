use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{DbError, Result};
use crate::schema::{panel_role_mentions, panel_teams, panel_user_mention, panels, support_team};
use crate::services::panels::access_control_db::{self, AccessControlRule};
use crate::services::panels::form_db::{self, NewForm};
use crate::services::teams::support_team_db::SupportTeam;
use crate::snowflake::Snowflake;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS panels(
    "panel_id" SERIAL NOT NULL UNIQUE,
    "message_id" int8 NOT NULL UNIQUE,
    "channel_id" int8 NOT NULL,
    "guild_id" int8 NOT NULL,
    "title" varchar(255) NOT NULL,
    "content" text NOT NULL,
    "colour" int4 NOT NULL,
    "target_category" int8 NOT NULL,
    "emoji_name" varchar(32),
    "emoji_id" int8,
    "welcome_message_embed" int4 REFERENCES embeds("id") ON DELETE SET NULL,
    "with_default_team" bool NOT NULL DEFAULT true,
    "custom_id" varchar(100) NOT NULL,
    "image_url" varchar(255),
    "thumbnail_url" varchar(255),
    "button_style" int2 NOT NULL DEFAULT 1,
    "button_label" varchar(80),
    "form_id" int4 REFERENCES forms("form_id") ON DELETE SET NULL,
    UNIQUE("guild_id", "custom_id"),
    PRIMARY KEY("panel_id")
);
CREATE INDEX IF NOT EXISTS panels_guild_id ON panels("guild_id");
CREATE TABLE IF NOT EXISTS panel_user_mention(
    "panel_id" int4 NOT NULL REFERENCES panels("panel_id") ON DELETE CASCADE,
    "should_mention_user" bool NOT NULL,
    PRIMARY KEY("panel_id")
);
CREATE TABLE IF NOT EXISTS panel_role_mentions(
    "panel_id" int4 NOT NULL REFERENCES panels("panel_id") ON DELETE CASCADE,
    "role_id" int8 NOT NULL,
    PRIMARY KEY("panel_id", "role_id")
);
CREATE TABLE IF NOT EXISTS panel_teams(
    "panel_id" int4 NOT NULL REFERENCES panels("panel_id") ON DELETE CASCADE,
    "team_id" int4 NOT NULL REFERENCES support_team("id") ON DELETE CASCADE,
    PRIMARY KEY("panel_id", "team_id")
);
CREATE INDEX IF NOT EXISTS panel_teams_team_id ON panel_teams("team_id");
"#;

/// Every panel column but the id, used for inserts and full updates
#[derive(
    Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset, Serialize, Deserialize,
)]
#[diesel(table_name = panels)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PanelData {
    pub message_id: Snowflake,
    pub channel_id: Snowflake,
    pub guild_id: Snowflake,
    pub title: String,
    pub content: String,
    pub colour: i32,
    pub target_category: Snowflake,
    pub emoji_name: Option<String>,
    pub emoji_id: Option<Snowflake>,
    pub welcome_message_embed: Option<i32>,
    pub with_default_team: bool,
    pub custom_id: String,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub button_style: i16,
    pub button_label: Option<String>,
    pub form_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = panels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Panel {
    pub panel_id: i32,
    #[diesel(embed)]
    #[serde(flatten)]
    pub data: PanelData,
}

/// A panel and everything created alongside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePanel {
    pub data: PanelData,
    pub mention_user: bool,
    pub role_mentions: Vec<Snowflake>,
    pub team_ids: Vec<i32>,
    pub access_control_rules: Vec<AccessControlRule>,
    /// Created first and linked through `form_id`, overriding `data.form_id`
    pub form: Option<NewForm>,
}

/// Inserts the panel and its satellites, returning the new panel id
pub async fn create_with_tx(tx: &mut AsyncPgConnection, panel: &CreatePanel) -> Result<i32> {
    let mut data = panel.data.clone();
    if let Some(form) = &panel.form {
        data.form_id = Some(form_db::create_with_inputs(tx, data.guild_id, form).await?.form_id);
    }

    let panel_id: i32 = diesel::insert_into(panels::table)
        .values(&data)
        .returning(panels::panel_id)
        .get_result(tx)
        .await?;

    set_should_mention_user(tx, panel_id, panel.mention_user).await?;
    replace_role_mentions(tx, panel_id, &panel.role_mentions).await?;
    replace_teams(tx, panel_id, &panel.team_ids).await?;
    access_control_db::replace(tx, panel_id, &panel.access_control_rules).await?;
    Ok(panel_id)
}

pub async fn create(db: &Database, panel: CreatePanel) -> Result<i32> {
    db.with_tx(|tx| async move { create_with_tx(tx, &panel).await }.scope_boxed())
        .await
}

pub async fn get_by_id(db: &mut AsyncPgConnection, panel_id: i32) -> Result<Option<Panel>> {
    Ok(panels::table
        .find(panel_id)
        .select(Panel::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_by_message_id(
    db: &mut AsyncPgConnection,
    message_id: Snowflake,
) -> Result<Option<Panel>> {
    Ok(panels::table
        .filter(panels::message_id.eq(message_id))
        .select(Panel::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_by_custom_id(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    custom_id: &str,
) -> Result<Option<Panel>> {
    Ok(panels::table
        .filter(panels::guild_id.eq(guild_id))
        .filter(panels::custom_id.eq(custom_id))
        .select(Panel::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_by_guild(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<Vec<Panel>> {
    Ok(panels::table
        .filter(panels::guild_id.eq(guild_id))
        .order(panels::panel_id.asc())
        .select(Panel::as_select())
        .load(db)
        .await?)
}

/// Panels that open tickets through the given form
pub async fn get_by_form_id(db: &mut AsyncPgConnection, form_id: i32) -> Result<Vec<Panel>> {
    Ok(panels::table
        .filter(panels::form_id.eq(form_id))
        .order(panels::panel_id.asc())
        .select(Panel::as_select())
        .load(db)
        .await?)
}

pub async fn get_panel_count(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<i64> {
    Ok(panels::table
        .filter(panels::guild_id.eq(guild_id))
        .count()
        .get_result(db)
        .await?)
}

/// Overwrites every column of the panel
pub async fn update(db: &mut AsyncPgConnection, panel_id: i32, data: &PanelData) -> Result<()> {
    let updated = diesel::update(panels::table.find(panel_id))
        .set(data)
        .execute(db)
        .await?;
    if updated == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Overwrites the panel whose message was `old_message_id`, `data.message_id` holds the
/// replacement message
pub async fn update_by_message_id(
    db: &mut AsyncPgConnection,
    old_message_id: Snowflake,
    data: &PanelData,
) -> Result<()> {
    let updated = diesel::update(panels::table.filter(panels::message_id.eq(old_message_id)))
        .set(data)
        .execute(db)
        .await?;
    if updated == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Points the panel at a re-sent message
pub async fn update_message_id(
    db: &mut AsyncPgConnection,
    old_message_id: Snowflake,
    new_message_id: Snowflake,
) -> Result<()> {
    diesel::update(panels::table.filter(panels::message_id.eq(old_message_id)))
        .set(panels::message_id.eq(new_message_id))
        .execute(db)
        .await?;
    Ok(())
}

/// Deletes the panel with its mentions, team bindings, access control rules and multi panel
/// memberships. Tickets opened from it keep existing with no panel.
pub async fn delete(db: &mut AsyncPgConnection, panel_id: i32) -> Result<()> {
    diesel::delete(panels::table.find(panel_id))
        .execute(db)
        .await?;
    Ok(())
}

/// Defaults to `true` for panels without a stored preference
pub async fn get_should_mention_user(db: &mut AsyncPgConnection, panel_id: i32) -> Result<bool> {
    Ok(panel_user_mention::table
        .find(panel_id)
        .select(panel_user_mention::should_mention_user)
        .first(db)
        .await
        .optional()?
        .unwrap_or(true))
}

pub async fn set_should_mention_user(
    db: &mut AsyncPgConnection,
    panel_id: i32,
    should_mention_user: bool,
) -> Result<()> {
    diesel::insert_into(panel_user_mention::table)
        .values((
            panel_user_mention::panel_id.eq(panel_id),
            panel_user_mention::should_mention_user.eq(should_mention_user),
        ))
        .on_conflict(panel_user_mention::panel_id)
        .do_update()
        .set(panel_user_mention::should_mention_user.eq(should_mention_user))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_role_mentions(
    db: &mut AsyncPgConnection,
    panel_id: i32,
) -> Result<Vec<Snowflake>> {
    Ok(panel_role_mentions::table
        .filter(panel_role_mentions::panel_id.eq(panel_id))
        .order(panel_role_mentions::role_id.asc())
        .select(panel_role_mentions::role_id)
        .load(db)
        .await?)
}

/// Call from within a transaction
pub async fn replace_role_mentions(
    tx: &mut AsyncPgConnection,
    panel_id: i32,
    role_ids: &[Snowflake],
) -> Result<()> {
    diesel::delete(panel_role_mentions::table.filter(panel_role_mentions::panel_id.eq(panel_id)))
        .execute(tx)
        .await?;
    if role_ids.is_empty() {
        return Ok(());
    }
    let rows: Vec<_> = role_ids
        .iter()
        .map(|role_id| {
            (
                panel_role_mentions::panel_id.eq(panel_id),
                panel_role_mentions::role_id.eq(*role_id),
            )
        })
        .collect();
    diesel::insert_into(panel_role_mentions::table)
        .values(rows)
        .on_conflict_do_nothing()
        .execute(tx)
        .await?;
    Ok(())
}

pub async fn get_team_ids(db: &mut AsyncPgConnection, panel_id: i32) -> Result<Vec<i32>> {
    Ok(panel_teams::table
        .filter(panel_teams::panel_id.eq(panel_id))
        .order(panel_teams::team_id.asc())
        .select(panel_teams::team_id)
        .load(db)
        .await?)
}

pub async fn get_teams(db: &mut AsyncPgConnection, panel_id: i32) -> Result<Vec<SupportTeam>> {
    Ok(panel_teams::table
        .inner_join(support_team::table)
        .filter(panel_teams::panel_id.eq(panel_id))
        .order(support_team::id.asc())
        .select(SupportTeam::as_select())
        .load(db)
        .await?)
}

/// Call from within a transaction
pub async fn replace_teams(
    tx: &mut AsyncPgConnection,
    panel_id: i32,
    team_ids: &[i32],
) -> Result<()> {
    diesel::delete(panel_teams::table.filter(panel_teams::panel_id.eq(panel_id)))
        .execute(tx)
        .await?;
    if team_ids.is_empty() {
        return Ok(());
    }
    let rows: Vec<_> = team_ids
        .iter()
        .map(|team_id| {
            (
                panel_teams::panel_id.eq(panel_id),
                panel_teams::team_id.eq(*team_id),
            )
        })
        .collect();
    diesel::insert_into(panel_teams::table)
        .values(rows)
        .on_conflict_do_nothing()
        .execute(tx)
        .await?;
    Ok(())
}
