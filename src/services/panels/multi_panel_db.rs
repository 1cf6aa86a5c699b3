use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};
use crate::schema::{multi_panel_targets, multi_panels, panels};
use crate::services::panels::panel_db::Panel;
use crate::snowflake::Snowflake;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS multi_panels(
    "id" SERIAL NOT NULL UNIQUE,
    "message_id" int8 NOT NULL UNIQUE,
    "channel_id" int8 NOT NULL,
    "guild_id" int8 NOT NULL,
    "title" varchar(255) NOT NULL,
    "content" text NOT NULL,
    "colour" int4 NOT NULL,
    "select_menu" bool NOT NULL DEFAULT false,
    "embed_id" int4 REFERENCES embeds("id") ON DELETE SET NULL,
    PRIMARY KEY("id")
);
CREATE INDEX IF NOT EXISTS multi_panels_guild_id ON multi_panels("guild_id");
CREATE TABLE IF NOT EXISTS multi_panel_targets(
    "multi_panel_id" int4 NOT NULL REFERENCES multi_panels("id") ON DELETE CASCADE,
    "panel_id" int4 NOT NULL REFERENCES panels("panel_id") ON DELETE CASCADE,
    PRIMARY KEY("multi_panel_id", "panel_id")
);
CREATE INDEX IF NOT EXISTS multi_panel_targets_panel_id ON multi_panel_targets("panel_id");
"#;

#[derive(
    Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset, Serialize, Deserialize,
)]
#[diesel(table_name = multi_panels)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MultiPanelData {
    pub message_id: Snowflake,
    pub channel_id: Snowflake,
    pub guild_id: Snowflake,
    pub title: String,
    pub content: String,
    pub colour: i32,
    pub select_menu: bool,
    pub embed_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = multi_panels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MultiPanel {
    pub id: i32,
    #[diesel(embed)]
    #[serde(flatten)]
    pub data: MultiPanelData,
}

pub async fn create(db: &mut AsyncPgConnection, data: &MultiPanelData) -> Result<i32> {
    Ok(diesel::insert_into(multi_panels::table)
        .values(data)
        .returning(multi_panels::id)
        .get_result(db)
        .await?)
}

pub async fn get(db: &mut AsyncPgConnection, id: i32) -> Result<Option<MultiPanel>> {
    Ok(multi_panels::table
        .find(id)
        .select(MultiPanel::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_by_message_id(
    db: &mut AsyncPgConnection,
    message_id: Snowflake,
) -> Result<Option<MultiPanel>> {
    Ok(multi_panels::table
        .filter(multi_panels::message_id.eq(message_id))
        .select(MultiPanel::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_by_guild(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
) -> Result<Vec<MultiPanel>> {
    Ok(multi_panels::table
        .filter(multi_panels::guild_id.eq(guild_id))
        .order(multi_panels::id.asc())
        .select(MultiPanel::as_select())
        .load(db)
        .await?)
}

pub async fn update(db: &mut AsyncPgConnection, id: i32, data: &MultiPanelData) -> Result<()> {
    let updated = diesel::update(multi_panels::table.find(id))
        .set(data)
        .execute(db)
        .await?;
    if updated == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

pub async fn update_message_id(
    db: &mut AsyncPgConnection,
    id: i32,
    message_id: Snowflake,
) -> Result<()> {
    diesel::update(multi_panels::table.find(id))
        .set(multi_panels::message_id.eq(message_id))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: &mut AsyncPgConnection, guild_id: Snowflake, id: i32) -> Result<()> {
    diesel::delete(
        multi_panels::table
            .filter(multi_panels::id.eq(id))
            .filter(multi_panels::guild_id.eq(guild_id)),
    )
    .execute(db)
    .await?;
    Ok(())
}

pub async fn insert_target(
    db: &mut AsyncPgConnection,
    multi_panel_id: i32,
    panel_id: i32,
) -> Result<()> {
    diesel::insert_into(multi_panel_targets::table)
        .values((
            multi_panel_targets::multi_panel_id.eq(multi_panel_id),
            multi_panel_targets::panel_id.eq(panel_id),
        ))
        .on_conflict_do_nothing()
        .execute(db)
        .await?;
    Ok(())
}

/// Panels grouped under the multi panel, in panel id order
pub async fn get_panels(db: &mut AsyncPgConnection, multi_panel_id: i32) -> Result<Vec<Panel>> {
    Ok(multi_panel_targets::table
        .inner_join(panels::table)
        .filter(multi_panel_targets::multi_panel_id.eq(multi_panel_id))
        .order(panels::panel_id.asc())
        .select(Panel::as_select())
        .load(db)
        .await?)
}

/// Every multi panel the panel is part of
pub async fn get_multi_panels_for_panel(
    db: &mut AsyncPgConnection,
    panel_id: i32,
) -> Result<Vec<MultiPanel>> {
    Ok(multi_panel_targets::table
        .inner_join(multi_panels::table)
        .filter(multi_panel_targets::panel_id.eq(panel_id))
        .order(multi_panels::id.asc())
        .select(MultiPanel::as_select())
        .load(db)
        .await?)
}

pub async fn delete_target(
    db: &mut AsyncPgConnection,
    multi_panel_id: i32,
    panel_id: i32,
) -> Result<()> {
    diesel::delete(multi_panel_targets::table.find((multi_panel_id, panel_id)))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete_all_targets(db: &mut AsyncPgConnection, multi_panel_id: i32) -> Result<()> {
    diesel::delete(
        multi_panel_targets::table.filter(multi_panel_targets::multi_panel_id.eq(multi_panel_id)),
    )
    .execute(db)
    .await?;
    Ok(())
}
