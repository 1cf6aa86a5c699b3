use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};
use crate::schema::{embed_fields, embeds};
use crate::snowflake::Snowflake;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS embeds(
    "id" SERIAL NOT NULL UNIQUE,
    "guild_id" int8 NOT NULL,
    "title" varchar(256),
    "description" text,
    "url" varchar(255),
    "colour" int4 NOT NULL DEFAULT 2335514,
    "author_name" varchar(256),
    "author_icon_url" varchar(255),
    "author_url" varchar(255),
    "image_url" varchar(255),
    "thumbnail_url" varchar(255),
    "footer_text" text,
    "footer_icon_url" varchar(255),
    "timestamp" timestamptz,
    PRIMARY KEY("id")
);
CREATE INDEX IF NOT EXISTS embeds_guild_id ON embeds("guild_id");
CREATE TABLE IF NOT EXISTS embed_fields(
    "id" SERIAL NOT NULL UNIQUE,
    "embed_id" int4 NOT NULL REFERENCES embeds("id") ON DELETE CASCADE,
    "name" varchar(256) NOT NULL,
    "value" text NOT NULL,
    "inline" bool NOT NULL,
    PRIMARY KEY("id")
);
CREATE INDEX IF NOT EXISTS embed_fields_embed_id ON embed_fields("embed_id");
"#;

/// Everything about an embed except its id
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Queryable,
    Selectable,
    Insertable,
    AsChangeset,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = embeds)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EmbedData {
    pub guild_id: Snowflake,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub colour: i32,
    pub author_name: Option<String>,
    pub author_icon_url: Option<String>,
    pub author_url: Option<String>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub footer_text: Option<String>,
    pub footer_icon_url: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = embed_fields)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EmbedField {
    pub id: i32,
    pub embed_id: i32,
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEmbed {
    pub id: i32,
    #[serde(flatten)]
    pub data: EmbedData,
    pub fields: Vec<EmbedField>,
}

/// Inserts the embed and its fields, call from within a transaction
pub async fn create_with_fields(
    tx: &mut AsyncPgConnection,
    embed: &EmbedData,
    fields: &[NewEmbedField],
) -> Result<i32> {
    let id: i32 = diesel::insert_into(embeds::table)
        .values(embed)
        .returning(embeds::id)
        .get_result(tx)
        .await?;
    insert_fields(tx, id, fields).await?;
    Ok(id)
}

async fn insert_fields(
    tx: &mut AsyncPgConnection,
    embed_id: i32,
    fields: &[NewEmbedField],
) -> Result<()> {
    if fields.is_empty() {
        return Ok(());
    }
    let rows: Vec<_> = fields
        .iter()
        .map(|field| {
            (
                embed_fields::embed_id.eq(embed_id),
                embed_fields::name.eq(&field.name),
                embed_fields::value.eq(&field.value),
                embed_fields::inline.eq(field.inline),
            )
        })
        .collect();
    diesel::insert_into(embed_fields::table)
        .values(rows)
        .execute(tx)
        .await?;
    Ok(())
}

pub async fn get(db: &mut AsyncPgConnection, embed_id: i32) -> Result<Option<CustomEmbed>> {
    let Some(data) = embeds::table
        .find(embed_id)
        .select(EmbedData::as_select())
        .first(db)
        .await
        .optional()?
    else {
        return Ok(None);
    };
    let fields = embed_fields::table
        .filter(embed_fields::embed_id.eq(embed_id))
        .order(embed_fields::id.asc())
        .select(EmbedField::as_select())
        .load(db)
        .await?;
    Ok(Some(CustomEmbed {
        id: embed_id,
        data,
        fields,
    }))
}

/// Overwrites the embed and replaces all of its fields, call from within a transaction
pub async fn update_with_fields(
    tx: &mut AsyncPgConnection,
    embed_id: i32,
    embed: &EmbedData,
    fields: &[NewEmbedField],
) -> Result<()> {
    let updated = diesel::update(embeds::table.find(embed_id))
        .set(embed)
        .execute(tx)
        .await?;
    if updated == 0 {
        return Err(DbError::NotFound);
    }
    diesel::delete(embed_fields::table.filter(embed_fields::embed_id.eq(embed_id)))
        .execute(tx)
        .await?;
    insert_fields(tx, embed_id, fields).await
}

pub async fn delete(db: &mut AsyncPgConnection, embed_id: i32) -> Result<()> {
    diesel::delete(embeds::table.find(embed_id))
        .execute(db)
        .await?;
    Ok(())
}
