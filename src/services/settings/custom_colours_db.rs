use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::Result;
use crate::schema::custom_colours;
use crate::snowflake::Snowflake;

/// Per guild overrides of the embed colour palette. `colour_id` is the palette slot, `colour`
/// the RGB value.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS custom_colours(
    "guild_id" int8 NOT NULL,
    "colour_id" int2 NOT NULL,
    "colour" int4 NOT NULL,
    PRIMARY KEY("guild_id", "colour_id")
);
"#;

pub async fn get(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    colour_id: i16,
) -> Result<Option<i32>> {
    Ok(custom_colours::table
        .find((guild_id, colour_id))
        .select(custom_colours::colour)
        .first(db)
        .await
        .optional()?)
}

pub async fn get_all(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<HashMap<i16, i32>> {
    let colours: Vec<(i16, i32)> = custom_colours::table
        .filter(custom_colours::guild_id.eq(guild_id))
        .select((custom_colours::colour_id, custom_colours::colour))
        .load(db)
        .await?;
    Ok(colours.into_iter().collect())
}

pub async fn set(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    colour_id: i16,
    colour: i32,
) -> Result<()> {
    diesel::insert_into(custom_colours::table)
        .values((
            custom_colours::guild_id.eq(guild_id),
            custom_colours::colour_id.eq(colour_id),
            custom_colours::colour.eq(colour),
        ))
        .on_conflict((custom_colours::guild_id, custom_colours::colour_id))
        .do_update()
        .set(custom_colours::colour.eq(colour))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: &mut AsyncPgConnection, guild_id: Snowflake, colour_id: i16) -> Result<()> {
    diesel::delete(custom_colours::table.find((guild_id, colour_id)))
        .execute(db)
        .await?;
    Ok(())
}
