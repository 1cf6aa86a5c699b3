use std::collections::HashMap;

use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::{
    custom_integration_guilds, custom_integration_secret_values, custom_integration_secrets,
    custom_integrations,
};
use crate::services::integrations::integration_db::CustomIntegration;
use crate::snowflake::Snowflake;

/// Secret values hang off the activation, removing an integration from a guild forgets the
/// secrets the guild supplied for it.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS custom_integration_guilds(
    "integration_id" int4 NOT NULL REFERENCES custom_integrations("id") ON DELETE CASCADE,
    "guild_id" int8 NOT NULL,
    PRIMARY KEY("integration_id", "guild_id")
);
CREATE INDEX IF NOT EXISTS custom_integration_guilds_guild_id ON custom_integration_guilds("guild_id");
CREATE TABLE IF NOT EXISTS custom_integration_secret_values(
    "secret_id" int4 NOT NULL,
    "integration_id" int4 NOT NULL,
    "guild_id" int8 NOT NULL,
    "value" text NOT NULL,
    FOREIGN KEY("secret_id", "integration_id") REFERENCES custom_integration_secrets("id", "integration_id") ON DELETE CASCADE,
    FOREIGN KEY("integration_id", "guild_id") REFERENCES custom_integration_guilds("integration_id", "guild_id") ON DELETE CASCADE,
    PRIMARY KEY("secret_id", "guild_id")
);
CREATE INDEX IF NOT EXISTS custom_integration_secret_values_integration_guild ON custom_integration_secret_values("integration_id", "guild_id");
"#;

#[derive(Debug, Clone, PartialEq, Queryable, Serialize, Deserialize)]
pub struct SecretValue {
    pub secret_id: i32,
    pub name: String,
    pub value: String,
}

pub async fn add_to_guild(
    db: &mut AsyncPgConnection,
    integration_id: i32,
    guild_id: Snowflake,
) -> Result<()> {
    diesel::insert_into(custom_integration_guilds::table)
        .values((
            custom_integration_guilds::integration_id.eq(integration_id),
            custom_integration_guilds::guild_id.eq(guild_id),
        ))
        .on_conflict_do_nothing()
        .execute(db)
        .await?;
    Ok(())
}

/// Activates the integration and stores the guild's secret values, keyed by secret id. Call
/// from within a transaction.
pub async fn add_to_guild_with_secrets(
    tx: &mut AsyncPgConnection,
    integration_id: i32,
    guild_id: Snowflake,
    secrets: &HashMap<i32, String>,
) -> Result<()> {
    add_to_guild(tx, integration_id, guild_id).await?;
    update_secret_values(tx, integration_id, guild_id, secrets).await
}

pub async fn remove_from_guild(
    db: &mut AsyncPgConnection,
    integration_id: i32,
    guild_id: Snowflake,
) -> Result<()> {
    diesel::delete(custom_integration_guilds::table.find((integration_id, guild_id)))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn is_active(
    db: &mut AsyncPgConnection,
    integration_id: i32,
    guild_id: Snowflake,
) -> Result<bool> {
    Ok(diesel::select(diesel::dsl::exists(
        custom_integration_guilds::table.find((integration_id, guild_id)),
    ))
    .get_result(db)
    .await?)
}

pub async fn get_guild_integrations(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
) -> Result<Vec<CustomIntegration>> {
    Ok(custom_integration_guilds::table
        .inner_join(custom_integrations::table)
        .filter(custom_integration_guilds::guild_id.eq(guild_id))
        .order(custom_integrations::id.asc())
        .select(CustomIntegration::as_select())
        .load(db)
        .await?)
}

pub async fn get_guild_integration_count(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
) -> Result<i64> {
    Ok(custom_integration_guilds::table
        .filter(custom_integration_guilds::guild_id.eq(guild_id))
        .count()
        .get_result(db)
        .await?)
}

/// Upserts the guild's values, keyed by secret id. Secrets added to the integration after the
/// guild activated it are inserted, existing values are overwritten and values not mentioned
/// are left alone.
pub async fn update_secret_values(
    db: &mut AsyncPgConnection,
    integration_id: i32,
    guild_id: Snowflake,
    values: &HashMap<i32, String>,
) -> Result<()> {
    if values.is_empty() {
        return Ok(());
    }
    let rows: Vec<_> = values
        .iter()
        .map(|(secret_id, value)| {
            (
                custom_integration_secret_values::secret_id.eq(*secret_id),
                custom_integration_secret_values::integration_id.eq(integration_id),
                custom_integration_secret_values::guild_id.eq(guild_id),
                custom_integration_secret_values::value.eq(value),
            )
        })
        .collect();
    diesel::insert_into(custom_integration_secret_values::table)
        .values(rows)
        .on_conflict((
            custom_integration_secret_values::secret_id,
            custom_integration_secret_values::guild_id,
        ))
        .do_update()
        .set(
            custom_integration_secret_values::value
                .eq(excluded(custom_integration_secret_values::value)),
        )
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_secret_values(
    db: &mut AsyncPgConnection,
    integration_id: i32,
    guild_id: Snowflake,
) -> Result<Vec<SecretValue>> {
    Ok(custom_integration_secret_values::table
        .inner_join(custom_integration_secrets::table)
        .filter(custom_integration_secret_values::integration_id.eq(integration_id))
        .filter(custom_integration_secret_values::guild_id.eq(guild_id))
        .order(custom_integration_secret_values::secret_id.asc())
        .select((
            custom_integration_secret_values::secret_id,
            custom_integration_secrets::name,
            custom_integration_secret_values::value,
        ))
        .load(db)
        .await?)
}
