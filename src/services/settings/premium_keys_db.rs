use chrono::{DateTime, TimeDelta, Utc};
use diesel::pg::data_types::PgInterval;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::interval::{from_interval, to_interval};
use crate::schema::{premium_keys, used_keys};
use crate::snowflake::Snowflake;

/// Redeemable keys granting an SKU for `length`. Redeeming deletes the key and records it in
/// `used_keys`.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS premium_keys(
    "key" uuid NOT NULL UNIQUE,
    "length" interval NOT NULL,
    "sku_id" uuid NOT NULL REFERENCES skus("id") ON DELETE CASCADE,
    "generated_at" timestamptz NOT NULL,
    PRIMARY KEY("key")
);
CREATE TABLE IF NOT EXISTS used_keys(
    "key" uuid NOT NULL UNIQUE,
    "guild_id" int8 NOT NULL,
    "activated_by" int8 NOT NULL,
    "activated_at" timestamptz NOT NULL,
    PRIMARY KEY("key")
);
CREATE INDEX IF NOT EXISTS used_keys_guild_id ON used_keys("guild_id");
"#;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = used_keys)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UsedKey {
    pub key: Uuid,
    pub guild_id: Snowflake,
    pub activated_by: Snowflake,
    pub activated_at: DateTime<Utc>,
}

pub async fn create(
    db: &mut AsyncPgConnection,
    key: Uuid,
    length: TimeDelta,
    sku_id: Uuid,
) -> Result<()> {
    diesel::insert_into(premium_keys::table)
        .values((
            premium_keys::key.eq(key),
            premium_keys::length.eq(to_interval(length)?),
            premium_keys::sku_id.eq(sku_id),
            premium_keys::generated_at.eq(diesel::dsl::now),
        ))
        .execute(db)
        .await?;
    Ok(())
}

/// Removes the key, returning how long it grants and for which SKU. [`None`] for unknown or
/// already redeemed keys.
pub async fn delete(db: &mut AsyncPgConnection, key: Uuid) -> Result<Option<(TimeDelta, Uuid)>> {
    let deleted: Option<(PgInterval, Uuid)> = diesel::delete(premium_keys::table.find(key))
        .returning((premium_keys::length, premium_keys::sku_id))
        .get_result(db)
        .await
        .optional()?;
    Ok(deleted.map(|(length, sku_id)| (from_interval(length), sku_id)))
}

pub async fn set_used(
    db: &mut AsyncPgConnection,
    key: Uuid,
    guild_id: Snowflake,
    activated_by: Snowflake,
) -> Result<()> {
    diesel::insert_into(used_keys::table)
        .values((
            used_keys::key.eq(key),
            used_keys::guild_id.eq(guild_id),
            used_keys::activated_by.eq(activated_by),
            used_keys::activated_at.eq(diesel::dsl::now),
        ))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_used(db: &mut AsyncPgConnection, key: Uuid) -> Result<Option<UsedKey>> {
    Ok(used_keys::table
        .find(key)
        .select(UsedKey::as_select())
        .first(db)
        .await
        .optional()?)
}
