use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::schema::{
    discord_entitlements, entitlements, legacy_premium_entitlements, patreon_entitlements,
};
use crate::services::entitlements::entitlement_db::Entitlement;
use crate::services::entitlements::sku_db::SubscriptionTier;
use crate::snowflake::Snowflake;

/// Premium bought before entitlements existed, plus the links from external billing ids to
/// entitlements. Legacy rows are resolved together with entitlements, see
/// [`super::entitlement_db::list_guild_subscriptions`].
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS legacy_premium_entitlements(
    "user_id" int8 NOT NULL,
    "tier" varchar(32) NOT NULL CHECK ("tier" IN ('premium', 'whitelabel')),
    "sku_label" varchar(255) NOT NULL,
    "sku_id" uuid NOT NULL REFERENCES skus("id") ON DELETE CASCADE,
    "expires_at" timestamptz NOT NULL,
    PRIMARY KEY("user_id")
);
CREATE TABLE IF NOT EXISTS patreon_entitlements(
    "entitlement_id" uuid NOT NULL REFERENCES entitlements("id") ON DELETE CASCADE,
    "user_id" int8 NOT NULL,
    PRIMARY KEY("entitlement_id")
);
CREATE INDEX IF NOT EXISTS patreon_entitlements_user_id ON patreon_entitlements("user_id");
CREATE TABLE IF NOT EXISTS discord_entitlements(
    "discord_id" int8 NOT NULL,
    "entitlement_id" uuid NOT NULL UNIQUE REFERENCES entitlements("id") ON DELETE CASCADE,
    PRIMARY KEY("discord_id")
);
"#;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = legacy_premium_entitlements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LegacyPremiumEntitlement {
    pub user_id: Snowflake,
    pub tier: SubscriptionTier,
    pub sku_label: String,
    pub sku_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

pub async fn set_legacy(
    db: &mut AsyncPgConnection,
    entitlement: &LegacyPremiumEntitlement,
) -> Result<()> {
    diesel::insert_into(legacy_premium_entitlements::table)
        .values(entitlement)
        .on_conflict(legacy_premium_entitlements::user_id)
        .do_update()
        .set((
            legacy_premium_entitlements::tier.eq(excluded(legacy_premium_entitlements::tier)),
            legacy_premium_entitlements::sku_label
                .eq(excluded(legacy_premium_entitlements::sku_label)),
            legacy_premium_entitlements::sku_id.eq(excluded(legacy_premium_entitlements::sku_id)),
            legacy_premium_entitlements::expires_at
                .eq(excluded(legacy_premium_entitlements::expires_at)),
        ))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_legacy(
    db: &mut AsyncPgConnection,
    user_id: Snowflake,
) -> Result<Option<LegacyPremiumEntitlement>> {
    Ok(legacy_premium_entitlements::table
        .find(user_id)
        .select(LegacyPremiumEntitlement::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn delete_legacy(db: &mut AsyncPgConnection, user_id: Snowflake) -> Result<()> {
    diesel::delete(legacy_premium_entitlements::table.find(user_id))
        .execute(db)
        .await?;
    Ok(())
}

/// Links a patron to the entitlement created for their pledge
pub async fn set_patreon(
    db: &mut AsyncPgConnection,
    entitlement_id: Uuid,
    user_id: Snowflake,
) -> Result<()> {
    diesel::insert_into(patreon_entitlements::table)
        .values((
            patreon_entitlements::entitlement_id.eq(entitlement_id),
            patreon_entitlements::user_id.eq(user_id),
        ))
        .on_conflict_do_nothing()
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list_patreon(
    db: &mut AsyncPgConnection,
    user_id: Snowflake,
) -> Result<Vec<Entitlement>> {
    Ok(patreon_entitlements::table
        .inner_join(entitlements::table)
        .filter(patreon_entitlements::user_id.eq(user_id))
        .order(entitlements::id.asc())
        .select(Entitlement::as_select())
        .load(db)
        .await?)
}

/// Links an entitlement of the chat platform's store to ours
pub async fn set_discord(
    db: &mut AsyncPgConnection,
    discord_id: Snowflake,
    entitlement_id: Uuid,
) -> Result<()> {
    diesel::insert_into(discord_entitlements::table)
        .values((
            discord_entitlements::discord_id.eq(discord_id),
            discord_entitlements::entitlement_id.eq(entitlement_id),
        ))
        .on_conflict(discord_entitlements::discord_id)
        .do_update()
        .set(discord_entitlements::entitlement_id.eq(entitlement_id))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_discord(
    db: &mut AsyncPgConnection,
    discord_id: Snowflake,
) -> Result<Option<Entitlement>> {
    Ok(discord_entitlements::table
        .inner_join(entitlements::table)
        .filter(discord_entitlements::discord_id.eq(discord_id))
        .select(Entitlement::as_select())
        .first(db)
        .await
        .optional()?)
}
