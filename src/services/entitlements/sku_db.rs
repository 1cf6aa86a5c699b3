use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::schema::{discord_store_skus, multi_server_skus, skus, subscription_skus};
use crate::snowflake::Snowflake;
use crate::sql_enum::text_enum;

/// A multi server SKU is a subscription SKU with an extra `multi_server_skus` row capping how
/// many guilds one purchase may be assigned to.
pub const SCHEMA: &str = r#"
CREATE EXTENSION IF NOT EXISTS "uuid-ossp";
CREATE TABLE IF NOT EXISTS skus(
    "id" uuid NOT NULL DEFAULT uuid_generate_v4(),
    "label" varchar(255) NOT NULL UNIQUE,
    "sku_type" varchar(32) NOT NULL CHECK ("sku_type" IN ('subscription', 'consumable')),
    PRIMARY KEY("id")
);
CREATE TABLE IF NOT EXISTS subscription_skus(
    "sku_id" uuid NOT NULL REFERENCES skus("id") ON DELETE CASCADE,
    "tier" varchar(32) NOT NULL CHECK ("tier" IN ('premium', 'whitelabel')),
    "priority" int4 NOT NULL,
    "is_global" bool NOT NULL DEFAULT false,
    PRIMARY KEY("sku_id")
);
CREATE TABLE IF NOT EXISTS multi_server_skus(
    "sku_id" uuid NOT NULL REFERENCES subscription_skus("sku_id") ON DELETE CASCADE,
    "servers_permitted" int4 NOT NULL CHECK ("servers_permitted" > 0),
    PRIMARY KEY("sku_id")
);
CREATE TABLE IF NOT EXISTS discord_store_skus(
    "discord_id" int8 NOT NULL,
    "sku_id" uuid NOT NULL REFERENCES skus("id") ON DELETE CASCADE,
    PRIMARY KEY("discord_id")
);
"#;

text_enum! {
    pub enum SkuType {
        Subscription => "subscription",
        Consumable => "consumable",
    }
}

text_enum! {
    /// The feature set a subscription unlocks. Which one wins when a guild has several is
    /// decided by SKU priority, not by this enum.
    pub enum SubscriptionTier {
        Premium => "premium",
        Whitelabel => "whitelabel",
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = skus)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Sku {
    pub id: Uuid,
    pub label: String,
    pub sku_type: SkuType,
}

#[derive(Debug, Clone, PartialEq, Queryable, Serialize, Deserialize)]
pub struct SubscriptionSku {
    pub id: Uuid,
    pub label: String,
    pub tier: SubscriptionTier,
    pub priority: i32,
    pub is_global: bool,
}

pub async fn create(db: &mut AsyncPgConnection, label: &str, sku_type: SkuType) -> Result<Sku> {
    Ok(diesel::insert_into(skus::table)
        .values((skus::label.eq(label), skus::sku_type.eq(sku_type)))
        .returning(Sku::as_returning())
        .get_result(db)
        .await?)
}

pub async fn get(db: &mut AsyncPgConnection, id: Uuid) -> Result<Option<Sku>> {
    Ok(skus::table
        .find(id)
        .select(Sku::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_by_label(db: &mut AsyncPgConnection, label: &str) -> Result<Option<Sku>> {
    Ok(skus::table
        .filter(skus::label.eq(label))
        .select(Sku::as_select())
        .first(db)
        .await
        .optional()?)
}

/// Creates a subscription SKU with its base row, call from within a transaction
pub async fn create_subscription(
    tx: &mut AsyncPgConnection,
    label: &str,
    tier: SubscriptionTier,
    priority: i32,
    is_global: bool,
) -> Result<SubscriptionSku> {
    let sku = create(tx, label, SkuType::Subscription).await?;
    diesel::insert_into(subscription_skus::table)
        .values((
            subscription_skus::sku_id.eq(sku.id),
            subscription_skus::tier.eq(tier),
            subscription_skus::priority.eq(priority),
            subscription_skus::is_global.eq(is_global),
        ))
        .execute(tx)
        .await?;
    Ok(SubscriptionSku {
        id: sku.id,
        label: sku.label,
        tier,
        priority,
        is_global,
    })
}

pub async fn get_subscription(
    db: &mut AsyncPgConnection,
    id: Uuid,
) -> Result<Option<SubscriptionSku>> {
    Ok(subscription_skus::table
        .inner_join(skus::table)
        .filter(skus::id.eq(id))
        .select((
            skus::id,
            skus::label,
            subscription_skus::tier,
            subscription_skus::priority,
            subscription_skus::is_global,
        ))
        .first(db)
        .await
        .optional()?)
}

pub async fn get_subscription_by_label(
    db: &mut AsyncPgConnection,
    label: &str,
) -> Result<Option<SubscriptionSku>> {
    Ok(subscription_skus::table
        .inner_join(skus::table)
        .filter(skus::label.eq(label))
        .select((
            skus::id,
            skus::label,
            subscription_skus::tier,
            subscription_skus::priority,
            subscription_skus::is_global,
        ))
        .first(db)
        .await
        .optional()?)
}

pub async fn set_servers_permitted(
    db: &mut AsyncPgConnection,
    sku_id: Uuid,
    servers_permitted: i32,
) -> Result<()> {
    diesel::insert_into(multi_server_skus::table)
        .values((
            multi_server_skus::sku_id.eq(sku_id),
            multi_server_skus::servers_permitted.eq(servers_permitted),
        ))
        .on_conflict(multi_server_skus::sku_id)
        .do_update()
        .set(multi_server_skus::servers_permitted.eq(servers_permitted))
        .execute(db)
        .await?;
    Ok(())
}

/// [`None`] for SKUs that only ever apply to a single guild
pub async fn get_servers_permitted(
    db: &mut AsyncPgConnection,
    sku_id: Uuid,
) -> Result<Option<i32>> {
    Ok(multi_server_skus::table
        .find(sku_id)
        .select(multi_server_skus::servers_permitted)
        .first(db)
        .await
        .optional()?)
}

pub async fn set_discord_store_sku(
    db: &mut AsyncPgConnection,
    discord_id: Snowflake,
    sku_id: Uuid,
) -> Result<()> {
    diesel::insert_into(discord_store_skus::table)
        .values((
            discord_store_skus::discord_id.eq(discord_id),
            discord_store_skus::sku_id.eq(sku_id),
        ))
        .on_conflict(discord_store_skus::discord_id)
        .do_update()
        .set(discord_store_skus::sku_id.eq(sku_id))
        .execute(db)
        .await?;
    Ok(())
}

/// Our SKU for a SKU of the chat platform's store
pub async fn get_by_discord_id(
    db: &mut AsyncPgConnection,
    discord_id: Snowflake,
) -> Result<Option<Sku>> {
    Ok(discord_store_skus::table
        .inner_join(skus::table)
        .filter(discord_store_skus::discord_id.eq(discord_id))
        .select(Sku::as_select())
        .first(db)
        .await
        .optional()?)
}
