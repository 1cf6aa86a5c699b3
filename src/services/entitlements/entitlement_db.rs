use chrono::{DateTime, TimeDelta, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Integer, Interval, Nullable, Text, Timestamptz};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::interval::to_interval;
use crate::schema::{entitlements, multi_server_entitlement_guilds};
use crate::services::entitlements::sku_db::SubscriptionTier;
use crate::snowflake::Snowflake;
use crate::sql_enum::text_enum;

/// An entitlement belongs to a guild, a user, or both. Multi server entitlements reach the
/// guilds listed for them in `multi_server_entitlement_guilds`, oldest assignments first, up to
/// the SKU's `servers_permitted`.
pub const SCHEMA: &str = r#"
CREATE EXTENSION IF NOT EXISTS "uuid-ossp";
CREATE TABLE IF NOT EXISTS entitlements(
    "id" uuid NOT NULL DEFAULT uuid_generate_v4(),
    "guild_id" int8,
    "user_id" int8,
    "sku_id" uuid NOT NULL REFERENCES skus("id") ON DELETE CASCADE,
    "source" varchar(32) NOT NULL CHECK ("source" IN ('platform_subscription', 'patreon', 'legacy', 'vote_credit', 'multi_server', 'discord_store')),
    "expires_at" timestamptz,
    CHECK ("guild_id" IS NOT NULL OR "user_id" IS NOT NULL),
    PRIMARY KEY("id")
);
CREATE INDEX IF NOT EXISTS entitlements_guild_id ON entitlements("guild_id");
CREATE INDEX IF NOT EXISTS entitlements_user_id ON entitlements("user_id");
CREATE INDEX IF NOT EXISTS entitlements_source ON entitlements("source");
CREATE TABLE IF NOT EXISTS multi_server_entitlement_guilds(
    "entitlement_id" uuid NOT NULL REFERENCES entitlements("id") ON DELETE CASCADE,
    "guild_id" int8 NOT NULL,
    "assigned_at" timestamptz NOT NULL DEFAULT NOW(),
    PRIMARY KEY("entitlement_id", "guild_id")
);
CREATE INDEX IF NOT EXISTS multi_server_entitlement_guilds_guild_id ON multi_server_entitlement_guilds("guild_id");
"#;

text_enum! {
    pub enum EntitlementSource {
        PlatformSubscription => "platform_subscription",
        Patreon => "patreon",
        Legacy => "legacy",
        VoteCredit => "vote_credit",
        MultiServer => "multi_server",
        DiscordStore => "discord_store",
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = entitlements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Entitlement {
    pub id: Uuid,
    pub guild_id: Option<Snowflake>,
    pub user_id: Option<Snowflake>,
    pub sku_id: Uuid,
    pub source: EntitlementSource,
    /// [`None`] never expires
    pub expires_at: Option<DateTime<Utc>>,
}

/// One subscription reaching a guild or user, with the SKU that grants it. Legacy premium rows
/// have no entitlement id.
#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize, Deserialize)]
pub struct Subscription {
    #[diesel(sql_type = Nullable<diesel::sql_types::Uuid>)]
    pub id: Option<Uuid>,
    #[diesel(sql_type = Text)]
    pub source: EntitlementSource,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    pub expires_at: Option<DateTime<Utc>>,
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub sku_id: Uuid,
    #[diesel(sql_type = Text)]
    pub sku_label: String,
    #[diesel(sql_type = Text)]
    pub tier: SubscriptionTier,
    #[diesel(sql_type = Integer)]
    pub priority: i32,
}

/// Whether an entitlement expiring at `expires_at` still counts at `now`, allowing `grace`
/// after expiry. Mirrors the filter of the resolution queries below.
pub fn is_active_at(
    expires_at: Option<DateTime<Utc>>,
    grace: TimeDelta,
    now: DateTime<Utc>,
) -> bool {
    match expires_at {
        None => true,
        Some(expires_at) => expires_at
            .checked_add_signed(grace)
            .map_or(true, |deadline| now <= deadline),
    }
}

/// Call from within a transaction
pub async fn create(
    tx: &mut AsyncPgConnection,
    guild_id: Option<Snowflake>,
    user_id: Option<Snowflake>,
    sku_id: Uuid,
    source: EntitlementSource,
    expires_at: Option<DateTime<Utc>>,
) -> Result<Entitlement> {
    Ok(diesel::insert_into(entitlements::table)
        .values((
            entitlements::guild_id.eq(guild_id),
            entitlements::user_id.eq(user_id),
            entitlements::sku_id.eq(sku_id),
            entitlements::source.eq(source),
            entitlements::expires_at.eq(expires_at),
        ))
        .returning(Entitlement::as_returning())
        .get_result(tx)
        .await?)
}

/// Call from within a transaction
pub async fn delete_by_id(tx: &mut AsyncPgConnection, id: Uuid) -> Result<()> {
    diesel::delete(entitlements::table.find(id))
        .execute(tx)
        .await?;
    Ok(())
}

pub async fn get_by_id(db: &mut AsyncPgConnection, id: Uuid) -> Result<Option<Entitlement>> {
    Ok(entitlements::table
        .find(id)
        .select(Entitlement::as_select())
        .first(db)
        .await
        .optional()?)
}

/// Every entitlement from one source, expired ones included, for reconcilers
pub async fn list_from_source(
    db: &mut AsyncPgConnection,
    source: EntitlementSource,
) -> Result<Vec<Entitlement>> {
    Ok(entitlements::table
        .filter(entitlements::source.eq(source))
        .order(entitlements::id.asc())
        .select(Entitlement::as_select())
        .load(db)
        .await?)
}

pub async fn set_expiry(
    db: &mut AsyncPgConnection,
    id: Uuid,
    expires_at: Option<DateTime<Utc>>,
) -> Result<()> {
    diesel::update(entitlements::table.find(id))
        .set(entitlements::expires_at.eq(expires_at))
        .execute(db)
        .await?;
    Ok(())
}

/// Subscriptions that reach `guild_id`, highest priority first.
///
/// An entitlement reaches the guild when it was granted to the guild, when the owner holds it
/// for a global SKU, or when the owner holds a multi server SKU and assigned this guild to one
/// of its slots. The owner's legacy premium counts as well. Vote credits only count with
/// `include_voting`.
pub async fn list_guild_subscriptions(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    owner_id: Snowflake,
    grace_period: TimeDelta,
    include_voting: bool,
) -> Result<Vec<Subscription>> {
    Ok(diesel::sql_query(
        r#"
SELECT * FROM (
    SELECT
        entitlements.id AS id,
        entitlements.source AS source,
        entitlements.expires_at AS expires_at,
        skus.id AS sku_id,
        skus.label AS sku_label,
        subscription_skus.tier AS tier,
        subscription_skus.priority AS priority
    FROM entitlements
    INNER JOIN skus ON skus.id = entitlements.sku_id
    INNER JOIN subscription_skus ON subscription_skus.sku_id = entitlements.sku_id
    WHERE (entitlements.expires_at IS NULL OR entitlements.expires_at + $3 >= NOW())
        AND ($4 OR entitlements.source <> 'vote_credit')
        AND (
            entitlements.guild_id = $1
            OR (entitlements.user_id = $2 AND subscription_skus.is_global)
            OR (entitlements.user_id = $2 AND EXISTS (
                SELECT 1
                FROM (
                    SELECT
                        multi_server_entitlement_guilds.guild_id,
                        ROW_NUMBER() OVER (ORDER BY multi_server_entitlement_guilds.assigned_at, multi_server_entitlement_guilds.guild_id) AS slot
                    FROM multi_server_entitlement_guilds
                    WHERE multi_server_entitlement_guilds.entitlement_id = entitlements.id
                ) AS assigned
                INNER JOIN multi_server_skus ON multi_server_skus.sku_id = entitlements.sku_id
                WHERE assigned.guild_id = $1 AND assigned.slot <= multi_server_skus.servers_permitted
            ))
        )
    UNION ALL
    SELECT
        NULL::uuid AS id,
        'legacy' AS source,
        legacy_premium_entitlements.expires_at AS expires_at,
        legacy_premium_entitlements.sku_id AS sku_id,
        legacy_premium_entitlements.sku_label AS sku_label,
        legacy_premium_entitlements.tier AS tier,
        subscription_skus.priority AS priority
    FROM legacy_premium_entitlements
    INNER JOIN subscription_skus ON subscription_skus.sku_id = legacy_premium_entitlements.sku_id
    WHERE legacy_premium_entitlements.user_id = $2
        AND legacy_premium_entitlements.expires_at + $3 >= NOW()
) AS subscriptions
ORDER BY priority DESC, expires_at DESC NULLS FIRST;"#,
    )
    .bind::<BigInt, _>(guild_id)
    .bind::<BigInt, _>(owner_id)
    .bind::<Interval, _>(to_interval(grace_period)?)
    .bind::<Bool, _>(include_voting)
    .load(db)
    .await?)
}

/// Tiers of every subscription reaching the guild, highest priority first
pub async fn get_guild_tiers(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    owner_id: Snowflake,
    grace_period: TimeDelta,
    include_voting: bool,
) -> Result<Vec<SubscriptionTier>> {
    Ok(
        list_guild_subscriptions(db, guild_id, owner_id, grace_period, include_voting)
            .await?
            .into_iter()
            .map(|subscription| subscription.tier)
            .collect(),
    )
}

/// The guild's effective tier, [`None`] for free guilds
pub async fn get_guild_max_tier(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    owner_id: Snowflake,
    grace_period: TimeDelta,
    include_voting: bool,
) -> Result<Option<SubscriptionTier>> {
    Ok(get_guild_tiers(db, guild_id, owner_id, grace_period, include_voting)
        .await?
        .into_iter()
        .next())
}

/// Subscriptions held by the user themselves, highest priority first
pub async fn list_user_subscriptions(
    db: &mut AsyncPgConnection,
    user_id: Snowflake,
    grace_period: TimeDelta,
) -> Result<Vec<Subscription>> {
    Ok(diesel::sql_query(
        r#"
SELECT
    entitlements.id AS id,
    entitlements.source AS source,
    entitlements.expires_at AS expires_at,
    skus.id AS sku_id,
    skus.label AS sku_label,
    subscription_skus.tier AS tier,
    subscription_skus.priority AS priority
FROM entitlements
INNER JOIN skus ON skus.id = entitlements.sku_id
INNER JOIN subscription_skus ON subscription_skus.sku_id = entitlements.sku_id
WHERE entitlements.user_id = $1
    AND (entitlements.expires_at IS NULL OR entitlements.expires_at + $2 >= NOW())
ORDER BY subscription_skus.priority DESC, entitlements.expires_at DESC NULLS FIRST;"#,
    )
    .bind::<BigInt, _>(user_id)
    .bind::<Interval, _>(to_interval(grace_period)?)
    .load(db)
    .await?)
}

/// Assigns the guild to a free slot of a multi server entitlement. Returns `false` when every
/// slot is taken or the entitlement is not for a multi server SKU. Call from within a
/// transaction, the entitlement row is locked so concurrent assignments can't overfill it.
pub async fn assign_guild(
    tx: &mut AsyncPgConnection,
    entitlement_id: Uuid,
    guild_id: Snowflake,
) -> Result<bool> {
    let locked = entitlements::table
        .find(entitlement_id)
        .select(entitlements::id)
        .for_update()
        .first::<Uuid>(tx)
        .await
        .optional()?;
    if locked.is_none() {
        return Ok(false);
    }

    let inserted = diesel::sql_query(
        r#"
INSERT INTO multi_server_entitlement_guilds("entitlement_id", "guild_id", "assigned_at")
SELECT entitlements.id, $2, NOW()
FROM entitlements
INNER JOIN multi_server_skus ON multi_server_skus.sku_id = entitlements.sku_id
WHERE entitlements.id = $1
    AND (
        SELECT COUNT(*) FROM multi_server_entitlement_guilds WHERE "entitlement_id" = $1
    ) < multi_server_skus.servers_permitted
ON CONFLICT DO NOTHING;"#,
    )
    .bind::<diesel::sql_types::Uuid, _>(entitlement_id)
    .bind::<BigInt, _>(guild_id)
    .execute(tx)
    .await?;
    Ok(inserted > 0)
}

pub async fn unassign_guild(
    db: &mut AsyncPgConnection,
    entitlement_id: Uuid,
    guild_id: Snowflake,
) -> Result<()> {
    diesel::delete(multi_server_entitlement_guilds::table.find((entitlement_id, guild_id)))
        .execute(db)
        .await?;
    Ok(())
}

/// Guilds assigned to the entitlement, in slot order
pub async fn get_assigned_guilds(
    db: &mut AsyncPgConnection,
    entitlement_id: Uuid,
) -> Result<Vec<Snowflake>> {
    Ok(multi_server_entitlement_guilds::table
        .filter(multi_server_entitlement_guilds::entitlement_id.eq(entitlement_id))
        .order((
            multi_server_entitlement_guilds::assigned_at.asc(),
            multi_server_entitlement_guilds::guild_id.asc(),
        ))
        .select(multi_server_entitlement_guilds::guild_id)
        .load(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn grace_period_extends_expiry_inclusively() {
        let expiry = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let grace = TimeDelta::days(1);

        assert!(is_active_at(Some(expiry), grace, expiry));
        assert!(is_active_at(Some(expiry), grace, expiry + grace));
        assert!(!is_active_at(
            Some(expiry),
            grace,
            expiry + grace + TimeDelta::seconds(1)
        ));
    }

    #[test]
    fn zero_grace_and_no_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert!(is_active_at(None, TimeDelta::zero(), now));
        assert!(!is_active_at(
            Some(now - TimeDelta::seconds(1)),
            TimeDelta::zero(),
            now
        ));
    }

    #[test]
    fn sources_match_check_constraint() {
        assert!(SCHEMA.contains(&EntitlementSource::sql_values()));
        assert_eq!(EntitlementSource::VoteCredit.as_str(), "vote_credit");
    }
}
