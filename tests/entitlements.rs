mod common;

use chrono::{DateTime, TimeDelta, Utc};
use diesel_async::scoped_futures::ScopedFutureExt;
use ticket_db::services::entitlements::entitlement_db::{self, Entitlement, EntitlementSource};
use ticket_db::services::entitlements::legacy_db::{self, LegacyPremiumEntitlement};
use ticket_db::services::entitlements::sku_db::{self, SubscriptionSku, SubscriptionTier};
use ticket_db::{Database, Snowflake};
use uuid::Uuid;

async fn subscription_sku(
    db: &Database,
    tier: SubscriptionTier,
    priority: i32,
    is_global: bool,
) -> SubscriptionSku {
    let label = common::label("sku");
    db.with_tx(|tx| {
        async move { sku_db::create_subscription(tx, &label, tier, priority, is_global).await }
            .scope_boxed()
    })
    .await
    .unwrap()
}

async fn grant(
    db: &Database,
    guild_id: Option<Snowflake>,
    user_id: Option<Snowflake>,
    sku_id: Uuid,
    source: EntitlementSource,
    expires_at: Option<DateTime<Utc>>,
) -> Entitlement {
    db.with_tx(|tx| {
        async move {
            entitlement_db::create(tx, guild_id, user_id, sku_id, source, expires_at).await
        }
        .scope_boxed()
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn global_user_sku_outranks_guild_sku() {
    let Some(db) = common::connect().await else {
        return;
    };
    let guild = common::snowflake();
    let owner = common::snowflake();
    let premium = subscription_sku(&db, SubscriptionTier::Premium, 10, false).await;
    let whitelabel = subscription_sku(&db, SubscriptionTier::Whitelabel, 20, true).await;

    grant(&db, Some(guild), None, premium.id, EntitlementSource::PlatformSubscription, None).await;
    grant(&db, None, Some(owner), whitelabel.id, EntitlementSource::Patreon, None).await;

    let mut conn = db.conn().await.unwrap();
    let tier = entitlement_db::get_guild_max_tier(&mut conn, guild, owner, TimeDelta::zero(), false)
        .await
        .unwrap();
    assert_eq!(tier, Some(SubscriptionTier::Whitelabel));

    let tiers = entitlement_db::get_guild_tiers(&mut conn, guild, owner, TimeDelta::zero(), false)
        .await
        .unwrap();
    assert_eq!(tiers, vec![SubscriptionTier::Whitelabel, SubscriptionTier::Premium]);
}

#[tokio::test]
async fn free_guild_has_no_tier() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let tier = entitlement_db::get_guild_max_tier(
        &mut conn,
        common::snowflake(),
        common::snowflake(),
        TimeDelta::days(1),
        true,
    )
    .await
    .unwrap();
    assert_eq!(tier, None);
}

#[tokio::test]
async fn grace_period_extends_expired_entitlements() {
    let Some(db) = common::connect().await else {
        return;
    };
    let guild = common::snowflake();
    let owner = common::snowflake();
    let sku = subscription_sku(&db, SubscriptionTier::Premium, 1, false).await;
    grant(
        &db,
        Some(guild),
        None,
        sku.id,
        EntitlementSource::PlatformSubscription,
        Some(Utc::now() - TimeDelta::hours(1)),
    )
    .await;

    let mut conn = db.conn().await.unwrap();
    let within = entitlement_db::get_guild_max_tier(&mut conn, guild, owner, TimeDelta::hours(2), false)
        .await
        .unwrap();
    assert_eq!(within, Some(SubscriptionTier::Premium));

    let past = entitlement_db::get_guild_max_tier(&mut conn, guild, owner, TimeDelta::minutes(30), false)
        .await
        .unwrap();
    assert_eq!(past, None);
}

#[tokio::test]
async fn vote_credits_only_count_when_asked_for() {
    let Some(db) = common::connect().await else {
        return;
    };
    let guild = common::snowflake();
    let owner = common::snowflake();
    let sku = subscription_sku(&db, SubscriptionTier::Premium, 1, false).await;
    grant(
        &db,
        Some(guild),
        None,
        sku.id,
        EntitlementSource::VoteCredit,
        Some(Utc::now() + TimeDelta::hours(12)),
    )
    .await;

    let mut conn = db.conn().await.unwrap();
    let without = entitlement_db::list_guild_subscriptions(&mut conn, guild, owner, TimeDelta::zero(), false)
        .await
        .unwrap();
    assert!(without.is_empty());

    let with = entitlement_db::list_guild_subscriptions(&mut conn, guild, owner, TimeDelta::zero(), true)
        .await
        .unwrap();
    assert_eq!(with.len(), 1);
    assert_eq!(with[0].source, EntitlementSource::VoteCredit);
}

#[tokio::test]
async fn deleted_entitlements_leave_their_source_listing() {
    let Some(db) = common::connect().await else {
        return;
    };
    let sku = subscription_sku(&db, SubscriptionTier::Premium, 1, false).await;
    let entitlement = grant(
        &db,
        None,
        Some(common::snowflake()),
        sku.id,
        EntitlementSource::DiscordStore,
        None,
    )
    .await;

    let mut conn = db.conn().await.unwrap();
    let listed = entitlement_db::list_from_source(&mut conn, EntitlementSource::DiscordStore)
        .await
        .unwrap();
    assert!(listed.iter().any(|e| e.id == entitlement.id));

    let id = entitlement.id;
    db.with_tx(|tx| async move { entitlement_db::delete_by_id(tx, id).await }.scope_boxed())
        .await
        .unwrap();
    let listed = entitlement_db::list_from_source(&mut conn, EntitlementSource::DiscordStore)
        .await
        .unwrap();
    assert!(!listed.iter().any(|e| e.id == id));
    assert!(entitlement_db::get_by_id(&mut conn, id).await.unwrap().is_none());
}

#[tokio::test]
async fn multi_server_entitlements_fill_their_slots() {
    let Some(db) = common::connect().await else {
        return;
    };
    let owner = common::snowflake();
    let (first, second) = (common::snowflake(), common::snowflake());
    let sku = subscription_sku(&db, SubscriptionTier::Premium, 5, false).await;
    {
        let mut conn = db.conn().await.unwrap();
        sku_db::set_servers_permitted(&mut conn, sku.id, 1).await.unwrap();
        assert_eq!(sku_db::get_servers_permitted(&mut conn, sku.id).await.unwrap(), Some(1));
    }
    let entitlement = grant(&db, None, Some(owner), sku.id, EntitlementSource::MultiServer, None).await;
    let id = entitlement.id;

    let assigned = db
        .with_tx(|tx| async move { entitlement_db::assign_guild(tx, id, first).await }.scope_boxed())
        .await
        .unwrap();
    assert!(assigned);
    let overflow = db
        .with_tx(|tx| async move { entitlement_db::assign_guild(tx, id, second).await }.scope_boxed())
        .await
        .unwrap();
    assert!(!overflow);

    let mut conn = db.conn().await.unwrap();
    assert_eq!(entitlement_db::get_assigned_guilds(&mut conn, id).await.unwrap(), vec![first]);
    assert_eq!(
        entitlement_db::get_guild_max_tier(&mut conn, first, owner, TimeDelta::zero(), false)
            .await
            .unwrap(),
        Some(SubscriptionTier::Premium)
    );
    assert_eq!(
        entitlement_db::get_guild_max_tier(&mut conn, second, owner, TimeDelta::zero(), false)
            .await
            .unwrap(),
        None
    );

    entitlement_db::unassign_guild(&mut conn, id, first).await.unwrap();
    let moved = db
        .with_tx(|tx| async move { entitlement_db::assign_guild(tx, id, second).await }.scope_boxed())
        .await
        .unwrap();
    assert!(moved);
}

#[tokio::test]
async fn legacy_premium_reaches_the_owners_guilds() {
    let Some(db) = common::connect().await else {
        return;
    };
    let owner = common::snowflake();
    let guild = common::snowflake();
    let sku = subscription_sku(&db, SubscriptionTier::Premium, 3, false).await;

    let mut conn = db.conn().await.unwrap();
    let legacy = LegacyPremiumEntitlement {
        user_id: owner,
        tier: SubscriptionTier::Premium,
        sku_label: sku.label.clone(),
        sku_id: sku.id,
        expires_at: Utc::now() + TimeDelta::days(30),
    };
    legacy_db::set_legacy(&mut conn, &legacy).await.unwrap();
    assert!(legacy_db::get_legacy(&mut conn, owner).await.unwrap().is_some());

    let subscriptions = entitlement_db::list_guild_subscriptions(&mut conn, guild, owner, TimeDelta::zero(), false)
        .await
        .unwrap();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].id, None);
    assert_eq!(subscriptions[0].source, EntitlementSource::Legacy);
    assert_eq!(subscriptions[0].sku_id, sku.id);

    legacy_db::delete_legacy(&mut conn, owner).await.unwrap();
    assert!(entitlement_db::list_guild_subscriptions(&mut conn, guild, owner, TimeDelta::zero(), false)
        .await
        .unwrap()
        .is_empty());
}
