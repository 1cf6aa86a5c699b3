mod common;

use chrono::{SubsecRound, TimeDelta, Utc};
use diesel_async::scoped_futures::ScopedFutureExt;
use ticket_db::services::entitlements::sku_db::{self, SkuType};
use ticket_db::services::settings::modmail_archive_db::{self, ModmailArchive};
use ticket_db::services::settings::user_guilds_db::{self, UserGuild};
use ticket_db::services::settings::whitelabel_db::{self, WhitelabelBot};
use ticket_db::services::settings::{
    custom_colours_db, premium_keys_db, users_can_close_db, votes_db,
};
use uuid::Uuid;

#[tokio::test]
async fn users_can_close_defaults_to_true() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();

    assert!(users_can_close_db::get(&mut conn, guild).await.unwrap());
    users_can_close_db::set(&mut conn, guild, false).await.unwrap();
    assert!(!users_can_close_db::get(&mut conn, guild).await.unwrap());
    users_can_close_db::set(&mut conn, guild, true).await.unwrap();
    assert!(users_can_close_db::get(&mut conn, guild).await.unwrap());
}

#[tokio::test]
async fn custom_colours_store_the_given_value() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();

    custom_colours_db::set(&mut conn, guild, 1, 0x5865f2).await.unwrap();
    custom_colours_db::set(&mut conn, guild, 1, 0xed4245).await.unwrap();
    custom_colours_db::set(&mut conn, guild, 2, 0x57f287).await.unwrap();
    assert_eq!(custom_colours_db::get(&mut conn, guild, 1).await.unwrap(), Some(0xed4245));

    let all = custom_colours_db::get_all(&mut conn, guild).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[&2], 0x57f287);

    custom_colours_db::delete(&mut conn, guild, 1).await.unwrap();
    assert_eq!(custom_colours_db::get(&mut conn, guild, 1).await.unwrap(), None);
}

#[tokio::test]
async fn votes_are_keyed_by_user() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let user = common::snowflake();

    assert!(votes_db::get(&mut conn, user).await.unwrap().is_none());
    assert!(!votes_db::has_voted_within(&mut conn, user, TimeDelta::hours(24)).await.unwrap());
    votes_db::set(&mut conn, user).await.unwrap();
    assert!(votes_db::get(&mut conn, user).await.unwrap().is_some());
    assert!(votes_db::has_voted_within(&mut conn, user, TimeDelta::hours(24)).await.unwrap());
}

#[tokio::test]
async fn redeeming_a_key_returns_its_length_once() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let sku = sku_db::create(&mut conn, &common::label("key-sku"), SkuType::Consumable)
        .await
        .unwrap();
    let key = Uuid::new_v4();
    let guild = common::snowflake();
    let user = common::snowflake();

    premium_keys_db::create(&mut conn, key, TimeDelta::days(30), sku.id)
        .await
        .unwrap();
    assert_eq!(
        premium_keys_db::delete(&mut conn, key).await.unwrap(),
        Some((TimeDelta::days(30), sku.id))
    );
    assert_eq!(premium_keys_db::delete(&mut conn, key).await.unwrap(), None);

    premium_keys_db::set_used(&mut conn, key, guild, user).await.unwrap();
    let used = premium_keys_db::get_used(&mut conn, key)
        .await
        .unwrap()
        .expect("redeemed key is recorded");
    assert_eq!((used.guild_id, used.activated_by), (guild, user));
}

#[tokio::test]
async fn user_guilds_are_replaced_wholesale() {
    let Some(db) = common::connect().await else {
        return;
    };
    let user = common::snowflake();
    let mut guilds = vec![
        UserGuild {
            guild_id: common::snowflake(),
            is_owner: true,
            permissions: 8,
        },
        UserGuild {
            guild_id: common::snowflake(),
            is_owner: false,
            permissions: 0,
        },
    ];
    guilds.sort_by_key(|guild| guild.guild_id);

    let stored = guilds.clone();
    db.with_tx(|tx| async move { user_guilds_db::set(tx, user, &stored).await }.scope_boxed())
        .await
        .unwrap();
    let mut conn = db.conn().await.unwrap();
    assert_eq!(user_guilds_db::get(&mut conn, user).await.unwrap(), guilds);

    let kept = vec![guilds[1].clone()];
    let stored = kept.clone();
    db.with_tx(|tx| async move { user_guilds_db::set(tx, user, &stored).await }.scope_boxed())
        .await
        .unwrap();
    assert_eq!(user_guilds_db::get(&mut conn, user).await.unwrap(), kept);
}

#[tokio::test]
async fn modmail_archives_keep_every_column() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let archive = ModmailArchive {
        uuid: Uuid::new_v4(),
        guild_id: common::snowflake(),
        user_id: common::snowflake(),
        close_time: Utc::now().trunc_subsecs(3),
    };

    modmail_archive_db::set(&mut conn, &archive).await.unwrap();
    assert_eq!(
        modmail_archive_db::get(&mut conn, archive.uuid).await.unwrap(),
        Some(archive.clone())
    );
    assert_eq!(
        modmail_archive_db::get_by_member(&mut conn, archive.guild_id, archive.user_id)
            .await
            .unwrap(),
        vec![archive]
    );
}

#[tokio::test]
async fn whitelabel_bots_follow_their_owner() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let user = common::snowflake();
    let guild = common::snowflake();
    let bot = WhitelabelBot {
        user_id: user,
        bot_id: common::snowflake(),
        token: common::label("token"),
        public_key: "a".repeat(64),
    };

    whitelabel_db::set(&mut conn, &bot).await.unwrap();
    assert_eq!(
        whitelabel_db::get_by_token(&mut conn, &bot.token).await.unwrap(),
        Some(bot.clone())
    );
    whitelabel_db::add_guild(&mut conn, bot.bot_id, guild).await.unwrap();
    assert_eq!(whitelabel_db::get_bot_by_guild(&mut conn, guild).await.unwrap(), Some(bot.bot_id));

    let replacement = WhitelabelBot {
        bot_id: common::snowflake(),
        token: common::label("token"),
        ..bot.clone()
    };
    whitelabel_db::set(&mut conn, &replacement).await.unwrap();
    assert_eq!(
        whitelabel_db::get_guilds(&mut conn, replacement.bot_id).await.unwrap(),
        vec![guild]
    );
    assert!(whitelabel_db::get_by_bot_id(&mut conn, bot.bot_id).await.unwrap().is_none());

    whitelabel_db::append_error(&mut conn, user, &"x".repeat(300)).await.unwrap();
    whitelabel_db::append_error(&mut conn, user, "invalid token").await.unwrap();
    let errors = whitelabel_db::get_recent_errors(&mut conn, user, 10).await.unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].error, "invalid token");
    assert_eq!(errors[1].error.len(), 255);

    whitelabel_db::delete(&mut conn, user).await.unwrap();
    assert!(whitelabel_db::get_by_user_id(&mut conn, user).await.unwrap().is_none());
    assert!(whitelabel_db::get_bot_by_guild(&mut conn, guild).await.unwrap().is_none());
}
