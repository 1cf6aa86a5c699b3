mod common;

use std::collections::HashMap;

use diesel_async::scoped_futures::ScopedFutureExt;
use ticket_db::services::integrations::header_db::{self, IntegrationHeader};
use ticket_db::services::integrations::integration_db::{
    self, CustomIntegration, HttpMethod, IntegrationDetails,
};
use ticket_db::services::integrations::placeholder_db::{self, IntegrationPlaceholder};
use ticket_db::services::integrations::secret_db::{self, IntegrationSecret};
use ticket_db::services::integrations::guild_integration_db::{self, SecretValue};
use ticket_db::services::views::CustomIntegrationGuildCountsView;
use ticket_db::{Database, DbError};

fn details(name: &str) -> IntegrationDetails {
    IntegrationDetails {
        webhook_url: "https://example.com/hook".to_string(),
        validation_url: None,
        http_method: HttpMethod::Post,
        name: name.to_string(),
        description: "Looks up the user's order".to_string(),
        image_url: None,
        privacy_policy_url: None,
    }
}

fn header(id: i32, name: &str, value: &str) -> IntegrationHeader {
    IntegrationHeader {
        id,
        name: name.to_string(),
        value: value.to_string(),
    }
}

async fn integration(db: &Database) -> CustomIntegration {
    let mut conn = db.conn().await.unwrap();
    integration_db::create(&mut conn, common::snowflake(), &details("orders"))
        .await
        .unwrap()
}

async fn set_headers(
    db: &Database,
    integration_id: i32,
    headers: Vec<IntegrationHeader>,
) -> ticket_db::Result<Vec<IntegrationHeader>> {
    db.with_tx(|tx| {
        async move { header_db::create_or_update(tx, integration_id, &headers).await }.scope_boxed()
    })
    .await
}

#[tokio::test]
async fn headers_are_merged_by_id() {
    let Some(db) = common::connect().await else {
        return;
    };
    let integration = integration(&db).await;

    let created = set_headers(
        &db,
        integration.id,
        vec![header(0, "Authorization", "Bearer a"), header(0, "X-Trace", "1")],
    )
    .await
    .unwrap();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|h| h.id != 0));
    let auth = created.iter().find(|h| h.name == "Authorization").unwrap().id;

    let merged = set_headers(
        &db,
        integration.id,
        vec![header(auth, "Authorization", "Bearer b"), header(0, "Accept", "application/json")],
    )
    .await
    .unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0], header(auth, "Authorization", "Bearer b"));
    assert_eq!(merged[1].name, "Accept");
    assert!(!merged.iter().any(|h| h.name == "X-Trace"));

    let mut conn = db.conn().await.unwrap();
    assert_eq!(header_db::get_all(&mut conn, integration.id).await.unwrap(), merged);
}

#[tokio::test]
async fn empty_lists_wipe_the_collection() {
    let Some(db) = common::connect().await else {
        return;
    };
    let integration = integration(&db).await;
    let integration_id = integration.id;
    set_headers(&db, integration_id, vec![header(0, "X-Key", "k")])
        .await
        .unwrap();
    db.with_tx(|tx| {
        async move {
            placeholder_db::create_or_update(
                tx,
                integration_id,
                &[IntegrationPlaceholder {
                    id: 0,
                    name: "order".to_string(),
                    json_path: "$.order.id".to_string(),
                }],
            )
            .await
        }
        .scope_boxed()
    })
    .await
    .unwrap();

    assert!(set_headers(&db, integration_id, Vec::new()).await.unwrap().is_empty());
    let placeholders = db
        .with_tx(|tx| {
            async move { placeholder_db::create_or_update(tx, integration_id, &[]).await }
                .scope_boxed()
        })
        .await
        .unwrap();
    assert!(placeholders.is_empty());

    db.with_tx(|tx| {
        async move {
            secret_db::create_or_update(
                tx,
                integration_id,
                &[IntegrationSecret {
                    id: 0,
                    name: "api_key".to_string(),
                    description: None,
                }],
            )
            .await
        }
        .scope_boxed()
    })
    .await
    .unwrap();
    let secrets = db
        .with_tx(|tx| {
            async move { secret_db::create_or_update(tx, integration_id, &[]).await }.scope_boxed()
        })
        .await
        .unwrap();
    assert!(secrets.is_empty());

    let mut conn = db.conn().await.unwrap();
    assert!(header_db::get_all(&mut conn, integration_id).await.unwrap().is_empty());
    assert!(placeholder_db::get_all(&mut conn, integration_id).await.unwrap().is_empty());
    assert!(secret_db::get_all(&mut conn, integration_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn ids_of_other_integrations_are_rejected() {
    let Some(db) = common::connect().await else {
        return;
    };
    let first = integration(&db).await;
    let second = integration(&db).await;
    let foreign = set_headers(&db, first.id, vec![header(0, "X-Key", "k")])
        .await
        .unwrap()[0]
        .id;

    let err = set_headers(&db, second.id, vec![header(foreign, "X-Key", "stolen")])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidInput(_)));

    let mut conn = db.conn().await.unwrap();
    assert_eq!(
        header_db::get_all(&mut conn, first.id).await.unwrap(),
        vec![header(foreign, "X-Key", "k")]
    );
}

#[tokio::test]
async fn secret_values_follow_the_guild_activation() {
    let Some(db) = common::connect().await else {
        return;
    };
    let guild = common::snowflake();
    let integration_id = integration(&db).await.id;
    let secrets = db
        .with_tx(|tx| {
            async move {
                secret_db::create_or_update(
                    tx,
                    integration_id,
                    &[IntegrationSecret {
                        id: 0,
                        name: "api_key".to_string(),
                        description: None,
                    }],
                )
                .await
            }
            .scope_boxed()
        })
        .await
        .unwrap();
    let secret_id = secrets[0].id;

    let values = HashMap::from([(secret_id, "hunter2".to_string())]);
    db.with_tx(|tx| {
        async move {
            guild_integration_db::add_to_guild_with_secrets(tx, integration_id, guild, &values).await
        }
        .scope_boxed()
    })
    .await
    .unwrap();

    let mut conn = db.conn().await.unwrap();
    assert!(guild_integration_db::is_active(&mut conn, integration_id, guild).await.unwrap());
    assert_eq!(
        guild_integration_db::get_secret_values(&mut conn, integration_id, guild)
            .await
            .unwrap(),
        vec![SecretValue {
            secret_id,
            name: "api_key".to_string(),
            value: "hunter2".to_string(),
        }]
    );

    guild_integration_db::remove_from_guild(&mut conn, integration_id, guild)
        .await
        .unwrap();
    assert!(!guild_integration_db::is_active(&mut conn, integration_id, guild).await.unwrap());
    assert!(guild_integration_db::get_secret_values(&mut conn, integration_id, guild)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn available_integrations_carry_guild_counts() {
    let Some(db) = common::connect().await else {
        return;
    };
    let integration_id = integration(&db).await.id;
    let (first, second) = (common::snowflake(), common::snowflake());
    {
        let mut conn = db.conn().await.unwrap();
        for guild in [first, second] {
            guild_integration_db::add_to_guild(&mut conn, integration_id, guild)
                .await
                .unwrap();
        }
    }

    db.refresh_view(&CustomIntegrationGuildCountsView).await.unwrap();
    let mut conn = db.conn().await.unwrap();
    assert_eq!(
        CustomIntegrationGuildCountsView::get(&mut conn, integration_id)
            .await
            .unwrap(),
        2
    );

    let available = integration_db::get_available_integrations_with_active(
        &mut conn,
        first,
        common::snowflake(),
        50,
        0,
    )
    .await
    .unwrap();
    let listed = available
        .iter()
        .find(|entry| entry.integration.id == integration_id)
        .expect("active integrations are always listed");
    assert!(listed.active);
    assert_eq!(listed.guild_count, 2);
    assert!(available[0].active);
}

#[tokio::test]
async fn only_owners_can_edit() {
    let Some(db) = common::connect().await else {
        return;
    };
    let integration = integration(&db).await;
    let mut conn = db.conn().await.unwrap();
    assert!(integration_db::can_edit(&mut conn, integration.id, integration.owner_id)
        .await
        .unwrap());
    assert!(!integration_db::can_edit(&mut conn, integration.id, common::snowflake())
        .await
        .unwrap());

    integration_db::update(&mut conn, integration.id, &details("renamed"))
        .await
        .unwrap();
    let stored = integration_db::get(&mut conn, integration.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "renamed");
    assert!(!stored.public && !stored.approved);
}
