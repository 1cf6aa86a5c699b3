mod common;

use std::collections::HashSet;

use chrono::{SubsecRound, TimeDelta, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use ticket_db::schema::{category_update_queue, ticket_last_message};
use ticket_db::services::tickets::auto_close_db::{self, AutoCloseSettings};
use ticket_db::services::tickets::category_update_queue::{self as queue, TicketStatus};
use ticket_db::services::tickets::close_request_db::{self, CloseRequest};
use ticket_db::services::tickets::ticket_db as tickets;
use ticket_db::services::tickets::{
    claim_db, close_reason_db, first_response_db, last_message_db, participant_db,
    service_rating_db,
};
use ticket_db::DbError;

#[tokio::test]
async fn first_ticket_gets_id_one_and_is_found_by_channel() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();
    let user = common::snowflake();
    let channel = common::snowflake();
    let welcome = common::snowflake();

    let id = tickets::create(&mut conn, guild, user, None).await.unwrap();
    assert_eq!(id, 1);
    tickets::set_properties(&mut conn, guild, id, channel, welcome)
        .await
        .unwrap();

    let ticket = tickets::get_by_channel(&mut conn, channel)
        .await
        .unwrap()
        .expect("ticket should be bound to its channel");
    assert_eq!(ticket.id, 1);
    assert_eq!(ticket.user_id, user);
    assert_eq!(ticket.welcome_message_id, Some(welcome));
    assert!(ticket.open);
    assert!((Utc::now() - ticket.open_time).abs() < TimeDelta::minutes(1));
}

#[tokio::test]
async fn ids_are_dense_per_guild() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();
    let other_guild = common::snowflake();
    let user = common::snowflake();

    for expected in 1..=3 {
        let id = tickets::create(&mut conn, guild, user, None).await.unwrap();
        assert_eq!(id, expected);
    }
    assert_eq!(tickets::create(&mut conn, other_guild, user, None).await.unwrap(), 1);
    assert_eq!(tickets::count(&mut conn, guild).await.unwrap(), 3);
    assert_eq!(tickets::count_user_open(&mut conn, guild, user).await.unwrap(), 3);
}

#[tokio::test]
async fn close_is_idempotent() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();
    let id = tickets::create(&mut conn, guild, common::snowflake(), None)
        .await
        .unwrap();

    tickets::close(&mut conn, guild, id).await.unwrap();
    let first = tickets::get(&mut conn, id, guild).await.unwrap().unwrap();
    tickets::close(&mut conn, guild, id).await.unwrap();
    let second = tickets::get(&mut conn, id, guild).await.unwrap().unwrap();

    assert!(!first.open);
    assert!(first.close_time.is_some());
    assert_eq!(first, second);
    assert!(tickets::get_guild_open(&mut conn, guild).await.unwrap().is_empty());
}

#[tokio::test]
async fn set_properties_on_a_missing_ticket_is_not_found() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let err = tickets::set_properties(
        &mut conn,
        common::snowflake(),
        1,
        common::snowflake(),
        common::snowflake(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[tokio::test]
async fn missing_ticket_reads_as_none() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    assert!(tickets::get(&mut conn, 1, common::snowflake()).await.unwrap().is_none());
    assert!(tickets::get_by_channel(&mut conn, common::snowflake())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_creation_converges_on_distinct_ids() {
    let Some(db) = common::connect().await else {
        return;
    };
    let guild = common::snowflake();

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move {
                tickets::create_with_retry(&db, guild, common::snowflake(), None, 1_000).await
            })
        })
        .collect();

    let ids: HashSet<i32> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|res| res.unwrap().unwrap())
        .collect();
    assert_eq!(ids, (1..=100).collect());
}

#[tokio::test]
async fn closed_tickets_drop_out_of_close_requests() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();
    let id = tickets::create(&mut conn, guild, common::snowflake(), None)
        .await
        .unwrap();

    let request = CloseRequest {
        guild_id: guild,
        ticket_id: id,
        user_id: common::snowflake(),
        message_id: None,
        close_at: Some((Utc::now() - TimeDelta::minutes(1)).trunc_subsecs(6)),
        close_reason: Some("x".to_string()),
    };
    close_request_db::set(&mut conn, &request).await.unwrap();
    assert_eq!(
        close_request_db::get(&mut conn, guild, id).await.unwrap(),
        Some(request.clone())
    );

    let due = close_request_db::get_closeable(&mut conn).await.unwrap();
    assert_eq!(
        due.iter()
            .filter(|r| r.guild_id == guild && r.ticket_id == id)
            .count(),
        1
    );

    tickets::close(&mut conn, guild, id).await.unwrap();
    let due = close_request_db::get_closeable(&mut conn).await.unwrap();
    assert!(!due.iter().any(|r| r.guild_id == guild && r.ticket_id == id));

    assert!(close_request_db::cleanup(&mut conn).await.unwrap() >= 1);
    assert!(close_request_db::get(&mut conn, guild, id).await.unwrap().is_none());
}

#[tokio::test]
async fn excluded_tickets_are_not_closeable() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();
    let id = tickets::create(&mut conn, guild, common::snowflake(), None)
        .await
        .unwrap();
    close_request_db::set(
        &mut conn,
        &CloseRequest {
            guild_id: guild,
            ticket_id: id,
            user_id: common::snowflake(),
            message_id: None,
            close_at: Some(Utc::now() - TimeDelta::minutes(5)),
            close_reason: None,
        },
    )
    .await
    .unwrap();
    auto_close_db::exclude(&mut conn, guild, id).await.unwrap();

    let due = close_request_db::get_closeable(&mut conn).await.unwrap();
    assert!(!due.iter().any(|r| r.guild_id == guild && r.ticket_id == id));
}

#[tokio::test]
async fn quiet_tickets_become_auto_closeable() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();
    let user = common::snowflake();

    let settings = AutoCloseSettings {
        enabled: true,
        since_open_with_no_response: None,
        since_last_message: Some(TimeDelta::hours(2)),
        on_user_leave: Some(false),
    };
    auto_close_db::set(&mut conn, guild, &settings).await.unwrap();
    assert_eq!(auto_close_db::get(&mut conn, guild).await.unwrap(), settings);

    let quiet = tickets::create(&mut conn, guild, user, None).await.unwrap();
    let busy = tickets::create(&mut conn, guild, user, None).await.unwrap();
    for id in [quiet, busy] {
        last_message_db::set(&mut conn, guild, id, common::snowflake(), user, false)
            .await
            .unwrap();
    }
    diesel::update(ticket_last_message::table.find((guild, quiet)))
        .set(ticket_last_message::last_message_time.eq(Utc::now() - TimeDelta::hours(3)))
        .execute(&mut *conn)
        .await
        .unwrap();

    let candidates: Vec<i32> = auto_close_db::get_auto_closeable(&mut conn)
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.guild_id == guild)
        .map(|c| c.ticket_id)
        .collect();
    assert_eq!(candidates, vec![quiet]);

    auto_close_db::exclude(&mut conn, guild, quiet).await.unwrap();
    assert!(!auto_close_db::get_auto_closeable(&mut conn)
        .await
        .unwrap()
        .iter()
        .any(|c| c.guild_id == guild));
}

#[tokio::test]
async fn unconfigured_guild_has_default_auto_close() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    assert_eq!(
        auto_close_db::get(&mut conn, common::snowflake()).await.unwrap(),
        AutoCloseSettings::default()
    );
}

#[tokio::test]
async fn only_the_first_response_is_kept() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();
    let staff = common::snowflake();
    let id = tickets::create(&mut conn, guild, common::snowflake(), None)
        .await
        .unwrap();

    first_response_db::set(&mut conn, guild, id, staff, TimeDelta::minutes(4))
        .await
        .unwrap();
    first_response_db::set(&mut conn, guild, id, common::snowflake(), TimeDelta::hours(1))
        .await
        .unwrap();
    assert_eq!(
        first_response_db::get(&mut conn, guild, id).await.unwrap(),
        Some((staff, TimeDelta::minutes(4)))
    );
}

#[tokio::test]
async fn close_reason_round_trips() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();
    let closer = common::snowflake();
    let id = tickets::create(&mut conn, guild, common::snowflake(), None)
        .await
        .unwrap();

    let metadata = close_reason_db::CloseMetadata {
        reason: Some("resolved".to_string()),
        closed_by: Some(closer),
    };
    close_reason_db::set(&mut conn, guild, id, metadata.clone())
        .await
        .unwrap();
    assert_eq!(
        close_reason_db::get(&mut conn, guild, id).await.unwrap(),
        Some(metadata)
    );
}

#[tokio::test]
async fn queued_category_moves_wait_for_the_delay() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();
    let channel = common::snowflake();
    let id = tickets::create(&mut conn, guild, common::snowflake(), None)
        .await
        .unwrap();
    tickets::set_properties(&mut conn, guild, id, channel, common::snowflake())
        .await
        .unwrap();

    queue::add(&mut conn, guild, id, TicketStatus::Pending).await.unwrap();
    let ready = |updates: Vec<queue::CategoryUpdate>| {
        updates
            .into_iter()
            .filter(|update| update.guild_id == guild)
            .collect::<Vec<_>>()
    };
    let pending = queue::get_ready_for_update(&mut conn, TimeDelta::minutes(5))
        .await
        .unwrap();
    assert!(ready(pending).is_empty());

    diesel::update(category_update_queue::table.find((guild, id)))
        .set(category_update_queue::status_changed_at.eq(Utc::now() - TimeDelta::minutes(10)))
        .execute(&mut *conn)
        .await
        .unwrap();
    for _ in 0..2 {
        let pending = queue::get_ready_for_update(&mut conn, TimeDelta::minutes(5))
            .await
            .unwrap();
        let updates = ready(pending);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].new_status, TicketStatus::Pending);
        assert_eq!(updates[0].channel_id, Some(channel));
        assert_eq!(updates[0].panel_id, None);
    }

    queue::delete(&mut conn, guild, id).await.unwrap();
    let pending = queue::get_ready_for_update(&mut conn, TimeDelta::minutes(5))
        .await
        .unwrap();
    assert!(ready(pending).is_empty());
}

#[tokio::test]
async fn close_request_reasons_are_cut_to_the_column_width() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();
    let id = tickets::create(&mut conn, guild, common::snowflake(), None)
        .await
        .unwrap();

    close_request_db::set(
        &mut conn,
        &CloseRequest {
            guild_id: guild,
            ticket_id: id,
            user_id: common::snowflake(),
            message_id: None,
            close_at: None,
            close_reason: Some("é".repeat(300)),
        },
    )
    .await
    .unwrap();
    let stored = close_request_db::get(&mut conn, guild, id).await.unwrap().unwrap();
    assert_eq!(stored.close_reason, Some("é".repeat(close_request_db::MAX_REASON_LENGTH)));
}

#[tokio::test]
async fn the_opener_is_never_a_participant() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();
    let opener = common::snowflake();
    let helper = common::snowflake();
    let first = tickets::create(&mut conn, guild, opener, None).await.unwrap();
    let second = tickets::create(&mut conn, guild, opener, None).await.unwrap();

    participant_db::add(&mut conn, guild, first, opener).await.unwrap();
    assert!(participant_db::get(&mut conn, guild, first).await.unwrap().is_empty());

    participant_db::add(&mut conn, guild, first, helper).await.unwrap();
    participant_db::add(&mut conn, guild, first, helper).await.unwrap();
    participant_db::add(&mut conn, guild, second, helper).await.unwrap();
    assert_eq!(participant_db::get(&mut conn, guild, first).await.unwrap(), vec![helper]);
    assert_eq!(
        participant_db::get_tickets_for_user(&mut conn, guild, helper).await.unwrap(),
        vec![first, second]
    );
    assert!(participant_db::get_tickets_for_user(&mut conn, guild, opener)
        .await
        .unwrap()
        .is_empty());

    participant_db::delete(&mut conn, guild, first, helper).await.unwrap();
    assert_eq!(
        participant_db::get_tickets_for_user(&mut conn, guild, helper).await.unwrap(),
        vec![second]
    );
}

#[tokio::test]
async fn claims_and_ratings_are_tracked_per_staff_member() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut conn = db.conn().await.unwrap();
    let guild = common::snowflake();
    let staff = common::snowflake();
    let other = common::snowflake();
    let first = tickets::create(&mut conn, guild, common::snowflake(), None)
        .await
        .unwrap();
    let second = tickets::create(&mut conn, guild, common::snowflake(), None)
        .await
        .unwrap();

    assert_eq!(claim_db::get(&mut conn, guild, first).await.unwrap(), None);
    claim_db::set(&mut conn, guild, first, other).await.unwrap();
    claim_db::set(&mut conn, guild, first, staff).await.unwrap();
    claim_db::set(&mut conn, guild, second, staff).await.unwrap();
    assert_eq!(claim_db::get(&mut conn, guild, first).await.unwrap(), Some(staff));
    assert_eq!(claim_db::get_claimed_count(&mut conn, guild, staff).await.unwrap(), 2);
    assert_eq!(claim_db::get_claimed_count(&mut conn, guild, other).await.unwrap(), 0);

    service_rating_db::set(&mut conn, guild, first, 5).await.unwrap();
    service_rating_db::set(&mut conn, guild, first, 2).await.unwrap();
    service_rating_db::set(&mut conn, guild, second, 4).await.unwrap();
    assert_eq!(service_rating_db::get(&mut conn, guild, first).await.unwrap(), Some(2));
    assert_eq!(service_rating_db::get_count(&mut conn, guild).await.unwrap(), 2);
    assert_eq!(service_rating_db::get_average(&mut conn, guild).await.unwrap(), Some(3.0));
    assert_eq!(
        service_rating_db::get_average_claimed_by(&mut conn, guild, staff)
            .await
            .unwrap(),
        Some(3.0)
    );

    claim_db::delete(&mut conn, guild, second).await.unwrap();
    assert_eq!(claim_db::get_claimed_count(&mut conn, guild, staff).await.unwrap(), 1);
    assert_eq!(
        service_rating_db::get_average_claimed_by(&mut conn, guild, staff)
            .await
            .unwrap(),
        Some(2.0)
    );
    assert_eq!(
        service_rating_db::get_average(&mut conn, common::snowflake())
            .await
            .unwrap(),
        None
    );
}
