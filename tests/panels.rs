mod common;

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::RunQueryDsl;
use ticket_db::schema::panel_access_control_rules;
use ticket_db::services::panels::access_control_db::{self, AccessControlRule, RuleAction};
use ticket_db::services::panels::form_db::{self, NewForm, NewFormInput};
use ticket_db::services::panels::multi_panel_db::{self, MultiPanelData};
use ticket_db::services::panels::panel_db;
use ticket_db::{DbError, Snowflake};

fn rule(role_id: Snowflake, action: RuleAction) -> AccessControlRule {
    AccessControlRule { role_id, action }
}

fn input(custom_id: String, label: &str) -> NewFormInput {
    NewFormInput {
        custom_id,
        style: 1,
        label: label.to_string(),
        placeholder: None,
        required: true,
        min_length: None,
        max_length: None,
    }
}

#[tokio::test]
async fn lowest_position_wins_when_several_rules_match() {
    let Some(db) = common::connect().await else {
        return;
    };
    let allowed = common::snowflake();
    let denied = common::snowflake();
    let mut panel = common::panel(common::snowflake());
    panel.access_control_rules = vec![
        rule(allowed, RuleAction::Allow),
        rule(denied, RuleAction::Deny),
    ];
    let panel_id = panel_db::create(&db, panel).await.unwrap();

    let mut conn = db.conn().await.unwrap();
    let matched = access_control_db::get_first_matched(&mut conn, panel_id, &[denied, allowed])
        .await
        .unwrap();
    assert_eq!(matched, rule(allowed, RuleAction::Allow));

    let matched = access_control_db::get_first_matched(&mut conn, panel_id, &[denied])
        .await
        .unwrap();
    assert_eq!(matched.action, RuleAction::Deny);
}

#[tokio::test]
async fn unmatched_roles_are_reported_as_no_match() {
    let Some(db) = common::connect().await else {
        return;
    };
    let mut panel = common::panel(common::snowflake());
    panel.access_control_rules = vec![rule(common::snowflake(), RuleAction::Allow)];
    let panel_id = panel_db::create(&db, panel).await.unwrap();

    let mut conn = db.conn().await.unwrap();
    let err = access_control_db::get_first_matched(&mut conn, panel_id, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NoRuleMatched));

    let err = access_control_db::get_first_matched(&mut conn, panel_id, &[common::snowflake()])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NoRuleMatched));
}

#[tokio::test]
async fn replace_renumbers_positions_and_empty_input_wipes() {
    let Some(db) = common::connect().await else {
        return;
    };
    let panel_id = panel_db::create(&db, common::panel(common::snowflake()))
        .await
        .unwrap();
    let rules = vec![
        rule(common::snowflake(), RuleAction::Deny),
        rule(common::snowflake(), RuleAction::Allow),
        rule(common::snowflake(), RuleAction::Allow),
    ];

    let replaced = rules.clone();
    db.with_tx(|tx| {
        async move { access_control_db::replace(tx, panel_id, &replaced).await }.scope_boxed()
    })
    .await
    .unwrap();

    let mut conn = db.conn().await.unwrap();
    assert_eq!(access_control_db::get_all(&mut conn, panel_id).await.unwrap(), rules);
    let positions: Vec<i32> = panel_access_control_rules::table
        .filter(panel_access_control_rules::panel_id.eq(panel_id))
        .order(panel_access_control_rules::position.asc())
        .select(panel_access_control_rules::position)
        .load(&mut *conn)
        .await
        .unwrap();
    assert_eq!(positions, vec![0, 1, 2]);

    db.with_tx(|tx| async move { access_control_db::replace(tx, panel_id, &[]).await }.scope_boxed())
        .await
        .unwrap();
    assert!(access_control_db::get_all(&mut conn, panel_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_roles_are_rejected_and_nothing_changes() {
    let Some(db) = common::connect().await else {
        return;
    };
    let role = common::snowflake();
    let mut panel = common::panel(common::snowflake());
    panel.access_control_rules = vec![rule(role, RuleAction::Allow)];
    let panel_id = panel_db::create(&db, panel).await.unwrap();

    let err = db
        .with_tx(|tx| {
            async move {
                access_control_db::replace(
                    tx,
                    panel_id,
                    &[rule(role, RuleAction::Allow), rule(role, RuleAction::Deny)],
                )
                .await
            }
            .scope_boxed()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidInput(_)));

    let mut conn = db.conn().await.unwrap();
    assert_eq!(
        access_control_db::get_all(&mut conn, panel_id).await.unwrap(),
        vec![rule(role, RuleAction::Allow)]
    );
}

#[tokio::test]
async fn panel_is_created_with_its_satellites() {
    let Some(db) = common::connect().await else {
        return;
    };
    let guild = common::snowflake();
    let mention = common::snowflake();
    let mut panel = common::panel(guild);
    panel.mention_user = false;
    panel.role_mentions = vec![mention];
    panel.form = Some(NewForm {
        title: "Tell us more".to_string(),
        custom_id: common::label("form"),
        inputs: vec![
            input(common::label("input"), "What happened?"),
            input(common::label("input"), "When?"),
        ],
    });
    let custom_id = panel.data.custom_id.clone();
    let panel_id = panel_db::create(&db, panel).await.unwrap();

    let mut conn = db.conn().await.unwrap();
    let stored = panel_db::get_by_custom_id(&mut conn, guild, &custom_id)
        .await
        .unwrap()
        .expect("panel should exist");
    assert_eq!(stored.panel_id, panel_id);
    assert!(!panel_db::get_should_mention_user(&mut conn, panel_id).await.unwrap());
    assert_eq!(
        panel_db::get_role_mentions(&mut conn, panel_id).await.unwrap(),
        vec![mention]
    );

    let form_id = stored.data.form_id.expect("form should be linked");
    let positions: Vec<i32> = form_db::get_inputs(&mut conn, form_id)
        .await
        .unwrap()
        .into_iter()
        .map(|input| input.position)
        .collect();
    assert_eq!(positions, vec![0, 1]);
    assert_eq!(panel_db::get_panel_count(&mut conn, guild).await.unwrap(), 1);
}

#[tokio::test]
async fn failed_panel_creation_leaves_nothing_behind() {
    let Some(db) = common::connect().await else {
        return;
    };
    let guild = common::snowflake();
    let role = common::snowflake();
    let mut panel = common::panel(guild);
    panel.access_control_rules = vec![rule(role, RuleAction::Allow), rule(role, RuleAction::Deny)];

    assert!(panel_db::create(&db, panel).await.is_err());
    let mut conn = db.conn().await.unwrap();
    assert_eq!(panel_db::get_panel_count(&mut conn, guild).await.unwrap(), 0);
}

#[tokio::test]
async fn form_inputs_swap_and_close_gaps() {
    let Some(db) = common::connect().await else {
        return;
    };
    let guild = common::snowflake();
    let mut conn = db.conn().await.unwrap();
    let form = form_db::create(&mut conn, guild, "Details", &common::label("form"))
        .await
        .unwrap();
    let mut ids = Vec::new();
    for label in ["first", "second", "third"] {
        let created = form_db::create_input(&mut conn, form.form_id, &input(common::label("input"), label))
            .await
            .unwrap();
        ids.push(created.id);
    }
    drop(conn);

    let form_id = form.form_id;
    let (first, third) = (ids[0], ids[2]);
    db.with_tx(|tx| async move { form_db::swap_positions(tx, form_id, first, third).await }.scope_boxed())
        .await
        .unwrap();

    let mut conn = db.conn().await.unwrap();
    let order: Vec<i32> = form_db::get_inputs(&mut conn, form_id)
        .await
        .unwrap()
        .into_iter()
        .map(|input| input.id)
        .collect();
    assert_eq!(order, vec![ids[2], ids[1], ids[0]]);

    let middle = ids[1];
    db.with_tx(|tx| async move { form_db::delete_input(tx, form_id, middle).await }.scope_boxed())
        .await
        .unwrap();
    let remaining: Vec<(i32, i32)> = form_db::get_inputs(&mut conn, form_id)
        .await
        .unwrap()
        .into_iter()
        .map(|input| (input.id, input.position))
        .collect();
    assert_eq!(remaining, vec![(ids[2], 0), (ids[0], 1)]);
}

#[tokio::test]
async fn multi_panel_targets_can_be_removed_one_by_one_or_all_at_once() {
    let Some(db) = common::connect().await else {
        return;
    };
    let guild = common::snowflake();
    let first = panel_db::create(&db, common::panel(guild)).await.unwrap();
    let second = panel_db::create(&db, common::panel(guild)).await.unwrap();

    let mut conn = db.conn().await.unwrap();
    let multi_panel = multi_panel_db::create(
        &mut conn,
        &MultiPanelData {
            message_id: common::snowflake(),
            channel_id: common::snowflake(),
            guild_id: guild,
            title: "Support".to_string(),
            content: "Pick a topic".to_string(),
            colour: 0x2ecc71,
            select_menu: true,
            embed_id: None,
        },
    )
    .await
    .unwrap();
    for panel_id in [first, second] {
        multi_panel_db::insert_target(&mut conn, multi_panel, panel_id)
            .await
            .unwrap();
    }
    let targets = |panels: Vec<panel_db::Panel>| {
        panels.into_iter().map(|p| p.panel_id).collect::<Vec<_>>()
    };
    assert_eq!(
        targets(multi_panel_db::get_panels(&mut conn, multi_panel).await.unwrap()),
        vec![first, second]
    );

    multi_panel_db::delete_target(&mut conn, multi_panel, first).await.unwrap();
    assert_eq!(
        targets(multi_panel_db::get_panels(&mut conn, multi_panel).await.unwrap()),
        vec![second]
    );
    assert!(multi_panel_db::get_multi_panels_for_panel(&mut conn, first)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        multi_panel_db::get_multi_panels_for_panel(&mut conn, second)
            .await
            .unwrap()
            .len(),
        1
    );

    multi_panel_db::delete_all_targets(&mut conn, multi_panel).await.unwrap();
    assert!(multi_panel_db::get_panels(&mut conn, multi_panel).await.unwrap().is_empty());
    assert!(multi_panel_db::get(&mut conn, multi_panel).await.unwrap().is_some());
}
