#![allow(dead_code)]

use std::env::var;

use rand::distributions::Alphanumeric;
use rand::Rng;
use ticket_db::services::panels::panel_db::{CreatePanel, PanelData};
use ticket_db::{Database, DatabaseConfig, Snowflake};
use tokio::sync::Mutex;

static SCHEMA_APPLIED: Mutex<bool> = Mutex::const_new(false);

/// Connects to `TEST_DATABASE_URI` and applies the schema once per test binary. Returns [`None`]
/// when no database is configured so that tests can bail out.
pub async fn connect() -> Option<Database> {
    let Ok(uri) = var("TEST_DATABASE_URI") else {
        println!("Skipping test - TEST_DATABASE_URI is not set");
        return None;
    };

    let mut config = DatabaseConfig::new(uri);
    config.max_connections = 16;
    let db = Database::connect(config)
        .await
        .expect("test database should be reachable");

    let mut applied = SCHEMA_APPLIED.lock().await;
    if !*applied {
        db.create_schema().await.expect("schema should apply");
        *applied = true;
    }
    Some(db)
}

/// Ids are random so tests sharing one database never see each other's rows
pub fn snowflake() -> Snowflake {
    Snowflake(rand::thread_rng().gen_range(1..i64::MAX as u64))
}

pub fn label(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("{prefix}-{suffix}")
}

pub fn panel(guild_id: Snowflake) -> CreatePanel {
    CreatePanel {
        data: PanelData {
            message_id: snowflake(),
            channel_id: snowflake(),
            guild_id,
            title: "Open a ticket".to_string(),
            content: "Press the button below to talk to staff".to_string(),
            colour: 0x2ecc71,
            target_category: snowflake(),
            emoji_name: None,
            emoji_id: None,
            welcome_message_embed: None,
            with_default_team: true,
            custom_id: label("panel"),
            image_url: None,
            thumbnail_url: None,
            button_style: 1,
            button_label: None,
            form_id: None,
        },
        mention_user: true,
        role_mentions: Vec::new(),
        team_ids: Vec::new(),
        access_control_rules: Vec::new(),
        form: None,
    }
}
