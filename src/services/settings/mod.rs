pub mod custom_colours_db;
pub mod modmail_archive_db;
pub mod premium_keys_db;
pub mod user_guilds_db;
pub mod users_can_close_db;
pub mod votes_db;
pub mod whitelabel_db;

/// `premium_keys` references `skus`, apply after the entitlement tables
pub const SCHEMAS: &[&str] = &[
    users_can_close_db::SCHEMA,
    custom_colours_db::SCHEMA,
    votes_db::SCHEMA,
    premium_keys_db::SCHEMA,
    user_guilds_db::SCHEMA,
    modmail_archive_db::SCHEMA,
    whitelabel_db::SCHEMA,
];
