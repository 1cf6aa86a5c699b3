pub mod guild_integration_db;
pub mod header_db;
pub mod integration_db;
pub mod placeholder_db;
pub mod replace_merge;
pub mod secret_db;

pub const SCHEMAS: &[&str] = &[
    integration_db::SCHEMA,
    header_db::SCHEMA,
    secret_db::SCHEMA,
    placeholder_db::SCHEMA,
    guild_integration_db::SCHEMA,
];
