pub mod permission_db;
pub mod support_team_db;

pub const SCHEMAS: &[&str] = &[support_team_db::SCHEMA, permission_db::SCHEMA];
