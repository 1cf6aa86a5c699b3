pub mod access_control_db;
pub mod embed_db;
pub mod form_db;
pub mod multi_panel_db;
pub mod panel_db;

/// Embeds and forms come first since panels reference both
pub const SCHEMAS: &[&str] = &[
    embed_db::SCHEMA,
    form_db::SCHEMA,
    panel_db::SCHEMA,
    access_control_db::SCHEMA,
    multi_panel_db::SCHEMA,
];
