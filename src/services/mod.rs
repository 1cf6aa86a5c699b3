pub mod entitlements;
pub mod integrations;
pub mod panels;
pub mod settings;
pub mod teams;
pub mod tickets;
pub mod views;

/// Table DDL of every area in foreign key order. Views are created separately, after all
/// tables exist.
pub const SCHEMAS: &[&[&str]] = &[
    teams::SCHEMAS,
    panels::SCHEMAS,
    tickets::SCHEMAS,
    integrations::SCHEMAS,
    entitlements::SCHEMAS,
    settings::SCHEMAS,
];
