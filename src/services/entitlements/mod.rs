pub mod entitlement_db;
pub mod legacy_db;
pub mod sku_db;

pub const SCHEMAS: &[&str] = &[sku_db::SCHEMA, entitlement_db::SCHEMA, legacy_db::SCHEMA];
