use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::custom_integration_placeholders;
use crate::services::integrations::replace_merge::{self, Identified};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS custom_integration_placeholders(
    "id" SERIAL NOT NULL UNIQUE,
    "integration_id" int4 NOT NULL REFERENCES custom_integrations("id") ON DELETE CASCADE,
    "name" varchar(32) NOT NULL,
    "json_path" varchar(255) NOT NULL,
    PRIMARY KEY("id")
);
CREATE INDEX IF NOT EXISTS custom_integration_placeholders_integration_id ON custom_integration_placeholders("integration_id");
"#;

/// Extracts `json_path` from the webhook's response into `%name%` in the welcome message
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = custom_integration_placeholders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IntegrationPlaceholder {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    pub json_path: String,
}

impl Identified for IntegrationPlaceholder {
    fn id(&self) -> i32 {
        self.id
    }
}

pub async fn get_all(
    db: &mut AsyncPgConnection,
    integration_id: i32,
) -> Result<Vec<IntegrationPlaceholder>> {
    Ok(custom_integration_placeholders::table
        .filter(custom_integration_placeholders::integration_id.eq(integration_id))
        .order(custom_integration_placeholders::id.asc())
        .select(IntegrationPlaceholder::as_select())
        .load(db)
        .await?)
}

/// Call from within a transaction
pub async fn create_or_update(
    tx: &mut AsyncPgConnection,
    integration_id: i32,
    placeholders: &[IntegrationPlaceholder],
) -> Result<Vec<IntegrationPlaceholder>> {
    let existing: Vec<i32> = custom_integration_placeholders::table
        .filter(custom_integration_placeholders::integration_id.eq(integration_id))
        .select(custom_integration_placeholders::id)
        .for_update()
        .load(tx)
        .await?;
    let plan = replace_merge::plan(&existing, placeholders)?;

    if !plan.delete.is_empty() {
        diesel::delete(
            custom_integration_placeholders::table
                .filter(custom_integration_placeholders::id.eq_any(&plan.delete)),
        )
        .execute(tx)
        .await?;
    }

    for placeholder in plan.update {
        diesel::update(
            custom_integration_placeholders::table
                .filter(custom_integration_placeholders::id.eq(placeholder.id))
                .filter(custom_integration_placeholders::integration_id.eq(integration_id)),
        )
        .set((
            custom_integration_placeholders::name.eq(&placeholder.name),
            custom_integration_placeholders::json_path.eq(&placeholder.json_path),
        ))
        .execute(tx)
        .await?;
    }

    if !plan.insert.is_empty() {
        let rows: Vec<_> = plan
            .insert
            .iter()
            .map(|placeholder| {
                (
                    custom_integration_placeholders::integration_id.eq(integration_id),
                    custom_integration_placeholders::name.eq(&placeholder.name),
                    custom_integration_placeholders::json_path.eq(&placeholder.json_path),
                )
            })
            .collect();
        diesel::insert_into(custom_integration_placeholders::table)
            .values(rows)
            .execute(tx)
            .await?;
    }

    get_all(tx, integration_id).await
}
