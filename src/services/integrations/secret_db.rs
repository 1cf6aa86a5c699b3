use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::custom_integration_secrets;
use crate::services::integrations::replace_merge::{self, Identified};

/// `(id, integration_id)` is unique so per-guild values can reference the pair and can never
/// point at another integration's secret.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS custom_integration_secrets(
    "id" SERIAL NOT NULL UNIQUE,
    "integration_id" int4 NOT NULL REFERENCES custom_integrations("id") ON DELETE CASCADE,
    "name" varchar(32) NOT NULL,
    "description" varchar(255),
    UNIQUE("id", "integration_id"),
    PRIMARY KEY("id")
);
CREATE INDEX IF NOT EXISTS custom_integration_secrets_integration_id ON custom_integration_secrets("integration_id");
"#;

/// A value each guild supplies when activating the integration, such as an API key
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = custom_integration_secrets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IntegrationSecret {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

impl Identified for IntegrationSecret {
    fn id(&self) -> i32 {
        self.id
    }
}

pub async fn get_all(
    db: &mut AsyncPgConnection,
    integration_id: i32,
) -> Result<Vec<IntegrationSecret>> {
    Ok(custom_integration_secrets::table
        .filter(custom_integration_secrets::integration_id.eq(integration_id))
        .order(custom_integration_secrets::id.asc())
        .select(IntegrationSecret::as_select())
        .load(db)
        .await?)
}

/// Makes the stored secrets equal `secrets` and returns them with their ids. Deleting a secret
/// also deletes every guild's value for it. Call from within a transaction.
pub async fn create_or_update(
    tx: &mut AsyncPgConnection,
    integration_id: i32,
    secrets: &[IntegrationSecret],
) -> Result<Vec<IntegrationSecret>> {
    let existing: Vec<i32> = custom_integration_secrets::table
        .filter(custom_integration_secrets::integration_id.eq(integration_id))
        .select(custom_integration_secrets::id)
        .for_update()
        .load(tx)
        .await?;
    let plan = replace_merge::plan(&existing, secrets)?;

    if !plan.delete.is_empty() {
        diesel::delete(
            custom_integration_secrets::table
                .filter(custom_integration_secrets::id.eq_any(&plan.delete)),
        )
        .execute(tx)
        .await?;
    }

    for secret in plan.update {
        diesel::update(
            custom_integration_secrets::table
                .filter(custom_integration_secrets::id.eq(secret.id))
                .filter(custom_integration_secrets::integration_id.eq(integration_id)),
        )
        .set((
            custom_integration_secrets::name.eq(&secret.name),
            custom_integration_secrets::description.eq(&secret.description),
        ))
        .execute(tx)
        .await?;
    }

    if !plan.insert.is_empty() {
        let rows: Vec<_> = plan
            .insert
            .iter()
            .map(|secret| {
                (
                    custom_integration_secrets::integration_id.eq(integration_id),
                    custom_integration_secrets::name.eq(&secret.name),
                    custom_integration_secrets::description.eq(&secret.description),
                )
            })
            .collect();
        diesel::insert_into(custom_integration_secrets::table)
            .values(rows)
            .execute(tx)
            .await?;
    }

    get_all(tx, integration_id).await
}
