use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::custom_integration_headers;
use crate::services::integrations::replace_merge::{self, Identified};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS custom_integration_headers(
    "id" SERIAL NOT NULL UNIQUE,
    "integration_id" int4 NOT NULL REFERENCES custom_integrations("id") ON DELETE CASCADE,
    "name" varchar(32) NOT NULL,
    "value" varchar(255) NOT NULL,
    PRIMARY KEY("id")
);
CREATE INDEX IF NOT EXISTS custom_integration_headers_integration_id ON custom_integration_headers("integration_id");
"#;

/// HTTP header sent with every request to the integration's webhook. Values may contain
/// placeholders.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = custom_integration_headers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IntegrationHeader {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    pub value: String,
}

impl Identified for IntegrationHeader {
    fn id(&self) -> i32 {
        self.id
    }
}

pub async fn get_all(
    db: &mut AsyncPgConnection,
    integration_id: i32,
) -> Result<Vec<IntegrationHeader>> {
    Ok(custom_integration_headers::table
        .filter(custom_integration_headers::integration_id.eq(integration_id))
        .order(custom_integration_headers::id.asc())
        .select(IntegrationHeader::as_select())
        .load(db)
        .await?)
}

/// Makes the stored headers equal `headers` and returns them with their ids. Call from within
/// a transaction.
pub async fn create_or_update(
    tx: &mut AsyncPgConnection,
    integration_id: i32,
    headers: &[IntegrationHeader],
) -> Result<Vec<IntegrationHeader>> {
    let existing: Vec<i32> = custom_integration_headers::table
        .filter(custom_integration_headers::integration_id.eq(integration_id))
        .select(custom_integration_headers::id)
        .for_update()
        .load(tx)
        .await?;
    let plan = replace_merge::plan(&existing, headers)?;

    if !plan.delete.is_empty() {
        diesel::delete(
            custom_integration_headers::table
                .filter(custom_integration_headers::id.eq_any(&plan.delete)),
        )
        .execute(tx)
        .await?;
    }

    for header in plan.update {
        diesel::update(
            custom_integration_headers::table
                .filter(custom_integration_headers::id.eq(header.id))
                .filter(custom_integration_headers::integration_id.eq(integration_id)),
        )
        .set((
            custom_integration_headers::name.eq(&header.name),
            custom_integration_headers::value.eq(&header.value),
        ))
        .execute(tx)
        .await?;
    }

    if !plan.insert.is_empty() {
        let rows: Vec<_> = plan
            .insert
            .iter()
            .map(|header| {
                (
                    custom_integration_headers::integration_id.eq(integration_id),
                    custom_integration_headers::name.eq(&header.name),
                    custom_integration_headers::value.eq(&header.value),
                )
            })
            .collect();
        diesel::insert_into(custom_integration_headers::table)
            .values(rows)
            .execute(tx)
            .await?;
    }

    get_all(tx, integration_id).await
}
