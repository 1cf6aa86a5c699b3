use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};
use crate::schema::custom_integrations;
use crate::snowflake::Snowflake;
use crate::sql_enum::text_enum;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS custom_integrations(
    "id" SERIAL NOT NULL UNIQUE,
    "owner_id" int8 NOT NULL,
    "webhook_url" varchar(255) NOT NULL,
    "validation_url" varchar(255),
    "http_method" varchar(8) NOT NULL CHECK ("http_method" IN ('GET', 'POST', 'PUT', 'PATCH', 'DELETE')),
    "name" varchar(32) NOT NULL,
    "description" varchar(255) NOT NULL,
    "image_url" varchar(255),
    "privacy_policy_url" varchar(255),
    "public" bool NOT NULL DEFAULT false,
    "approved" bool NOT NULL DEFAULT false,
    PRIMARY KEY("id")
);
CREATE INDEX IF NOT EXISTS custom_integrations_owner_id ON custom_integrations("owner_id");
CREATE INDEX IF NOT EXISTS custom_integrations_public_approved ON custom_integrations("id") WHERE "public" AND "approved";
"#;

text_enum! {
    pub enum HttpMethod {
        Get => "GET",
        Post => "POST",
        Put => "PUT",
        Patch => "PATCH",
        Delete => "DELETE",
    }
}

#[derive(
    Debug,
    Clone,
    PartialEq,
    Queryable,
    QueryableByName,
    Selectable,
    Identifiable,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = custom_integrations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CustomIntegration {
    pub id: i32,
    pub owner_id: Snowflake,
    pub webhook_url: String,
    pub validation_url: Option<String>,
    pub http_method: HttpMethod,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub privacy_policy_url: Option<String>,
    pub public: bool,
    pub approved: bool,
}

/// The owner editable part of an integration
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = custom_integrations)]
#[diesel(treat_none_as_null = true)]
pub struct IntegrationDetails {
    pub webhook_url: String,
    pub validation_url: Option<String>,
    pub http_method: HttpMethod,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub privacy_policy_url: Option<String>,
}

/// An integration as listed to a guild, along with whether the guild runs it and how many
/// guilds do in total
#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize, Deserialize)]
pub struct IntegrationWithActive {
    #[diesel(embed)]
    #[serde(flatten)]
    pub integration: CustomIntegration,
    #[diesel(sql_type = Bool)]
    pub active: bool,
    #[diesel(sql_type = BigInt)]
    pub guild_count: i64,
}

/// New integrations start private and unapproved
pub async fn create(
    db: &mut AsyncPgConnection,
    owner_id: Snowflake,
    details: &IntegrationDetails,
) -> Result<CustomIntegration> {
    Ok(diesel::insert_into(custom_integrations::table)
        .values((custom_integrations::owner_id.eq(owner_id), details))
        .returning(CustomIntegration::as_returning())
        .get_result(db)
        .await?)
}

pub async fn update(
    db: &mut AsyncPgConnection,
    integration_id: i32,
    details: &IntegrationDetails,
) -> Result<()> {
    let updated = diesel::update(custom_integrations::table.find(integration_id))
        .set(details)
        .execute(db)
        .await?;
    if updated == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

pub async fn get(
    db: &mut AsyncPgConnection,
    integration_id: i32,
) -> Result<Option<CustomIntegration>> {
    Ok(custom_integrations::table
        .find(integration_id)
        .select(CustomIntegration::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_all_owned(
    db: &mut AsyncPgConnection,
    owner_id: Snowflake,
) -> Result<Vec<CustomIntegration>> {
    Ok(custom_integrations::table
        .filter(custom_integrations::owner_id.eq(owner_id))
        .order(custom_integrations::id.asc())
        .select(CustomIntegration::as_select())
        .load(db)
        .await?)
}

/// Whether `user_id` owns the integration. Missing integrations can't be edited by anyone.
pub async fn can_edit(
    db: &mut AsyncPgConnection,
    integration_id: i32,
    user_id: Snowflake,
) -> Result<bool> {
    Ok(diesel::select(diesel::dsl::exists(
        custom_integrations::table
            .filter(custom_integrations::id.eq(integration_id))
            .filter(custom_integrations::owner_id.eq(user_id)),
    ))
    .get_result(db)
    .await?)
}

pub async fn set_public(
    db: &mut AsyncPgConnection,
    integration_id: i32,
    public: bool,
) -> Result<()> {
    diesel::update(custom_integrations::table.find(integration_id))
        .set(custom_integrations::public.eq(public))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn approve(
    db: &mut AsyncPgConnection,
    integration_id: i32,
    approved: bool,
) -> Result<()> {
    diesel::update(custom_integrations::table.find(integration_id))
        .set(custom_integrations::approved.eq(approved))
        .execute(db)
        .await?;
    Ok(())
}

/// Deletes the integration with its headers, secrets, placeholders and activations
pub async fn delete(db: &mut AsyncPgConnection, integration_id: i32) -> Result<()> {
    diesel::delete(custom_integrations::table.find(integration_id))
        .execute(db)
        .await?;
    Ok(())
}

/// One page of the integrations a guild may pick from: those it already runs, public approved
/// ones, and the caller's own. Active ones come first, then the most used.
///
/// Guild counts come from the `custom_integration_guild_counts` view and are as fresh as its
/// last refresh.
pub async fn get_available_integrations_with_active(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
    limit: i64,
    offset: i64,
) -> Result<Vec<IntegrationWithActive>> {
    Ok(diesel::sql_query(
        r#"
SELECT
    custom_integrations.*,
    (custom_integration_guilds.guild_id IS NOT NULL) AS active,
    COALESCE(custom_integration_guild_counts.count, 0)::int8 AS guild_count
FROM custom_integrations
LEFT JOIN custom_integration_guilds
    ON custom_integration_guilds.integration_id = custom_integrations.id
    AND custom_integration_guilds.guild_id = $1
LEFT JOIN custom_integration_guild_counts
    ON custom_integration_guild_counts.integration_id = custom_integrations.id
WHERE custom_integration_guilds.guild_id IS NOT NULL
    OR (custom_integrations.public AND custom_integrations.approved)
    OR custom_integrations.owner_id = $2
ORDER BY active DESC, guild_count DESC, custom_integrations.id ASC
LIMIT $3 OFFSET $4;"#,
    )
    .bind::<BigInt, _>(guild_id)
    .bind::<BigInt, _>(user_id)
    .bind::<BigInt, _>(limit)
    .bind::<BigInt, _>(offset)
    .load(db)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_methods_match_check_constraint() {
        assert!(SCHEMA.contains(&HttpMethod::sql_values()));
        assert_eq!("PATCH".parse::<HttpMethod>().ok(), Some(HttpMethod::Patch));
        assert!("get".parse::<HttpMethod>().is_err());
    }
}
