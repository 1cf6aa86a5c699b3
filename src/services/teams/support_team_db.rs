use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::{support_team, support_team_members, support_team_roles};
use crate::snowflake::Snowflake;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS support_team(
    "id" SERIAL NOT NULL UNIQUE,
    "guild_id" int8 NOT NULL,
    "name" varchar(32) NOT NULL,
    UNIQUE("guild_id", "name"),
    PRIMARY KEY("id")
);
CREATE INDEX IF NOT EXISTS support_team_guild_id ON support_team("guild_id");
CREATE TABLE IF NOT EXISTS support_team_members(
    "team_id" int4 NOT NULL REFERENCES support_team("id") ON DELETE CASCADE,
    "user_id" int8 NOT NULL,
    PRIMARY KEY("team_id", "user_id")
);
CREATE INDEX IF NOT EXISTS support_team_members_user_id ON support_team_members("user_id");
CREATE TABLE IF NOT EXISTS support_team_roles(
    "team_id" int4 NOT NULL REFERENCES support_team("id") ON DELETE CASCADE,
    "role_id" int8 NOT NULL,
    PRIMARY KEY("team_id", "role_id")
);
CREATE INDEX IF NOT EXISTS support_team_roles_role_id ON support_team_roles("role_id");
"#;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Queryable, Selectable, Identifiable, Serialize, Deserialize,
)]
#[diesel(table_name = support_team)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SupportTeam {
    pub id: i32,
    pub guild_id: Snowflake,
    pub name: String,
}

pub async fn create(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    name: &str,
) -> Result<SupportTeam> {
    Ok(diesel::insert_into(support_team::table)
        .values((
            support_team::guild_id.eq(guild_id),
            support_team::name.eq(name),
        ))
        .returning(SupportTeam::as_returning())
        .get_result(db)
        .await?)
}

pub async fn get(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    team_id: i32,
) -> Result<Option<SupportTeam>> {
    Ok(support_team::table
        .filter(support_team::id.eq(team_id))
        .filter(support_team::guild_id.eq(guild_id))
        .select(SupportTeam::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_by_name(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    name: &str,
) -> Result<Option<SupportTeam>> {
    Ok(support_team::table
        .filter(support_team::guild_id.eq(guild_id))
        .filter(support_team::name.eq(name))
        .select(SupportTeam::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_all(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<Vec<SupportTeam>> {
    Ok(support_team::table
        .filter(support_team::guild_id.eq(guild_id))
        .order(support_team::id.asc())
        .select(SupportTeam::as_select())
        .load(db)
        .await?)
}

pub async fn exists(db: &mut AsyncPgConnection, guild_id: Snowflake, team_id: i32) -> Result<bool> {
    Ok(diesel::select(diesel::dsl::exists(
        support_team::table
            .filter(support_team::id.eq(team_id))
            .filter(support_team::guild_id.eq(guild_id)),
    ))
    .get_result(db)
    .await?)
}

/// Deletes the team along with its members, roles and panel bindings
pub async fn delete(db: &mut AsyncPgConnection, guild_id: Snowflake, team_id: i32) -> Result<()> {
    diesel::delete(
        support_team::table
            .filter(support_team::id.eq(team_id))
            .filter(support_team::guild_id.eq(guild_id)),
    )
    .execute(db)
    .await?;
    Ok(())
}

pub async fn add_member(
    db: &mut AsyncPgConnection,
    team_id: i32,
    user_id: Snowflake,
) -> Result<()> {
    diesel::insert_into(support_team_members::table)
        .values((
            support_team_members::team_id.eq(team_id),
            support_team_members::user_id.eq(user_id),
        ))
        .on_conflict_do_nothing()
        .execute(db)
        .await?;
    Ok(())
}

pub async fn remove_member(
    db: &mut AsyncPgConnection,
    team_id: i32,
    user_id: Snowflake,
) -> Result<()> {
    diesel::delete(support_team_members::table.find((team_id, user_id)))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_members(db: &mut AsyncPgConnection, team_id: i32) -> Result<Vec<Snowflake>> {
    Ok(support_team_members::table
        .filter(support_team_members::team_id.eq(team_id))
        .order(support_team_members::user_id.asc())
        .select(support_team_members::user_id)
        .load(db)
        .await?)
}

pub async fn add_role(db: &mut AsyncPgConnection, team_id: i32, role_id: Snowflake) -> Result<()> {
    diesel::insert_into(support_team_roles::table)
        .values((
            support_team_roles::team_id.eq(team_id),
            support_team_roles::role_id.eq(role_id),
        ))
        .on_conflict_do_nothing()
        .execute(db)
        .await?;
    Ok(())
}

pub async fn remove_role(
    db: &mut AsyncPgConnection,
    team_id: i32,
    role_id: Snowflake,
) -> Result<()> {
    diesel::delete(support_team_roles::table.find((team_id, role_id)))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_roles(db: &mut AsyncPgConnection, team_id: i32) -> Result<Vec<Snowflake>> {
    Ok(support_team_roles::table
        .filter(support_team_roles::team_id.eq(team_id))
        .order(support_team_roles::role_id.asc())
        .select(support_team_roles::role_id)
        .load(db)
        .await?)
}

/// Every team in the guild with its members, in one round trip. Teams without members map to
/// an empty list.
pub async fn get_with_members(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
) -> Result<HashMap<SupportTeam, Vec<Snowflake>>> {
    let rows: Vec<(SupportTeam, Option<Snowflake>)> = support_team::table
        .left_join(support_team_members::table)
        .filter(support_team::guild_id.eq(guild_id))
        .select((
            SupportTeam::as_select(),
            support_team_members::user_id.nullable(),
        ))
        .load(db)
        .await?;

    let mut teams: HashMap<SupportTeam, Vec<Snowflake>> = HashMap::new();
    for (team, member) in rows {
        let members = teams.entry(team).or_default();
        if let Some(member) = member {
            members.push(member);
        }
    }
    Ok(teams)
}

/// Whether the user is a member of any of `team_ids` in the guild, used by panels that
/// replace the default team with their own
pub async fn is_support_subset(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
    team_ids: &[i32],
) -> Result<bool> {
    if team_ids.is_empty() {
        return Ok(false);
    }
    Ok(diesel::select(diesel::dsl::exists(
        support_team_members::table
            .inner_join(support_team::table)
            .filter(support_team::guild_id.eq(guild_id))
            .filter(support_team::id.eq_any(team_ids))
            .filter(support_team_members::user_id.eq(user_id)),
    ))
    .get_result(db)
    .await?)
}

/// Role counterpart of [`is_support_subset`]
pub async fn is_support_subset_roles(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    role_ids: &[Snowflake],
    team_ids: &[i32],
) -> Result<bool> {
    if team_ids.is_empty() || role_ids.is_empty() {
        return Ok(false);
    }
    Ok(diesel::select(diesel::dsl::exists(
        support_team_roles::table
            .inner_join(support_team::table)
            .filter(support_team::guild_id.eq(guild_id))
            .filter(support_team::id.eq_any(team_ids))
            .filter(support_team_roles::role_id.eq_any(role_ids)),
    ))
    .get_result(db)
    .await?)
}
