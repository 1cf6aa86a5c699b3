use diesel::prelude::*;
use diesel::sql_types::{Array, BigInt, Bool};
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::{permissions, role_permissions};
use crate::snowflake::Snowflake;

/// Direct grants to users and roles. `admin` implies `support`, the writers below keep
/// `support` set whenever `admin` is.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS permissions(
    "guild_id" int8 NOT NULL,
    "user_id" int8 NOT NULL,
    "support" bool NOT NULL,
    "admin" bool NOT NULL,
    PRIMARY KEY("guild_id", "user_id")
);
CREATE TABLE IF NOT EXISTS role_permissions(
    "guild_id" int8 NOT NULL,
    "role_id" int8 NOT NULL,
    "support" bool NOT NULL,
    "admin" bool NOT NULL,
    PRIMARY KEY("guild_id", "role_id")
);
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    #[default]
    Everyone,
    Support,
    Admin,
}

impl PermissionLevel {
    fn from_flags(support: bool, admin: bool) -> Self {
        if admin {
            PermissionLevel::Admin
        } else if support {
            PermissionLevel::Support
        } else {
            PermissionLevel::Everyone
        }
    }
}

pub async fn add_support(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
) -> Result<()> {
    diesel::insert_into(permissions::table)
        .values((
            permissions::guild_id.eq(guild_id),
            permissions::user_id.eq(user_id),
            permissions::support.eq(true),
            permissions::admin.eq(false),
        ))
        .on_conflict((permissions::guild_id, permissions::user_id))
        .do_update()
        .set(permissions::support.eq(true))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn add_admin(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
) -> Result<()> {
    diesel::insert_into(permissions::table)
        .values((
            permissions::guild_id.eq(guild_id),
            permissions::user_id.eq(user_id),
            permissions::support.eq(true),
            permissions::admin.eq(true),
        ))
        .on_conflict((permissions::guild_id, permissions::user_id))
        .do_update()
        .set((
            permissions::support.eq(excluded(permissions::support)),
            permissions::admin.eq(excluded(permissions::admin)),
        ))
        .execute(db)
        .await?;
    Ok(())
}

/// Revokes support, and with it admin
pub async fn remove_support(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
) -> Result<()> {
    diesel::delete(permissions::table.find((guild_id, user_id)))
        .execute(db)
        .await?;
    Ok(())
}

/// Demotes an admin back to support
pub async fn remove_admin(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
) -> Result<()> {
    diesel::update(permissions::table.find((guild_id, user_id)))
        .set(permissions::admin.eq(false))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_admins(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<Vec<Snowflake>> {
    Ok(permissions::table
        .filter(permissions::guild_id.eq(guild_id))
        .filter(permissions::admin.eq(true))
        .order(permissions::user_id.asc())
        .select(permissions::user_id)
        .load(db)
        .await?)
}

/// Users granted support directly, admins included
pub async fn get_support(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
) -> Result<Vec<Snowflake>> {
    Ok(permissions::table
        .filter(permissions::guild_id.eq(guild_id))
        .filter(permissions::support.eq(true).or(permissions::admin.eq(true)))
        .order(permissions::user_id.asc())
        .select(permissions::user_id)
        .load(db)
        .await?)
}

/// Grants a role support or admin. `admin = true` always grants support too.
pub async fn set_role_permission(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    role_id: Snowflake,
    level: PermissionLevel,
) -> Result<()> {
    if level == PermissionLevel::Everyone {
        diesel::delete(role_permissions::table.find((guild_id, role_id)))
            .execute(db)
            .await?;
        return Ok(());
    }
    let admin = level == PermissionLevel::Admin;
    diesel::insert_into(role_permissions::table)
        .values((
            role_permissions::guild_id.eq(guild_id),
            role_permissions::role_id.eq(role_id),
            role_permissions::support.eq(true),
            role_permissions::admin.eq(admin),
        ))
        .on_conflict((role_permissions::guild_id, role_permissions::role_id))
        .do_update()
        .set((
            role_permissions::support.eq(excluded(role_permissions::support)),
            role_permissions::admin.eq(excluded(role_permissions::admin)),
        ))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_role_permission(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    role_id: Snowflake,
) -> Result<PermissionLevel> {
    Ok(role_permissions::table
        .find((guild_id, role_id))
        .select((role_permissions::support, role_permissions::admin))
        .first::<(bool, bool)>(db)
        .await
        .optional()?
        .map(|(support, admin)| PermissionLevel::from_flags(support, admin))
        .unwrap_or_default())
}

#[derive(QueryableByName)]
struct Flags {
    #[diesel(sql_type = Bool)]
    support: bool,
    #[diesel(sql_type = Bool)]
    admin: bool,
}

/// Highest level the user holds through a direct grant, a role grant, or membership of a
/// support team (directly or by role)
pub async fn get_permission_level(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
    role_ids: &[Snowflake],
) -> Result<PermissionLevel> {
    let flags = diesel::sql_query(
        r#"
SELECT
    COALESCE(BOOL_OR(grants.support), false) AS support,
    COALESCE(BOOL_OR(grants.admin), false) AS admin
FROM (
    SELECT "support", "admin" FROM permissions
    WHERE "guild_id" = $1 AND "user_id" = $2
    UNION ALL
    SELECT "support", "admin" FROM role_permissions
    WHERE "guild_id" = $1 AND "role_id" = ANY($3)
    UNION ALL
    SELECT true, false FROM support_team_members
    INNER JOIN support_team ON support_team_members.team_id = support_team.id
    WHERE support_team.guild_id = $1 AND support_team_members.user_id = $2
    UNION ALL
    SELECT true, false FROM support_team_roles
    INNER JOIN support_team ON support_team_roles.team_id = support_team.id
    WHERE support_team.guild_id = $1 AND support_team_roles.role_id = ANY($3)
) AS grants;"#,
    )
    .bind::<BigInt, _>(guild_id)
    .bind::<BigInt, _>(user_id)
    .bind::<Array<BigInt>, _>(role_ids)
    .get_result::<Flags>(db)
    .await?;
    Ok(PermissionLevel::from_flags(flags.support, flags.admin))
}

pub async fn is_support(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
    role_ids: &[Snowflake],
) -> Result<bool> {
    Ok(get_permission_level(db, guild_id, user_id, role_ids).await? >= PermissionLevel::Support)
}

pub async fn is_admin(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    user_id: Snowflake,
    role_ids: &[Snowflake],
) -> Result<bool> {
    Ok(get_permission_level(db, guild_id, user_id, role_ids).await? == PermissionLevel::Admin)
}
