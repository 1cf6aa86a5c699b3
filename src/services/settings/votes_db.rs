use chrono::{DateTime, TimeDelta, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::Result;
use crate::schema::votes;
use crate::snowflake::Snowflake;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS votes(
    "user_id" int8 NOT NULL UNIQUE,
    "vote_time" timestamptz NOT NULL,
    PRIMARY KEY("user_id")
);
"#;

/// Time of the user's most recent vote
pub async fn get(db: &mut AsyncPgConnection, user_id: Snowflake) -> Result<Option<DateTime<Utc>>> {
    Ok(votes::table
        .find(user_id)
        .select(votes::vote_time)
        .first(db)
        .await
        .optional()?)
}

/// Records a vote made now
pub async fn set(db: &mut AsyncPgConnection, user_id: Snowflake) -> Result<()> {
    diesel::insert_into(votes::table)
        .values((
            votes::user_id.eq(user_id),
            votes::vote_time.eq(diesel::dsl::now),
        ))
        .on_conflict(votes::user_id)
        .do_update()
        .set(votes::vote_time.eq(excluded(votes::vote_time)))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn has_voted_within(
    db: &mut AsyncPgConnection,
    user_id: Snowflake,
    window: TimeDelta,
) -> Result<bool> {
    Ok(get(db, user_id)
        .await?
        .is_some_and(|vote_time| vote_time + window >= Utc::now()))
}
