use std::collections::HashMap;

use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::exit_survey_responses;
use crate::snowflake::Snowflake;

/// Answers given to the panel's exit survey form after a ticket closes
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS exit_survey_responses(
    "guild_id" int8 NOT NULL,
    "ticket_id" int4 NOT NULL,
    "form_id" int4 NOT NULL REFERENCES forms("form_id") ON DELETE CASCADE,
    "question_id" int4 NOT NULL REFERENCES form_input("id") ON DELETE CASCADE,
    "response" text,
    FOREIGN KEY("guild_id", "ticket_id") REFERENCES tickets("guild_id", "id"),
    PRIMARY KEY("guild_id", "ticket_id", "question_id")
);
"#;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = exit_survey_responses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ExitSurveyResponse {
    pub form_id: i32,
    pub question_id: i32,
    pub response: Option<String>,
}

/// Stores every answer of one submission, keyed by question id
pub async fn add_responses(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
    form_id: i32,
    responses: &HashMap<i32, String>,
) -> Result<()> {
    if responses.is_empty() {
        return Ok(());
    }
    let rows: Vec<_> = responses
        .iter()
        .map(|(question_id, response)| {
            (
                exit_survey_responses::guild_id.eq(guild_id),
                exit_survey_responses::ticket_id.eq(ticket_id),
                exit_survey_responses::form_id.eq(form_id),
                exit_survey_responses::question_id.eq(*question_id),
                exit_survey_responses::response.eq(Some(response.as_str())),
            )
        })
        .collect();
    diesel::insert_into(exit_survey_responses::table)
        .values(rows)
        .on_conflict((
            exit_survey_responses::guild_id,
            exit_survey_responses::ticket_id,
            exit_survey_responses::question_id,
        ))
        .do_update()
        .set(exit_survey_responses::response.eq(excluded(exit_survey_responses::response)))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_responses(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    ticket_id: i32,
) -> Result<Vec<ExitSurveyResponse>> {
    Ok(exit_survey_responses::table
        .filter(exit_survey_responses::guild_id.eq(guild_id))
        .filter(exit_survey_responses::ticket_id.eq(ticket_id))
        .order(exit_survey_responses::question_id.asc())
        .select(ExitSurveyResponse::as_select())
        .load(db)
        .await?)
}

/// Ids of the guild's tickets that have at least one survey response, newest first
pub async fn get_tickets_with_responses(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    limit: i64,
) -> Result<Vec<i32>> {
    Ok(exit_survey_responses::table
        .filter(exit_survey_responses::guild_id.eq(guild_id))
        .select(exit_survey_responses::ticket_id)
        .distinct()
        .order(exit_survey_responses::ticket_id.desc())
        .limit(limit)
        .load(db)
        .await?)
}
