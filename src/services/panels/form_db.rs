use std::collections::HashMap;

use diesel::prelude::*;
use diesel::sql_types::{Bool, Integer, Nullable, SmallInt, Text};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};
use crate::schema::{form_input, forms};
use crate::snowflake::Snowflake;

/// `(form_id, position)` is deferred so two inputs can trade places inside one transaction
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS forms(
    "form_id" SERIAL NOT NULL UNIQUE,
    "guild_id" int8 NOT NULL,
    "title" varchar(45) NOT NULL,
    "custom_id" varchar(100) NOT NULL UNIQUE,
    PRIMARY KEY("form_id")
);
CREATE INDEX IF NOT EXISTS forms_guild_id ON forms("guild_id");
CREATE TABLE IF NOT EXISTS form_input(
    "id" SERIAL NOT NULL UNIQUE,
    "form_id" int4 NOT NULL REFERENCES forms("form_id") ON DELETE CASCADE,
    "position" int4 NOT NULL,
    "custom_id" varchar(100) NOT NULL UNIQUE,
    "style" int2 NOT NULL,
    "label" varchar(255) NOT NULL,
    "placeholder" varchar(100),
    "required" bool NOT NULL DEFAULT true,
    "min_length" int2,
    "max_length" int2,
    UNIQUE("form_id", "position") DEFERRABLE INITIALLY DEFERRED,
    CHECK("position" >= 0),
    PRIMARY KEY("id")
);
CREATE INDEX IF NOT EXISTS form_input_form_id ON form_input("form_id");
"#;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = forms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Form {
    pub form_id: i32,
    pub guild_id: Snowflake,
    pub title: String,
    pub custom_id: String,
}

#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Serialize, Deserialize,
)]
#[diesel(table_name = form_input)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FormInput {
    pub id: i32,
    pub form_id: i32,
    pub position: i32,
    pub custom_id: String,
    pub style: i16,
    pub label: String,
    pub placeholder: Option<String>,
    pub required: bool,
    pub min_length: Option<i16>,
    pub max_length: Option<i16>,
}

/// A form input before it has been given an id and a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFormInput {
    pub custom_id: String,
    pub style: i16,
    pub label: String,
    pub placeholder: Option<String>,
    pub required: bool,
    pub min_length: Option<i16>,
    pub max_length: Option<i16>,
}

/// A form to create along with a panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewForm {
    pub title: String,
    pub custom_id: String,
    pub inputs: Vec<NewFormInput>,
}

pub async fn create(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    title: &str,
    custom_id: &str,
) -> Result<Form> {
    Ok(diesel::insert_into(forms::table)
        .values((
            forms::guild_id.eq(guild_id),
            forms::title.eq(title),
            forms::custom_id.eq(custom_id),
        ))
        .returning(Form::as_returning())
        .get_result(db)
        .await?)
}

/// Creates the form and its inputs in order, call from within a transaction
pub async fn create_with_inputs(
    tx: &mut AsyncPgConnection,
    guild_id: Snowflake,
    form: &NewForm,
) -> Result<Form> {
    let created = create(tx, guild_id, &form.title, &form.custom_id).await?;
    for input in &form.inputs {
        create_input(tx, created.form_id, input).await?;
    }
    Ok(created)
}

pub async fn get(db: &mut AsyncPgConnection, form_id: i32) -> Result<Option<Form>> {
    Ok(forms::table
        .find(form_id)
        .select(Form::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_by_custom_id(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
    custom_id: &str,
) -> Result<Option<Form>> {
    Ok(forms::table
        .filter(forms::guild_id.eq(guild_id))
        .filter(forms::custom_id.eq(custom_id))
        .select(Form::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_forms(db: &mut AsyncPgConnection, guild_id: Snowflake) -> Result<Vec<Form>> {
    Ok(forms::table
        .filter(forms::guild_id.eq(guild_id))
        .order(forms::form_id.asc())
        .select(Form::as_select())
        .load(db)
        .await?)
}

pub async fn update_title(db: &mut AsyncPgConnection, form_id: i32, title: &str) -> Result<()> {
    diesel::update(forms::table.find(form_id))
        .set(forms::title.eq(title))
        .execute(db)
        .await?;
    Ok(())
}

/// Deletes the form and its inputs. Panels using it fall back to no form.
pub async fn delete(db: &mut AsyncPgConnection, form_id: i32) -> Result<()> {
    diesel::delete(forms::table.find(form_id))
        .execute(db)
        .await?;
    Ok(())
}

/// Appends an input after the form's last one
pub async fn create_input(
    db: &mut AsyncPgConnection,
    form_id: i32,
    input: &NewFormInput,
) -> Result<FormInput> {
    Ok(diesel::sql_query(
        r#"
INSERT INTO form_input("form_id", "position", "custom_id", "style", "label", "placeholder", "required", "min_length", "max_length")
SELECT $1, COALESCE(MAX("position") + 1, 0), $2, $3, $4, $5, $6, $7, $8
FROM form_input
WHERE "form_id" = $1
RETURNING *;"#,
    )
    .bind::<Integer, _>(form_id)
    .bind::<Text, _>(&input.custom_id)
    .bind::<SmallInt, _>(input.style)
    .bind::<Text, _>(&input.label)
    .bind::<Nullable<Text>, _>(&input.placeholder)
    .bind::<Bool, _>(input.required)
    .bind::<Nullable<SmallInt>, _>(input.min_length)
    .bind::<Nullable<SmallInt>, _>(input.max_length)
    .get_result::<FormInput>(db)
    .await?)
}

pub async fn get_input(db: &mut AsyncPgConnection, id: i32) -> Result<Option<FormInput>> {
    Ok(form_input::table
        .find(id)
        .select(FormInput::as_select())
        .first(db)
        .await
        .optional()?)
}

pub async fn get_inputs(db: &mut AsyncPgConnection, form_id: i32) -> Result<Vec<FormInput>> {
    Ok(form_input::table
        .filter(form_input::form_id.eq(form_id))
        .order(form_input::position.asc())
        .select(FormInput::as_select())
        .load(db)
        .await?)
}

/// Inputs of every form in the guild, keyed by form id and ordered by position
pub async fn get_all_inputs_by_guild(
    db: &mut AsyncPgConnection,
    guild_id: Snowflake,
) -> Result<HashMap<i32, Vec<FormInput>>> {
    let inputs: Vec<FormInput> = form_input::table
        .inner_join(forms::table)
        .filter(forms::guild_id.eq(guild_id))
        .order((form_input::form_id.asc(), form_input::position.asc()))
        .select(FormInput::as_select())
        .load(db)
        .await?;
    let mut by_form: HashMap<i32, Vec<FormInput>> = HashMap::new();
    for input in inputs {
        by_form.entry(input.form_id).or_default().push(input);
    }
    Ok(by_form)
}

/// Updates everything but the input's form and position
pub async fn update_input(db: &mut AsyncPgConnection, input: &FormInput) -> Result<()> {
    let updated = diesel::update(form_input::table.find(input.id))
        .set((
            form_input::custom_id.eq(&input.custom_id),
            form_input::style.eq(input.style),
            form_input::label.eq(&input.label),
            form_input::placeholder.eq(&input.placeholder),
            form_input::required.eq(input.required),
            form_input::min_length.eq(input.min_length),
            form_input::max_length.eq(input.max_length),
        ))
        .execute(db)
        .await?;
    if updated == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Removes the input and closes the gap it leaves, call from within a transaction
pub async fn delete_input(tx: &mut AsyncPgConnection, form_id: i32, id: i32) -> Result<()> {
    let Some(position) = diesel::delete(
        form_input::table
            .filter(form_input::id.eq(id))
            .filter(form_input::form_id.eq(form_id)),
    )
    .returning(form_input::position)
    .get_result::<i32>(tx)
    .await
    .optional()?
    else {
        return Ok(());
    };
    diesel::update(
        form_input::table
            .filter(form_input::form_id.eq(form_id))
            .filter(form_input::position.gt(position)),
    )
    .set(form_input::position.eq(form_input::position - 1))
    .execute(tx)
    .await?;
    Ok(())
}

/// Trades the positions of two inputs of the same form, call from within a transaction
pub async fn swap_positions(
    tx: &mut AsyncPgConnection,
    form_id: i32,
    first_id: i32,
    second_id: i32,
) -> Result<()> {
    let positions: Vec<(i32, i32)> = form_input::table
        .filter(form_input::form_id.eq(form_id))
        .filter(form_input::id.eq_any([first_id, second_id]))
        .select((form_input::id, form_input::position))
        .load(tx)
        .await?;
    let position_of = |id: i32| {
        positions
            .iter()
            .find(|(input_id, _)| *input_id == id)
            .map(|(_, position)| *position)
            .ok_or(DbError::NotFound)
    };
    let (first, second) = (position_of(first_id)?, position_of(second_id)?);
    diesel::update(form_input::table.find(first_id))
        .set(form_input::position.eq(second))
        .execute(tx)
        .await?;
    diesel::update(form_input::table.find(second_id))
        .set(form_input::position.eq(first))
        .execute(tx)
        .await?;
    Ok(())
}
