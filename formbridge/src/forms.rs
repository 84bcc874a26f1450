//! Form definition intake and lookup.
//!
//! A posted definition passes three gates before it is stored: the JSON
//! Schema, typed deserialization, then the semantic invariants in
//! [`crate::core::invariants`]. Any failure is reported as
//! [`Error::InvalidForm`] with every message collected.

use std::sync::OnceLock;

use anyhow::anyhow;
use jsonschema::{Validator, validator_for};
use serde_json::Value;
use tracing::{info, instrument};

use crate::core::field_map::SupportedField;
use crate::core::form::{Form, FormDraft};
use crate::core::invariants::validate_form_invariants;
use crate::error::{Error, Result};
use crate::io::airtable::RemoteTables;
use crate::io::oauth::AccessToken;
use crate::io::store::JsonStore;

const FORM_SCHEMA: &str = include_str!("../../schemas/form/v1.schema.json");

fn form_validator() -> Result<&'static Validator> {
    static VALIDATOR: OnceLock<Validator> = OnceLock::new();
    if let Some(validator) = VALIDATOR.get() {
        return Ok(validator);
    }
    let schema: Value = serde_json::from_str(FORM_SCHEMA)
        .map_err(|err| anyhow!("parse form schema: {}", err))?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid form schema: {}", err))?;
    Ok(VALIDATOR.get_or_init(|| compiled))
}

/// Validate a raw definition and turn it into a [`FormDraft`].
pub fn parse_form_draft(raw: &Value) -> Result<FormDraft> {
    let validator = form_validator()?;
    if !validator.is_valid(raw) {
        let messages = validator
            .iter_errors(raw)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(Error::InvalidForm(messages));
    }

    let draft: FormDraft = serde_json::from_value(raw.clone())
        .map_err(|err| Error::InvalidForm(vec![err.to_string()]))?;

    let errors = validate_form_invariants(&draft);
    if !errors.is_empty() {
        return Err(Error::InvalidForm(errors));
    }
    Ok(draft)
}

/// Validate and persist a definition for `owner_user_id`.
#[instrument(skip_all, fields(owner_user_id = %owner_user_id))]
pub fn create_form(store: &JsonStore, owner_user_id: &str, raw: &Value) -> Result<Form> {
    let draft = parse_form_draft(raw)?;
    let form = store.insert_form(owner_user_id, draft)?;
    info!(form_id = %form.id, questions = form.questions.len(), "form created");
    Ok(form)
}

pub fn load_form(store: &JsonStore, form_id: &str) -> Result<Form> {
    store
        .load_form(form_id)?
        .ok_or_else(|| Error::NotFound(format!("form {}", form_id)))
}

/// Fields of one remote table that a question can be bound to.
pub async fn table_fields(
    remote: &dyn RemoteTables,
    token: &AccessToken,
    base_id: &str,
    table_id: &str,
) -> Result<Vec<SupportedField>> {
    let tables = remote.list_tables(token, base_id).await?;
    let table = tables
        .iter()
        .find(|table| table.id == table_id)
        .ok_or_else(|| Error::NotFound(format!("table {}", table_id)))?;
    Ok(table.supported_fields())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition() -> Value {
        json!({
            "name": "Intake",
            "airtableBaseId": "app1",
            "airtableTableId": "tbl1",
            "questions": [
                {
                    "questionKey": "role",
                    "airtableFieldId": "fldRole",
                    "label": "Role",
                    "type": "singleSelect",
                    "required": true,
                    "options": ["Engineer", "Designer"]
                },
                {
                    "questionKey": "github",
                    "airtableFieldId": "fldGithub",
                    "label": "GitHub",
                    "type": "shortText",
                    "conditionalRules": {
                        "logic": "AND",
                        "conditions": [
                            {"questionKey": "role", "operator": "equals", "value": "Engineer"}
                        ]
                    }
                }
            ]
        })
    }

    #[test]
    fn accepts_well_formed_definition() {
        let draft = parse_form_draft(&definition()).expect("valid");
        assert_eq!(draft.questions.len(), 2);
        assert_eq!(draft.questions[0].kind.type_name(), "singleSelect");
    }

    #[test]
    fn schema_rejects_empty_select_options() {
        let mut raw = definition();
        raw["questions"][0]["options"] = json!([]);
        match parse_form_draft(&raw) {
            Err(Error::InvalidForm(messages)) => assert!(!messages.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn schema_rejects_options_on_non_select_questions() {
        for question_type in ["shortText", "longText", "attachment"] {
            let mut raw = definition();
            raw["questions"][1]["type"] = json!(question_type);
            raw["questions"][1]["options"] = json!(["x"]);
            match parse_form_draft(&raw) {
                Err(Error::InvalidForm(messages)) => assert!(!messages.is_empty()),
                other => panic!("{question_type}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn schema_rejects_unknown_question_type() {
        let mut raw = definition();
        raw["questions"][1]["type"] = json!("rating");
        match parse_form_draft(&raw) {
            Err(Error::InvalidForm(messages)) => {
                assert!(messages.iter().any(|msg| msg.contains("rating")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invariants_reject_dangling_condition() {
        let mut raw = definition();
        raw["questions"][1]["conditionalRules"]["conditions"][0]["questionKey"] = json!("team");
        match parse_form_draft(&raw) {
            Err(Error::InvalidForm(messages)) => {
                assert!(messages.iter().any(|msg| msg.contains("team")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn create_then_load() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::open(temp.path()).expect("open");

        let form = create_form(&store, "user-1", &definition()).expect("create");
        let loaded = load_form(&store, &form.id).expect("load");
        assert_eq!(loaded.name, "Intake");

        match load_form(&store, "missing") {
            Err(Error::NotFound(what)) => assert_eq!(what, "form missing"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
