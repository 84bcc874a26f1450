//! End-to-end submission flow against scripted remote collaborators.
//!
//! Creates a form through the definition gate, submits answers through
//! `submit_response`, and checks what reached the remote table and the store.

use serde_json::{Value, json};

use formbridge::core::types::NormalizedValue;
use formbridge::error::Error;
use formbridge::forms::{create_form, table_fields};
use formbridge::io::oauth::AccessToken;
use formbridge::submit::{list_responses, submit_response};
use formbridge::test_support::{ScriptedRemote, answers, temp_store};

fn definition() -> Value {
    json!({
        "name": "Adoption",
        "airtableBaseId": "app_test",
        "airtableTableId": "tbl_test",
        "questions": [
            {
                "questionKey": "has_pet",
                "airtableFieldId": "fldPet",
                "label": "Do you have a pet?",
                "type": "singleSelect",
                "required": true,
                "options": ["yes", "no"]
            },
            {
                "questionKey": "pet_name",
                "airtableFieldId": "fldPetName",
                "label": "Pet name",
                "type": "shortText",
                "required": true,
                "conditionalRules": {
                    "logic": "AND",
                    "conditions": [
                        {"questionKey": "has_pet", "operator": "equals", "value": "yes"}
                    ]
                }
            },
            {
                "questionKey": "photos",
                "airtableFieldId": "fldPhotos",
                "label": "Photos",
                "type": "attachment"
            }
        ]
    })
}

#[tokio::test]
async fn accepted_submission_writes_one_row_and_a_receipt() {
    let (_temp, store) = temp_store();
    let remote = ScriptedRemote::default();
    let token = AccessToken::new("token-abc");
    let form = create_form(&store, "user-1", &definition()).expect("create form");

    let submitted = answers(&[
        ("has_pet", json!("yes")),
        ("pet_name", json!("Biscuit")),
        ("photos", json!(["https://img.example/1.png"])),
    ]);
    let receipt = submit_response(&store, &remote, &token, &form.id, &submitted)
        .await
        .expect("submit");
    assert_eq!(receipt.airtable_record_id, "rec1");

    let rows = remote.created();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].token, "token-abc");
    assert_eq!(rows[0].base_id, "app_test");
    assert_eq!(rows[0].table_id, "tbl_test");
    assert_eq!(
        rows[0].fields.get("fldPetName"),
        Some(&NormalizedValue::Scalar(json!("Biscuit")))
    );
    assert_eq!(
        serde_json::to_value(&rows[0].fields["fldPhotos"]).expect("serialize"),
        json!([{"url": "https://img.example/1.png"}])
    );

    let listed = list_responses(&store, &form.id).expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, receipt.response_id);
}

#[tokio::test]
async fn hidden_required_question_is_neither_checked_nor_written() {
    let (_temp, store) = temp_store();
    let remote = ScriptedRemote::default();
    let token = AccessToken::new("token-abc");
    let form = create_form(&store, "user-1", &definition()).expect("create form");

    let submitted = answers(&[("has_pet", json!("no")), ("pet_name", Value::Null)]);
    submit_response(&store, &remote, &token, &form.id, &submitted)
        .await
        .expect("hidden required question is skipped");

    let submitted = answers(&[("has_pet", json!("no")), ("pet_name", json!("ignored"))]);
    submit_response(&store, &remote, &token, &form.id, &submitted)
        .await
        .expect("submit");

    let rows = remote.created();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| !row.fields.contains_key("fldPetName")));
    assert_eq!(list_responses(&store, &form.id).expect("list").len(), 2);
}

#[tokio::test]
async fn rejected_submission_reports_every_error_and_writes_nothing() {
    let (_temp, store) = temp_store();
    let remote = ScriptedRemote::default();
    let token = AccessToken::new("token-abc");
    let form = create_form(&store, "user-1", &definition()).expect("create form");

    let submitted = answers(&[
        ("has_pet", json!("yes")),
        ("photos", json!([42])),
    ]);
    match submit_response(&store, &remote, &token, &form.id, &submitted).await {
        Err(Error::Validation(errors)) => {
            let keys: Vec<&str> = errors.iter().map(|err| err.question_key.as_str()).collect();
            assert_eq!(keys, vec!["pet_name", "photos"]);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(remote.created().is_empty());
    assert!(list_responses(&store, &form.id).expect("list").is_empty());
}

#[tokio::test]
async fn upstream_failure_stores_no_receipt() {
    let (_temp, store) = temp_store();
    let remote = ScriptedRemote::failing_create(422, json!({"error": {"type": "INVALID_VALUE"}}));
    let token = AccessToken::new("token-abc");
    let form = create_form(&store, "user-1", &definition()).expect("create form");

    let submitted = answers(&[("has_pet", json!("no"))]);
    match submit_response(&store, &remote, &token, &form.id, &submitted).await {
        Err(Error::Upstream {
            status, payload, ..
        }) => {
            assert_eq!(status, Some(422));
            assert_eq!(payload["error"]["type"], "INVALID_VALUE");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(list_responses(&store, &form.id).expect("list").is_empty());
}

#[tokio::test]
async fn unknown_form_is_not_found() {
    let (_temp, store) = temp_store();
    let remote = ScriptedRemote::default();
    let token = AccessToken::new("token-abc");

    let result = submit_response(&store, &remote, &token, "missing", &answers(&[])).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn table_fields_keep_only_supported_types() {
    let remote = ScriptedRemote::default();
    let token = AccessToken::new("token-abc");

    let fields = table_fields(&remote, &token, "app_test", "tbl_test")
        .await
        .expect("fields");
    let types: Vec<&str> = fields.iter().map(|field| field.question_type).collect();
    assert_eq!(types, vec!["shortText", "singleSelect"]);
    assert_eq!(
        fields[1].options,
        Some(vec!["A".to_string(), "B".to_string()])
    );

    let missing = table_fields(&remote, &token, "app_test", "tbl_missing").await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}
