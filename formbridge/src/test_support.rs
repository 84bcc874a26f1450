//! Test-only builders and scripted collaborators.
//!
//! Questions built here bind to remote field `fld_<key>`.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;
use url::Url;

use crate::core::form::{
    Condition, ConditionalRules, Form, FormDraft, Logic, Operator, Question, QuestionKind,
    SelectOptions,
};
use crate::core::types::{AnswersMap, NormalizedRecord};
use crate::error::{Error, Result};
use crate::io::airtable::{
    BaseSummary, FieldChoice, FieldOptions, RemoteField, RemoteTable, RemoteTables, RemoteUser,
};
use crate::io::oauth::{AccessToken, TokenExchange, TokenSet};
use crate::io::store::JsonStore;

fn question(key: &str, kind: QuestionKind) -> Question {
    Question {
        key: key.to_string(),
        remote_field_id: format!("fld_{}", key),
        remote_field_name: None,
        label: format!("{} label", key),
        required: false,
        kind,
        conditional_rules: None,
    }
}

fn options(values: &[&str]) -> SelectOptions {
    SelectOptions::new(values.iter().map(|value| value.to_string()).collect())
        .expect("test options must be non-empty")
}

/// Optional short-text question.
pub fn short_text(key: &str) -> Question {
    question(key, QuestionKind::ShortText)
}

pub fn single_select_question(key: &str, values: &[&str]) -> Question {
    question(
        key,
        QuestionKind::SingleSelect {
            options: options(values),
        },
    )
}

pub fn multi_select_question(key: &str, values: &[&str]) -> Question {
    question(
        key,
        QuestionKind::MultiSelect {
            options: options(values),
        },
    )
}

pub fn attachment_question(key: &str) -> Question {
    question(key, QuestionKind::Attachment)
}

/// Mark a question as required.
pub fn required(mut question: Question) -> Question {
    question.required = true;
    question
}

pub fn rules(logic: Logic, conditions: Vec<Condition>) -> ConditionalRules {
    ConditionalRules { logic, conditions }
}

pub fn condition(key: &str, operator: Operator, value: Value) -> Condition {
    Condition {
        question_key: key.to_string(),
        operator,
        value,
    }
}

pub fn answers(pairs: &[(&str, Value)]) -> AnswersMap {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// Draft bound to base `app_test` / table `tbl_test`.
pub fn draft_with(questions: Vec<Question>) -> FormDraft {
    FormDraft {
        name: "Test form".to_string(),
        description: None,
        airtable_base_id: "app_test".to_string(),
        airtable_table_id: "tbl_test".to_string(),
        questions,
    }
}

/// In-memory form with fixed id and timestamps.
pub fn form_with(questions: Vec<Question>) -> Form {
    let created_at = chrono::DateTime::from_timestamp(1_700_000_000, 0)
        .expect("valid fixed timestamp");
    let draft = draft_with(questions);
    Form {
        id: "form_test".to_string(),
        owner_user_id: "user_test".to_string(),
        name: draft.name,
        description: draft.description,
        airtable_base_id: draft.airtable_base_id,
        airtable_table_id: draft.airtable_table_id,
        questions: draft.questions,
        created_at,
        updated_at: created_at,
    }
}

/// Store in a fresh temp dir. Keep the `TempDir` alive for the test.
pub fn temp_store() -> (TempDir, JsonStore) {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = JsonStore::open(temp.path()).expect("open store");
    (temp, store)
}

/// Table with `(id, name, type)` fields; select fields get choices `A` and `B`.
pub fn remote_table(id: &str, name: &str, fields: &[(&str, &str, &str)]) -> RemoteTable {
    RemoteTable {
        id: id.to_string(),
        name: name.to_string(),
        fields: fields
            .iter()
            .map(|(field_id, field_name, field_type)| {
                let is_select = matches!(*field_type, "singleSelect" | "multipleSelects");
                RemoteField {
                    id: field_id.to_string(),
                    name: field_name.to_string(),
                    field_type: field_type.to_string(),
                    options: is_select.then(|| FieldOptions {
                        choices: ["A", "B"]
                            .into_iter()
                            .map(|name| FieldChoice {
                                name: name.to_string(),
                            })
                            .collect(),
                    }),
                }
            })
            .collect(),
    }
}

/// One `create_record` call as seen by [`ScriptedRemote`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedRow {
    pub token: String,
    pub base_id: String,
    pub table_id: String,
    pub fields: NormalizedRecord,
}

/// Remote API double with canned schema and recorded writes.
pub struct ScriptedRemote {
    pub user: RemoteUser,
    pub bases: Vec<BaseSummary>,
    pub tables: Vec<RemoteTable>,
    /// When set, `create_record` fails with this status and payload.
    pub create_failure: Option<(u16, Value)>,
    created: Mutex<Vec<CreatedRow>>,
}

impl Default for ScriptedRemote {
    fn default() -> Self {
        Self {
            user: RemoteUser {
                id: "usr_test".to_string(),
                email: Some("owner@example.com".to_string()),
                name: Some("Owner".to_string()),
                full_name: None,
            },
            bases: vec![BaseSummary {
                id: "app_test".to_string(),
                name: "Test base".to_string(),
            }],
            tables: vec![remote_table(
                "tbl_test",
                "Responses",
                &[
                    ("fld_name", "Name", "singleLineText"),
                    ("fld_color", "Color", "singleSelect"),
                    ("fld_score", "Score", "number"),
                ],
            )],
            create_failure: None,
            created: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedRemote {
    pub fn failing_create(status: u16, payload: Value) -> Self {
        Self {
            create_failure: Some((status, payload)),
            ..Self::default()
        }
    }

    /// Rows written so far, in call order.
    pub fn created(&self) -> Vec<CreatedRow> {
        self.created.lock().expect("created lock").clone()
    }
}

#[async_trait]
impl RemoteTables for ScriptedRemote {
    async fn whoami(&self, _token: &AccessToken) -> Result<RemoteUser> {
        Ok(self.user.clone())
    }

    async fn list_bases(&self, _token: &AccessToken) -> Result<Vec<BaseSummary>> {
        Ok(self.bases.clone())
    }

    async fn list_tables(&self, _token: &AccessToken, base_id: &str) -> Result<Vec<RemoteTable>> {
        if self.bases.iter().any(|base| base.id == base_id) {
            Ok(self.tables.clone())
        } else {
            Err(Error::Upstream {
                operation: "list tables",
                status: Some(404),
                payload: json!({ "error": "NOT_FOUND" }),
            })
        }
    }

    async fn create_record(
        &self,
        token: &AccessToken,
        base_id: &str,
        table_id: &str,
        fields: &NormalizedRecord,
    ) -> Result<String> {
        if let Some((status, payload)) = &self.create_failure {
            return Err(Error::Upstream {
                operation: "create record",
                status: Some(*status),
                payload: payload.clone(),
            });
        }
        let mut created = self.created.lock().expect("created lock");
        created.push(CreatedRow {
            token: token.secret().to_string(),
            base_id: base_id.to_string(),
            table_id: table_id.to_string(),
            fields: fields.clone(),
        });
        Ok(format!("rec{}", created.len()))
    }
}

/// OAuth double: a fixed authorize URL and a canned token response.
pub struct ScriptedOAuth {
    pub access_token: String,
    /// When set, `exchange_code` fails with this status and payload.
    pub exchange_failure: Option<(u16, Value)>,
    exchanges: Mutex<Vec<(String, String)>>,
}

impl Default for ScriptedOAuth {
    fn default() -> Self {
        Self {
            access_token: "token-test".to_string(),
            exchange_failure: None,
            exchanges: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedOAuth {
    /// `(code, verifier)` pairs passed to `exchange_code`.
    pub fn exchanges(&self) -> Vec<(String, String)> {
        self.exchanges.lock().expect("exchanges lock").clone()
    }
}

#[async_trait]
impl TokenExchange for ScriptedOAuth {
    fn authorization_url(&self, challenge: &str, state: &str) -> Result<Url> {
        let url = Url::parse_with_params(
            "https://auth.test/authorize",
            &[("code_challenge", challenge), ("state", state)],
        )
        .expect("static authorize url");
        Ok(url)
    }

    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenSet> {
        self.exchanges
            .lock()
            .expect("exchanges lock")
            .push((code.to_string(), verifier.to_string()));
        if let Some((status, payload)) = &self.exchange_failure {
            return Err(Error::Upstream {
                operation: "token exchange",
                status: Some(*status),
                payload: payload.clone(),
            });
        }
        Ok(TokenSet {
            access_token: AccessToken::new(self.access_token.clone()),
            refresh_token: None,
            token_type: Some("bearer".to_string()),
            scope: None,
            expires_in: Some(3600),
            refresh_expires_in: None,
        })
    }
}
