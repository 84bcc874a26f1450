//! JSON document store for forms, responses and users.
//!
//! Layout under the configured data directory:
//!
//! ```text
//! forms/<form_id>.json
//! responses/<form_id>/<response_id>.json
//! users/<airtable_user_id>.json
//! ```
//!
//! Every document is written atomically (temp file + rename). Identifiers
//! are restricted to `[A-Za-z0-9_-]` before they touch a path.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::core::form::{Form, FormDraft};
use crate::core::types::AnswersMap;
use crate::io::airtable::RemoteUser;

/// A stored submission. Remote-side deletion is never observed, so
/// `deleted_in_airtable` stays false unless set by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub id: String,
    pub form_id: String,
    pub airtable_record_id: String,
    pub answers: AnswersMap,
    #[serde(default)]
    pub deleted_in_airtable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Local profile of a remote account, keyed by the remote user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub airtable_user_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

pub struct JsonStore {
    root: PathBuf,
    // Serializes read-modify-write on user documents.
    users_lock: Mutex<()>,
}

impl JsonStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        for dir in ["forms", "responses", "users"] {
            let path = root.join(dir);
            fs::create_dir_all(&path)
                .with_context(|| format!("create directory {}", path.display()))?;
        }
        debug!(root = %root.display(), "store opened");
        Ok(Self {
            root: root.to_path_buf(),
            users_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a new form owned by `owner_user_id` and return it.
    pub fn insert_form(&self, owner_user_id: &str, draft: FormDraft) -> Result<Form> {
        let now = Utc::now();
        let form = Form {
            id: new_id(),
            owner_user_id: owner_user_id.to_string(),
            name: draft.name,
            description: draft.description,
            airtable_base_id: draft.airtable_base_id,
            airtable_table_id: draft.airtable_table_id,
            questions: draft.questions,
            created_at: now,
            updated_at: now,
        };
        let path = self.form_path(&form.id)?;
        write_json(&path, &form)?;
        debug!(form_id = %form.id, questions = form.questions.len(), "form stored");
        Ok(form)
    }

    /// Load a form by id. Unknown and malformed ids both yield `None`.
    pub fn load_form(&self, form_id: &str) -> Result<Option<Form>> {
        let Ok(path) = self.form_path(form_id) else {
            return Ok(None);
        };
        read_json_opt(&path)
    }

    pub fn insert_response(
        &self,
        form_id: &str,
        airtable_record_id: &str,
        answers: &AnswersMap,
    ) -> Result<ResponseRecord> {
        let dir = self.responses_dir(form_id)?;
        let now = Utc::now();
        let record = ResponseRecord {
            id: new_id(),
            form_id: form_id.to_string(),
            airtable_record_id: airtable_record_id.to_string(),
            answers: answers.clone(),
            deleted_in_airtable: false,
            created_at: now,
            updated_at: now,
        };
        write_json(&dir.join(format!("{}.json", record.id)), &record)?;
        debug!(form_id, response_id = %record.id, "response stored");
        Ok(record)
    }

    /// All stored responses for a form, newest first.
    pub fn list_responses(&self, form_id: &str) -> Result<Vec<ResponseRecord>> {
        let dir = self.responses_dir(form_id)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
            let path = entry
                .with_context(|| format!("read entry in {}", dir.display()))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let record: ResponseRecord = read_json(&path)?;
            records.push(record);
        }
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    /// Create or refresh the local profile for `remote`.
    ///
    /// Existing profiles keep their id and `created_at`; email, name and
    /// timestamps are refreshed.
    pub fn upsert_user(&self, remote: &RemoteUser, email: &str) -> Result<UserRecord> {
        let _guard = self
            .users_lock
            .lock()
            .map_err(|_| anyhow!("user store lock poisoned"))?;
        let path = self.user_path(&remote.id)?;
        let now = Utc::now();
        let name = remote.display_name().map(str::to_string);
        let user = match read_json_opt::<UserRecord>(&path)? {
            Some(existing) => UserRecord {
                email: email.to_string(),
                name: name.or(existing.name),
                updated_at: now,
                last_login_at: now,
                ..existing
            },
            None => UserRecord {
                id: new_id(),
                airtable_user_id: remote.id.clone(),
                email: email.to_string(),
                name,
                created_at: now,
                updated_at: now,
                last_login_at: now,
            },
        };
        write_json(&path, &user)?;
        debug!(user_id = %user.id, "user upserted");
        Ok(user)
    }

    /// Look up a local user by remote user id.
    pub fn load_user(&self, remote_user_id: &str) -> Result<Option<UserRecord>> {
        let Ok(path) = self.user_path(remote_user_id) else {
            return Ok(None);
        };
        read_json_opt(&path)
    }

    fn form_path(&self, form_id: &str) -> Result<PathBuf> {
        check_id(form_id)?;
        Ok(self.root.join("forms").join(format!("{}.json", form_id)))
    }

    fn responses_dir(&self, form_id: &str) -> Result<PathBuf> {
        check_id(form_id)?;
        Ok(self.root.join("responses").join(form_id))
    }

    fn user_path(&self, remote_user_id: &str) -> Result<PathBuf> {
        check_id(remote_user_id)?;
        Ok(self.root.join("users").join(format!("{}.json", remote_user_id)))
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn check_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(anyhow!("invalid document id {:?}", id))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("document path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp document {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace document {}", path.display()))?;
    Ok(())
}
