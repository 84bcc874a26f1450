//! Remote table API adapter.
//!
//! The [`RemoteTables`] trait is the seam between submission orchestration and
//! the Airtable REST API. `AirtableClient` talks HTTPS; tests use
//! `test_support::ScriptedRemote`.

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use crate::core::field_map::{SupportedField, supported_field};
use crate::core::types::NormalizedRecord;
use crate::error::{Error, Result};
use crate::io::config::AirtableConfig;
use crate::io::http::{build_client, decode, send_json};
use crate::io::oauth::AccessToken;

/// Identity of the user who granted access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl RemoteUser {
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.full_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub id: String,
    pub name: String,
}

/// Table schema as returned by the metadata API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteTable {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<RemoteField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteField {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub options: Option<FieldOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldOptions {
    #[serde(default)]
    pub choices: Vec<FieldChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldChoice {
    pub name: String,
}

impl RemoteTable {
    pub fn summary(&self) -> TableSummary {
        TableSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    /// Fields a question can bind to; unsupported field types are dropped.
    pub fn supported_fields(&self) -> Vec<SupportedField> {
        self.fields
            .iter()
            .filter_map(|field| {
                let choices: Vec<String> = field
                    .options
                    .as_ref()
                    .map(|options| {
                        options
                            .choices
                            .iter()
                            .map(|choice| choice.name.clone())
                            .collect()
                    })
                    .unwrap_or_default();
                supported_field(&field.id, &field.name, &field.field_type, &choices)
            })
            .collect()
    }
}

/// Abstraction over the remote tabular-database API.
#[async_trait]
pub trait RemoteTables: Send + Sync {
    async fn whoami(&self, token: &AccessToken) -> Result<RemoteUser>;

    async fn list_bases(&self, token: &AccessToken) -> Result<Vec<BaseSummary>>;

    /// Tables of a base, with their field schema.
    async fn list_tables(&self, token: &AccessToken, base_id: &str) -> Result<Vec<RemoteTable>>;

    /// Create one row and return the remote record id. Not idempotent.
    async fn create_record(
        &self,
        token: &AccessToken,
        base_id: &str,
        table_id: &str,
        fields: &NormalizedRecord,
    ) -> Result<String>;
}

/// HTTPS client for the Airtable REST and metadata APIs.
pub struct AirtableClient {
    http: Client,
    api_base: Url,
}

#[derive(Deserialize)]
struct BasesPage {
    #[serde(default)]
    bases: Vec<BaseSummary>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Deserialize)]
struct TablesPage {
    #[serde(default)]
    tables: Vec<RemoteTable>,
}

#[derive(Deserialize)]
struct CreatedRecord {
    id: String,
}

impl AirtableClient {
    pub fn new(config: &AirtableConfig) -> anyhow::Result<Self> {
        let api_base = Url::parse(&config.api_base_url)
            .map_err(|err| anyhow!("invalid airtable.api_base_url: {}", err))?;
        Ok(Self {
            http: build_client(config.request_timeout_secs)?,
            api_base,
        })
    }

    /// API base joined with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Internal(anyhow!("api base url cannot carry a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl RemoteTables for AirtableClient {
    #[instrument(skip_all)]
    async fn whoami(&self, token: &AccessToken) -> Result<RemoteUser> {
        let url = self.endpoint(&["meta", "whoami"])?;
        let request = self
            .http
            .get(url)
            .bearer_auth(token.secret())
            .header(ACCEPT, "application/json");
        decode("whoami", send_json("whoami", request).await?)
    }

    #[instrument(skip_all)]
    async fn list_bases(&self, token: &AccessToken) -> Result<Vec<BaseSummary>> {
        let mut bases = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let mut url = self.endpoint(&["meta", "bases"])?;
            if let Some(offset) = &offset {
                url.query_pairs_mut().append_pair("offset", offset);
            }
            let request = self
                .http
                .get(url)
                .bearer_auth(token.secret())
                .header(ACCEPT, "application/json");
            let page: BasesPage = decode("list bases", send_json("list bases", request).await?)?;
            bases.extend(page.bases);
            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        debug!(count = bases.len(), "listed bases");
        Ok(bases)
    }

    #[instrument(skip_all, fields(base_id = %base_id))]
    async fn list_tables(&self, token: &AccessToken, base_id: &str) -> Result<Vec<RemoteTable>> {
        let url = self.endpoint(&["meta", "bases", base_id, "tables"])?;
        let request = self
            .http
            .get(url)
            .bearer_auth(token.secret())
            .header(ACCEPT, "application/json");
        let page: TablesPage = decode("list tables", send_json("list tables", request).await?)?;
        debug!(count = page.tables.len(), "listed tables");
        Ok(page.tables)
    }

    #[instrument(skip_all, fields(base_id = %base_id, table_id = %table_id, fields = fields.len()))]
    async fn create_record(
        &self,
        token: &AccessToken,
        base_id: &str,
        table_id: &str,
        fields: &NormalizedRecord,
    ) -> Result<String> {
        let url = self.endpoint(&[base_id, table_id])?;
        let request = self
            .http
            .post(url)
            .bearer_auth(token.secret())
            .json(&json!({ "fields": fields }));
        let created: CreatedRecord =
            decode("create record", send_json("create record", request).await?)?;
        debug!(record_id = %created.id, "record created");
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> AirtableClient {
        AirtableClient::new(&AirtableConfig {
            api_base_url: base.to_string(),
            request_timeout_secs: 5,
        })
        .expect("client")
    }

    #[test]
    fn endpoint_appends_encoded_segments() {
        let client = client("https://api.airtable.com/v0");
        let url = client.endpoint(&["meta", "bases", "app1", "tables"]).expect("url");
        assert_eq!(url.as_str(), "https://api.airtable.com/v0/meta/bases/app1/tables");

        let url = client.endpoint(&["app1", "tbl 2/x"]).expect("url");
        assert_eq!(url.as_str(), "https://api.airtable.com/v0/app1/tbl%202%2Fx");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = client("https://api.airtable.com/v0/");
        let url = client.endpoint(&["meta", "whoami"]).expect("url");
        assert_eq!(url.as_str(), "https://api.airtable.com/v0/meta/whoami");
    }

    #[test]
    fn table_schema_maps_supported_fields() {
        let page: TablesPage = serde_json::from_value(serde_json::json!({
            "tables": [{
                "id": "tbl1",
                "name": "Applicants",
                "primaryFieldId": "fld1",
                "fields": [
                    {"id": "fld1", "name": "Name", "type": "singleLineText"},
                    {"id": "fld2", "name": "Stage", "type": "singleSelect",
                     "options": {"choices": [{"id": "sel1", "name": "New", "color": "blue"}]}},
                    {"id": "fld3", "name": "Score", "type": "number", "options": {"precision": 0}},
                    {"id": "fld4", "name": "CV", "type": "multipleAttachments", "options": {"isReversed": false}}
                ]
            }]
        }))
        .expect("parse");

        let fields = page.tables[0].supported_fields();
        let ids: Vec<&str> = fields.iter().map(|field| field.id.as_str()).collect();
        assert_eq!(ids, vec!["fld1", "fld2", "fld4"]);
        assert_eq!(fields[1].options, Some(vec!["New".to_string()]));
        assert_eq!(fields[2].question_type, "attachment");
        assert_eq!(fields[2].options, None);
    }

    #[test]
    fn display_name_falls_back_to_full_name() {
        let user: RemoteUser = serde_json::from_value(serde_json::json!({
            "id": "usr1",
            "email": "a@example.com",
            "fullName": "Ada Lovelace"
        }))
        .expect("parse");
        assert_eq!(user.display_name(), Some("Ada Lovelace"));
    }
}
