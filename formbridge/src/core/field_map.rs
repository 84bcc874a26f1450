//! Mapping of remote table field types onto question types.

use serde::Serialize;

/// A remote field that a question can be bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedField {
    pub id: String,
    pub name: String,
    /// Question type name (`shortText`, `singleSelect`, ...).
    #[serde(rename = "type")]
    pub question_type: &'static str,
    /// Choice names for select fields, `None` otherwise.
    pub options: Option<Vec<String>>,
}

/// Question type for a remote field type, or `None` when unsupported.
pub fn question_type_for(remote_type: &str) -> Option<&'static str> {
    match remote_type {
        "singleLineText" => Some("shortText"),
        "multilineText" => Some("longText"),
        "singleSelect" => Some("singleSelect"),
        "multipleSelects" => Some("multiSelect"),
        "multipleAttachments" => Some("attachment"),
        _ => None,
    }
}

/// Build the descriptor for one remote field; unsupported types yield `None`.
pub fn supported_field(
    id: &str,
    name: &str,
    remote_type: &str,
    choices: &[String],
) -> Option<SupportedField> {
    let question_type = question_type_for(remote_type)?;
    let options = matches!(question_type, "singleSelect" | "multiSelect").then(|| choices.to_vec());
    Some(SupportedField {
        id: id.to_string(),
        name: name.to_string(),
        question_type,
        options,
    })
}
