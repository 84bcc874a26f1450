//! Current-user lookup against the remote account.

use serde_json::json;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::io::airtable::RemoteTables;
use crate::io::oauth::AccessToken;
use crate::io::store::{JsonStore, UserRecord};

/// Resolve the account behind `token` and refresh its local profile.
///
/// The email scope is requested at login, so a whoami payload without an
/// email is treated as an upstream fault.
#[instrument(skip_all)]
pub async fn sync_current_user(
    store: &JsonStore,
    remote: &dyn RemoteTables,
    token: &AccessToken,
) -> Result<UserRecord> {
    let remote_user = remote.whoami(token).await?;
    let Some(email) = remote_user.email.as_deref().filter(|email| !email.is_empty()) else {
        return Err(Error::Upstream {
            operation: "whoami",
            status: None,
            payload: json!({ "error": "unexpected whoami response", "id": remote_user.id }),
        });
    };
    let user = store.upsert_user(&remote_user, email)?;
    info!(user_id = %user.id, "user synced");
    Ok(user)
}
