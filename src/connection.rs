//! Connected accounts and how one is picked for an execution.
//!
//! Every execution path resolves credentials the same way:
//!
//! 1. An explicit account id is fetched as-is.
//! 2. Otherwise the entity's active accounts for the app are listed, and the
//!    newest account labelled `primary` wins, falling back to the newest
//!    account overall.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::{ApiError, ComposioApi, ConnectedAccountQuery};
use crate::error::ComposioError;

/// Label that marks an entity's preferred account for an app.
pub const PRIMARY_LABEL: &str = "primary";

/// Lifecycle state of a connected account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    Active,
    Initiated,
    Failed,
    Expired,
    #[serde(other)]
    Unknown,
}

/// A stored credential linking an entity to a toolkit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedAccount {
    pub id: String,
    #[serde(default)]
    pub app_name: String,
    pub status: AccountStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, alias = "clientUniqueUserId", skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub connection_params: Value,
}

impl ConnectedAccount {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn is_primary(&self) -> bool {
        self.labels
            .iter()
            .any(|label| label.eq_ignore_ascii_case(PRIMARY_LABEL))
    }

    /// Whether the account belongs to the app (case-insensitive).
    pub fn is_for_app(&self, app: &str) -> bool {
        self.app_name.eq_ignore_ascii_case(app)
    }
}

/// Picks the account to use among candidates for one app.
///
/// Inactive accounts are skipped. Primary-labelled accounts take precedence;
/// within a group the newest `created_at` wins and accounts without a
/// timestamp sort oldest. Ties keep the earlier candidate.
pub fn select_account(accounts: Vec<ConnectedAccount>, app: &str) -> Option<ConnectedAccount> {
    let candidates: Vec<ConnectedAccount> = accounts
        .into_iter()
        .filter(|account| account.is_active() && account.is_for_app(app))
        .collect();

    let newest = |accounts: Vec<ConnectedAccount>| {
        accounts.into_iter().reduce(|best, next| {
            if next.created_at > best.created_at {
                next
            } else {
                best
            }
        })
    };

    let (primary, rest): (Vec<_>, Vec<_>) =
        candidates.into_iter().partition(ConnectedAccount::is_primary);
    newest(primary).or_else(|| newest(rest))
}

/// Resolves the account an execution for `entity_id` on `app` runs as.
pub async fn resolve_connected_account(
    api: &dyn ComposioApi,
    entity_id: &str,
    app: &str,
    explicit_id: Option<&str>,
) -> Result<ConnectedAccount, ComposioError> {
    let not_found = || ComposioError::NoConnectedAccount {
        entity_id: entity_id.to_string(),
        app: app.to_string(),
    };

    if let Some(id) = explicit_id {
        debug!(connected_account_id = %id, "Using explicit connected account");
        return match api.get_connected_account(id).await {
            Ok(account) => Ok(account),
            Err(ApiError::NotFound(_)) => Err(not_found()),
            Err(e) => Err(e.into()),
        };
    }

    let accounts = api
        .list_connected_accounts(&ConnectedAccountQuery {
            entity_id: Some(entity_id.to_string()),
            app_names: vec![app.to_string()],
            active_only: true,
        })
        .await?;
    debug!(entity_id, app, candidates = accounts.len(), "Selecting connected account");

    select_account(accounts, app).ok_or_else(not_found)
}

/// Apps the entity has at least one active account for, in first-seen order.
pub async fn connected_apps(
    api: &dyn ComposioApi,
    entity_id: &str,
) -> Result<Vec<String>, ComposioError> {
    let accounts = api
        .list_connected_accounts(&ConnectedAccountQuery {
            entity_id: Some(entity_id.to_string()),
            app_names: Vec::new(),
            active_only: true,
        })
        .await?;

    let mut apps: Vec<String> = Vec::new();
    for account in accounts.iter().filter(|account| account.is_active()) {
        if !apps.iter().any(|app| app.eq_ignore_ascii_case(&account.app_name)) {
            apps.push(account.app_name.clone());
        }
    }
    Ok(apps)
}
