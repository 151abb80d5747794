//! Registry credentials in the OS credential store.
//!
//! Backed by the platform store through `keyring`. Only startup code reads
//! from here; the resulting `Session` is passed explicitly from then on.

use keyring::Entry;
use tracing::{info, warn};

use crate::session::{Operator, OperatorRole, Session};

const SERVICE_NAME: &str = "salon-cash-registry";

// Credential keys
pub const KEY_BACKEND_URL: &str = "backend_url";
pub const KEY_SESSION_TOKEN: &str = "session_token";
pub const KEY_OPERATOR_ID: &str = "operator_id";
pub const KEY_OPERATOR_ROLE: &str = "operator_role";

const ALL_KEYS: &[&str] = &[
    KEY_BACKEND_URL,
    KEY_SESSION_TOKEN,
    KEY_OPERATOR_ID,
    KEY_OPERATOR_ROLE,
];

// ---------------------------------------------------------------------------
// Keyring access
// ---------------------------------------------------------------------------

fn keyring_entry(key: &str) -> Result<Entry, String> {
    Entry::new(SERVICE_NAME, key).map_err(|e| format!("keyring entry {key}: {e}"))
}

/// Stored value for `key`. A missing entry and an unreachable platform store
/// both read as `None`; only the latter is logged.
pub fn get_credential(key: &str) -> Option<String> {
    let read = keyring_entry(key).and_then(|entry| match entry.get_password() {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(format!("keyring read {key}: {e}")),
    });
    read.unwrap_or_else(|e| {
        warn!(key, error = %e, "Registry credential unavailable");
        None
    })
}

pub fn set_credential(key: &str, value: &str) -> Result<(), String> {
    keyring_entry(key)?
        .set_password(value)
        .map_err(|e| format!("keyring write {key}: {e}"))
}

/// Removing an absent entry is not an error.
pub fn delete_credential(key: &str) -> Result<(), String> {
    match keyring_entry(key)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(format!("keyring delete {key}: {e}")),
    }
}

// ---------------------------------------------------------------------------
// Session persistence
// ---------------------------------------------------------------------------

/// Assemble a session from stored parts. Blank tokens or operator ids mean
/// nobody is signed in; an absent or unknown role reads as staff.
pub fn session_from_parts(
    token: Option<String>,
    operator_id: Option<String>,
    role: Option<String>,
) -> Option<Session> {
    let token = token.filter(|t| !t.trim().is_empty())?;
    let operator_id = operator_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty())?;
    let role = role
        .map(|r| OperatorRole::parse(&r))
        .unwrap_or(OperatorRole::Staff);

    Some(Session::new(
        token,
        Operator {
            id: operator_id,
            name: None,
            role,
        },
    ))
}

/// Build a session from stored credentials, if a token and operator exist.
pub fn load_session() -> Option<Session> {
    session_from_parts(
        get_credential(KEY_SESSION_TOKEN),
        get_credential(KEY_OPERATOR_ID),
        get_credential(KEY_OPERATOR_ROLE),
    )
}

pub fn store_session(token: &str, operator: &Operator) -> Result<(), String> {
    set_credential(KEY_SESSION_TOKEN, token)?;
    set_credential(KEY_OPERATOR_ID, &operator.id)?;
    set_credential(KEY_OPERATOR_ROLE, &operator.role.to_string())?;
    info!(operator = %operator.id, role = %operator.role, "Session credentials stored");
    Ok(())
}

/// Remove every stored credential (sign-out / factory reset).
pub fn clear_all() -> Result<(), String> {
    let mut errors = Vec::new();
    for key in ALL_KEYS {
        if let Err(e) = delete_credential(key) {
            warn!(key, error = %e, "Registry credential not cleared");
            errors.push(e);
        }
    }
    if errors.is_empty() {
        info!("All registry credentials cleared");
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}
