//! Service-account key loading.

use crate::error::{ReportError, Result};
use std::path::Path;
use tracing::debug;
use yup_oauth2::ServiceAccountKey;

/// Key document `type` for service accounts.
const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// Reads and validates a service-account key file.
///
/// Fails with a credential error if the file is missing, unreadable, not
/// JSON, missing required fields, or declares a different key type.
pub fn load_service_account_key(path: &Path) -> Result<ServiceAccountKey> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ReportError::credential(format!(
            "Failed to read credentials file {}: {e}",
            path.display()
        ))
    })?;

    parse_service_account_key(&content).map_err(|e| match e {
        ReportError::Credential(msg) => {
            ReportError::credential(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

/// Parses a service-account key document.
pub fn parse_service_account_key(content: &str) -> Result<ServiceAccountKey> {
    let key: ServiceAccountKey = serde_json::from_str(content)
        .map_err(|e| ReportError::credential(format!("not a valid service-account key: {e}")))?;

    if let Some(key_type) = key.key_type.as_deref() {
        if key_type != SERVICE_ACCOUNT_TYPE {
            return Err(ReportError::credential(format!(
                "expected key type '{SERVICE_ACCOUNT_TYPE}', found '{key_type}'"
            )));
        }
    }

    if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
        return Err(ReportError::credential(
            "client_email and private_key must not be empty",
        ));
    }

    debug!("Loaded service-account key for {}", key.client_email);
    Ok(key)
}
