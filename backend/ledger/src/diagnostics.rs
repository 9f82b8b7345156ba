use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

pub use crate::store::Operation;

/// Context of a request the store refused.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDiagnostic {
    pub path: String,
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_resource_data: Option<Value>,
}

impl fmt::Display for PermissionDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(
            "Missing or insufficient permissions: the following request was denied by the document store:",
        )?;

        match serde_json::to_string_pretty(self) {
            Ok(context) => write!(f, "\n{context}"),
            Err(_) => Ok(()),
        }
    }
}

/// Told about every permission denial before the error is returned.
pub trait DiagnosticObserver: Send + Sync {
    fn permission_denied(&self, diagnostic: &PermissionDiagnostic);
}

pub struct LogObserver;

impl DiagnosticObserver for LogObserver {
    fn permission_denied(&self, diagnostic: &PermissionDiagnostic) {
        warn!(
            path = %diagnostic.path,
            operation = %diagnostic.operation,
            "{diagnostic}"
        );
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn display_carries_request_context() {
        let diagnostic = PermissionDiagnostic {
            path: "raffleItems/P1".to_string(),
            operation: Operation::Create,
            request_resource_data: Some(json!({ "name": "Toy" })),
        };

        let text = diagnostic.to_string();
        assert!(text.starts_with("Missing or insufficient permissions"));
        assert!(text.contains("\"path\": \"raffleItems/P1\""));
        assert!(text.contains("\"operation\": \"create\""));
        assert!(text.contains("\"requestResourceData\""));
    }
}
