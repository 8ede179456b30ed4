//! Audit trail endpoints (administrators only).

use klararety_core::Result;
use klararety_core::types::{AuditEvent, AuditExport, AuditFilter};

use crate::ApiClient;

impl ApiClient {
    pub async fn audit_events(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>> {
        self.list("audit/events/", &filter.query_pairs()).await
    }

    /// Requests an export of the events matching `filter`.
    pub async fn export_audit_events(&self, filter: &AuditFilter) -> Result<AuditExport> {
        self.post_with("audit/exports/", &filter.query_pairs()).await
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use klararety_core::types::UserId;

    use super::*;
    use crate::test_server::{TestServer, client_for};

    #[tokio::test]
    async fn test_export_passes_filters_as_query() {
        let server = TestServer::start(vec![(
            "/api/audit/exports/",
            202,
            r#"{"id": 4, "status": "pending"}"#,
        )])
        .await;
        let (client, _, _) = client_for(&server);

        let filter = AuditFilter {
            user: Some(UserId(2)),
            start_date: Some(date(2025, 1, 1)),
            ..AuditFilter::default()
        };
        let export = client.export_audit_events(&filter).await.unwrap();
        assert_eq!(export.status.as_deref(), Some("pending"));

        let request = server.last_request().unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.target, "/api/audit/exports/?user=2&start_date=2025-01-01");
    }
}
