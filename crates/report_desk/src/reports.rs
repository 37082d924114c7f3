//! Persistence of submitted bug reports.

use std::sync::Arc;

use async_trait::async_trait;
use backend::BackendClient;
use notify::Toast;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use session::UserId;
use thiserror::Error;

use crate::models::{BugReport, BugType};

pub const REPORT_SUBMITTED: &str = "You submitted the following values:";

/// Row written to the reports table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub title: String,
    pub description: String,
    pub can_reproduce: bool,
    pub bug_type: BugType,
    pub user_id: UserId,
}

impl ReportRecord {
    pub fn new(report: &BugReport, user_id: UserId) -> Self {
        Self {
            title: report.title.clone(),
            description: report.description.clone(),
            can_reproduce: report.can_reproduce,
            bug_type: report.bug_type,
            user_id,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ReportError(pub String);

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert(&self, record: &ReportRecord) -> Result<(), ReportError>;
}

/// Reports table behind the HTTP backend.
pub struct BackendReports {
    client: Arc<BackendClient>,
    table: String,
}

impl BackendReports {
    pub fn new(client: Arc<BackendClient>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl ReportStore for BackendReports {
    async fn insert(&self, record: &ReportRecord) -> Result<(), ReportError> {
        self.client
            .insert_row(&self.table, record)
            .await
            .map_err(|err| ReportError(err.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryReports {
    rows: Mutex<Vec<ReportRecord>>,
    failure: Mutex<Option<String>>,
}

impl MemoryReports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_owned);
    }

    pub fn rows(&self) -> Vec<ReportRecord> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl ReportStore for MemoryReports {
    async fn insert(&self, record: &ReportRecord) -> Result<(), ReportError> {
        if let Some(message) = self.failure.lock().clone() {
            return Err(ReportError(message));
        }
        self.rows.lock().push(record.clone());
        Ok(())
    }
}

/// Confirmation toast listing the submitted values as pretty JSON.
pub fn submitted_toast(report: &BugReport) -> Toast {
    let toast = Toast::info(REPORT_SUBMITTED);
    match serde_json::to_string_pretty(report) {
        Ok(json) => toast.description(json),
        Err(_) => toast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::NotificationKind;

    fn report() -> BugReport {
        BugReport {
            title: "Broken login".into(),
            description: "The button does nothing on mobile.".into(),
            can_reproduce: true,
            bug_type: BugType::Security,
        }
    }

    #[test]
    fn toast_lists_values_as_json() {
        let toast = submitted_toast(&report());
        assert_eq!(toast.kind, NotificationKind::Info);
        assert_eq!(toast.message, REPORT_SUBMITTED);
        let description = toast.description.unwrap();
        assert!(description.contains("\"bugType\": \"Security\""));
        assert!(description.contains("\"canReproduce\": true"));
    }

    #[test]
    fn record_uses_column_names() {
        let record = ReportRecord::new(&report(), uuid::Uuid::nil());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["bug_type"], "Security");
        assert_eq!(json["can_reproduce"], true);
        assert_eq!(json["user_id"], "00000000-0000-0000-0000-000000000000");
    }

    #[tokio::test]
    async fn memory_store_failure_injection() {
        let store = MemoryReports::new();
        store.fail_with(Some("relation \"reports\" does not exist"));
        let record = ReportRecord::new(&report(), uuid::Uuid::nil());
        let err = store.insert(&record).await.unwrap_err();
        assert_eq!(err.to_string(), "relation \"reports\" does not exist");
        store.fail_with(None);
        store.insert(&record).await.unwrap();
        assert_eq!(store.rows().len(), 1);
    }
}
