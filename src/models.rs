//! Documents stored in the `flats` and `tenants` tables.
//!
//! A flat row carries its tenant snapshot and its maintenance, payment and
//! invoice history as embedded `jsonb` arrays; handlers load the whole
//! document, mutate it in memory and write the changed columns back.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flat {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub bedrooms: i32,
    #[serde(default)]
    pub monthly_rent: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_vacant: bool,
    #[serde(default)]
    pub tenant: Option<TenantSnapshot>,
    #[serde(default)]
    pub maintenance_reports: Vec<MaintenanceReport>,
    #[serde(default)]
    pub payment_logs: Vec<PaymentLog>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Flat {
    pub fn from_row(row: Value) -> AppResult<Self> {
        Ok(serde_json::from_value(row)?)
    }

    pub fn has_tenant(&self) -> bool {
        self.tenant.is_some()
    }

    pub fn assign_tenant(&mut self, snapshot: TenantSnapshot) {
        self.tenant = Some(snapshot);
        self.is_vacant = false;
    }

    pub fn vacate(&mut self) {
        self.tenant = None;
        self.is_vacant = true;
    }

    /// True when the embedded snapshot was taken from the given tenant record.
    pub fn snapshot_points_at(&self, tenant_id: &str) -> bool {
        self.tenant
            .as_ref()
            .and_then(|snapshot| snapshot.tenant_id.as_deref())
            .is_some_and(|id| id == tenant_id)
    }

    pub fn invoice_mut(&mut self, invoice_id: &str) -> Option<&mut Invoice> {
        self.invoices
            .iter_mut()
            .find(|invoice| invoice.id == invoice_id)
    }

    pub fn report_mut(&mut self, report_id: &str) -> Option<&mut MaintenanceReport> {
        self.maintenance_reports
            .iter_mut()
            .find(|report| report.id == report_id)
    }

    pub fn tenant_email(&self) -> Option<&str> {
        self.tenant.as_ref().map(|snapshot| snapshot.email.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantSnapshot {
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub lease_start: Option<NaiveDate>,
    #[serde(default)]
    pub lease_end: Option<NaiveDate>,
    #[serde(default)]
    pub monthly_rent: Option<f64>,
}

impl From<&TenantRecord> for TenantSnapshot {
    fn from(record: &TenantRecord) -> Self {
        Self {
            tenant_id: Some(record.id.clone()),
            name: record.name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            lease_start: record.lease_start,
            lease_end: record.lease_end,
            monthly_rent: record.monthly_rent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: String,
    pub owner_id: String,
    pub flat_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub lease_start: Option<NaiveDate>,
    #[serde(default)]
    pub lease_end: Option<NaiveDate>,
    #[serde(default)]
    pub monthly_rent: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TenantRecord {
    pub fn from_row(row: Value) -> AppResult<Self> {
        Ok(serde_json::from_value(row)?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl MaintenanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenancePriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl MaintenancePriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub priority: MaintenancePriority,
    #[serde(default)]
    pub status: MaintenanceStatus,
    #[serde(default)]
    pub contractor_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == InvoiceStatus::Pending && self.due_date < now
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    BankTransfer,
    Card,
    Cash,
    Cheque,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLog {
    pub id: String,
    pub amount: f64,
    pub paid_at: DateTime<Utc>,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
