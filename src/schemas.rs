use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::{
    error::AppError,
    models::{MaintenancePriority, MaintenanceStatus, PaymentMethod},
};

/// Rejects the input with a 400 naming every offending field.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input.validate().map_err(|errors| {
        let mut problems = errors
            .field_errors()
            .into_iter()
            .map(|(field, field_errors)| {
                if field_errors.iter().any(|error| error.code == "required") {
                    format!("{field} is required")
                } else {
                    format!("{field} is invalid")
                }
            })
            .collect::<Vec<_>>();
        problems.sort_unstable();
        AppError::BadRequest(format!("{}.", problems.join("; ")))
    })
}

/// Whitespace-only text counts as missing.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, 500)
}

fn default_limit() -> i64 {
    200
}

pub fn serialize_to_map<T>(value: &T) -> serde_json::Map<String, serde_json::Value>
where
    T: serde::Serialize,
{
    let json = serde_json::to_value(value)
        .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));
    json.as_object().cloned().unwrap_or_default()
}

pub fn remove_nulls(
    mut map: serde_json::Map<String, serde_json::Value>,
) -> serde_json::Map<String, serde_json::Value> {
    map.retain(|_, value| !value.is_null());
    map
}

pub fn non_empty_opt(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
}

// Flats

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct CreateFlatInput {
    #[validate(required, custom(function = "not_blank"), length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(required, custom(function = "not_blank"), length(min = 1, max = 500))]
    pub address: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub bedrooms: Option<i32>,
    #[validate(required, range(min = 0.0))]
    pub monthly_rent: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize, Validate)]
pub struct UpdateFlatInput {
    #[validate(custom(function = "not_blank"), length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(custom(function = "not_blank"), length(min = 1, max = 500))]
    pub address: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub bedrooms: Option<i32>,
    #[validate(range(min = 0.0))]
    pub monthly_rent: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlatsQuery {
    pub vacant: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlatPath {
    pub flat_id: String,
}

// Tenants

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct CreateTenantInput {
    #[validate(required, custom(function = "not_blank"), length(min = 1))]
    pub flat_id: Option<String>,
    #[validate(required, custom(function = "not_blank"), length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(required, email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub lease_start: Option<NaiveDate>,
    pub lease_end: Option<NaiveDate>,
    #[validate(range(min = 0.0))]
    pub monthly_rent: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize, Validate)]
pub struct UpdateTenantInput {
    #[validate(custom(function = "not_blank"), length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub lease_start: Option<NaiveDate>,
    pub lease_end: Option<NaiveDate>,
    #[validate(range(min = 0.0))]
    pub monthly_rent: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantsQuery {
    pub flat_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantPath {
    pub tenant_id: String,
}

/// Lease dates are optional, but when both are present the lease cannot end
/// before it starts.
pub fn validate_lease_window(
    lease_start: Option<NaiveDate>,
    lease_end: Option<NaiveDate>,
) -> Result<(), AppError> {
    match (lease_start, lease_end) {
        (Some(start), Some(end)) if end < start => Err(AppError::BadRequest(
            "lease_end must not be before lease_start.".to_string(),
        )),
        _ => Ok(()),
    }
}

// Maintenance

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMaintenanceReportInput {
    #[validate(required, custom(function = "not_blank"), length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(custom(function = "not_blank"), length(min = 1, max = 64))]
    pub category: Option<String>,
    pub priority: Option<MaintenancePriority>,
    pub contractor_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMaintenanceReportInput {
    pub status: Option<MaintenanceStatus>,
    pub priority: Option<MaintenancePriority>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    /// An empty string unassigns the contractor.
    #[validate(length(max = 64))]
    pub contractor_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceQuery {
    pub status: Option<MaintenanceStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceReportPath {
    pub flat_id: String,
    pub report_id: String,
}

// Payments

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInvoiceInput {
    #[validate(required, range(exclusive_min = 0.0))]
    pub amount: Option<f64>,
    #[validate(required)]
    pub due_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RecordPaymentInput {
    #[validate(required, range(exclusive_min = 0.0))]
    pub amount: Option<f64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub invoice_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkInvoicePaidInput {
    pub paid_at: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicePath {
    pub flat_id: String,
    pub invoice_id: String,
}

// Contractors

#[derive(Debug, Clone, Deserialize)]
pub struct ContractorsQuery {
    pub trade: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractorPath {
    pub contractor_id: String,
}
