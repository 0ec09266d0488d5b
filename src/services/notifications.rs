use chrono::SecondsFormat;

use crate::models::{Flat, Invoice, MaintenanceReport, MaintenanceStatus};

const TARGET: &str = "notifications";

pub fn maintenance_opened_message(flat: &Flat, report: &MaintenanceReport) -> String {
    format!(
        "New maintenance report at {}: \"{}\" ({} priority, {}).",
        flat.name,
        report.title,
        report.priority.as_str(),
        report.category
    )
}

pub fn maintenance_status_message(
    flat: &Flat,
    report: &MaintenanceReport,
    previous: MaintenanceStatus,
) -> String {
    format!(
        "Maintenance report \"{}\" at {} moved from {} to {}.",
        report.title,
        flat.name,
        previous.as_str(),
        report.status.as_str()
    )
}

pub fn invoice_issued_message(flat: &Flat, invoice: &Invoice) -> String {
    format!(
        "Invoice of {:.2} for {} is due on {}.",
        invoice.amount,
        flat.name,
        invoice.due_date.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

pub fn notify_maintenance_opened(flat: &Flat, report: &MaintenanceReport) {
    let body = maintenance_opened_message(flat, report);
    tracing::info!(
        target: TARGET,
        event = "maintenance_opened",
        flat_id = %flat.id,
        report_id = %report.id,
        recipient = flat.tenant_email().unwrap_or_default(),
        %body,
        "Notification emitted"
    );
}

pub fn notify_maintenance_status(
    flat: &Flat,
    report: &MaintenanceReport,
    previous: MaintenanceStatus,
) {
    let body = maintenance_status_message(flat, report, previous);
    tracing::info!(
        target: TARGET,
        event = "maintenance_status_changed",
        flat_id = %flat.id,
        report_id = %report.id,
        status = report.status.as_str(),
        recipient = flat.tenant_email().unwrap_or_default(),
        %body,
        "Notification emitted"
    );
}

pub fn notify_invoice_issued(flat: &Flat, invoice: &Invoice) {
    let body = invoice_issued_message(flat, invoice);
    tracing::info!(
        target: TARGET,
        event = "invoice_issued",
        flat_id = %flat.id,
        invoice_id = %invoice.id,
        recipient = flat.tenant_email().unwrap_or_default(),
        %body,
        "Notification emitted"
    );
}

#[cfg(test)]
mod tests {
    use super::{invoice_issued_message, maintenance_opened_message, maintenance_status_message};
    use crate::models::{
        Flat, Invoice, InvoiceStatus, MaintenancePriority, MaintenanceReport, MaintenanceStatus,
    };
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn flat() -> Flat {
        Flat::from_row(json!({
            "id": "f-1",
            "owner_id": "user-1",
            "name": "Canal View 3B",
            "address": "3 Canal St"
        }))
        .expect("flat should parse")
    }

    fn report(status: MaintenanceStatus) -> MaintenanceReport {
        let at = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).single().expect("valid time");
        MaintenanceReport {
            id: "r-1".to_string(),
            title: "Broken boiler".to_string(),
            description: None,
            category: "heating".to_string(),
            priority: MaintenancePriority::Urgent,
            status,
            contractor_id: None,
            created_at: at,
            updated_at: at,
            resolved_at: None,
        }
    }

    #[test]
    fn renders_maintenance_messages() {
        let flat = flat();
        assert_eq!(
            maintenance_opened_message(&flat, &report(MaintenanceStatus::Open)),
            "New maintenance report at Canal View 3B: \"Broken boiler\" (urgent priority, heating)."
        );
        assert_eq!(
            maintenance_status_message(
                &flat,
                &report(MaintenanceStatus::Resolved),
                MaintenanceStatus::InProgress
            ),
            "Maintenance report \"Broken boiler\" at Canal View 3B moved from in_progress to resolved."
        );
    }

    #[test]
    fn renders_invoice_message() {
        let due = Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).single().expect("valid time");
        let invoice = Invoice {
            id: "i-1".to_string(),
            amount: 950.0,
            description: None,
            issued_at: due,
            due_date: due,
            status: InvoiceStatus::Pending,
            paid_at: None,
        };
        assert_eq!(
            invoice_issued_message(&flat(), &invoice),
            "Invoice of 950.00 for Canal View 3B is due on 2026-11-01T00:00:00Z."
        );
    }
}
