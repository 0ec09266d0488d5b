use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{new_document_id, Flat, MaintenanceReport, MaintenanceStatus},
    schemas::{non_empty_opt, CreateMaintenanceReportInput, UpdateMaintenanceReportInput},
    services::contractors::find_contractor,
};

const DEFAULT_CATEGORY: &str = "general";

/// Outcome of an edit; `previous_status` is set only when the status moved.
#[derive(Debug, Clone)]
pub struct ReportUpdate {
    pub report: MaintenanceReport,
    pub previous_status: Option<MaintenanceStatus>,
}

pub fn open_report(
    flat: &mut Flat,
    input: &CreateMaintenanceReportInput,
    now: DateTime<Utc>,
) -> AppResult<MaintenanceReport> {
    let title = non_empty_opt(input.title.as_deref())
        .ok_or_else(|| AppError::BadRequest("title is required.".to_string()))?;
    let contractor_id = resolve_contractor(input.contractor_id.as_deref())?;

    let report = MaintenanceReport {
        id: new_document_id(),
        title,
        description: non_empty_opt(input.description.as_deref()),
        category: non_empty_opt(input.category.as_deref())
            .map(|category| category.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        priority: input.priority.unwrap_or_default(),
        status: MaintenanceStatus::Open,
        contractor_id,
        created_at: now,
        updated_at: now,
        resolved_at: None,
    };
    flat.maintenance_reports.push(report.clone());
    Ok(report)
}

pub fn update_report(
    flat: &mut Flat,
    report_id: &str,
    input: &UpdateMaintenanceReportInput,
    now: DateTime<Utc>,
) -> AppResult<ReportUpdate> {
    let contractor_id = resolve_contractor(input.contractor_id.as_deref())?;
    let report = flat
        .report_mut(report_id)
        .ok_or_else(|| AppError::NotFound("Maintenance report not found.".to_string()))?;

    if report.status == MaintenanceStatus::Closed {
        return Err(AppError::Conflict(
            "Maintenance report is closed.".to_string(),
        ));
    }

    let mut previous_status = None;
    if let Some(status) = input.status.filter(|status| *status != report.status) {
        previous_status = Some(report.status);
        report.status = status;
        report.resolved_at = if status.is_finished() {
            report.resolved_at.or(Some(now))
        } else {
            None
        };
    }
    if let Some(priority) = input.priority {
        report.priority = priority;
    }
    if let Some(description) = input.description.as_deref() {
        report.description = non_empty_opt(Some(description));
    }
    if input.contractor_id.is_some() {
        report.contractor_id = contractor_id;
    }
    report.updated_at = now;

    Ok(ReportUpdate {
        report: report.clone(),
        previous_status,
    })
}

pub fn remove_report(flat: &mut Flat, report_id: &str) -> AppResult<MaintenanceReport> {
    let index = flat
        .maintenance_reports
        .iter()
        .position(|report| report.id == report_id)
        .ok_or_else(|| AppError::NotFound("Maintenance report not found.".to_string()))?;
    Ok(flat.maintenance_reports.remove(index))
}

pub fn reports_with_status(
    flat: &Flat,
    status: Option<MaintenanceStatus>,
) -> Vec<MaintenanceReport> {
    let mut reports = flat
        .maintenance_reports
        .iter()
        .filter(|report| status.map_or(true, |status| report.status == status))
        .cloned()
        .collect::<Vec<_>>();
    reports.sort_by(|left, right| right.created_at.cmp(&left.created_at));
    reports
}

fn resolve_contractor(contractor_id: Option<&str>) -> AppResult<Option<String>> {
    let Some(contractor_id) = non_empty_opt(contractor_id) else {
        return Ok(None);
    };
    find_contractor(&contractor_id)
        .map(|contractor| Some(contractor.id.to_string()))
        .ok_or_else(|| AppError::BadRequest(format!("Unknown contractor_id '{contractor_id}'.")))
}
