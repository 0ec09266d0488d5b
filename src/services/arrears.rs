//! Owner-wide arrears report.
//!
//! For every flat with tenant data, pending invoices whose due date has
//! passed are summed; the oldest one determines how many whole days the
//! flat is behind. Flats are reported largest debt first.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Flat, Invoice, TenantSnapshot};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Serialize)]
pub struct FlatArrears {
    pub flat_id: String,
    pub flat_name: String,
    pub address: String,
    pub tenant: TenantSnapshot,
    pub total_arrears: f64,
    pub overdue_invoice_count: usize,
    pub oldest_overdue: Invoice,
    pub days_past_due: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrearsReport {
    pub generated_at: DateTime<Utc>,
    pub flats_in_arrears: usize,
    pub overdue_invoice_count: usize,
    pub total_arrears: f64,
    pub flats: Vec<FlatArrears>,
}

/// Arrears for a single flat, or `None` when it is not behind.
pub fn flat_arrears(flat: &Flat, now: DateTime<Utc>) -> Option<FlatArrears> {
    let tenant = flat.tenant.as_ref()?;

    let mut total = 0.0;
    let mut count = 0;
    let mut oldest: Option<&Invoice> = None;
    for invoice in flat.invoices.iter().filter(|invoice| invoice.is_overdue(now)) {
        total += invoice.amount;
        count += 1;
        if oldest.map_or(true, |current| invoice.due_date < current.due_date) {
            oldest = Some(invoice);
        }
    }
    let oldest = oldest?;

    Some(FlatArrears {
        flat_id: flat.id.clone(),
        flat_name: flat.name.clone(),
        address: flat.address.clone(),
        tenant: tenant.clone(),
        total_arrears: round2(total),
        overdue_invoice_count: count,
        oldest_overdue: oldest.clone(),
        days_past_due: days_past_due(oldest.due_date, now),
    })
}

/// Builds the report over the flats owned by `owner_id`; other owners' flats
/// are ignored even if present in the input.
pub fn compute_arrears(flats: &[Flat], owner_id: &str, now: DateTime<Utc>) -> ArrearsReport {
    let mut entries = flats
        .iter()
        .filter(|flat| flat.owner_id == owner_id)
        .filter_map(|flat| flat_arrears(flat, now))
        .collect::<Vec<_>>();

    entries.sort_by(|left, right| {
        right
            .total_arrears
            .partial_cmp(&left.total_arrears)
            .unwrap_or(Ordering::Equal)
    });

    let total = entries.iter().map(|entry| entry.total_arrears).sum::<f64>();
    let overdue_invoice_count = entries
        .iter()
        .map(|entry| entry.overdue_invoice_count)
        .sum();

    ArrearsReport {
        generated_at: now,
        flats_in_arrears: entries.len(),
        overdue_invoice_count,
        total_arrears: round2(total),
        flats: entries,
    }
}

/// Whole days elapsed since `due_date`, rounded down.
pub fn days_past_due(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - due_date).num_seconds().div_euclid(SECONDS_PER_DAY)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{compute_arrears, days_past_due, flat_arrears};
    use crate::models::{Flat, Invoice, InvoiceStatus, TenantSnapshot};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).single().expect("valid time")
    }

    fn invoice(id: &str, amount: f64, due: DateTime<Utc>, status: InvoiceStatus) -> Invoice {
        Invoice {
            id: id.to_string(),
            amount,
            description: None,
            issued_at: due - Duration::days(14),
            due_date: due,
            status,
            paid_at: None,
        }
    }

    fn flat(id: &str, owner: &str, tenanted: bool, invoices: Vec<Invoice>) -> Flat {
        let mut flat = Flat::from_row(json!({
            "id": id,
            "owner_id": owner,
            "name": format!("Flat {id}"),
            "address": "1 High St"
        }))
        .expect("flat should parse");
        if tenanted {
            flat.assign_tenant(TenantSnapshot {
                tenant_id: None,
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                phone: None,
                lease_start: None,
                lease_end: None,
                monthly_rent: None,
            });
        }
        flat.invoices = invoices;
        flat
    }

    #[test]
    fn only_pending_past_due_invoices_count() {
        let now = now();
        let subject = flat(
            "a",
            "owner",
            true,
            vec![
                invoice("late-1", 500.0, now - Duration::days(40), InvoiceStatus::Pending),
                invoice("late-2", 250.5, now - Duration::days(10), InvoiceStatus::Pending),
                invoice("paid", 900.0, now - Duration::days(70), InvoiceStatus::Paid),
                invoice("void", 900.0, now - Duration::days(80), InvoiceStatus::Cancelled),
                invoice("future", 900.0, now + Duration::days(5), InvoiceStatus::Pending),
            ],
        );

        let arrears = flat_arrears(&subject, now).expect("flat is in arrears");
        assert_eq!(arrears.total_arrears, 750.5);
        assert_eq!(arrears.overdue_invoice_count, 2);
        assert_eq!(arrears.oldest_overdue.id, "late-1");
        assert_eq!(arrears.days_past_due, 40);
    }

    #[test]
    fn due_exactly_now_is_not_overdue() {
        let now = now();
        let subject = flat(
            "a",
            "owner",
            true,
            vec![invoice("due", 100.0, now, InvoiceStatus::Pending)],
        );
        assert!(flat_arrears(&subject, now).is_none());
    }

    #[test]
    fn flats_without_tenant_data_are_skipped() {
        let now = now();
        let subject = flat(
            "a",
            "owner",
            false,
            vec![invoice("late", 100.0, now - Duration::days(3), InvoiceStatus::Pending)],
        );
        assert!(flat_arrears(&subject, now).is_none());
    }

    #[test]
    fn aggregates_and_sorts_by_amount_descending() {
        let now = now();
        let flats = vec![
            flat(
                "small",
                "owner",
                true,
                vec![invoice("s", 100.0, now - Duration::days(2), InvoiceStatus::Pending)],
            ),
            flat(
                "large",
                "owner",
                true,
                vec![
                    invoice("l1", 800.0, now - Duration::days(31), InvoiceStatus::Pending),
                    invoice("l2", 800.0, now - Duration::days(1), InvoiceStatus::Pending),
                ],
            ),
            flat("clear", "owner", true, Vec::new()),
            flat(
                "foreign",
                "someone-else",
                true,
                vec![invoice("f", 5000.0, now - Duration::days(9), InvoiceStatus::Pending)],
            ),
        ];

        let report = compute_arrears(&flats, "owner", now);
        assert_eq!(report.flats_in_arrears, 2);
        assert_eq!(report.overdue_invoice_count, 3);
        assert_eq!(report.total_arrears, 1700.0);
        let order = report
            .flats
            .iter()
            .map(|entry| entry.flat_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["large", "small"]);
        assert_eq!(report.flats[0].days_past_due, 31);
    }

    #[test]
    fn oldest_overdue_is_found_wherever_it_is_listed() {
        let now = now();
        let subject = flat(
            "a",
            "owner",
            true,
            vec![
                invoice("recent", 300.0, now - Duration::days(3), InvoiceStatus::Pending),
                invoice("middle", 300.0, now - Duration::days(20), InvoiceStatus::Pending),
                invoice(
                    "oldest",
                    300.0,
                    now - Duration::days(65) - Duration::hours(5),
                    InvoiceStatus::Pending,
                ),
            ],
        );

        let arrears = flat_arrears(&subject, now).expect("flat is in arrears");
        assert_eq!(arrears.oldest_overdue.id, "oldest");
        assert_eq!(arrears.days_past_due, 65);
        assert_eq!(arrears.total_arrears, 900.0);
    }

    #[test]
    fn equal_arrears_keep_listing_order() {
        let now = now();
        let flats = vec![
            flat(
                "first",
                "owner",
                true,
                vec![invoice("a", 450.0, now - Duration::days(2), InvoiceStatus::Pending)],
            ),
            flat(
                "top",
                "owner",
                true,
                vec![invoice("t", 900.0, now - Duration::days(1), InvoiceStatus::Pending)],
            ),
            flat(
                "second",
                "owner",
                true,
                vec![invoice("b", 450.0, now - Duration::days(30), InvoiceStatus::Pending)],
            ),
        ];

        let report = compute_arrears(&flats, "owner", now);
        let order = report
            .flats
            .iter()
            .map(|entry| entry.flat_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["top", "first", "second"]);
    }

    #[test]
    fn empty_portfolio_has_no_arrears() {
        let report = compute_arrears(&[], "owner", now());
        assert_eq!(report.flats_in_arrears, 0);
        assert_eq!(report.total_arrears, 0.0);
        assert!(report.flats.is_empty());
    }

    #[test]
    fn partial_days_round_down() {
        let now = now();
        assert_eq!(days_past_due(now - Duration::hours(23), now), 0);
        assert_eq!(days_past_due(now - Duration::hours(47), now), 1);
        assert_eq!(days_past_due(now - Duration::days(3), now), 3);
    }
}
