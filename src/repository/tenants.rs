use serde_json::{Map, Value};
use sqlx::{PgConnection, PgPool};

use crate::{
    error::AppResult,
    models::TenantRecord,
    repository::table_service::{get_row, get_row_for_update_tx, list_rows},
};

pub const TENANTS_TABLE: &str = "tenants";

pub async fn fetch_tenant(pool: &PgPool, tenant_id: &str) -> AppResult<TenantRecord> {
    let row = get_row(pool, TENANTS_TABLE, tenant_id, "id").await?;
    TenantRecord::from_row(row)
}

pub async fn lock_tenant(conn: &mut PgConnection, tenant_id: &str) -> AppResult<TenantRecord> {
    let row = get_row_for_update_tx(conn, TENANTS_TABLE, tenant_id, "id").await?;
    TenantRecord::from_row(row)
}

pub async fn list_owner_tenants(
    pool: &PgPool,
    owner_id: &str,
    flat_id: Option<&str>,
    limit: i64,
) -> AppResult<Vec<TenantRecord>> {
    let mut filters = Map::new();
    filters.insert("owner_id".to_string(), Value::String(owner_id.to_string()));
    if let Some(flat_id) = flat_id {
        filters.insert("flat_id".to_string(), Value::String(flat_id.to_string()));
    }

    let rows = list_rows(pool, TENANTS_TABLE, Some(&filters), limit, 0, "created_at", false).await?;
    rows.into_iter().map(TenantRecord::from_row).collect()
}
