use sqlx::{PgConnection, PgPool};

use crate::{
    error::{AppError, AppResult},
    models::{Flat, TenantRecord},
    repository::{
        flats::{fetch_flat, lock_flat},
        tenants::{fetch_tenant, lock_tenant},
    },
};

pub fn assert_owner(user_id: &str, owner_id: &str, entity: &str) -> AppResult<()> {
    if !user_id.is_empty() && user_id == owner_id {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "Forbidden: you do not own this {entity}."
    )))
}

pub async fn load_owned_flat(pool: &PgPool, user_id: &str, flat_id: &str) -> AppResult<Flat> {
    let flat = fetch_flat(pool, flat_id).await?;
    assert_owner(user_id, &flat.owner_id, "flat")?;
    Ok(flat)
}

pub async fn load_owned_tenant(
    pool: &PgPool,
    user_id: &str,
    tenant_id: &str,
) -> AppResult<TenantRecord> {
    let tenant = fetch_tenant(pool, tenant_id).await?;
    assert_owner(user_id, &tenant.owner_id, "tenant")?;
    Ok(tenant)
}

/// Transactional variant of `load_owned_flat`; the row stays locked until
/// the transaction ends.
pub async fn lock_owned_flat(
    conn: &mut PgConnection,
    user_id: &str,
    flat_id: &str,
) -> AppResult<Flat> {
    let flat = lock_flat(conn, flat_id).await?;
    assert_owner(user_id, &flat.owner_id, "flat")?;
    Ok(flat)
}

pub async fn lock_owned_tenant(
    conn: &mut PgConnection,
    user_id: &str,
    tenant_id: &str,
) -> AppResult<TenantRecord> {
    let tenant = lock_tenant(conn, tenant_id).await?;
    assert_owner(user_id, &tenant.owner_id, "tenant")?;
    Ok(tenant)
}
