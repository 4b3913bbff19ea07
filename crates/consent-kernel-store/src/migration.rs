//! Database schema migrations for SQLite.
//!
//! Each migration transforms the schema from version N to N+1. Applied
//! versions are recorded in `schema_migrations`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::materialize::now_millis;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: running it against an up-to-date database is a no-op.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "schema migrated");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Taxonomy: names are unique per tenant
        CREATE TABLE purposes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_domain TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            UNIQUE(tenant_domain, name)
        );

        CREATE TABLE purpose_categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_domain TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            UNIQUE(tenant_domain, name)
        );

        CREATE TABLE pii_categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_domain TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            display_name TEXT NOT NULL,
            sensitive INTEGER NOT NULL DEFAULT 0,
            UNIQUE(tenant_domain, name)
        );

        -- Receipts, partitioned by the tenant they were written in
        CREATE TABLE receipts (
            receipt_id TEXT PRIMARY KEY,
            tenant_domain TEXT NOT NULL,
            pii_principal_id TEXT NOT NULL,
            state TEXT NOT NULL,              -- ACTIVE | REVOKED
            created_at INTEGER NOT NULL,      -- Unix ms
            collection_method TEXT NOT NULL,
            jurisdiction TEXT NOT NULL,
            language TEXT NOT NULL,
            policy_url TEXT NOT NULL,
            properties BLOB NOT NULL          -- CBOR map
        );

        -- One row per relying service named in a receipt
        CREATE TABLE receipt_services (
            receipt_id TEXT NOT NULL REFERENCES receipts(receipt_id),
            position INTEGER NOT NULL,
            service TEXT NOT NULL,
            tenant_domain TEXT NOT NULL,
            sp_display_name TEXT NOT NULL,
            sp_description TEXT NOT NULL,
            purposes BLOB NOT NULL,           -- CBOR array of resolved purposes
            PRIMARY KEY (receipt_id, position)
        );

        CREATE INDEX idx_receipts_principal ON receipts(tenant_domain, pii_principal_id, state);
        CREATE INDEX idx_receipts_created ON receipts(created_at);
        CREATE INDEX idx_receipt_services_service ON receipt_services(service, tenant_domain);
        "#,
    )?;

    Ok(())
}
