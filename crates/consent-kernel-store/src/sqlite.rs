//! SQLite implementation of the consent store.
//!
//! This is the persistent backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use consent_kernel_core::{
    canonical_bytes, from_cbor, to_cbor, AddReceiptResponse, ConsentPurpose, PiiCategory,
    PiiCategoryInput, Purpose, PurposeCategory, PurposeCategoryInput, PurposeInput, Receipt,
    ReceiptId, ReceiptInput, ReceiptService, ReceiptState, ReceiptSummary, TenantContext,
};

use crate::error::{Result, StoreError, TaxonomyKind};
use crate::materialize::{
    materialize_receipt, now_millis, require_context, ResolvedName, TaxonomyNames,
};
use crate::migration;
use crate::traits::{ConsentStore, ReceiptQuery};

/// SQLite-based consent store.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row helpers
// ─────────────────────────────────────────────────────────────────────────────

fn parse_state(state: &str) -> Result<ReceiptState> {
    state
        .parse()
        .map_err(|e| StoreError::InvalidData(format!("receipt state column: {}", e)))
}

/// Map a UNIQUE violation on a taxonomy insert to `AlreadyExists`.
fn map_insert_error(err: rusqlite::Error, kind: TaxonomyKind, name: &str) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::AlreadyExists {
                kind,
                name: name.to_string(),
            }
        }
        other => StoreError::Database(other),
    }
}

/// Id lookups against one tenant's taxonomy tables.
struct TenantNames<'a> {
    conn: &'a Connection,
    tenant_domain: &'a str,
}

impl TaxonomyNames for TenantNames<'_> {
    fn purpose_name(&self, id: i64) -> Result<ResolvedName> {
        self.conn
            .query_row(
                "SELECT name FROM purposes WHERE id = ?1 AND tenant_domain = ?2",
                params![id, self.tenant_domain],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .map(|name| ResolvedName {
                name,
                display_name: None,
            })
            .ok_or(StoreError::UnknownReference {
                kind: TaxonomyKind::Purpose,
                id,
            })
    }

    fn pii_category_name(&self, id: i64) -> Result<ResolvedName> {
        self.conn
            .query_row(
                "SELECT name, display_name FROM pii_categories
                 WHERE id = ?1 AND tenant_domain = ?2",
                params![id, self.tenant_domain],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?
            .map(|(name, display_name)| ResolvedName {
                name,
                display_name: Some(display_name),
            })
            .ok_or(StoreError::UnknownReference {
                kind: TaxonomyKind::PiiCategory,
                id,
            })
    }
}

fn insert_receipt(conn: &Connection, receipt: &Receipt) -> Result<()> {
    conn.execute(
        "INSERT INTO receipts (
            receipt_id, tenant_domain, pii_principal_id, state, created_at,
            collection_method, jurisdiction, language, policy_url, properties
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            receipt.consent_receipt_id.as_str(),
            receipt.tenant_domain,
            receipt.pii_principal_id,
            receipt.state.as_str(),
            receipt.created_at,
            receipt.collection_method,
            receipt.jurisdiction,
            receipt.language,
            receipt.policy_url,
            to_cbor(&receipt.properties)?,
        ],
    )?;

    for (position, service) in receipt.services.iter().enumerate() {
        conn.execute(
            "INSERT INTO receipt_services (
                receipt_id, position, service, tenant_domain,
                sp_display_name, sp_description, purposes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                receipt.consent_receipt_id.as_str(),
                position as i64,
                service.service,
                service.tenant_domain,
                service.sp_display_name,
                service.sp_description,
                to_cbor(&service.purposes)?,
            ],
        )?;
    }

    Ok(())
}

/// Revoke receipts the new one supersedes. Returns how many were revoked.
fn revoke_superseded(conn: &Connection, receipt: &Receipt) -> Result<usize> {
    let mut revoked = 0;
    for service in &receipt.services {
        revoked += conn.execute(
            "UPDATE receipts SET state = ?1
             WHERE state = ?2 AND tenant_domain = ?3 AND pii_principal_id = ?4
               AND receipt_id IN (
                   SELECT receipt_id FROM receipt_services
                   WHERE service = ?5 AND tenant_domain = ?6
               )",
            params![
                ReceiptState::Revoked.as_str(),
                ReceiptState::Active.as_str(),
                receipt.tenant_domain,
                receipt.pii_principal_id,
                service.service,
                service.tenant_domain,
            ],
        )?;
    }
    Ok(revoked)
}

struct ReceiptRow {
    pii_principal_id: String,
    tenant_domain: String,
    state: String,
    created_at: i64,
    collection_method: String,
    jurisdiction: String,
    language: String,
    policy_url: String,
    properties: Vec<u8>,
}

fn load_receipt(conn: &Connection, tenant_domain: &str, id: &ReceiptId) -> Result<Receipt> {
    let row = conn
        .query_row(
            "SELECT pii_principal_id, tenant_domain, state, created_at, collection_method,
                    jurisdiction, language, policy_url, properties
             FROM receipts WHERE receipt_id = ?1 AND tenant_domain = ?2",
            params![id.as_str(), tenant_domain],
            |row| {
                Ok(ReceiptRow {
                    pii_principal_id: row.get(0)?,
                    tenant_domain: row.get(1)?,
                    state: row.get(2)?,
                    created_at: row.get(3)?,
                    collection_method: row.get(4)?,
                    jurisdiction: row.get(5)?,
                    language: row.get(6)?,
                    policy_url: row.get(7)?,
                    properties: row.get(8)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::ReceiptNotFound(id.to_string()))?;

    let mut stmt = conn.prepare(
        "SELECT service, tenant_domain, sp_display_name, sp_description, purposes
         FROM receipt_services WHERE receipt_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map(params![id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Vec<u8>>(4)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut services = Vec::with_capacity(rows.len());
    for (service, tenant, display_name, description, purposes) in rows {
        let purposes: Vec<ConsentPurpose> = from_cbor(&purposes)?;
        services.push(ReceiptService {
            service,
            tenant_domain: tenant,
            sp_display_name: display_name,
            sp_description: description,
            purposes,
        });
    }

    let properties: BTreeMap<String, String> = from_cbor(&row.properties)?;

    Ok(Receipt {
        consent_receipt_id: id.clone(),
        pii_principal_id: row.pii_principal_id,
        tenant_domain: row.tenant_domain,
        state: parse_state(&row.state)?,
        created_at: row.created_at,
        collection_method: row.collection_method,
        jurisdiction: row.jurisdiction,
        language: row.language,
        policy_url: row.policy_url,
        properties,
        services,
    })
}

#[async_trait]
impl ConsentStore for SqliteStore {
    async fn search_receipts(
        &self,
        ctx: &TenantContext,
        query: &ReceiptQuery,
    ) -> Result<Vec<ReceiptSummary>> {
        require_context(ctx)?;
        let tenant = ctx.tenant_domain.clone();
        let query = query.clone();

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT r.receipt_id, r.pii_principal_id, r.state FROM receipts r
                 WHERE r.tenant_domain = ?1 AND r.pii_principal_id = ?2 AND r.state = ?3
                   AND EXISTS (
                       SELECT 1 FROM receipt_services s
                       WHERE s.receipt_id = r.receipt_id
                         AND s.service = ?4 AND s.tenant_domain = ?5
                   )
                 ORDER BY r.created_at DESC, r.rowid DESC
                 LIMIT ?6 OFFSET ?7",
            )?;

            let rows = stmt
                .query_map(
                    params![
                        tenant,
                        query.pii_principal_id,
                        query.state.as_str(),
                        query.service,
                        query.service_tenant_domain,
                        query.limit as i64,
                        query.offset as i64,
                    ],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(id, principal, state)| -> Result<ReceiptSummary> {
                    Ok(ReceiptSummary {
                        consent_receipt_id: ReceiptId::new(id),
                        pii_principal_id: principal,
                        service: query.service.clone(),
                        tenant_domain: query.service_tenant_domain.clone(),
                        state: parse_state(&state)?,
                    })
                })
                .collect()
        })
        .await
    }

    async fn get_receipt(&self, ctx: &TenantContext, id: &ReceiptId) -> Result<Receipt> {
        require_context(ctx)?;
        let tenant = ctx.tenant_domain.clone();
        let id = id.clone();

        self.blocking(move |conn| load_receipt(conn, &tenant, &id))
            .await
    }

    async fn add_receipt(
        &self,
        ctx: &TenantContext,
        input: &ReceiptInput,
    ) -> Result<AddReceiptResponse> {
        require_context(ctx)?;
        let ctx = ctx.clone();
        let input = input.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let created_at = now_millis();
            let id = ReceiptId::derive(&canonical_bytes(&input)?, created_at);
            let names = TenantNames {
                conn: &tx,
                tenant_domain: &ctx.tenant_domain,
            };
            let receipt = materialize_receipt(id, &ctx, &input, created_at, &names)?;

            let revoked = revoke_superseded(&tx, &receipt)?;
            insert_receipt(&tx, &receipt)?;
            tx.commit()?;

            tracing::debug!(
                receipt = %receipt.consent_receipt_id,
                revoked,
                "receipt stored"
            );

            Ok(AddReceiptResponse {
                consent_receipt_id: receipt.consent_receipt_id,
                pii_principal_id: receipt.pii_principal_id,
                tenant_domain: receipt.tenant_domain,
                created_at: receipt.created_at,
            })
        })
        .await
    }

    async fn revoke_receipt(&self, ctx: &TenantContext, id: &ReceiptId) -> Result<()> {
        require_context(ctx)?;
        let tenant = ctx.tenant_domain.clone();
        let id = id.clone();

        self.blocking(move |conn| {
            let updated = conn.execute(
                "UPDATE receipts SET state = ?1 WHERE receipt_id = ?2 AND tenant_domain = ?3",
                params![ReceiptState::Revoked.as_str(), id.as_str(), tenant],
            )?;
            if updated == 0 {
                return Err(StoreError::ReceiptNotFound(id.to_string()));
            }
            Ok(())
        })
        .await
    }

    async fn get_purpose_by_name(&self, ctx: &TenantContext, name: &str) -> Result<Purpose> {
        require_context(ctx)?;
        let tenant = ctx.tenant_domain.clone();
        let name = name.to_string();

        self.blocking(move |conn| {
            conn.query_row(
                "SELECT id, name, description FROM purposes
                 WHERE tenant_domain = ?1 AND name = ?2",
                params![tenant, name],
                |row| {
                    Ok(Purpose {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NameNotFound {
                kind: TaxonomyKind::Purpose,
                name,
            })
        })
        .await
    }

    async fn add_purpose(&self, ctx: &TenantContext, input: &PurposeInput) -> Result<Purpose> {
        require_context(ctx)?;
        let tenant = ctx.tenant_domain.clone();
        let input = input.clone();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO purposes (tenant_domain, name, description) VALUES (?1, ?2, ?3)",
                params![tenant, input.name, input.description],
            )
            .map_err(|e| map_insert_error(e, TaxonomyKind::Purpose, &input.name))?;

            Ok(Purpose {
                id: conn.last_insert_rowid(),
                name: input.name,
                description: input.description,
            })
        })
        .await
    }

    async fn get_purpose_category_by_name(
        &self,
        ctx: &TenantContext,
        name: &str,
    ) -> Result<PurposeCategory> {
        require_context(ctx)?;
        let tenant = ctx.tenant_domain.clone();
        let name = name.to_string();

        self.blocking(move |conn| {
            conn.query_row(
                "SELECT id, name, description FROM purpose_categories
                 WHERE tenant_domain = ?1 AND name = ?2",
                params![tenant, name],
                |row| {
                    Ok(PurposeCategory {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NameNotFound {
                kind: TaxonomyKind::PurposeCategory,
                name,
            })
        })
        .await
    }

    async fn add_purpose_category(
        &self,
        ctx: &TenantContext,
        input: &PurposeCategoryInput,
    ) -> Result<PurposeCategory> {
        require_context(ctx)?;
        let tenant = ctx.tenant_domain.clone();
        let input = input.clone();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO purpose_categories (tenant_domain, name, description)
                 VALUES (?1, ?2, ?3)",
                params![tenant, input.name, input.description],
            )
            .map_err(|e| map_insert_error(e, TaxonomyKind::PurposeCategory, &input.name))?;

            Ok(PurposeCategory {
                id: conn.last_insert_rowid(),
                name: input.name,
                description: input.description,
            })
        })
        .await
    }

    async fn get_pii_category_by_name(
        &self,
        ctx: &TenantContext,
        name: &str,
    ) -> Result<PiiCategory> {
        require_context(ctx)?;
        let tenant = ctx.tenant_domain.clone();
        let name = name.to_string();

        self.blocking(move |conn| {
            conn.query_row(
                "SELECT id, name, description, display_name, sensitive FROM pii_categories
                 WHERE tenant_domain = ?1 AND name = ?2",
                params![tenant, name],
                |row| {
                    Ok(PiiCategory {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        display_name: row.get(3)?,
                        sensitive: row.get(4)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::NameNotFound {
                kind: TaxonomyKind::PiiCategory,
                name,
            })
        })
        .await
    }

    async fn add_pii_category(
        &self,
        ctx: &TenantContext,
        input: &PiiCategoryInput,
    ) -> Result<PiiCategory> {
        require_context(ctx)?;
        let tenant = ctx.tenant_domain.clone();
        let input = input.clone();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO pii_categories
                    (tenant_domain, name, description, display_name, sensitive)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    tenant,
                    input.name,
                    input.description,
                    input.display_name,
                    input.sensitive
                ],
            )
            .map_err(|e| map_insert_error(e, TaxonomyKind::PiiCategory, &input.name))?;

            Ok(PiiCategory {
                id: conn.last_insert_rowid(),
                name: input.name,
                description: input.description,
                display_name: input.display_name,
                sensitive: input.sensitive,
            })
        })
        .await
    }
}
