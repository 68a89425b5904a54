//! Postgres repositories.
//!
//! Tickets are keyed by the SHA-256 of the ticket id, so a leaked table never
//! yields usable session tickets. Every statement runs inside a `db.query` span.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, types::Json, PgPool, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use super::{ProfileRepository, StoreError, StoreResult, TicketRepository};
use crate::auth::model::{Profile, Ticket};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// Open a connection pool.
///
/// # Errors
/// Returns an error if the DSN is invalid or the database cannot be reached
/// within `acquire_timeout`.
pub async fn connect(
    dsn: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> StoreResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(dsn)
        .await?;
    Ok(pool)
}

/// Create the `profiles` and `tickets` tables if they do not exist.
///
/// # Errors
/// Returns an error if any schema statement fails.
pub async fn apply_schema(pool: &PgPool) -> StoreResult<()> {
    for statement in split_sql_statements(SCHEMA_SQL) {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DDL",
            db.statement = statement.as_str()
        );
        sqlx::query(&statement)
            .execute(pool)
            .instrument(span)
            .await?;
    }
    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

/// Hash a ticket id so raw values never touch the database.
fn hash_ticket_id(id: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.finalize().to_vec()
}

#[derive(Clone, Debug)]
pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn insert(&self, ticket: &Ticket) -> StoreResult<()> {
        let query = r"
            INSERT INTO tickets (ticket_hash, username, tenant_name, issued_at, last_access_at)
            VALUES ($1, $2, $3, $4, $5)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(hash_ticket_id(&ticket.id))
            .bind(&ticket.username)
            .bind(&ticket.tenant_name)
            .bind(ticket.issued_at)
            .bind(ticket.last_access_at)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn find(&self, id: &str) -> StoreResult<Option<Ticket>> {
        let query = r"
            SELECT username, tenant_name, issued_at, last_access_at
            FROM tickets
            WHERE ticket_hash = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(hash_ticket_id(id))
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.map(|row| -> StoreResult<Ticket> {
            Ok(Ticket {
                id: id.to_string(),
                username: row.try_get("username")?,
                tenant_name: row.try_get("tenant_name")?,
                issued_at: row.try_get("issued_at")?,
                last_access_at: row.try_get("last_access_at")?,
            })
        })
        .transpose()
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> StoreResult<bool> {
        let query = "UPDATE tickets SET last_access_at = $2 WHERE ticket_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(hash_ticket_id(id))
            .bind(at)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let query = "DELETE FROM tickets WHERE ticket_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(hash_ticket_id(id))
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_last_access_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let query = "DELETE FROM tickets WHERE last_access_at < $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(cutoff)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> StoreResult<u64> {
        let query = "SELECT COUNT(*) FROM tickets";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;
        let count: i64 = row.try_get(0)?;
        u64::try_from(count).map_err(|_| StoreError::Corrupt(format!("negative count {count}")))
    }
}

#[derive(Clone, Debug)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PROFILE_COLUMNS: &str = "id, username, tenant_name, email, hashed_password, active, roles, attributes, created_at, modified_at";

fn profile_from_row(row: &PgRow) -> StoreResult<Profile> {
    let roles: Vec<String> = row.try_get("roles")?;
    let Json(attributes): Json<BTreeMap<String, Value>> = row.try_get("attributes")?;
    Ok(Profile {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        tenant_name: row.try_get("tenant_name")?,
        email: row.try_get("email")?,
        hashed_password: row.try_get("hashed_password")?,
        active: row.try_get("active")?,
        roles: roles.into_iter().collect::<BTreeSet<_>>(),
        attributes,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_by_username_and_tenant(
        &self,
        username: &str,
        tenant_name: &str,
    ) -> StoreResult<Option<Profile>> {
        let query = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE tenant_name = $1 AND username = $2"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(tenant_name)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let query = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn save(&self, profile: &Profile) -> StoreResult<()> {
        let query = r"
            INSERT INTO profiles
                (id, username, tenant_name, email, hashed_password, active, roles, attributes, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                tenant_name = EXCLUDED.tenant_name,
                email = EXCLUDED.email,
                hashed_password = EXCLUDED.hashed_password,
                active = EXCLUDED.active,
                roles = EXCLUDED.roles,
                attributes = EXCLUDED.attributes,
                modified_at = EXCLUDED.modified_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let roles: Vec<String> = profile.roles.iter().cloned().collect();
        sqlx::query(query)
            .bind(profile.id)
            .bind(&profile.username)
            .bind(&profile.tenant_name)
            .bind(&profile.email)
            .bind(&profile.hashed_password)
            .bind(profile.active)
            .bind(roles)
            .bind(Json(&profile.attributes))
            .bind(profile.created_at)
            .bind(profile.modified_at)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}
