//! Admin login audit trail.
//!
//! Handlers emit `AuditEvent`s into an unbounded channel once the auth decision
//! is final. A background worker drains the channel into an `AuditSink`:
//!
//! - `Log` writes a structured `tracing` event (default without a database).
//! - `Postgres` inserts rows into `admin_audit_log`.
//!
//! Sending never blocks the request, and a failed write is logged by the worker
//! and dropped. Authentication outcomes never depend on the audit trail.

use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditOutcome {
    LoginSucceeded,
    LoginFailed,
    LoginRateLimited,
    Logout,
}

impl AuditOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoginSucceeded => "login_succeeded",
            Self::LoginFailed => "login_failed",
            Self::LoginRateLimited => "login_rate_limited",
            Self::Logout => "logout",
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuditEvent {
    pub id: Uuid,
    pub outcome: AuditOutcome,
    pub client_address: String,
    pub occurred_at: OffsetDateTime,
}

impl AuditEvent {
    #[must_use]
    pub fn new(outcome: AuditOutcome, client_address: &str, occurred_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::now_v7(),
            outcome,
            client_address: client_address.to_string(),
            occurred_at,
        }
    }
}

/// Sending half of the audit channel. Cheap to clone.
#[derive(Clone, Debug)]
pub struct AuditLog {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl AuditLog {
    /// Create the channel; the receiver goes to `spawn_audit_worker`.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AuditEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event. Never blocks and never fails the caller.
    pub fn record(&self, event: AuditEvent) {
        if let Err(err) = self.tx.send(event) {
            error!(
                outcome = err.0.outcome.as_str(),
                client = %err.0.client_address,
                "Audit worker is gone, dropping event"
            );
        }
    }
}

#[derive(Clone, Debug)]
pub enum AuditSink {
    Log,
    Postgres(PgPool),
}

impl AuditSink {
    async fn write(&self, event: &AuditEvent) -> anyhow::Result<()> {
        match self {
            Self::Log => {
                info!(
                    audit_id = %event.id,
                    outcome = event.outcome.as_str(),
                    client = %event.client_address,
                    occurred_at = %event.occurred_at,
                    "admin audit"
                );
                Ok(())
            }
            Self::Postgres(pool) => {
                let query = "INSERT INTO admin_audit_log (id, outcome, client_address, occurred_at) VALUES ($1, $2, $3, $4)";
                let span = info_span!(
                    "db.query",
                    db.system = "postgresql",
                    db.operation = "INSERT"
                );
                sqlx::query(query)
                    .bind(event.id)
                    .bind(event.outcome.as_str())
                    .bind(&event.client_address)
                    .bind(event.occurred_at)
                    .execute(pool)
                    .instrument(span)
                    .await?;
                Ok(())
            }
        }
    }
}

/// Drain the audit channel until every `AuditLog` handle is dropped.
pub fn spawn_audit_worker(
    mut rx: mpsc::UnboundedReceiver<AuditEvent>,
    sink: AuditSink,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(err) = sink.write(&event).await {
                error!(
                    audit_id = %event.id,
                    outcome = event.outcome.as_str(),
                    "Failed to write admin audit event: {err}"
                );
            }
        }
    })
}
