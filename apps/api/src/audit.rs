//! Post-success audit events.
//!
//! Each mutating operation emits one [`AuditEvent`] after it committed. Sinks are
//! fire-and-forget: a failing sink logs and never fails the operation.

use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::OfficeContext;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub actor_id: Uuid,
    pub office_id: Uuid,
    pub action: &'static str,
    pub entity: &'static str,
    pub entity_id: Uuid,
    pub detail: Value,
}

impl AuditEvent {
    pub fn new(ctx: &OfficeContext, action: &'static str, entity: &'static str, entity_id: Uuid) -> Self {
        AuditEvent {
            actor_id: ctx.user_id,
            office_id: ctx.office_id,
            action,
            entity,
            entity_id,
            detail: json!({}),
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Writes events to `audit_log` on a spawned task.
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AuditSink for PgAuditSink {
    fn record(&self, event: AuditEvent) {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            let result = sqlx::query(
                "INSERT INTO audit_log (office_id, actor_id, action, entity, entity_id, detail)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(event.office_id)
            .bind(event.actor_id)
            .bind(event.action)
            .bind(event.entity)
            .bind(event.entity_id)
            .bind(&event.detail)
            .execute(&pool)
            .await;

            if let Err(e) = result {
                warn!(
                    "Audit insert failed for {} {} {}: {e}",
                    event.action, event.entity, event.entity_id
                );
            }
        });
    }
}

/// Logs events without persisting them.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        info!(
            actor = %event.actor_id,
            office = %event.office_id,
            entity_id = %event.entity_id,
            detail = %event.detail,
            "audit: {} {}",
            event.action,
            event.entity
        );
    }
}
