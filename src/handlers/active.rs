//! Registry of in-flight handler calls.
//!
//! Backs the `status/active_queries` endpoint. Entries are removed by an
//! RAII guard, so a call that fails or panics still disappears.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::handlers::endpoint::Endpoint;
use crate::routing::path::TenantToken;

#[derive(Debug, Clone)]
struct ActiveQuery {
    endpoint: Endpoint,
    tenant: TenantToken,
    path: String,
    args: String,
    started_at: Instant,
}

/// One row of the active-queries report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActiveQueryView {
    pub id: String,
    pub tenant: String,
    pub endpoint: &'static str,
    pub path: String,
    pub args: String,
    pub duration_secs: f64,
}

#[derive(Debug, Serialize)]
struct ActiveQueriesReport {
    status: &'static str,
    data: Vec<ActiveQueryView>,
}

#[derive(Debug, Clone, Default)]
pub struct ActiveQueries {
    inner: Arc<DashMap<Uuid, ActiveQuery>>,
}

impl ActiveQueries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a call until the returned guard is dropped.
    pub fn register(
        &self,
        endpoint: Endpoint,
        tenant: TenantToken,
        path: &str,
        args: &str,
        started_at: Instant,
    ) -> ActiveQueryGuard {
        let id = Uuid::new_v4();
        self.inner.insert(
            id,
            ActiveQuery {
                endpoint,
                tenant,
                path: path.to_string(),
                args: args.to_string(),
                started_at,
            },
        );
        ActiveQueryGuard {
            id,
            registry: Arc::clone(&self.inner),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Current calls, longest-running first.
    pub fn snapshot(&self) -> Vec<ActiveQueryView> {
        let mut rows: Vec<(Instant, ActiveQueryView)> = self
            .inner
            .iter()
            .map(|entry| {
                let q = entry.value();
                (
                    q.started_at,
                    ActiveQueryView {
                        id: entry.key().to_string(),
                        tenant: q.tenant.to_string(),
                        endpoint: q.endpoint.name(),
                        path: q.path.clone(),
                        args: q.args.clone(),
                        duration_secs: q.started_at.elapsed().as_secs_f64(),
                    },
                )
            })
            .collect();
        rows.sort_by_key(|(started, _)| *started);
        rows.into_iter().map(|(_, view)| view).collect()
    }

    /// JSON report served by `status/active_queries`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(ActiveQueriesReport {
            status: "ok",
            data: self.snapshot(),
        })
        .unwrap_or(serde_json::Value::Null)
    }
}

/// Removes its entry from the registry on drop.
#[derive(Debug)]
pub struct ActiveQueryGuard {
    id: Uuid,
    registry: Arc<DashMap<Uuid, ActiveQuery>>,
}

impl Drop for ActiveQueryGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}
