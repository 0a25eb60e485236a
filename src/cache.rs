//! Per-university cache of tool descriptors.
//!
//! Entries live for a fixed TTL and are refreshed lazily on the first
//! `resolve` after they expire. A failed refresh leaves the old entry in
//! place and reports the error. There is no eviction; the map grows with the
//! number of distinct tenants seen.
//!
//! Concurrent misses for one tenant each go upstream unless single-flight is
//! enabled, in which case they queue on a per-tenant gate and the followers
//! reuse the leader's result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::registry::{DescriptorSource, RegistryError};
use crate::tools::ToolDescriptor;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct CachedToolSet {
    pub tenant_id: String,
    pub tools: Arc<Vec<ToolDescriptor>>,
    pub expires_at: Instant,
}

impl CachedToolSet {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct ToolCache {
    source: Arc<dyn DescriptorSource>,
    ttl: Duration,
    single_flight: bool,
    entries: RwLock<HashMap<String, CachedToolSet>>,
    gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ToolCache {
    pub fn new(source: Arc<dyn DescriptorSource>) -> Self {
        Self {
            source,
            ttl: DEFAULT_TTL,
            single_flight: false,
            entries: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    /// Return the tenant's descriptors, fetching them if missing or expired.
    pub async fn resolve(&self, tenant: &str) -> Result<Arc<Vec<ToolDescriptor>>, RegistryError> {
        if let Some(tools) = self.lookup(tenant).await {
            tracing::debug!(tenant, "tool cache hit");
            return Ok(tools);
        }

        if !self.single_flight {
            return self.refresh(tenant).await;
        }

        let gate = self.gate(tenant);
        let _turn = gate.lock().await;
        if let Some(tools) = self.lookup(tenant).await {
            tracing::debug!(tenant, "tool cache filled while waiting");
            return Ok(tools);
        }
        self.refresh(tenant).await
    }

    /// Drop the tenant's entry so the next `resolve` goes upstream.
    pub async fn invalidate(&self, tenant: &str) -> bool {
        self.entries.write().await.remove(tenant).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn lookup(&self, tenant: &str) -> Option<Arc<Vec<ToolDescriptor>>> {
        let entries = self.entries.read().await;
        entries
            .get(tenant)
            .filter(|entry| entry.is_fresh(Instant::now()))
            .map(|entry| entry.tools.clone())
    }

    async fn refresh(&self, tenant: &str) -> Result<Arc<Vec<ToolDescriptor>>, RegistryError> {
        tracing::info!(tenant, "tool cache miss, fetching from registry");
        let tools = match self.source.fetch(tenant).await {
            Ok(tools) => Arc::new(tools),
            Err(e) => {
                tracing::error!(tenant, error = %e, "failed to fetch tool descriptors");
                return Err(e);
            }
        };

        let entry = CachedToolSet {
            tenant_id: tenant.to_string(),
            tools: tools.clone(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(tenant.to_string(), entry);
        tracing::info!(tenant, count = tools.len(), "tool cache refreshed");
        Ok(tools)
    }

    fn gate(&self, tenant: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        gates.entry(tenant.to_string()).or_default().clone()
    }
}
