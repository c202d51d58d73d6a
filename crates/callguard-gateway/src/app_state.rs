//! Shared application state for the callguard gateway.
//!
//! Startup builds the registry from config: every protocol is registered,
//! its address-set implementations are installed, its conditions are added as
//! one atomic batch, and it is activated when `activate` is set. Any failure
//! aborts startup with the offending protocol named.

use std::path::Path;
use std::sync::Arc;

use callguard_core::error::{CallGuardError, Result};

use crate::config::{CallGuardConfig, ProtocolConfig};
use crate::obs::metrics::GatewayMetrics;
use crate::plugins::AddressSets;
use crate::registry::{RegistrationState, Registry};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<GatewayMetrics>,
}

struct AppStateInner {
    cfg: CallGuardConfig,
    registry: Arc<Registry>,
}

impl AppState {
    pub fn new(cfg: CallGuardConfig) -> Result<Self> {
        let registry = Arc::new(Registry::new(cfg.registration.clone()));
        let metrics = Arc::new(GatewayMetrics::default());

        for p in &cfg.protocols {
            bootstrap_protocol(&registry, &metrics, p, cfg.base_dir.as_deref()).map_err(|e| {
                CallGuardError::BadRequest(format!(
                    "protocol bootstrap failed (origin={}): {e}",
                    p.origin_name
                ))
            })?;
        }

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, registry }),
            metrics,
        })
    }

    pub fn cfg(&self) -> &CallGuardConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    pub fn set_draining(&self) {
        self.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.metrics.is_draining()
    }

    /// Registry gauges appended to `/metrics`.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        let registry = &self.inner.registry;
        let names = registry.origin_names();
        let registered = names.iter().filter(|n| registry.is_registered(n)).count();
        let conditions: usize = names
            .iter()
            .filter_map(|n| registry.resolve_store(n).ok())
            .map(|e| e.conditions_length())
            .sum();
        vec![
            ("callguard_protocols", names.len() as u64),
            ("callguard_protocols_registered", registered as u64),
            ("callguard_conditions", conditions as u64),
        ]
    }
}

fn bootstrap_protocol(
    registry: &Registry,
    metrics: &GatewayMetrics,
    p: &ProtocolConfig,
    base_dir: Option<&Path>,
) -> Result<()> {
    let origin = p.origin_name.as_str();
    let owner = p.owner;
    let entry = registry.start_registration(origin, owner)?;
    metrics.rule_mutations.inc(&[("origin", origin), ("op", "start_registration")]);

    for i in &p.implementations {
        let sets = i
            .address_sets
            .iter()
            .fold(AddressSets::new(), |sets, (predicate, members)| {
                sets.with_set(predicate, members.iter().copied())
            });
        entry.set_implementation(&owner, &i.id, Arc::new(sets))?;
        metrics.rule_mutations.inc(&[("origin", origin), ("op", "set_implementation")]);
    }

    let specs = p.load_conditions(base_dir)?;
    if !specs.is_empty() {
        let ids = entry.add_conditions(&owner, specs)?;
        metrics
            .rule_mutations
            .add(&[("origin", origin), ("op", "add_condition")], ids.len() as u64);
    }

    if p.activate && entry.state() == RegistrationState::Pending {
        registry.finish_registration(origin, &owner)?;
        metrics.rule_mutations.inc(&[("origin", origin), ("op", "finish_registration")]);
    } else if !p.activate && entry.state() == RegistrationState::Registered {
        tracing::warn!(origin, "single-phase registration activates protocols regardless of `activate`");
    }

    tracing::info!(
        origin,
        state = %entry.state(),
        conditions = entry.conditions_length(),
        "protocol bootstrapped"
    );
    Ok(())
}
