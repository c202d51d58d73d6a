use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use callguard_core::error::{CallGuardError, Result};

use crate::condition::ConditionSpec;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallGuardConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub registration: RegistrationPolicy,

    #[serde(default)]
    pub protocols: Vec<ProtocolConfig>,

    /// Directory relative `conditions_file` paths resolve against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl CallGuardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(CallGuardError::UnsupportedVersion);
        }

        self.gateway.validate()?;

        let mut seen = HashSet::new();
        for p in &self.protocols {
            p.validate()?;
            if !seen.insert(p.origin_name.as_str()) {
                return Err(CallGuardError::BadRequest(format!(
                    "duplicate protocol origin_name: {}",
                    p.origin_name
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen.parse::<SocketAddr>().map_err(|_| {
            CallGuardError::BadRequest(format!("gateway.listen is not a socket address: {}", self.listen))
        })?;
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

/// Number of registration phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    /// `Unregistered -> Pending -> Registered`.
    #[default]
    TwoPhase,
    /// `Unregistered -> Registered`.
    SinglePhase,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationPolicy {
    #[serde(default)]
    pub mode: RegistrationMode,

    /// Refuse `finish_registration` while the store is empty.
    #[serde(default)]
    pub require_conditions_on_finish: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolConfig {
    pub origin_name: String,
    pub owner: Address,

    /// Finish registration after bootstrapping (two-phase mode).
    #[serde(default)]
    pub activate: bool,

    #[serde(default)]
    pub implementations: Vec<ImplementationConfig>,

    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,

    /// JSON array in the `conditions.json` layout, appended after `conditions`.
    #[serde(default)]
    pub conditions_file: Option<String>,
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.origin_name.trim().is_empty() {
            return Err(CallGuardError::BadRequest("protocols[].origin_name must not be empty".into()));
        }

        let mut ids = HashSet::new();
        for i in &self.implementations {
            if i.id.trim().is_empty() {
                return Err(CallGuardError::BadRequest(format!(
                    "protocol {}: implementation id must not be empty",
                    self.origin_name
                )));
            }
            if !ids.insert(i.id.as_str()) {
                return Err(CallGuardError::BadRequest(format!(
                    "protocol {}: duplicate implementation id {}",
                    self.origin_name, i.id
                )));
            }
        }
        Ok(())
    }

    /// Inline conditions followed by the ones in `conditions_file`.
    pub fn load_conditions(&self, base_dir: Option<&Path>) -> Result<Vec<ConditionSpec>> {
        let mut out = self.conditions.clone();
        if let Some(file) = &self.conditions_file {
            let path = match base_dir {
                Some(dir) => dir.join(file),
                None => PathBuf::from(file),
            };
            let raw = fs::read_to_string(&path).map_err(|e| {
                CallGuardError::Internal(format!("read {} failed: {e}", path.display()))
            })?;
            let specs: Vec<ConditionSpec> = serde_json::from_str(&raw).map_err(|e| {
                CallGuardError::BadRequest(format!("invalid conditions file {}: {e}", path.display()))
            })?;
            out.extend(specs);
        }
        Ok(out)
    }
}

/// Address-set implementation: predicate name -> initial members.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImplementationConfig {
    pub id: String,
    #[serde(default)]
    pub address_sets: BTreeMap<String, Vec<Address>>,
}
