//! Config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use callguard_core::error::{CallGuardError, Result};

pub use schema::{
    CallGuardConfig, GatewaySection, ImplementationConfig, ProtocolConfig, RegistrationMode,
    RegistrationPolicy,
};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "CALLGUARD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "callguard.yaml";

/// `$CALLGUARD_CONFIG`, else `callguard.yaml`.
pub fn config_path() -> String {
    std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

pub fn load_from_file(path: &str) -> Result<CallGuardConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| CallGuardError::Internal(format!("read config failed: {e}")))?;
    let mut cfg = load_from_str(&s)?;
    cfg.base_dir = Path::new(path).parent().map(Path::to_path_buf);
    Ok(cfg)
}

pub fn load_from_str(s: &str) -> Result<CallGuardConfig> {
    let cfg: CallGuardConfig = serde_yaml::from_str(s)
        .map_err(|e| CallGuardError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
