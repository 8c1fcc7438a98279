//! Process-wide defaults for spec evaluation.

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// Trial budgets used when a caller does not supply one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecConfig {
    /// Trials run by `ContractSpec::conform`.
    pub contract_iterations: u32,
    /// Trials run by `ContractSpec::explain`.
    pub explain_iterations: u32,
    /// Trials run by the check entry point.
    pub check_iterations: u32,
}

impl Default for SpecConfig {
    fn default() -> Self {
        Self {
            contract_iterations: 21,
            explain_iterations: 100,
            check_iterations: 1000,
        }
    }
}

static SPEC_CONFIG: Lazy<RwLock<SpecConfig>> = Lazy::new(|| RwLock::new(SpecConfig::default()));

/// Snapshot of the current defaults.
pub fn spec_config() -> SpecConfig {
    SPEC_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Replace the defaults, returning the previous ones.
pub fn set_spec_config(config: SpecConfig) -> SpecConfig {
    let mut guard = SPEC_CONFIG.write().unwrap_or_else(|e| e.into_inner());
    std::mem::replace(&mut *guard, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SpecConfig::default();
        assert_eq!(config.contract_iterations, 21);
        assert_eq!(config.explain_iterations, 100);
        assert_eq!(config.check_iterations, 1000);
    }
}
