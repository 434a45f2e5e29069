//! The capability registry.
//!
//! Maps analysis-type ids to their pluggable operation sets. Resolution is a
//! pure lookup, never reflection. The registry is read-mostly: populated at
//! startup, treated as immutable after the first `global()` read, no runtime
//! unregistration.

use crate::analyses::{AnalysisCapabilities, FactorAnalysis, PrincipalComponents};
use crate::error::InterpretError;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::info;

/// Lookup from analysis-type id to capability set.
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    types: HashMap<String, Arc<dyn AnalysisCapabilities>>,
}

impl CapabilityRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability set under its own `type_id`.
    ///
    /// Registration does not validate completeness; a set missing mandatory
    /// operations registers fine and fails on first use of the missing
    /// operation.
    pub fn register(&mut self, capabilities: Arc<dyn AnalysisCapabilities>) {
        let id = capabilities.type_id().to_string();
        info!(analysis_type = %id, "Registered analysis capability set");
        self.types.insert(id, capabilities);
    }

    /// Resolve a type id to its capability set.
    pub fn resolve(
        &self,
        analysis_type: &str,
    ) -> Result<Arc<dyn AnalysisCapabilities>, InterpretError> {
        self.types
            .get(analysis_type)
            .cloned()
            .ok_or_else(|| InterpretError::unregistered_type(analysis_type))
    }

    /// Whether a type id has a capability set.
    pub fn is_registered(&self, analysis_type: &str) -> bool {
        self.types.contains_key(analysis_type)
    }

    /// Registered type ids, sorted.
    pub fn registered_types(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.types.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("types", &self.registered_types())
            .finish()
    }
}

/// The built-in registry: factor analysis and principal components.
pub fn builtin() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(FactorAnalysis));
    registry.register(Arc::new(PrincipalComponents));
    registry
}

/// Process-wide registry, installed once.
static GLOBAL_REGISTRY: OnceLock<CapabilityRegistry> = OnceLock::new();

/// Install a custom process-wide registry.
///
/// Call at most once, before any interpretation runs. A call after the
/// built-in registry has already been taken is ignored with a warning.
pub fn install(registry: CapabilityRegistry) {
    if GLOBAL_REGISTRY.set(registry).is_err() {
        tracing::warn!(
            "registry::install() called after the global registry was already in use — ignoring"
        );
    }
}

/// The process-wide registry, seeding the built-ins on first use.
pub fn global() -> &'static CapabilityRegistry {
    GLOBAL_REGISTRY.get_or_init(builtin)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types_resolve() {
        let registry = builtin();
        assert!(registry.is_registered("factor"));
        assert!(registry.is_registered("pca"));
        assert!(registry.resolve("factor").is_ok());
        assert_eq!(registry.registered_types(), vec!["factor", "pca"]);
    }

    #[test]
    fn test_unregistered_type_fails_naming_it() {
        let registry = builtin();
        assert!(!registry.is_registered("cluster"));
        let err = registry.resolve("cluster").unwrap_err();
        assert!(matches!(
            err,
            InterpretError::CapabilityNotImplemented { operation: None, .. }
        ));
        assert!(err.to_string().contains("cluster"));
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = builtin();
        let before = registry.registered_types().len();
        registry.register(Arc::new(FactorAnalysis));
        assert_eq!(registry.registered_types().len(), before);
    }
}
