//! Strategy registry
//!
//! Maps strategy names to constructors so a host can pick a strategy from
//! configuration. Nothing is registered implicitly: call
//! [`register_builtin_strategies`] (or register your own) first.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use parking_lot::RwLock;

use super::engine::FusionEngine;
use super::errors::RegistryError;
use super::strategies::{ProbabilisticFusion, RuleBasedFusion, PROBABILISTIC_FUSION, RULE_BASED_FUSION};

/// Creates a fresh, uninitialized engine
pub type StrategyConstructor = fn() -> Box<dyn FusionEngine>;

/// Name to constructor map
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    constructors: BTreeMap<String, StrategyConstructor>,
}

impl StrategyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy under a unique name.
    pub fn register(&mut self, name: impl Into<String>, constructor: StrategyConstructor) -> Result<(), RegistryError> {
        let name = name.into();
        if self.constructors.contains_key(&name) {
            return Err(RegistryError::DuplicateStrategy(name));
        }
        log::debug!("Registered fusion strategy {}", name);
        self.constructors.insert(name, constructor);
        Ok(())
    }

    /// Construct a fresh engine for a registered strategy.
    pub fn create(&self, name: &str) -> Result<Box<dyn FusionEngine>, RegistryError> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| RegistryError::UnknownStrategy(name.to_string()))
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// True when a strategy of that name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Number of registered strategies
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

fn new_probabilistic() -> Box<dyn FusionEngine> {
    Box::new(ProbabilisticFusion::new())
}

fn new_rule_based() -> Box<dyn FusionEngine> {
    Box::new(RuleBasedFusion::new())
}

/// Register `ProbabilisticFusion` and `RuleBasedFusion`.
pub fn register_builtin_strategies(registry: &mut StrategyRegistry) -> Result<(), RegistryError> {
    registry.register(PROBABILISTIC_FUSION, new_probabilistic)?;
    registry.register(RULE_BASED_FUSION, new_rule_based)?;
    Ok(())
}

/// Process-wide registry. Starts empty.
pub fn global_registry() -> &'static RwLock<StrategyRegistry> {
    static REGISTRY: OnceLock<RwLock<StrategyRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(StrategyRegistry::new()))
}
