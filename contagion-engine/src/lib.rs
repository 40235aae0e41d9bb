//! Contagion Engine
//!
//! Tick-driven disease simulation: per-entity infections that advance
//! through staged symptoms, cure on data-driven conditions, and spread by
//! contact, air, surface residue and lingering clouds. The crate has no
//! world of its own; callers implement [`Host`] (or use [`SandboxWorld`]).

pub mod carrier;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod engine;
pub mod events;
pub mod host;
pub mod numbers;
pub mod report;
pub mod rng;
pub mod sandbox;
pub mod spread;

use std::sync::Arc;

// Re-export commonly used types
pub use carrier::{CarrierState, CureSlot};
pub use catalog::{
    AirborneBurst, AirborneSpread, Behavior, CatalogError, CloudBurst, ContactSpread,
    CureCondition, CureStep, DiseaseCatalog, DiseaseDef, SpreadVector, StageDef, StealthFlag,
    SymptomDef, SymptomRef, TimedStatus,
};
pub use config::{CloudConfig, EngineConfig, EngineConfigError, PpeConfig, ResidueConfig};
pub use constants::{STATUS_FORCED_SLEEP, STATUS_JITTER, STATUS_SLEEPING, STATUS_STUTTER};
pub use engine::DiseaseEngine;
pub use events::{DiseaseEvent, TickSummary};
pub use host::{
    Chemistry, Components, EntityId, Host, MaskState, Messages, Position, Protection, Spatial,
    StatusEffects, Thermal, Vitals,
};
pub use report::{ReportKind, SampleEntry, SampleRecord, render_report};
pub use rng::{Dice, RollStream};
pub use sandbox::{EntityKind, JournalEntry, SandboxEntity, SandboxWorld};
pub use spread::cloud::{Cloud, CloudId, CloudSpec};
pub use spread::ppe_factor;
pub use spread::residue::Residue;

/// Trait for abstracting where catalog and tuning data come from
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the disease catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or fails validation.
    fn load_catalog(&self) -> Result<DiseaseCatalog, Self::Error>;

    /// Load engine tuning
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read or fails validation.
    fn load_config(&self) -> Result<EngineConfig, Self::Error>;
}

/// Loader serving the catalog compiled into the crate and default tuning.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledData;

impl DataLoader for BundledData {
    type Error = CatalogError;

    fn load_catalog(&self) -> Result<DiseaseCatalog, Self::Error> {
        let catalog = DiseaseCatalog::default_catalog().clone();
        catalog.validate()?;
        Ok(catalog)
    }

    fn load_config(&self) -> Result<EngineConfig, Self::Error> {
        Ok(EngineConfig::default())
    }
}

/// Builds engines from a [`DataLoader`].
pub struct EngineFactory<L>
where
    L: DataLoader,
{
    data_loader: L,
}

impl<L> EngineFactory<L>
where
    L: DataLoader,
{
    /// Create a new factory with the provided data loader
    pub const fn new(data_loader: L) -> Self {
        Self { data_loader }
    }

    /// Build an engine seeded from the loaded configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog or configuration cannot be loaded.
    pub fn build(&self) -> Result<DiseaseEngine, L::Error> {
        let catalog = self.data_loader.load_catalog()?;
        let config = self.data_loader.load_config()?;
        Ok(DiseaseEngine::new(Arc::new(catalog), config))
    }

    /// Build an engine with the configured seed replaced by `seed`
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog or configuration cannot be loaded.
    pub fn build_seeded(&self, seed: u64) -> Result<DiseaseEngine, L::Error> {
        let catalog = self.data_loader.load_catalog()?;
        let config = EngineConfig {
            seed,
            ..self.data_loader.load_config()?
        };
        Ok(DiseaseEngine::new(Arc::new(catalog), config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, thiserror::Error)]
    #[error("mock loader failure")]
    struct MockError;

    struct MockLoader {
        catalog: DiseaseCatalog,
        fail: bool,
        calls: RefCell<u32>,
    }

    impl DataLoader for MockLoader {
        type Error = MockError;

        fn load_catalog(&self) -> Result<DiseaseCatalog, Self::Error> {
            *self.calls.borrow_mut() += 1;
            if self.fail {
                Err(MockError)
            } else {
                Ok(self.catalog.clone())
            }
        }

        fn load_config(&self) -> Result<EngineConfig, Self::Error> {
            Ok(EngineConfig::default())
        }
    }

    #[test]
    fn factory_builds_from_loader() {
        let loader = MockLoader {
            catalog: DiseaseCatalog::default_catalog().clone(),
            fail: false,
            calls: RefCell::new(0),
        };
        let factory = EngineFactory::new(loader);
        let engine = factory.build_seeded(7).unwrap();
        assert_eq!(engine.config().seed, 7);
        assert!(engine.catalog().disease("common_cold").is_some());
        assert_eq!(*factory.data_loader.calls.borrow(), 1);
    }

    #[test]
    fn factory_propagates_loader_errors() {
        let loader = MockLoader {
            catalog: DiseaseCatalog::default(),
            fail: true,
            calls: RefCell::new(0),
        };
        assert!(EngineFactory::new(loader).build().is_err());
    }

    #[test]
    fn bundled_data_validates() {
        let engine = EngineFactory::new(BundledData).build().unwrap();
        assert!(!engine.catalog().diseases.is_empty());
    }
}
