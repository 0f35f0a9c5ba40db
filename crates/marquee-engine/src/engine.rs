//! One handle over every service, sharing a store, publisher and clock

use std::sync::Arc;

use marquee_core::events::{EventPublisher, NoopPublisher, TracingPublisher};
use marquee_core::ops::activation_ops::{CodeEntropy, SystemEntropy};
use marquee_core::{MemoryStore, Repository, Result};
use marquee_store::SqliteStore;

use crate::activation::ActivationService;
use crate::clock::{Clock, SystemClock};
use crate::config::MarqueeConfig;
use crate::displays::DisplayService;
use crate::resolver::Resolver;
use crate::rules::RuleService;

#[derive(Debug, Clone)]
pub struct Engine {
    pub displays: DisplayService,
    pub activation: ActivationService,
    pub rules: RuleService,
    pub resolver: Resolver,
    config: MarqueeConfig,
}

impl Engine {
    /// Wire every service over explicit collaborators
    ///
    /// # Errors
    /// `InvalidConfig` if `config` does not validate.
    pub fn from_parts(
        repo: Arc<dyn Repository>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        entropy: Arc<dyn CodeEntropy>,
        config: MarqueeConfig,
    ) -> Result<Self> {
        config.validate()?;
        let displays = DisplayService::new(repo.clone(), events, clock.clone(), &config);
        let activation = ActivationService::new(
            repo.clone(),
            displays.clone(),
            entropy,
            clock.clone(),
            &config,
        );
        let rules = RuleService::new(repo.clone(), clock, &config);
        let resolver = Resolver::new(repo, &config)?;
        Ok(Self {
            displays,
            activation,
            rules,
            resolver,
            config,
        })
    }

    /// Production wiring over any repository
    ///
    /// # Errors
    /// `InvalidConfig` if `config` does not validate.
    pub fn new(repo: Arc<dyn Repository>, config: MarqueeConfig) -> Result<Self> {
        Self::from_parts(
            repo,
            Arc::new(TracingPublisher),
            Arc::new(SystemClock),
            Arc::new(SystemEntropy::new()),
            config,
        )
    }

    /// Open (and migrate) the SQLite database named in `storage.database_path`
    ///
    /// # Errors
    /// `InvalidConfig`, or `Persistence` when the database cannot be opened.
    pub fn open(config: MarqueeConfig) -> Result<Self> {
        config.validate()?;
        let store = SqliteStore::open(&config.storage.database_path)?;
        tracing::info!(
            component = module_path!(),
            database_path = %config.storage.database_path.display(),
            "store opened"
        );
        Self::new(Arc::new(store), config)
    }

    /// Engine over a throwaway in-memory store with a silent publisher
    ///
    /// # Errors
    /// `InvalidConfig` if `config` does not validate.
    pub fn in_memory(config: MarqueeConfig) -> Result<Self> {
        Self::from_parts(
            Arc::new(MemoryStore::new()),
            Arc::new(NoopPublisher),
            Arc::new(SystemClock),
            Arc::new(SystemEntropy::new()),
            config,
        )
    }

    pub fn config(&self) -> &MarqueeConfig {
        &self.config
    }
}
