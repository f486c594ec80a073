//! Wiring of the cache layer
//!
//! [`CacheContext`] builds one [`CacheManager`] with every specialized cache
//! registered and, when enabled, a [`RefreshScheduler`] for reference data.

use std::sync::Arc;

use oddsfeed_core::{
    CacheDeps, CacheManager, DataRouter, InvariantMarketCache, ProfileCache, RefreshJob,
    SportDataCache, SportEventCache, SportEventStatusCache, VariantDescriptionCache,
    VariantMarketCache,
};
use oddsfeed_domain::CacheSettings;
use tracing::{info, instrument, warn};

use crate::error::InfraResult;
use crate::scheduling::{RefreshScheduler, RefreshSchedulerConfig, SchedulerError};

pub struct CacheContext {
    settings: CacheSettings,
    pub manager: Arc<CacheManager>,
    pub events: Arc<SportEventCache>,
    pub statuses: Arc<SportEventStatusCache>,
    pub profiles: Arc<ProfileCache>,
    pub sport_data: Arc<SportDataCache>,
    pub markets: Arc<InvariantMarketCache>,
    pub variant_markets: Arc<VariantMarketCache>,
    pub variants: Arc<VariantDescriptionCache>,
    scheduler: Option<RefreshScheduler>,
}

impl CacheContext {
    /// Validate `settings`, build every cache and register it
    ///
    /// # Errors
    ///
    /// `Config` for invalid settings; `Registration` if a cache cannot be
    /// registered.
    #[instrument(skip_all)]
    pub fn new(settings: CacheSettings, router: Arc<dyn DataRouter>) -> InfraResult<Self> {
        settings.validate()?;

        let manager = Arc::new(CacheManager::new());
        let deps = CacheDeps::new(router, &manager, &settings);

        let events = Arc::new(SportEventCache::new(&settings.sport_event_cache, deps.clone()));
        let statuses = Arc::new(SportEventStatusCache::new(&settings.sport_event_cache, deps.lock_config));
        let profiles = Arc::new(ProfileCache::new(&settings.profile_cache, deps.clone()));
        let sport_data = Arc::new(SportDataCache::new(deps.clone()));
        let markets = Arc::new(InvariantMarketCache::new(deps.clone()));
        let variant_markets =
            Arc::new(VariantMarketCache::new(&settings.market_cache, deps.clone()));
        let variants = Arc::new(VariantDescriptionCache::new(deps));

        manager.register(events.clone())?;
        manager.register(statuses.clone())?;
        manager.register(profiles.clone())?;
        manager.register(sport_data.clone())?;
        manager.register(markets.clone())?;
        manager.register(variant_markets.clone())?;
        manager.register(variants.clone())?;

        info!(
            caches = manager.registered_caches().len(),
            languages = ?settings.all_languages(),
            "cache context ready"
        );

        Ok(Self {
            settings,
            manager,
            events,
            statuses,
            profiles,
            sport_data,
            markets,
            variant_markets,
            variants,
            scheduler: None,
        })
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Jobs reloading the reference lists
    pub fn refresh_jobs(&self) -> Vec<Arc<dyn RefreshJob>> {
        vec![
            self.sport_data.clone() as Arc<dyn RefreshJob>,
            self.markets.clone() as Arc<dyn RefreshJob>,
            self.variants.clone() as Arc<dyn RefreshJob>,
        ]
    }

    /// Start background refresh; no-op returning `false` when disabled
    ///
    /// # Errors
    ///
    /// `Scheduler(AlreadyRunning)` when called twice.
    pub async fn start_refresh(&mut self) -> InfraResult<bool> {
        if !self.settings.refresh.enabled {
            info!("background refresh disabled");
            return Ok(false);
        }
        if self.scheduler.as_ref().is_some_and(RefreshScheduler::is_running) {
            return Err(SchedulerError::AlreadyRunning.into());
        }

        let mut scheduler = RefreshScheduler::new(
            Arc::clone(&self.manager),
            RefreshSchedulerConfig::from(&self.settings),
        );
        for job in self.refresh_jobs() {
            scheduler.register_job(job)?;
        }
        scheduler.start().await?;
        self.scheduler = Some(scheduler);
        Ok(true)
    }

    pub fn is_refreshing(&self) -> bool {
        self.scheduler.as_ref().is_some_and(RefreshScheduler::is_running)
    }

    /// Stop the scheduler and dispose the manager
    ///
    /// Payloads dispatched afterwards are dropped.
    #[instrument(skip(self))]
    pub async fn shutdown(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            if let Err(err) = scheduler.stop().await {
                warn!(error = %err, "refresh scheduler did not stop cleanly");
            }
        }
        self.manager.dispose();
        info!("cache context shut down");
    }
}
