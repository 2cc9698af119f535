use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tripweave_shared::{Error, Result};

use crate::autosave::Saver;
use crate::{
    AutoSave, DEFAULT_AUTOSAVE_DELAY, DeriveOptions, Directions, Geocoder, Itinerary,
    ItineraryGenerator, ItineraryRepository, Lifecycle, OptimizePreferences, OptimizedOrder,
    Persisted, Planner, RegenerationPolicy, RouteOptimizer, TripMetadata,
};

pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(15 * 60);

/// Single owner of one open itinerary.
///
/// Mutations go through [`ItineraryStore::update`], which schedules an auto-save whenever the
/// planner is left dirty. External calls run without holding the planner lock; their results
/// are fed back through the planner's tickets so stale answers are dropped.
pub struct ItineraryStore {
    saver: Saver,
    autosave: AutoSave,
}

impl ItineraryStore {
    pub fn new(
        planner: Planner,
        repository: Arc<dyn ItineraryRepository>,
        autosave_delay: Duration,
    ) -> Self {
        let saver = Saver {
            planner: Arc::new(Mutex::new(planner)),
            repository,
            gate: Arc::new(Mutex::new(())),
        };
        let autosave = AutoSave::spawn(saver.clone(), autosave_delay);

        Self { saver, autosave }
    }

    pub async fn read<R>(&self, f: impl FnOnce(&Planner) -> R) -> R {
        let planner = self.saver.planner.lock().await;
        f(&planner)
    }

    pub async fn snapshot(&self) -> Itinerary {
        self.read(|planner| planner.itinerary().clone()).await
    }

    /// Applies a mutation and schedules an auto-save when it left the planner dirty.
    pub async fn update<R>(&self, f: impl FnOnce(&mut Planner) -> Result<R>) -> Result<R> {
        let mut planner = self.saver.planner.lock().await;
        let revision = planner.revision();
        let result = f(&mut planner)?;

        if planner.revision() != revision && planner.should_autosave() {
            self.autosave.schedule();
        }

        Ok(result)
    }

    /// Saves right away, creating the itinerary on its first save.
    #[tracing::instrument(skip_all)]
    pub async fn save(&self) -> Result<Persisted> {
        self.autosave.cancel();

        match self.saver.save(false).await? {
            Some(persisted) => Ok(persisted),
            None => tripweave_shared::bail!("save produced no result"),
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn delete(&self) -> Result<bool> {
        self.autosave.cancel();
        let _gate = self.saver.gate.lock().await;
        let mut planner = self.saver.planner.lock().await;

        planner.delete(self.saver.repository.as_ref()).await
    }

    /// Computes the route for the current waypoints and re-derives days.
    ///
    /// A failed call clears the stored route. Returns `false` when a newer request or a
    /// waypoint edit superseded this one.
    #[tracing::instrument(skip_all)]
    pub async fn compute_route(&self, directions: &dyn Directions) -> Result<bool> {
        let ticket = self.update(|planner| planner.begin_route_request()).await?;

        match directions.compute_route(&ticket.coordinates).await {
            Ok(summary) => {
                self.update(|planner| planner.apply_route(ticket, summary))
                    .await
            }
            Err(err) => {
                tracing::warn!(error = %err, "route computation failed");
                self.update(|planner| Ok(planner.fail_route(&ticket)))
                    .await?;
                Err(err.into())
            }
        }
    }

    #[tracing::instrument(skip(self, geocoder))]
    pub async fn geocode_waypoint(
        &self,
        geocoder: &dyn Geocoder,
        waypoint_id: &str,
        query: &str,
    ) -> Result<bool> {
        let ticket = self
            .update(|planner| planner.begin_geocode(waypoint_id, query))
            .await?;

        match geocoder.geocode(&ticket.query).await {
            Ok(place) => {
                self.update(|planner| planner.apply_geocode(ticket, place))
                    .await
            }
            Err(err) => {
                self.update(|planner| {
                    planner.fail_geocode(&ticket);
                    Ok(())
                })
                .await?;
                Err(err.into())
            }
        }
    }

    /// Asks the optimizer for a better stop order and applies it when it is well formed.
    #[tracing::instrument(skip_all)]
    pub async fn optimize(
        &self,
        optimizer: &dyn RouteOptimizer,
        preferences: OptimizePreferences,
    ) -> Result<(bool, OptimizedOrder)> {
        let ticket = self
            .update(|planner| planner.begin_optimize(preferences))
            .await?;
        let optimized = optimizer.optimize(&ticket.request).await?;

        let applied = self
            .update(|planner| planner.apply_optimized_order(ticket, &optimized))
            .await
            .inspect_err(|err| tracing::warn!(error = %err, "rejected optimizer response"))?;

        Ok((applied, optimized))
    }

    #[tracing::instrument(skip_all)]
    pub async fn generate(
        &self,
        generator: &dyn ItineraryGenerator,
        trip: &TripMetadata,
    ) -> Result<()> {
        let (waypoints, trip) = self.read(|planner| planner.generation_input(trip)).await?;
        let plan = generator.generate(&waypoints, &trip).await?;

        self.update(|planner| planner.apply_generated_plan(plan, &trip))
            .await
    }
}

/// How new and loaded planners are set up.
#[derive(Clone, Debug)]
pub struct StoreSettings {
    pub options: DeriveOptions,
    pub policy: RegenerationPolicy,
    pub autosave_delay: Duration,
    /// Open stores nobody touched for this long are saved and closed.
    pub idle_ttl: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            options: DeriveOptions::default(),
            policy: RegenerationPolicy::default(),
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            idle_ttl: DEFAULT_IDLE_TTL,
        }
    }
}

impl StoreSettings {
    fn options(&self) -> DeriveOptions {
        self.options.clone().starting(tripweave_shared::today())
    }
}

struct OpenStore {
    store: Arc<ItineraryStore>,
    last_used: std::sync::Mutex<Instant>,
}

impl OpenStore {
    fn new(store: Arc<ItineraryStore>) -> Self {
        Self {
            store,
            last_used: std::sync::Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) -> Arc<ItineraryStore> {
        *self
            .last_used
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
        self.store.clone()
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let last_used = *self
            .last_used
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        now.saturating_duration_since(last_used)
    }

    /// Nobody but the registry and `extra_handles` local clones holds the store.
    fn is_unused(&self, extra_handles: usize) -> bool {
        Arc::strong_count(&self.store) == 1 + extra_handles
    }
}

/// Open stores by itinerary id.
///
/// Stores stay open while they are used. [`StoreRegistry::evict_idle`] saves and closes the
/// ones that sat idle past [`StoreSettings::idle_ttl`].
pub struct StoreRegistry {
    repository: Arc<dyn ItineraryRepository>,
    settings: StoreSettings,
    stores: RwLock<HashMap<String, OpenStore>>,
}

impl StoreRegistry {
    pub fn new(repository: Arc<dyn ItineraryRepository>, settings: StoreSettings) -> Self {
        Self {
            repository,
            settings,
            stores: RwLock::new(HashMap::new()),
        }
    }

    pub fn repository(&self) -> &Arc<dyn ItineraryRepository> {
        &self.repository
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Starts a new itinerary and saves it once so it gets an id.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, user_id: &str, title: &str) -> Result<Arc<ItineraryStore>> {
        let planner = Planner::create_new(
            user_id,
            title,
            self.settings.options(),
            self.settings.policy,
        );
        let store = Arc::new(ItineraryStore::new(
            planner,
            self.repository.clone(),
            self.settings.autosave_delay,
        ));
        let persisted = store.save().await?;

        self.stores
            .write()
            .await
            .insert(persisted.id.to_owned(), OpenStore::new(store.clone()));

        tracing::info!(id = %persisted.id, "itinerary created");

        Ok(store)
    }

    pub async fn open(&self, id: &str) -> Result<Arc<ItineraryStore>> {
        if let Some(open) = self.stores.read().await.get(id) {
            return Ok(open.touch());
        }

        let itinerary = self.repository.find(id).await?.ok_or(Error::NotFound)?;
        let planner = Planner::load(itinerary, self.settings.options(), self.settings.policy);

        let mut stores = self.stores.write().await;
        let store = stores
            .entry(id.to_owned())
            .or_insert_with(|| {
                OpenStore::new(Arc::new(ItineraryStore::new(
                    planner,
                    self.repository.clone(),
                    self.settings.autosave_delay,
                )))
            })
            .touch();

        Ok(store)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let store = self.open(id).await?;
        let existed = store.delete().await?;
        self.stores.write().await.remove(id);

        Ok(existed)
    }

    /// Saves every open itinerary that still has unsaved changes. Returns how many were saved.
    pub async fn flush(&self) -> usize {
        let stores = self
            .stores
            .read()
            .await
            .values()
            .map(|open| open.store.clone())
            .collect::<Vec<_>>();

        let mut saved = 0;
        for store in stores {
            if !store.read(Planner::should_autosave).await {
                continue;
            }

            match store.save().await {
                Ok(_) => saved += 1,
                Err(err) => tracing::warn!(error = %err, "failed to flush itinerary"),
            }
        }

        saved
    }

    /// Closes stores that are idle past the TTL and not held by anyone else. Pending changes
    /// are saved first; a store whose save fails stays open. Returns how many were closed.
    #[tracing::instrument(skip(self))]
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let ttl = self.settings.idle_ttl;
        let candidates = self
            .stores
            .read()
            .await
            .iter()
            .filter(|(_, open)| open.idle_for(now) >= ttl && open.is_unused(0))
            .map(|(id, open)| (id.to_owned(), open.store.clone()))
            .collect::<Vec<_>>();

        let mut evicted = 0;
        for (id, store) in candidates {
            if store.read(|p| p.lifecycle() == Lifecycle::Dirty).await {
                if let Err(err) = store.save().await {
                    tracing::warn!(%id, error = %err, "keeping idle itinerary open, save failed");
                    continue;
                }
            }

            let mut stores = self.stores.write().await;
            let still_idle = stores
                .get(&id)
                .is_some_and(|open| open.idle_for(Instant::now()) >= ttl && open.is_unused(1));
            if still_idle {
                stores.remove(&id);
                evicted += 1;
            }
        }

        if evicted > 0 {
            tracing::debug!(evicted, "closed idle itineraries");
        }

        evicted
    }

    /// Runs [`StoreRegistry::evict_idle`] in the background until the registry is dropped.
    pub fn spawn_eviction(self: &Arc<Self>) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        let period = (self.settings.idle_ttl / 2).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.evict_idle().await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.stores.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.stores.read().await.is_empty()
    }
}
