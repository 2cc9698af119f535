use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use temp_dir::TempDir;
use tripweave_itinerary::{
    Coordinates, Directions, Geocoder, ItineraryRepository, Lifecycle, OptimizePreferences,
    OptimizeRequest, OptimizedOrder, Place, RegenerationPolicy, RouteOptimizer, RouteSummary,
    SqliteRepository, StoreRegistry, StoreSettings,
};
use tripweave_shared::{Error, ServiceError};

mod helpers;

struct FixedDirections(Result<RouteSummary, ServiceError>);

#[async_trait::async_trait]
impl Directions for FixedDirections {
    async fn compute_route(
        &self,
        _coordinates: &[Coordinates],
    ) -> Result<RouteSummary, ServiceError> {
        self.0.clone()
    }
}

struct FixedGeocoder;

#[async_trait::async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, query: &str) -> Result<Place, ServiceError> {
        match query {
            "Shillong" => Ok(Place {
                coordinates: Coordinates::new(25.57, 91.88),
                formatted_address: "Shillong, Meghalaya, India".to_owned(),
                place_id: Some("ChIJ-shillong".to_owned()),
            }),
            "Delhi" => Ok(Place {
                coordinates: Coordinates::new(28.61, 77.20),
                formatted_address: "Delhi, India".to_owned(),
                place_id: None,
            }),
            _ => Err(ServiceError::NotFound),
        }
    }
}

struct ReversingOptimizer {
    drop_one: bool,
}

#[async_trait::async_trait]
impl RouteOptimizer for ReversingOptimizer {
    async fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizedOrder, ServiceError> {
        let mut order = (0..request.intermediates.len()).rev().collect::<Vec<_>>();
        if self.drop_one {
            order.pop();
        }

        Ok(OptimizedOrder {
            order,
            rationale: "reverse".to_owned(),
            distance_savings_pct: Some(4.5),
            time_savings_pct: None,
        })
    }
}

async fn registry(dir: &TempDir) -> anyhow::Result<StoreRegistry> {
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;

    Ok(StoreRegistry::new(
        Arc::new(SqliteRepository::new(state)),
        StoreSettings::default(),
    ))
}

#[tokio::test]
async fn test_create_saves_and_caches() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let registry = registry(&dir).await?;

    let store = registry.create("u1", "North-east loop").await?;
    let itinerary = store.snapshot().await;
    let id = itinerary.id.clone().unwrap();
    assert_eq!(store.read(|p| p.lifecycle()).await, Lifecycle::Saved);
    assert_eq!(itinerary.waypoints.len(), 2);

    let again = registry.open(&id).await?;
    assert!(Arc::ptr_eq(&store, &again));
    assert!(registry.repository().find(&id).await?.is_some());
    assert!(matches!(registry.open("missing").await, Err(Error::NotFound)));

    Ok(())
}

#[tokio::test]
async fn test_route_geocode_and_save() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let registry = registry(&dir).await?;
    let store = registry.create("u1", "North-east loop").await?;

    let (start, end) = store
        .read(|p| {
            let waypoints = &p.itinerary().waypoints;
            (waypoints.start().id.to_owned(), waypoints.end().id.to_owned())
        })
        .await;

    assert!(store.geocode_waypoint(&FixedGeocoder, &start, "Delhi").await?);
    assert!(store.geocode_waypoint(&FixedGeocoder, &end, "Shillong").await?);
    assert!(matches!(
        store.geocode_waypoint(&FixedGeocoder, &end, "Atlantis").await,
        Err(Error::Service(ServiceError::NotFound))
    ));

    let directions = FixedDirections(Ok(RouteSummary::new(1800.0, 2200.0)));
    assert!(store.compute_route(&directions).await?);
    assert_eq!(store.snapshot().await.days.len(), 5);

    store.save().await?;
    let id = store.snapshot().await.id.unwrap();
    let stored = registry.repository().find(&id).await?.unwrap();
    assert_eq!(stored.days.len(), 5);
    assert_eq!(
        stored.waypoints.end().address.as_deref(),
        Some("Shillong, Meghalaya, India")
    );

    Ok(())
}

#[tokio::test]
async fn test_failed_route_clears_summary() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let registry = registry(&dir).await?;
    let store = registry.create("u1", "Loop").await?;

    store
        .update(|p| {
            let waypoints = p.itinerary().waypoints.clone();
            p.update_waypoint(
                &waypoints.start().id,
                tripweave_itinerary::WaypointPatch {
                    coordinates: Some(Coordinates::new(19.07, 72.87)),
                    ..Default::default()
                },
            )?;
            p.update_waypoint(
                &waypoints.end().id,
                tripweave_itinerary::WaypointPatch {
                    coordinates: Some(Coordinates::new(15.49, 73.82)),
                    ..Default::default()
                },
            )
        })
        .await?;

    store
        .compute_route(&FixedDirections(Ok(RouteSummary::new(590.0, 660.0))))
        .await?;
    assert!(store.snapshot().await.route_summary.is_some());

    let err = store
        .compute_route(&FixedDirections(Err(ServiceError::NoRoute)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Service(ServiceError::NoRoute)));
    assert!(store.snapshot().await.route_summary.is_none());

    Ok(())
}

#[tokio::test]
async fn test_optimize_rejects_malformed_order() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let registry = registry(&dir).await?;
    let store = registry.create("u1", "Loop").await?;

    store
        .update(|p| {
            let waypoints = p.itinerary().waypoints.clone();
            for (id, coordinates) in [
                (&waypoints.start().id, Coordinates::new(28.61, 77.20)),
                (&waypoints.end().id, Coordinates::new(25.57, 91.88)),
            ] {
                p.update_waypoint(
                    id,
                    tripweave_itinerary::WaypointPatch {
                        coordinates: Some(coordinates),
                        ..Default::default()
                    },
                )?;
            }
            p.add_waypoint("Lucknow", Coordinates::new(26.85, 80.95))?;
            p.add_waypoint("Patna", Coordinates::new(25.59, 85.14))?;
            Ok(())
        })
        .await?;
    let before = store.snapshot().await.waypoints;

    let err = store
        .optimize(
            &ReversingOptimizer { drop_one: true },
            OptimizePreferences::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Service(ServiceError::Malformed(_))));
    assert_eq!(store.snapshot().await.waypoints, before);

    let (applied, optimized) = store
        .optimize(
            &ReversingOptimizer { drop_one: false },
            OptimizePreferences::default(),
        )
        .await?;
    assert!(applied);
    assert_eq!(optimized.order, vec![1, 0]);
    let names = store
        .snapshot()
        .await
        .waypoints
        .iter()
        .map(|w| w.name.to_owned())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["", "Patna", "Lucknow", ""]);

    Ok(())
}

#[tokio::test]
async fn test_delete_closes_store() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let registry = registry(&dir).await?;
    let store = registry.create("u1", "Short lived").await?;
    let id = store.snapshot().await.id.unwrap();

    assert!(registry.delete(&id).await?);
    assert_eq!(store.read(|p| p.lifecycle()).await, Lifecycle::Deleted);
    assert!(matches!(
        store.update(|p| p.set_title("again")).await,
        Err(Error::Deleted)
    ));
    assert!(matches!(registry.open(&id).await, Err(Error::NotFound)));
    assert!(registry.is_empty().await);

    Ok(())
}

#[tokio::test]
async fn test_flush_saves_dirty_stores() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let registry = registry(&dir).await?;
    let idle = registry.create("u1", "Idle").await?;
    let store = registry.create("u1", "Busy").await?;

    let (start, end) = store
        .read(|p| {
            let waypoints = &p.itinerary().waypoints;
            (waypoints.start().id.to_owned(), waypoints.end().id.to_owned())
        })
        .await;
    store.geocode_waypoint(&FixedGeocoder, &start, "Delhi").await?;
    store.geocode_waypoint(&FixedGeocoder, &end, "Shillong").await?;
    assert_eq!(store.read(|p| p.lifecycle()).await, Lifecycle::Dirty);

    assert_eq!(registry.flush().await, 1);
    assert_eq!(store.read(|p| p.lifecycle()).await, Lifecycle::Saved);
    assert_eq!(idle.read(|p| p.lifecycle()).await, Lifecycle::Saved);

    let id = store.snapshot().await.id.unwrap();
    let stored = registry.repository().find(&id).await?.unwrap();
    assert_eq!(stored.waypoints.resolved_count(), 2);
    assert_eq!(registry.flush().await, 0);

    Ok(())
}

fn memory_registry(repository: &Arc<helpers::MemoryRepository>) -> StoreRegistry {
    StoreRegistry::new(
        repository.clone(),
        StoreSettings {
            autosave_delay: Duration::from_secs(600),
            idle_ttl: Duration::from_secs(60),
            ..StoreSettings::default()
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_idle_stores_are_evicted() -> anyhow::Result<()> {
    let repository = Arc::new(helpers::MemoryRepository::default());
    let registry = memory_registry(&repository);

    let mut ids = vec![];
    for i in 0..20 {
        let store = registry.create("u1", &format!("Trip {i}")).await?;
        ids.push(store.snapshot().await.id.unwrap());
    }
    let held = registry.create("u1", "Held").await?;
    let renamed = registry.create("u1", "Draft").await?;
    renamed.update(|p| p.set_title("Renamed")).await?;
    let renamed_id = renamed.snapshot().await.id.unwrap();
    drop(renamed);
    assert_eq!(registry.len().await, 22);

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(registry.evict_idle().await, 0);
    registry.open(&ids[0]).await?;

    tokio::time::advance(Duration::from_secs(40)).await;
    assert_eq!(registry.evict_idle().await, 20);
    assert_eq!(registry.len().await, 2);
    assert_eq!(repository.stored(&renamed_id).unwrap().title, "Renamed");

    // A closed itinerary reopens from storage
    let reopened = registry.open(&ids[5]).await?;
    assert_eq!(reopened.snapshot().await.title, "Trip 5");
    assert_eq!(reopened.read(|p| p.lifecycle()).await, Lifecycle::Saved);

    drop(held);
    tokio::time::advance(Duration::from_secs(61)).await;
    drop(reopened);
    assert_eq!(registry.evict_idle().await, 3);
    assert!(registry.is_empty().await);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_idle_store_with_failing_save_stays_open() -> anyhow::Result<()> {
    let repository = Arc::new(helpers::MemoryRepository::default());
    let registry = memory_registry(&repository);

    let store = registry.create("u1", "Draft").await?;
    store.update(|p| p.set_title("Unsaved")).await?;
    drop(store);

    repository.fail.store(true, Ordering::SeqCst);
    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(registry.evict_idle().await, 0);
    assert_eq!(registry.len().await, 1);

    repository.fail.store(false, Ordering::SeqCst);
    assert_eq!(registry.evict_idle().await, 1);
    assert!(registry.is_empty().await);

    Ok(())
}

#[tokio::test]
async fn test_edited_days_survive_reopen() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let state = helpers::setup_test_state(dir.child("db.sqlite3")).await?;
    let settings = StoreSettings {
        policy: RegenerationPolicy::PreserveEdited,
        ..StoreSettings::default()
    };
    let repository = Arc::new(SqliteRepository::new(state));

    let registry = StoreRegistry::new(repository.clone(), settings.clone());
    let store = registry.create("u1", "North-east loop").await?;
    let id = store.snapshot().await.id.unwrap();
    let (start, end) = store
        .read(|p| {
            let waypoints = &p.itinerary().waypoints;
            (waypoints.start().id.to_owned(), waypoints.end().id.to_owned())
        })
        .await;
    store.geocode_waypoint(&FixedGeocoder, &start, "Delhi").await?;
    store.geocode_waypoint(&FixedGeocoder, &end, "Shillong").await?;
    store
        .compute_route(&FixedDirections(Ok(RouteSummary::new(1800.0, 2200.0))))
        .await?;
    store
        .update(|p| {
            p.set_start_date(Some("2025-11-20"))?;
            p.merge_with_next("day-1")
        })
        .await?;
    store.save().await?;
    drop(store);
    drop(registry);

    // Fresh registry, as after a restart
    let registry = StoreRegistry::new(repository, settings);
    let store = registry.open(&id).await?;
    store
        .compute_route(&FixedDirections(Ok(RouteSummary::new(2400.0, 2900.0))))
        .await?;

    let itinerary = store.snapshot().await;
    assert_eq!(itinerary.days.len(), 4);
    assert!(itinerary.days_edited);
    assert_eq!(itinerary.days[0].date.as_deref(), Some("2025-11-20"));
    assert_eq!(
        store.read(|p| p.options().start_date).await,
        time::macros::date!(2025 - 11 - 20)
    );

    store.update(|p| p.regenerate_days()).await?;
    let itinerary = store.snapshot().await;
    assert_eq!(itinerary.days.len(), 6);
    assert_eq!(itinerary.days[5].date.as_deref(), Some("2025-11-25"));

    Ok(())
}
