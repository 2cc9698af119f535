#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqliteConnectOptions};
use tripweave_itinerary::{
    Coordinates, Itinerary, ItineraryRepository, ItinerarySummary, Persisted, WaypointList,
};
use tripweave_shared::{Error, Result, State};

pub async fn setup_test_state(path: PathBuf) -> anyhow::Result<State> {
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.to_string_lossy()))?
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;
    tripweave_db::migrate(&pool).await?;

    Ok(State::single(pool))
}

pub fn delhi_to_shillong() -> WaypointList {
    WaypointList::with_endpoints(
        ("Delhi", Coordinates::new(28.61, 77.20)),
        ("Shillong", Coordinates::new(25.57, 91.88)),
    )
}

/// In-memory repository that records how saves were issued.
#[derive(Default)]
pub struct MemoryRepository {
    pub rows: Mutex<HashMap<String, Itinerary>>,
    pub writes: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub fail: AtomicBool,
    pub delay: Duration,
    next_id: AtomicUsize,
}

impl MemoryRepository {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn insert(&self, mut itinerary: Itinerary) -> String {
        let id = format!("it-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        itinerary.id = Some(id.to_owned());
        itinerary.created_at = Some(1);
        itinerary.updated_at = Some(1);
        self.rows.lock().unwrap().insert(id.to_owned(), itinerary);
        id
    }

    pub fn stored(&self, id: &str) -> Option<Itinerary> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn write(&self, itinerary: &Itinerary, id: String) -> Result<Persisted> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Server("storage unavailable".to_owned()));
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut stored = itinerary.clone();
        stored.id = Some(id.to_owned());
        self.rows.lock().unwrap().insert(id.to_owned(), stored);

        Ok(Persisted {
            id,
            created_at: 1,
            updated_at: 2,
        })
    }
}

#[async_trait::async_trait]
impl ItineraryRepository for MemoryRepository {
    async fn create(&self, itinerary: &Itinerary) -> Result<Persisted> {
        let id = format!("it-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.write(itinerary, id).await
    }

    async fn update(&self, itinerary: &Itinerary) -> Result<Persisted> {
        let id = itinerary.id.to_owned().ok_or(Error::NotFound)?;
        self.write(itinerary, id).await
    }

    async fn find(&self, id: &str) -> Result<Option<Itinerary>> {
        Ok(self.stored(id))
    }

    async fn find_by_share_slug(&self, slug: &str) -> Result<Option<Itinerary>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|it| it.public_slug() == Some(slug))
            .cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<ItinerarySummary>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|it| it.user_id == user_id)
            .map(|it| ItinerarySummary {
                id: it.id.clone().unwrap_or_default(),
                title: it.title.to_owned(),
                is_public: it.is_public,
                share_slug: it.share_slug.to_owned(),
                created_at: it.created_at.unwrap_or_default(),
                updated_at: it.updated_at.unwrap_or_default(),
            })
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.rows.lock().unwrap().remove(id).is_some())
    }
}
