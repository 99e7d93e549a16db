//! Read-through price and occupancy lookups.
//!
//! Order of resolution for a `(room, date)` price: cache (primary, then
//! fallback) → persisted `price_cache` row if still fresh → the room's
//! current base price. Occupancy goes cache → occupancy provider. Whatever
//! answers is written back into the cache.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::cache::{CacheKind, CacheWrite, PriceCache};
use crate::domain::{OccupancySnapshot, PriceCacheEntry, RoomId};
use crate::error::PricingError;
use crate::persistence::{OccupancyProvider, PricingStore};

/// Value stored under [`CacheKind::Price`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPrice {
    /// Price for the date.
    pub price: Decimal,
    /// Occupancy behind the price, when it came from the engine.
    pub occupancy_rate: Option<f64>,
    /// Demand score behind the price, when it came from the engine.
    pub demand_score: Option<f64>,
    /// When the value was produced.
    pub cached_at: DateTime<Utc>,
}

impl From<&PriceCacheEntry> for CachedPrice {
    fn from(entry: &PriceCacheEntry) -> Self {
        Self {
            price: entry.cached_price,
            occupancy_rate: Some(entry.occupancy_rate),
            demand_score: Some(entry.demand_score),
            cached_at: entry.cached_at,
        }
    }
}

/// Where a quoted price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Primary or fallback cache.
    Cache,
    /// Persisted `price_cache` row.
    PriceTable,
    /// The room's current base price.
    Room,
}

/// A room's price for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceQuote {
    /// Room identifier.
    pub room_id: RoomId,
    /// Date quoted.
    pub date: NaiveDate,
    /// Price.
    pub price: Decimal,
    /// Occupancy rate behind the price, if known.
    pub occupancy_rate: Option<f64>,
    /// Demand score behind the price, if known.
    pub demand_score: Option<f64>,
    /// Resolution tier that answered.
    pub source: PriceSource,
}

impl PriceQuote {
    fn new(room_id: RoomId, date: NaiveDate, cached: CachedPrice, source: PriceSource) -> Self {
        Self {
            room_id,
            date,
            price: cached.price,
            occupancy_rate: cached.occupancy_rate,
            demand_score: cached.demand_score,
            source,
        }
    }
}

/// Serves current prices and occupancy through the cache.
#[derive(Debug)]
pub struct PriceLookupService {
    store: Arc<dyn PricingStore>,
    occupancy: Arc<dyn OccupancyProvider>,
    cache: Arc<PriceCache>,
}

impl PriceLookupService {
    /// Creates a lookup service.
    #[must_use]
    pub fn new(
        store: Arc<dyn PricingStore>,
        occupancy: Arc<dyn OccupancyProvider>,
        cache: Arc<PriceCache>,
    ) -> Self {
        Self {
            store,
            occupancy,
            cache,
        }
    }

    /// Occupancy snapshot for one room and date.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::RoomNotFound`] when no occupancy can be
    /// derived, or the provider's error.
    pub async fn occupancy(
        &self,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<OccupancySnapshot, PricingError> {
        let subject = room_id.to_string();
        if let Some(snapshot) = self
            .cache
            .get::<OccupancySnapshot>(CacheKind::Occupancy, &subject, date)
            .await
        {
            return Ok(snapshot);
        }
        let snapshot = self
            .occupancy
            .occupancy(room_id, date)
            .await?
            .ok_or(PricingError::RoomNotFound(room_id))?;
        self.cache
            .set(CacheKind::Occupancy, &subject, date, &snapshot)
            .await;
        Ok(snapshot)
    }

    /// Price for one room and date.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::RoomNotFound`] if nothing is cached and the
    /// room does not exist, or a persistence error from the store.
    pub async fn current_price(
        &self,
        room_id: RoomId,
        date: NaiveDate,
    ) -> Result<PriceQuote, PricingError> {
        let subject = room_id.to_string();
        if let Some(cached) = self
            .cache
            .get::<CachedPrice>(CacheKind::Price, &subject, date)
            .await
        {
            return Ok(PriceQuote::new(room_id, date, cached, PriceSource::Cache));
        }

        let (cached, source) = self.resolve_uncached(room_id, date, Utc::now()).await?;
        self.cache
            .set(CacheKind::Price, &subject, date, &cached)
            .await;
        Ok(PriceQuote::new(room_id, date, cached, source))
    }

    /// Prices for many rooms on one date. Rooms that do not exist are
    /// left out of the result.
    ///
    /// # Errors
    ///
    /// Returns a persistence error from the store.
    pub async fn current_prices(
        &self,
        room_ids: &[RoomId],
        date: NaiveDate,
    ) -> Result<Vec<PriceQuote>, PricingError> {
        let subjects: Vec<String> = room_ids.iter().map(ToString::to_string).collect();
        let mut hits: HashMap<String, Option<CachedPrice>> = self
            .cache
            .get_batch(CacheKind::Price, &subjects, date)
            .await;

        let now = Utc::now();
        let mut quotes = Vec::with_capacity(room_ids.len());
        let mut writes = Vec::new();
        for (room_id, subject) in room_ids.iter().zip(subjects) {
            if let Some(Some(cached)) = hits.remove(&subject) {
                quotes.push(PriceQuote::new(*room_id, date, cached, PriceSource::Cache));
                continue;
            }
            match self.resolve_uncached(*room_id, date, now).await {
                Ok((cached, source)) => {
                    quotes.push(PriceQuote::new(*room_id, date, cached.clone(), source));
                    writes.push(CacheWrite {
                        kind: CacheKind::Price,
                        subject,
                        date,
                        value: cached,
                    });
                }
                Err(PricingError::RoomNotFound(_)) => {
                    tracing::debug!(%room_id, "room not found, omitted from batch quote");
                }
                Err(err) => return Err(err),
            }
        }
        if !writes.is_empty() {
            self.cache.set_batch(&writes).await;
        }
        Ok(quotes)
    }

    async fn resolve_uncached(
        &self,
        room_id: RoomId,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(CachedPrice, PriceSource), PricingError> {
        if let Some(entry) = self.store.price_cache_entry(room_id, date).await?
            && !entry.is_stale(now)
        {
            return Ok((CachedPrice::from(&entry), PriceSource::PriceTable));
        }
        let room = self
            .store
            .load_room(room_id)
            .await?
            .ok_or(PricingError::RoomNotFound(room_id))?;
        Ok((
            CachedPrice {
                price: room.base_price,
                occupancy_rate: None,
                demand_score: None,
                cached_at: now,
            },
            PriceSource::Room,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use crate::cache::{CacheTtls, FailingBackend, MemoryBackend};
    use crate::domain::RoomPricingState;
    use crate::persistence::MemoryStore;

    fn setup(primary_up: bool) -> (Arc<MemoryStore>, Arc<PriceCache>, PriceLookupService) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(PriceCache::new(
            if primary_up {
                Arc::new(MemoryBackend::new())
            } else {
                Arc::new(FailingBackend)
            },
            "test",
            CacheTtls::default(),
            1000,
        ));
        let service = PriceLookupService::new(
            Arc::clone(&store) as Arc<dyn PricingStore>,
            Arc::clone(&store) as Arc<dyn OccupancyProvider>,
            Arc::clone(&cache),
        );
        (store, cache, service)
    }

    fn room(price: Decimal) -> RoomPricingState {
        RoomPricingState {
            room_id: RoomId::new(),
            name: "Deluxe".into(),
            base_price: price,
            price_per_night: None,
            min_auto_price: None,
            max_auto_price: None,
            auto_pricing_enabled: true,
        }
    }

    #[tokio::test]
    async fn miss_reads_room_then_serves_from_cache() {
        let (store, _cache, service) = setup(true);
        let r = room(dec!(500000));
        store.put_room(r.clone());
        let today = Utc::now().date_naive();

        let Ok(first) = service.current_price(r.room_id, today).await else {
            panic!("lookup failed");
        };
        assert_eq!(first.source, PriceSource::Room);
        assert_eq!(first.price, dec!(500000));

        // Room changes underneath; cached answer still wins.
        let mut changed = r.clone();
        changed.base_price = dec!(600000);
        store.put_room(changed);
        let Ok(second) = service.current_price(r.room_id, today).await else {
            panic!("lookup failed");
        };
        assert_eq!(second.source, PriceSource::Cache);
        assert_eq!(second.price, dec!(500000));
    }

    #[tokio::test]
    async fn fresh_price_table_row_beats_room_price() {
        let (store, _cache, service) = setup(true);
        let r = room(dec!(500000));
        store.put_room(r.clone());
        let now = Utc::now();
        let entry = PriceCacheEntry::new(r.room_id, dec!(560000), 80.0, 8.0, now, Duration::minutes(15));
        let _ = store.upsert_price_cache(&entry).await;

        let Ok(quote) = service.current_price(r.room_id, now.date_naive()).await else {
            panic!("lookup failed");
        };
        assert_eq!(quote.source, PriceSource::PriceTable);
        assert_eq!(quote.price, dec!(560000));
        assert_eq!(quote.occupancy_rate, Some(80.0));
    }

    #[tokio::test]
    async fn stale_price_table_row_is_ignored() {
        let (store, _cache, service) = setup(true);
        let r = room(dec!(500000));
        store.put_room(r.clone());
        let earlier = Utc::now() - Duration::minutes(20);
        let entry = PriceCacheEntry::new(r.room_id, dec!(560000), 80.0, 8.0, earlier, Duration::minutes(15));
        let _ = store.upsert_price_cache(&entry).await;

        let Ok(quote) = service.current_price(r.room_id, entry.date).await else {
            panic!("lookup failed");
        };
        assert_eq!(quote.source, PriceSource::Room);
    }

    #[tokio::test]
    async fn occupancy_is_read_through_the_cache() {
        let (store, _cache, service) = setup(true);
        let r = room(dec!(500000));
        store.put_room(r.clone());
        let today = Utc::now().date_naive();
        store.put_occupancy(OccupancySnapshot {
            room_id: r.room_id,
            date: today,
            total_allotment: 8,
            booked_units: 6,
            available_units: 2,
            occupancy_rate: 75.0,
            demand_score: 7.5,
        });

        let Ok(first) = service.occupancy(r.room_id, today).await else {
            panic!("occupancy lookup failed");
        };
        assert_eq!(first.booked_units, 6);

        // Provider now fails; the cached snapshot still answers.
        store.fail_occupancy_for(r.room_id);
        let Ok(second) = service.occupancy(r.room_id, today).await else {
            panic!("cached occupancy missing");
        };
        assert_eq!(second, first);

        assert!(matches!(
            service.occupancy(RoomId::new(), today).await,
            Err(PricingError::RoomNotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let (_store, _cache, service) = setup(true);
        let result = service.current_price(RoomId::new(), Utc::now().date_naive()).await;
        assert!(matches!(result, Err(PricingError::RoomNotFound(_))));
    }

    #[tokio::test]
    async fn batch_lookup_mixes_hits_misses_and_unknown_rooms() {
        let (store, cache, service) = setup(false);
        let a = room(dec!(300000));
        let b = room(dec!(400000));
        store.put_room(a.clone());
        store.put_room(b.clone());
        let today = Utc::now().date_naive();
        cache
            .set(
                CacheKind::Price,
                &a.room_id.to_string(),
                today,
                &CachedPrice {
                    price: dec!(330000),
                    occupancy_rate: Some(72.0),
                    demand_score: Some(7.2),
                    cached_at: Utc::now(),
                },
            )
            .await;

        let Ok(quotes) = service
            .current_prices(&[a.room_id, b.room_id, RoomId::new()], today)
            .await
        else {
            panic!("batch lookup failed");
        };
        assert_eq!(quotes.len(), 2);
        let sources: Vec<_> = quotes.iter().map(|q| (q.price, q.source)).collect();
        assert_eq!(
            sources,
            vec![
                (dec!(330000), PriceSource::Cache),
                (dec!(400000), PriceSource::Room)
            ]
        );

        // The miss was written back and now hits.
        let Ok(again) = service.current_price(b.room_id, today).await else {
            panic!("lookup failed");
        };
        assert_eq!(again.source, PriceSource::Cache);
    }
}
