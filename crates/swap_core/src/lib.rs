mod checks;
pub mod casing;
mod grid;
mod models;
pub mod wire;

pub use crate::checks::{assignable_batteries, is_assignable};
pub use crate::grid::{DEFAULT_COLUMNS, DEFAULT_ROWS, PillarGrid, derive_grid};
pub use crate::models::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Malformed response: {detail}")]
    MalformedResponse { detail: String },
    #[error("{message}")]
    AssignmentRejected { message: String },
    #[error("{message}")]
    RemovalRejected { message: String },
    #[error("Slot {slot_id} is not part of the loaded grid")]
    SlotNotFound { slot_id: String },
}

/// What the cached grid was loaded with, reused for re-fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridQuery {
    pub pillar_id: String,
    pub rows: u32,
    pub columns: u32,
}

/// Handed out when a load starts; only the most recent one may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone)]
struct CachedGrid {
    query: GridQuery,
    grid: PillarGrid,
}

/// The single active pillar grid shown by a view.
#[derive(Debug, Clone, Default)]
pub struct GridCache {
    active: Option<CachedGrid>,
    generation: u64,
}

impl GridCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_grid(&self) -> Option<&PillarGrid> {
        self.active.as_ref().map(|cached| &cached.grid)
    }

    pub fn get_query(&self) -> Option<&GridQuery> {
        self.active.as_ref().map(|cached| &cached.query)
    }

    /// Start a load. Any load or clear issued afterwards supersedes it.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket(self.generation)
    }

    /// Replace the cached grid wholesale with the result of `ticket`'s load.
    ///
    /// Returns `false` and leaves the cache untouched when a newer load or a
    /// clear was issued while this one was in flight. A newer load supersedes
    /// this one even if it later fails, so the cache then keeps the grid it
    /// had before both loads.
    pub fn apply(&mut self, ticket: LoadTicket, query: GridQuery, grid: PillarGrid) -> bool {
        if ticket.0 != self.generation {
            tracing::debug!(
                "Discarding grid for pillar {} from superseded load",
                query.pillar_id
            );
            return false;
        }
        tracing::info!(
            "Caching grid for pillar {} ({} slots)",
            query.pillar_id,
            grid.grid_layout.total_slots
        );
        self.active = Some(CachedGrid { query, grid });
        true
    }

    pub fn clear(&mut self) {
        tracing::info!("Clearing cached pillar grid");
        self.generation += 1;
        self.active = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::fixtures::payload;

    fn query(pillar_id: &str) -> GridQuery {
        GridQuery {
            pillar_id: pillar_id.into(),
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
        }
    }

    fn grid_for(pillar_id: &str) -> PillarGrid {
        let mut payload = payload();
        payload.pillar.id = pillar_id.into();
        derive_grid(payload, DEFAULT_ROWS, DEFAULT_COLUMNS).expect("Could not derive the grid")
    }

    #[test]
    fn test_apply_replaces_previous_pillar() {
        let mut cache = GridCache::new();
        let ticket = cache.begin_load();
        assert!(cache.apply(ticket, query("PILLAR-1"), grid_for("PILLAR-1")));
        assert_eq!(cache.get_grid().map(|g| g.pillar_id()), Some("PILLAR-1"));

        let ticket = cache.begin_load();
        assert!(cache.apply(ticket, query("PILLAR-2"), grid_for("PILLAR-2")));
        assert_eq!(cache.get_grid().map(|g| g.pillar_id()), Some("PILLAR-2"));
        assert_eq!(cache.get_query(), Some(&query("PILLAR-2")));
    }

    #[test]
    fn test_superseded_load_is_discarded() {
        let mut cache = GridCache::new();
        let first = cache.begin_load();
        let second = cache.begin_load();

        assert!(cache.apply(second, query("PILLAR-2"), grid_for("PILLAR-2")));
        // The first load completes last but was issued first
        assert!(!cache.apply(first, query("PILLAR-1"), grid_for("PILLAR-1")));
        assert_eq!(cache.get_grid().map(|g| g.pillar_id()), Some("PILLAR-2"));
    }

    #[test]
    fn test_clear_discards_in_flight_load() {
        let mut cache = GridCache::new();
        let ticket = cache.begin_load();
        cache.clear();
        assert!(!cache.apply(ticket, query("PILLAR-1"), grid_for("PILLAR-1")));
        assert!(cache.get_grid().is_none());
        assert!(cache.get_query().is_none());
    }

    #[test]
    fn test_failed_load_keeps_cache() {
        let mut cache = GridCache::new();
        let ticket = cache.begin_load();
        cache.apply(ticket, query("PILLAR-1"), grid_for("PILLAR-1"));

        // A load that never applies leaves the cached grid in place
        let _abandoned = cache.begin_load();
        assert_eq!(cache.get_grid().map(|g| g.pillar_id()), Some("PILLAR-1"));
    }

    #[test]
    fn test_failed_newer_load_still_supersedes_older() {
        let mut cache = GridCache::new();
        let ticket = cache.begin_load();
        cache.apply(ticket, query("PILLAR-1"), grid_for("PILLAR-1"));

        let older = cache.begin_load();
        let _failed = cache.begin_load();
        assert!(!cache.apply(older, query("PILLAR-2"), grid_for("PILLAR-2")));
        assert_eq!(cache.get_grid().map(|g| g.pillar_id()), Some("PILLAR-1"));
        assert_eq!(cache.get_query(), Some(&query("PILLAR-1")));
    }
}
