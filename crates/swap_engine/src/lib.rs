//! Pillar grid manager.
//!
//! Keeps one pillar's slot grid cached and render-ready. Mutations are never
//! patched into the cache locally: after the backend accepts an assignment or
//! removal, the grid is fetched again so slot statistics and battery/slot
//! references always come from the server.

mod backend;

pub use crate::backend::PillarBackend;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use swap_client::{ApiError, ErrorBody};
use swap_core::wire::{MutationAck, PillarDetail};
use swap_core::{GridCache, GridError, GridQuery, Pillar, PillarGrid, derive_grid};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The backend applied the mutation but the grid could not be reloaded.
    #[error("{message}, but the grid could not be refreshed: {source}")]
    RefreshFailed {
        message: String,
        #[source]
        source: Box<ManagerError>,
    },
}

impl ManagerError {
    pub fn body(&self) -> ErrorBody {
        match self {
            ManagerError::Api(error) => error.body(),
            _ => ErrorBody {
                message: self.to_string(),
                errors: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    /// Backend confirmation message.
    pub message: String,
    /// The re-fetched grid, or `None` when no grid was loaded.
    pub grid: Option<PillarGrid>,
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Assign,
    Remove,
}

impl Mutation {
    fn rejected(self, error: ApiError) -> ManagerError {
        match error {
            ApiError::BadRequest { message, .. } => {
                tracing::warn!("{:?} rejected by backend: {}", self, message);
                let rejected = match self {
                    Mutation::Assign => GridError::AssignmentRejected { message },
                    Mutation::Remove => GridError::RemovalRejected { message },
                };
                ManagerError::Grid(rejected)
            }
            ApiError::MalformedResponse { detail } => {
                ManagerError::Grid(GridError::MalformedResponse { detail })
            }
            other => ManagerError::Api(other),
        }
    }
}

#[derive(Clone)]
pub struct PillarGridManager<B> {
    backend: B,
    cache: Arc<Mutex<GridCache>>,
}

impl<B: PillarBackend> PillarGridManager<B> {
    pub fn new(backend: B) -> Self {
        PillarGridManager {
            backend,
            cache: Arc::new(Mutex::new(GridCache::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GridCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the cached grid.
    pub fn grid(&self) -> Option<PillarGrid> {
        self.lock().get_grid().cloned()
    }

    /// Fetch a pillar's slots, derive its grid and replace the cache with it.
    ///
    /// On any failure the cache keeps its previous content. A result that
    /// arrives after a newer load or a [`clear_grid`](Self::clear_grid) is
    /// returned but not cached.
    pub async fn load_grid(
        &self,
        pillar_id: &str,
        rows: u32,
        columns: u32,
    ) -> Result<PillarGrid, ManagerError> {
        tracing::info!("Loading grid for pillar {} ({}x{})", pillar_id, rows, columns);
        let ticket = self.lock().begin_load();

        let payload = self
            .backend
            .fetch_grid(pillar_id, rows, columns)
            .await
            .map_err(|error| match error {
                ApiError::MalformedResponse { detail } => {
                    ManagerError::Grid(GridError::MalformedResponse { detail })
                }
                other => ManagerError::Api(other),
            })?;

        let grid = derive_grid(payload, rows, columns).inspect_err(|error| {
            tracing::warn!("Discarding grid for pillar {}: {}", pillar_id, error);
        })?;

        let query = GridQuery {
            pillar_id: pillar_id.to_string(),
            rows,
            columns,
        };
        self.lock().apply(ticket, query, grid.clone());
        Ok(grid)
    }

    pub async fn assign_battery(
        &self,
        battery_id: &str,
        slot_id: &str,
    ) -> Result<MutationOutcome, ManagerError> {
        tracing::info!("Assigning battery {} to slot {}", battery_id, slot_id);
        let ack = self
            .backend
            .assign_battery(battery_id, slot_id)
            .await
            .map_err(|error| Mutation::Assign.rejected(error))?;
        self.refresh_after(ack).await
    }

    pub async fn remove_battery(&self, slot_id: &str) -> Result<MutationOutcome, ManagerError> {
        tracing::info!("Removing battery from slot {}", slot_id);
        let ack = self
            .backend
            .remove_battery(slot_id)
            .await
            .map_err(|error| Mutation::Remove.rejected(error))?;
        self.refresh_after(ack).await
    }

    /// Drop the cached grid. Loads still in flight will not repopulate it.
    pub fn clear_grid(&self) {
        self.lock().clear();
    }

    pub async fn station_pillars(&self, station_id: &str) -> Result<Vec<Pillar>, ManagerError> {
        tracing::info!("Listing pillars of station {}", station_id);
        Ok(self.backend.fetch_station_pillars(station_id).await?)
    }

    pub async fn pillar_detail(&self, pillar_id: &str) -> Result<PillarDetail, ManagerError> {
        tracing::info!("Fetching pillar {}", pillar_id);
        Ok(self.backend.fetch_pillar(pillar_id).await?)
    }

    async fn refresh_after(&self, ack: MutationAck) -> Result<MutationOutcome, ManagerError> {
        let query = self.lock().get_query().cloned();
        let Some(query) = query else {
            return Ok(MutationOutcome {
                message: ack.message,
                grid: None,
            });
        };

        match self
            .load_grid(&query.pillar_id, query.rows, query.columns)
            .await
        {
            Ok(grid) => Ok(MutationOutcome {
                message: ack.message,
                grid: Some(grid),
            }),
            Err(source) => Err(ManagerError::RefreshFailed {
                message: ack.message,
                source: Box::new(source),
            }),
        }
    }
}
