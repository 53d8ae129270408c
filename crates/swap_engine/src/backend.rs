use std::future::Future;

use swap_client::{ApiClient, ApiError};
use swap_core::Pillar;
use swap_core::wire::{MutationAck, PillarDetail, PillarGridPayload};

/// The backend calls the grid manager depends on.
pub trait PillarBackend: Send + Sync {
    fn fetch_grid(
        &self,
        pillar_id: &str,
        rows: u32,
        columns: u32,
    ) -> impl Future<Output = Result<PillarGridPayload, ApiError>> + Send;

    fn fetch_station_pillars(
        &self,
        station_id: &str,
    ) -> impl Future<Output = Result<Vec<Pillar>, ApiError>> + Send;

    fn fetch_pillar(
        &self,
        pillar_id: &str,
    ) -> impl Future<Output = Result<PillarDetail, ApiError>> + Send;

    fn assign_battery(
        &self,
        battery_id: &str,
        slot_id: &str,
    ) -> impl Future<Output = Result<MutationAck, ApiError>> + Send;

    fn remove_battery(
        &self,
        slot_id: &str,
    ) -> impl Future<Output = Result<MutationAck, ApiError>> + Send;
}

impl PillarBackend for ApiClient {
    async fn fetch_grid(
        &self,
        pillar_id: &str,
        rows: u32,
        columns: u32,
    ) -> Result<PillarGridPayload, ApiError> {
        self.get_pillar_grid(pillar_id, rows, columns).await
    }

    async fn fetch_station_pillars(&self, station_id: &str) -> Result<Vec<Pillar>, ApiError> {
        self.get_station_pillars(station_id).await
    }

    async fn fetch_pillar(&self, pillar_id: &str) -> Result<PillarDetail, ApiError> {
        self.get_pillar(pillar_id).await
    }

    async fn assign_battery(&self, battery_id: &str, slot_id: &str) -> Result<MutationAck, ApiError> {
        ApiClient::assign_battery(self, battery_id, slot_id).await
    }

    async fn remove_battery(&self, slot_id: &str) -> Result<MutationAck, ApiError> {
        ApiClient::remove_battery(self, slot_id).await
    }
}
