//! swapctl: staff console for battery-swap pillars.
//!
//! Each command runs against a [`PillarGridManager`](swap_engine::PillarGridManager)
//! built from the console configuration.

pub mod app_state;
pub mod config;
pub mod render;

use chrono::Utc;
use clap::Subcommand;
use swap_client::ApiError;
use swap_engine::ManagerError;

use crate::app_state::AppState;
use crate::render::OutputFormat;

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the slot grid of a pillar
    Grid {
        pillar_id: String,
        #[arg(long)]
        rows: Option<u32>,
        #[arg(long)]
        columns: Option<u32>,
    },
    /// List the pillars of a station
    Pillars { station_id: String },
    /// Show a pillar with its slots and batteries
    Pillar { pillar_id: String },
    /// Put a battery into an empty slot
    Assign {
        #[arg(long)]
        pillar: String,
        battery_id: String,
        slot_id: String,
    },
    /// Take the battery out of a slot
    Remove {
        #[arg(long)]
        pillar: String,
        slot_id: String,
    },
}

/// Run one command and return what should be printed.
pub async fn run(state: &AppState, command: Command, format: OutputFormat) -> anyhow::Result<String> {
    let manager = &state.manager;
    let now = Utc::now();

    match command {
        Command::Grid {
            pillar_id,
            rows,
            columns,
        } => {
            let (rows, columns) = state.config.grid.resolve(rows, columns);
            let grid = manager.load_grid(&pillar_id, rows, columns).await?;
            format.grid(&grid, now)
        }
        Command::Pillars { station_id } => {
            let pillars = manager.station_pillars(&station_id).await?;
            format.pillars(&pillars)
        }
        Command::Pillar { pillar_id } => {
            let detail = manager.pillar_detail(&pillar_id).await?;
            format.detail(&detail, now)
        }
        Command::Assign {
            pillar,
            battery_id,
            slot_id,
        } => {
            let (rows, columns) = state.config.grid.resolve(None, None);
            let grid = manager.load_grid(&pillar, rows, columns).await?;
            grid.check_assignment(&battery_id, &slot_id, now)?;
            let outcome = manager.assign_battery(&battery_id, &slot_id).await?;
            format.outcome(&outcome, now)
        }
        Command::Remove { pillar, slot_id } => {
            let (rows, columns) = state.config.grid.resolve(None, None);
            let grid = manager.load_grid(&pillar, rows, columns).await?;
            grid.check_removal(&slot_id)?;
            let outcome = manager.remove_battery(&slot_id).await?;
            format.outcome(&outcome, now)
        }
    }
}

/// Whether a command failed because the backend no longer accepts the token.
pub fn is_session_expired(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<ManagerError>() {
        Some(ManagerError::Api(ApiError::Unauthorized { .. })) => true,
        Some(ManagerError::RefreshFailed { source, .. }) => {
            matches!(**source, ManagerError::Api(ApiError::Unauthorized { .. }))
        }
        _ => false,
    }
}
