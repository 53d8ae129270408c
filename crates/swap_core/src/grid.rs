use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{GridLayout, Pillar, Slot, SlotPosition, SlotStats};
use crate::wire::PillarGridPayload;
use crate::GridError;

pub const DEFAULT_ROWS: u32 = 2;
pub const DEFAULT_COLUMNS: u32 = 5;
/// Upper bound on `rows * columns` of a derived grid.
pub const MAX_GRID_CELLS: usize = 4096;

/// 0-based (row, column)
type Cell = (usize, usize);

/// Render-ready view of one pillar's slots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PillarGrid {
    pub pillar: Pillar,
    pub grid_layout: GridLayout,
    pub grid: Vec<Vec<Option<Slot>>>,
    pub slots_list: Vec<Slot>,
}

impl PillarGrid {
    pub fn pillar_id(&self) -> &str {
        &self.pillar.id
    }

    pub fn stats(&self) -> SlotStats {
        self.pillar.slot_stats
    }

    pub fn slot(&self, slot_id: &str) -> Option<&Slot> {
        self.slots_list.iter().find(|slot| slot.id == slot_id)
    }

    pub fn slot_by_number(&self, slot_number: u32) -> Option<&Slot> {
        self.slots_list
            .iter()
            .find(|slot| slot.slot_number == slot_number)
    }

    /// Slot displayed at a 1-based grid position.
    pub fn slot_at(&self, position: SlotPosition) -> Option<&Slot> {
        let row = (position.row as usize).checked_sub(1)?;
        let column = (position.column as usize).checked_sub(1)?;
        self.grid.get(row)?.get(column)?.as_ref()
    }

    /// The slot currently holding `battery_id`, if any.
    pub fn holder_of(&self, battery_id: &str) -> Option<&Slot> {
        self.slots_list
            .iter()
            .find(|slot| slot.holds_battery(battery_id))
    }
}

/// Build the cached grid from a backend grid payload.
///
/// The flat `slotsList` is authoritative; the server's own `grid` field is
/// only required to be present.
pub fn derive_grid(
    payload: PillarGridPayload,
    rows_hint: u32,
    columns_hint: u32,
) -> Result<PillarGrid, GridError> {
    let PillarGridPayload {
        mut pillar,
        grid_layout,
        slots_list,
        ..
    } = payload;

    ensure_unique_slots(&slots_list)?;
    if slots_list.len() > MAX_GRID_CELLS {
        return Err(GridError::MalformedResponse {
            detail: format!("pillar reports {} slots", slots_list.len()),
        });
    }

    let columns = resolve_columns(&grid_layout, columns_hint, slots_list.len());
    let base_rows = resolve_rows(&grid_layout, rows_hint, slots_list.len(), columns);

    let cells = place_slots(&slots_list, columns, base_rows.max(slots_list.len()));
    let rows = cells
        .iter()
        .map(|(row, _)| row + 1)
        .max()
        .unwrap_or(0)
        .max(base_rows);
    if rows.saturating_mul(columns) > MAX_GRID_CELLS {
        return Err(GridError::MalformedResponse {
            detail: format!("grid of {rows}x{columns} cells is too large"),
        });
    }

    let mut grid: Vec<Vec<Option<Slot>>> = vec![vec![None; columns]; rows];
    for (slot, (row, column)) in slots_list.iter().zip(cells) {
        grid[row][column] = Some(slot.clone());
    }

    reconcile_stats(&mut pillar, &slots_list);
    report_occupancy_mismatches(&pillar, &slots_list);

    Ok(PillarGrid {
        pillar,
        grid_layout: GridLayout {
            rows: rows as u32,
            columns: columns as u32,
            total_slots: slots_list.len() as u32,
        },
        grid,
        slots_list,
    })
}

fn ensure_unique_slots(slots: &[Slot]) -> Result<(), GridError> {
    let mut seen = HashSet::new();
    for slot in slots {
        if !seen.insert(slot.id.as_str()) {
            return Err(GridError::MalformedResponse {
                detail: format!("slot {} appears more than once in slotsList", slot.id),
            });
        }
    }
    Ok(())
}

/// Server width, else the hint, else the default; never wider than the
/// pillar could fill.
fn resolve_columns(layout: &GridLayout, columns_hint: u32, slot_count: usize) -> usize {
    let requested = [layout.columns, columns_hint, DEFAULT_COLUMNS]
        .into_iter()
        .find(|columns| *columns > 0)
        .unwrap_or(DEFAULT_COLUMNS) as usize;
    let limit = slot_count.max(DEFAULT_COLUMNS as usize);
    if requested > limit {
        tracing::warn!(
            "Requested {} columns for {} slots, using {}",
            requested,
            slot_count,
            limit
        );
    }
    requested.min(limit)
}

/// Server rows, else the hint, else the default; rows beyond what the
/// slots need are dropped.
fn resolve_rows(layout: &GridLayout, rows_hint: u32, slot_count: usize, columns: usize) -> usize {
    let requested = [layout.rows, rows_hint, DEFAULT_ROWS]
        .into_iter()
        .find(|rows| *rows > 0)
        .unwrap_or(DEFAULT_ROWS) as usize;
    let limit = slot_count
        .div_ceil(columns.max(1))
        .max(DEFAULT_ROWS as usize);
    requested.min(limit)
}

fn requested_cell(slot: &Slot, columns: usize, max_rows: usize) -> Option<Cell> {
    let position = slot.position?;
    let row = (position.row as usize).checked_sub(1)?;
    let column = (position.column as usize).checked_sub(1)?;
    (row < max_rows && column < columns).then_some((row, column))
}

fn first_free_cell(taken: &HashSet<Cell>, columns: usize) -> Cell {
    (0..)
        .map(|index| (index / columns, index % columns))
        .find(|cell| !taken.contains(cell))
        .unwrap_or((0, 0))
}

/// Assign every slot exactly one distinct cell.
///
/// Server positions win; slots without a usable position take
/// `index / columns, index % columns`, or the first free cell when that one
/// is already claimed.
fn place_slots(slots: &[Slot], columns: usize, max_rows: usize) -> Vec<Cell> {
    let mut taken: HashSet<Cell> = HashSet::new();
    let claimed: Vec<Option<Cell>> = slots
        .iter()
        .map(|slot| {
            let cell = requested_cell(slot, columns, max_rows)?;
            if taken.insert(cell) {
                Some(cell)
            } else {
                tracing::warn!(
                    "Slot {} shares position {:?} with another slot, relocating",
                    slot.id,
                    slot.position
                );
                None
            }
        })
        .collect();

    claimed
        .into_iter()
        .enumerate()
        .map(|(index, cell)| {
            cell.unwrap_or_else(|| {
                let fallback = (index / columns, index % columns);
                let cell = if taken.contains(&fallback) {
                    first_free_cell(&taken, columns)
                } else {
                    fallback
                };
                taken.insert(cell);
                cell
            })
        })
        .collect()
}

fn reconcile_stats(pillar: &mut Pillar, slots: &[Slot]) {
    let counted = SlotStats::from_slots(slots);
    if !pillar.slot_stats.is_consistent() || pillar.slot_stats.total != counted.total {
        tracing::warn!(
            "Pillar {} reported slot stats {:?}, recomputed {:?} from its slots",
            pillar.id,
            pillar.slot_stats,
            counted
        );
        pillar.slot_stats = counted;
    }
    pillar.total_slots = pillar.slot_stats.total;
}

fn report_occupancy_mismatches(pillar: &Pillar, slots: &[Slot]) {
    for slot in slots.iter().filter(|slot| !slot.occupancy_matches()) {
        tracing::warn!(
            "Pillar {} slot {} is {} but battery present = {}",
            pillar.id,
            slot.id,
            slot.status,
            slot.battery.is_some()
        );
    }
}
