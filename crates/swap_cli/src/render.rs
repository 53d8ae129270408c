//! Text and JSON output for console commands.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use swap_core::wire::PillarDetail;
use swap_core::{Pillar, PillarGrid, Slot, SlotStats, SlotStatus};
use swap_engine::MutationOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn grid(self, grid: &PillarGrid, now: DateTime<Utc>) -> anyhow::Result<String> {
        match self {
            OutputFormat::Text => Ok(render_grid(grid, now)),
            OutputFormat::Json => json(grid),
        }
    }

    pub fn pillars(self, pillars: &[Pillar]) -> anyhow::Result<String> {
        match self {
            OutputFormat::Text => Ok(render_pillars(pillars)),
            OutputFormat::Json => json(&pillars),
        }
    }

    pub fn detail(self, detail: &PillarDetail, now: DateTime<Utc>) -> anyhow::Result<String> {
        match self {
            OutputFormat::Text => Ok(render_detail(detail, now)),
            OutputFormat::Json => json(detail),
        }
    }

    pub fn outcome(self, outcome: &MutationOutcome, now: DateTime<Utc>) -> anyhow::Result<String> {
        match self {
            OutputFormat::Text => {
                let mut out = outcome.message.clone();
                if let Some(grid) = &outcome.grid {
                    out.push('\n');
                    out.push_str(&render_grid(grid, now));
                }
                Ok(out)
            }
            OutputFormat::Json => json(outcome),
        }
    }
}

fn json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn stats_line(stats: &SlotStats) -> String {
    format!(
        "{} slots: {} occupied, {} empty, {} reserved",
        stats.total, stats.occupied, stats.empty, stats.reserved
    )
}

fn cell_label(slot: &Slot, now: DateTime<Utc>) -> String {
    if slot.is_always_empty {
        return format!("{} blocked", slot.slot_code);
    }
    let state = match slot.effective_status(now) {
        SlotStatus::Occupied => slot
            .battery
            .as_ref()
            .map_or_else(|| "occupied".to_string(), |b| b.serial.clone()),
        SlotStatus::Reserved => "reserved".to_string(),
        SlotStatus::Empty => "empty".to_string(),
        SlotStatus::Maintenance => "maint".to_string(),
    };
    format!("{} {}", slot.slot_code, state)
}

pub fn render_grid(grid: &PillarGrid, now: DateTime<Utc>) -> String {
    let labels: Vec<Vec<String>> = grid
        .grid
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_ref().map_or_else(|| "-".to_string(), |s| cell_label(s, now)))
                .collect()
        })
        .collect();
    let width = labels.iter().flatten().map(String::len).max().unwrap_or(1);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} ({:?})  {}",
        grid.pillar.pillar_code,
        grid.pillar.pillar_name,
        grid.pillar.status,
        stats_line(&grid.stats())
    );
    for (index, row) in labels.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|label| format!("[{label:<width$}]")).collect();
        let _ = writeln!(out, "{:>2} {}", index + 1, cells.join(" "));
    }
    out.trim_end().to_string()
}

pub fn render_pillars(pillars: &[Pillar]) -> String {
    if pillars.is_empty() {
        return "No pillars".to_string();
    }
    pillars
        .iter()
        .map(|pillar| {
            format!(
                "{:<12} {:<6} {:<16} {:?}  {}",
                pillar.id,
                pillar.pillar_code,
                pillar.pillar_name,
                pillar.status,
                stats_line(&pillar.slot_stats)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_detail(detail: &PillarDetail, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}  {}",
        detail.pillar.pillar_code,
        detail.pillar.pillar_name,
        stats_line(&detail.statistics)
    );
    for slot in &detail.slots {
        let _ = writeln!(out, "  #{:<3} {}", slot.slot_number, cell_label(slot, now));
    }
    if !detail.batteries.is_empty() {
        let _ = writeln!(out, "Batteries:");
        for battery in &detail.batteries {
            let _ = writeln!(
                out,
                "  {:<10} {:<10} {:?}{}",
                battery.id,
                battery.serial,
                battery.status,
                battery
                    .current_slot
                    .as_deref()
                    .map(|slot| format!(" in {slot}"))
                    .unwrap_or_default()
            );
        }
    }
    out.trim_end().to_string()
}
