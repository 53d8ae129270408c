use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PillarStatus {
    Active,
    Inactive,
    Maintenance,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Empty,
    Occupied,
    Reserved,
    Maintenance,
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SlotStatus::Empty => "empty",
            SlotStatus::Occupied => "occupied",
            SlotStatus::Reserved => "reserved",
            SlotStatus::Maintenance => "maintenance",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BatteryStatus {
    Idle,
    Charging,
    Full,
    InUse,
    IsBooking,
    Faulty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StationRef {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub address: Option<String>,
}

/// Aggregate slot counters of a pillar.
///
/// `total == occupied + empty + reserved` must hold; slots under maintenance
/// are counted as `empty`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlotStats {
    pub total: u32,
    pub occupied: u32,
    pub empty: u32,
    pub reserved: u32,
}

impl SlotStats {
    /// Count slots by their server-reported status.
    pub fn from_slots(slots: &[Slot]) -> Self {
        slots.iter().fold(SlotStats::default(), |mut stats, slot| {
            stats.total += 1;
            match slot.status {
                SlotStatus::Occupied => stats.occupied += 1,
                SlotStatus::Reserved => stats.reserved += 1,
                SlotStatus::Empty | SlotStatus::Maintenance => stats.empty += 1,
            }
            stats
        })
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.occupied + self.empty + self.reserved
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pillar {
    #[serde(alias = "_id")]
    pub id: String,
    pub pillar_code: String,
    pub pillar_name: String,
    pub pillar_number: u32,
    pub status: PillarStatus,
    pub total_slots: u32,
    pub slot_stats: SlotStats,
    pub station: Option<StationRef>,
}

/// 1-based grid coordinates as sent by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlotPosition {
    pub row: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Battery {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "serialNumber")]
    pub serial: String,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    /// State of health, 0-100.
    pub soh: Option<f64>,
    /// kWh
    pub capacity: Option<f64>,
    pub voltage: Option<f64>,
    pub price: Option<f64>,
    pub status: BatteryStatus,
    pub current_slot: Option<String>,
    pub current_pillar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub booking_id: String,
    pub user_id: String,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    /// A reservation only holds while it is well formed and not yet expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > self.reserved_at && now < self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastActivity {
    pub action: String,
    pub user_id: Option<String>,
    pub battery_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(alias = "_id")]
    pub id: String,
    pub slot_code: String,
    pub slot_number: u32,
    pub position: Option<SlotPosition>,
    pub status: SlotStatus,
    pub battery: Option<Battery>,
    pub reservation: Option<Reservation>,
    #[serde(default)]
    pub is_always_empty: bool,
    pub last_activity: Option<LastActivity>,
}

impl Slot {
    /// Status as the client should present it at `now`.
    ///
    /// A `reserved` slot whose reservation is missing or expired is shown as
    /// `empty` until the next fetch brings the backend's view.
    pub fn effective_status(&self, now: DateTime<Utc>) -> SlotStatus {
        match self.status {
            SlotStatus::Reserved
                if !self
                    .reservation
                    .as_ref()
                    .is_some_and(|reservation| reservation.is_active(now)) =>
            {
                SlotStatus::Empty
            }
            status => status,
        }
    }

    /// `occupied` if and only if a battery is present.
    pub fn occupancy_matches(&self) -> bool {
        (self.status == SlotStatus::Occupied) == self.battery.is_some()
    }

    pub fn holds_battery(&self, battery_id: &str) -> bool {
        self.battery
            .as_ref()
            .is_some_and(|battery| battery.id == battery_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GridLayout {
    pub rows: u32,
    pub columns: u32,
    pub total_slots: u32,
}
