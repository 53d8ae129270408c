//! Preconditions a caller verifies against the cached grid before asking the
//! backend to move a battery. The backend still has the final word.

use chrono::{DateTime, Utc};

use crate::grid::PillarGrid;
use crate::models::{Battery, BatteryStatus, SlotStatus};
use crate::GridError;

impl PillarGrid {
    pub fn check_assignment(
        &self,
        battery_id: &str,
        slot_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), GridError> {
        let slot = self.slot(slot_id).ok_or_else(|| GridError::SlotNotFound {
            slot_id: slot_id.to_string(),
        })?;

        let rejection = if slot.is_always_empty {
            Some(format!("Slot {} must always stay empty", slot.slot_code))
        } else if let Some(battery) = &slot.battery {
            Some(format!(
                "Slot {} already holds battery {}",
                slot.slot_code, battery.serial
            ))
        } else {
            match slot.effective_status(now) {
                SlotStatus::Reserved => Some(format!("Slot {} is reserved", slot.slot_code)),
                SlotStatus::Maintenance => {
                    Some(format!("Slot {} is under maintenance", slot.slot_code))
                }
                SlotStatus::Empty | SlotStatus::Occupied => self
                    .holder_of(battery_id)
                    .map(|holder| {
                        format!(
                            "Battery {} is already assigned to slot {}",
                            battery_id, holder.slot_code
                        )
                    }),
            }
        };

        match rejection {
            Some(message) => Err(GridError::AssignmentRejected { message }),
            None => Ok(()),
        }
    }

    pub fn check_removal(&self, slot_id: &str) -> Result<(), GridError> {
        let slot = self.slot(slot_id).ok_or_else(|| GridError::SlotNotFound {
            slot_id: slot_id.to_string(),
        })?;
        if slot.battery.is_none() {
            return Err(GridError::RemovalRejected {
                message: format!("Slot {} has no battery to remove", slot.slot_code),
            });
        }
        Ok(())
    }
}

/// A battery can go into a slot when it is not in a vehicle and no slot
/// holds it, whether in this grid or anywhere the backend has recorded.
pub fn is_assignable(battery: &Battery, grid: &PillarGrid) -> bool {
    battery.status != BatteryStatus::InUse
        && battery.current_slot.is_none()
        && battery.current_pillar.is_none()
        && grid.holder_of(&battery.id).is_none()
}

pub fn assignable_batteries<'a>(batteries: &'a [Battery], grid: &PillarGrid) -> Vec<&'a Battery> {
    batteries
        .iter()
        .filter(|battery| is_assignable(battery, grid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::derive_grid;
    use crate::grid::fixtures::{battery, payload};
    use chrono::Duration;

    fn grid() -> PillarGrid {
        derive_grid(payload(), 2, 5).expect("Could not derive the grid")
    }

    fn assert_rejected(result: Result<(), GridError>, needle: &str) {
        match result {
            Err(GridError::AssignmentRejected { message }) => {
                assert!(message.contains(needle), "{message}")
            }
            other => panic!("Expected AssignmentRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_slot_accepts_free_battery() {
        assert!(grid().check_assignment("BAT-42", "SLOT-9", Utc::now()).is_ok());
    }

    #[test]
    fn test_reserved_slot_rejected() {
        assert_rejected(
            grid().check_assignment("BAT-42", "SLOT-7", Utc::now()),
            "reserved",
        );
    }

    #[test]
    fn test_expired_reservation_accepts() {
        let grid = grid();
        let later = Utc::now() + Duration::hours(1);
        assert!(grid.check_assignment("BAT-42", "SLOT-7", later).is_ok());
    }

    #[test]
    fn test_occupied_slot_rejected() {
        assert_rejected(
            grid().check_assignment("BAT-42", "SLOT-2", Utc::now()),
            "already holds battery SN-0002",
        );
    }

    #[test]
    fn test_double_booking_rejected() {
        assert_rejected(
            grid().check_assignment("BAT-3", "SLOT-10", Utc::now()),
            "already assigned to slot P1-S03",
        );
    }

    #[test]
    fn test_always_empty_slot_rejected() {
        let mut grid = grid();
        grid.slots_list[9].is_always_empty = true;
        assert_rejected(
            grid.check_assignment("BAT-42", "SLOT-10", Utc::now()),
            "must always stay empty",
        );
    }

    #[test]
    fn test_unknown_slot() {
        match grid().check_assignment("BAT-42", "SLOT-99", Utc::now()) {
            Err(GridError::SlotNotFound { slot_id }) => assert_eq!(slot_id, "SLOT-99"),
            other => panic!("Expected SlotNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_removal() {
        let grid = grid();
        assert!(grid.check_removal("SLOT-1").is_ok());
        match grid.check_removal("SLOT-9") {
            Err(GridError::RemovalRejected { message }) => {
                assert!(message.contains("no battery"))
            }
            other => panic!("Expected RemovalRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_assignable_batteries() {
        let grid = grid();
        let mut placed = battery("BAT-7", "SN-7", BatteryStatus::Full);
        placed.current_slot = Some("SLOT-X".into());
        let batteries = vec![
            battery("BAT-42", "SN-42", BatteryStatus::Full),
            battery("BAT-43", "SN-43", BatteryStatus::InUse),
            battery("BAT-1", "SN-0001", BatteryStatus::Full),
            placed,
            battery("BAT-44", "SN-44", BatteryStatus::Charging),
        ];
        let ids: Vec<&str> = assignable_batteries(&batteries, &grid)
            .into_iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(ids, vec!["BAT-42", "BAT-44"]);
    }
}
