//! Payload shapes exchanged with the battery-swap backend.
//!
//! Every response arrives wrapped in a single [`Envelope`]. Keys are
//! camelCase here; the snake_case conversion happens in the HTTP client
//! before these types are serialized or deserialized.

use serde::{Deserialize, Serialize};

use crate::models::{Battery, GridLayout, Pillar, Slot, SlotStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
    pub errors: Option<serde_json::Value>,
}

/// `GET /battery-swap/pillars/{pillarId}/grid`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PillarGridPayload {
    pub pillar: Pillar,
    pub grid_layout: GridLayout,
    pub grid: Vec<Vec<Slot>>,
    pub slots_list: Vec<Slot>,
}

/// `GET /battery-swap/pillars/station/{stationId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationPillars {
    pub pillars: Vec<Pillar>,
}

/// `GET /battery-swap/pillars/{pillarId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PillarDetail {
    pub pillar: Pillar,
    pub statistics: SlotStats,
    pub slots: Vec<Slot>,
    pub batteries: Vec<Battery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBatteryRequest {
    pub battery_id: String,
    pub slot_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBatteryRequest {
    pub slot_id: String,
}

/// Outcome of an accepted assign/remove call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationAck {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_without_data() {
        let json = r#"{"success": true, "message": "Battery assigned"}"#;
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("Battery assigned"));
        assert!(envelope.data.is_none());
        assert!(envelope.errors.is_none());
    }

    #[test]
    fn test_grid_payload_requires_layout() {
        let json = r#"
        {
          "pillar": {
            "id": "PILLAR-1", "pillarCode": "P1", "pillarName": "Pillar 1",
            "pillarNumber": 1, "status": "active", "totalSlots": 0,
            "slotStats": {"total": 0, "occupied": 0, "empty": 0, "reserved": 0}
          },
          "grid": [],
          "slotsList": []
        }
        "#;
        let result: Result<PillarGridPayload, _> = serde_json::from_str(json);
        let error = result.unwrap_err().to_string();
        assert!(error.contains("gridLayout"), "{error}");
    }
}
