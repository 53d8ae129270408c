//! Stand-in for the battery-swap backend, served in-process by tests or as
//! the `swap-mock` binary.
//!
//! Speaks the same snake_case envelope as the real service and enforces the
//! slot rules the real service owns (one battery per slot, no assignment into
//! reserved or always-empty slots, aggregated slot statistics).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use swap_core::casing::{keys_to_camel, keys_to_snake};
use swap_core::wire::{
    AssignBatteryRequest, Envelope, PillarDetail, PillarGridPayload, RemoveBatteryRequest,
    StationPillars,
};
use swap_core::{
    Battery, BatteryStatus, GridLayout, LastActivity, Pillar, PillarStatus, Reservation, Slot,
    SlotPosition, SlotStats, SlotStatus, StationRef,
};
use tower_http::trace::TraceLayer;

type SharedState = Arc<Mutex<MockState>>;

#[derive(Debug, Clone)]
struct MockPillar {
    pillar: Pillar,
    slots: Vec<Slot>,
}

#[derive(Debug, Default)]
struct MockState {
    pillars: Vec<MockPillar>,
    batteries: HashMap<String, Battery>,
    token: Option<String>,
    latency: Duration,
    grid_defect: Option<GridDefect>,
    grid_requests: usize,
    last_grid_query: Option<GridParams>,
}

impl MockState {
    fn pillar(&self, pillar_id: &str) -> Option<&MockPillar> {
        self.pillars.iter().find(|p| p.pillar.id == pillar_id)
    }

    fn locate_slot(&self, slot_id: &str) -> Option<(usize, usize)> {
        self.pillars.iter().enumerate().find_map(|(p, pillar)| {
            pillar
                .slots
                .iter()
                .position(|slot| slot.id == slot_id)
                .map(|s| (p, s))
        })
    }

    fn refresh_stats(&mut self, pillar_index: usize) {
        let pillar = &mut self.pillars[pillar_index];
        pillar.pillar.slot_stats = SlotStats::from_slots(&pillar.slots);
        pillar.pillar.total_slots = pillar.pillar.slot_stats.total;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridParams {
    pub rows: Option<u32>,
    pub columns: Option<u32>,
}

/// Ways to break the grid response's `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridDefect {
    /// Drop one top-level key, named in camelCase (`gridLayout`, `grid`, `pillar`, `slotsList`).
    MissingKey(&'static str),
    /// Send `data: null`.
    NullData,
    /// Leave `data` out of the envelope.
    MissingData,
}

#[derive(Debug)]
struct MockError {
    status: StatusCode,
    message: String,
}

impl MockError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn encoding(error: serde_json::Error) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Could not encode response: {error}"),
        )
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        respond(
            self.status,
            json!({ "success": false, "message": self.message }),
        )
    }
}

fn respond(status: StatusCode, body: Value) -> Response {
    (status, Json(keys_to_snake(body))).into_response()
}

fn reply<T: Serialize>(status: StatusCode, envelope: &Envelope<T>) -> Response {
    match serde_json::to_value(envelope) {
        Ok(body) => respond(status, body),
        Err(error) => MockError::encoding(error).into_response(),
    }
}

fn ok<T: Serialize>(data: Option<T>, message: &str) -> Response {
    reply(
        StatusCode::OK,
        &Envelope {
            success: true,
            message: Some(message.to_string()),
            data,
            errors: None,
        },
    )
}

fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wait out the configured latency, then check the bearer token.
async fn admit(state: &SharedState, headers: &HeaderMap) -> Result<(), MockError> {
    let (latency, token) = {
        let state = lock(state);
        (state.latency, state.token.clone())
    };
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
    let Some(token) = token else {
        return Ok(());
    };
    let expected = format!("Bearer {token}");
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(MockError::new(StatusCode::UNAUTHORIZED, "Invalid or expired token")),
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, MockError> {
    serde_json::from_value(keys_to_camel(body))
        .map_err(|error| MockError::new(StatusCode::BAD_REQUEST, error.to_string()))
}

async fn pillar_grid(
    State(state): State<SharedState>,
    Path(pillar_id): Path<String>,
    Query(params): Query<GridParams>,
    headers: HeaderMap,
) -> Result<Response, MockError> {
    admit(&state, &headers).await?;
    let mut state = lock(&state);
    state.grid_requests += 1;
    state.last_grid_query = Some(params);
    let defect = state.grid_defect;

    let pillar = state
        .pillar(&pillar_id)
        .ok_or_else(|| MockError::new(StatusCode::NOT_FOUND, "Pillar not found"))?;

    let columns = params.columns.filter(|c| *c > 0).unwrap_or(5);
    let total = pillar.slots.len() as u32;
    let payload = PillarGridPayload {
        pillar: pillar.pillar.clone(),
        grid_layout: GridLayout {
            rows: params.rows.unwrap_or(0).max(total.div_ceil(columns)),
            columns,
            total_slots: total,
        },
        grid: pillar
            .slots
            .chunks(columns as usize)
            .map(|row| row.to_vec())
            .collect(),
        slots_list: pillar.slots.clone(),
    };

    let mut data = serde_json::to_value(&payload).map_err(MockError::encoding)?;
    match defect {
        Some(GridDefect::MissingKey(key)) => {
            if let Some(object) = data.as_object_mut() {
                object.remove(key);
            }
        }
        Some(GridDefect::NullData) => data = Value::Null,
        Some(GridDefect::MissingData) => {
            return Ok(respond(
                StatusCode::OK,
                json!({ "success": true, "message": "Pillar grid retrieved" }),
            ));
        }
        None => {}
    }
    Ok(ok(Some(data), "Pillar grid retrieved"))
}

async fn station_pillars(
    State(state): State<SharedState>,
    Path(station_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, MockError> {
    admit(&state, &headers).await?;
    let state = lock(&state);
    let pillars = state
        .pillars
        .iter()
        .filter(|p| p.pillar.station.as_ref().is_some_and(|s| s.id == station_id))
        .map(|p| p.pillar.clone())
        .collect();
    Ok(ok(Some(StationPillars { pillars }), "Pillars retrieved"))
}

async fn pillar_detail(
    State(state): State<SharedState>,
    Path(pillar_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, MockError> {
    admit(&state, &headers).await?;
    let state = lock(&state);
    let pillar = state
        .pillar(&pillar_id)
        .ok_or_else(|| MockError::new(StatusCode::NOT_FOUND, "Pillar not found"))?;
    let mut batteries: Vec<Battery> = state.batteries.values().cloned().collect();
    batteries.sort_by(|a, b| a.id.cmp(&b.id));
    let detail = PillarDetail {
        pillar: pillar.pillar.clone(),
        statistics: pillar.pillar.slot_stats,
        slots: pillar.slots.clone(),
        batteries,
    };
    Ok(ok(Some(detail), "Pillar retrieved"))
}

async fn assign_battery(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, MockError> {
    admit(&state, &headers).await?;
    let request: AssignBatteryRequest = parse_body(body)?;
    let mut state = lock(&state);

    let (p, s) = state
        .locate_slot(&request.slot_id)
        .ok_or_else(|| MockError::new(StatusCode::NOT_FOUND, "Slot not found"))?;
    let slot = &state.pillars[p].slots[s];
    if slot.is_always_empty {
        return Err(MockError::new(
            StatusCode::BAD_REQUEST,
            "This slot must always remain empty",
        ));
    }
    if slot.battery.is_some() {
        return Err(MockError::new(
            StatusCode::BAD_REQUEST,
            "Slot already has a battery",
        ));
    }
    if slot.status == SlotStatus::Reserved {
        return Err(MockError::new(StatusCode::BAD_REQUEST, "Slot is reserved"));
    }
    if slot.status == SlotStatus::Maintenance {
        return Err(MockError::new(
            StatusCode::BAD_REQUEST,
            "Slot is under maintenance",
        ));
    }

    let battery = state
        .batteries
        .get(&request.battery_id)
        .ok_or_else(|| MockError::new(StatusCode::NOT_FOUND, "Battery not found"))?;
    if battery.current_slot.is_some() {
        return Err(MockError::new(
            StatusCode::BAD_REQUEST,
            "Battery is already assigned to another slot",
        ));
    }
    if battery.status == BatteryStatus::InUse {
        return Err(MockError::new(
            StatusCode::BAD_REQUEST,
            "Battery is currently in use",
        ));
    }

    let pillar_id = state.pillars[p].pillar.id.clone();
    let mut battery = battery.clone();
    battery.current_slot = Some(request.slot_id.clone());
    battery.current_pillar = Some(pillar_id);
    state
        .batteries
        .insert(battery.id.clone(), battery.clone());

    let slot = &mut state.pillars[p].slots[s];
    slot.status = SlotStatus::Occupied;
    slot.battery = Some(battery);
    slot.last_activity = Some(LastActivity {
        action: "assign".into(),
        user_id: None,
        battery_id: Some(request.battery_id.clone()),
        timestamp: Utc::now(),
    });
    state.refresh_stats(p);

    Ok(ok::<Value>(None, "Battery assigned to slot successfully"))
}

async fn remove_battery(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, MockError> {
    admit(&state, &headers).await?;
    let request: RemoveBatteryRequest = parse_body(body)?;
    let mut state = lock(&state);

    let (p, s) = state
        .locate_slot(&request.slot_id)
        .ok_or_else(|| MockError::new(StatusCode::NOT_FOUND, "Slot not found"))?;
    let slot = &mut state.pillars[p].slots[s];
    let Some(mut battery) = slot.battery.take() else {
        return Err(MockError::new(
            StatusCode::BAD_REQUEST,
            "Slot has no battery to remove",
        ));
    };
    slot.status = SlotStatus::Empty;
    slot.last_activity = Some(LastActivity {
        action: "remove".into(),
        user_id: None,
        battery_id: Some(battery.id.clone()),
        timestamp: Utc::now(),
    });

    battery.current_slot = None;
    battery.current_pillar = None;
    state.batteries.insert(battery.id.clone(), battery);
    state.refresh_stats(p);

    Ok(ok::<Value>(None, "Battery removed from slot successfully"))
}

/// Handle to a mock backend; clones share the same state.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: SharedState,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Station `ST-1` with pillar `PILLAR-1`: ten slots on a 2×5 layout,
    /// six occupied, `SLOT-5` and `SLOT-10` reserved, `SLOT-3` and `SLOT-9`
    /// empty. Battery `BAT-42` (serial `SN-0042`) waits in the depot.
    pub fn demo_station() -> Self {
        let now = Utc::now();
        let slots: Vec<Slot> = (1..=10u32)
            .map(|number| {
                let status = match number {
                    3 | 9 => SlotStatus::Empty,
                    5 | 10 => SlotStatus::Reserved,
                    _ => SlotStatus::Occupied,
                };
                Slot {
                    id: format!("SLOT-{number}"),
                    slot_code: format!("P1-S{number:02}"),
                    slot_number: number,
                    position: Some(SlotPosition {
                        row: (number - 1) / 5 + 1,
                        column: (number - 1) % 5 + 1,
                    }),
                    status,
                    battery: (status == SlotStatus::Occupied).then(|| Battery {
                        current_slot: Some(format!("SLOT-{number}")),
                        current_pillar: Some("PILLAR-1".into()),
                        ..demo_battery(&format!("BAT-{number}"), &format!("SN-{number:04}"))
                    }),
                    reservation: (status == SlotStatus::Reserved).then(|| Reservation {
                        booking_id: format!("BK-{number}"),
                        user_id: "DRIVER-1".into(),
                        reserved_at: now - ChronoDuration::minutes(5),
                        expires_at: now + ChronoDuration::minutes(25),
                    }),
                    is_always_empty: false,
                    last_activity: None,
                }
            })
            .collect();

        let pillar = Pillar {
            id: "PILLAR-1".into(),
            pillar_code: "P1".into(),
            pillar_name: "Pillar 1".into(),
            pillar_number: 1,
            status: PillarStatus::Active,
            total_slots: 0,
            slot_stats: SlotStats::default(),
            station: Some(StationRef {
                id: "ST-1".into(),
                name: "Central Depot".into(),
                address: Some("1 Depot Road".into()),
            }),
        };

        let backend = Self::new().with_pillar(pillar, slots.clone());
        let held = slots.into_iter().filter_map(|slot| slot.battery);
        held.fold(backend, |backend, battery| backend.with_battery(battery))
            .with_battery(demo_battery("BAT-42", "SN-0042"))
    }

    pub fn with_pillar(self, pillar: Pillar, slots: Vec<Slot>) -> Self {
        {
            let mut state = lock(&self.state);
            state.pillars.push(MockPillar { pillar, slots });
            let index = state.pillars.len() - 1;
            state.refresh_stats(index);
        }
        self
    }

    pub fn with_battery(self, battery: Battery) -> Self {
        lock(&self.state)
            .batteries
            .insert(battery.id.clone(), battery);
        self
    }

    /// Reject requests that do not carry `Bearer <token>`.
    pub fn require_token(self, token: impl Into<String>) -> Self {
        lock(&self.state).token = Some(token.into());
        self
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        lock(&self.state).latency = latency;
        self
    }

    /// Break every following grid response the given way, or stop breaking them.
    pub fn set_grid_defect(&self, defect: Option<GridDefect>) {
        lock(&self.state).grid_defect = defect;
    }

    pub fn grid_requests(&self) -> usize {
        lock(&self.state).grid_requests
    }

    pub fn last_grid_query(&self) -> Option<GridParams> {
        lock(&self.state).last_grid_query
    }

    pub fn slot(&self, slot_id: &str) -> Option<Slot> {
        let state = lock(&self.state);
        let (p, s) = state.locate_slot(slot_id)?;
        Some(state.pillars[p].slots[s].clone())
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/battery-swap/pillars/station/{station_id}",
                get(station_pillars),
            )
            .route("/battery-swap/pillars/{pillar_id}", get(pillar_detail))
            .route("/battery-swap/pillars/{pillar_id}/grid", get(pillar_grid))
            .route("/battery-swap/slots/assign-battery", post(assign_battery))
            .route("/battery-swap/slots/remove-battery", post(remove_battery))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an ephemeral local port and return the base URL.
    pub async fn spawn(&self) -> std::io::Result<String> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let app = self.router();
        tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).await {
                tracing::error!("Mock backend stopped: {}", error);
            }
        });
        Ok(format!("http://{address}"))
    }
}

fn demo_battery(id: &str, serial: &str) -> Battery {
    Battery {
        id: id.into(),
        serial: serial.into(),
        model: Some("LFP-48V".into()),
        manufacturer: Some("VoltCell".into()),
        soh: Some(94.0),
        capacity: Some(2.7),
        voltage: Some(48.0),
        price: Some(450.0),
        status: BatteryStatus::Full,
        current_slot: None,
        current_pillar: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    async fn body_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn fetch_grid(backend: &MockBackend) -> Value {
        let response = backend
            .router()
            .oneshot(
                Request::builder()
                    .uri("/battery-swap/pillars/PILLAR-1/grid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        body_json(response).await
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_grid_is_snake_case() {
        let backend = MockBackend::demo_station();
        let response = backend
            .router()
            .oneshot(
                Request::builder()
                    .uri("/battery-swap/pillars/PILLAR-1/grid?rows=2&columns=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["grid_layout"]["rows"], 2);
        assert_eq!(body["data"]["pillar"]["slot_stats"]["occupied"], 6);
        assert_eq!(body["data"]["slots_list"].as_array().map(Vec::len), Some(10));
        assert_eq!(backend.grid_requests(), 1);
    }

    #[tokio::test]
    async fn test_grid_honours_rows_hint() {
        let backend = MockBackend::demo_station();
        let response = backend
            .router()
            .oneshot(
                Request::builder()
                    .uri("/battery-swap/pillars/PILLAR-1/grid?rows=4&columns=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["data"]["grid_layout"]["rows"], 4);
        assert_eq!(body["data"]["grid"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_grid_defects() {
        let backend = MockBackend::demo_station();
        backend.set_grid_defect(Some(GridDefect::MissingKey("grid")));
        let body = fetch_grid(&backend).await;
        assert!(body["data"].get("grid").is_none());
        assert!(body["data"].get("slots_list").is_some());

        backend.set_grid_defect(Some(GridDefect::NullData));
        let body = fetch_grid(&backend).await;
        assert!(body["data"].is_null());
        assert!(body.get("data").is_some());

        backend.set_grid_defect(Some(GridDefect::MissingData));
        let body = fetch_grid(&backend).await;
        assert!(body.get("data").is_none());
        assert_eq!(body["success"], true);

        backend.set_grid_defect(None);
        assert!(fetch_grid(&backend).await["data"].get("grid_layout").is_some());
    }

    #[test]
    fn test_unencodable_reply_is_server_error() {
        let mut data = HashMap::new();
        data.insert((1u8, 2u8), "cell");
        let envelope = Envelope {
            success: true,
            message: None,
            data: Some(data),
            errors: None,
        };

        let response = reply(StatusCode::OK, &envelope);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_assign_into_reserved_slot() {
        let backend = MockBackend::demo_station();
        let response = backend
            .router()
            .oneshot(post(
                "/battery-swap/slots/assign-battery",
                json!({ "battery_id": "BAT-42", "slot_id": "SLOT-5" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Slot is reserved");
    }

    #[tokio::test]
    async fn test_remove_updates_stats() {
        let backend = MockBackend::demo_station();
        let response = backend
            .router()
            .oneshot(post(
                "/battery-swap/slots/remove-battery",
                json!({ "slot_id": "SLOT-1" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let slot = backend.slot("SLOT-1").unwrap();
        assert_eq!(slot.status, SlotStatus::Empty);
        assert!(slot.battery.is_none());
        assert_eq!(
            backend.slot("SLOT-2").map(|s| s.status),
            Some(SlotStatus::Occupied)
        );
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let backend = MockBackend::demo_station().require_token("secret");
        let response = backend
            .router()
            .oneshot(
                Request::builder()
                    .uri("/battery-swap/pillars/station/ST-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], "Invalid or expired token");
    }
}
