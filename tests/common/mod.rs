// Shared test helpers: fake nasne device, fake fetchers, recording metrics sink

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use nasne_exporter::collector::SnapshotFetcher;
use nasne_exporter::metrics::{MetricDesc, MetricsSink};
use nasne_exporter::models::Snapshot;
use nasne_exporter::nasne_repo::NasneError;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Canned device state served by `spawn_fake_nasne`.
#[derive(Clone)]
pub struct FakeNasne {
    pub name: &'static str,
    pub software_version: &'static str,
    pub hardware_version: serde_json::Value,
    pub product_name: &'static str,
    /// (id, totalVolumeSize, usedVolumeSize)
    pub hdds: Vec<(i64, f64, f64)>,
    pub clients: i64,
    pub now_id: i64,
    pub recorded_total: i64,
    pub reserved_total: i64,
    /// (conflictId, eventId)
    pub reserved_items: Vec<(i64, i64)>,
    /// Serve /status/* on this listener.
    pub serve_status: bool,
    /// Serve /recorded/* and /schedule/* on this listener.
    pub serve_lists: bool,
    /// Paths answered with 500.
    pub failing: Vec<&'static str>,
    /// Generic-mode documents: (path, body).
    pub documents: Vec<(&'static str, serde_json::Value)>,
}

impl Default for FakeNasne {
    fn default() -> Self {
        Self {
            name: "living-room",
            software_version: "4.0",
            hardware_version: json!(1),
            product_name: "nasne",
            hdds: vec![(0, 1000.0, 400.0), (1, 2000.0, 100.0)],
            clients: 2,
            now_id: 3,
            recorded_total: 42,
            reserved_total: 3,
            reserved_items: vec![(0, 100), (2, 65536), (1, 200)],
            serve_status: true,
            serve_lists: true,
            failing: vec![],
            documents: vec![],
        }
    }
}

struct FakeState {
    device: FakeNasne,
    hits: AtomicUsize,
}

async fn handle(State(state): State<Arc<FakeState>>, uri: Uri) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let dev = &state.device;
    let path = uri.path();
    if dev.failing.iter().any(|p| *p == path) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    if let Some((_, body)) = dev.documents.iter().find(|(p, _)| *p == path) {
        return axum::Json(body.clone()).into_response();
    }

    let is_status = path.starts_with("/status/");
    let is_list = path.starts_with("/recorded/") || path.starts_with("/schedule/");
    if (is_status && !dev.serve_status) || (is_list && !dev.serve_lists) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let body = match path {
        "/status/boxNameGet" => json!({"errorcode": 0, "name": dev.name}),
        "/status/softwareVersionGet" => {
            json!({"errorcode": 0, "softwareVersion": dev.software_version})
        }
        "/status/hardwareVersionGet" => json!({
            "errorcode": 0,
            "hardwareVersion": dev.hardware_version,
            "productName": dev.product_name
        }),
        "/status/HDDListGet" => json!({
            "errorcode": 0,
            "number": dev.hdds.len(),
            "HDD": dev.hdds.iter().map(|(id, _, _)| json!({"id": id, "registerFlag": 1})).collect::<Vec<_>>()
        }),
        "/status/HDDInfoGet" => {
            let id: i64 = uri
                .query()
                .and_then(|q| q.strip_prefix("id="))
                .and_then(|v| v.parse().ok())
                .unwrap_or(-1);
            match dev.hdds.iter().find(|(i, _, _)| *i == id) {
                Some((_, total, used)) => json!({
                    "errorcode": 0,
                    "HDD": {"totalVolumeSize": total, "usedVolumeSize": used, "freeVolumeSize": total - used}
                }),
                None => return StatusCode::NOT_FOUND.into_response(),
            }
        }
        "/status/dtcpipClientListGet" => json!({"errorcode": 0, "number": dev.clients}),
        "/status/boxStatusListGet" => {
            json!({"errorcode": 0, "tvTimerInfoStatus": {"nowId": dev.now_id}})
        }
        "/recorded/titleListGet" => {
            json!({"errorcode": 0, "totalMatches": dev.recorded_total, "item": []})
        }
        "/schedule/reservedListGet" => json!({
            "errorcode": 0,
            "totalMatches": dev.reserved_total,
            "item": dev.reserved_items.iter()
                .map(|(c, e)| json!({"conflictId": c, "eventId": e, "title": "x"}))
                .collect::<Vec<_>>()
        }),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    axum::Json(body).into_response()
}

/// A running fake device. Dropping it does not stop the server; tests are short-lived.
pub struct FakeServer {
    pub port: u16,
    state: Arc<FakeState>,
}

impl FakeServer {
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

pub async fn spawn_fake_nasne(device: FakeNasne) -> FakeServer {
    let state = Arc::new(FakeState {
        device,
        hits: AtomicUsize::new(0),
    });
    let app = Router::new().fallback(handle).with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    FakeServer { port, state }
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Records every emitted gauge.
#[derive(Default)]
pub struct RecordingSink {
    pub samples: Vec<(String, Vec<String>, f64)>,
}

impl MetricsSink for RecordingSink {
    fn emit(&mut self, desc: &'static MetricDesc, label_values: &[&str], value: f64) {
        assert_eq!(desc.labels.len(), label_values.len(), "{}", desc.name);
        self.samples.push((
            desc.name.to_string(),
            label_values.iter().map(|s| s.to_string()).collect(),
            value,
        ));
    }
}

impl RecordingSink {
    pub fn value(&self, name: &str, target: &str) -> Option<f64> {
        self.samples
            .iter()
            .find(|(n, labels, _)| n == name && labels.first().map(String::as_str) == Some(target))
            .map(|(_, _, v)| *v)
    }

    pub fn names_for(&self, target: &str) -> Vec<String> {
        self.samples
            .iter()
            .filter(|(_, labels, _)| labels.first().map(String::as_str) == Some(target))
            .map(|(n, _, _)| n.clone())
            .collect()
    }

    pub fn labels(&self, name: &str, target: &str) -> Option<Vec<String>> {
        self.samples
            .iter()
            .find(|(n, labels, _)| n == name && labels.first().map(String::as_str) == Some(target))
            .map(|(_, labels, _)| labels.clone())
    }
}

/// Returns a fixed snapshot or a fixed error, optionally after a delay.
pub struct FakeFetcher {
    pub snapshot: Snapshot,
    pub fail: Option<String>,
    pub delay: Duration,
}

impl FakeFetcher {
    pub fn ok(snapshot: Snapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot,
            fail: None,
            delay: Duration::ZERO,
        })
    }

    pub fn err(message: &str) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Snapshot::default(),
            fail: Some(message.to_string()),
            delay: Duration::ZERO,
        })
    }

    pub fn slow(snapshot: Snapshot, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            snapshot,
            fail: None,
            delay,
        })
    }
}

pub fn fake_error(message: &str) -> NasneError {
    NasneError::Status {
        endpoint: "/status/boxNameGet".into(),
        status: 500,
        body: message.into(),
    }
}

#[async_trait]
impl SnapshotFetcher for FakeFetcher {
    async fn fetch_snapshot(&self) -> Result<Snapshot, NasneError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.fail {
            Some(msg) => Err(fake_error(msg)),
            None => Ok(self.snapshot.clone()),
        }
    }
}

/// Fails until `recover()` is called.
#[derive(Default)]
pub struct FlakyFetcher {
    pub recovered: AtomicBool,
}

impl FlakyFetcher {
    pub fn recover(&self) {
        self.recovered.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotFetcher for FlakyFetcher {
    async fn fetch_snapshot(&self) -> Result<Snapshot, NasneError> {
        if self.recovered.load(Ordering::SeqCst) {
            Ok(sample_snapshot("flaky"))
        } else {
            Err(fake_error("device unreachable"))
        }
    }
}

/// Sleeps, then records that the fetch ran to completion.
pub struct CompletionFlagFetcher {
    pub delay: Duration,
    pub completed: AtomicBool,
}

impl CompletionFlagFetcher {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            completed: AtomicBool::new(false),
        })
    }

    pub fn completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotFetcher for CompletionFlagFetcher {
    async fn fetch_snapshot(&self) -> Result<Snapshot, NasneError> {
        tokio::time::sleep(self.delay).await;
        self.completed.store(true, Ordering::SeqCst);
        Ok(sample_snapshot("slow"))
    }
}

/// Panics on every call.
pub struct PanickingFetcher;

#[async_trait]
impl SnapshotFetcher for PanickingFetcher {
    async fn fetch_snapshot(&self) -> Result<Snapshot, NasneError> {
        panic!("fetcher blew up");
    }
}

pub fn sample_snapshot(name: &str) -> Snapshot {
    Snapshot {
        name: name.into(),
        product_name: "nasne".into(),
        hardware_version: "1".into(),
        software_version: "4.0".into(),
        hdd_size_bytes: 1024.0,
        hdd_usage_bytes: 512.0,
        dtcpip_clients: 2.0,
        recordings: 1.0,
        recorded_titles: 42.0,
        reserved_titles: 3.0,
        reserved_conflict_titles: 2.0,
        reserved_not_found_titles: 1.0,
    }
}
