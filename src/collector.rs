// Multi-target collector: one task per device per scrape, joined before emitting.
// Health is the last cycle's outcome, swapped in whole once the cycle is done.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::{ClientMode, NasneConfig};
use crate::metrics::{self, MetricsSink};
use crate::models::Snapshot;
use crate::nasne_repo::{GenericClient, NasneClient, NasneClientOptions, NasneError};

/// Anything that can produce one Snapshot per call.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Snapshot, NasneError>;
}

/// A polled device: its label and the fetcher that reaches it.
#[derive(Clone)]
pub struct Target {
    pub name: String,
    pub fetcher: Arc<dyn SnapshotFetcher>,
}

impl Target {
    pub fn new(name: impl Into<String>, fetcher: Arc<dyn SnapshotFetcher>) -> Self {
        Self {
            name: name.into(),
            fetcher,
        }
    }
}

/// Outcome of the most recent completed cycle. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthState {
    scraped: bool,
    errors: BTreeMap<String, String>,
}

impl HealthState {
    /// False before the first completed cycle.
    pub fn has_scraped(&self) -> bool {
        self.scraped
    }

    /// Target -> error message for every target that failed last cycle.
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Aggregate health given how many targets are configured.
    pub fn is_healthy(&self, target_count: usize) -> bool {
        target_count > 0 && self.scraped && self.errors.is_empty()
    }
}

struct TargetOutcome {
    elapsed: Duration,
    result: Result<Snapshot, String>,
}

pub struct Collector {
    targets: Vec<Target>,
    timeout: Duration,
    health: RwLock<HealthState>,
}

impl Collector {
    /// `timeout` bounds each target's whole fetch.
    pub fn new(targets: Vec<Target>, timeout: Duration) -> Self {
        Self {
            targets,
            timeout,
            health: RwLock::new(HealthState::default()),
        }
    }

    /// Builds one client per configured target. A malformed address fails here, never mid-scrape.
    pub fn from_config(config: &NasneConfig) -> Result<Self, NasneError> {
        let mut targets = Vec::with_capacity(config.targets.len());
        for raw in &config.targets {
            let fetcher: Arc<dyn SnapshotFetcher> = match config.mode {
                ClientMode::Structured => Arc::new(NasneClient::new(
                    raw,
                    NasneClientOptions {
                        http_timeout: config.http_timeout(),
                        recorded_port: config.recorded_port,
                        not_found_event_id: config.not_found_event_id,
                    },
                )?),
                ClientMode::Generic => Arc::new(GenericClient::new(
                    raw,
                    config.endpoints.as_slice(),
                    config.http_timeout(),
                )?),
            };
            targets.push(Target::new(raw.trim(), fetcher));
        }
        Ok(Self::new(targets, config.scrape_timeout()))
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.name.as_str())
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Polls every target in parallel, emits their metrics, then replaces the health state.
    /// Dropping the returned future aborts all in-flight fetches.
    #[instrument(skip(self, sink), fields(operation = "collect", targets = self.targets.len()))]
    pub async fn collect<S: MetricsSink>(&self, sink: &mut S) {
        let cycle_start = Instant::now();
        let outcomes = self.poll_all().await;

        let mut errors = BTreeMap::new();
        for (target, outcome) in self.targets.iter().zip(outcomes) {
            let label = target.name.as_str();
            sink.emit(
                &metrics::COLLECT_DURATION,
                &[label],
                outcome.elapsed.as_secs_f64(),
            );
            match outcome.result {
                Ok(snapshot) => emit_snapshot(sink, label, &snapshot),
                Err(e) => {
                    warn!(device = label, error = %e, "scrape failed");
                    sink.emit(&metrics::UP, &[label], 0.0);
                    errors.insert(target.name.clone(), e);
                }
            }
        }

        debug!(
            failed = errors.len(),
            elapsed_ms = cycle_start.elapsed().as_millis() as u64,
            "collect cycle done"
        );
        *self.health.write().await = HealthState {
            scraped: true,
            errors,
        };
    }

    /// One outcome per target, in target order.
    async fn poll_all(&self) -> Vec<TargetOutcome> {
        let started = Instant::now();
        let mut set = JoinSet::new();
        let mut task_index = HashMap::with_capacity(self.targets.len());

        for (idx, target) in self.targets.iter().enumerate() {
            let fetcher = target.fetcher.clone();
            let timeout = self.timeout;
            let handle = set.spawn(async move {
                let start = Instant::now();
                let result = match tokio::time::timeout(timeout, fetcher.fetch_snapshot()).await {
                    Ok(r) => r.map_err(|e| e.to_string()),
                    Err(_) => Err(NasneError::Timeout(timeout).to_string()),
                };
                (
                    idx,
                    TargetOutcome {
                        elapsed: start.elapsed(),
                        result,
                    },
                )
            });
            task_index.insert(handle.id(), idx);
        }

        let mut outcomes: Vec<Option<TargetOutcome>> =
            self.targets.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, outcome)) => outcomes[idx] = Some(outcome),
                Err(e) => {
                    if let Some(&idx) = task_index.get(&e.id()) {
                        outcomes[idx] = Some(TargetOutcome {
                            elapsed: started.elapsed(),
                            result: Err(format!("fetch task failed: {}", e)),
                        });
                    }
                }
            }
        }

        outcomes
            .into_iter()
            .map(|o| {
                o.unwrap_or_else(|| TargetOutcome {
                    elapsed: started.elapsed(),
                    result: Err("fetch task lost".to_string()),
                })
            })
            .collect()
    }

    /// True iff targets exist, a cycle has completed, and that cycle had no failures.
    pub async fn healthy(&self) -> bool {
        self.health.read().await.is_healthy(self.targets.len())
    }

    /// Copy of the last cycle's outcome.
    pub async fn health(&self) -> HealthState {
        self.health.read().await.clone()
    }
}

fn emit_snapshot<S: MetricsSink>(sink: &mut S, target: &str, s: &Snapshot) {
    sink.emit(&metrics::UP, &[target], 1.0);
    sink.emit(
        &metrics::INFO,
        &[
            target,
            s.name.as_str(),
            s.product_name.as_str(),
            s.hardware_version.as_str(),
            s.software_version.as_str(),
        ],
        1.0,
    );
    for (desc, value) in metrics::snapshot_gauges(s) {
        sink.emit(desc, &[target], value);
    }
}
