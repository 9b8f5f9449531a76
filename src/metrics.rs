// Metric descriptors and the sink the collector writes into.
// A fresh PrometheusSink is built per scrape, so nothing stale survives between cycles.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;

use crate::models::Snapshot;

/// Name, help text and label names of one exported gauge.
#[derive(Debug)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

const TARGET: &[&str] = &["target"];

pub static COLLECT_DURATION: MetricDesc = MetricDesc {
    name: "nasne_collect_duration_seconds",
    help: "Time spent collecting metrics from nasne.",
    labels: TARGET,
};
pub static UP: MetricDesc = MetricDesc {
    name: "nasne_up",
    help: "Whether the last scrape from nasne succeeded.",
    labels: TARGET,
};
pub static INFO: MetricDesc = MetricDesc {
    name: "nasne_info",
    help: "nasne device information.",
    labels: &[
        "target",
        "name",
        "product_name",
        "hardware_version",
        "software_version",
    ],
};
pub static HDD_SIZE_BYTES: MetricDesc = MetricDesc {
    name: "nasne_hdd_size_bytes",
    help: "Total HDD size in bytes.",
    labels: TARGET,
};
pub static HDD_USAGE_BYTES: MetricDesc = MetricDesc {
    name: "nasne_hdd_usage_bytes",
    help: "Used HDD size in bytes.",
    labels: TARGET,
};
pub static DTCPIP_CLIENTS: MetricDesc = MetricDesc {
    name: "nasne_dtcpip_clients",
    help: "Connected DTCP-IP clients.",
    labels: TARGET,
};
pub static RECORDINGS: MetricDesc = MetricDesc {
    name: "nasne_recordings",
    help: "Number of current recordings.",
    labels: TARGET,
};
pub static RECORDED_TITLES: MetricDesc = MetricDesc {
    name: "nasne_recorded_titles",
    help: "Number of recorded titles.",
    labels: TARGET,
};
pub static RESERVED_TITLES: MetricDesc = MetricDesc {
    name: "nasne_reserved_titles",
    help: "Number of reserved titles.",
    labels: TARGET,
};
pub static RESERVED_CONFLICT_TITLES: MetricDesc = MetricDesc {
    name: "nasne_reserved_conflict_titles",
    help: "Number of conflicting reserved titles.",
    labels: TARGET,
};
pub static RESERVED_NOT_FOUND_TITLES: MetricDesc = MetricDesc {
    name: "nasne_reserved_notfound_titles",
    help: "Number of not-found reserved titles.",
    labels: TARGET,
};

/// The numeric Snapshot fields with their descriptors, in exposition order.
pub fn snapshot_gauges(s: &Snapshot) -> [(&'static MetricDesc, f64); 8] {
    [
        (&HDD_SIZE_BYTES, s.hdd_size_bytes),
        (&HDD_USAGE_BYTES, s.hdd_usage_bytes),
        (&DTCPIP_CLIENTS, s.dtcpip_clients),
        (&RECORDINGS, s.recordings),
        (&RECORDED_TITLES, s.recorded_titles),
        (&RESERVED_TITLES, s.reserved_titles),
        (&RESERVED_CONFLICT_TITLES, s.reserved_conflict_titles),
        (&RESERVED_NOT_FOUND_TITLES, s.reserved_not_found_titles),
    ]
}

/// Receives (metric, label values, value) tuples. Label values follow `desc.labels` order.
pub trait MetricsSink {
    fn emit(&mut self, desc: &'static MetricDesc, label_values: &[&str], value: f64);
}

/// Collects emitted gauges into a private registry and renders Prometheus text.
pub struct PrometheusSink {
    registry: Registry,
    gauges: HashMap<&'static str, GaugeVec>,
    error: Option<prometheus::Error>,
}

impl Default for PrometheusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PrometheusSink {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            gauges: HashMap::new(),
            error: None,
        }
    }

    fn gauge(&mut self, desc: &'static MetricDesc) -> prometheus::Result<&GaugeVec> {
        if !self.gauges.contains_key(desc.name) {
            let vec = GaugeVec::new(Opts::new(desc.name, desc.help), desc.labels)?;
            self.registry.register(Box::new(vec.clone()))?;
            self.gauges.insert(desc.name, vec);
        }
        self.gauges
            .get(desc.name)
            .ok_or_else(|| prometheus::Error::Msg(format!("gauge {} missing", desc.name)))
    }

    /// Encodes everything emitted so far. Reports the first emit error, if any.
    pub fn finish(self) -> prometheus::Result<String> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl MetricsSink for PrometheusSink {
    fn emit(&mut self, desc: &'static MetricDesc, label_values: &[&str], value: f64) {
        let result = self
            .gauge(desc)
            .and_then(|g| g.get_metric_with_label_values(label_values))
            .map(|g| g.set(value));
        if let Err(e) = result {
            tracing::warn!(metric = desc.name, error = %e, "metric emit failed");
            self.error.get_or_insert(e);
        }
    }
}

/// Content-Type of the text exposition.
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}
