// Normalized per-device metrics record

/// One device's metrics at one point in time. Produced by a fetcher, consumed by the collector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub name: String,
    pub product_name: String,
    pub hardware_version: String,
    pub software_version: String,
    pub hdd_size_bytes: f64,
    pub hdd_usage_bytes: f64,
    pub dtcpip_clients: f64,
    /// 1 while a recording is in progress, else 0.
    pub recordings: f64,
    pub recorded_titles: f64,
    pub reserved_titles: f64,
    pub reserved_conflict_titles: f64,
    pub reserved_not_found_titles: f64,
}

impl Snapshot {
    /// Clamps numeric fields to their valid ranges: no negatives, no NaN/inf,
    /// `recordings` in {0, 1}, reservation sub-counts bounded by `reserved_titles`.
    pub fn sanitized(mut self) -> Self {
        for v in [
            &mut self.hdd_size_bytes,
            &mut self.hdd_usage_bytes,
            &mut self.dtcpip_clients,
            &mut self.recordings,
            &mut self.recorded_titles,
            &mut self.reserved_titles,
            &mut self.reserved_conflict_titles,
            &mut self.reserved_not_found_titles,
        ] {
            *v = non_negative(*v);
        }
        self.recordings = if self.recordings > 0.0 { 1.0 } else { 0.0 };
        self.reserved_conflict_titles = self.reserved_conflict_titles.min(self.reserved_titles);
        self.reserved_not_found_titles = self.reserved_not_found_titles.min(self.reserved_titles);
        self
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}
