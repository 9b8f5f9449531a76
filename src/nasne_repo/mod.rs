// nasne device clients: structured per-endpoint client plus the generic extractor path

pub mod extract;
mod error;
mod generic;
mod http;

pub use error::NasneError;
pub use generic::{DEFAULT_GENERIC_ENDPOINTS, GenericClient};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::collector::SnapshotFetcher;
use crate::models::Snapshot;
use crate::models::nasne::{
    BoxName, BoxStatusList, DtcpipClientList, HardwareVersion, HddInfo, HddList, SoftwareVersion,
    TitleList,
};

/// Port of the /status APIs when the base address has none.
pub const DEFAULT_STATUS_PORT: u16 = 64210;
/// Port of the /recorded and /schedule APIs.
pub const DEFAULT_RECORDED_PORT: u16 = 64220;
/// `eventId` a reservation carries once its programme is no longer broadcast.
pub const DEFAULT_NOT_FOUND_EVENT_ID: i64 = 65536;
/// `tvTimerInfoStatus.nowId` while a recording is running.
pub const RECORDING_IN_PROGRESS_ID: i64 = 3;

const BOX_NAME: &str = "/status/boxNameGet";
const SOFTWARE_VERSION: &str = "/status/softwareVersionGet";
const HARDWARE_VERSION: &str = "/status/hardwareVersionGet";
const HDD_LIST: &str = "/status/HDDListGet";
const HDD_INFO: &str = "/status/HDDInfoGet";
const DTCPIP_CLIENTS: &str = "/status/dtcpipClientListGet";
const BOX_STATUS: &str = "/status/boxStatusListGet";
const RECORDED_TITLES: &str = "/recorded/titleListGet";
const RESERVED_LIST: &str = "/schedule/reservedListGet";

// requestedCount=0: the device still reports totalMatches.
const RECORDED_TITLES_QUERY: &str = "searchCriteria=0&filter=0&startingIndex=0&requestedCount=0&sortCriteria=0&withDescriptionLong=0&withUserData=0";
const RESERVED_LIST_QUERY: &str = "searchCriteria=0&filter=0&startingIndex=0&requestedCount=0&sortCriteria=0&withDescriptionLong=0&withUserData=1";

#[derive(Debug, Clone)]
pub struct NasneClientOptions {
    /// Bound on every individual HTTP call.
    pub http_timeout: Duration,
    pub recorded_port: u16,
    pub not_found_event_id: i64,
}

impl Default for NasneClientOptions {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(5),
            recorded_port: DEFAULT_RECORDED_PORT,
            not_found_event_id: DEFAULT_NOT_FOUND_EVENT_ID,
        }
    }
}

/// Talks to one nasne through its structured sub-APIs and assembles a Snapshot.
pub struct NasneClient {
    base: Url,
    status_port: u16,
    recorded_port: u16,
    not_found_event_id: i64,
    http: Client,
}

impl NasneClient {
    pub fn new(base_url: &str, options: NasneClientOptions) -> Result<Self, NasneError> {
        let base = http::parse_base_url(base_url)?;
        let status_port = if http::has_explicit_port(base_url) {
            base.port_or_known_default()
        } else {
            base.port()
        }
        .unwrap_or(DEFAULT_STATUS_PORT);
        Ok(Self {
            base,
            status_port,
            recorded_port: options.recorded_port,
            not_found_event_id: options.not_found_event_id,
            http: http::build_client(options.http_timeout)?,
        })
    }

    pub fn status_port(&self) -> u16 {
        self.status_port
    }

    pub fn recorded_port(&self) -> u16 {
        self.recorded_port
    }

    /// Runs every sub-API call in order. Any unrecovered failure aborts the whole fetch.
    #[instrument(skip(self), fields(repo = "nasne", operation = "fetch_snapshot", device = %self.base))]
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, NasneError> {
        let name: BoxName = self.get_status(BOX_NAME).await?;
        let software: SoftwareVersion = self.get_status(SOFTWARE_VERSION).await?;
        let hardware: HardwareVersion = self.get_status(HARDWARE_VERSION).await?;

        let (hdd_size_bytes, hdd_usage_bytes) = self.storage_totals().await?;

        let clients: DtcpipClientList = self.get_status(DTCPIP_CLIENTS).await?;
        let box_status: BoxStatusList = self.get_status(BOX_STATUS).await?;

        let recorded: TitleList = self
            .get_with_fallback(RECORDED_TITLES, RECORDED_TITLES_QUERY)
            .await?;
        let reserved: TitleList = self
            .get_with_fallback(RESERVED_LIST, RESERVED_LIST_QUERY)
            .await?;
        let reservations = ReservationStats::from_list(&reserved, self.not_found_event_id);

        Ok(Snapshot {
            name: name.name,
            hardware_version: hardware.hardware_version_string(),
            product_name: hardware.product_name,
            software_version: software.software_version,
            hdd_size_bytes,
            hdd_usage_bytes,
            dtcpip_clients: clients.number as f64,
            recordings: recording_flag(box_status.tv_timer_info_status.now_id),
            recorded_titles: recorded.total_matches as f64,
            reserved_titles: reservations.reserved,
            reserved_conflict_titles: reservations.conflict,
            reserved_not_found_titles: reservations.not_found,
        }
        .sanitized())
    }

    /// Sums capacity over every volume the device lists.
    async fn storage_totals(&self) -> Result<(f64, f64), NasneError> {
        let list: HddList = self.get_status(HDD_LIST).await?;
        let mut total = 0.0;
        let mut used = 0.0;
        for entry in &list.hdd {
            let info: HddInfo = self
                .get_status(&format!("{}?id={}", HDD_INFO, entry.id))
                .await?;
            total += info.hdd.total_volume_size;
            used += info.hdd.used_volume_size;
        }
        debug!(volumes = list.hdd.len(), total, used, "storage totals");
        Ok((total, used))
    }

    async fn get_status<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, NasneError> {
        self.get_on(self.status_port, path_and_query, path_and_query)
            .await
    }

    /// Canonical recorded port first, then the status port once.
    async fn get_with_fallback<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
    ) -> Result<T, NasneError> {
        let path_and_query = format!("{}?{}", path, query);
        let mut last_err = None;
        for port in candidate_ports(self.recorded_port, self.status_port) {
            match self.get_on(port, &path_and_query, path).await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    debug!(port, endpoint = path, error = %e, "sub-API failed on port");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(NasneError::NoEndpoints))
    }

    async fn get_on<T: DeserializeOwned>(
        &self,
        port: u16,
        path_and_query: &str,
        label: &str,
    ) -> Result<T, NasneError> {
        let url = http::endpoint_url(&self.base, Some(port), path_and_query);
        http::get_json(&self.http, url, &format!(":{}{}", port, label)).await
    }
}

#[async_trait]
impl SnapshotFetcher for NasneClient {
    async fn fetch_snapshot(&self) -> Result<Snapshot, NasneError> {
        NasneClient::fetch_snapshot(self).await
    }
}

/// Ports to try for a call whose canonical port may be unreachable. No duplicates.
pub(crate) fn candidate_ports(canonical: u16, status: u16) -> Vec<u16> {
    if canonical == status {
        vec![canonical]
    } else {
        vec![canonical, status]
    }
}

pub(crate) fn recording_flag(now_id: i64) -> f64 {
    if now_id == RECORDING_IN_PROGRESS_ID { 1.0 } else { 0.0 }
}

/// Counters derived from a reservation list.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReservationStats {
    pub reserved: f64,
    pub conflict: f64,
    pub not_found: f64,
}

impl ReservationStats {
    /// `conflict` counts items with conflictId >= 1, `not_found` those whose eventId is the
    /// sentinel. An item may count towards both.
    pub fn from_list(list: &TitleList, not_found_event_id: i64) -> Self {
        let conflict = list.item.iter().filter(|i| i.conflict_id >= 1).count();
        let not_found = list
            .item
            .iter()
            .filter(|i| i.event_id == not_found_event_id)
            .count();
        // A device reporting fewer matches than items it returned would break conflict <= reserved.
        let reserved = list.total_matches.max(list.item.len() as i64).max(0);
        Self {
            reserved: reserved as f64,
            conflict: conflict as f64,
            not_found: not_found as f64,
        }
    }
}
