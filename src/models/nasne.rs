// Response bodies of the nasne sub-APIs (only the fields we read).
// Every field defaults so a device omitting one decodes instead of failing.
// Numeric fields also accept null, strings and floats; anything non-numeric reads as 0.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Any JSON number as f64; null, strings, bools and containers read as 0.
fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(v.as_f64().filter(|n| n.is_finite()).unwrap_or(0.0))
}

/// Any JSON number as i64, floats truncated; everything else reads as 0.
fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v.as_i64() {
        Some(n) => n,
        None => v
            .as_f64()
            .filter(|n| n.is_finite())
            .map(|n| n as i64)
            .unwrap_or(0),
    })
}

/// GET /status/boxNameGet
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoxName {
    pub name: String,
}

/// GET /status/softwareVersionGet
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SoftwareVersion {
    pub software_version: String,
}

/// GET /status/hardwareVersionGet. `hardwareVersion` is a number on some firmware, a string on others.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HardwareVersion {
    pub hardware_version: serde_json::Value,
    pub product_name: String,
}

impl HardwareVersion {
    pub fn hardware_version_string(&self) -> String {
        match &self.hardware_version {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => String::new(),
        }
    }
}

/// GET /status/HDDListGet
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HddList {
    #[serde(rename = "HDD")]
    pub hdd: Vec<HddListEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HddListEntry {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
}

/// GET /status/HDDInfoGet?id=N
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HddInfo {
    #[serde(rename = "HDD")]
    pub hdd: HddDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HddDetail {
    #[serde(deserialize_with = "lenient_f64")]
    pub total_volume_size: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub used_volume_size: f64,
}

/// GET /status/dtcpipClientListGet
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DtcpipClientList {
    #[serde(deserialize_with = "lenient_i64")]
    pub number: i64,
}

/// GET /status/boxStatusListGet
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoxStatusList {
    pub tv_timer_info_status: TvTimerInfoStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TvTimerInfoStatus {
    #[serde(deserialize_with = "lenient_i64")]
    pub now_id: i64,
}

/// GET /recorded/titleListGet and /schedule/reservedListGet share this envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TitleList {
    #[serde(deserialize_with = "lenient_i64")]
    pub total_matches: i64,
    pub item: Vec<TitleItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TitleItem {
    #[serde(deserialize_with = "lenient_i64")]
    pub conflict_id: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub event_id: i64,
}
