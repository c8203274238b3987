use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use super::session::DeviceSession;
use crate::command_channel::CommandChannel;
use crate::error_handling::types::BridgeError;
use crate::listing::property_decoder::{
    battery_health_label, battery_status_label, decode_battery, decode_df_total,
    decode_mem_total, decode_properties, decode_screen_size, split_sections,
};

/// Separator echoed between the sections of a batched probe.
pub const SECTION_MARKER: &str = "__droidbridge_section__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionKind {
    Usb,
    Network,
}

/// Snapshot of a device taken at discovery time. Never refreshed in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub serial: String,
    pub model: String,
    pub manufacturer: String,
    pub android_version: String,
    pub sdk_level: Option<u32>,
    pub battery_percent: Option<u8>,
    /// `WIDTHxHEIGHT`
    pub resolution: Option<String>,
    pub connection: ConnectionKind,
    pub ip_address: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl DeviceInfo {
    /// Snapshot carrying nothing but the serial, used when probing fails.
    pub fn minimal(serial: &str) -> Self {
        let (connection, ip_address) = connection_of(serial);
        DeviceInfo {
            serial: serial.to_string(),
            model: "Unknown".to_string(),
            manufacturer: "Unknown".to_string(),
            android_version: "Unknown".to_string(),
            sdk_level: None,
            battery_percent: None,
            resolution: None,
            connection,
            ip_address,
            captured_at: Utc::now(),
        }
    }

    /// `Manufacturer Model`, or just the model when it already names the maker.
    pub fn display_name(&self) -> String {
        if self
            .model
            .to_lowercase()
            .starts_with(&self.manufacturer.to_lowercase())
        {
            self.model.clone()
        } else {
            format!("{} {}", self.manufacturer, self.model)
        }
    }
}

/// Details fetched on demand, not at discovery time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceDetails {
    pub build_number: Option<String>,
    pub security_patch: Option<String>,
    pub cpu_abi: Option<String>,
    pub ram_total_kb: Option<u64>,
    pub storage_total_kb: Option<u64>,
    pub battery_status: Option<String>,
    pub battery_health: Option<String>,
    pub battery_temperature_c: Option<f32>,
}

fn connection_of(serial: &str) -> (ConnectionKind, Option<String>) {
    match serial.rsplit_once(':') {
        Some((host, _port)) => (ConnectionKind::Network, Some(host.to_string())),
        None => (ConnectionKind::Usb, None),
    }
}

/// Properties, battery level and screen size in a single round trip.
pub fn snapshot_command() -> String {
    format!(
        "getprop; echo {m}; dumpsys battery; echo {m}; wm size",
        m = SECTION_MARKER
    )
}

pub fn details_command() -> String {
    format!(
        "getprop; echo {m}; cat /proc/meminfo; echo {m}; df /data; echo {m}; dumpsys battery",
        m = SECTION_MARKER
    )
}

fn prop(props: &HashMap<String, String>, key: &str) -> Option<String> {
    props
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Builds a snapshot from the batched probe output. Missing sections leave
/// their fields unknown.
pub fn device_info_from_snapshot(serial: &str, text: &str) -> DeviceInfo {
    let sections = split_sections(text, SECTION_MARKER);
    let section = |i: usize| sections.get(i).map(String::as_str).unwrap_or_default();

    let props = decode_properties(section(0));
    let battery = decode_battery(section(1));
    let resolution = decode_screen_size(section(2)).map(|(w, h)| format!("{}x{}", w, h));

    let mut info = DeviceInfo::minimal(serial);
    if let Some(model) = prop(&props, "ro.product.model") {
        info.model = model;
    }
    if let Some(manufacturer) = prop(&props, "ro.product.manufacturer") {
        info.manufacturer = manufacturer;
    }
    if let Some(release) = prop(&props, "ro.build.version.release") {
        info.android_version = release;
    }
    info.sdk_level = prop(&props, "ro.build.version.sdk").and_then(|s| s.parse().ok());
    info.battery_percent = battery.level;
    info.resolution = resolution;
    info
}

pub fn details_from_snapshot(text: &str) -> DeviceDetails {
    let sections = split_sections(text, SECTION_MARKER);
    let section = |i: usize| sections.get(i).map(String::as_str).unwrap_or_default();

    let props = decode_properties(section(0));
    let battery = decode_battery(section(3));

    DeviceDetails {
        build_number: prop(&props, "ro.build.display.id"),
        security_patch: prop(&props, "ro.build.version.security_patch"),
        cpu_abi: prop(&props, "ro.product.cpu.abi"),
        ram_total_kb: decode_mem_total(section(1)),
        storage_total_kb: decode_df_total(section(2)),
        battery_status: battery.status.map(|c| battery_status_label(c).to_string()),
        battery_health: battery.health.map(|c| battery_health_label(c).to_string()),
        battery_temperature_c: battery.temperature.map(|t| t as f32 / 10.0),
    }
}

/// Probes a device for its discovery snapshot. Never fails: a device that
/// does not answer still gets a minimal snapshot.
pub async fn probe_device(channel: &CommandChannel, session: &DeviceSession) -> DeviceInfo {
    match channel.run(session, &snapshot_command()).await {
        Ok(text) => {
            let info = device_info_from_snapshot(session.serial(), &text);
            debug!(
                "[{}] probed {} (Android {})",
                session.serial(),
                info.display_name(),
                info.android_version
            );
            info
        }
        Err(e) => {
            warn!("[{}] device probe failed: {}", session.serial(), e);
            DeviceInfo::minimal(session.serial())
        }
    }
}

pub async fn probe_details(
    channel: &CommandChannel,
    session: &DeviceSession,
) -> Result<DeviceDetails, BridgeError> {
    let text = channel.run(session, &details_command()).await?;
    Ok(details_from_snapshot(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> String {
        format!(
            "[ro.product.model]: [Pixel 7]\n[ro.product.manufacturer]: [Google]\n\
             [ro.build.version.release]: [14]\n[ro.build.version.sdk]: [34]\n\
             {m}\n  level: 77\n  status: 3\n{m}\nPhysical size: 1080x2400\n",
            m = SECTION_MARKER
        )
    }

    #[test]
    fn test_snapshot_decoding() {
        let info = device_info_from_snapshot("emulator-5554", &snapshot());
        assert_eq!(info.model, "Pixel 7");
        assert_eq!(info.manufacturer, "Google");
        assert_eq!(info.android_version, "14");
        assert_eq!(info.sdk_level, Some(34));
        assert_eq!(info.battery_percent, Some(77));
        assert_eq!(info.resolution.as_deref(), Some("1080x2400"));
        assert_eq!(info.connection, ConnectionKind::Usb);
        assert_eq!(info.display_name(), "Google Pixel 7");
    }

    #[test]
    fn test_partial_snapshot_degrades() {
        let info = device_info_from_snapshot("192.168.1.20:5555", "error: closed\n");
        assert_eq!(info.model, "Unknown");
        assert_eq!(info.battery_percent, None);
        assert_eq!(info.connection, ConnectionKind::Network);
        assert_eq!(info.ip_address.as_deref(), Some("192.168.1.20"));
    }

    #[test]
    fn test_display_name_avoids_repeating_maker() {
        let mut info = DeviceInfo::minimal("x");
        info.manufacturer = "samsung".into();
        info.model = "SAMSUNG-SM-G900A".into();
        assert_eq!(info.display_name(), "SAMSUNG-SM-G900A");
    }

    #[test]
    fn test_details_decoding() {
        let text = format!(
            "[ro.build.display.id]: [UQ1A.240105.004]\n[ro.product.cpu.abi]: [arm64-v8a]\n\
             {m}\nMemTotal: 7812096 kB\n{m}\nFilesystem 1K-blocks Used Available Use% Mounted on\n\
             /dev/block/dm-8 115218640 1 1 1% /data\n{m}\n  status: 5\n  health: 2\n  temperature: 301\n",
            m = SECTION_MARKER
        );
        let details = details_from_snapshot(&text);
        assert_eq!(details.build_number.as_deref(), Some("UQ1A.240105.004"));
        assert_eq!(details.cpu_abi.as_deref(), Some("arm64-v8a"));
        assert_eq!(details.security_patch, None);
        assert_eq!(details.ram_total_kb, Some(7812096));
        assert_eq!(details.storage_total_kb, Some(115218640));
        assert_eq!(details.battery_status.as_deref(), Some("Full"));
        assert_eq!(details.battery_health.as_deref(), Some("Good"));
        assert_eq!(details.battery_temperature_c, Some(30.1));
    }
}
