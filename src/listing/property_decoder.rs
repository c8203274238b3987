use std::collections::HashMap;

/// Decodes a `[key]: [value]` line printed by `getprop`.
pub fn parse_property_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    let rest = line.strip_prefix('[')?;
    let (key, rest) = rest.split_once("]: [")?;
    let value = rest.strip_suffix(']')?;
    Some((key.to_string(), value.to_string()))
}

/// All properties from a full `getprop` dump. Multi-line values are dropped.
pub fn decode_properties(text: &str) -> HashMap<String, String> {
    text.lines().filter_map(parse_property_line).collect()
}

/// Fields of interest from `dumpsys battery`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatteryReport {
    pub level: Option<u8>,
    pub status: Option<u8>,
    pub health: Option<u8>,
    /// Tenths of a degree Celsius, as reported.
    pub temperature: Option<i32>,
}

pub fn decode_battery(text: &str) -> BatteryReport {
    let mut report = BatteryReport::default();
    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "level" => report.level = value.parse().ok(),
            "status" => report.status = value.parse().ok(),
            "health" => report.health = value.parse().ok(),
            "temperature" => report.temperature = value.parse().ok(),
            _ => {}
        }
    }
    report
}

/// `BatteryManager.BATTERY_STATUS_*` codes.
pub fn battery_status_label(code: u8) -> &'static str {
    match code {
        2 => "Charging",
        3 => "Discharging",
        4 => "Not charging",
        5 => "Full",
        _ => "Unknown",
    }
}

/// `BatteryManager.BATTERY_HEALTH_*` codes.
pub fn battery_health_label(code: u8) -> &'static str {
    match code {
        2 => "Good",
        3 => "Overheat",
        4 => "Dead",
        5 => "Over voltage",
        6 => "Failure",
        7 => "Cold",
        _ => "Unknown",
    }
}

/// Screen size from `wm size`. An override size, when present, wins over the
/// physical one since it is what input coordinates are scaled against.
pub fn decode_screen_size(text: &str) -> Option<(u32, u32)> {
    let mut physical = None;
    let mut overridden = None;
    for line in text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let Some(size) = parse_dimensions(value.trim()) else {
            continue;
        };
        if label.contains("Override") {
            overridden = Some(size);
        } else if label.contains("Physical") {
            physical = Some(size);
        }
    }
    overridden.or(physical)
}

fn parse_dimensions(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// `MemTotal` from `/proc/meminfo`, in KB.
pub fn decode_mem_total(text: &str) -> Option<u64> {
    text.lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}

/// Total size of the filesystem in the last row of `df <path>`, in KB.
pub fn decode_df_total(text: &str) -> Option<u64> {
    let last = text.lines().rev().find(|line| !line.trim().is_empty())?;
    let column = last.split_whitespace().nth(1)?;
    column.parse().ok()
}

/// Splits batched output on the lines printed by `echo <marker>`.
pub fn split_sections(text: &str, marker: &str) -> Vec<String> {
    let mut sections = vec![String::new()];
    for line in text.lines() {
        if line.trim() == marker {
            sections.push(String::new());
        } else if let Some(current) = sections.last_mut() {
            current.push_str(line);
            current.push('\n');
        }
    }
    sections
}
