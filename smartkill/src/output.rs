//! Output formatting: plain text (human-readable) and JSON.

use serde_json::Value;
use smartkill_lib::{format_timestamp_display, Activity, Entity, Trap};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable tables and key-value
    #[default]
    Plain,
    /// JSON (pretty-printed, server key casing)
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "text" | "p" => Ok(OutputFormat::Plain),
            "json" | "j" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

/// Encode entities back to the server's JSON shape.
pub fn entities_to_json<T: Entity>(items: &[T]) -> Result<Value, serde_json::Error> {
    items
        .iter()
        .map(T::to_json)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// Traps sorted by name: index, name, ssid, status, battery, kills present.
pub fn format_traps(traps: &[Trap]) -> String {
    if traps.is_empty() {
        return "<empty>\n".to_string();
    }
    let mut sorted: Vec<&Trap> = traps.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>2} {:<30} {:>10} {:>3} {:>3} {:>3}",
        "#", "NAME", "SSID", "ST", "BAT", "KIL"
    );
    for (n, trap) in sorted.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2} {:<30} {:>10} {:>3} {:>3} {:>3}",
            n,
            truncate(&trap.name, 30),
            truncate(&trap.ssid, 10),
            trap.status,
            trap.trapstatistics.battery_level,
            trap.trapstatistics.kills_present,
        );
    }
    out
}

/// One trap with its statistics and derived values.
pub fn format_trap(trap: &Trap, use_utc: bool) -> String {
    let stats = &trap.trapstatistics;
    let mut out = String::new();
    let _ = writeln!(out, "id: {}", trap.id);
    let _ = writeln!(out, "name: {}", trap.name);
    let _ = writeln!(out, "serial_number: {}", trap.serial_number);
    let _ = writeln!(out, "ssid: {}", trap.ssid);
    let _ = writeln!(out, "location: {}", trap.location);
    let _ = writeln!(out, "status: {}", trap.status);
    let _ = writeln!(out, "trap_type: {}", trap.trap_type_verbose);
    let _ = writeln!(
        out,
        "corruption_status: {} ({})",
        trap.corruption_status,
        trap.corruption_status_verbose().unwrap_or("-")
    );
    let _ = writeln!(out, "alerts: {}", trap.alerts);
    let _ = writeln!(out, "statistics:");
    let _ = writeln!(out, "  kills_present: {}", stats.kills_present);
    let _ = writeln!(out, "  total_kills: {}", opt(stats.total_kills));
    let _ = writeln!(out, "  battery_level: {}", stats.battery_level);
    let _ = writeln!(out, "  temperature: {:.1} °C", stats.temperature_celcius());
    let _ = writeln!(out, "  firmware_version: {}", stats.firmware_version);
    let _ = writeln!(
        out,
        "  install_date: {}",
        format_timestamp_display(&stats.install_date, use_utc)
    );
    let _ = writeln!(
        out,
        "  last_report_date: {}",
        format_timestamp_display(&stats.last_report_date, use_utc)
    );
    let last_kill = stats
        .last_kill_date
        .map(|d| format_timestamp_display(&d, use_utc))
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(out, "  last_kill_date: {}", last_kill);
    out
}

/// Activity history: sequence, time, type, text, battery, rat kill.
pub fn format_history(records: &[Activity], use_utc: bool) -> String {
    if records.is_empty() {
        return "<empty>\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6} {:<25} {:>4} {:<24} {:>3} {:<5}",
        "SEQ", "TIME", "TYPE", "TEXT", "BAT", "RAT"
    );
    for act in records {
        let _ = writeln!(
            out,
            "{:>6} {:<25} {:>4} {:<24} {:>3} {:<5}",
            act.sequence_number,
            format_timestamp_display(&act.time_stamp, use_utc),
            act.activity_type,
            truncate(&act.activity_type_text, 24),
            act.battery_level,
            act.is_rat_kill,
        );
    }
    out
}

/// Format value as plain text (tables for arrays of objects, key-value for objects).
pub fn format_plain(value: &Value) -> String {
    let mut out = String::new();
    format_plain_impl(value, &mut out, 0);
    out
}

fn format_plain_impl(v: &Value, out: &mut String, indent: usize) {
    let pad = "  ".repeat(indent);
    match v {
        Value::Array(arr) => {
            if arr.is_empty() {
                let _ = writeln!(out, "{}<empty>", pad);
                return;
            }
            for (i, item) in arr.iter().enumerate() {
                if item.is_object() || item.is_array() {
                    let _ = writeln!(out, "{}[{}]", pad, i + 1);
                    format_plain_impl(item, out, indent + 1);
                } else {
                    let _ = writeln!(out, "{}{}", pad, as_short_str(item));
                }
            }
        }
        Value::Object(map) => {
            for (k, val) in map {
                if val.is_object() || val.is_array() {
                    let _ = writeln!(out, "{}{}:", pad, k);
                    format_plain_impl(val, out, indent + 1);
                } else {
                    let _ = writeln!(out, "{}{}: {}", pad, k, as_short_str(val));
                }
            }
        }
        scalar => {
            let _ = writeln!(out, "{}{}", pad, as_short_str(scalar));
        }
    }
}

fn as_short_str(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max {
        s
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

/// Format value as JSON (pretty).
pub fn format_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smartkill_lib::ResponseDecoder;

    fn trap(id: u64, name: &str) -> Trap {
        let mut raw: Value =
            serde_json::from_str(include_str!("../../smartkill_lib/tests/fixtures/trap.json"))
                .unwrap();
        raw["id"] = json!(id);
        raw["name"] = json!(name);
        ResponseDecoder::default().decode(&raw).unwrap()
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!(
            "plain".parse::<OutputFormat>().unwrap(),
            OutputFormat::Plain
        );
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("p".parse::<OutputFormat>().unwrap(), OutputFormat::Plain);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Plain);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn format_traps_sorted_by_name() {
        let out = format_traps(&[trap(2, "Shed"), trap(1, "Attic")]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with(" 0 Attic"));
        assert!(lines[2].starts_with(" 1 Shed"));
        assert!(lines[1].contains("HomeNet"));
    }

    #[test]
    fn format_traps_empty() {
        assert_eq!(format_traps(&[]), "<empty>\n");
    }

    #[test]
    fn format_trap_shows_derived_values() {
        let out = format_trap(&trap(1, "Garage"), true);
        assert!(out.contains("corruption_status: 0 (Normal)"));
        assert!(out.contains("temperature: 23.1 °C"));
        assert!(out.contains("last_kill_date: 2020-10-03 22:41:56"));
    }

    #[test]
    fn entities_encode_with_server_keys() {
        let value = entities_to_json(&[trap(1, "Garage")]).unwrap();
        assert_eq!(value[0]["name"], "Garage");
        assert!(value[0]["trapstatistics"].is_object());
        assert!(value[0].get("_unknown").is_none());
    }

    #[test]
    fn format_plain_object() {
        let v = json!({"name": "smartkill", "count": 1, "gone": null});
        let out = format_plain(&v);
        assert!(out.contains("name: smartkill"));
        assert!(out.contains("count: 1"));
        assert!(out.contains("gone: null"));
    }

    #[test]
    fn format_plain_nested_list() {
        let out = format_plain(&json!([{"id": 1}, {"id": 2}]));
        assert!(out.contains("[1]\n  id: 1"));
        assert!(out.contains("[2]\n  id: 2"));
        assert!(format_plain(&json!([])).contains("<empty>"));
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("Küche", 10), "Küche");
        assert_eq!(truncate("Kitchen Left Corner", 8), "Kitchen…");
    }

    #[test]
    fn format_json_pretty() {
        let v = json!({"x": 1, "y": [2, 3]});
        let s = format_json(&v).unwrap();
        assert!(s.contains('\n'));
        let parsed: Value = serde_json::from_str(&s).unwrap();
        assert_eq!(parsed, v);
    }
}
