//! Build script for airwatch-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates agent.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate agent.toml at compile time
///
/// Mirrors the runtime checks in `AgentConfig::validate` so a bad file
/// fails the build instead of halting the device at boot.
fn validate_config() {
    println!("cargo:rerun-if-changed=agent.toml");

    let config_path = Path::new("agent.toml");

    if !config_path.exists() {
        fail(
            "agent.toml not found",
            &["The firmware embeds agent.toml from the airwatch-firmware directory."],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read agent.toml", &[&e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let msg = e.to_string();
            let lines: Vec<&str> = msg.lines().collect();
            fail("Invalid TOML syntax in agent.toml", &lines)
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_credentials(&config, &mut errors);
    validate_clock(&config, &mut errors);
    validate_schedule(&config, &mut errors);
    validate_display(&config, &mut errors);

    if !errors.is_empty() {
        let lines: Vec<&str> = errors.iter().map(String::as_str).collect();
        fail("Invalid configuration in agent.toml", &lines);
    }

    println!("cargo:warning=agent.toml validated successfully");
}

/// Abort the build with a boxed error message
fn fail(title: &str, lines: &[&str]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let truncated = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.to_string()
            };
            format!("║  • {:<62} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");

    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}

const SECTIONS: &[&str] = &["wifi", "broker", "clock", "schedule", "display", "telemetry"];

fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(table) = config.as_table() else {
        errors.push("top level must be a table".to_string());
        return;
    };

    for (name, value) in table {
        if !SECTIONS.contains(&name.as_str()) {
            errors.push(format!("unknown section [{}]", name));
        } else if !value.is_table() {
            errors.push(format!("[{}] must be a table", name));
        }
    }
}

fn get<'a>(config: &'a toml::Value, section: &str, key: &str) -> Option<&'a toml::Value> {
    config.get(section).and_then(|s| s.get(key))
}

fn integer(config: &toml::Value, section: &str, key: &str, errors: &mut Vec<String>) -> Option<i64> {
    match get(config, section, key) {
        None => None,
        Some(toml::Value::Integer(v)) => Some(*v),
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            None
        }
    }
}

fn validate_credentials(config: &toml::Value, errors: &mut Vec<String>) {
    let required = [
        ("wifi", "ssid"),
        ("broker", "host"),
        ("broker", "client_id"),
        ("broker", "password"),
        ("broker", "channel_id"),
    ];

    for (section, key) in required {
        match get(config, section, key) {
            Some(toml::Value::String(s)) if !s.is_empty() => {}
            Some(toml::Value::String(_)) | None => {
                errors.push(format!("[{}] missing '{}'", section, key));
            }
            Some(_) => errors.push(format!("[{}] {} must be a string", section, key)),
        }
    }

    if let Some(toml::Value::String(ssid)) = get(config, "wifi", "ssid") {
        if ssid.len() > 32 {
            errors.push("[wifi] ssid longer than 32 bytes".to_string());
        }
    }

    if let Some(port) = integer(config, "broker", "port", errors) {
        if !(1..=65_535).contains(&port) {
            errors.push("[broker] port must be 1-65535".to_string());
        }
    }
}

fn validate_clock(config: &toml::Value, errors: &mut Vec<String>) {
    if let Some(tz) = integer(config, "clock", "tz_offset_hours", errors) {
        if !(-12..=14).contains(&tz) {
            errors.push("[clock] tz_offset_hours must be -12..=14".to_string());
        }
    }
    if let Some(attempts) = integer(config, "clock", "sync_attempts", errors) {
        if !(0..=255).contains(&attempts) {
            errors.push("[clock] sync_attempts must be 0-255".to_string());
        }
    }
    if let Some(resync) = integer(config, "clock", "resync_interval_s", errors) {
        if resync < 0 {
            errors.push("[clock] resync_interval_s cannot be negative".to_string());
        }
    }
}

fn validate_schedule(config: &toml::Value, errors: &mut Vec<String>) {
    let reading_ms = integer(config, "schedule", "reading_interval_ms", errors).unwrap_or(1000);
    let publish_s = integer(config, "schedule", "publish_interval_s", errors).unwrap_or(1800);
    let max_retries = integer(config, "schedule", "max_retries", errors).unwrap_or(3);
    let retry_delay_s = integer(config, "schedule", "retry_delay_s", errors).unwrap_or(5);

    if reading_ms <= 0 {
        errors.push("[schedule] reading_interval_ms must be positive".to_string());
    }
    if publish_s <= 0 {
        errors.push("[schedule] publish_interval_s must be positive".to_string());
    } else if publish_s * 1000 < reading_ms {
        errors.push("[schedule] publish interval shorter than reading interval".to_string());
    }
    if !(0..=255).contains(&max_retries) {
        errors.push("[schedule] max_retries must be 0-255".to_string());
    }
    if max_retries > 0 && (retry_delay_s <= 0 || retry_delay_s >= publish_s) {
        errors.push("[schedule] retry_delay_s must be 1..publish_interval_s".to_string());
    }
}

fn validate_display(config: &toml::Value, errors: &mut Vec<String>) {
    let max = integer(config, "display", "max", errors).unwrap_or(4);
    let low = integer(config, "display", "low_threshold", errors).unwrap_or(1);

    if low < 0 || max <= low {
        errors.push("[display] needs max > low_threshold >= 0".to_string());
    }
}
