use std::{collections::HashMap, fs, time::Duration};

use catalog_api::{LatencyProfile, UnscopedListing};
use shared::domain::Identity;
use storage::seed::DEMO_OWNER_ID;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub mock_owner_id: String,
    pub mock_owner_label: String,
    pub auth_bypass: bool,
    pub seed_demo_data: bool,
    pub unscoped_listing: UnscopedListing,
    pub latency: LatencyProfile,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8443".into(),
            mock_owner_id: DEMO_OWNER_ID.into(),
            mock_owner_label: "admin@example.com".into(),
            auth_bypass: true,
            seed_demo_data: true,
            unscoped_listing: UnscopedListing::default(),
            latency: LatencyProfile::default(),
        }
    }
}

impl Settings {
    /// The identity assumed when a request names no owner.
    pub fn session_identity(&self) -> Option<Identity> {
        if !self.auth_bypass || self.mock_owner_id.trim().is_empty() {
            return None;
        }
        Some(Identity::new(
            self.mock_owner_id.clone(),
            self.mock_owner_label.clone(),
        ))
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        match parse_file(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, &file_cfg),
            Err(err) => warn!(%err, "ignoring malformed server.toml"),
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Flattens the top-level table to strings so that `auth_bypass = false` and
/// `auth_bypass = "false"` read the same.
fn parse_file(raw: &str) -> Result<HashMap<String, String>, toml::de::Error> {
    let table = toml::from_str::<HashMap<String, toml::Value>>(raw)?;
    let mut file_cfg = HashMap::with_capacity(table.len());
    for (key, value) in table {
        let value = match value {
            toml::Value::String(v) => v,
            toml::Value::Integer(v) => v.to_string(),
            toml::Value::Float(v) => v.to_string(),
            toml::Value::Boolean(v) => v.to_string(),
            other => {
                warn!(key = %key, kind = other.type_str(), "ignoring non-scalar server.toml entry");
                continue;
            }
        };
        file_cfg.insert(key, value);
    }
    Ok(file_cfg)
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("mock_owner_id") {
        settings.mock_owner_id = v.clone();
    }
    if let Some(v) = file_cfg.get("mock_owner_label") {
        settings.mock_owner_label = v.clone();
    }
    if let Some(v) = file_cfg.get("auth_bypass") {
        apply_flag(&mut settings.auth_bypass, "auth_bypass", v);
    }
    if let Some(v) = file_cfg.get("seed_demo_data") {
        apply_flag(&mut settings.seed_demo_data, "seed_demo_data", v);
    }
    if let Some(v) = file_cfg.get("unscoped_listing") {
        apply_policy(settings, v);
    }
    for (key, slot) in latency_slots(&mut settings.latency) {
        if let Some(v) = file_cfg.get(&format!("latency_{key}_ms")) {
            apply_millis(slot, key, v);
        }
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = lookup("APP__MOCK_OWNER_ID") {
        settings.mock_owner_id = v;
    }
    if let Some(v) = lookup("APP__MOCK_OWNER_LABEL") {
        settings.mock_owner_label = v;
    }

    if let Some(v) = lookup("APP__AUTH_BYPASS") {
        apply_flag(&mut settings.auth_bypass, "APP__AUTH_BYPASS", &v);
    }
    if let Some(v) = lookup("APP__SEED_DEMO_DATA") {
        apply_flag(&mut settings.seed_demo_data, "APP__SEED_DEMO_DATA", &v);
    }
    if let Some(v) = lookup("APP__UNSCOPED_LISTING") {
        apply_policy(settings, &v);
    }

    for (key, slot) in latency_slots(&mut settings.latency) {
        let var = format!("APP__LATENCY_{}_MS", key.to_ascii_uppercase());
        if let Some(v) = lookup(&var) {
            apply_millis(slot, &var, &v);
        }
    }
}

fn latency_slots(latency: &mut LatencyProfile) -> [(&'static str, &mut Duration); 4] {
    [
        ("list", &mut latency.list),
        ("get", &mut latency.get),
        ("categories", &mut latency.categories),
        ("create", &mut latency.create),
    ]
}

fn apply_flag(slot: &mut bool, key: &str, raw: &str) {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => *slot = true,
        "0" | "false" | "no" | "off" => *slot = false,
        _ => warn!(key, value = raw, "ignoring unparseable flag"),
    }
}

fn apply_policy(settings: &mut Settings, raw: &str) {
    match raw.parse::<UnscopedListing>() {
        Ok(policy) => settings.unscoped_listing = policy,
        Err(err) => warn!(%err, "keeping default unscoped listing policy"),
    }
}

fn apply_millis(slot: &mut Duration, key: &str, raw: &str) {
    match raw.trim().parse::<u64>() {
        Ok(ms) => *slot = Duration::from_millis(ms),
        Err(_) => warn!(key, value = raw, "ignoring unparseable latency"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
