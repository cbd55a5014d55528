//! `GET /settings/schema`: a machine-readable description of
//! every `RuntimeSettings` field for the UI to render a settings form.

use serde_json::{json, Value};

use fleet_types::RuntimeSettings;

pub fn describe() -> Value {
    json!({
        "fields": [
            {"name": "scan_path", "type": "string", "restart_required": true},
            {"name": "port_range", "type": "[u16, u16]", "restart_required": true},
            {"name": "binary_path", "type": "string", "restart_required": true},
            {"name": "tier_thresholds.powerful_min", "type": "f64", "restart_required": false},
            {"name": "tier_thresholds.fast_max", "type": "f64", "restart_required": false},
            {"name": "default_temperatures.fast", "type": "f32", "range": [0.0, 2.0], "restart_required": false},
            {"name": "default_temperatures.balanced", "type": "f32", "range": [0.0, 2.0], "restart_required": false},
            {"name": "default_temperatures.powerful", "type": "f32", "range": [0.0, 2.0], "restart_required": false},
            {"name": "cgrag_token_budget", "type": "usize", "restart_required": false},
            {"name": "benchmark_defaults.rounds", "type": "u32", "restart_required": false},
            {"name": "benchmark_defaults.timeout_seconds", "type": "u64", "restart_required": false},
            {"name": "concurrent_calls_cap", "type": "usize", "restart_required": false},
        ],
        "restart_required_fields": RuntimeSettings::RESTART_REQUIRED_FIELDS,
        "defaults": RuntimeSettings::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_includes_restart_required_fields() {
        let schema = describe();
        assert_eq!(schema["restart_required_fields"].as_array().unwrap().len(), 3);
    }
}
