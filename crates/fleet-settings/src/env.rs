//! Environment variable overlay.
//!
//! Two layers: a handful of named vars applied directly
//! (`SCAN_PATH`, `INFERENCE_BINARY_PATH`, `PORT_RANGE_START`/`_END`), applied
//! first for exact field names, then a generic `FLEET__`-prefixed layer via
//! the `config` crate's multi-format loader for any other field an operator
//! wants to override without editing the file.

use fleet_types::RuntimeSettings;

/// Applies the documented named env vars directly onto `settings`.
pub fn apply_named_vars(settings: &mut RuntimeSettings) {
    if let Ok(v) = std::env::var("SCAN_PATH") {
        settings.scan_path = v;
    }
    if let Ok(v) = std::env::var("INFERENCE_BINARY_PATH") {
        settings.binary_path = v;
    }
    let start = std::env::var("PORT_RANGE_START").ok().and_then(|v| v.parse::<u16>().ok());
    let end = std::env::var("PORT_RANGE_END").ok().and_then(|v| v.parse::<u16>().ok());
    match (start, end) {
        (Some(start), Some(end)) => settings.port_range = (start, end),
        (Some(start), None) => settings.port_range.0 = start,
        (None, Some(end)) => settings.port_range.1 = end,
        (None, None) => {}
    }
}

/// Builds a JSON overlay from any `FLEET__field__subfield`-style
/// environment variable and deep-merges it onto `settings`. Unset/unparsed
/// variables leave `settings` untouched — this layer is best-effort.
pub fn apply_prefixed_overlay(settings: &mut RuntimeSettings) {
    let source = config::Environment::with_prefix("FLEET").separator("__");
    let Ok(built) = config::Config::builder().add_source(source).build() else {
        return;
    };
    let Ok(overlay) = built.try_deserialize::<serde_json::Value>() else {
        return;
    };
    if overlay.is_null() {
        return;
    }

    let Ok(mut base) = serde_json::to_value(&*settings) else {
        return;
    };
    merge(&mut base, overlay);
    if let Ok(merged) = serde_json::from_value::<RuntimeSettings>(base) {
        *settings = merged;
    }
}

fn merge(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                merge(base_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (slot, value) => {
            if !value.is_null() {
                *slot = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // std::env mutation is process-global; serialize these tests.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn named_vars_override_scan_path_and_ports() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("SCAN_PATH", "/mnt/models");
        std::env::set_var("PORT_RANGE_START", "9000");
        std::env::set_var("PORT_RANGE_END", "9100");

        let mut settings = RuntimeSettings::default();
        apply_named_vars(&mut settings);

        assert_eq!(settings.scan_path, "/mnt/models");
        assert_eq!(settings.port_range, (9000, 9100));

        std::env::remove_var("SCAN_PATH");
        std::env::remove_var("PORT_RANGE_START");
        std::env::remove_var("PORT_RANGE_END");
    }

    #[test]
    fn prefixed_overlay_overrides_nested_field() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("FLEET__CGRAG_TOKEN_BUDGET", "9999");

        let mut settings = RuntimeSettings::default();
        apply_prefixed_overlay(&mut settings);
        assert_eq!(settings.cgrag_token_budget, 9999);

        std::env::remove_var("FLEET__CGRAG_TOKEN_BUDGET");
    }

    #[test]
    fn absent_vars_leave_settings_untouched() {
        let _guard = ENV_LOCK.lock().unwrap();
        let before = RuntimeSettings::default();
        let mut settings = RuntimeSettings::default();
        apply_named_vars(&mut settings);
        apply_prefixed_overlay(&mut settings);
        assert_eq!(settings.scan_path, before.scan_path);
        assert_eq!(settings.cgrag_token_budget, before.cgrag_token_budget);
    }
}
