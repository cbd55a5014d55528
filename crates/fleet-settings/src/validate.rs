//! Schema validation for `RuntimeSettings` ("validated against a
//! schema on load and on every `Put`").

use fleet_types::RuntimeSettings;

use crate::error::SettingsError;

pub fn validate(settings: &RuntimeSettings) -> Result<(), SettingsError> {
    if settings.scan_path.trim().is_empty() {
        return Err(SettingsError::Validation("scan_path must not be empty".to_string()));
    }
    if settings.binary_path.trim().is_empty() {
        return Err(SettingsError::Validation("binary_path must not be empty".to_string()));
    }
    let (lo, hi) = settings.port_range;
    if lo == 0 || hi == 0 || lo > hi {
        return Err(SettingsError::Validation(format!(
            "port_range ({lo}, {hi}) must have a non-zero start <= end"
        )));
    }
    if settings.tier_thresholds.fast_max <= 0.0 {
        return Err(SettingsError::Validation("tier_thresholds.fast_max must be positive".to_string()));
    }
    if settings.tier_thresholds.powerful_min <= 0.0 {
        return Err(SettingsError::Validation("tier_thresholds.powerful_min must be positive".to_string()));
    }
    if settings.tier_thresholds.fast_max > settings.tier_thresholds.powerful_min {
        return Err(SettingsError::Validation(
            "tier_thresholds.fast_max must not exceed tier_thresholds.powerful_min".to_string(),
        ));
    }
    for (label, value) in [
        ("fast", settings.default_temperatures.fast),
        ("balanced", settings.default_temperatures.balanced),
        ("powerful", settings.default_temperatures.powerful),
    ] {
        if !(0.0..=2.0).contains(&value) {
            return Err(SettingsError::Validation(format!(
                "default_temperatures.{label} ({value}) must be within 0.0..=2.0"
            )));
        }
    }
    if settings.cgrag_token_budget == 0 {
        return Err(SettingsError::Validation("cgrag_token_budget must be positive".to_string()));
    }
    if settings.benchmark_defaults.rounds == 0 {
        return Err(SettingsError::Validation("benchmark_defaults.rounds must be positive".to_string()));
    }
    if settings.benchmark_defaults.timeout_seconds == 0 {
        return Err(SettingsError::Validation("benchmark_defaults.timeout_seconds must be positive".to_string()));
    }
    if settings.concurrent_calls_cap == 0 {
        return Err(SettingsError::Validation("concurrent_calls_cap must be positive".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(validate(&RuntimeSettings::default()).is_ok());
    }

    #[test]
    fn rejects_inverted_port_range() {
        let mut s = RuntimeSettings::default();
        s.port_range = (9000, 8000);
        assert!(validate(&s).is_err());
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let mut s = RuntimeSettings::default();
        s.default_temperatures.powerful = 3.0;
        assert!(validate(&s).is_err());
    }

    #[test]
    fn rejects_fast_max_above_powerful_min() {
        let mut s = RuntimeSettings::default();
        s.tier_thresholds.fast_max = 100.0;
        s.tier_thresholds.powerful_min = 5.0;
        assert!(validate(&s).is_err());
    }

    #[test]
    fn rejects_zero_cgrag_budget() {
        let mut s = RuntimeSettings::default();
        s.cgrag_token_budget = 0;
        assert!(validate(&s).is_err());
    }
}
