//! Bridges persisted preferences to the engine's runtime settings.

use worksbill_core::EngineSettings;
use worksbill_domain::GstTreatment;

pub use worksbill_config::{Config, ConfigError, ConfigManager};

pub fn engine_settings(config: &Config) -> EngineSettings {
    EngineSettings {
        gst_treatment: if config.gst_withheld {
            GstTreatment::Withheld
        } else {
            GstTreatment::Informational
        },
        payment_requires_approval: config.payment_requires_approval,
        open_overrun_requests: config.open_overrun_requests,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_maps_to_default_settings() {
        assert_eq!(engine_settings(&Config::default()), EngineSettings::default());
    }

    #[test]
    fn policy_flags_carry_over() {
        let mut config = Config::default();
        config.set("gst_withheld", "true").expect("gst");
        config.set("payment_requires_approval", "on").expect("approval");
        let settings = engine_settings(&config);
        assert_eq!(settings.gst_treatment, GstTreatment::Withheld);
        assert!(settings.payment_requires_approval);
        assert!(!settings.open_overrun_requests);
    }
}
