//! Configuration panel: model selection and the two sampling sliders.

use crate::catalog::ModelCatalog;
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::state::Configuration;

/// Bounds, step and default of a numeric slider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderSpec {
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
    pub help: &'static str,
}

pub const TEMPERATURE: SliderSpec = SliderSpec {
    label: "Temperature",
    min: 0.0,
    max: 2.0,
    step: 0.01,
    default: 0.7,
    help: "Controls the 'creativity' of the model. Higher values mean more random outputs.",
};

pub const TOP_P: SliderSpec = SliderSpec {
    label: "Top P",
    min: 0.0,
    max: 1.0,
    step: 0.01,
    default: 0.9,
    help: "Controls the diversity of the output. Lower values mean less diverse but more focused outputs.",
};

impl SliderSpec {
    /// Clamps to the range and snaps to the nearest step from `min`.
    /// NaN falls back to the default.
    pub fn quantize(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.default;
        }

        let clamped = value.clamp(self.min, self.max);
        let steps = ((clamped - self.min) / self.step).round();
        let snapped = self.min + steps * self.step;

        // Strip accumulated float noise so 70 steps of 0.01 read back as 0.7
        let scale = (1.0 / self.step).round();
        ((snapped * scale).round() / scale).clamp(self.min, self.max)
    }

    /// Moves `steps` slider positions from `value`, staying in range.
    pub fn nudge(&self, value: f64, steps: i32) -> f64 {
        self.quantize(value + f64::from(steps) * self.step)
    }

    /// Fraction of the range covered by `value`, for gauges.
    pub fn ratio(&self, value: f64) -> f64 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

/// A single user edit in the sidebar.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigChange {
    SelectModel(Option<String>),
    SetTemperature(f64),
    SetTopP(f64),
}

/// How a model gets chosen when the user has not picked one that is installed.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPolicy {
    pub default_model: Option<String>,
    pub auto_select_first: bool,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::from_config(&Config::new())
    }
}

impl SelectionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_model: config.default_model.clone(),
            auto_select_first: config.auto_select_first_model,
        }
    }

    fn pick(&self, catalog: &ModelCatalog) -> Option<String> {
        match &self.default_model {
            Some(model) if catalog.contains(model) => Some(model.clone()),
            _ if self.auto_select_first => catalog.first().map(str::to_string),
            _ => None,
        }
    }

    /// Keeps an installed selection. A stale one, or an empty one on the
    /// first catalog load, is replaced by the policy's pick.
    pub fn reconcile(&self, config: &mut Configuration, catalog: &ModelCatalog, first_load: bool) {
        let replace = match &config.selected_model {
            Some(model) => !catalog.contains(model),
            None => first_load,
        };

        if replace {
            let picked = self.pick(catalog);
            if picked != config.selected_model {
                tracing::debug!(from = ?config.selected_model, to = ?picked, "model selection changed by refresh");
            }
            config.selected_model = picked;
        }
    }
}

/// Writes one edit into the configuration immediately.
pub fn apply_change(config: &mut Configuration, catalog: &ModelCatalog, change: ConfigChange) -> Result<()> {
    match change {
        ConfigChange::SelectModel(Some(model)) => {
            if !catalog.contains(&model) {
                return Err(ChatError::UnknownModel(model));
            }
            config.selected_model = Some(model);
        }
        ConfigChange::SelectModel(None) => config.selected_model = None,
        ConfigChange::SetTemperature(value) => config.temperature = TEMPERATURE.quantize(value),
        ConfigChange::SetTopP(value) => config.top_p = TOP_P.quantize(value),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ModelCatalog {
        ModelCatalog::new(vec!["llama3".to_string(), "mistral".to_string()])
    }

    fn on_grid(spec: &SliderSpec, value: f64) -> bool {
        let steps = (value - spec.min) / spec.step;
        (steps - steps.round()).abs() < 1e-6
    }

    #[test]
    fn test_defaults_are_exact() {
        assert_eq!(TEMPERATURE.quantize(0.7), 0.7);
        assert_eq!(TOP_P.quantize(0.9), 0.9);
        assert_eq!(Configuration::default().temperature, 0.7);
        assert_eq!(Configuration::default().top_p, 0.9);
    }

    #[test]
    fn test_quantize_clamps_and_snaps() {
        assert_eq!(TEMPERATURE.quantize(-1.0), 0.0);
        assert_eq!(TEMPERATURE.quantize(5.0), 2.0);
        assert_eq!(TOP_P.quantize(1.5), 1.0);
        assert_eq!(TEMPERATURE.quantize(0.704), 0.7);
        assert_eq!(TEMPERATURE.quantize(0.706), 0.71);
        assert_eq!(TOP_P.quantize(f64::NAN), 0.9);
        assert_eq!(TOP_P.quantize(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_every_input_lands_on_grid_within_bounds() {
        for spec in [TEMPERATURE, TOP_P] {
            for i in -300..=300 {
                let value = spec.quantize(f64::from(i) * 0.00733);
                assert!(value >= spec.min && value <= spec.max, "{} out of range: {}", spec.label, value);
                assert!(on_grid(&spec, value), "{} off grid: {}", spec.label, value);
            }
        }
    }

    #[test]
    fn test_nudge_moves_one_step() {
        assert_eq!(TEMPERATURE.nudge(0.7, 1), 0.71);
        assert_eq!(TEMPERATURE.nudge(0.7, -10), 0.6);
        assert_eq!(TOP_P.nudge(1.0, 1), 1.0);
        assert_eq!(TOP_P.nudge(0.0, -1), 0.0);
    }

    #[test]
    fn test_ratio_spans_the_range() {
        assert_eq!(TEMPERATURE.ratio(0.0), 0.0);
        assert_eq!(TEMPERATURE.ratio(1.0), 0.5);
        assert_eq!(TOP_P.ratio(0.9), 0.9);
        assert_eq!(TOP_P.ratio(3.0), 1.0);
    }

    #[test]
    fn test_select_unknown_model_rejected() {
        let mut config = Configuration::default();
        let result = apply_change(&mut config, &catalog(), ConfigChange::SelectModel(Some("phi3".into())));
        assert_eq!(result, Err(ChatError::UnknownModel("phi3".into())));
        assert_eq!(config.selected_model, None);
    }

    #[test]
    fn test_changes_written_immediately() {
        let mut config = Configuration::default();
        apply_change(&mut config, &catalog(), ConfigChange::SelectModel(Some("mistral".into()))).unwrap();
        apply_change(&mut config, &catalog(), ConfigChange::SetTemperature(1.234)).unwrap();
        apply_change(&mut config, &catalog(), ConfigChange::SetTopP(0.5)).unwrap();

        assert_eq!(config.selected_model.as_deref(), Some("mistral"));
        assert_eq!(config.temperature, 1.23);
        assert_eq!(config.top_p, 0.5);
    }

    #[test]
    fn test_first_load_selects_first_model() {
        let policy = SelectionPolicy {
            default_model: None,
            auto_select_first: true,
        };
        let mut config = Configuration::default();
        policy.reconcile(&mut config, &catalog(), true);
        assert_eq!(config.selected_model.as_deref(), Some("llama3"));
    }

    #[test]
    fn test_default_policy_follows_default_config() {
        let policy = SelectionPolicy::default();
        assert_eq!(policy, SelectionPolicy::from_config(&Config::new()));
        assert!(policy.auto_select_first);

        let mut config = Configuration::default();
        policy.reconcile(&mut config, &catalog(), true);
        assert_eq!(config.selected_model.as_deref(), Some("llama3"));
    }

    #[test]
    fn test_configured_default_preferred_when_installed() {
        let policy = SelectionPolicy {
            default_model: Some("mistral".into()),
            auto_select_first: true,
        };
        let mut config = Configuration::default();
        policy.reconcile(&mut config, &catalog(), true);
        assert_eq!(config.selected_model.as_deref(), Some("mistral"));

        let policy = SelectionPolicy {
            default_model: Some("phi3".into()),
            auto_select_first: false,
        };
        let mut config = Configuration::default();
        policy.reconcile(&mut config, &catalog(), true);
        assert_eq!(config.selected_model, None);
    }

    #[test]
    fn test_explicit_none_survives_later_refreshes() {
        let policy = SelectionPolicy {
            default_model: None,
            auto_select_first: true,
        };
        let mut config = Configuration::default();
        policy.reconcile(&mut config, &catalog(), false);
        assert_eq!(config.selected_model, None);
    }

    #[test]
    fn test_stale_selection_replaced() {
        let policy = SelectionPolicy {
            default_model: None,
            auto_select_first: true,
        };
        let mut config = Configuration {
            selected_model: Some("removed-model".into()),
            ..Configuration::default()
        };
        policy.reconcile(&mut config, &catalog(), false);
        assert_eq!(config.selected_model.as_deref(), Some("llama3"));
    }
}
