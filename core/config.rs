/*!
This module defines the `Config` struct, which is used to configure training a model with [`train`](../train/fn.train.html). Every field is optional, and a missing field takes its default value.

A config file is JSON if its extension is `.json` and YAML otherwise:

```yaml
test_fraction: 0.2
seed: 42
brand_smoothing: 15
random_forest:
  n_trees: 100
meta:
  n_rounds: 200
```
*/

use anyhow::{Context, Result};
use autovalue_features::BrandTiers;
use autovalue_tree::{GradientBoostingTrainOptions, MaxFeatures, RandomForestTrainOptions};
use std::path::Path;

#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
	pub test_fraction: Option<f64>,
	pub seed: Option<u64>,
	pub outlier_multiplier: Option<f64>,
	pub brand_smoothing: Option<f64>,
	pub n_folds: Option<usize>,
	pub brand_tiers: Option<BrandTiers>,
	pub random_forest: Option<RandomForestConfig>,
	pub gradient_boosting: Option<GradientBoostingConfig>,
	pub meta: Option<GradientBoostingConfig>,
}

#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomForestConfig {
	pub n_trees: Option<usize>,
	pub max_depth: Option<usize>,
	pub max_leaf_nodes: Option<usize>,
	pub min_examples_to_split: Option<usize>,
	pub min_examples_per_child: Option<usize>,
	pub max_features: Option<MaxFeatures>,
	pub bootstrap: Option<bool>,
	pub max_valid_bins: Option<u8>,
	pub seed: Option<u64>,
}

#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradientBoostingConfig {
	pub n_rounds: Option<usize>,
	pub learning_rate: Option<f32>,
	pub max_depth: Option<usize>,
	pub max_leaf_nodes: Option<usize>,
	pub min_examples_to_split: Option<usize>,
	pub min_examples_per_child: Option<usize>,
	pub l2_regularization: Option<f32>,
	pub min_gain_to_split: Option<f32>,
	pub subsample: Option<f32>,
	pub column_subsample: Option<f32>,
	pub max_valid_bins: Option<u8>,
	pub seed: Option<u64>,
}

pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_OUTLIER_MULTIPLIER: f64 = 3.0;
pub const DEFAULT_N_FOLDS: usize = 5;

impl Config {
	/// Read a config file, choosing the format from the file's extension.
	pub fn from_path(path: &Path) -> Result<Config> {
		let config = std::fs::read_to_string(path)
			.with_context(|| format!("failed to read config file {}", path.display()))?;
		let is_json = path
			.extension()
			.map(|extension| extension.eq_ignore_ascii_case("json"))
			.unwrap_or(false);
		let config = if is_json {
			serde_json::from_str(&config)
				.with_context(|| format!("failed to parse config file {}", path.display()))?
		} else {
			serde_yaml::from_str(&config)
				.with_context(|| format!("failed to parse config file {}", path.display()))?
		};
		Ok(config)
	}

	pub fn test_fraction(&self) -> f64 {
		self.test_fraction.unwrap_or(DEFAULT_TEST_FRACTION)
	}

	pub fn seed(&self) -> u64 {
		self.seed.unwrap_or(DEFAULT_SEED)
	}

	pub fn outlier_multiplier(&self) -> f64 {
		self.outlier_multiplier
			.unwrap_or(DEFAULT_OUTLIER_MULTIPLIER)
	}

	pub fn n_folds(&self) -> usize {
		self.n_folds.unwrap_or(DEFAULT_N_FOLDS)
	}

	pub fn brand_tiers(&self) -> BrandTiers {
		self.brand_tiers.clone().unwrap_or_default()
	}

	pub fn random_forest_options(&self) -> RandomForestTrainOptions {
		let defaults = RandomForestTrainOptions {
			seed: self.seed(),
			..Default::default()
		};
		match &self.random_forest {
			Some(config) => config.apply(defaults),
			None => defaults,
		}
	}

	pub fn gradient_boosting_options(&self) -> GradientBoostingTrainOptions {
		let defaults = GradientBoostingTrainOptions {
			seed: self.seed(),
			..Default::default()
		};
		match &self.gradient_boosting {
			Some(config) => config.apply(defaults),
			None => defaults,
		}
	}

	/// The meta learner is a smaller gradient boosting model trained on every example and every base prediction.
	pub fn meta_options(&self) -> GradientBoostingTrainOptions {
		let defaults = GradientBoostingTrainOptions {
			n_rounds: 400,
			learning_rate: 0.05,
			max_depth: 4,
			l2_regularization: 0.0,
			subsample: 1.0,
			column_subsample: 1.0,
			seed: self.seed(),
			..Default::default()
		};
		match &self.meta {
			Some(config) => config.apply(defaults),
			None => defaults,
		}
	}
}

impl RandomForestConfig {
	pub fn apply(&self, defaults: RandomForestTrainOptions) -> RandomForestTrainOptions {
		RandomForestTrainOptions {
			n_trees: self.n_trees.unwrap_or(defaults.n_trees),
			max_depth: self.max_depth.unwrap_or(defaults.max_depth),
			max_leaf_nodes: self.max_leaf_nodes.unwrap_or(defaults.max_leaf_nodes),
			min_examples_to_split: self
				.min_examples_to_split
				.unwrap_or(defaults.min_examples_to_split),
			min_examples_per_child: self
				.min_examples_per_child
				.unwrap_or(defaults.min_examples_per_child),
			max_features: self.max_features.unwrap_or(defaults.max_features),
			bootstrap: self.bootstrap.unwrap_or(defaults.bootstrap),
			max_valid_bins: self.max_valid_bins.unwrap_or(defaults.max_valid_bins),
			max_examples_for_computing_bin_thresholds: defaults
				.max_examples_for_computing_bin_thresholds,
			seed: self.seed.unwrap_or(defaults.seed),
		}
	}
}

impl GradientBoostingConfig {
	pub fn apply(&self, defaults: GradientBoostingTrainOptions) -> GradientBoostingTrainOptions {
		GradientBoostingTrainOptions {
			n_rounds: self.n_rounds.unwrap_or(defaults.n_rounds),
			learning_rate: self.learning_rate.unwrap_or(defaults.learning_rate),
			max_depth: self.max_depth.unwrap_or(defaults.max_depth),
			max_leaf_nodes: self.max_leaf_nodes.unwrap_or(defaults.max_leaf_nodes),
			min_examples_to_split: self
				.min_examples_to_split
				.unwrap_or(defaults.min_examples_to_split),
			min_examples_per_child: self
				.min_examples_per_child
				.unwrap_or(defaults.min_examples_per_child),
			l2_regularization: self.l2_regularization.unwrap_or(defaults.l2_regularization),
			min_gain_to_split: self.min_gain_to_split.unwrap_or(defaults.min_gain_to_split),
			subsample: self.subsample.unwrap_or(defaults.subsample),
			column_subsample: self.column_subsample.unwrap_or(defaults.column_subsample),
			max_valid_bins: self.max_valid_bins.unwrap_or(defaults.max_valid_bins),
			max_examples_for_computing_bin_thresholds: defaults
				.max_examples_for_computing_bin_thresholds,
			seed: self.seed.unwrap_or(defaults.seed),
		}
	}
}

#[test]
fn test_parse_yaml_config() {
	let config: Config = serde_yaml::from_str(
		"
seed: 7
random_forest:
  n_trees: 10
  max_features: sqrt
meta:
  n_rounds: 25
",
	)
	.unwrap();
	let random_forest = config.random_forest_options();
	assert_eq!(random_forest.n_trees, 10);
	assert_eq!(random_forest.max_depth, 18);
	assert_eq!(random_forest.max_features, MaxFeatures::Sqrt);
	assert_eq!(random_forest.seed, 7);
	let meta = config.meta_options();
	assert_eq!(meta.n_rounds, 25);
	assert_eq!(meta.max_depth, 4);
	assert_eq!(meta.subsample, 1.0);
	assert_eq!(config.gradient_boosting_options().n_rounds, 500);
	assert_eq!(config.test_fraction(), 0.2);
}

#[test]
fn test_parse_json_config() {
	let config: Config = serde_json::from_str(
		r#"{ "brand_tiers": { "version": 2, "luxury": ["Tesla"], "premium": [] }, "n_folds": 3 }"#,
	)
	.unwrap();
	assert_eq!(config.brand_tiers().version, 2);
	assert!(config.brand_tiers().is_luxury("Tesla"));
	assert_eq!(config.n_folds(), 3);
	// Misspelled options are rejected rather than silently ignored.
	let result: Result<Config, _> =
		serde_json::from_str(r#"{ "gradient_boosting": { "max_features": 3 } }"#);
	assert!(result.is_err());
}
