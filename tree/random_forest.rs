use crate::{
	compute_binned_features, compute_feature_importances, train_tree, TrainProgress,
	TrainTreeOptions, Tree,
};
use autovalue_util::progress_counter::ProgressCounter;
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

/// A `RandomForestRegressor` averages the predictions of deep trees, each trained on a bootstrap sample of the training examples.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RandomForestRegressor {
	pub trees: Vec<Tree>,
	/// The importance of each feature as measured by the number of times the feature was used in a branch node.
	pub feature_importances: Vec<f32>,
}

/// The number of features each node considers when choosing a split.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
	All,
	/// The square root of the number of features, rounded down, and at least 1.
	Sqrt,
	Count(usize),
}

impl MaxFeatures {
	pub fn resolve(self, n_features: usize) -> usize {
		let max_features = match self {
			MaxFeatures::All => n_features,
			MaxFeatures::Sqrt => n_features.to_f64().unwrap().sqrt().floor().to_usize().unwrap(),
			MaxFeatures::Count(count) => count,
		};
		max_features.max(1).min(n_features.max(1))
	}
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RandomForestTrainOptions {
	pub n_trees: usize,
	pub max_depth: usize,
	pub max_leaf_nodes: usize,
	pub min_examples_to_split: usize,
	pub min_examples_per_child: usize,
	pub max_features: MaxFeatures,
	/// If false, every tree is trained on all the examples and only the feature sampling varies between trees.
	pub bootstrap: bool,
	pub max_valid_bins: u8,
	pub max_examples_for_computing_bin_thresholds: usize,
	pub seed: u64,
}

impl Default for RandomForestTrainOptions {
	fn default() -> Self {
		Self {
			n_trees: 350,
			max_depth: 18,
			max_leaf_nodes: usize::MAX,
			min_examples_to_split: 4,
			min_examples_per_child: 2,
			max_features: MaxFeatures::Sqrt,
			bootstrap: true,
			max_valid_bins: 255,
			max_examples_for_computing_bin_thresholds: 200_000,
			seed: 42,
		}
	}
}

impl RandomForestRegressor {
	/// Train a random forest. The trees are trained in parallel, and tree `i` draws its samples from its own generator seeded with `seed + i`, so the result does not depend on the number of threads.
	pub fn train(
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		options: &RandomForestTrainOptions,
		update_progress: &mut dyn FnMut(TrainProgress),
	) -> RandomForestRegressor {
		update_progress(TrainProgress::Initializing);
		let n_examples = features.nrows();
		let n_features = features.ncols();
		let binned_features = compute_binned_features(
			features,
			options.max_valid_bins,
			options.max_examples_for_computing_bin_thresholds,
		);
		// Leaves output the negated mean gradient, so negating the labels makes each leaf output the mean label.
		let gradients: Vec<f32> = labels.iter().map(|label| -label).collect();
		let feature_indexes: Vec<usize> = (0..n_features).collect();
		let tree_options = TrainTreeOptions {
			max_depth: options.max_depth,
			max_leaf_nodes: options.max_leaf_nodes,
			min_examples_to_split: options.min_examples_to_split,
			min_examples_per_child: options.min_examples_per_child,
			l2_regularization: 0.0,
			min_gain_to_split: 0.0,
			max_features_per_split: Some(options.max_features.resolve(n_features)),
		};
		let progress_counter = ProgressCounter::new(options.n_trees.to_u64().unwrap());
		update_progress(TrainProgress::Training(progress_counter.clone()));
		let trees: Vec<Tree> = (0..options.n_trees)
			.into_par_iter()
			.map(|tree_index| {
				let mut rng =
					Xoshiro256Plus::seed_from_u64(options.seed.wrapping_add(tree_index as u64));
				let mut examples_index: Vec<usize> = if options.bootstrap && n_examples > 0 {
					(0..n_examples)
						.map(|_| rng.gen_range(0, n_examples))
						.collect()
				} else {
					(0..n_examples).collect()
				};
				let tree = train_tree(
					&binned_features,
					&feature_indexes,
					&gradients,
					&mut examples_index,
					1.0,
					&tree_options,
					&mut rng,
				);
				progress_counter.inc(1);
				tree
			})
			.collect();
		let feature_importances = compute_feature_importances(&trees, n_features);
		RandomForestRegressor {
			trees,
			feature_importances,
		}
	}

	/// Make predictions.
	pub fn predict(&self, features: ArrayView2<f32>, mut predictions: ArrayViewMut1<f32>) {
		let features = features.as_standard_layout();
		for (prediction, row) in predictions.iter_mut().zip(features.axis_iter(Axis(0))) {
			*prediction = self.predict_one(row.as_slice().unwrap());
		}
	}

	/// Make a prediction for a single example.
	pub fn predict_one(&self, features: &[f32]) -> f32 {
		if self.trees.is_empty() {
			return 0.0;
		}
		let sum: f32 = self.trees.iter().map(|tree| tree.predict(features)).sum();
		sum / self.trees.len().to_f32().unwrap()
	}
}

#[cfg(test)]
fn step_dataset() -> (Array2<f32>, Array1<f32>) {
	let n = 100;
	let mut features = Array2::zeros((n, 2));
	let mut labels = Array1::zeros(n);
	for i in 0..n {
		let x = i.to_f32().unwrap();
		features[(i, 0)] = x;
		features[(i, 1)] = ((i * 37) % 11).to_f32().unwrap();
		labels[i] = if x < 50.0 { 10.0 } else { 30.0 };
	}
	(features, labels)
}

#[test]
fn test_max_features() {
	assert_eq!(MaxFeatures::Sqrt.resolve(17), 4);
	assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
	assert_eq!(MaxFeatures::All.resolve(17), 17);
	assert_eq!(MaxFeatures::Count(40).resolve(17), 17);
	assert_eq!(MaxFeatures::Count(0).resolve(17), 1);
}

#[test]
fn test_random_forest() {
	let (features, labels) = step_dataset();
	let options = RandomForestTrainOptions {
		n_trees: 20,
		..Default::default()
	};
	let model = RandomForestRegressor::train(features.view(), labels.view(), &options, &mut |_| {});
	assert_eq!(model.trees.len(), 20);
	assert!((model.predict_one(&[25.0, 3.0]) - 10.0).abs() < 1.0);
	assert!((model.predict_one(&[75.0, 3.0]) - 30.0).abs() < 1.0);
	let mut predictions = Array1::zeros(features.nrows());
	model.predict(features.view(), predictions.view_mut());
	assert_eq!(predictions[10], model.predict_one(&[10.0, features[(10, 1)]]));
	let total: f32 = model.feature_importances.iter().sum();
	assert!((total - 1.0).abs() < 1e-4);
}

#[test]
fn test_random_forest_is_reproducible() {
	let (features, labels) = step_dataset();
	let options = RandomForestTrainOptions {
		n_trees: 8,
		seed: 7,
		..Default::default()
	};
	let a = RandomForestRegressor::train(features.view(), labels.view(), &options, &mut |_| {});
	let b = RandomForestRegressor::train(features.view(), labels.view(), &options, &mut |_| {});
	assert_eq!(a.trees, b.trees);
}
