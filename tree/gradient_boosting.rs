use crate::{
	compute_binned_features, compute_feature_importances, train_tree, TrainProgress,
	TrainTreeOptions, Tree,
};
use autovalue_util::{progress_counter::ProgressCounter, pzip};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

/// A `GradientBoostingRegressor` adds up the outputs of shallow trees, each fit to the residuals of the trees trained before it, on top of a constant bias.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GradientBoostingRegressor {
	/// The initial prediction of the model given no trained trees. The bias is calculated using the mean value of the labels.
	pub bias: f32,
	/// The trees for this model.
	pub trees: Vec<Tree>,
	/// The importance of each feature as measured by the number of times the feature was used in a branch node.
	pub feature_importances: Vec<f32>,
	/// The training losses in each round of training this model.
	pub losses: Vec<f32>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GradientBoostingTrainOptions {
	pub n_rounds: usize,
	/// Each tree's output is multiplied by the learning rate.
	pub learning_rate: f32,
	pub max_depth: usize,
	pub max_leaf_nodes: usize,
	pub min_examples_to_split: usize,
	pub min_examples_per_child: usize,
	pub l2_regularization: f32,
	pub min_gain_to_split: f32,
	/// The fraction of the examples, sampled without replacement, that each tree is trained on.
	pub subsample: f32,
	/// The fraction of the features each tree may split on.
	pub column_subsample: f32,
	pub max_valid_bins: u8,
	pub max_examples_for_computing_bin_thresholds: usize,
	pub seed: u64,
}

impl Default for GradientBoostingTrainOptions {
	fn default() -> Self {
		Self {
			n_rounds: 500,
			learning_rate: 0.05,
			max_depth: 6,
			max_leaf_nodes: usize::MAX,
			min_examples_to_split: 2,
			min_examples_per_child: 1,
			l2_regularization: 1.0,
			min_gain_to_split: 0.0,
			subsample: 0.8,
			column_subsample: 0.7,
			max_valid_bins: 255,
			max_examples_for_computing_bin_thresholds: 200_000,
			seed: 42,
		}
	}
}

impl GradientBoostingRegressor {
	/// Train a gradient boosted regressor with a squared error loss.
	pub fn train(
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		options: &GradientBoostingTrainOptions,
		update_progress: &mut dyn FnMut(TrainProgress),
	) -> GradientBoostingRegressor {
		update_progress(TrainProgress::Initializing);
		let n_examples = features.nrows();
		let n_features = features.ncols();
		let binned_features = compute_binned_features(
			features,
			options.max_valid_bins,
			options.max_examples_for_computing_bin_thresholds,
		);
		let features = features.as_standard_layout();
		let labels: Vec<f32> = labels.to_vec();
		let bias = labels.iter().sum::<f32>() / n_examples.max(1).to_f32().unwrap();
		let mut predictions: Vec<f32> = vec![bias; n_examples];
		let mut gradients: Vec<f32> = vec![0.0; n_examples];
		let n_examples_per_round = fraction_of(n_examples, options.subsample);
		let n_features_per_tree = fraction_of(n_features, options.column_subsample);
		let tree_options = TrainTreeOptions {
			max_depth: options.max_depth,
			max_leaf_nodes: options.max_leaf_nodes,
			min_examples_to_split: options.min_examples_to_split,
			min_examples_per_child: options.min_examples_per_child,
			l2_regularization: options.l2_regularization,
			min_gain_to_split: options.min_gain_to_split,
			max_features_per_split: None,
		};
		let mut rng = Xoshiro256Plus::seed_from_u64(options.seed);
		let mut trees: Vec<Tree> = Vec::with_capacity(options.n_rounds);
		let mut losses: Vec<f32> = Vec::with_capacity(options.n_rounds);
		let round_counter = ProgressCounter::new(options.n_rounds.to_u64().unwrap());
		update_progress(TrainProgress::Training(round_counter.clone()));
		for _ in 0..options.n_rounds {
			pzip!(&mut gradients, &labels, &predictions).for_each(
				|(gradient, label, prediction)| {
					*gradient = prediction - label;
				},
			);
			let mut examples_index = sample_sorted(&mut rng, n_examples, n_examples_per_round);
			let feature_indexes = sample_sorted(&mut rng, n_features, n_features_per_tree);
			let tree = train_tree(
				&binned_features,
				&feature_indexes,
				&gradients,
				&mut examples_index,
				options.learning_rate,
				&tree_options,
				&mut rng,
			);
			// Update the predictions of every example, including those left out of this round's sample.
			predictions
				.par_iter_mut()
				.enumerate()
				.for_each(|(example_index, prediction)| {
					*prediction += tree.predict(features.row(example_index).as_slice().unwrap());
				});
			losses.push(compute_loss(&labels, &predictions));
			trees.push(tree);
			round_counter.inc(1);
		}
		let feature_importances = compute_feature_importances(&trees, n_features);
		GradientBoostingRegressor {
			bias,
			trees,
			feature_importances,
			losses,
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
		self.bias
			+ self
				.trees
				.iter()
				.map(|tree| tree.predict(features))
				.sum::<f32>()
	}
}

/// The mean of half the squared error.
fn compute_loss(labels: &[f32], predictions: &[f32]) -> f32 {
	let mut loss = 0.0;
	for (label, prediction) in labels.iter().zip(predictions) {
		loss += 0.5 * (label - prediction).powi(2);
	}
	loss / labels.len().max(1).to_f32().unwrap()
}

/// Round `fraction * n`, keeping at least one item when there are any.
fn fraction_of(n: usize, fraction: f32) -> usize {
	if fraction >= 1.0 {
		return n;
	}
	let count = (n.to_f32().unwrap() * fraction.max(0.0)).round().to_usize().unwrap();
	count.max(1).min(n)
}

/// Sample `amount` of `0..length` without replacement, in ascending order.
fn sample_sorted(rng: &mut Xoshiro256Plus, length: usize, amount: usize) -> Vec<usize> {
	if amount >= length {
		return (0..length).collect();
	}
	let mut sample = rand::seq::index::sample(rng, length, amount).into_vec();
	sample.sort_unstable();
	sample
}

#[test]
fn test_fraction_of() {
	assert_eq!(fraction_of(10, 0.8), 8);
	assert_eq!(fraction_of(10, 1.0), 10);
	assert_eq!(fraction_of(3, 0.1), 1);
	assert_eq!(fraction_of(0, 0.5), 0);
}

#[test]
fn test_gradient_boosting() {
	let n = 100;
	let mut features = Array2::zeros((n, 2));
	let mut labels = Array1::zeros(n);
	for i in 0..n {
		let x = i.to_f32().unwrap();
		features[(i, 0)] = x;
		features[(i, 1)] = ((i * 37) % 11).to_f32().unwrap();
		labels[i] = if x < 50.0 { 10.0 } else { 30.0 };
	}
	let options = GradientBoostingTrainOptions {
		n_rounds: 100,
		learning_rate: 0.1,
		max_depth: 3,
		subsample: 1.0,
		column_subsample: 1.0,
		l2_regularization: 0.0,
		..Default::default()
	};
	let model =
		GradientBoostingRegressor::train(features.view(), labels.view(), &options, &mut |_| {});
	assert_eq!(model.bias, 20.0);
	assert_eq!(model.trees.len(), 100);
	assert!(model.losses.last().unwrap() < model.losses.first().unwrap());
	assert!((model.predict_one(&[25.0, 3.0]) - 10.0).abs() < 0.5);
	assert!((model.predict_one(&[75.0, 3.0]) - 30.0).abs() < 0.5);
	assert_eq!(model.feature_importances[1], 0.0);
}

#[test]
fn test_gradient_boosting_with_subsampling_is_reproducible() {
	let features = Array2::from_shape_fn((60, 3), |(i, j)| ((i * (j + 3)) % 17) as f32);
	let labels = Array1::from_shape_fn(60, |i| (i % 17) as f32 * 2.0 + 1.0);
	let options = GradientBoostingTrainOptions {
		n_rounds: 20,
		..Default::default()
	};
	let a = GradientBoostingRegressor::train(features.view(), labels.view(), &options, &mut |_| {});
	let b = GradientBoostingRegressor::train(features.view(), labels.view(), &options, &mut |_| {});
	assert_eq!(a.trees, b.trees);
	assert_eq!(a.losses, b.losses);
}
