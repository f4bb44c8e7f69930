/*!
This module implements a stacked ensemble. Two base regressors, a random forest and a gradient boosted model, are trained on the features. A third regressor, the meta model, is trained to combine their predictions.

The meta model must not be trained on base predictions for examples the base models saw during training, or it would learn to trust them too much. So the examples are split into `n_folds` contiguous folds, and for each fold the base models are trained on the other folds and make predictions for it. The meta model is trained on these out of fold predictions. Finally the base models are trained again on all the examples, and those are the models used to make predictions.
*/

use crate::progress::{StackingModel, StackingProgress, StackingStage};
use anyhow::{bail, Result};
use autovalue_metrics::{MeanSquaredError, StreamingMetric};
use autovalue_tree::{
	GradientBoostingRegressor, GradientBoostingTrainOptions, RandomForestRegressor,
	RandomForestTrainOptions,
};
use ndarray::{prelude::*, s};
use num_traits::ToPrimitive;
use std::ops::Range;
use tracing::info;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StackingTrainOptions {
	pub n_folds: usize,
	pub random_forest: RandomForestTrainOptions,
	pub gradient_boosting: GradientBoostingTrainOptions,
	pub meta: GradientBoostingTrainOptions,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StackingRegressor {
	pub random_forest: RandomForestRegressor,
	pub gradient_boosting: GradientBoostingRegressor,
	/// The meta model's features are the random forest's prediction followed by the gradient boosted model's prediction.
	pub meta: GradientBoostingRegressor,
}

impl StackingRegressor {
	pub fn train(
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		options: &StackingTrainOptions,
		update_progress: &mut dyn FnMut(StackingProgress),
	) -> Result<StackingRegressor> {
		let n_examples = features.nrows();
		if options.n_folds < 2 {
			bail!("stacking requires at least 2 folds, got {}", options.n_folds);
		}
		if n_examples < options.n_folds {
			bail!(
				"unable to split {} training examples into {} folds",
				n_examples,
				options.n_folds
			);
		}
		let mut base_predictions = Array2::<f32>::zeros((n_examples, 2));
		for (fold_index, fold) in k_fold_ranges(n_examples, options.n_folds)
			.into_iter()
			.enumerate()
		{
			let stage = StackingStage::Fold {
				fold_index,
				n_folds: options.n_folds,
			};
			let train_indexes: Vec<usize> = (0..fold.start).chain(fold.end..n_examples).collect();
			let fold_features = features.select(Axis(0), &train_indexes);
			let fold_labels = labels.select(Axis(0), &train_indexes);
			let (random_forest, gradient_boosting) = train_base_models(
				fold_features.view(),
				fold_labels.view(),
				options,
				stage,
				update_progress,
			);
			let holdout_features = features.slice(s![fold.clone(), ..]);
			random_forest.predict(
				holdout_features,
				base_predictions.slice_mut(s![fold.clone(), 0]),
			);
			gradient_boosting.predict(
				holdout_features,
				base_predictions.slice_mut(s![fold.clone(), 1]),
			);
		}
		info!(
			random_forest_rmse = out_of_fold_rmse(base_predictions.column(0), labels),
			gradient_boosting_rmse = out_of_fold_rmse(base_predictions.column(1), labels),
			"computed out of fold predictions"
		);
		let meta = GradientBoostingRegressor::train(
			base_predictions.view(),
			labels,
			&options.meta,
			&mut |progress| {
				update_progress(StackingProgress {
					stage: StackingStage::Meta,
					model: StackingModel::Meta,
					progress,
				})
			},
		);
		let (random_forest, gradient_boosting) = train_base_models(
			features,
			labels,
			options,
			StackingStage::Refit,
			update_progress,
		);
		Ok(StackingRegressor {
			random_forest,
			gradient_boosting,
			meta,
		})
	}

	/// Make predictions. They are on the scale of the labels the model was trained on.
	pub fn predict(&self, features: ArrayView2<f32>) -> Array1<f32> {
		let n_examples = features.nrows();
		let mut base_predictions = Array2::<f32>::zeros((n_examples, 2));
		self.random_forest
			.predict(features, base_predictions.column_mut(0));
		self.gradient_boosting
			.predict(features, base_predictions.column_mut(1));
		let mut predictions = Array1::zeros(n_examples);
		self.meta
			.predict(base_predictions.view(), predictions.view_mut());
		predictions
	}

	/// Make a prediction for a single example.
	pub fn predict_one(&self, features: &[f32]) -> f32 {
		let base_predictions = [
			self.random_forest.predict_one(features),
			self.gradient_boosting.predict_one(features),
		];
		self.meta.predict_one(&base_predictions)
	}
}

fn train_base_models(
	features: ArrayView2<f32>,
	labels: ArrayView1<f32>,
	options: &StackingTrainOptions,
	stage: StackingStage,
	update_progress: &mut dyn FnMut(StackingProgress),
) -> (RandomForestRegressor, GradientBoostingRegressor) {
	let random_forest =
		RandomForestRegressor::train(features, labels, &options.random_forest, &mut |progress| {
			update_progress(StackingProgress {
				stage,
				model: StackingModel::RandomForest,
				progress,
			})
		});
	let gradient_boosting = GradientBoostingRegressor::train(
		features,
		labels,
		&options.gradient_boosting,
		&mut |progress| {
			update_progress(StackingProgress {
				stage,
				model: StackingModel::GradientBoosting,
				progress,
			})
		},
	);
	(random_forest, gradient_boosting)
}

/// Split `0..n_examples` into `n_folds` contiguous ranges. The first `n_examples % n_folds` folds have one extra example.
pub fn k_fold_ranges(n_examples: usize, n_folds: usize) -> Vec<Range<usize>> {
	let fold_size = n_examples / n_folds;
	let n_larger_folds = n_examples % n_folds;
	let mut start = 0;
	(0..n_folds)
		.map(|fold_index| {
			let size = fold_size + if fold_index < n_larger_folds { 1 } else { 0 };
			let range = start..start + size;
			start += size;
			range
		})
		.collect()
}

fn out_of_fold_rmse(predictions: ArrayView1<f32>, labels: ArrayView1<f32>) -> f64 {
	let mut mse = MeanSquaredError::default();
	for (prediction, label) in predictions.iter().zip(labels.iter()) {
		mse.update((prediction.to_f64().unwrap(), label.to_f64().unwrap()));
	}
	mse.finalize().map(f64::sqrt).unwrap_or(f64::NAN)
}

#[test]
fn test_k_fold_ranges() {
	assert_eq!(k_fold_ranges(12, 5), vec![0..3, 3..6, 6..8, 8..10, 10..12]);
	assert_eq!(k_fold_ranges(5, 5), vec![0..1, 1..2, 2..3, 3..4, 4..5]);
}

#[test]
fn test_stacking_regressor() {
	let n = 60;
	let features = Array2::from_shape_fn((n, 2), |(i, j)| {
		if j == 0 {
			(i % 20).to_f32().unwrap()
		} else {
			((i * 7) % 5).to_f32().unwrap()
		}
	});
	let labels = Array1::from_shape_fn(n, |i| if i % 20 < 10 { 1.0 } else { 3.0 });
	let options = StackingTrainOptions {
		n_folds: 3,
		random_forest: RandomForestTrainOptions {
			n_trees: 10,
			..Default::default()
		},
		gradient_boosting: GradientBoostingTrainOptions {
			n_rounds: 50,
			learning_rate: 0.2,
			..Default::default()
		},
		meta: GradientBoostingTrainOptions {
			n_rounds: 50,
			learning_rate: 0.2,
			max_depth: 2,
			subsample: 1.0,
			column_subsample: 1.0,
			..Default::default()
		},
	};
	let mut stages = Vec::new();
	let model = StackingRegressor::train(features.view(), labels.view(), &options, &mut |progress| {
		if let autovalue_tree::TrainProgress::Initializing = progress.progress {
			stages.push((progress.stage, progress.model));
		}
	})
	.unwrap();
	assert_eq!(stages.len(), 3 * 2 + 1 + 2);
	assert_eq!(stages[6], (StackingStage::Meta, StackingModel::Meta));
	let predictions = model.predict(features.view());
	assert!((predictions[0] - 1.0).abs() < 0.2);
	assert!((predictions[15] - 3.0).abs() < 0.2);
	assert_eq!(predictions[15], model.predict_one(&[15.0, features[(15, 1)]]));
	let result = StackingRegressor::train(
		features.slice(s![..2, ..]),
		labels.slice(s![..2]),
		&options,
		&mut |_| {},
	);
	assert!(result.is_err());
}
