/*!
This module implements training. [`train`](fn.train.html) takes a dataframe of raw listings and returns a [`Model`](../model/struct.Model.html):

1. Clean the listings and compute the log price `LogAskPrice = ln(1 + AskPrice)`.
2. Engineer features, filling missing ages with the median age.
3. Split the listings into train and test sets, stratified by price decile.
4. Fit the brand target encoder and the feature assembler on the train set only, and transform both sets.
5. Train the stacked regressor on the train set.
6. Evaluate it on the test set.

Nothing is written to disk here. The caller saves the model once training succeeds.
*/

use crate::{
	clean::{clean, CleanOptions},
	config::Config,
	evaluate::evaluate,
	model::Model,
	progress::Progress,
	split::stratified_split,
	stacking::{StackingRegressor, StackingTrainOptions},
};
use anyhow::{format_err, Result};
use autovalue_dataframe::{Column, DataFrame, FromCsvOptions, NumberColumn, TextColumn};
use autovalue_features::{
	AgeFill, BrandTargetEncoderOptions, FeatureAssembler, FeatureEngineer, ASK_PRICE, BRAND,
	LOG_ASK_PRICE,
};
use autovalue_metrics::{MeanVariance, Metric};
use autovalue_util::{progress_counter::ProgressCounter, zip};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use std::{cmp::Ordering, path::Path};
use tracing::info;

/// The output of training.
#[derive(Debug)]
pub struct TrainOutput {
	pub model: Model,
	/// Each feature's share of the branch nodes across both base models, sorted from most to least important.
	pub feature_importances: Vec<(String, f32)>,
}

/// Load the listings in the csv file at `file_path` and the config file at `config_path`, if any, and train a model.
pub fn train_from_path(
	file_path: &Path,
	config_path: Option<&Path>,
	update_progress: &mut dyn FnMut(Progress),
) -> Result<TrainOutput> {
	let config = match config_path {
		Some(config_path) => Config::from_path(config_path)?,
		None => Config::default(),
	};
	let len = std::fs::metadata(file_path)
		.map_err(|error| format_err!("failed to read {}: {}", file_path.display(), error))?
		.len();
	let progress_counter = ProgressCounter::new(len);
	update_progress(Progress::Loading(progress_counter.clone()));
	let dataframe = DataFrame::from_path(file_path, FromCsvOptions::default(), |byte| {
		progress_counter.set(byte)
	})?;
	info!(
		n_rows = dataframe.nrows(),
		n_columns = dataframe.ncols(),
		"loaded the training data"
	);
	train(dataframe, &config, update_progress)
}

pub fn train(
	dataframe: DataFrame,
	config: &Config,
	update_progress: &mut dyn FnMut(Progress),
) -> Result<TrainOutput> {
	// Clean the listings.
	update_progress(Progress::Cleaning);
	let clean_options = CleanOptions {
		outlier_multiplier: config.outlier_multiplier(),
	};
	let (mut dataframe, clean_report) = clean(dataframe, &clean_options)?;

	// Compute the log price, which is what the models are trained to predict.
	let log_prices: Vec<f64> = price_column(&dataframe)?
		.iter()
		.map(|price| price.ln_1p())
		.collect();
	if let Some(stats) = MeanVariance::compute(&log_prices) {
		info!(
			mean = stats.mean,
			std = stats.variance.sqrt(),
			"computed log price statistics"
		);
	}
	dataframe.insert_column(Column::Number(NumberColumn::new(
		LOG_ASK_PRICE.to_owned(),
		log_prices,
	)));

	// Engineer features.
	update_progress(Progress::ComputingFeatures);
	let feature_engineer = FeatureEngineer::new(config.brand_tiers());
	let age_median = FeatureEngineer::age_median(&dataframe)
		.ok_or_else(|| format_err!("unable to compute the median age"))?;
	let dataframe = feature_engineer.compute(&dataframe, AgeFill::BatchMedian)?;

	// Split the listings into train and test sets.
	let split = stratified_split(price_column(&dataframe)?, config.test_fraction(), config.seed())?;
	let mut dataframe_train = dataframe.take_rows(&split.train);
	let mut dataframe_test = dataframe.take_rows(&split.test);
	info!(
		n_rows_train = dataframe_train.nrows(),
		n_rows_test = dataframe_test.nrows(),
		"split the listings"
	);

	// Fit the brand encoder on the train set and encode both sets.
	let brand_encoder_options = BrandTargetEncoderOptions {
		smoothing: config
			.brand_smoothing
			.unwrap_or_else(|| BrandTargetEncoderOptions::default().smoothing),
	};
	let brand_encoder = brand_encoder_options.fit(
		brand_column(&dataframe_train)?,
		log_price_column(&dataframe_train)?,
	)?;
	info!(
		n_brands = brand_encoder.encodings.len(),
		global_mean = brand_encoder.global_mean,
		"fit the brand encoder"
	);
	let encoded_train = brand_encoder.transform(brand_column(&dataframe_train)?);
	dataframe_train.insert_column(Column::Number(encoded_train));
	let encoded_test = brand_encoder.transform(brand_column(&dataframe_test)?);
	dataframe_test.insert_column(Column::Number(encoded_test));

	// Fit the feature assembler on the train set and compute the feature matrices.
	let assembler = FeatureAssembler::fit(&dataframe_train)?;
	let features_train = assembler.transform(&dataframe_train);
	let features_test = assembler.transform(&dataframe_test);
	let labels_train: Array1<f32> = log_price_column(&dataframe_train)?
		.iter()
		.map(|label| label.to_f32().unwrap())
		.collect();

	// Train the stacked regressor.
	let train_options = StackingTrainOptions {
		n_folds: config.n_folds(),
		random_forest: config.random_forest_options(),
		gradient_boosting: config.gradient_boosting_options(),
		meta: config.meta_options(),
	};
	let regressor = StackingRegressor::train(
		features_train.view(),
		labels_train.view(),
		&train_options,
		&mut |progress| update_progress(Progress::Training(progress)),
	)?;

	// Evaluate the regressor on the test set.
	update_progress(Progress::Testing);
	let predictions_test: Vec<f64> = regressor
		.predict(features_test.view())
		.iter()
		.map(|prediction| prediction.to_f64().unwrap())
		.collect();
	let test_metrics = evaluate(log_price_column(&dataframe_test)?, &predictions_test);
	info!(
		r2 = test_metrics.r2,
		rmse = test_metrics.rmse,
		mae = test_metrics.mae,
		mape = test_metrics.mape,
		accuracy = test_metrics.accuracy,
		"evaluated the model on the test set"
	);

	let mut feature_importances: Vec<(String, f32)> = zip!(
		assembler.feature_names(),
		regressor.random_forest.feature_importances.iter(),
		regressor.gradient_boosting.feature_importances.iter()
	)
	.map(|(name, random_forest, gradient_boosting)| {
		(name, (random_forest + gradient_boosting) / 2.0)
	})
	.collect();
	feature_importances.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

	let model = Model {
		feature_engineer,
		age_median,
		brand_encoder,
		assembler,
		regressor,
		train_options,
		clean_report,
		n_rows_train: split.train.len(),
		n_rows_test: split.test.len(),
		test_metrics,
	};
	Ok(TrainOutput {
		model,
		feature_importances,
	})
}

fn price_column(dataframe: &DataFrame) -> Result<&[f64]> {
	dataframe
		.number_column(ASK_PRICE)
		.map(|column| column.as_slice())
		.ok_or_else(|| format_err!("expected a number column named {}", ASK_PRICE))
}

fn log_price_column(dataframe: &DataFrame) -> Result<&[f64]> {
	dataframe
		.number_column(LOG_ASK_PRICE)
		.map(|column| column.as_slice())
		.ok_or_else(|| format_err!("expected a number column named {}", LOG_ASK_PRICE))
}

fn brand_column(dataframe: &DataFrame) -> Result<&TextColumn> {
	dataframe
		.text_column(BRAND)
		.ok_or_else(|| format_err!("expected a text column named {}", BRAND))
}
