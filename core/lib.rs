/*!
This crate trains models that estimate the asking price of a used car and uses them to make estimates.

Use [`train`](train/fn.train.html) to clean a table of listings, engineer features, and fit a stacked regressor that combines a random forest and gradient boosted trees. The returned [`Model`](model/struct.Model.html) can be written to an `.autovalue` file and loaded again by a [`Predictor`](predict/struct.Predictor.html).
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod clean;
pub mod config;
pub mod evaluate;
pub mod model;
pub mod predict;
pub mod progress;
pub mod split;
pub mod stacking;
pub mod train;

pub use self::{
	config::Config,
	model::Model,
	predict::{PredictError, PredictInput, PredictOutput, Predictor},
	train::{train, train_from_path, TrainOutput},
};
