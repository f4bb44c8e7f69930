pub use autovalue_tree::TrainProgress;
use autovalue_util::progress_counter::ProgressCounter;

/// This enum reports the progress of [`train`](../train/fn.train.html).
#[derive(Debug)]
pub enum Progress {
	Loading(ProgressCounter),
	Cleaning,
	ComputingFeatures,
	Training(StackingProgress),
	Testing,
}

/// The stacking regressor trains each base model once per fold, then the meta model, then each base model again on all the examples.
#[derive(Debug)]
pub struct StackingProgress {
	pub stage: StackingStage,
	pub model: StackingModel,
	pub progress: TrainProgress,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StackingStage {
	Fold { fold_index: usize, n_folds: usize },
	Meta,
	Refit,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StackingModel {
	RandomForest,
	GradientBoosting,
	Meta,
}

impl std::fmt::Display for StackingStage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			StackingStage::Fold {
				fold_index,
				n_folds,
			} => write!(f, "fold {} of {}", fold_index + 1, n_folds),
			StackingStage::Meta => write!(f, "meta"),
			StackingStage::Refit => write!(f, "refit"),
		}
	}
}

impl std::fmt::Display for StackingModel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			StackingModel::RandomForest => "random forest",
			StackingModel::GradientBoosting => "gradient boosting",
			StackingModel::Meta => "meta gradient boosting",
		};
		write!(f, "{}", s)
	}
}
