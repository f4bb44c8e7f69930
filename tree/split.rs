use crate::{binning::BinnedFeatures, train_tree::TrainTreeOptions};
use num_traits::ToPrimitive;
use rayon::prelude::*;

/// The best split found for a node. Examples whose bin is <= `bin_index` are sent to the left child, which includes bin 0, the bin for invalid values.
#[derive(Clone, Debug)]
pub struct FindSplitOutput {
	pub gain: f32,
	pub feature_index: usize,
	pub bin_index: u8,
	pub split_value: f32,
	pub left_sum_gradients: f64,
	pub right_sum_gradients: f64,
}

/// Find the split with the highest gain across `feature_indexes`, if a valid one exists. A valid split will not exist if the split conditions are violated for all potential splits.
pub fn choose_best_split(
	binned_features: &BinnedFeatures,
	feature_indexes: &[usize],
	gradients: &[f32],
	examples_index: &[usize],
	sum_gradients: f64,
	options: &TrainTreeOptions,
) -> Option<FindSplitOutput> {
	let candidates: Vec<Option<FindSplitOutput>> = feature_indexes
		.par_iter()
		.map(|feature_index| {
			choose_best_split_for_feature(
				binned_features,
				*feature_index,
				gradients,
				examples_index,
				sum_gradients,
				options,
			)
		})
		.collect();
	// Reduce sequentially so ties are always broken in favor of the feature that comes first.
	candidates
		.into_iter()
		.flatten()
		.fold(None, |best: Option<FindSplitOutput>, candidate| match best {
			Some(best) if best.gain >= candidate.gain => Some(best),
			_ => Some(candidate),
		})
}

fn choose_best_split_for_feature(
	binned_features: &BinnedFeatures,
	feature_index: usize,
	gradients: &[f32],
	examples_index: &[usize],
	sum_gradients: f64,
	options: &TrainTreeOptions,
) -> Option<FindSplitOutput> {
	let binning_instruction = &binned_features.binning_instructions[feature_index];
	let column = &binned_features.columns[feature_index];
	// Accumulate the sum of gradients and the number of examples in each bin.
	let mut bin_stats = vec![(0.0f64, 0usize); binning_instruction.n_bins()];
	for example_index in examples_index {
		let entry = &mut bin_stats[column[*example_index].to_usize().unwrap()];
		entry.0 += gradients[*example_index].to_f64().unwrap();
		entry.1 += 1;
	}
	let n_examples = examples_index.len();
	let l2_regularization = options.l2_regularization.to_f64().unwrap();
	let parent_score = compute_score(sum_gradients, n_examples, l2_regularization);
	let mut best: Option<FindSplitOutput> = None;
	let mut left_sum_gradients = 0.0;
	let mut left_n_examples = 0;
	// Bin 0 holds invalid values and the last bin cannot be a split point because it would leave the right child empty.
	for (bin_index, (bin_sum_gradients, bin_n_examples)) in bin_stats
		.iter()
		.enumerate()
		.take(binning_instruction.n_bins() - 1)
	{
		left_sum_gradients += bin_sum_gradients;
		left_n_examples += bin_n_examples;
		if bin_index == 0 {
			continue;
		}
		let right_sum_gradients = sum_gradients - left_sum_gradients;
		let right_n_examples = n_examples - left_n_examples;
		if left_n_examples < options.min_examples_per_child {
			continue;
		}
		if right_n_examples < options.min_examples_per_child {
			break;
		}
		let gain = compute_score(left_sum_gradients, left_n_examples, l2_regularization)
			+ compute_score(right_sum_gradients, right_n_examples, l2_regularization)
			- parent_score;
		let gain = gain.to_f32().unwrap();
		if gain <= options.min_gain_to_split {
			continue;
		}
		if best.as_ref().map(|best| gain > best.gain).unwrap_or(true) {
			best = Some(FindSplitOutput {
				gain,
				feature_index,
				bin_index: bin_index.to_u8().unwrap(),
				split_value: binning_instruction.thresholds[bin_index - 1],
				left_sum_gradients,
				right_sum_gradients,
			});
		}
	}
	best
}

/// With a squared error loss every hessian is 1, so the sum of hessians of a node is its number of examples.
fn compute_score(sum_gradients: f64, n_examples: usize, l2_regularization: f64) -> f64 {
	(sum_gradients * sum_gradients) / (n_examples.to_f64().unwrap() + l2_regularization)
}
