use autovalue_util::finite::Finite;
use itertools::Itertools;
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use rayon::prelude::*;
use std::{cmp::Ordering, collections::BTreeMap};

/**
This struct specifies how to bin a number feature.

The first bin is reserved for invalid values, and after that feature values are binned by comparing them with a set of thresholds. For example, given the thresholds `[0.5, 1.5, 2]`, the bins will be:
0. invalid values
1. (-infinity, 0.5]
2. (0.5, 1.5]
3. (1.5, 2]
4. (2, infinity)
*/
#[derive(Clone, Debug, PartialEq)]
pub struct BinningInstruction {
	pub thresholds: Vec<f32>,
}

impl BinningInstruction {
	pub fn n_bins(&self) -> usize {
		1 + self.n_valid_bins()
	}

	pub fn n_valid_bins(&self) -> usize {
		self.thresholds.len() + 1
	}

	pub fn bin(&self, value: f32) -> u8 {
		if value.is_nan() {
			return 0;
		}
		let position = self.thresholds.partition_point(|threshold| *threshold < value);
		(position + 1).to_u8().unwrap()
	}
}

/// The binned values of each feature, stored column major, along with the instructions used to bin them.
#[derive(Clone, Debug)]
pub struct BinnedFeatures {
	pub columns: Vec<Vec<u8>>,
	pub binning_instructions: Vec<BinningInstruction>,
}

/// Bin every column in `features`. `max_valid_bins` must be at most 255 so bin indexes fit in a `u8`.
pub fn compute_binned_features(
	features: ArrayView2<f32>,
	max_valid_bins: u8,
	max_examples_for_computing_bin_thresholds: usize,
) -> BinnedFeatures {
	let n_features = features.ncols();
	let (columns, binning_instructions): (Vec<Vec<u8>>, Vec<BinningInstruction>) = (0..n_features)
		.into_par_iter()
		.map(|feature_index| {
			let column = features.column(feature_index);
			let binning_instruction = compute_binning_instruction(
				column,
				max_valid_bins,
				max_examples_for_computing_bin_thresholds,
			);
			let binned = column
				.iter()
				.map(|value| binning_instruction.bin(*value))
				.collect::<Vec<u8>>();
			(binned, binning_instruction)
		})
		.unzip();
	BinnedFeatures {
		columns,
		binning_instructions,
	}
}

/// Compute the binning instruction for a number feature.
fn compute_binning_instruction(
	column: ArrayView1<f32>,
	max_valid_bins: u8,
	max_examples_for_computing_bin_thresholds: usize,
) -> BinningInstruction {
	// Create a histogram of values in the number feature.
	let mut histogram: BTreeMap<Finite<f32>, usize> = BTreeMap::new();
	let mut histogram_values_count = 0;
	for value in column.iter().take(max_examples_for_computing_bin_thresholds) {
		if let Ok(value) = Finite::new(*value) {
			*histogram.entry(value).or_insert(0) += 1;
			histogram_values_count += 1;
		}
	}
	// If the number of unique values is less than `max_valid_bins`, then create one bin per unique value. Otherwise, create bins at quantiles.
	let thresholds = if histogram.len() < max_valid_bins.to_usize().unwrap() {
		histogram
			.keys()
			.tuple_windows()
			.map(|(a, b)| (a.get() + b.get()) / 2.0)
			.collect()
	} else {
		compute_thresholds_as_quantiles_from_histogram(
			histogram,
			histogram_values_count,
			max_valid_bins,
		)
	};
	BinningInstruction { thresholds }
}

/// Compute the thresholds for a number feature as quantiles from the histogram of its values.
fn compute_thresholds_as_quantiles_from_histogram(
	histogram: BTreeMap<Finite<f32>, usize>,
	histogram_values_count: usize,
	max_valid_bins: u8,
) -> Vec<f32> {
	let total_values_count = histogram_values_count.to_f32().unwrap();
	let max_valid_bins = max_valid_bins.to_usize().unwrap();
	let quantiles: Vec<f32> = (1..max_valid_bins)
		.map(|i| i.to_f32().unwrap() / max_valid_bins.to_f32().unwrap())
		.collect();
	let quantile_indexes: Vec<usize> = quantiles
		.iter()
		.map(|q| ((total_values_count - 1.0) * q).trunc().to_usize().unwrap())
		.collect();
	let quantile_fracts: Vec<f32> = quantiles
		.iter()
		.map(|q| ((total_values_count - 1.0) * q).fract())
		.collect();
	let mut quantiles: Vec<Option<f32>> = vec![None; quantiles.len()];
	let mut current_count: usize = 0;
	let mut iter = histogram.iter().peekable();
	while let Some((value, count)) = iter.next() {
		let value = value.get();
		current_count += count;
		let next_value = iter.peek().map(|(next_value, _)| next_value.get());
		let quantiles_iter = quantiles
			.iter_mut()
			.zip(quantile_indexes.iter().zip(quantile_fracts.iter()))
			.filter(|(q, (_, _))| q.is_none());
		for (quantile, (index, fract)) in quantiles_iter {
			match (current_count - 1).cmp(index) {
				Ordering::Equal => match next_value {
					Some(next_value) if *fract > 0.0 => {
						*quantile = Some(value * (1.0 - fract) + next_value * fract);
					}
					_ => *quantile = Some(value),
				},
				Ordering::Greater => *quantile = Some(value),
				Ordering::Less => {}
			}
		}
	}
	let mut thresholds: Vec<f32> = quantiles.into_iter().flatten().collect();
	thresholds.dedup();
	thresholds
}

#[test]
fn test_binning_few_unique_values() {
	let features = arr2(&[[1.0f32], [3.0], [2.0], [3.0], [f32::NAN]]);
	let binned = compute_binned_features(features.view(), 255, 200_000);
	assert_eq!(binned.binning_instructions[0].thresholds, vec![1.5, 2.5]);
	assert_eq!(binned.columns[0], vec![1, 3, 2, 3, 0]);
	assert_eq!(binned.binning_instructions[0].n_bins(), 4);
}

#[test]
fn test_binning_quantiles() {
	let values: Vec<f32> = (0..1000).map(|i| i as f32).collect();
	let features = Array2::from_shape_vec((1000, 1), values).unwrap();
	let binned = compute_binned_features(features.view(), 4, 200_000);
	let instruction = &binned.binning_instructions[0];
	assert_eq!(instruction.thresholds.len(), 3);
	assert!(instruction.n_bins() <= 5);
	// Every bin index is within range and the bins are monotonic in the value.
	let column = &binned.columns[0];
	assert!(column.windows(2).all(|pair| pair[0] <= pair[1]));
	assert_eq!(column[0], 1);
	assert_eq!(column[999], 4);
}
