use anyhow::{bail, Result};
use autovalue_metrics::quantile;
use num_traits::ToPrimitive;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use std::cmp::Ordering;

/// The row indexes of a train/test split.
#[derive(Clone, Debug, PartialEq)]
pub struct Split {
	pub train: Vec<usize>,
	pub test: Vec<usize>,
}

/**
Assign each price to a decile bin. Bin edges that coincide are merged, so heavily repeated prices can produce fewer than ten bins. A price equal to an edge falls in the lower bin.
*/
pub fn price_deciles(prices: &[f64]) -> Vec<usize> {
	let mut sorted: Vec<f64> = prices.to_owned();
	sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
	let mut edges: Vec<f64> = (0..=10)
		.filter_map(|i| quantile(&sorted, i.to_f64().unwrap() / 10.0))
		.collect();
	edges.dedup();
	// The inner edges separate the bins.
	let inner_edges = if edges.len() > 2 {
		&edges[1..edges.len() - 1]
	} else {
		&[]
	};
	prices
		.iter()
		.map(|price| inner_edges.partition_point(|edge| edge < price))
		.collect()
}

/**
Split the rows into a train set and a test set, so that each price decile is represented in the test set in proportion to its size.

The test set has `ceil(n * test_fraction)` rows. Each stratum first gets its proportional share rounded down, and the rows left over go to the strata with the largest remainders. Rows within each stratum are shuffled with a generator seeded by `seed`, as are the final train and test sets.
*/
pub fn stratified_split(prices: &[f64], test_fraction: f64, seed: u64) -> Result<Split> {
	let n_rows = prices.len();
	if !(test_fraction > 0.0 && test_fraction < 1.0) {
		bail!("the test fraction must be between 0 and 1, got {}", test_fraction);
	}
	let n_test = (n_rows.to_f64().unwrap() * test_fraction)
		.ceil()
		.to_usize()
		.unwrap();
	if n_test == 0 || n_test >= n_rows {
		bail!(
			"unable to split {} rows into train and test sets with a test fraction of {}",
			n_rows,
			test_fraction
		);
	}
	let bins = price_deciles(prices);
	let n_bins = bins.iter().max().map(|max| max + 1).unwrap_or(0);
	let mut strata: Vec<Vec<usize>> = vec![Vec::new(); n_bins];
	for (row_index, bin) in bins.iter().enumerate() {
		strata[*bin].push(row_index);
	}
	// Allocate the test rows to the strata.
	let fraction = n_test.to_f64().unwrap() / n_rows.to_f64().unwrap();
	let mut allocation: Vec<usize> = Vec::with_capacity(n_bins);
	let mut remainders: Vec<(f64, usize)> = Vec::with_capacity(n_bins);
	for (stratum_index, stratum) in strata.iter().enumerate() {
		let share = stratum.len().to_f64().unwrap() * fraction;
		allocation.push(share.floor().to_usize().unwrap());
		remainders.push((share - share.floor(), stratum_index));
	}
	remainders.sort_by(|a, b| {
		b.0.partial_cmp(&a.0)
			.unwrap_or(Ordering::Equal)
			.then(a.1.cmp(&b.1))
	});
	let mut n_unallocated = n_test - allocation.iter().sum::<usize>();
	for (_, stratum_index) in remainders.iter().cycle() {
		if n_unallocated == 0 {
			break;
		}
		if allocation[*stratum_index] < strata[*stratum_index].len() {
			allocation[*stratum_index] += 1;
			n_unallocated -= 1;
		}
	}
	let mut rng = Xoshiro256Plus::seed_from_u64(seed);
	let mut train = Vec::with_capacity(n_rows - n_test);
	let mut test = Vec::with_capacity(n_test);
	for (stratum, n_test_stratum) in strata.iter_mut().zip(allocation) {
		stratum.shuffle(&mut rng);
		test.extend_from_slice(&stratum[..n_test_stratum]);
		train.extend_from_slice(&stratum[n_test_stratum..]);
	}
	train.shuffle(&mut rng);
	test.shuffle(&mut rng);
	Ok(Split { train, test })
}

#[test]
fn test_price_deciles() {
	let prices: Vec<f64> = (1..=20).map(|i| i.to_f64().unwrap()).collect();
	let bins = price_deciles(&prices);
	assert_eq!(bins[0], 0);
	assert_eq!(bins[1], 0);
	assert_eq!(bins[19], 9);
	// Repeated prices collapse edges.
	let bins = price_deciles(&[5.0, 5.0, 5.0, 5.0, 9.0]);
	assert_eq!(bins, vec![0, 0, 0, 0, 2]);
}

#[test]
fn test_stratified_split() {
	let prices: Vec<f64> = (0..100).map(|i| (i % 50).to_f64().unwrap() * 1000.0).collect();
	let split = stratified_split(&prices, 0.2, 42).unwrap();
	assert_eq!(split.test.len(), 20);
	assert_eq!(split.train.len(), 80);
	let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).cloned().collect();
	all.sort_unstable();
	assert_eq!(all, (0..100).collect::<Vec<_>>());
	// Each decile contributes two test rows.
	let bins = price_deciles(&prices);
	let mut counts = vec![0; 10];
	for row_index in split.test.iter() {
		counts[bins[*row_index]] += 1;
	}
	assert_eq!(counts, vec![2; 10]);
	assert_eq!(split, stratified_split(&prices, 0.2, 42).unwrap());
	assert!(stratified_split(&prices[..1], 0.2, 42).is_err());
}
