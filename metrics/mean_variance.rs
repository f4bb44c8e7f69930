//! https://en.wikipedia.org/wiki/Algorithms_for_calculating_variance#Parallel_algorithm

use super::Metric;
use num_traits::ToPrimitive;

/// Combine two separate means and m2s into a single mean and m2. This is useful in parallel and streaming algorithms.
pub fn merge_mean_m2(
	n_a: u64,
	mean_a: f64,
	m2_a: f64,
	n_b: u64,
	mean_b: f64,
	m2_b: f64,
) -> (f64, f64) {
	let n_a = n_a.to_f64().unwrap();
	let n_b = n_b.to_f64().unwrap();
	(
		(((n_a * mean_a) + (n_b * mean_b)) / (n_a + n_b)),
		m2_a + m2_b + (mean_b - mean_a) * (mean_b - mean_a) * (n_a * n_b / (n_a + n_b)),
	)
}

pub fn m2_to_variance(m2: f64, n: u64) -> f64 {
	m2 / n.to_f64().unwrap()
}

/// The mean and population variance of a slice of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanVariance {
	pub n: u64,
	pub mean: f64,
	pub variance: f64,
}

impl<'a> Metric<'a> for MeanVariance {
	type Input = &'a [f64];
	type Output = Option<MeanVariance>;

	fn compute(input: &'a [f64]) -> Option<MeanVariance> {
		let mut n = 0u64;
		let mut mean = 0.0;
		let mut m2 = 0.0;
		for value in input {
			let (new_mean, new_m2) = merge_mean_m2(n, mean, m2, 1, *value, 0.0);
			n += 1;
			mean = new_mean;
			m2 = new_m2;
		}
		if n == 0 {
			return None;
		}
		Some(MeanVariance {
			n,
			mean,
			variance: m2_to_variance(m2, n),
		})
	}
}

#[test]
fn test_mean_variance() {
	let output = MeanVariance::compute(&[0.0, 5.2, 1.3, 10.0]).unwrap();
	assert_eq!(output.n, 4);
	assert!((output.mean - 4.125).abs() < 1e-12);
	assert!((output.variance - 15.166875).abs() < 1e-9);
	assert!(MeanVariance::compute(&[]).is_none());
}
