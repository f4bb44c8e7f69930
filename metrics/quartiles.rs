use super::Metric;
use num_traits::ToPrimitive;

/// The first quartile, median and third quartile of a slice of values. NaN values are ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
	pub q1: f64,
	pub median: f64,
	pub q3: f64,
}

impl Quartiles {
	pub fn iqr(&self) -> f64 {
		self.q3 - self.q1
	}
}

impl<'a> Metric<'a> for Quartiles {
	type Input = &'a [f64];
	type Output = Option<Quartiles>;

	fn compute(input: &'a [f64]) -> Option<Quartiles> {
		let mut values: Vec<f64> = input.iter().cloned().filter(|v| !v.is_nan()).collect();
		values.sort_by(|a, b| a.partial_cmp(b).unwrap());
		Some(Quartiles {
			q1: quantile(&values, 0.25)?,
			median: quantile(&values, 0.5)?,
			q3: quantile(&values, 0.75)?,
		})
	}
}

/// Compute the `q`th quantile of `sorted_values` by linear interpolation between the two order statistics nearest to position `(n - 1) * q`.
pub fn quantile(sorted_values: &[f64], q: f64) -> Option<f64> {
	if sorted_values.is_empty() {
		return None;
	}
	let position = (sorted_values.len() - 1).to_f64().unwrap() * q;
	let lower = position.floor();
	let fraction = position - lower;
	let lower = lower.to_usize().unwrap();
	let upper = (lower + 1).min(sorted_values.len() - 1);
	Some(sorted_values[lower] + (sorted_values[upper] - sorted_values[lower]) * fraction)
}

#[test]
fn test_quartiles() {
	let quartiles = Quartiles::compute(&[100.0, 2.0, f64::NAN, 1.0, 4.0, 3.0]).unwrap();
	insta::assert_debug_snapshot!(quartiles, @r###"
 Quartiles {
     q1: 2.0,
     median: 3.0,
     q3: 4.0,
 }
 "###);
	assert_eq!(quartiles.iqr(), 2.0);
	assert!(Quartiles::compute(&[f64::NAN]).is_none());
}

#[test]
fn test_quantile_interpolates() {
	let values = [1.0, 2.0, 3.0, 4.0];
	assert_eq!(quantile(&values, 0.25), Some(1.75));
	assert_eq!(quantile(&values, 0.5), Some(2.5));
	assert_eq!(quantile(&values, 1.0), Some(4.0));
	assert_eq!(quantile(&[7.0], 0.75), Some(7.0));
}
