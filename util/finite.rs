/*!
`Finite` wraps a float that is known to be neither NaN nor infinite, which makes it totally ordered. The tree crate uses it to key the histograms of feature values it computes bin thresholds from.
*/

use num_traits::Float;
use std::cmp::{Ord, Ordering};
use thiserror::Error;

#[derive(Clone, Copy, Debug)]
pub struct Finite<T>(T)
where
	T: Float;

#[derive(Debug, Error)]
#[error("not finite")]
pub struct NotFiniteError;

impl<T> Finite<T>
where
	T: Float,
{
	pub fn new(value: T) -> Result<Self, NotFiniteError> {
		if value.is_finite() {
			Ok(Self(value))
		} else {
			Err(NotFiniteError)
		}
	}

	pub fn get(self) -> T {
		self.0
	}
}

impl<T> PartialEq for Finite<T>
where
	T: Float,
{
	#[inline]
	fn eq(&self, other: &Self) -> bool {
		self.0.eq(&other.0)
	}
}

impl<T> Eq for Finite<T> where T: Float {}

impl<T> PartialOrd for Finite<T>
where
	T: Float,
{
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl<T> Ord for Finite<T>
where
	T: Float,
{
	fn cmp(&self, other: &Self) -> Ordering {
		// Neither value is NaN, so `partial_cmp` always returns `Some`.
		self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
	}
}

#[test]
fn test_finite() {
	assert!(Finite::new(f32::NAN).is_err());
	assert!(Finite::new(f64::INFINITY).is_err());
	let mut values: Vec<Finite<f64>> = vec![3.0, -1.0, 2.5]
		.into_iter()
		.map(|value: f64| Finite::new(value).unwrap())
		.collect();
	values.sort();
	let values: Vec<f64> = values.into_iter().map(|value| value.get()).collect();
	assert_eq!(values, vec![-1.0, 2.5, 3.0]);
}
