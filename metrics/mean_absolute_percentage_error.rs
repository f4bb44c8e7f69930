use super::StreamingMetric;
use num_traits::ToPrimitive;

/// This value is added to each label before dividing so a label of zero does not produce an infinite error.
pub const MAPE_EPSILON: f64 = 1e-10;

/**
The mean absolute percentage error is the mean of `|(label - prediction) / (label + ε)|`, expressed as a percentage. The input is `(prediction, label)`.

Unlike the other regression metrics, MAPE is scale free, so it is reported on prices after they are transformed back from log space, and `100 - MAPE` is presented to users as the model's approximate accuracy.
*/
#[derive(Debug, Clone, Default)]
pub struct MeanAbsolutePercentageError {
	n: u64,
	sum: f64,
}

impl StreamingMetric<'_> for MeanAbsolutePercentageError {
	type Input = (f64, f64);
	type Output = Option<f64>;

	fn update(&mut self, (prediction, label): Self::Input) {
		self.n += 1;
		self.sum += ((label - prediction) / (label + MAPE_EPSILON)).abs();
	}

	fn merge(&mut self, other: Self) {
		self.n += other.n;
		self.sum += other.sum;
	}

	fn finalize(self) -> Self::Output {
		if self.n == 0 {
			None
		} else {
			Some(100.0 * self.sum / self.n.to_f64().unwrap())
		}
	}
}

#[test]
fn test_mean_absolute_percentage_error() {
	let mut mape = MeanAbsolutePercentageError::default();
	mape.update((90.0, 100.0));
	mape.update((220.0, 200.0));
	let value = mape.finalize().unwrap();
	assert!((value - 10.0).abs() < 1e-6);
}

#[test]
fn test_mean_absolute_percentage_error_zero_label() {
	let mut mape = MeanAbsolutePercentageError::default();
	mape.update((0.0, 0.0));
	assert_eq!(mape.finalize(), Some(0.0));
	let mut mape = MeanAbsolutePercentageError::default();
	mape.update((1.0, 0.0));
	assert!(mape.finalize().unwrap().is_finite());
}
