use super::{mean_variance::merge_mean_m2, StreamingMetric};
use num_traits::ToPrimitive;

/// `RegressionMetrics` computes the common regression metrics: mean squared error, root mean squared error, mean absolute error and the coefficient of determination.
#[derive(Debug, Clone, Default)]
pub struct RegressionMetrics {
	mean_variance: Option<MeanVarianceState>,
	absolute_error: f64,
	squared_error: f64,
}

#[derive(Debug, Clone)]
struct MeanVarianceState {
	n: u64,
	m2: f64,
	mean: f64,
}

pub struct RegressionMetricsInput<'a> {
	pub predictions: &'a [f64],
	pub labels: &'a [f64],
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RegressionMetricsOutput {
	pub mse: f64,
	pub rmse: f64,
	pub mae: f64,
	/// `r2` is NaN when the labels have zero variance.
	pub r2: f64,
	pub baseline_mse: f64,
	pub baseline_rmse: f64,
}

impl<'a> StreamingMetric<'a> for RegressionMetrics {
	type Input = RegressionMetricsInput<'a>;
	type Output = RegressionMetricsOutput;

	fn update(&mut self, input: RegressionMetricsInput) {
		let RegressionMetricsInput {
			predictions,
			labels,
		} = input;
		for (prediction, label) in predictions.iter().zip(labels.iter()) {
			match &mut self.mean_variance {
				Some(mean_variance) => {
					let (mean, m2) = merge_mean_m2(
						mean_variance.n,
						mean_variance.mean,
						mean_variance.m2,
						1,
						*label,
						0.0,
					);
					mean_variance.n += 1;
					mean_variance.mean = mean;
					mean_variance.m2 = m2;
				}
				None => {
					self.mean_variance = Some(MeanVarianceState {
						n: 1,
						mean: *label,
						m2: 0.0,
					})
				}
			}
			let error = prediction - label;
			self.absolute_error += error.abs();
			self.squared_error += error * error;
		}
	}

	fn merge(&mut self, other: Self) {
		match &mut self.mean_variance {
			Some(mean_variance) => {
				if let Some(other) = other.mean_variance {
					let (mean, m2) = merge_mean_m2(
						mean_variance.n,
						mean_variance.mean,
						mean_variance.m2,
						other.n,
						other.mean,
						other.m2,
					);
					mean_variance.mean = mean;
					mean_variance.m2 = m2;
					mean_variance.n += other.n;
				}
			}
			None => {
				self.mean_variance = other.mean_variance;
			}
		}
		self.absolute_error += other.absolute_error;
		self.squared_error += other.squared_error;
	}

	fn finalize(self) -> Self::Output {
		let (n, variance) = match self.mean_variance {
			Some(m) => (m.n.to_f64().unwrap(), m.m2 / m.n.to_f64().unwrap()),
			None => (0.0, f64::NAN),
		};
		let mae = self.absolute_error / n;
		let mse = self.squared_error / n;
		let rmse = mse.sqrt();
		let r2 = 1.0 - self.squared_error / (variance * n);
		let baseline_mse = variance;
		let baseline_rmse = baseline_mse.sqrt();
		RegressionMetricsOutput {
			mae,
			mse,
			r2,
			rmse,
			baseline_mse,
			baseline_rmse,
		}
	}
}

#[test]
fn test_regression_metrics() {
	let mut metrics = RegressionMetrics::default();
	metrics.update(RegressionMetricsInput {
		predictions: &[2.5, 0.0],
		labels: &[3.0, -0.5],
	});
	let mut other = RegressionMetrics::default();
	other.update(RegressionMetricsInput {
		predictions: &[2.0, 8.0],
		labels: &[2.0, 7.0],
	});
	metrics.merge(other);
	let output = metrics.finalize();
	insta::assert_debug_snapshot!(output, @r###"
 RegressionMetricsOutput {
     mse: 0.375,
     rmse: 0.6123724356957945,
     mae: 0.5,
     r2: 0.9486081370449679,
     baseline_mse: 7.296875,
     baseline_rmse: 2.7012728481217887,
 }
 "###);
}
