use autovalue_metrics::{
	MeanAbsolutePercentageError, RegressionMetrics, RegressionMetricsInput, StreamingMetric,
};

/// The metrics of a price model on held out listings. `r2` is computed on log prices. The others are computed on prices.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EvaluationMetrics {
	pub n_examples: usize,
	pub r2: f64,
	pub rmse: f64,
	pub mae: f64,
	pub mape: f64,
	/// `100 - mape`.
	pub accuracy: f64,
}

/// Evaluate log price predictions. The metrics are diagnostic. They are reported and stored, but a poor score never stops a model from being saved.
pub fn evaluate(log_labels: &[f64], log_predictions: &[f64]) -> EvaluationMetrics {
	let mut log_metrics = RegressionMetrics::default();
	log_metrics.update(RegressionMetricsInput {
		predictions: log_predictions,
		labels: log_labels,
	});
	let log_metrics = log_metrics.finalize();
	let labels: Vec<f64> = log_labels.iter().map(|label| label.exp_m1()).collect();
	let predictions: Vec<f64> = log_predictions
		.iter()
		.map(|prediction| prediction.exp_m1())
		.collect();
	let mut metrics = RegressionMetrics::default();
	metrics.update(RegressionMetricsInput {
		predictions: &predictions,
		labels: &labels,
	});
	let metrics = metrics.finalize();
	let mut mape = MeanAbsolutePercentageError::default();
	for (prediction, label) in predictions.iter().zip(labels.iter()) {
		mape.update((*prediction, *label));
	}
	let mape = mape.finalize().unwrap_or(f64::NAN);
	EvaluationMetrics {
		n_examples: labels.len(),
		r2: log_metrics.r2,
		rmse: metrics.rmse,
		mae: metrics.mae,
		mape,
		accuracy: 100.0 - mape,
	}
}

#[test]
fn test_evaluate() {
	let labels: Vec<f64> = [100.0f64, 200.0].iter().map(|v| v.ln_1p()).collect();
	let predictions: Vec<f64> = [90.0f64, 220.0].iter().map(|v| v.ln_1p()).collect();
	let metrics = evaluate(&labels, &predictions);
	assert_eq!(metrics.n_examples, 2);
	assert!((metrics.mae - 15.0).abs() < 1e-9);
	assert!((metrics.rmse - 250f64.sqrt()).abs() < 1e-9);
	assert!((metrics.mape - 10.0).abs() < 1e-9);
	assert!((metrics.accuracy - 90.0).abs() < 1e-9);
	let mean = (labels[0] + labels[1]) / 2.0;
	let ss_res = (labels[0] - predictions[0]).powi(2) + (labels[1] - predictions[1]).powi(2);
	let ss_tot = (labels[0] - mean).powi(2) + (labels[1] - mean).powi(2);
	assert!((metrics.r2 - (1.0 - ss_res / ss_tot)).abs() < 1e-9);
}

#[test]
fn test_log_round_trip() {
	for price in [0.0f64, 1.0, 99_999.0, 312_450.0, 25_000_000.0].iter() {
		let round_trip = price.ln_1p().exp_m1();
		assert!((round_trip - price).abs() <= price.abs() * 1e-12 + 1e-12);
	}
}
