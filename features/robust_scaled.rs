use autovalue_dataframe::NumberColumn;
use autovalue_metrics::{Metric, Quartiles};
use autovalue_util::zip;
use ndarray::prelude::*;
use num_traits::ToPrimitive;

/**
A `RobustScaledFeatureGroup` centers a number column on its median and divides by its interquartile range, so a few extreme listings do not squash the scale of everything else.

`feature_value = (value - median) / (q3 - q1)`

If the interquartile range is zero, the scale is 1, so the values are only centered.

# Example

| dataframe value | feature value |
|-----------------|---------------|
| 1.0             | -1.0          |
| 2.0             | -0.5          |
| 3.0             | 0.0           |
| 4.0             | 0.5           |
| 100.0           | 48.5          |
*/
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RobustScaledFeatureGroup {
	pub source_column_name: String,
	pub median: f64,
	pub scale: f64,
}

impl RobustScaledFeatureGroup {
	pub fn fit(column: &NumberColumn) -> RobustScaledFeatureGroup {
		let (median, scale) = match Quartiles::compute(column.as_slice()) {
			Some(quartiles) if quartiles.iqr() > 0.0 => (quartiles.median, quartiles.iqr()),
			Some(quartiles) => (quartiles.median, 1.0),
			None => (0.0, 1.0),
		};
		RobustScaledFeatureGroup {
			source_column_name: column.name.clone(),
			median,
			scale,
		}
	}

	/// Scale a single value. NaN stays NaN, and the trees send it down their invalid value branch.
	pub fn compute_value(&self, value: f64) -> f32 {
		((value - self.median) / self.scale).to_f32().unwrap()
	}

	/// Write the scaled values into the single column of `features`. If the column is absent, every value is read as 0.
	pub fn compute_array_f32(&self, mut features: ArrayViewMut2<f32>, values: Option<&[f64]>) {
		match values {
			Some(values) => {
				for (feature, value) in zip!(features.iter_mut(), values.iter()) {
					*feature = self.compute_value(*value);
				}
			}
			None => features.fill(self.compute_value(0.0)),
		}
	}
}

#[test]
fn test_robust_scaled() {
	let column = NumberColumn::new("x".to_owned(), vec![1.0, 2.0, 3.0, 4.0, 100.0]);
	let feature_group = RobustScaledFeatureGroup::fit(&column);
	assert_eq!(feature_group.median, 3.0);
	assert_eq!(feature_group.scale, 2.0);
	let mut features = Array2::zeros((5, 1));
	feature_group.compute_array_f32(features.view_mut(), Some(column.as_slice()));
	assert_eq!(
		features.column(0).to_vec(),
		vec![-1.0, -0.5, 0.0, 0.5, 48.5]
	);
	feature_group.compute_array_f32(features.view_mut(), None);
	assert_eq!(features.column(0).to_vec(), vec![-1.5; 5]);
}

#[test]
fn test_robust_scaled_zero_iqr() {
	let column = NumberColumn::new("x".to_owned(), vec![1.0, 1.0, 1.0, 1.0, 5.0]);
	let feature_group = RobustScaledFeatureGroup::fit(&column);
	assert_eq!(feature_group.median, 1.0);
	assert_eq!(feature_group.scale, 1.0);
	assert_eq!(feature_group.compute_value(5.0), 4.0);
}
