use autovalue_dataframe::TextColumn;
use ndarray::prelude::*;
use std::collections::BTreeSet;

/**
A `OneHotEncodedFeatureGroup` creates one number feature for each distinct value seen in a text column during fitting. For each example, all of the features will have the value 0.0, except the feature corresponding to the column's value, which will have the value 1.0. Missing values and values not seen during fitting produce all zeros.

# Example

Options, sorted: `["Automatic", "Manual"]`.

| dataframe value | feature values |
|-----------------|----------------|
| "Manual"        | [0, 1]         |
| "Automatic"     | [1, 0]         |
| "Semi-Auto"     | [0, 0]         |
| missing         | [0, 0]         |
*/
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OneHotEncodedFeatureGroup {
	pub source_column_name: String,
	pub options: Vec<String>,
}

impl OneHotEncodedFeatureGroup {
	pub fn fit(column: &TextColumn) -> OneHotEncodedFeatureGroup {
		let options: BTreeSet<&str> = column.iter().flatten().collect();
		OneHotEncodedFeatureGroup {
			source_column_name: column.name.clone(),
			options: options.into_iter().map(|option| option.to_owned()).collect(),
		}
	}

	pub fn option_index(&self, value: &str) -> Option<usize> {
		self.options
			.binary_search_by(|option| option.as_str().cmp(value))
			.ok()
	}

	/// The name of each feature, such as `Transmission=Manual`.
	pub fn feature_names(&self) -> Vec<String> {
		self.options
			.iter()
			.map(|option| format!("{}={}", self.source_column_name, option))
			.collect()
	}

	/// Write one row of indicator features per example into `features`. If the column is absent, every row is zero.
	pub fn compute_array_f32(&self, mut features: ArrayViewMut2<f32>, column: Option<&TextColumn>) {
		// Fill the features with zeros.
		features.fill(0.0);
		let column = match column {
			Some(column) => column,
			None => return,
		};
		// For each example, set the feature corresponding to its value to one.
		for (mut features, value) in features.axis_iter_mut(Axis(0)).zip(column.iter()) {
			if let Some(feature_index) = value.and_then(|value| self.option_index(value)) {
				features[feature_index] = 1.0;
			}
		}
	}
}

#[test]
fn test_one_hot_encoded() {
	let column = TextColumn::new(
		"Transmission".to_owned(),
		vec![
			Some("Manual".to_owned()),
			None,
			Some("Automatic".to_owned()),
			Some("Manual".to_owned()),
		],
	);
	let feature_group = OneHotEncodedFeatureGroup::fit(&column);
	assert_eq!(feature_group.options, vec!["Automatic", "Manual"]);
	assert_eq!(
		feature_group.feature_names(),
		vec!["Transmission=Automatic", "Transmission=Manual"]
	);
	let input = TextColumn::new(
		"Transmission".to_owned(),
		vec![Some("Semi-Auto".to_owned()), Some("Automatic".to_owned()), None],
	);
	let mut features = Array2::ones((3, 2));
	feature_group.compute_array_f32(features.view_mut(), Some(&input));
	assert_eq!(features, arr2(&[[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]));
}
