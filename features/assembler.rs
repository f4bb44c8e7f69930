use crate::{
	FeatureGroup, OneHotEncodedFeatureGroup, RobustScaledFeatureGroup, ASK_PRICE,
	BRAND_TARGET_ENCODING, FUEL_TYPE, LOG_ASK_PRICE, OWNER, TRANSMISSION,
};
use anyhow::{format_err, Result};
use autovalue_dataframe::{Column, DataFrame, NumberColumn};
use ndarray::{prelude::*, s};

/// The text columns that are one hot encoded when they are present.
pub const CATEGORICAL_COLUMN_CANDIDATES: &[&str] = &[TRANSMISSION, OWNER, FUEL_TYPE];

/// Number columns that are never features because they hold the target.
pub const TARGET_COLUMNS: &[&str] = &[ASK_PRICE, LOG_ASK_PRICE];

/**
A `FeatureAssembler` turns an engineered dataframe into the feature matrix.

When fit, it freezes the ordered list of number columns and categorical columns, fitting a [`RobustScaledFeatureGroup`](struct.RobustScaledFeatureGroup.html) for each number column and a [`OneHotEncodedFeatureGroup`](struct.OneHotEncodedFeatureGroup.html) for each categorical column. Afterward, `transform` always produces the same columns in the same order, whatever the input looks like:

- A number column missing from the input is read as 0 before scaling.
- A categorical column missing from the input, a missing value, or a value not seen during fitting produces zeros.
- Columns the assembler was not fit on are ignored.
*/
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureAssembler {
	pub numeric_columns: Vec<String>,
	pub categorical_columns: Vec<String>,
	pub feature_groups: Vec<FeatureGroup>,
}

impl FeatureAssembler {
	pub fn fit(dataframe: &DataFrame) -> Result<FeatureAssembler> {
		let mut numeric_columns: Vec<String> = dataframe
			.columns
			.iter()
			.filter_map(|column| column.as_number())
			.map(|column| column.name.clone())
			.filter(|name| !TARGET_COLUMNS.contains(&name.as_str()))
			.collect();
		if !numeric_columns
			.iter()
			.any(|name| name == BRAND_TARGET_ENCODING)
		{
			numeric_columns.push(BRAND_TARGET_ENCODING.to_owned());
		}
		let categorical_columns: Vec<String> = CATEGORICAL_COLUMN_CANDIDATES
			.iter()
			.filter(|name| dataframe.has_column(name))
			.map(|name| name.to_string())
			.collect();
		let mut feature_groups = Vec::new();
		for name in numeric_columns.iter() {
			let column = dataframe
				.number_column(name)
				.ok_or_else(|| format_err!("the {} column is required to fit the features", name))?;
			feature_groups.push(FeatureGroup::RobustScaled(RobustScaledFeatureGroup::fit(
				column,
			)));
		}
		for name in categorical_columns.iter() {
			let column = dataframe
				.text_column(name)
				.ok_or_else(|| format_err!("expected the {} column to be a text column", name))?;
			feature_groups.push(FeatureGroup::OneHotEncoded(OneHotEncodedFeatureGroup::fit(
				column,
			)));
		}
		tracing::info!(
			numeric_columns = ?numeric_columns,
			categorical_columns = ?categorical_columns,
			"selected feature columns"
		);
		Ok(FeatureAssembler {
			numeric_columns,
			categorical_columns,
			feature_groups,
		})
	}

	pub fn n_features(&self) -> usize {
		self.feature_groups
			.iter()
			.map(|feature_group| feature_group.n_features())
			.sum()
	}

	/// The names of the output columns, in order.
	pub fn feature_names(&self) -> Vec<String> {
		self.feature_groups
			.iter()
			.flat_map(|feature_group| match feature_group {
				FeatureGroup::RobustScaled(s) => vec![s.source_column_name.clone()],
				FeatureGroup::OneHotEncoded(s) => s.feature_names(),
			})
			.collect()
	}

	pub fn transform(&self, dataframe: &DataFrame) -> Array2<f32> {
		let mut features = Array2::zeros((dataframe.nrows(), self.n_features()));
		let mut offset = 0;
		for feature_group in self.feature_groups.iter() {
			let n_features = feature_group.n_features();
			let slice = s![.., offset..offset + n_features];
			let features = features.slice_mut(slice);
			let column = dataframe.column(feature_group.source_column_name());
			match feature_group {
				FeatureGroup::RobustScaled(feature_group) => feature_group.compute_array_f32(
					features,
					column
						.and_then(Column::as_number)
						.map(NumberColumn::as_slice),
				),
				FeatureGroup::OneHotEncoded(feature_group) => {
					feature_group.compute_array_f32(features, column.and_then(Column::as_text))
				}
			}
			offset += n_features;
		}
		features
	}
}

#[cfg(test)]
fn training_dataframe() -> DataFrame {
	use autovalue_dataframe::TextColumn;
	let text = |name: &str, values: &[&str]| {
		Column::Text(TextColumn::new(
			name.to_owned(),
			values.iter().map(|value| Some(value.to_string())).collect(),
		))
	};
	let number = |name: &str, values: &[f64]| {
		Column::Number(NumberColumn::new(name.to_owned(), values.to_owned()))
	};
	DataFrame::new(vec![
		text("Brand", &["Honda", "BMW", "Honda", "Ford"]),
		number("Age", &[1.0, 2.0, 3.0, 4.0]),
		text("Transmission", &["Manual", "Automatic", "Manual", "Manual"]),
		text("FuelType", &["Petrol", "Diesel", "CNG", "Petrol"]),
		number("AskPrice", &[5.0, 9.0, 4.0, 3.0]),
		number("LogAskPrice", &[1.8, 2.3, 1.6, 1.4]),
		number("Brand_TgtEnc", &[1.7, 2.3, 1.7, 1.4]),
	])
}

#[test]
fn test_fit_selects_columns() {
	let assembler = FeatureAssembler::fit(&training_dataframe()).unwrap();
	insta::assert_debug_snapshot!(assembler.feature_names(), @r###"
 [
     "Age",
     "Brand_TgtEnc",
     "Transmission=Automatic",
     "Transmission=Manual",
     "FuelType=CNG",
     "FuelType=Diesel",
     "FuelType=Petrol",
 ]
 "###);
	assert_eq!(assembler.categorical_columns, vec!["Transmission", "FuelType"]);
	assert_eq!(assembler.n_features(), 7);
}

#[test]
fn test_transform_handles_schema_drift() {
	use autovalue_dataframe::TextColumn;
	let assembler = FeatureAssembler::fit(&training_dataframe()).unwrap();
	// An unseen fuel type, no transmission column, no target encoding, and an extra column.
	let dataframe = DataFrame::new(vec![
		Column::Number(NumberColumn::new("Age".to_owned(), vec![2.5])),
		Column::Text(TextColumn::new(
			"FuelType".to_owned(),
			vec![Some("Hydrogen".to_owned())],
		)),
		Column::Number(NumberColumn::new("Doors".to_owned(), vec![4.0])),
	]);
	let features = assembler.transform(&dataframe);
	assert_eq!(features.shape(), &[1, 7]);
	// Age has median 2.5 and an interquartile range of 1.5.
	assert_eq!(features[(0, 0)], 0.0);
	// The target encoding is read as 0 and scaled with median 1.7 and interquartile range 0.225.
	assert!((features[(0, 1)] - (0.0 - 1.7) / 0.225).abs() < 1e-4);
	assert_eq!(features.row(0).slice(s![2..]).to_vec(), vec![0.0; 5]);
}
