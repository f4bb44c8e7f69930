/*!
This module cleans raw listings before any features are computed. Prices and mileages arrive formatted for people, such as `₹1,95,000` or `45,000 km`, so they are parsed into numbers, rows without a price, mileage or age are dropped, and extreme prices and mileages are removed with an interquartile range filter.
*/

use anyhow::{bail, Result};
use autovalue_dataframe::{Column, DataFrame, NumberColumn};
use autovalue_features::{AGE, ASK_PRICE, BRAND, KM_DRIVEN};
use autovalue_metrics::{Metric, Quartiles};
use tracing::{info, warn};

/// Training fails if any of these columns is absent.
pub const ESSENTIAL_COLUMNS: &[&str] = &[ASK_PRICE, KM_DRIVEN, AGE, BRAND];

/// These columns are parsed into numbers. A row is dropped if any of them is missing.
pub const REQUIRED_NUMBER_COLUMNS: &[&str] = &[ASK_PRICE, KM_DRIVEN, AGE];

/// These columns are removed because the model never uses them.
pub const UNUSED_COLUMNS: &[&str] = &["Year", "PostedDate", "AdditionInfo", "model"];

const CURRENCY_PREFIXES: &[&str] = &["₹", "Rs.", "Rs", "$"];
const UNIT_SUFFIXES: &[&str] = &["kms", "km"];

#[derive(Clone, Debug)]
pub struct CleanOptions {
	/// Values more than this many interquartile ranges below the first quartile or above the third quartile are outliers.
	pub outlier_multiplier: f64,
}

impl Default for CleanOptions {
	fn default() -> Self {
		Self {
			outlier_multiplier: 3.0,
		}
	}
}

/// The number of rows remaining after each stage of cleaning.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CleanReport {
	pub n_rows_loaded: usize,
	/// Non missing values in the number columns that could not be parsed. They are treated as missing.
	pub n_unparseable_values: usize,
	pub n_rows_after_dropping_missing: usize,
	pub n_rows_after_price_filter: usize,
	pub n_rows_after_mileage_filter: usize,
}

/**
Parse a number formatted with a currency marker, thousands separators, or a distance unit.

```
use autovalue_core::clean::parse_formatted_number;
assert_eq!(parse_formatted_number("₹12,345.00"), Some(12345.0));
assert_eq!(parse_formatted_number("45,000 km"), Some(45000.0));
assert_eq!(parse_formatted_number("call for price"), None);
```
*/
pub fn parse_formatted_number(text: &str) -> Option<f64> {
	let mut text = text.trim();
	for prefix in CURRENCY_PREFIXES {
		if let Some(rest) = text.strip_prefix(prefix) {
			text = rest.trim_start();
			break;
		}
	}
	let text: String = text.chars().filter(|c| *c != ',').collect();
	let mut text = text.trim();
	for suffix in UNIT_SUFFIXES {
		let split_index = match text.len().checked_sub(suffix.len()) {
			Some(split_index) => split_index,
			None => continue,
		};
		if let Some(unit) = text.get(split_index..) {
			if unit.eq_ignore_ascii_case(suffix) {
				text = text[..split_index].trim_end();
				break;
			}
		}
	}
	match lexical::parse::<f64, _>(text) {
		Ok(value) if value.is_finite() => Some(value),
		_ => None,
	}
}

/// Clean the raw listings. The returned dataframe has number columns for `AskPrice`, `kmDriven` and `Age`, none of which have missing values.
pub fn clean(dataframe: DataFrame, options: &CleanOptions) -> Result<(DataFrame, CleanReport)> {
	for column_name in ESSENTIAL_COLUMNS {
		if !dataframe.has_column(column_name) {
			bail!("the training data is missing the {} column", column_name);
		}
	}
	let n_rows_loaded = dataframe.nrows();
	let mut dataframe = dataframe;
	let mut n_unparseable_values = 0;
	for column_name in REQUIRED_NUMBER_COLUMNS {
		let column = match dataframe.column(column_name) {
			Some(Column::Text(column)) => {
				let data = column
					.iter()
					.map(|value| match value {
						Some(value) => parse_formatted_number(value).unwrap_or_else(|| {
							n_unparseable_values += 1;
							f64::NAN
						}),
						None => f64::NAN,
					})
					.collect();
				NumberColumn::new(column.name.clone(), data)
			}
			Some(Column::Number(column)) => column.clone(),
			None => unreachable!(),
		};
		dataframe.insert_column(Column::Number(column));
	}
	if n_unparseable_values > 0 {
		warn!(n_unparseable_values, "treating unparseable numbers as missing");
	}
	for column_name in UNUSED_COLUMNS {
		dataframe.remove_column(column_name);
	}

	// Drop rows missing a price, mileage or age.
	let mut mask = vec![true; dataframe.nrows()];
	for column_name in REQUIRED_NUMBER_COLUMNS {
		if let Some(column) = dataframe.number_column(column_name) {
			for (keep, value) in mask.iter_mut().zip(column.as_slice()) {
				*keep &= !value.is_nan();
			}
		}
	}
	let dataframe = dataframe.filter_rows(&mask);
	let n_rows_after_dropping_missing = dataframe.nrows();
	info!(
		n_rows_loaded,
		n_rows = n_rows_after_dropping_missing,
		"dropped rows with missing values"
	);

	// Filter prices first, then mileages on the rows that remain.
	let dataframe = filter_outliers(&dataframe, ASK_PRICE, options.outlier_multiplier);
	let n_rows_after_price_filter = dataframe.nrows();
	info!(n_rows = n_rows_after_price_filter, "removed price outliers");
	let dataframe = filter_outliers(&dataframe, KM_DRIVEN, options.outlier_multiplier);
	let n_rows_after_mileage_filter = dataframe.nrows();
	info!(n_rows = n_rows_after_mileage_filter, "removed mileage outliers");

	if dataframe.nrows() == 0 {
		bail!("no rows remain after cleaning the training data");
	}
	let report = CleanReport {
		n_rows_loaded,
		n_unparseable_values,
		n_rows_after_dropping_missing,
		n_rows_after_price_filter,
		n_rows_after_mileage_filter,
	};
	Ok((dataframe, report))
}

/// Keep the rows whose value in `column_name` is within `[q1 - k * iqr, q3 + k * iqr]`.
pub fn filter_outliers(dataframe: &DataFrame, column_name: &str, multiplier: f64) -> DataFrame {
	let values = match dataframe.number_column(column_name) {
		Some(column) => column.as_slice(),
		None => return dataframe.clone(),
	};
	let quartiles = match Quartiles::compute(values) {
		Some(quartiles) => quartiles,
		None => return dataframe.clone(),
	};
	let lower = quartiles.q1 - multiplier * quartiles.iqr();
	let upper = quartiles.q3 + multiplier * quartiles.iqr();
	let mask: Vec<bool> = values
		.iter()
		.map(|value| *value >= lower && *value <= upper)
		.collect();
	dataframe.filter_rows(&mask)
}

#[test]
fn test_parse_formatted_number() {
	assert_eq!(parse_formatted_number("₹12,345.00"), Some(12345.0));
	assert_eq!(parse_formatted_number("45,000 km"), Some(45000.0));
	assert_eq!(parse_formatted_number("₹ 1,95,000"), Some(195000.0));
	assert_eq!(parse_formatted_number("Rs. 5,50,000"), Some(550000.0));
	assert_eq!(parse_formatted_number("120000 kms"), Some(120000.0));
	assert_eq!(parse_formatted_number("8.5"), Some(8.5));
	assert_eq!(parse_formatted_number("km"), None);
	assert_eq!(parse_formatted_number(""), None);
	assert_eq!(parse_formatted_number("inf"), None);
}

#[test]
fn test_filter_outliers() {
	let dataframe = DataFrame::new(vec![Column::Number(NumberColumn::new(
		"AskPrice".to_owned(),
		vec![1.0, 2.0, 3.0, 4.0, 100.0],
	))]);
	let quartiles = Quartiles::compute(dataframe.number_column("AskPrice").unwrap().as_slice())
		.unwrap();
	assert_eq!((quartiles.q1, quartiles.q3, quartiles.iqr()), (2.0, 4.0, 2.0));
	let filtered = filter_outliers(&dataframe, "AskPrice", 3.0);
	assert_eq!(
		filtered.number_column("AskPrice").unwrap().data,
		vec![1.0, 2.0, 3.0, 4.0]
	);
}

#[test]
fn test_clean() {
	use autovalue_dataframe::FromCsvOptions;
	let csv = "Brand,model,Year,Age,kmDriven,Transmission,Owner,FuelType,PostedDate,AdditionInfo,AskPrice
Honda,City,2018,6,\"50,000 km\",Manual,first,Petrol,Nov-24,x,\"₹5,00,000\"
Honda,City,2019,5,\"45,000 km\",Manual,second,Petrol,Nov-24,x,\"₹5,50,000\"
BMW,X1,2020,4,\"30,000 km\",Automatic,first,Diesel,Nov-24,x,\"₹25,00,000\"
Ford,Figo,2015,9,\"1,20,000 km\",Manual,third,Diesel,Nov-24,x,\"₹2,50,000\"
Maruti,Alto,2016,8,unknown,Manual,first,CNG,Nov-24,x,\"₹2,00,000\"
Toyota,Innova,2017,,\"80,000 km\",Manual,first,Diesel,Nov-24,x,\"₹9,00,000\"
Tata,Nano,2012,12,\"60,000 km\",Manual,first,Petrol,Nov-24,x,\"₹9,99,99,99,999\"
";
	let dataframe = DataFrame::from_csv(
		&mut csv::Reader::from_reader(csv.as_bytes()),
		FromCsvOptions::default(),
		|_| {},
	)
	.unwrap();
	let (dataframe, report) = clean(dataframe, &CleanOptions::default()).unwrap();
	insta::assert_debug_snapshot!(report, @r###"
 CleanReport {
     n_rows_loaded: 7,
     n_unparseable_values: 1,
     n_rows_after_dropping_missing: 5,
     n_rows_after_price_filter: 4,
     n_rows_after_mileage_filter: 4,
 }
 "###);
	assert_eq!(
		dataframe.column_names(),
		vec!["Brand", "Age", "kmDriven", "Transmission", "Owner", "FuelType", "AskPrice"]
	);
	assert_eq!(
		dataframe.number_column("AskPrice").unwrap().data,
		vec![500000.0, 550000.0, 2500000.0, 250000.0]
	);
}

#[test]
fn test_clean_requires_essential_columns() {
	let dataframe = DataFrame::new(vec![Column::Number(NumberColumn::new(
		"AskPrice".to_owned(),
		vec![1.0],
	))]);
	let error = clean(dataframe, &CleanOptions::default()).unwrap_err();
	assert_eq!(error.to_string(), "the training data is missing the kmDriven column");
}
