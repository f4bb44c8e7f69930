use anyhow::{format_err, Result};
use autovalue_dataframe::{Column, DataFrame, NumberColumn, TextColumn};
use autovalue_metrics::{Metric, Quartiles};
use autovalue_util::zip;

pub const BRAND: &str = "Brand";
pub const AGE: &str = "Age";
pub const KM_DRIVEN: &str = "kmDriven";
pub const ASK_PRICE: &str = "AskPrice";
pub const LOG_ASK_PRICE: &str = "LogAskPrice";
pub const TRANSMISSION: &str = "Transmission";
pub const OWNER: &str = "Owner";
pub const FUEL_TYPE: &str = "FuelType";
pub const BRAND_TARGET_ENCODING: &str = "Brand_TgtEnc";

/// The brands that get the luxury and premium flags. The lists are part of the model, so a model keeps scoring brands the way it was trained even if the defaults change.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BrandTiers {
	pub version: u32,
	pub luxury: Vec<String>,
	pub premium: Vec<String>,
}

impl Default for BrandTiers {
	fn default() -> Self {
		let to_strings = |brands: &[&str]| brands.iter().map(|brand| brand.to_string()).collect();
		Self {
			version: 1,
			luxury: to_strings(&[
				"BMW",
				"Mercedes-Benz",
				"Audi",
				"Land Rover",
				"Jaguar",
				"Volvo",
				"Porsche",
				"Lexus",
				"Rolls-Royce",
				"Bentley",
				"Ferrari",
				"Lamborghini",
				"Maserati",
				"Aston Martin",
				"McLaren",
			]),
			premium: to_strings(&[
				"Honda",
				"Toyota",
				"Hyundai",
				"Volkswagen",
				"Skoda",
				"Nissan",
				"Ford",
			]),
		}
	}
}

impl BrandTiers {
	pub fn is_luxury(&self, brand: &str) -> bool {
		self.luxury.iter().any(|luxury| luxury == brand)
	}

	pub fn is_premium(&self, brand: &str) -> bool {
		self.premium.iter().any(|premium| premium == brand)
	}
}

/// How to fill missing ages.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AgeFill {
	/// Use the median of the non missing ages in the dataframe being engineered.
	BatchMedian,
	/// Use a fixed value, such as the median age of the training data.
	Value(f64),
}

/**
The `FeatureEngineer` derives the engineered number columns from the raw listing fields.

| column | value |
|--------|-------|
| `Age_Squared` | Age² |
| `Age_Cubed` | Age³ |
| `kmDriven_Log` | ln(1 + kmDriven) |
| `kmDriven_Squared` | kmDriven² |
| `Avg_km_per_year` | kmDriven / (Age + 1) |
| `Age_kmDriven_Interaction` | Age × kmDriven |
| `Age_km_Ratio` | Age / (kmDriven + 1) |
| `Is_Luxury_Brand` | 1 if the brand is a luxury brand |
| `Is_Premium_Brand` | 1 if the brand is a premium brand |
| `Owner_Numeric` | first → 1 ... fourth → 4, anything else → 5 |
| `Is_Manual` | 1 if the transmission is `Manual` |
| `Is_Diesel` | 1 if the fuel type is `Diesel` |
| `Is_Petrol` | 1 if the fuel type is `Petrol` |
| `Depreciation_Factor` | Age × (1 + Is_Luxury_Brand) |
| `Value_Score` | kmDriven / (Age + 1) |

`Owner_Numeric`, `Is_Manual`, `Is_Diesel` and `Is_Petrol` are only added when their source column is present.
*/
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureEngineer {
	pub brand_tiers: BrandTiers,
}

impl FeatureEngineer {
	pub fn new(brand_tiers: BrandTiers) -> FeatureEngineer {
		FeatureEngineer { brand_tiers }
	}

	/// The median of the non missing values in the `Age` column, if there are any.
	pub fn age_median(dataframe: &DataFrame) -> Option<f64> {
		let ages = dataframe.number_column(AGE)?;
		Quartiles::compute(ages.as_slice()).map(|quartiles| quartiles.median)
	}

	/// Return a copy of `dataframe` with missing ages filled, the owner column canonicalized, and the engineered columns appended. `Age` and `kmDriven` must be number columns.
	pub fn compute(&self, dataframe: &DataFrame, age_fill: AgeFill) -> Result<DataFrame> {
		let mut output = dataframe.clone();
		let age_fill_value = match age_fill {
			AgeFill::Value(value) => value,
			AgeFill::BatchMedian => Self::age_median(dataframe)
				.ok_or_else(|| format_err!("unable to compute the median of the {} column", AGE))?,
		};
		let ages: Vec<f64> = number_column(dataframe, AGE)?
			.as_slice()
			.iter()
			.map(|age| if age.is_nan() { age_fill_value } else { *age })
			.collect();
		let km_driven: Vec<f64> = number_column(dataframe, KM_DRIVEN)?.as_slice().to_owned();
		let brands: Vec<Option<&str>> = match dataframe.text_column(BRAND) {
			Some(brands) => brands.iter().collect(),
			None => vec![None; dataframe.nrows()],
		};
		let is_luxury: Vec<f64> = brands
			.iter()
			.map(|brand| flag(brand.map(|brand| self.brand_tiers.is_luxury(brand)).unwrap_or(false)))
			.collect();
		let is_premium: Vec<f64> = brands
			.iter()
			.map(|brand| flag(brand.map(|brand| self.brand_tiers.is_premium(brand)).unwrap_or(false)))
			.collect();
		output.insert_column(number(AGE, ages.clone()));
		let derived = |name: &str, f: &dyn Fn(f64, f64) -> f64| {
			number(
				name,
				zip!(ages.iter(), km_driven.iter())
					.map(|(age, km)| f(*age, *km))
					.collect(),
			)
		};
		output.insert_column(derived("Age_Squared", &|age, _| age.powi(2)));
		output.insert_column(derived("Age_Cubed", &|age, _| age.powi(3)));
		output.insert_column(derived("kmDriven_Log", &|_, km| km.ln_1p()));
		output.insert_column(derived("kmDriven_Squared", &|_, km| km.powi(2)));
		output.insert_column(derived("Avg_km_per_year", &|age, km| km / (age + 1.0)));
		output.insert_column(derived("Age_kmDriven_Interaction", &|age, km| age * km));
		output.insert_column(derived("Age_km_Ratio", &|age, km| age / (km + 1.0)));
		output.insert_column(number("Is_Luxury_Brand", is_luxury.clone()));
		output.insert_column(number("Is_Premium_Brand", is_premium));
		if let Some(owners) = dataframe.text_column(OWNER) {
			let owners: Vec<Option<String>> =
				owners.iter().map(|owner| owner.map(canonicalize_owner)).collect();
			let owner_numeric = owners
				.iter()
				.map(|owner| owner_number(owner.as_deref()))
				.collect();
			output.insert_column(Column::Text(TextColumn::new(OWNER.to_owned(), owners)));
			output.insert_column(number("Owner_Numeric", owner_numeric));
		}
		if let Some(transmissions) = dataframe.text_column(TRANSMISSION) {
			let is_manual = transmissions
				.iter()
				.map(|transmission| flag(transmission == Some("Manual")))
				.collect();
			output.insert_column(number("Is_Manual", is_manual));
		}
		if let Some(fuel_types) = dataframe.text_column(FUEL_TYPE) {
			let is_diesel = fuel_types
				.iter()
				.map(|fuel_type| flag(fuel_type == Some("Diesel")))
				.collect();
			let is_petrol = fuel_types
				.iter()
				.map(|fuel_type| flag(fuel_type == Some("Petrol")))
				.collect();
			output.insert_column(number("Is_Diesel", is_diesel));
			output.insert_column(number("Is_Petrol", is_petrol));
		}
		let depreciation_factor = zip!(ages.iter(), is_luxury.iter())
			.map(|(age, is_luxury)| age * (1.0 + is_luxury))
			.collect();
		output.insert_column(number("Depreciation_Factor", depreciation_factor));
		output.insert_column(derived("Value_Score", &|age, km| km / (age + 1.0)));
		Ok(output)
	}
}

/**
Map the spellings of an owner count that appear in listings to the values the prediction form uses: `first`, `second`, `third`, `fourth` and `fifth`. Matching is case insensitive and accepts numbers and ordinals, so `"1"`, `"1st"` and `"First"` all become `"first"`. Other values are lowercased and trimmed.
*/
pub fn canonicalize_owner(owner: &str) -> String {
	let owner = owner.trim().to_lowercase();
	let canonical = match owner.as_str() {
		"1" | "1st" | "first" => "first",
		"2" | "2nd" | "second" => "second",
		"3" | "3rd" | "third" => "third",
		"4" | "4th" | "fourth" => "fourth",
		"5" | "5th" | "fifth" => "fifth",
		_ => return owner,
	};
	canonical.to_owned()
}

fn owner_number(owner: Option<&str>) -> f64 {
	match owner {
		Some("first") => 1.0,
		Some("second") => 2.0,
		Some("third") => 3.0,
		Some("fourth") => 4.0,
		_ => 5.0,
	}
}

fn flag(value: bool) -> f64 {
	if value {
		1.0
	} else {
		0.0
	}
}

fn number(name: &str, data: Vec<f64>) -> Column {
	Column::Number(NumberColumn::new(name.to_owned(), data))
}

fn number_column<'a>(dataframe: &'a DataFrame, name: &str) -> Result<&'a NumberColumn> {
	dataframe
		.number_column(name)
		.ok_or_else(|| format_err!("expected a number column named {}", name))
}

#[cfg(test)]
fn listing(brand: &str, age: f64, km_driven: f64, owner: &str, fuel_type: &str) -> DataFrame {
	DataFrame::new(vec![
		Column::Text(TextColumn::new(BRAND.to_owned(), vec![Some(brand.to_owned())])),
		Column::Number(NumberColumn::new(AGE.to_owned(), vec![age])),
		Column::Number(NumberColumn::new(KM_DRIVEN.to_owned(), vec![km_driven])),
		Column::Text(TextColumn::new(TRANSMISSION.to_owned(), vec![Some("Manual".to_owned())])),
		Column::Text(TextColumn::new(OWNER.to_owned(), vec![Some(owner.to_owned())])),
		Column::Text(TextColumn::new(FUEL_TYPE.to_owned(), vec![Some(fuel_type.to_owned())])),
	])
}

#[cfg(test)]
fn concat(dataframes: &[DataFrame]) -> DataFrame {
	let mut output = dataframes[0].clone();
	for dataframe in &dataframes[1..] {
		for (column, other) in output.columns.iter_mut().zip(dataframe.columns.iter()) {
			match (column, other) {
				(Column::Number(column), Column::Number(other)) => {
					column.data.extend_from_slice(&other.data)
				}
				(Column::Text(column), Column::Text(other)) => {
					column.data.extend_from_slice(&other.data)
				}
				_ => unreachable!(),
			}
		}
	}
	output
}

#[test]
fn test_engineered_columns() {
	let engineer = FeatureEngineer::default();
	let output = engineer
		.compute(&listing("BMW", 3.0, 30000.0, "2nd", "Diesel"), AgeFill::Value(5.0))
		.unwrap();
	let values: Vec<(&str, String)> = output
		.columns
		.iter()
		.map(|column| match column {
			Column::Number(column) => (column.name.as_str(), format!("{}", column.data[0])),
			Column::Text(column) => (column.name.as_str(), format!("{:?}", column.data[0])),
		})
		.collect();
	insta::assert_debug_snapshot!(values, @r###"
 [
     (
         "Brand",
         "Some(\"BMW\")",
     ),
     (
         "Age",
         "3",
     ),
     (
         "kmDriven",
         "30000",
     ),
     (
         "Transmission",
         "Some(\"Manual\")",
     ),
     (
         "Owner",
         "Some(\"second\")",
     ),
     (
         "FuelType",
         "Some(\"Diesel\")",
     ),
     (
         "Age_Squared",
         "9",
     ),
     (
         "Age_Cubed",
         "27",
     ),
     (
         "kmDriven_Log",
         "10.308985993422082",
     ),
     (
         "kmDriven_Squared",
         "900000000",
     ),
     (
         "Avg_km_per_year",
         "7500",
     ),
     (
         "Age_kmDriven_Interaction",
         "90000",
     ),
     (
         "Age_km_Ratio",
         "0.00009999666677777408",
     ),
     (
         "Is_Luxury_Brand",
         "1",
     ),
     (
         "Is_Premium_Brand",
         "0",
     ),
     (
         "Owner_Numeric",
         "2",
     ),
     (
         "Is_Manual",
         "1",
     ),
     (
         "Is_Diesel",
         "1",
     ),
     (
         "Is_Petrol",
         "0",
     ),
     (
         "Depreciation_Factor",
         "6",
     ),
     (
         "Value_Score",
         "7500",
     ),
 ]
 "###);
}

#[test]
fn test_engineering_is_deterministic() {
	let engineer = FeatureEngineer::default();
	let a = listing("Honda", 4.5, 42000.0, "first", "Petrol");
	let b = listing("Maruti", 9.0, 120500.0, "third", "CNG");
	let first = engineer.compute(&a, AgeFill::Value(6.0)).unwrap();
	let second = engineer.compute(&a, AgeFill::Value(6.0)).unwrap();
	assert_eq!(first, second);
	// Engineering a batch gives the same rows as engineering each listing alone.
	let batch = engineer.compute(&concat(&[a, b.clone()]), AgeFill::Value(6.0)).unwrap();
	let single = engineer.compute(&b, AgeFill::Value(6.0)).unwrap();
	assert_eq!(batch.take_rows(&[1]), single);
}

#[test]
fn test_missing_ages_are_filled() {
	let engineer = FeatureEngineer::default();
	let mut dataframe = concat(&[
		listing("Honda", 2.0, 1000.0, "first", "Petrol"),
		listing("Honda", f64::NAN, 1000.0, "first", "Petrol"),
		listing("Honda", 8.0, 1000.0, "first", "Petrol"),
		listing("Honda", 4.0, 1000.0, "first", "Petrol"),
	]);
	assert_eq!(FeatureEngineer::age_median(&dataframe), Some(4.0));
	let output = engineer.compute(&dataframe, AgeFill::BatchMedian).unwrap();
	assert_eq!(output.number_column(AGE).unwrap().data, vec![2.0, 4.0, 8.0, 4.0]);
	let output = engineer.compute(&dataframe, AgeFill::Value(10.0)).unwrap();
	assert_eq!(output.number_column(AGE).unwrap().data[1], 10.0);
	dataframe.remove_column(KM_DRIVEN);
	assert!(engineer.compute(&dataframe, AgeFill::BatchMedian).is_err());
}

#[test]
fn test_canonicalize_owner() {
	assert_eq!(canonicalize_owner("1"), "first");
	assert_eq!(canonicalize_owner(" 3rd "), "third");
	assert_eq!(canonicalize_owner("Fifth"), "fifth");
	assert_eq!(canonicalize_owner("Sixth"), "sixth");
	assert_eq!(owner_number(Some("fifth")), 5.0);
	assert_eq!(owner_number(None), 5.0);
}

#[test]
fn test_brand_tiers() {
	let brand_tiers = BrandTiers::default();
	assert_eq!(brand_tiers.luxury.len(), 15);
	assert_eq!(brand_tiers.premium.len(), 7);
	assert!(brand_tiers.is_luxury("Aston Martin"));
	assert!(brand_tiers.is_premium("Skoda"));
	assert!(!brand_tiers.is_luxury("Tesla"));
	assert!(!brand_tiers.is_premium("Tesla"));
}
