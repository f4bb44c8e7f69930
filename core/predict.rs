/*!
This module makes price estimates for single listings with a trained [`Model`](../model/struct.Model.html).

A [`Predictor`](struct.Predictor.html) validates the raw form values in a [`PredictInput`](struct.PredictInput.html) before the model is invoked. Validation failures are returned as [`PredictError::Validation`](enum.PredictError.html) with a message meant for the person filling in the form. Anything that goes wrong after validation is returned as `PredictError::Internal`, whose message is generic so no internals are shown to users.
*/

use crate::{clean::parse_formatted_number, model::Model};
use anyhow::Result;
use autovalue_dataframe::{Column, DataFrame, NumberColumn, TextColumn};
use autovalue_features::{AgeFill, AGE, BRAND, FUEL_TYPE, KM_DRIVEN, OWNER, TRANSMISSION};
use num_traits::ToPrimitive;
use std::path::Path;
use tracing::error;

/// The confidence shown next to every estimate. It is a fixed display value, not a statistical estimate.
pub const CONFIDENCE: u8 = 92;

/// Listings with fewer kilometers than this are rejected.
pub const MIN_KM_DRIVEN: f64 = 100.0;

pub const INVALID_AGE_OR_MILEAGE_MESSAGE: &str = "Please enter valid values for age and mileage.";

/// The raw values submitted for a listing. Every field is required.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictInput {
	pub brand: Option<String>,
	pub age: Option<String>,
	pub km_driven: Option<String>,
	pub transmission: Option<String>,
	pub owner: Option<String>,
	pub fuel_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PredictOutput {
	pub price: f64,
	/// The price formatted for display, such as `₹ 312,450.00`.
	pub display: String,
	/// The confidence to display, as a percentage.
	pub confidence: u8,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum PredictError {
	/// The input is incomplete or out of range. The message can be shown to users as is.
	#[error("{0}")]
	Validation(String),
	/// The model failed to produce an estimate. The detail is logged but never displayed.
	#[error("Prediction error: the price could not be estimated.")]
	Internal(String),
}

struct ValidatedInput<'a> {
	brand: &'a str,
	age: f64,
	km_driven: f64,
	transmission: &'a str,
	owner: &'a str,
	fuel_type: &'a str,
}

fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str, PredictError> {
	match value.as_deref().map(str::trim) {
		Some(value) if !value.is_empty() => Ok(value),
		_ => Err(PredictError::Validation(format!(
			"Please fill in the {} field.",
			field
		))),
	}
}

impl PredictInput {
	fn validate(&self) -> Result<ValidatedInput<'_>, PredictError> {
		let brand = required("brand", &self.brand)?;
		let age = required("age", &self.age)?;
		let km_driven = required("kmDriven", &self.km_driven)?;
		let transmission = required("transmission", &self.transmission)?;
		let owner = required("owner", &self.owner)?;
		let fuel_type = required("fuelType", &self.fuel_type)?;
		let invalid = || PredictError::Validation(INVALID_AGE_OR_MILEAGE_MESSAGE.to_owned());
		let age = parse_formatted_number(age).ok_or_else(invalid)?;
		let km_driven = parse_formatted_number(km_driven).ok_or_else(invalid)?;
		if age <= 0.0 || km_driven < MIN_KM_DRIVEN {
			return Err(invalid());
		}
		Ok(ValidatedInput {
			brand,
			age,
			km_driven,
			transmission,
			owner,
			fuel_type,
		})
	}
}

/// A `Predictor` owns a loaded model. It is immutable, so one predictor can be shared across threads without locking.
#[derive(Debug)]
pub struct Predictor {
	model: Model,
}

impl Predictor {
	pub fn new(model: Model) -> Predictor {
		Predictor { model }
	}

	/// Load the model at `path`. Callers should treat a failure here as fatal.
	pub fn from_path(path: &Path) -> Result<Predictor> {
		Ok(Predictor::new(Model::from_path(path)?))
	}

	pub fn predict(&self, input: &PredictInput) -> Result<PredictOutput, PredictError> {
		let input = input.validate()?;
		let price = self.predict_price(&input).map_err(|error| {
			error!(%error, "failed to estimate a price");
			PredictError::Internal(error.to_string())
		})?;
		Ok(PredictOutput {
			price,
			display: format_price(price),
			confidence: CONFIDENCE,
		})
	}

	fn predict_price(&self, input: &ValidatedInput) -> Result<f64> {
		let model = &self.model;
		let text = |name: &str, value: &str| {
			Column::Text(TextColumn::new(name.to_owned(), vec![Some(value.to_owned())]))
		};
		let number =
			|name: &str, value: f64| Column::Number(NumberColumn::new(name.to_owned(), vec![value]));
		let dataframe = DataFrame::new(vec![
			text(BRAND, input.brand),
			number(AGE, input.age),
			number(KM_DRIVEN, input.km_driven),
			text(TRANSMISSION, input.transmission),
			text(OWNER, input.owner),
			text(FUEL_TYPE, input.fuel_type),
		]);
		let mut dataframe = model
			.feature_engineer
			.compute(&dataframe, AgeFill::Value(model.age_median))?;
		if let Some(brands) = dataframe.text_column(BRAND) {
			let encoded = model.brand_encoder.transform(brands);
			dataframe.insert_column(Column::Number(encoded));
		}
		let features = model.assembler.transform(&dataframe);
		let features = features.row(0).to_vec();
		let log_price = model.regressor.predict_one(&features).to_f64().unwrap();
		let price = log_price.exp_m1();
		if !price.is_finite() {
			anyhow::bail!("the model produced a non finite log price {}", log_price);
		}
		Ok(price)
	}
}

/// Format a price in rupees with two decimal places and thousands separators, such as `₹ 312,450.00`.
pub fn format_price(value: f64) -> String {
	let formatted = format!("{:.2}", value.abs());
	let (integer, fraction) = formatted.split_at(formatted.len() - 3);
	let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
	for (i, c) in integer.chars().enumerate() {
		if i > 0 && (integer.len() - i) % 3 == 0 {
			grouped.push(',');
		}
		grouped.push(c);
	}
	let sign = if value < 0.0 && formatted != "0.00" {
		"-"
	} else {
		""
	};
	format!("₹ {}{}{}", sign, grouped, fraction)
}

#[test]
fn test_format_price() {
	assert_eq!(format_price(312450.0), "₹ 312,450.00");
	assert_eq!(format_price(999.999), "₹ 1,000.00");
	assert_eq!(format_price(1234567.891), "₹ 1,234,567.89");
	assert_eq!(format_price(12.5), "₹ 12.50");
	assert_eq!(format_price(-1234.0), "₹ -1,234.00");
}

#[test]
fn test_validation() {
	let input = PredictInput {
		brand: Some("Honda".to_owned()),
		age: Some("4".to_owned()),
		km_driven: Some("45,000 km".to_owned()),
		transmission: Some("Manual".to_owned()),
		owner: Some("first".to_owned()),
		fuel_type: Some("Petrol".to_owned()),
	};
	let validated = input.validate().unwrap();
	assert_eq!(validated.km_driven, 45000.0);
	let error = |input: PredictInput| input.validate().err().map(|error| error.to_string());
	assert_eq!(
		error(PredictInput {
			brand: Some(" ".to_owned()),
			..input.clone()
		}),
		Some("Please fill in the brand field.".to_owned())
	);
	assert_eq!(
		error(PredictInput {
			fuel_type: None,
			..input.clone()
		}),
		Some("Please fill in the fuelType field.".to_owned())
	);
	for (age, km_driven) in [("0", "45000"), ("4", "99"), ("old", "45000")].iter() {
		assert_eq!(
			error(PredictInput {
				age: Some(age.to_string()),
				km_driven: Some(km_driven.to_string()),
				..input.clone()
			}),
			Some(INVALID_AGE_OR_MILEAGE_MESSAGE.to_owned())
		);
	}
	assert_eq!(
		PredictError::Internal("NaN".to_owned()).to_string(),
		"Prediction error: the price could not be estimated."
	);
}

#[test]
fn test_predictor_is_send_and_sync() {
	fn assert_send_sync<T: Send + Sync>() {}
	assert_send_sync::<Predictor>();
}

#[test]
fn test_train_and_predict() {
	use crate::{
		config::{Config, GradientBoostingConfig, RandomForestConfig},
		train::train,
	};
	use autovalue_dataframe::FromCsvOptions;

	struct Profile {
		brand: &'static str,
		age: usize,
		km_driven: usize,
		transmission: &'static str,
		owner: &'static str,
		fuel_type: &'static str,
	}
	let profile = |i: usize| Profile {
		brand: ["Honda", "BMW", "Maruti"][i % 3],
		age: 2 + i % 7,
		km_driven: 20_000 + 2_000 * i,
		transmission: ["Manual", "Automatic"][i % 2],
		owner: ["first", "second", "third"][i % 3],
		fuel_type: ["Petrol", "Diesel", "CNG", "LPG", "hybrid"][i % 5],
	};
	let price = |profile: &Profile| {
		let base = match profile.brand {
			"BMW" => 1_600_000.0,
			"Honda" => 800_000.0,
			_ => 500_000.0,
		};
		let transmission = if profile.transmission == "Automatic" {
			1.1
		} else {
			1.0
		};
		let fuel_type = if profile.fuel_type == "Diesel" {
			1.05
		} else {
			1.0
		};
		(base * (1.0 - 0.05 * profile.age as f64) * transmission * fuel_type).round()
	};
	// The listing that is predicted below never appears in the training data.
	let held_out = 7;
	let mut csv = String::from("Brand,Age,kmDriven,Transmission,Owner,FuelType,AskPrice\n");
	for _ in 0..5 {
		for i in (0..30).filter(|i| *i != held_out) {
			let profile = profile(i);
			csv.push_str(&format!(
				"{},{},{} km,{},{},{},₹{}\n",
				profile.brand,
				profile.age,
				profile.km_driven,
				profile.transmission,
				profile.owner,
				profile.fuel_type,
				price(&profile),
			));
		}
	}
	let dataframe = DataFrame::from_csv(
		&mut csv::Reader::from_reader(csv.as_bytes()),
		FromCsvOptions::default(),
		|_| {},
	)
	.unwrap();
	let config = Config {
		n_folds: Some(3),
		random_forest: Some(RandomForestConfig {
			n_trees: Some(30),
			..Default::default()
		}),
		gradient_boosting: Some(GradientBoostingConfig {
			n_rounds: Some(100),
			learning_rate: Some(0.1),
			..Default::default()
		}),
		meta: Some(GradientBoostingConfig {
			n_rounds: Some(100),
			learning_rate: Some(0.1),
			..Default::default()
		}),
		..Default::default()
	};
	let output = train(dataframe, &config, &mut |_| {}).unwrap();
	assert_eq!(output.model.n_rows_train + output.model.n_rows_test, 145);
	assert_eq!(output.model.n_rows_test, 29);

	let bytes = output.model.to_vec().unwrap();
	let predictor = Predictor::new(Model::from_slice(&bytes).unwrap());

	// Saving writes the whole model or nothing.
	let dir = std::env::temp_dir().join(format!("autovalue_test_{}", std::process::id()));
	std::fs::create_dir_all(&dir).unwrap();
	let model_path = dir.join("listings.autovalue");
	output.model.to_file(&model_path).unwrap();
	assert!(!dir.join("listings.autovalue.tmp").exists());
	let loaded = Predictor::from_path(&model_path).unwrap();
	let occupied_path = dir.join("occupied.autovalue");
	std::fs::create_dir_all(&occupied_path).unwrap();
	assert!(output.model.to_file(&occupied_path).is_err());
	assert!(occupied_path.is_dir());
	assert!(!dir.join("occupied.autovalue.tmp").exists());
	std::fs::remove_dir_all(&dir).unwrap();

	let known = profile(held_out);
	let input = PredictInput {
		brand: Some(known.brand.to_owned()),
		age: Some(known.age.to_string()),
		km_driven: Some(known.km_driven.to_string()),
		transmission: Some(known.transmission.to_owned()),
		owner: Some(known.owner.to_owned()),
		fuel_type: Some(known.fuel_type.to_owned()),
	};
	let output = predictor.predict(&input).unwrap();
	let expected = price(&known);
	assert!(
		(output.price - expected).abs() / expected < 0.15,
		"predicted {} for a listing priced at {}",
		output.price,
		expected
	);
	assert_eq!(output.confidence, CONFIDENCE);
	assert_eq!(output.display, format_price(output.price));
	// Predictions do not depend on anything but the input.
	assert_eq!(predictor.predict(&input).unwrap(), output);
	assert_eq!(loaded.predict(&input).unwrap(), output);
}
