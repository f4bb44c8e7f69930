use crate::BRAND_TARGET_ENCODING;
use anyhow::{format_err, Result};
use autovalue_dataframe::{NumberColumn, TextColumn};
use autovalue_metrics::{Mean, StreamingMetric};
use fnv::FnvHashMap;
use std::collections::BTreeMap;

/// Listings without a brand are grouped under this name when fitting.
pub const MISSING_BRAND: &str = "__missing__";

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BrandTargetEncoderOptions {
	/// The number of pseudo listings at the global mean added to each brand. Higher values pull rare brands harder toward the global mean.
	pub smoothing: f64,
}

impl Default for BrandTargetEncoderOptions {
	fn default() -> Self {
		Self { smoothing: 15.0 }
	}
}

/**
A `BrandTargetEncoder` maps each brand to a smoothed mean of the target over the training listings with that brand:

`encoding = (count * brand_mean + smoothing * global_mean) / (count + smoothing)`

Brands that were not seen during fitting are encoded as the global mean.
*/
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BrandTargetEncoder {
	pub smoothing: f64,
	pub global_mean: f64,
	pub encodings: BTreeMap<String, f64>,
}

impl BrandTargetEncoderOptions {
	/// Fit the encoder. Listings whose target is NaN are ignored.
	pub fn fit(&self, brands: &TextColumn, targets: &[f64]) -> Result<BrandTargetEncoder> {
		if brands.data.len() != targets.len() {
			return Err(format_err!(
				"expected {} targets but got {}",
				brands.data.len(),
				targets.len()
			));
		}
		let mut global_mean = Mean::default();
		let mut brand_means: FnvHashMap<&str, Mean> = FnvHashMap::default();
		for (brand, target) in brands.iter().zip(targets.iter()) {
			if target.is_nan() {
				continue;
			}
			global_mean.update(*target);
			brand_means
				.entry(brand.unwrap_or(MISSING_BRAND))
				.or_default()
				.update(*target);
		}
		let global_mean = global_mean
			.finalize()
			.ok_or_else(|| format_err!("unable to fit the brand encoder without any targets"))?;
		let encodings = brand_means
			.into_iter()
			.map(|(brand, mean)| {
				let count = mean.n() as f64;
				let mean = mean.finalize().unwrap_or(global_mean);
				let encoding =
					(count * mean + self.smoothing * global_mean) / (count + self.smoothing);
				(brand.to_owned(), encoding)
			})
			.collect();
		Ok(BrandTargetEncoder {
			smoothing: self.smoothing,
			global_mean,
			encodings,
		})
	}
}

impl BrandTargetEncoder {
	pub fn encode(&self, brand: Option<&str>) -> f64 {
		self.encodings
			.get(brand.unwrap_or(MISSING_BRAND))
			.cloned()
			.unwrap_or(self.global_mean)
	}

	/// Encode every brand in the column, producing the `Brand_TgtEnc` column.
	pub fn transform(&self, brands: &TextColumn) -> NumberColumn {
		NumberColumn::new(
			BRAND_TARGET_ENCODING.to_owned(),
			brands.iter().map(|brand| self.encode(brand)).collect(),
		)
	}
}

#[test]
fn test_brand_target_encoder() {
	let brands = TextColumn::new(
		"Brand".to_owned(),
		vec![
			Some("Honda".to_owned()),
			Some("Honda".to_owned()),
			Some("BMW".to_owned()),
		],
	);
	let targets = [10f64.ln(), 12f64.ln(), 50f64.ln()];
	let encoder = BrandTargetEncoderOptions::default()
		.fit(&brands, &targets)
		.unwrap();
	let global_mean = (10f64.ln() + 12f64.ln() + 50f64.ln()) / 3.0;
	let honda_mean = (10f64.ln() + 12f64.ln()) / 2.0;
	let honda = (2.0 * honda_mean + 15.0 * global_mean) / 17.0;
	let bmw = (50f64.ln() + 15.0 * global_mean) / 16.0;
	assert!((encoder.global_mean - global_mean).abs() < 1e-12);
	assert!((encoder.encode(Some("Honda")) - honda).abs() < 1e-12);
	assert!((encoder.encode(Some("BMW")) - bmw).abs() < 1e-12);
	assert_eq!(encoder.encode(Some("Tesla")), encoder.global_mean);
	assert_eq!(encoder.encode(None), encoder.global_mean);
	let encoded = encoder.transform(&TextColumn::new(
		"Brand".to_owned(),
		vec![Some("Tesla".to_owned()), Some("Honda".to_owned())],
	));
	assert_eq!(encoded.name, "Brand_TgtEnc");
	assert_eq!(encoded.data, vec![encoder.global_mean, encoder.encode(Some("Honda"))]);
}

#[test]
fn test_missing_brands_are_grouped() {
	let brands = TextColumn::new("Brand".to_owned(), vec![None, None, Some("Ford".to_owned())]);
	let encoder = BrandTargetEncoderOptions { smoothing: 0.0 }
		.fit(&brands, &[1.0, 3.0, 8.0])
		.unwrap();
	assert_eq!(encoder.encode(None), 2.0);
	assert_eq!(encoder.encode(Some("Ford")), 8.0);
	assert!(BrandTargetEncoderOptions::default()
		.fit(&brands, &[1.0])
		.is_err());
}
