/*!
This module defines the `Model` struct, which holds everything needed to turn a listing into a price estimate, and reads and writes `.autovalue` files.

A `.autovalue` file is a single byte holding the major version of the format, followed by the model serialized with MessagePack.
*/

use crate::{
	clean::CleanReport,
	evaluate::EvaluationMetrics,
	stacking::{StackingRegressor, StackingTrainOptions},
};
use anyhow::{format_err, Context, Result};
use autovalue_features::{BrandTargetEncoder, FeatureAssembler, FeatureEngineer};
use std::{
	io::{Read, Write},
	path::{Path, PathBuf},
};

const MAJOR_VERSION: u8 = 0;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Model {
	/// The feature engineer, including the brand tiers the model was trained with.
	pub feature_engineer: FeatureEngineer,
	/// The median age of the training listings, used to fill in missing ages.
	pub age_median: f64,
	pub brand_encoder: BrandTargetEncoder,
	pub assembler: FeatureAssembler,
	/// The regressor predicts `ln(1 + price)`.
	pub regressor: StackingRegressor,
	pub train_options: StackingTrainOptions,
	pub clean_report: CleanReport,
	pub n_rows_train: usize,
	pub n_rows_test: usize,
	pub test_metrics: EvaluationMetrics,
}

impl Model {
	/// Deserialize a `Model` from a slice.
	pub fn from_slice(slice: &[u8]) -> Result<Self> {
		let (major_version, slice) = slice
			.split_first()
			.ok_or_else(|| format_err!("the model is empty"))?;
		if *major_version != MAJOR_VERSION {
			return Err(format_err!("unknown major version {}", major_version));
		}
		let model: Self = rmp_serde::from_slice(slice)?;
		Ok(model)
	}

	/// Deserialize a `Model` by reading the file at `path`.
	pub fn from_path(path: &Path) -> Result<Self> {
		let file = std::fs::File::open(path)
			.with_context(|| format!("failed to open model file {}", path.display()))?;
		let mut reader = std::io::BufReader::new(file);
		let mut major_version = [0u8; 1];
		reader
			.read_exact(&mut major_version)
			.with_context(|| format!("failed to read model file {}", path.display()))?;
		let major_version = major_version[0];
		if major_version != MAJOR_VERSION {
			return Err(format_err!("unknown major version {}", major_version));
		}
		let model: Model = rmp_serde::from_read(&mut reader)
			.with_context(|| format!("failed to parse model file {}", path.display()))?;
		Ok(model)
	}

	/// Write this model to the file at `path`. The model is written to a sibling file first and renamed into place, so `path` never holds a partial model.
	pub fn to_file(&self, path: &Path) -> Result<()> {
		let mut temp_path = path.as_os_str().to_owned();
		temp_path.push(".tmp");
		let temp_path = PathBuf::from(temp_path);
		let result = self.write_file(&temp_path).and_then(|_| {
			std::fs::rename(&temp_path, path)
				.with_context(|| format!("failed to write model file {}", path.display()))
		});
		if result.is_err() {
			std::fs::remove_file(&temp_path).ok();
		}
		result
	}

	fn write_file(&self, path: &Path) -> Result<()> {
		let file = std::fs::File::create(path)
			.with_context(|| format!("failed to create {}", path.display()))?;
		let mut writer = std::io::BufWriter::new(file);
		writer.write_all(&[MAJOR_VERSION])?;
		rmp_serde::encode::write_named(&mut writer, self)?;
		writer.flush()?;
		Ok(())
	}

	/// Serialize this model, including the version byte.
	pub fn to_vec(&self) -> Result<Vec<u8>> {
		let mut bytes = vec![MAJOR_VERSION];
		rmp_serde::encode::write_named(&mut bytes, self)?;
		Ok(bytes)
	}
}

#[test]
fn test_from_slice_rejects_bad_input() {
	let error = Model::from_slice(&[]).unwrap_err();
	assert_eq!(error.to_string(), "the model is empty");
	let error = Model::from_slice(&[7, 0x90]).unwrap_err();
	assert_eq!(error.to_string(), "unknown major version 7");
	assert!(Model::from_slice(&[MAJOR_VERSION, 0xc1]).is_err());
}
