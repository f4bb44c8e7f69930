/*!
This crate turns cleaned listings into the feature matrix the price models are trained on.

Feature computation happens in three steps:

1. The [`FeatureEngineer`](struct.FeatureEngineer.html) derives number columns such as `Age_Squared` and `Is_Luxury_Brand` from the raw fields. It has no fitted state, so the same function runs on a training batch and on a single listing at prediction time.
2. The [`BrandTargetEncoder`](struct.BrandTargetEncoder.html) replaces the brand with a smoothed mean of the log price of listings with that brand. It is fit on the training split only.
3. The [`FeatureAssembler`](struct.FeatureAssembler.html) freezes the list of number and text columns it was fit on and turns a dataframe into a fixed width matrix using one [`FeatureGroup`](enum.FeatureGroup.html) per column.

Every fitted type is immutable after fitting and is stored in the model file.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod assembler;
mod brand_encoder;
mod engineer;
mod one_hot_encoded;
mod robust_scaled;

pub use self::assembler::*;
pub use self::brand_encoder::*;
pub use self::engineer::*;
pub use self::one_hot_encoded::*;
pub use self::robust_scaled::*;

/// This enum describes how to transform one column from the input dataframe to one or more columns in the output features.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum FeatureGroup {
	RobustScaled(RobustScaledFeatureGroup),
	OneHotEncoded(OneHotEncodedFeatureGroup),
}

impl FeatureGroup {
	/// Return the number of features this feature group will produce.
	pub fn n_features(&self) -> usize {
		match self {
			FeatureGroup::RobustScaled(_) => 1,
			FeatureGroup::OneHotEncoded(s) => s.options.len(),
		}
	}

	pub fn source_column_name(&self) -> &str {
		match self {
			FeatureGroup::RobustScaled(s) => &s.source_column_name,
			FeatureGroup::OneHotEncoded(s) => &s.source_column_name,
		}
	}
}
