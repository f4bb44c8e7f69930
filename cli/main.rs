//! This module contains the main entrypoint to the autovalue cli.

use self::progress_view::ProgressView;
use anyhow::{format_err, Result};
use autovalue_core::{PredictError, PredictInput, Predictor};
use autovalue_util::table::Table;
use clap::Clap;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod progress_view;

#[derive(Clap)]
#[clap(
	about = "Estimate the asking price of a used car.",
	setting = clap::AppSettings::DisableHelpSubcommand,
)]
enum Options {
	#[clap(name = "train")]
	Train(TrainOptions),
	#[clap(name = "predict")]
	Predict(PredictOptions),
}

#[derive(Clap, Debug)]
#[clap(about = "train a model")]
#[clap(long_about = "train a model from a csv file of used car listings")]
struct TrainOptions {
	#[clap(short, long, about = "the path to your .csv file")]
	file: PathBuf,
	#[clap(short, long, about = "the path to a .json or .yaml config file")]
	config: Option<PathBuf>,
	#[clap(short, long, about = "the path to write the .autovalue file to")]
	output: Option<PathBuf>,
	#[clap(long = "no-progress", about = "disable the cli progress view", parse(from_flag = std::ops::Not::not))]
	progress: bool,
}

#[derive(Clap, Debug)]
#[clap(about = "estimate the price of a listing")]
#[clap(long_about = "estimate the asking price of a single listing with a trained model")]
struct PredictOptions {
	#[clap(short, long, about = "the path to your .autovalue file")]
	model: PathBuf,
	#[clap(long, about = "the brand, such as Honda")]
	brand: Option<String>,
	#[clap(long, about = "the age in years")]
	age: Option<String>,
	#[clap(long, about = "the number of kilometers driven")]
	km_driven: Option<String>,
	#[clap(long, about = "Manual or Automatic")]
	transmission: Option<String>,
	#[clap(long, about = "first, second, third, fourth or fifth")]
	owner: Option<String>,
	#[clap(long, about = "Petrol, Diesel, CNG, LPG or hybrid")]
	fuel_type: Option<String>,
	#[clap(long, about = "print the estimate as json")]
	json: bool,
}

fn main() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
	let options = Options::parse();
	let result = match options {
		Options::Train(options) => cli_train(options),
		Options::Predict(options) => cli_predict(options),
	};
	if let Err(error) = result {
		eprintln!("{}: {}", "error".red().bold(), error);
		std::process::exit(1);
	}
}

fn cli_train(options: TrainOptions) -> Result<()> {
	let output = {
		let mut progress_view = if options.progress {
			Some(ProgressView::new())
		} else {
			None
		};
		autovalue_core::train_from_path(&options.file, options.config.as_deref(), &mut |progress| {
			if let Some(progress_view) = progress_view.as_mut() {
				progress_view.update(progress)
			}
		})?
	};

	// Retrieve the output path from the command line arguments or generate a default.
	let output_path = match options.output {
		Some(output) => output,
		None => {
			let dir = std::env::current_dir()?;
			let csv_file_name = options
				.file
				.file_stem()
				.and_then(|stem| stem.to_str())
				.ok_or_else(|| format_err!("invalid file name {}", options.file.display()))?;
			available_path(&dir, csv_file_name, "autovalue")?
		}
	};

	// Write the model to the output path.
	output.model.to_file(&output_path)?;

	let metrics = &output.model.test_metrics;
	let rows = vec![
		vec!["R²".to_owned(), format!("{:.4}", metrics.r2)],
		vec!["RMSE".to_owned(), format!("{:.2}", metrics.rmse)],
		vec!["MAE".to_owned(), format!("{:.2}", metrics.mae)],
		vec!["MAPE".to_owned(), format!("{:.2}%", metrics.mape)],
		vec!["Accuracy".to_owned(), format!("{:.2}%", metrics.accuracy)],
	];
	let table = Table {
		padding: 1,
		header: &["Metric", "Test Set"],
		rows: &rows,
	};
	eprintln!("{}", table);
	let rows: Vec<Vec<String>> = output
		.feature_importances
		.iter()
		.take(10)
		.map(|(name, importance)| vec![name.clone(), format!("{:.4}", importance)])
		.collect();
	let table = Table {
		padding: 1,
		header: &["Feature", "Importance"],
		rows: &rows,
	};
	eprintln!("{}", table);

	eprintln!("Your model was written to {}.", output_path.display());
	eprintln!("To estimate a price, run `autovalue predict --model {}`.", output_path.display());
	Ok(())
}

fn cli_predict(options: PredictOptions) -> Result<()> {
	let predictor = Predictor::from_path(&options.model)?;
	let input = PredictInput {
		brand: options.brand,
		age: options.age,
		km_driven: options.km_driven,
		transmission: options.transmission,
		owner: options.owner,
		fuel_type: options.fuel_type,
	};
	let output = match predictor.predict(&input) {
		Ok(output) => output,
		Err(PredictError::Validation(message)) => return Err(format_err!("{}", message)),
		Err(error) => return Err(error.into()),
	};
	if options.json {
		println!("{}", serde_json::to_string_pretty(&output)?);
	} else {
		println!("Estimated price: {}", output.display);
		println!("Confidence: {}%", output.confidence);
	}
	Ok(())
}

/// This function checks if a file with the given name and extension already exists at the path `base`, and if it does, it appends " 1", " 2", etc. to it until it finds a name that will not overwrite an existing file.
fn available_path(dir: &Path, name: &str, extension: &str) -> Result<PathBuf> {
	let mut i = 0;
	loop {
		let mut filename = name.to_owned();
		if i > 0 {
			filename.push(' ');
			filename.push_str(&i.to_string());
		}
		filename.push('.');
		filename.push_str(extension);
		let path = dir.join(filename);
		match std::fs::metadata(&path) {
			// If a file at the path does not exist, return the path.
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
				return Ok(path);
			}
			Err(error) => return Err(error.into()),
			// If a file at the path exists, try the next number.
			Ok(_) => {
				i += 1;
				continue;
			}
		}
	}
}
