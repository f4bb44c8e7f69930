use super::*;
use anyhow::Result;
use std::{collections::BTreeMap, path::Path};

#[derive(Clone)]
pub struct FromCsvOptions<'a> {
	/// Columns listed here are loaded with the given type. All other columns are loaded as text, because raw listing fields such as prices arrive formatted with currency symbols and separators and are parsed later by the cleaner.
	pub column_types: Option<BTreeMap<String, ColumnType>>,
	pub invalid_values: &'a [&'a str],
}

impl<'a> Default for FromCsvOptions<'a> {
	fn default() -> Self {
		Self {
			column_types: None,
			invalid_values: DEFAULT_INVALID_VALUES,
		}
	}
}

/// These values are the default values that are considered invalid.
pub const DEFAULT_INVALID_VALUES: &[&str] = &[
	"", "null", "NULL", "n/a", "N/A", "NA", "nan", "-nan", "NaN", "-NaN", "?",
];

impl DataFrame {
	pub fn from_path(path: &Path, options: FromCsvOptions, progress: impl Fn(u64)) -> Result<Self> {
		Self::from_csv(&mut csv::Reader::from_path(path)?, options, progress)
	}

	pub fn from_csv<R>(
		reader: &mut csv::Reader<R>,
		options: FromCsvOptions,
		progress: impl Fn(u64),
	) -> Result<Self>
	where
		R: std::io::Read,
	{
		let column_names: Vec<String> = reader
			.headers()?
			.into_iter()
			.map(|column_name| column_name.trim().to_owned())
			.collect();
		let column_types: Vec<ColumnType> = column_names
			.iter()
			.map(|column_name| {
				options
					.column_types
					.as_ref()
					.and_then(|column_types| column_types.get(column_name))
					.cloned()
					.unwrap_or(ColumnType::Text)
			})
			.collect();
		let mut columns: Vec<Column> = column_names
			.into_iter()
			.zip(column_types.iter())
			.map(|(name, column_type)| match column_type {
				ColumnType::Number => Column::Number(NumberColumn::new(name, Vec::new())),
				ColumnType::Text => Column::Text(TextColumn::new(name, Vec::new())),
			})
			.collect();
		// Read each csv record and insert the values into the columns of the dataframe.
		let mut record = csv::ByteRecord::new();
		while reader.read_byte_record(&mut record)? {
			if let Some(position) = record.position() {
				progress(position.byte());
			}
			for (index, column) in columns.iter_mut().enumerate() {
				let value = record.get(index).unwrap_or(b"");
				let value = std::str::from_utf8(value)?.trim();
				let is_invalid = options.invalid_values.contains(&value);
				match column {
					Column::Number(column) => {
						let value = match lexical::parse::<f64, _>(value) {
							Ok(value) if !is_invalid && value.is_finite() => value,
							_ => std::f64::NAN,
						};
						column.data.push(value);
					}
					Column::Text(column) => {
						let value = if is_invalid {
							None
						} else {
							Some(value.to_owned())
						};
						column.data.push(value);
					}
				}
			}
		}
		Ok(DataFrame { columns })
	}
}

#[test]
fn test_load_listings() {
	let csv = "Brand,Age,AskPrice\nHonda,4,\"₹ 4,50,000\"\nBMW,,NA\n";
	let mut column_types = BTreeMap::new();
	column_types.insert("Age".to_owned(), ColumnType::Number);
	let mut df = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions {
			column_types: Some(column_types),
			..Default::default()
		},
		|_| {},
	)
	.unwrap();
	assert!(df.number_column("Age").unwrap().data[1].is_nan());
	df.remove_column("Age");
	insta::assert_debug_snapshot!(df, @r###"
 DataFrame {
     columns: [
         Text(
             TextColumn {
                 name: "Brand",
                 data: [
                     Some(
                         "Honda",
                     ),
                     Some(
                         "BMW",
                     ),
                 ],
             },
         ),
         Text(
             TextColumn {
                 name: "AskPrice",
                 data: [
                     Some(
                         "₹ 4,50,000",
                     ),
                     None,
                 ],
             },
         ),
     ],
 }
 "###);
}
