/*!
This crate provides a small columnar dataframe, which is a two dimensional table where each column has a name and a type, like a spreadsheet. It only implements what the autovalue pipeline needs: loading listings from csv, looking up columns by name, adding derived columns, and selecting rows.
*/

pub mod load;

pub use self::load::*;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataFrame {
	pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
	Number(NumberColumn),
	Text(TextColumn),
}

/// Missing or unparseable number values are stored as NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberColumn {
	pub name: String,
	pub data: Vec<f64>,
}

/// Missing text values are stored as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextColumn {
	pub name: String,
	pub data: Vec<Option<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnType {
	Number,
	Text,
}

impl DataFrame {
	pub fn new(columns: Vec<Column>) -> Self {
		Self { columns }
	}

	pub fn ncols(&self) -> usize {
		self.columns.len()
	}

	pub fn nrows(&self) -> usize {
		self.columns.first().map(|column| column.len()).unwrap_or(0)
	}

	pub fn column_names(&self) -> Vec<&str> {
		self.columns.iter().map(|column| column.name()).collect()
	}

	pub fn column(&self, name: &str) -> Option<&Column> {
		self.columns.iter().find(|column| column.name() == name)
	}

	pub fn has_column(&self, name: &str) -> bool {
		self.column(name).is_some()
	}

	pub fn number_column(&self, name: &str) -> Option<&NumberColumn> {
		self.column(name).and_then(|column| column.as_number())
	}

	pub fn text_column(&self, name: &str) -> Option<&TextColumn> {
		self.column(name).and_then(|column| column.as_text())
	}

	/// Add a column to the end of the dataframe. If a column with the same name already exists, it is replaced in place, so the column order is unchanged.
	pub fn insert_column(&mut self, column: Column) {
		match self
			.columns
			.iter_mut()
			.find(|existing| existing.name() == column.name())
		{
			Some(existing) => *existing = column,
			None => self.columns.push(column),
		}
	}

	pub fn remove_column(&mut self, name: &str) -> Option<Column> {
		let index = self.columns.iter().position(|column| column.name() == name)?;
		Some(self.columns.remove(index))
	}

	/// Keep the rows for which `mask` is true.
	pub fn filter_rows(&self, mask: &[bool]) -> DataFrame {
		let columns = self
			.columns
			.iter()
			.map(|column| column.filter_rows(mask))
			.collect();
		DataFrame { columns }
	}

	/// Select the rows at `indexes`, in the order given. Indexes may repeat.
	pub fn take_rows(&self, indexes: &[usize]) -> DataFrame {
		let columns = self
			.columns
			.iter()
			.map(|column| column.take_rows(indexes))
			.collect();
		DataFrame { columns }
	}
}

impl Column {
	pub fn len(&self) -> usize {
		match self {
			Self::Number(s) => s.data.len(),
			Self::Text(s) => s.data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Number(s) => s.name.as_str(),
			Self::Text(s) => s.name.as_str(),
		}
	}

	pub fn as_number(&self) -> Option<&NumberColumn> {
		match self {
			Self::Number(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&TextColumn> {
		match self {
			Self::Text(s) => Some(s),
			_ => None,
		}
	}

	fn filter_rows(&self, mask: &[bool]) -> Column {
		match self {
			Self::Number(column) => Self::Number(NumberColumn {
				name: column.name.clone(),
				data: filter(&column.data, mask),
			}),
			Self::Text(column) => Self::Text(TextColumn {
				name: column.name.clone(),
				data: filter(&column.data, mask),
			}),
		}
	}

	fn take_rows(&self, indexes: &[usize]) -> Column {
		match self {
			Self::Number(column) => Self::Number(NumberColumn {
				name: column.name.clone(),
				data: indexes.iter().map(|index| column.data[*index]).collect(),
			}),
			Self::Text(column) => Self::Text(TextColumn {
				name: column.name.clone(),
				data: indexes
					.iter()
					.map(|index| column.data[*index].clone())
					.collect(),
			}),
		}
	}
}

fn filter<T: Clone>(data: &[T], mask: &[bool]) -> Vec<T> {
	data.iter()
		.zip(mask.iter())
		.filter(|(_, keep)| **keep)
		.map(|(value, _)| value.clone())
		.collect()
}

impl NumberColumn {
	pub fn new(name: String, data: Vec<f64>) -> Self {
		Self { name, data }
	}

	pub fn as_slice(&self) -> &[f64] {
		self.data.as_slice()
	}
}

impl TextColumn {
	pub fn new(name: String, data: Vec<Option<String>>) -> Self {
		Self { name, data }
	}

	/// Iterate over the values as `Option<&str>`.
	pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
		self.data.iter().map(|value| value.as_deref())
	}
}

#[test]
fn test_insert_filter_take() {
	let mut df = DataFrame::new(vec![
		Column::Text(TextColumn::new(
			"Brand".to_owned(),
			vec![Some("Honda".to_owned()), None, Some("BMW".to_owned())],
		)),
		Column::Number(NumberColumn::new("Age".to_owned(), vec![1.0, 2.0, 3.0])),
	]);
	df.insert_column(Column::Number(NumberColumn::new(
		"Age".to_owned(),
		vec![4.0, 5.0, 6.0],
	)));
	df.insert_column(Column::Number(NumberColumn::new(
		"Age_Squared".to_owned(),
		vec![16.0, 25.0, 36.0],
	)));
	assert_eq!(df.column_names(), vec!["Brand", "Age", "Age_Squared"]);
	let filtered = df.filter_rows(&[true, false, true]);
	assert_eq!(filtered.nrows(), 2);
	assert_eq!(filtered.number_column("Age").unwrap().data, vec![4.0, 6.0]);
	let taken = df.take_rows(&[2, 2, 0]);
	assert_eq!(
		taken.text_column("Brand").unwrap().iter().collect::<Vec<_>>(),
		vec![Some("BMW"), Some("BMW"), Some("Honda")]
	);
	assert!(df.remove_column("Age_Squared").is_some());
	assert!(!df.has_column("Age_Squared"));
}
