/*!
A plain text table, used by the cli to print evaluation reports.
*/

pub struct Table<'a> {
	pub padding: usize,
	pub header: &'a [&'a str],
	pub rows: &'a [Vec<String>],
}

impl<'a> std::fmt::Display for Table<'a> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		let n_columns = self.header.len();
		let mut column_widths: Vec<usize> = self.header.iter().map(|h| h.chars().count()).collect();
		for row in self.rows {
			for (column_width, value) in column_widths.iter_mut().zip(row.iter()) {
				*column_width = usize::max(*column_width, value.chars().count());
			}
		}
		let line = Line {
			column_widths: &column_widths,
			padding: self.padding,
		};
		let header: Vec<String> = self.header.iter().map(|h| h.to_string()).collect();
		let row = Row {
			column_widths: &column_widths,
			padding: self.padding,
			values: &header,
		};
		writeln!(f, "{}", line)?;
		writeln!(f, "{}", row)?;
		writeln!(f, "{}", line)?;
		for values in self.rows {
			let row = Row {
				column_widths: &column_widths[..n_columns.min(values.len())],
				padding: self.padding,
				values,
			};
			writeln!(f, "{}", row)?;
		}
		write!(f, "{}", line)
	}
}

struct Line<'a> {
	column_widths: &'a [usize],
	padding: usize,
}

impl<'a> std::fmt::Display for Line<'a> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "+")?;
		for column_width in self.column_widths.iter() {
			write!(f, "{}", "-".repeat(column_width + 2 * self.padding))?;
			write!(f, "+")?;
		}
		Ok(())
	}
}

struct Row<'a> {
	column_widths: &'a [usize],
	padding: usize,
	values: &'a [String],
}

impl<'a> std::fmt::Display for Row<'a> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "|")?;
		for (column_width, value) in self.column_widths.iter().zip(self.values) {
			let fill = column_width + self.padding - value.chars().count();
			write!(f, "{}{}{}|", " ".repeat(self.padding), value, " ".repeat(fill))?;
		}
		Ok(())
	}
}

#[test]
fn test_table() {
	let rows = vec![
		vec!["R2".to_owned(), "0.91".to_owned()],
		vec!["MAE".to_owned(), "₹ 1,200.00".to_owned()],
	];
	let table = Table {
		padding: 1,
		header: &["metric", "value"],
		rows: &rows,
	};
	let expected = "\
+--------+------------+
| metric | value      |
+--------+------------+
| R2     | 0.91       |
| MAE    | ₹ 1,200.00 |
+--------+------------+";
	assert_eq!(table.to_string(), expected);
}
