/*!
This crate contains small utilities shared by the other autovalue crates.
*/

pub mod finite;
pub mod progress_counter;
pub mod table;

#[doc(hidden)]
pub use itertools;
#[doc(hidden)]
pub use rayon;

/// Zip any number of iterables together into an iterator of tuples.
#[macro_export]
macro_rules! zip {
	($($e:expr),* $(,)*) => {
		$crate::itertools::multizip(($($e,)*))
	};
}

/// Zip any number of parallel iterables together into a rayon parallel iterator.
#[macro_export]
macro_rules! pzip {
	($($e:expr),* $(,)*) => {
		$crate::rayon::iter::IntoParallelIterator::into_par_iter(($($e,)*))
	};
}

#[test]
fn test_zip() {
	let a = [1, 2, 3];
	let b = vec![4.0, 5.0, 6.0];
	let c = ["x", "y", "z"];
	let zipped: Vec<(i32, f64, &str)> = zip!(a.iter(), b.iter(), c.iter())
		.map(|(a, b, c)| (*a, *b, *c))
		.collect();
	assert_eq!(zipped, vec![(1, 4.0, "x"), (2, 5.0, "y"), (3, 6.0, "z")]);
	let pairs: Vec<(i32, i32)> = zip!(a.iter().copied(), a.iter().rev().copied()).collect();
	assert_eq!(pairs, vec![(1, 3), (2, 2), (3, 1)]);
}
