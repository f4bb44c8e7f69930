use std::sync::{
	atomic::{AtomicU64, Ordering},
	Arc,
};

/// A `ProgressCounter` is shared between a long running task, which increments it, and a progress view, which reads it.
#[derive(Clone, Debug)]
pub struct ProgressCounter {
	current: Arc<AtomicU64>,
	total: u64,
}

impl ProgressCounter {
	pub fn new(total: u64) -> Self {
		Self {
			current: Arc::new(AtomicU64::new(0)),
			total,
		}
	}

	pub fn get(&self) -> u64 {
		self.current.load(Ordering::Relaxed)
	}

	pub fn set(&self, value: u64) {
		self.current.store(value, Ordering::Relaxed);
	}

	pub fn inc(&self, amount: u64) {
		self.current.fetch_add(amount, Ordering::Relaxed);
	}

	/// The fraction of the work completed, in `[0, 1]`. A counter with a total of zero is always complete.
	pub fn fraction(&self) -> f32 {
		if self.total == 0 {
			return 1.0;
		}
		(self.get().min(self.total) as f64 / self.total as f64) as f32
	}
}

#[test]
fn test_progress_counter_fraction() {
	let counter = ProgressCounter::new(4);
	let shared = counter.clone();
	shared.inc(1);
	assert_eq!(counter.get(), 1);
	assert!((counter.fraction() - 0.25).abs() < 1e-6);
	shared.inc(10);
	assert!((counter.fraction() - 1.0).abs() < 1e-6);
	counter.set(2);
	assert_eq!(shared.get(), 2);
	assert!((ProgressCounter::new(0).fraction() - 1.0).abs() < 1e-6);
}
