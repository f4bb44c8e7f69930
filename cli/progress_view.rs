use autovalue_core::progress::{Progress, StackingProgress, TrainProgress};
use autovalue_util::progress_counter::ProgressCounter;
use num_traits::ToPrimitive;
use std::{
	io::Write,
	sync::mpsc::{channel, Receiver, Sender, TryRecvError},
	thread::{sleep, spawn, JoinHandle},
	time::Duration,
};

/// The progress view draws the current stage of training on a single line of stderr from a background thread.
pub struct ProgressView {
	thread: Option<JoinHandle<()>>,
	sender: Option<Sender<Option<Progress>>>,
}

impl ProgressView {
	pub fn new() -> Self {
		let (sender, receiver) = channel::<Option<Progress>>();
		let thread = Some(spawn(move || thread_main(receiver)));
		Self {
			thread,
			sender: Some(sender),
		}
	}

	pub fn update(&mut self, progress: Progress) {
		if let Some(sender) = self.sender.as_ref() {
			sender.send(Some(progress)).ok();
		}
	}
}

impl Drop for ProgressView {
	fn drop(&mut self) {
		if let Some(sender) = self.sender.take() {
			sender.send(None).ok();
		}
		if let Some(thread) = self.thread.take() {
			thread.join().ok();
		}
	}
}

fn thread_main(receiver: Receiver<Option<Progress>>) {
	let mut progress = None;
	let mut stderr = std::io::stderr();
	loop {
		match receiver.try_recv() {
			Err(TryRecvError::Empty) => {}
			Err(TryRecvError::Disconnected) | Ok(None) => break,
			Ok(Some(new_progress)) => progress = Some(new_progress),
		};
		if let Some(progress) = progress.as_ref() {
			write!(stderr, "\r\x1b[K{}", format_progress(progress)).ok();
			stderr.flush().ok();
		}
		sleep(Duration::from_millis(100));
	}
	if progress.is_some() {
		writeln!(stderr, "\r\x1b[K").ok();
	}
}

fn format_progress(progress: &Progress) -> String {
	match progress {
		Progress::Loading(counter) => format!("Loading data {}", format_counter(counter)),
		Progress::Cleaning => "Cleaning data".to_owned(),
		Progress::ComputingFeatures => "Computing features".to_owned(),
		Progress::Training(StackingProgress {
			stage,
			model,
			progress,
		}) => match progress {
			TrainProgress::Initializing => {
				format!("Training {} ({}), initializing", model, stage)
			}
			TrainProgress::Training(counter) => {
				format!("Training {} ({}) {}", model, stage, format_counter(counter))
			}
		},
		Progress::Testing => "Testing".to_owned(),
	}
}

fn format_counter(counter: &ProgressCounter) -> String {
	let percent = (counter.fraction() * 100.0).round().to_u8().unwrap_or(100);
	format!("{}%", percent)
}
