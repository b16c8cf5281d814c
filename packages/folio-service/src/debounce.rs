use std::{sync::Mutex, time::Duration};

use tokio_util::sync::CancellationToken;

/// Caller-owned debounce for search input.
///
/// Each call supersedes the previous one. Cancelling the parent token drops every pending call.
#[derive(Debug)]
pub struct Debouncer {
	delay: Duration,
	parent: CancellationToken,
	current: Mutex<Option<CancellationToken>>,
}
impl Debouncer {
	pub fn new(delay: Duration) -> Self {
		Self::with_parent(delay, CancellationToken::new())
	}

	pub fn with_parent(delay: Duration, parent: CancellationToken) -> Self {
		Self { delay, parent, current: Mutex::new(None) }
	}

	pub fn from_config(cfg: &folio_config::Feed) -> Self {
		Self::new(Duration::from_millis(cfg.debounce_ms))
	}

	/// Resolves to `Some(value)` once `delay` passes without a newer call, `None` otherwise.
	pub async fn debounce<T>(&self, value: T) -> Option<T> {
		let token = self.parent.child_token();
		let previous = self.current.lock().unwrap_or_else(|err| err.into_inner()).replace(token.clone());

		if let Some(previous) = previous {
			previous.cancel();
		}

		tokio::select! {
			_ = token.cancelled() => None,
			_ = tokio::time::sleep(self.delay) => Some(value),
		}
	}

	pub fn cancel(&self) {
		if let Some(token) = self.current.lock().unwrap_or_else(|err| err.into_inner()).take() {
			token.cancel();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn newer_call_supersedes_older() {
		let debouncer = Debouncer::new(Duration::from_millis(300));
		let (first, second) = tokio::join!(debouncer.debounce("ein"), async {
			tokio::time::sleep(Duration::from_millis(100)).await;

			debouncer.debounce("einlage").await
		});

		assert_eq!(first, None);
		assert_eq!(second, Some("einlage"));
	}

	#[tokio::test(start_paused = true)]
	async fn delay_comes_from_feed_config() {
		let cfg = folio_config::Feed { debounce_ms: 50, ..Default::default() };
		let debouncer = Debouncer::from_config(&cfg);
		let started = tokio::time::Instant::now();

		assert_eq!(debouncer.debounce("scan").await, Some("scan"));
		assert_eq!(started.elapsed(), Duration::from_millis(50));
	}

	#[tokio::test(start_paused = true)]
	async fn parent_cancellation_drops_pending_calls() {
		let parent = CancellationToken::new();
		let debouncer = Debouncer::with_parent(Duration::from_millis(300), parent.clone());
		let (value, ()) = tokio::join!(debouncer.debounce(1), async { parent.cancel() });

		assert_eq!(value, None);
	}
}
