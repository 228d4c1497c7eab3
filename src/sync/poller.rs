//! Cancellable repeating task used for the background pending-pool refresh.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Shortest period a poller runs at. Zero would spin the tick loop.
pub(crate) const MIN_PERIOD: Duration = Duration::from_millis(100);

/// Runs a tick function at a fixed interval until stopped.
///
/// The first tick happens one full interval after spawning. A tick that is running when the
/// poller is stopped is allowed to finish; no further tick starts afterwards.
pub(crate) struct Poller {
	cancel: CancellationToken,
	handle: Option<JoinHandle<()>>,
}

impl Poller {
	pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
	where
		F: FnMut() -> Fut + Send + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		let period = if period < MIN_PERIOD {
			warn!("{} poll interval {:?} is below the minimum, using {:?}", name, period, MIN_PERIOD);
			MIN_PERIOD
		} else {
			period
		};
		let cancel = CancellationToken::new();
		let token = cancel.clone();

		let handle = tokio::spawn(async move {
			let mut interval = tokio::time::interval_at(Instant::now() + period, period);
			interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

			loop {
				tokio::select! {
					_ = token.cancelled() => {
						debug!("{} poller stopped", name);
						break;
					}
					_ = interval.tick() => {
						tick().await;
					}
				}
			}
		});

		Self {
			cancel,
			handle: Some(handle),
		}
	}

	/// Stop scheduling ticks and wait for the task to exit.
	pub async fn stop(&mut self) {
		self.cancel.cancel();
		if let Some(handle) = self.handle.take() {
			if let Err(e) = handle.await {
				debug!("Poller task ended abnormally: {}", e);
			}
		}
	}
}

impl Drop for Poller {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}
