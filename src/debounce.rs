use std::time::Duration;
use tokio::time::{sleep_until, Instant};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Holds back a value until no newer one has arrived for `delay`.
///
/// Meant to sit in a `tokio::select!` loop: `push` on every input event,
/// and poll `ready` (guarded by `is_pending`) in another branch. `ready` only
/// takes the value once the quiet period has elapsed, so dropping its future
/// half-way loses nothing.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.delay));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub async fn ready(&mut self) -> T {
        loop {
            match &self.pending {
                Some((_, deadline)) => sleep_until(*deadline).await,
                None => std::future::pending::<()>().await,
            }

            if let Some((value, _)) = self.pending.take() {
                return value;
            }
        }
    }
}
