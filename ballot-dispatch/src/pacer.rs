use std::time::Duration;

use tokio::time::Instant;

/// Fixed pause between two sends, to stay under submission-server limits.
///
/// The pause is measured from the previous send, so time spent deriving the
/// next token counts towards it.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// No pause at all.
    #[must_use]
    pub const fn unthrottled() -> Self {
        Self::new(Duration::ZERO)
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a send is allowed, then record it.
    pub async fn ready(&mut self) {
        if let Some(last) = self.last {
            tokio::time::sleep_until(last + self.interval).await;
        }
        self.last = Some(Instant::now());
    }
}
