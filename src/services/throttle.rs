use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};

/// Spaces out calls issued by one logical caller. Callers queue on the lock,
/// so two calls are never closer together than `delay`.
pub struct Throttle {
    delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Throttle {
            delay,
            last_call: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let ready_at = previous + self.delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_call = Some(Instant::now());
    }
}
