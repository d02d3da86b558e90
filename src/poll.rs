//! Polling a resource until it leaves an in-progress state.

use std::{future::Future, time::Duration};

use tracing::debug;

use crate::{
    error::{Error, Result},
    scope::Scope,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Pending,
    Done,
    /// Terminal failure, carrying the state that was observed.
    Failed(String),
}

/// Calls `fetch` right away and then every `interval` until `classify`
/// reports a terminal status. The scope's cancellation and deadline apply
/// to both the fetches and the waits in between.
pub async fn poll_until<T, F, Fut, C>(
    scope: &Scope,
    interval: Duration,
    mut fetch: F,
    classify: C,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    C: Fn(&T) -> PollStatus,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let value = scope.run(fetch()).await?;
        match classify(&value) {
            PollStatus::Done => return Ok(value),
            PollStatus::Failed(state) => return Err(Error::StateFailed { state }),
            PollStatus::Pending => {
                debug!(attempt, interval_ms = interval.as_millis() as u64, "still pending");
            }
        }
        scope.sleep(interval).await?;
    }
}
