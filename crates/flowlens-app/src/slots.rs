use crate::cancellation::CancellationToken;
use crate::error::FetchError;
use flowlens_events::telemetry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// A logical action that allows at most one request in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchSlot {
    IndexRepository,
    GraphLoad,
    Explanation,
    FileContent,
}

impl FetchSlot {
    pub const ALL: [FetchSlot; 4] = [
        FetchSlot::IndexRepository,
        FetchSlot::GraphLoad,
        FetchSlot::Explanation,
        FetchSlot::FileContent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchSlot::IndexRepository => "IndexRepository",
            FetchSlot::GraphLoad => "GraphLoad",
            FetchSlot::Explanation => "Explanation",
            FetchSlot::FileContent => "FileContent",
        }
    }
}

impl fmt::Display for FetchSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle for one request started through [`SlotGuard::begin`].
#[derive(Debug, Clone)]
pub struct SlotTicket {
    slot: FetchSlot,
    token: CancellationToken,
    correlation_id: String,
    started: Instant,
}

impl SlotTicket {
    pub fn slot(&self) -> FetchSlot {
        self.slot
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Drive `fut` until it finishes or this ticket is cancelled.
    ///
    /// A ticket cancelled by the time the future settles yields
    /// `FetchError::Canceled` even when the future produced a value.
    pub async fn run<T, Fut>(&self, fut: Fut) -> Result<T, FetchError>
    where
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let outcome = tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(FetchError::Canceled),
            result = fut => result,
        };
        if self.token.is_cancelled() {
            return Err(FetchError::Canceled);
        }
        outcome
    }
}

/// Cancel-then-start bookkeeping for every [`FetchSlot`].
#[derive(Clone, Default)]
pub struct SlotGuard {
    active: Arc<Mutex<HashMap<FetchSlot, CancellationToken>>>,
}

impl SlotGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request in `slot`, cancelling whatever was in flight there.
    pub fn begin(&self, slot: FetchSlot) -> SlotTicket {
        let token = CancellationToken::new();
        let previous = self.active.lock().insert(slot, token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let correlation_id = telemetry::new_correlation_id();
        telemetry::request_start(slot.as_str(), &correlation_id);

        SlotTicket {
            slot,
            token,
            correlation_id,
            started: Instant::now(),
        }
    }

    pub fn in_flight(&self, slot: FetchSlot) -> bool {
        self.active.lock().contains_key(&slot)
    }

    pub fn cancel(&self, slot: FetchSlot) {
        if let Some(token) = self.active.lock().remove(&slot) {
            token.cancel();
        }
    }

    /// Cancel every in-flight request, e.g. when the consuming view closes.
    pub fn cancel_all(&self) {
        let drained: Vec<CancellationToken> =
            self.active.lock().drain().map(|(_, token)| token).collect();
        for token in drained {
            token.cancel();
        }
    }

    /// Settle `ticket` with `result`, running `apply` only when the ticket is
    /// still current. The slot lock is held while `apply` runs so a newer
    /// request cannot start in between.
    pub fn complete<T, R>(
        &self,
        ticket: &SlotTicket,
        result: Result<T, FetchError>,
        apply: impl FnOnce(T) -> R,
    ) -> Result<R, FetchError> {
        let slot = ticket.slot.as_str();
        let correlation_id = ticket.correlation_id.as_str();

        let mut active = self.active.lock();
        let current = !ticket.token.is_cancelled()
            && active
                .get(&ticket.slot)
                .is_some_and(|token| token.same_as(&ticket.token));

        if !current {
            drop(active);
            telemetry::request_canceled(slot, correlation_id);
            return Err(FetchError::Canceled);
        }
        active.remove(&ticket.slot);

        match result {
            Ok(value) => {
                let applied = apply(value);
                drop(active);
                telemetry::request_success(
                    slot,
                    correlation_id,
                    Some(ticket.started.elapsed().as_millis()),
                );
                Ok(applied)
            }
            Err(FetchError::Canceled) => {
                drop(active);
                telemetry::request_canceled(slot, correlation_id);
                Err(FetchError::Canceled)
            }
            Err(err) => {
                drop(active);
                telemetry::request_failure(slot, correlation_id, Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// `begin`, drive `fut`, then `complete` with `apply`.
    pub async fn run<T, R, Fut>(
        &self,
        slot: FetchSlot,
        fut: Fut,
        apply: impl FnOnce(T) -> R,
    ) -> Result<R, FetchError>
    where
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let ticket = self.begin(slot);
        let result = ticket.run(fut).await;
        self.complete(&ticket, result, apply)
    }
}
