//! Completion signals
//!
//! A one-shot notification produced by the task that knows when it finished
//! (a camera move, a text reveal, a first paint) and consumed exactly once by
//! whoever awaits it. Dropping the producer resolves the signal with `None`,
//! so an awaiting party is never left pending by a torn-down producer.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

/// Producer half of a completion signal
#[derive(Debug)]
pub struct Completer<T> {
    tx: Option<oneshot::Sender<T>>,
}

/// Consumer half of a completion signal.
///
/// Resolves to `Some(value)` when completed and `None` when the producer was
/// dropped. Once resolved it stays `Pending`, so it can sit in a `select!`
/// loop guarded by [`CompletionSignal::is_terminated`].
#[derive(Debug)]
pub struct CompletionSignal<T> {
    rx: Option<oneshot::Receiver<T>>,
}

/// Signal fired once a freshly mounted scene has painted its first frame
pub type ReadySignal = CompletionSignal<()>;

/// Create a linked completer/signal pair
pub fn completion<T>() -> (Completer<T>, CompletionSignal<T>) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx: Some(tx) }, CompletionSignal { rx: Some(rx) })
}

impl<T> Completer<T> {
    /// Resolve the signal. Returns false if it was already resolved or
    /// nobody is listening anymore.
    pub fn complete(&mut self, value: T) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Whether `complete` has not been called yet
    pub fn is_pending(&self) -> bool {
        self.tx.is_some()
    }

    /// Whether the consumer is gone
    pub fn is_abandoned(&self) -> bool {
        self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }
}

impl<T> CompletionSignal<T> {
    /// A signal that is already resolved
    pub fn resolved(value: T) -> Self {
        let (mut completer, signal) = completion();
        completer.complete(value);
        signal
    }

    /// A signal whose producer is already gone
    pub fn dropped() -> Self {
        let (_, signal) = completion();
        signal
    }

    /// Whether this signal has already yielded its value
    pub fn is_terminated(&self) -> bool {
        self.rx.is_none()
    }

    /// Non-blocking check. `Some(Some(v))` when completed, `Some(None)` when
    /// the producer was dropped, `None` while still pending.
    pub fn try_take(&mut self) -> Option<Option<T>> {
        let rx = self.rx.as_mut()?;
        match rx.try_recv() {
            Ok(value) => {
                self.rx = None;
                Some(Some(value))
            }
            Err(oneshot::error::TryRecvError::Closed) => {
                self.rx = None;
                Some(None)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
        }
    }
}

impl<T> Future for CompletionSignal<T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Pending;
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(result) => {
                self.rx = None;
                Poll::Ready(result.ok())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
