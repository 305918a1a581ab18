// ── Reactive view streams ──
//
// Subscription type for consuming session views published by the
// controller.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Entity;
use crate::session::SessionView;

type Snapshot<T> = Arc<SessionView<T>>;

/// A subscription to the session view.
///
/// Provides both point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct ViewStream<T: Entity> {
    current: Snapshot<T>,
    receiver: watch::Receiver<Snapshot<T>>,
}

impl<T: Entity> ViewStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot<T>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The view captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &Snapshot<T> {
        &self.current
    }

    /// The latest published view.
    pub fn latest(&self) -> Snapshot<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the controller is gone.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Wait until `pred` holds, checking the latest view first.
    pub async fn wait_for(&mut self, mut pred: impl FnMut(&SessionView<T>) -> bool) -> Option<Snapshot<T>> {
        let latest = self.receiver.borrow_and_update().clone();
        self.current = latest.clone();
        if pred(&latest) {
            return Some(latest);
        }
        loop {
            let snap = self.changed().await?;
            if pred(&snap) {
                return Some(snap);
            }
        }
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> ViewWatchStream<T> {
        ViewWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the current view first, then one view per publish.
pub struct ViewWatchStream<T: Entity> {
    inner: WatchStream<Snapshot<T>>,
}

impl<T: Entity> Stream for ViewWatchStream<T> {
    type Item = Snapshot<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use super::*;
    use crate::model::flow::fixtures::http_flow;
    use crate::model::Flow;

    fn view(version: u64) -> Snapshot<Flow> {
        Arc::new(SessionView {
            items: vec![Arc::new(http_flow("a", "GET", "h", "/", None))],
            version,
            ..SessionView::default()
        })
    }

    #[tokio::test]
    async fn changed_tracks_latest_publish() {
        let (tx, rx) = watch::channel(view(0));
        let mut stream = ViewStream::new(rx);
        assert_eq!(stream.current().version, 0);

        tx.send_replace(view(3));
        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.version, 3);
        assert_eq!(stream.current().version, 3);
    }

    #[tokio::test]
    async fn changed_returns_none_when_sender_dropped() {
        let (tx, rx) = watch::channel(view(0));
        let mut stream = ViewStream::new(rx);
        drop(tx);
        assert!(stream.changed().await.is_none());
    }

    #[tokio::test]
    async fn wait_for_skips_until_predicate_holds() {
        let (tx, rx) = watch::channel(view(0));
        let mut stream = ViewStream::new(rx);

        let waiter = tokio::spawn(async move { stream.wait_for(|v| v.version >= 2).await });
        tx.send_replace(view(1));
        tx.send_replace(view(2));

        let snap = waiter.await.unwrap().unwrap();
        assert!(snap.version >= 2);
    }

    #[tokio::test]
    async fn into_stream_yields_current_first() {
        let (_tx, rx) = watch::channel(view(7));
        let mut stream = ViewStream::new(rx).into_stream();
        assert_eq!(stream.next().await.unwrap().version, 7);
    }
}
