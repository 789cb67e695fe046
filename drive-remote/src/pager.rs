use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::RemoteError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

/// Lazily fetched, single-pass sequence over a paginated endpoint.
///
/// A background task fetches one page at a time and hands items over a
/// channel holding at most one element, so it never runs ahead of the reader
/// by more than a single item. A failed fetch is yielded as a final `Err`,
/// after which the stream ends. Dropping the stream aborts the fetch task.
pub struct PageStream<T> {
    rx: mpsc::Receiver<Result<T, RemoteError>>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> PageStream<T> {
    /// `fetch` receives the continuation token (`None` for the first page);
    /// items for which `keep` returns false are skipped.
    pub fn spawn<F, Fut, K>(mut fetch: F, keep: K) -> Self
    where
        F: FnMut(Option<String>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Page<T>, RemoteError>> + Send + 'static,
        K: Fn(&T) -> bool + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(async move {
            let mut page_token = None;
            let mut pages = 0usize;
            loop {
                let page = match fetch(page_token.take()).await {
                    Ok(page) => page,
                    Err(err) => {
                        warn!(
                            pages,
                            retryable = err.is_retryable(),
                            error = %err,
                            "page fetch failed, ending stream"
                        );
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                };
                pages += 1;
                for item in page.items {
                    if !keep(&item) {
                        continue;
                    }
                    if tx.send(Ok(item)).await.is_err() {
                        return;
                    }
                }
                match page.next_page_token.filter(|token| !token.is_empty()) {
                    Some(token) => page_token = Some(token),
                    None => {
                        debug!(pages, "pagination exhausted");
                        return;
                    }
                }
            }
        });
        Self { rx, task }
    }
}

impl<T> Stream for PageStream<T> {
    type Item = Result<T, RemoteError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> Drop for PageStream<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
