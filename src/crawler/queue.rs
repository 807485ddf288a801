//! Work queue shared by the producer and the worker pool
//!
//! The queue is an unbounded tokio channel. If pagination outruns the
//! workers, pending items accumulate in memory; the coordinator logs the
//! backlog as it goes so the growth is visible.
//!
//! Dropping the sender ends the run: workers keep draining whatever is
//! still buffered and see `None` only once the channel is empty.

use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

/// A detail-page URL waiting for a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlWorkItem {
    pub url: String,
    /// Listing page the link was found on
    pub page: u32,
}

/// Producer half of the work queue
pub type WorkSender = UnboundedSender<CrawlWorkItem>;

/// Consumer half of the work queue, cloned into every worker
#[derive(Debug, Clone)]
pub struct WorkReceiver {
    inner: Arc<Mutex<UnboundedReceiver<CrawlWorkItem>>>,
}

impl WorkReceiver {
    /// Waits for the next item; `None` once every sender is gone and the
    /// buffer is empty
    pub async fn recv(&self) -> Option<CrawlWorkItem> {
        self.inner.lock().await.recv().await
    }
}

/// Creates the queue for one crawl run
pub fn work_queue() -> (WorkSender, WorkReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        tx,
        WorkReceiver {
            inner: Arc::new(Mutex::new(rx)),
        },
    )
}
