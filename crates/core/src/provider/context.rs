//! Cancellation shared by every provider worker of a scan.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use super::{ScanError, Show};

/// Cancellable scan context.
///
/// Clones share the same state: cancelling any clone cancels all of them.
/// A [`child`](Self::child) is cancelled with its parent but can also be
/// cancelled on its own, leaving the parent untouched.
#[derive(Debug, Clone)]
pub struct ScanContext {
    cancel_tx: Arc<watch::Sender<bool>>,
    ancestors: Vec<Arc<watch::Sender<bool>>>,
}

impl Default for ScanContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanContext {
    pub fn new() -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            cancel_tx: Arc::new(cancel_tx),
            ancestors: Vec::new(),
        }
    }

    /// New context cancelled whenever this one is.
    pub fn child(&self) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        let mut ancestors = self.ancestors.clone();
        ancestors.push(self.cancel_tx.clone());
        Self {
            cancel_tx: Arc::new(cancel_tx),
            ancestors,
        }
    }

    /// Signal cancellation to every holder of this context and its children.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags().any(|tx| *tx.borrow())
    }

    /// Resolves once the context or one of its ancestors is cancelled.
    pub async fn cancelled(&self) {
        let waits = self
            .flags()
            .map(|tx| Box::pin(wait_for_cancel(tx.subscribe())));
        futures::future::select_all(waits).await;
    }

    fn flags(&self) -> impl Iterator<Item = &Arc<watch::Sender<bool>>> {
        std::iter::once(&self.cancel_tx).chain(self.ancestors.iter())
    }
}

async fn wait_for_cancel(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Message sent from a provider worker to the merge stage.
#[derive(Debug)]
pub enum ScanEvent {
    Show(Show),
    Finished {
        provider: String,
        result: Result<(), ScanError>,
    },
}

/// Where a provider pushes the shows it discovers.
///
/// Backed by the bounded merge queue, so `send` applies back-pressure. Every
/// show is stamped with the provider name of the worker that owns the sink.
#[derive(Debug, Clone)]
pub struct ShowSink {
    provider: String,
    tx: mpsc::Sender<ScanEvent>,
}

impl ShowSink {
    pub fn new(provider: impl Into<String>, tx: mpsc::Sender<ScanEvent>) -> Self {
        Self {
            provider: provider.into(),
            tx,
        }
    }

    /// Standalone sink plus its receiving end, for driving a provider directly.
    pub fn channel(provider: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<ScanEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(provider, tx), rx)
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Deliver one show. Fails with [`ScanError::Cancelled`] once the merge
    /// stage has gone away.
    pub async fn send(&self, mut show: Show) -> Result<(), ScanError> {
        show.provider = self.provider.clone();
        self.tx
            .send(ScanEvent::Show(show))
            .await
            .map_err(|_| ScanError::Cancelled)
    }

    pub(crate) async fn finish(&self, result: Result<(), ScanError>) {
        let _ = self
            .tx
            .send(ScanEvent::Finished {
                provider: self.provider.clone(),
                result,
            })
            .await;
    }
}
