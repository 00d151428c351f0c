use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::diagnostics::SessionDiagnostics;
use crate::models::media::MediaChunk;
use crate::session::shared::SessionShared;
use crate::traits::transport::TransportSink;

/// Which pipeline a queue belongs to; selects the diagnostics counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    fn count_sent(self, diagnostics: &mut SessionDiagnostics) {
        match self {
            MediaKind::Audio => diagnostics.audio_chunks_sent += 1,
            MediaKind::Video => diagnostics.video_frames_sent += 1,
        }
    }

    fn count_dropped(self, diagnostics: &mut SessionDiagnostics, count: usize) {
        let count = count as u64;
        match self {
            MediaKind::Audio => diagnostics.audio_chunks_dropped += count,
            MediaKind::Video => diagnostics.video_frames_dropped += count,
        }
    }
}

/// Chunks produced by one capture callback or one video tick.
pub(crate) type MediaBatch = Vec<MediaChunk>;

/// Producer side of a single-slot outbound queue.
///
/// The slot holds one batch. While a batch is waiting for the transport,
/// newer batches are dropped whole.
#[derive(Clone)]
pub(crate) struct OutboundQueue {
    tx: mpsc::Sender<MediaBatch>,
    kind: MediaKind,
    shared: Arc<SessionShared>,
}

impl OutboundQueue {
    /// Create the queue together with the receiver its send pump drains.
    pub fn new(kind: MediaKind, shared: Arc<SessionShared>) -> (Self, mpsc::Receiver<MediaBatch>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx, kind, shared }, rx)
    }

    /// Offer a single chunk without blocking. Returns false if it was dropped.
    pub fn offer(&self, chunk: MediaChunk) -> bool {
        self.offer_batch(vec![chunk])
    }

    /// Offer a batch without blocking. Returns false if it was dropped.
    pub fn offer_batch(&self, batch: MediaBatch) -> bool {
        if batch.is_empty() {
            return true;
        }
        if !self.shared.is_active() {
            self.drop_batch(batch.len());
            return false;
        }
        match self.tx.try_send(batch) {
            Ok(()) => true,
            Err(e) => {
                self.drop_batch(e.into_inner().len());
                false
            }
        }
    }

    fn drop_batch(&self, count: usize) {
        let kind = self.kind;
        self.shared.record(|d| kind.count_dropped(d, count));
    }
}

/// Forward queued chunks to the transport, in order, until the queue closes.
pub(crate) fn spawn_send_pump(
    mut rx: mpsc::Receiver<MediaBatch>,
    kind: MediaKind,
    sink: Arc<dyn TransportSink>,
    shared: Arc<SessionShared>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(batch) = rx.recv().await {
            for chunk in batch {
                if !shared.is_active() {
                    shared.record(|d| kind.count_dropped(d, 1));
                    continue;
                }
                match sink.send_realtime_input(chunk).await {
                    Ok(()) => shared.record(|d| kind.count_sent(d)),
                    Err(e) => {
                        log::debug!("Dropping {:?} chunk, send failed: {}", kind, e);
                        shared.record(|d| kind.count_dropped(d, 1));
                    }
                }
            }
        }
        log::debug!("{:?} send pump finished", kind);
    })
}
