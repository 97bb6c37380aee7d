//! Updates pushed to presentation subscribers

use crate::view::TranscriptView;
use futures::stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// One push to presentation code.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// Fresh projection, recomputed after an applied mutation.
    Projection(TranscriptView),
    /// A per-event failure, surfaced instead of silently dropped.
    Rejected { reason: String },
}

/// Adapt a subscription into a plain `Stream`, skipping lagged gaps.
pub fn updates_stream(
    rx: tokio::sync::broadcast::Receiver<SessionUpdate>,
) -> impl Stream<Item = SessionUpdate> {
    BroadcastStream::new(rx).filter_map(|result| result.ok())
}
