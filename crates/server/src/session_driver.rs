use futures::stream::{FuturesOrdered, Stream, StreamExt};

use facestream_core::codec::domain::data_uri::FramePayload;
use facestream_core::pipeline::frame_pipeline::PipelineError;
use facestream_core::session::connection_session::{ConnectionSession, SessionStats};

/// Runs one connection until its inbound stream ends.
///
/// Admission is decided the moment a frame arrives, so a slow pipeline never
/// delays the rate limiter. At most `max_in_flight` admitted frames are
/// processed at once on the blocking pool; a frame arriving while that many
/// are outstanding is dropped unseen by the rate limiter. Results are emitted
/// strictly in admission order. When the inbound stream ends the session is
/// closed at once; frames still being processed run to completion and their
/// results are discarded.
pub async fn drive<S>(
    mut session: ConnectionSession,
    mut inbound: S,
    max_in_flight: usize,
) -> SessionStats
where
    S: Stream<Item = FramePayload> + Unpin,
{
    let max_in_flight = max_in_flight.max(1);
    let mut in_flight = FuturesOrdered::new();

    loop {
        tokio::select! {
            next = inbound.next() => match next {
                Some(_) if in_flight.len() >= max_in_flight => {
                    session.drop_busy();
                }
                Some(payload) => {
                    if let Some(frame) = session.admit(payload) {
                        in_flight.push_back(tokio::task::spawn_blocking(move || frame.process()));
                    }
                }
                None => break,
            },
            Some(joined) = in_flight.next(), if !in_flight.is_empty() => {
                let result = joined.unwrap_or_else(|e| Err(PipelineError::Worker(e.to_string())));
                session.complete(result);
            },
        }
    }

    if !in_flight.is_empty() {
        log::debug!(
            "{}: discarding {} in-flight frame(s)",
            session.id(),
            in_flight.len()
        );
    }
    session.disconnect()
}
