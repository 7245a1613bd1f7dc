//! Server-sent event stream of core notifications (GET /events).
//!
//! Every [`AppEvent`] the core emits is forwarded as one SSE message with a
//! JSON payload. Slow consumers that lag behind the broadcast buffer miss
//! the skipped events and continue from the live edge.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::events::EventBus;

pub fn router(events: EventBus) -> Router {
    Router::new()
        .route("/events", get(stream_events))
        .with_state(events)
}

async fn stream_events(
    State(events): State<EventBus>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = events.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => match Event::default().json_data(&event) {
                    Ok(sse_event) => return Some((Ok(sse_event), rx)),
                    Err(e) => {
                        debug!("Skipping unserializable event: {e}");
                        continue;
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    debug!("SSE subscriber lagged, skipped {skipped} events");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
