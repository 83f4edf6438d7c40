//! Plain-text streaming of relayed chat replies.
//!
//! Fragments are written to the body as they arrive from the upstream
//! channel. There is no framing and no end-of-stream marker: the body simply
//! ends when the channel closes.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::upstream::TextStream;

pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Turn a fragment channel into a `200 text/plain` streaming response.
pub fn text_stream_response(rx: TextStream) -> Response {
    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));

    (
        [
            (CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8)),
            (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_body_is_plain_concatenation() {
        let (tx, rx) = mpsc::channel(8);
        for fragment in ["Hello", ", ", "world"] {
            tx.send(fragment.to_string()).await.unwrap();
        }
        drop(tx);

        let response = text_stream_response(rx);
        assert_eq!(response.headers()[CONTENT_TYPE], TEXT_PLAIN_UTF8);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"Hello, world");
    }
}
