//! HTTP response wrapper with a lazily consumed body.

use std::collections::VecDeque;

use bytes::Bytes;
use reqwest::StatusCode;

use super::FetchError;

/// Response body source - either still on the wire (reqwest) or scripted
/// chunks supplied by a test fetcher.
pub(crate) enum Body {
    Remote(reqwest::Response),
    Scripted(VecDeque<Result<Bytes, FetchError>>),
}

/// HTTP response wrapper.
///
/// The body is not buffered; callers drain it chunk by chunk so large media
/// files never live in memory at once.
pub struct HttpResponse {
    pub status: StatusCode,
    pub(crate) body: Body,
}

impl HttpResponse {
    /// Wrap a live reqwest response.
    pub(crate) fn from_reqwest(response: reqwest::Response) -> Self {
        Self {
            status: response.status(),
            body: Body::Remote(response),
        }
    }

    /// Build a response from pre-scripted chunks. Used by test fetchers to
    /// simulate media streams, including mid-stream failures.
    pub fn from_chunks(chunks: Vec<Result<Bytes, FetchError>>) -> Self {
        Self {
            status: StatusCode::OK,
            body: Body::Scripted(chunks.into()),
        }
    }

    /// Check if the response is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Next body chunk, or `None` when the stream is exhausted.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, FetchError> {
        match &mut self.body {
            Body::Remote(response) => response
                .chunk()
                .await
                .map_err(|e| FetchError::Interrupted(e.to_string())),
            Body::Scripted(chunks) => match chunks.pop_front() {
                Some(Ok(bytes)) => Ok(Some(bytes)),
                Some(Err(e)) => Err(e),
                None => Ok(None),
            },
        }
    }

    /// Drain the whole body as text.
    pub async fn text(self) -> Result<String, FetchError> {
        match self.body {
            Body::Remote(response) => response
                .text()
                .await
                .map_err(|e| FetchError::Interrupted(e.to_string())),
            Body::Scripted(mut chunks) => {
                let mut buf = Vec::new();
                while let Some(chunk) = chunks.pop_front() {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(String::from_utf8_lossy(&buf).into_owned())
            }
        }
    }
}
