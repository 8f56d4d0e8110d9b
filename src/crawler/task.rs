//! Tasks, results and response bodies exchanged with the worker pool

use crate::BodyError;
use sha2::{Digest, Sha256};
use std::fmt;

/// A URL submitted to the pool for fetching
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Task(String);

impl Task {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Task {
    fn from(url: String) -> Self {
        Self(url)
    }
}

impl From<&str> for Task {
    fn from(url: &str) -> Self {
        Self(url.to_string())
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Short hex id of a batch, derived from its URLs. Only used in logs.
pub(crate) fn batch_id(tasks: &[Task]) -> String {
    let mut hasher = Sha256::new();
    for task in tasks {
        hasher.update(task.as_str().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(&hasher.finalize()[..6])
}

/// Outcome classification of one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultStatus {
    /// The fetch succeeded; the result carries a body
    Ok,

    /// Transport error or non-success HTTP status
    Fail,

    /// The fetch ended because the run was cancelled
    Cancelled,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Fail => "FAIL",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one task
///
/// The body, when present, belongs to whoever holds the result. Reading it
/// consumes it; dropping it releases the underlying connection.
#[derive(Debug)]
pub struct TaskResult {
    /// The task this result belongs to
    pub task: Task,

    /// Outcome classification
    pub status: ResultStatus,

    /// HTTP status code, when a response was received
    pub status_code: Option<u16>,

    /// Content-Type header value, when known
    pub content_type: Option<String>,

    /// Declared content length, when known
    pub content_length: Option<u64>,

    /// Unread response body, present only on `Ok`
    pub body: Option<Body>,
}

impl TaskResult {
    /// A successful fetch with an unread body
    pub fn ok(task: Task, status_code: u16, body: Body) -> Self {
        let content_length = body.len_hint();
        Self {
            task,
            status: ResultStatus::Ok,
            status_code: Some(status_code),
            content_type: None,
            content_length,
            body: Some(body),
        }
    }

    /// A failed fetch
    pub fn fail(task: Task, status_code: Option<u16>) -> Self {
        Self {
            task,
            status: ResultStatus::Fail,
            status_code,
            content_type: None,
            content_length: None,
            body: None,
        }
    }

    /// A fetch that ended because of cancellation
    pub fn cancelled(task: Task) -> Self {
        Self {
            task,
            status: ResultStatus::Cancelled,
            status_code: None,
            content_type: None,
            content_length: None,
            body: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }

    /// Returns true if the content type is unknown or looks like HTML
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(true, |ct| ct.contains("text/html") || ct.contains("xhtml"))
    }

    /// Takes ownership of the body, leaving `None` behind
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }
}

/// Response body handed from the task handler to the result consumer
pub struct Body {
    inner: BodyInner,
}

enum BodyInner {
    Http(reqwest::Response),
    Text(String),
}

impl Body {
    /// In-memory body, used by handlers that do not stream
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            inner: BodyInner::Text(text.into()),
        }
    }

    /// Streaming body backed by an HTTP response
    pub fn from_response(response: reqwest::Response) -> Self {
        Self {
            inner: BodyInner::Http(response),
        }
    }

    fn len_hint(&self) -> Option<u64> {
        match &self.inner {
            BodyInner::Http(response) => response.content_length(),
            BodyInner::Text(text) => Some(text.len() as u64),
        }
    }

    /// Reads the whole body as text, refusing bodies larger than `limit`
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub async fn read_to_string(self, limit: usize) -> Result<String, BodyError> {
        match self.inner {
            BodyInner::Text(text) => {
                if text.len() > limit {
                    return Err(BodyError::TooLarge { limit });
                }
                Ok(text)
            }
            BodyInner::Http(mut response) => {
                let mut buf = Vec::new();
                while let Some(chunk) = response.chunk().await? {
                    if buf.len() + chunk.len() > limit {
                        return Err(BodyError::TooLarge { limit });
                    }
                    buf.extend_from_slice(&chunk);
                }
                Ok(String::from_utf8_lossy(&buf).into_owned())
            }
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            BodyInner::Http(response) => f
                .debug_struct("Body")
                .field("url", &response.url().as_str())
                .finish_non_exhaustive(),
            BodyInner::Text(text) => f.debug_struct("Body").field("len", &text.len()).finish(),
        }
    }
}
