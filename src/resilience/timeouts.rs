//! Timeout enforcement and upstream failure classification.
//!
//! # Responsibilities
//! - Wrap backend calls with a hard deadline
//! - Classify failures as connection-refused, timeout or other
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; expiry drops the in-flight call
//! - Timeout errors are distinct from other errors in logs and metrics
//! - Classification never decides the status code on its own

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use serde::Serialize;

/// Why a backend produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    ConnectionRefused,
    Timeout,
    Other,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionRefused => "connection-refused",
            Self::Timeout => "timeout",
            Self::Other => "other",
        }
    }

    /// Walk an error's source chain looking for the underlying I/O cause.
    pub fn classify(err: &(dyn StdError + 'static)) -> Self {
        let mut current: Option<&(dyn StdError + 'static)> = Some(err);
        while let Some(e) = current {
            if let Some(io_err) = e.downcast_ref::<io::Error>() {
                return match io_err.kind() {
                    io::ErrorKind::ConnectionRefused => Self::ConnectionRefused,
                    io::ErrorKind::TimedOut => Self::Timeout,
                    _ => Self::Other,
                };
            }
            current = e.source();
        }
        Self::Other
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call that exceeded its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded(pub Duration);

impl fmt::Display for DeadlineExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no response within {}ms", self.0.as_millis())
    }
}

impl StdError for DeadlineExceeded {}

/// Run `fut` with a hard deadline.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| DeadlineExceeded(deadline))
}
