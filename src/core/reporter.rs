//! External error reporting
//!
//! An [`ErrorReporter`] forwards errors to an issue tracker and returns the
//! event id it was filed under. The error channel appends a link to the
//! tracker's issue search for that id to the logged line.

use super::error::Result;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How long the error channel waits for a reporter to flush each event.
pub const REPORT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

const DEFAULT_ISSUE_HOST: &str = "https://sentry.io/organizations";

pub trait ErrorReporter: Send + Sync {
    /// Connect to the tracker behind `dsn`.
    fn init(&self, dsn: &str) -> Result<()>;

    /// File `err`, returning the event id.
    fn capture(&self, err: &(dyn Error + 'static)) -> String;

    /// Wait for queued events. Returns `false` on timeout.
    fn flush(&self, _timeout: Duration) -> bool {
        true
    }
}

/// An initialised reporter with the coordinates of its issue search.
#[derive(Clone)]
pub struct ReporterLink {
    reporter: Arc<dyn ErrorReporter>,
    dsn: String,
    org: String,
}

impl ReporterLink {
    /// Initialise `reporter` against `dsn`.
    pub fn connect(reporter: Arc<dyn ErrorReporter>, dsn: &str, org: &str) -> Result<Self> {
        reporter.init(dsn)?;
        Ok(Self {
            reporter,
            dsn: dsn.to_string(),
            org: org.to_string(),
        })
    }

    /// Capture `err` and return the ` <issue url>` suffix for the log line.
    pub fn report(&self, err: &(dyn Error + 'static)) -> String {
        let id = self.reporter.capture(err);
        if !self.reporter.flush(REPORT_FLUSH_TIMEOUT) {
            eprintln!("[LOGGER WARNING] Error reporter did not flush within {:?}", REPORT_FLUSH_TIMEOUT);
        }
        format!(" {}", self.issue_url(&id))
    }

    pub fn issue_url(&self, id: &str) -> String {
        if self.dsn.is_empty() {
            format!("{}/{}/?query={}", DEFAULT_ISSUE_HOST, self.org, id)
        } else {
            format!("{}/{}/?query={}", self.dsn.trim_end_matches('/'), self.org, id)
        }
    }

    pub fn flush(&self, timeout: Duration) -> bool {
        self.reporter.flush(timeout)
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn org(&self) -> &str {
        &self.org
    }
}

impl fmt::Debug for ReporterLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterLink")
            .field("dsn", &self.dsn)
            .field("org", &self.org)
            .finish()
    }
}
