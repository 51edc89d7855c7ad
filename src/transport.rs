//! Transport seam between the writer and the HTTP stack.
//!
//! The writer drives exactly one [`Handle`] from its worker thread. Keeping
//! the interface minimal lets tests bring recording implementations while
//! production code uses [`CurlHandle`], which covers TCP, TLS and
//! Unix-domain sockets behind a single blocking handle.

use std::collections::HashMap;
use std::time::Duration;

use curl::easy::{Easy2, Handler, List, WriteError};

/// Connection parameters the writer applies before performing requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleOption {
    /// Full request URL, scheme included.
    Url,
    /// Path of a Unix-domain socket to connect through instead of TCP.
    UnixSocketPath,
    /// Whole-request timeout in milliseconds.
    TimeoutMs,
}

/// Error reported by a transport handle.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{summary}")]
pub struct TransportError {
    /// Short classification of the failure, e.g. "Timeout was reached".
    pub summary: String,
    /// Library-level detail, empty when the transport gave none.
    pub detail: String,
}

impl TransportError {
    pub fn new(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        TransportError {
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

/// A minimal interface necessary to ship encoded trace batches over HTTP.
///
/// Option, header and body setters stage state for the next [`perform`];
/// `set_headers` replaces the whole outbound header set rather than
/// appending to it. The response accessors read the outcome of the most
/// recent `perform`.
///
/// [`perform`]: Handle::perform
pub trait Handle: Send {
    fn set_option(&mut self, option: HandleOption, value: &str) -> Result<(), TransportError>;
    /// Replaces the entire outbound header set.
    fn set_headers(&mut self, headers: HashMap<&'static str, String>)
        -> Result<(), TransportError>;
    /// Replaces the request body.
    fn set_body(&mut self, body: Vec<u8>) -> Result<(), TransportError>;
    /// Performs the staged request synchronously.
    fn perform(&mut self) -> Result<(), TransportError>;
    /// HTTP status of the last response, `0` when none was received.
    fn response_status(&mut self) -> u32;
    /// Body of the last response.
    fn response_body(&mut self) -> String;
}

struct Collector(Vec<u8>);

impl Handler for Collector {
    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.0.extend_from_slice(data);
        Ok(data.len())
    }
}

/// The production [`Handle`], backed by libcurl.
pub struct CurlHandle {
    easy: Easy2<Collector>,
}

impl CurlHandle {
    pub fn new() -> Self {
        CurlHandle {
            easy: Easy2::new(Collector(Vec::new())),
        }
    }
}

impl Default for CurlHandle {
    fn default() -> Self {
        Self::new()
    }
}

fn curl_error(err: curl::Error) -> TransportError {
    TransportError::new(
        err.description().to_string(),
        err.extra_description().unwrap_or("").to_string(),
    )
}

impl Handle for CurlHandle {
    fn set_option(&mut self, option: HandleOption, value: &str) -> Result<(), TransportError> {
        match option {
            HandleOption::Url => self.easy.url(value),
            HandleOption::UnixSocketPath => self.easy.unix_socket(value),
            HandleOption::TimeoutMs => {
                let millis: u64 = value
                    .parse()
                    .map_err(|_| TransportError::new("invalid timeout", value))?;
                self.easy.timeout(Duration::from_millis(millis))
            }
        }
        .map_err(curl_error)
    }

    fn set_headers(
        &mut self,
        headers: HashMap<&'static str, String>,
    ) -> Result<(), TransportError> {
        let mut list = List::new();
        for (name, value) in &headers {
            list.append(&format!("{name}: {value}")).map_err(curl_error)?;
        }
        // http_headers replaces any previously installed list.
        self.easy.http_headers(list).map_err(curl_error)
    }

    fn set_body(&mut self, body: Vec<u8>) -> Result<(), TransportError> {
        self.easy.post(true).map_err(curl_error)?;
        self.easy.post_fields_copy(&body).map_err(curl_error)
    }

    fn perform(&mut self) -> Result<(), TransportError> {
        self.easy.get_mut().0.clear();
        self.easy.perform().map_err(curl_error)
    }

    fn response_status(&mut self) -> u32 {
        self.easy.response_code().unwrap_or(0)
    }

    fn response_body(&mut self) -> String {
        String::from_utf8_lossy(&self.easy.get_ref().0).into_owned()
    }
}
