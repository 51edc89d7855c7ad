//! Background shipping of trace batches to the local trace agent.
//!
//! [`AgentWriter`] accepts traces from any thread, bounds memory by dropping
//! when its queue is full, and ships batches from a single worker thread:
//! encode as MessagePack, POST to the agent, retry on transport failure,
//! and feed the sampling rates of successful responses back to the sampler.
//!
//! Delivery is best effort. Batches that exhaust their retries are logged
//! and dropped; the writer is not a source of truth for delivery.

use std::collections::HashMap;
use std::mem;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::error::Error;
use crate::logger::{LogLevel, Logger};
use crate::model;
use crate::sampler::Sampler;
use crate::span::TraceData;
use crate::span_buffer::TraceSink;
use crate::transport::{Handle, HandleOption};
use crate::version;

/// Path every batch is POSTed to on the agent.
const AGENT_TRACES_PATH: &str = "/v0.4/traces";
/// Whole-request timeout applied to the transport handle, in milliseconds.
const REQUEST_TIMEOUT_MS: u64 = 2_000;
/// Bytes of response body quoted on either side of a JSON parse error.
const PARSE_CONTEXT_BYTES: usize = 45;
/// Queue capacity used when none is configured.
pub const DEFAULT_MAX_QUEUED_TRACES: usize = 100;

const LOCK_POISONED: &str = "agent writer lock poisoned";

/// Connection and batching parameters for [`AgentWriter`].
///
/// The default configuration targets an agent on `localhost:8126`, flushes
/// once per second, holds at most [`DEFAULT_MAX_QUEUED_TRACES`] traces and
/// does not retry failed sends.
#[derive(Clone, Debug)]
pub struct WriterConfig {
    /// Interval between periodic writes by the worker.
    pub flush_interval: Duration,
    /// Queue capacity; traces written while the queue is full are dropped.
    pub max_queued_traces: usize,
    /// Delays between successive retries of a failed send. The number of
    /// attempts per batch is one more than the length of this schedule.
    pub retry_periods: Vec<Duration>,
    /// Agent host, used unless `agent_url` carries its own authority.
    pub host: String,
    /// Agent port, used unless `agent_url` carries its own authority.
    pub port: u16,
    /// Optional endpoint override: `http://host:port`, `https://host:port`,
    /// `unix:///path`, or a bare absolute socket path.
    pub agent_url: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            flush_interval: Duration::from_secs(1),
            max_queued_traces: DEFAULT_MAX_QUEUED_TRACES,
            retry_periods: Vec::new(),
            host: "localhost".to_string(),
            port: 8126,
            agent_url: String::new(),
        }
    }
}

impl WriterConfig {
    /// Set the interval between periodic writes.
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Set the queue capacity.
    pub fn with_max_queued_traces(mut self, max_queued_traces: usize) -> Self {
        self.max_queued_traces = max_queued_traces;
        self
    }

    /// Set the retry schedule for failed sends.
    pub fn with_retry_periods(mut self, retry_periods: Vec<Duration>) -> Self {
        self.retry_periods = retry_periods;
        self
    }

    /// Set the agent host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the agent port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the endpoint override.
    pub fn with_agent_url(mut self, agent_url: impl Into<String>) -> Self {
        self.agent_url = agent_url.into();
        self
    }
}

/// Endpoint derived from host, port and the optional URL override.
#[derive(Debug, PartialEq, Eq)]
struct Endpoint {
    url: String,
    unix_socket: Option<String>,
}

fn resolve_endpoint(host: &str, port: u16, agent_url: &str) -> Result<Endpoint, Error> {
    if agent_url.is_empty() {
        Ok(Endpoint {
            url: format!("http://{host}:{port}{AGENT_TRACES_PATH}"),
            unix_socket: None,
        })
    } else if agent_url.starts_with("http://") || agent_url.starts_with("https://") {
        Ok(Endpoint {
            url: format!("{agent_url}{AGENT_TRACES_PATH}"),
            unix_socket: None,
        })
    } else if let Some(path) = agent_url.strip_prefix("unix://") {
        Ok(Endpoint {
            url: format!("http://{host}:{port}{AGENT_TRACES_PATH}"),
            unix_socket: Some(path.to_string()),
        })
    } else if agent_url.starts_with('/') {
        Ok(Endpoint {
            url: format!("http://{host}:{port}{AGENT_TRACES_PATH}"),
            unix_socket: Some(agent_url.to_string()),
        })
    } else {
        Err(Error::UnsupportedScheme(agent_url.to_string()))
    }
}

struct Inner {
    queue: Vec<TraceData>,
    running: bool,
    flush_requested: bool,
}

struct Shared {
    inner: Mutex<Inner>,
    /// Wakes the worker: flush requests, stop, retry interruption.
    work_cv: Condvar,
    /// Wakes `flush` callers once the worker completes a cycle.
    done_cv: Condvar,
}

/// Ships traces to the agent from a dedicated worker thread.
///
/// Construction configures the transport handle (the URL, timeout and
/// socket options double as a validation probe) and hands its sole
/// ownership to the worker. [`write`](AgentWriter::write) never blocks on
/// I/O; [`flush`](AgentWriter::flush) waits at most its timeout; after
/// [`stop`](AgentWriter::stop) both become no-ops.
pub struct AgentWriter {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    max_queued_traces: usize,
}

impl AgentWriter {
    /// Creates the writer and starts its worker thread.
    ///
    /// Fails when the URL override has an unsupported scheme or when the
    /// transport handle rejects its initial configuration.
    pub fn new<H: Handle + 'static>(
        mut handle: H,
        config: WriterConfig,
        sampler: Arc<dyn Sampler>,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, Error> {
        let endpoint = resolve_endpoint(&config.host, config.port, &config.agent_url)?;
        handle.set_option(HandleOption::Url, &endpoint.url)?;
        handle.set_option(HandleOption::TimeoutMs, &REQUEST_TIMEOUT_MS.to_string())?;
        if let Some(path) = &endpoint.unix_socket {
            handle.set_option(HandleOption::UnixSocketPath, path)?;
        }

        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                queue: Vec::new(),
                running: true,
                flush_requested: false,
            }),
            work_cv: Condvar::new(),
            done_cv: Condvar::new(),
        });

        let worker = Worker {
            shared: Arc::clone(&shared),
            handle,
            flush_interval: config.flush_interval,
            retry_periods: config.retry_periods,
            sampler,
            logger,
        };
        let join = thread::Builder::new()
            .name("datadog-agent-writer".to_string())
            .spawn(move || worker.run())?;

        Ok(AgentWriter {
            shared,
            worker: Mutex::new(Some(join)),
            max_queued_traces: config.max_queued_traces,
        })
    }

    /// Queues a trace for the next write.
    ///
    /// Drops the trace silently when the queue is at capacity. A no-op after
    /// [`stop`](AgentWriter::stop).
    pub fn write(&self, trace: TraceData) {
        let mut inner = self.shared.inner.lock().expect(LOCK_POISONED);
        if !inner.running {
            return;
        }
        if inner.queue.len() >= self.max_queued_traces {
            return;
        }
        inner.queue.push(trace);
    }

    /// Asks the worker to write out the queue now and waits for it to
    /// complete a cycle, at most `timeout`.
    ///
    /// Returns within `timeout` even while the worker sits out a long retry
    /// backoff. A no-op after [`stop`](AgentWriter::stop).
    pub fn flush(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let mut inner = self.shared.inner.lock().expect(LOCK_POISONED);
        if !inner.running {
            return;
        }
        inner.flush_requested = true;
        self.shared.work_cv.notify_all();

        while inner.flush_requested && inner.running {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _) = self
                .shared
                .done_cv
                .wait_timeout(inner, deadline - now)
                .expect(LOCK_POISONED);
            inner = guard;
        }
    }

    /// Stops the worker and joins it. Queued traces are discarded without
    /// further sends; the worker drops the transport handle before exiting.
    ///
    /// Idempotent; also invoked on drop.
    pub fn stop(&self) {
        {
            let mut inner = self.shared.inner.lock().expect(LOCK_POISONED);
            inner.running = false;
            self.shared.work_cv.notify_all();
            self.shared.done_cv.notify_all();
        }
        let join = self.worker.lock().expect(LOCK_POISONED).take();
        if let Some(join) = join {
            let _ = join.join();
        }
    }
}

impl Drop for AgentWriter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl TraceSink for AgentWriter {
    fn write_trace(&self, trace: TraceData) {
        self.write(trace);
    }
}

struct Worker<H: Handle> {
    shared: Arc<Shared>,
    handle: H,
    flush_interval: Duration,
    retry_periods: Vec<Duration>,
    sampler: Arc<dyn Sampler>,
    logger: Arc<dyn Logger>,
}

impl<H: Handle> Worker<H> {
    fn run(mut self) {
        loop {
            let batch = {
                let mut inner = self.shared.inner.lock().expect(LOCK_POISONED);
                while inner.running && inner.queue.is_empty() && !inner.flush_requested {
                    let (guard, wait) = self
                        .shared
                        .work_cv
                        .wait_timeout(inner, self.flush_interval)
                        .expect(LOCK_POISONED);
                    inner = guard;
                    if wait.timed_out() {
                        break;
                    }
                }
                if !inner.running {
                    return;
                }
                mem::take(&mut inner.queue)
            };

            if !batch.is_empty() {
                self.send_batch(&batch);
            }

            let mut inner = self.shared.inner.lock().expect(LOCK_POISONED);
            if inner.flush_requested {
                inner.flush_requested = false;
                self.shared.done_cv.notify_all();
            }
            if !inner.running {
                return;
            }
        }
    }

    fn send_batch(&mut self, batch: &[TraceData]) {
        let body = match model::encode(batch) {
            Ok(body) => body,
            Err(err) => {
                self.logger
                    .log(LogLevel::Error, &format!("Error encoding trace batch: {err}"));
                return;
            }
        };

        let mut headers = HashMap::new();
        headers.insert("Content-Type", "application/msgpack".to_string());
        headers.insert("Datadog-Meta-Lang", version::LANG.to_string());
        headers.insert("Datadog-Meta-Tracer-Version", version::TRACER_VERSION.to_string());
        headers.insert("Datadog-Meta-Lang-Version", version::LANG_VERSION.to_string());
        headers.insert("X-Datadog-Trace-Count", batch.len().to_string());
        if let Err(err) = self.handle.set_headers(headers) {
            self.logger.log(
                LogLevel::Error,
                &format!("Error setting trace request headers: {}", err.summary),
            );
            return;
        }
        if let Err(err) = self.handle.set_body(body) {
            self.logger.log(
                LogLevel::Error,
                &format!("Error setting trace request body: {}", err.summary),
            );
            return;
        }

        let mut attempt = 0;
        loop {
            match self.handle.perform() {
                Ok(()) => {
                    self.handle_response();
                    return;
                }
                Err(err) => {
                    if attempt == self.retry_periods.len() {
                        self.logger.log(
                            LogLevel::Error,
                            &format!(
                                "Error sending traces to agent: {}\n{}",
                                err.summary, err.detail
                            ),
                        );
                        return;
                    }
                    let backoff = self.retry_periods[attempt];
                    attempt += 1;
                    if !self.wait_before_retry(backoff) {
                        return;
                    }
                }
            }
        }
    }

    /// Sleeps for `period` while staying responsive to `stop`. Returns
    /// whether the writer is still running.
    fn wait_before_retry(&self, period: Duration) -> bool {
        let deadline = Instant::now() + period;
        let mut inner = self.shared.inner.lock().expect(LOCK_POISONED);
        loop {
            if !inner.running {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let (guard, _) = self
                .shared
                .work_cv
                .wait_timeout(inner, deadline - now)
                .expect(LOCK_POISONED);
            inner = guard;
        }
    }

    fn handle_response(&mut self) {
        let status = self.handle.response_status();
        if status == 0 {
            self.logger.log(
                LogLevel::Error,
                "Agent returned a response without an HTTP status",
            );
            return;
        }
        if status != 200 {
            self.logger.log(
                LogLevel::Error,
                &format!("Unexpected HTTP status {status} in response from trace agent"),
            );
            return;
        }

        let response = self.handle.response_body();
        if response.is_empty() {
            self.logger
                .log(LogLevel::Error, "Agent returned a response without a body");
            return;
        }

        let parsed: Value = match serde_json::from_str(&response) {
            Ok(parsed) => parsed,
            Err(err) => {
                self.logger
                    .log(LogLevel::Error, &parse_error_message(&err, &response));
                return;
            }
        };
        match parsed.get("rate_by_service") {
            Some(rates) if rates.is_object() => match serde_json::to_string(rates) {
                Ok(rates_json) => self.sampler.configure(&rates_json),
                Err(err) => self.logger.log(
                    LogLevel::Error,
                    &format!("Unable to serialize sampling rates from agent: {err}"),
                ),
            },
            _ => self.logger.log(
                LogLevel::Error,
                "Agent response is missing the rate_by_service map",
            ),
        }
    }
}

/// Diagnostic for an unparseable agent response, quoting a bounded window
/// of the body around the position the parser reported.
fn parse_error_message(err: &serde_json::Error, body: &str) -> String {
    let bytes = body.as_bytes();
    let at = err.column().saturating_sub(1).min(bytes.len());
    let start = at.saturating_sub(PARSE_CONTEXT_BYTES);
    let end = (at + PARSE_CONTEXT_BYTES).min(bytes.len());

    let mut near = String::new();
    if start > 0 {
        near.push_str("...");
    }
    near.push_str(&String::from_utf8_lossy(&bytes[start..end]));
    if end < bytes.len() {
        near.push_str("...");
    }

    format!("Unable to parse response from agent.\nError was: {err}\nError near: {near}")
}
