//! Recording fakes shared by the unit tests.
//!
//! Everything here follows the in-memory recorder shape: state behind an
//! `Arc<Mutex<_>>` so a test can keep inspecting a collaborator after
//! handing ownership of it to the code under test.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

use crate::logger::{LogLevel, Logger};
use crate::sampler::Sampler;
use crate::span::{SpanContext, SpanData, TraceData};
use crate::span_buffer::TraceSink;
use crate::transport::{Handle, HandleOption, TransportError};

#[allow(clippy::too_many_arguments)]
pub(crate) fn make_span(
    span_type: &str,
    service: &str,
    resource: &str,
    name: &str,
    trace_id: u64,
    span_id: u64,
    parent_id: u64,
    start: i64,
    duration: i64,
    error: i32,
) -> SpanData {
    SpanData {
        trace_id,
        span_id,
        parent_id,
        service: service.to_string(),
        name: name.to_string(),
        resource: resource.to_string(),
        span_type: span_type.to_string(),
        start,
        duration,
        error,
        meta: HashMap::new(),
    }
}

pub(crate) fn make_trace(spans: &[SpanData]) -> TraceData {
    spans.to_vec()
}

pub(crate) fn context_for(span: &SpanData) -> SpanContext {
    SpanContext::new(span.trace_id, span.span_id)
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}

/// A [`Logger`] that records every diagnostic.
#[derive(Clone, Default)]
pub(crate) struct MockLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MockLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn last_message(&self) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .last()
            .map(|record| record.message.clone())
    }
}

impl Logger for MockLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.records.lock().unwrap().push(LogRecord {
            level,
            message: message.to_string(),
        });
    }
}

/// A [`Sampler`] that records the most recent configuration.
#[derive(Clone, Default)]
pub(crate) struct MockSampler {
    config: Arc<Mutex<String>>,
}

impl MockSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> String {
        self.config.lock().unwrap().clone()
    }
}

impl Sampler for MockSampler {
    fn configure(&self, rates_json: &str) {
        *self.config.lock().unwrap() = rates_json.to_string();
    }
}

/// A [`TraceSink`] that collects released traces.
#[derive(Clone, Default)]
pub(crate) struct InMemoryTraceSink {
    traces: Arc<Mutex<Vec<TraceData>>>,
}

impl InMemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn traces(&self) -> Vec<TraceData> {
        self.traces.lock().unwrap().clone()
    }

    pub fn trace_count(&self) -> usize {
        self.traces.lock().unwrap().len()
    }
}

impl TraceSink for InMemoryTraceSink {
    fn write_trace(&self, trace: TraceData) {
        self.traces.lock().unwrap().push(trace);
    }
}

/// Observable state of a [`MockHandle`], shared with the owning test.
pub(crate) struct MockHandleState {
    /// Options applied by the writer, by kind.
    pub options: HashMap<HandleOption, String>,
    /// The current header set; replaced wholesale by `set_headers`.
    pub headers: HashMap<&'static str, String>,
    /// The staged request body.
    pub body: Vec<u8>,
    /// Every trace decoded from successfully performed request bodies.
    pub traces: Vec<TraceData>,
    /// Body returned for performed requests.
    pub response: String,
    /// Status returned for performed requests; `0` means no status.
    pub response_status: u32,
    /// Scripted outcomes for successive `perform` calls; the last entry
    /// repeats once the script runs out, and an empty script means success.
    pub perform_results: Vec<Result<(), TransportError>>,
    pub perform_calls: usize,
    pub set_option_error: Option<TransportError>,
    pub set_headers_error: Option<TransportError>,
    pub set_body_error: Option<TransportError>,
    /// Set when the handle instance is dropped.
    pub destructed: bool,
}

impl Default for MockHandleState {
    fn default() -> Self {
        MockHandleState {
            options: HashMap::new(),
            headers: HashMap::new(),
            body: Vec::new(),
            traces: Vec::new(),
            response: String::new(),
            response_status: 200,
            perform_results: Vec::new(),
            perform_calls: 0,
            set_option_error: None,
            set_headers_error: None,
            set_body_error: None,
            destructed: false,
        }
    }
}

/// A scripted [`Handle`] that records everything the writer does to it.
pub(crate) struct MockHandle {
    state: Arc<Mutex<MockHandleState>>,
}

impl MockHandle {
    /// Returns the handle together with its shared state, which the test
    /// keeps after the writer takes ownership of the handle itself.
    pub fn new() -> (Self, Arc<Mutex<MockHandleState>>) {
        let state = Arc::new(Mutex::new(MockHandleState::default()));
        (
            MockHandle {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.destructed = true;
        }
    }
}

impl Handle for MockHandle {
    fn set_option(&mut self, option: HandleOption, value: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.set_option_error.clone() {
            return Err(err);
        }
        state.options.insert(option, value.to_string());
        Ok(())
    }

    fn set_headers(
        &mut self,
        headers: HashMap<&'static str, String>,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.set_headers_error.clone() {
            return Err(err);
        }
        state.headers = headers;
        Ok(())
    }

    fn set_body(&mut self, body: Vec<u8>) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.set_body_error.clone() {
            return Err(err);
        }
        state.body = body;
        Ok(())
    }

    fn perform(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.perform_calls += 1;
        let result = if state.perform_results.is_empty() {
            Ok(())
        } else {
            let index = (state.perform_calls - 1).min(state.perform_results.len() - 1);
            state.perform_results[index].clone()
        };
        if result.is_ok() {
            let decoded = decode_traces(&state.body);
            state.traces.extend(decoded);
        }
        result
    }

    fn response_status(&mut self) -> u32 {
        self.state.lock().unwrap().response_status
    }

    fn response_body(&mut self) -> String {
        self.state.lock().unwrap().response.clone()
    }
}

fn read_string<R: Read>(rd: &mut R) -> String {
    let len = rmp::decode::read_str_len(rd).expect("string length") as usize;
    let mut buf = vec![0u8; len];
    rd.read_exact(&mut buf).expect("string bytes");
    String::from_utf8(buf).expect("utf-8 string")
}

/// Decodes a request body produced by [`model::encode`](crate::model::encode)
/// back into traces.
pub(crate) fn decode_traces(body: &[u8]) -> Vec<TraceData> {
    let mut rd = std::io::Cursor::new(body);
    let trace_count = rmp::decode::read_array_len(&mut rd).expect("trace array");
    let mut traces = Vec::with_capacity(trace_count as usize);

    for _ in 0..trace_count {
        let span_count = rmp::decode::read_array_len(&mut rd).expect("span array");
        let mut trace = Vec::with_capacity(span_count as usize);

        for _ in 0..span_count {
            let field_count = rmp::decode::read_map_len(&mut rd).expect("span map");
            let mut span = SpanData::default();
            for _ in 0..field_count {
                let field = read_string(&mut rd);
                match field.as_str() {
                    "type" => span.span_type = read_string(&mut rd),
                    "service" => span.service = read_string(&mut rd),
                    "name" => span.name = read_string(&mut rd),
                    "resource" => span.resource = read_string(&mut rd),
                    "trace_id" => span.trace_id = rmp::decode::read_u64(&mut rd).expect("trace_id"),
                    "span_id" => span.span_id = rmp::decode::read_u64(&mut rd).expect("span_id"),
                    "parent_id" => {
                        span.parent_id = rmp::decode::read_u64(&mut rd).expect("parent_id")
                    }
                    "start" => span.start = rmp::decode::read_i64(&mut rd).expect("start"),
                    "duration" => span.duration = rmp::decode::read_i64(&mut rd).expect("duration"),
                    "error" => span.error = rmp::decode::read_i32(&mut rd).expect("error"),
                    "meta" => {
                        let entries = rmp::decode::read_map_len(&mut rd).expect("meta map");
                        for _ in 0..entries {
                            let key = read_string(&mut rd);
                            let value = read_string(&mut rd);
                            span.meta.insert(key, value);
                        }
                    }
                    unknown => panic!("unexpected span field {unknown:?}"),
                }
            }
            trace.push(span);
        }
        traces.push(trace);
    }

    traces
}
