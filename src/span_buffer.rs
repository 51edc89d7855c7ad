//! Trace assembly: groups in-flight spans by trace id and releases each
//! trace once every registered span has finished.
//!
//! The buffer is the hand-off point between application threads finishing
//! spans and the writer shipping whole traces. It never fails an operation;
//! spans that cannot be attributed to a live trace are logged and dropped.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::logger::{LogLevel, Logger};
use crate::span::{SpanContext, SpanData, TraceData};

/// Receives each trace the moment its last registered span finishes.
///
/// Called while the buffer lock is held; implementations must not call back
/// into the buffer.
pub trait TraceSink: Send + Sync {
    fn write_trace(&self, trace: TraceData);
}

#[derive(Debug, Default)]
struct PendingTrace {
    /// Span ids registered but not yet finished.
    registered: HashSet<u64>,
    /// Completed spans awaiting release, in finish order.
    finished: Vec<SpanData>,
}

/// Thread-safe registry of partially finished traces.
///
/// A trace entry is created by the first [`register_span`] for its id and
/// removed the moment the last registered span finishes, at which point the
/// collected spans are emitted to the sink as one trace. Registrations that
/// arrive after a release start a fresh trace under the same id.
///
/// [`register_span`]: SpanBuffer::register_span
pub struct SpanBuffer {
    traces: Mutex<HashMap<u64, PendingTrace>>,
    sink: Arc<dyn TraceSink>,
    logger: Arc<dyn Logger>,
}

impl SpanBuffer {
    pub fn new(sink: Arc<dyn TraceSink>, logger: Arc<dyn Logger>) -> Self {
        SpanBuffer {
            traces: Mutex::new(HashMap::new()),
            sink,
            logger,
        }
    }

    /// Declares that the span identified by `context` is in flight.
    ///
    /// The trace under `context.trace_id` is held open until this span (and
    /// every other registered span of the trace) has been finished.
    pub fn register_span(&self, context: &SpanContext) {
        let mut traces = self.traces.lock().expect("span buffer lock poisoned");
        traces
            .entry(context.trace_id)
            .or_default()
            .registered
            .insert(context.span_id);
    }

    /// Deposits a finished span.
    ///
    /// If the span was the last registered one of its trace, the trace is
    /// removed and handed to the sink. A span whose trace or span id was
    /// never registered is logged and dropped; the rest of the trace keeps
    /// gating release as before.
    pub fn finish_span(&self, span: SpanData) {
        let mut traces = self.traces.lock().expect("span buffer lock poisoned");
        let trace_id = span.trace_id;

        let Some(pending) = traces.get_mut(&trace_id) else {
            self.logger.log(
                LogLevel::Error,
                &format!(
                    "Dropping finished span {} : no trace {} is in flight",
                    span.span_id, trace_id
                ),
            );
            return;
        };

        if !pending.registered.remove(&span.span_id) {
            self.logger.log(
                LogLevel::Error,
                &format!(
                    "Dropping finished span {} : it was never registered under trace {}",
                    span.span_id, trace_id
                ),
            );
            return;
        }

        pending.finished.push(span);

        if pending.registered.is_empty() {
            if let Some(pending) = traces.remove(&trace_id) {
                self.sink.write_trace(pending.finished);
            }
        }
    }
}
