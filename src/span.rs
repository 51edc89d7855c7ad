use std::collections::HashMap;

/// A completed unit of work within a trace.
///
/// Spans are created and populated by the tracing front end; once finished
/// they are handed to the [`SpanBuffer`](crate::span_buffer::SpanBuffer),
/// which owns them until the whole trace is released to the writer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpanData {
    /// Identifier shared by every span of one distributed operation.
    pub trace_id: u64,
    /// Identifier of this span, unique within the process for the life of
    /// the trace.
    pub span_id: u64,
    /// Identifier of the parent span, `0` for a root span.
    pub parent_id: u64,
    /// Name of the service that produced the span.
    pub service: String,
    /// Operation name.
    pub name: String,
    /// Resource being operated on, e.g. an endpoint or a query.
    pub resource: String,
    /// Datadog span type, e.g. `web`, `db`, `custom`.
    pub span_type: String,
    /// Start timestamp in nanoseconds since the epoch.
    pub start: i64,
    /// Duration in nanoseconds.
    pub duration: i64,
    /// `1` if the span carries an error, `0` otherwise.
    pub error: i32,
    /// String tags attached to the span.
    pub meta: HashMap<String, String>,
}

/// The handle an application carries while a span is open.
///
/// A context is enough to register the span against the buffer before the
/// span itself has finished. Multiple contexts may share a `trace_id`.
#[derive(Clone, Debug, Default)]
pub struct SpanContext {
    /// Trace the span belongs to.
    pub trace_id: u64,
    /// Span being registered.
    pub span_id: u64,
    /// Opaque baggage propagated alongside the context.
    pub baggage: HashMap<String, String>,
}

impl SpanContext {
    /// Context for a span with no baggage.
    pub fn new(trace_id: u64, span_id: u64) -> Self {
        SpanContext {
            trace_id,
            span_id,
            baggage: HashMap::new(),
        }
    }
}

/// All completed spans of one trace, as handed to the writer.
///
/// Span order within a trace is not part of the contract.
pub type TraceData = Vec<SpanData>;
