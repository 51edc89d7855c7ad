//! Client-side core of a Datadog APM tracer.
//!
//! This crate contains the machinery a tracing front end needs between
//! "a span finished" and "the agent received the trace":
//!
//! * [`SpanBuffer`] groups finished spans by trace id and releases each
//!   trace the moment its last registered span completes.
//! * [`AgentWriter`] queues released traces, encodes batches as MessagePack
//!   and POSTs them to the agent's `/v0.4/traces` endpoint from a background
//!   worker, with bounded retry and backpressure by dropping.
//! * [`glob_match`] is the tag-matching primitive used by sampling rules.
//!
//! Span creation, context propagation and rule evaluation live outside this
//! crate and connect through the [`TraceSink`], [`Sampler`] and [`Logger`]
//! traits. Every runtime failure past construction is logged and absorbed,
//! so embedding the tracer never destabilizes the host application.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use datadog_tracer::{
//!     AgentWriter, CurlHandle, NoopSampler, SpanBuffer, SpanContext, SpanData, TracingLogger,
//!     WriterConfig,
//! };
//!
//! # fn main() -> Result<(), datadog_tracer::Error> {
//! let logger = Arc::new(TracingLogger);
//! let writer = Arc::new(AgentWriter::new(
//!     CurlHandle::new(),
//!     WriterConfig::default().with_host("localhost").with_port(8126),
//!     Arc::new(NoopSampler),
//!     logger.clone(),
//! )?);
//! let buffer = SpanBuffer::new(writer.clone(), logger);
//!
//! buffer.register_span(&SpanContext::new(1, 1));
//! buffer.finish_span(SpanData {
//!     trace_id: 1,
//!     span_id: 1,
//!     service: "billing".into(),
//!     name: "charge".into(),
//!     ..SpanData::default()
//! });
//!
//! writer.flush(Duration::from_millis(500));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod glob;
pub mod logger;
pub mod model;
pub mod sampler;
pub mod span;
pub mod span_buffer;
pub mod transport;
pub mod version;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use error::Error;
pub use glob::glob_match;
pub use logger::{LogLevel, Logger, TracingLogger};
pub use sampler::{NoopSampler, Sampler};
pub use span::{SpanContext, SpanData, TraceData};
pub use span_buffer::{SpanBuffer, TraceSink};
pub use transport::{CurlHandle, Handle, HandleOption, TransportError};
pub use writer::{AgentWriter, WriterConfig, DEFAULT_MAX_QUEUED_TRACES};
