//! MessagePack encoding of trace batches for the agent's `/v0.4/traces`
//! endpoint.
//!
//! The wire format is an array of traces, each trace an array of span maps
//! keyed by the span field names. Integer ids are written as unsigned
//! 64-bit values, timestamps and durations as signed 64-bit values.

use crate::error::Error;
use crate::span::TraceData;

/// Encodes a batch of traces into a request body.
pub fn encode(traces: &[TraceData]) -> Result<Vec<u8>, Error> {
    let mut encoded = Vec::new();
    rmp::encode::write_array_len(&mut encoded, traces.len() as u32)?;

    for trace in traces {
        rmp::encode::write_array_len(&mut encoded, trace.len() as u32)?;

        for span in trace {
            rmp::encode::write_map_len(&mut encoded, 11)?;

            rmp::encode::write_str(&mut encoded, "type")?;
            rmp::encode::write_str(&mut encoded, &span.span_type)?;

            rmp::encode::write_str(&mut encoded, "service")?;
            rmp::encode::write_str(&mut encoded, &span.service)?;

            rmp::encode::write_str(&mut encoded, "name")?;
            rmp::encode::write_str(&mut encoded, &span.name)?;

            rmp::encode::write_str(&mut encoded, "resource")?;
            rmp::encode::write_str(&mut encoded, &span.resource)?;

            rmp::encode::write_str(&mut encoded, "trace_id")?;
            rmp::encode::write_u64(&mut encoded, span.trace_id)?;

            rmp::encode::write_str(&mut encoded, "span_id")?;
            rmp::encode::write_u64(&mut encoded, span.span_id)?;

            rmp::encode::write_str(&mut encoded, "parent_id")?;
            rmp::encode::write_u64(&mut encoded, span.parent_id)?;

            rmp::encode::write_str(&mut encoded, "start")?;
            rmp::encode::write_i64(&mut encoded, span.start)?;

            rmp::encode::write_str(&mut encoded, "duration")?;
            rmp::encode::write_i64(&mut encoded, span.duration)?;

            rmp::encode::write_str(&mut encoded, "error")?;
            rmp::encode::write_i32(&mut encoded, span.error)?;

            rmp::encode::write_str(&mut encoded, "meta")?;
            rmp::encode::write_map_len(&mut encoded, span.meta.len() as u32)?;
            for (key, value) in &span.meta {
                rmp::encode::write_str(&mut encoded, key)?;
                rmp::encode::write_str(&mut encoded, value)?;
            }
        }
    }

    Ok(encoded)
}
