//! Sampler seam fed by the agent's responses.
//!
//! Rule evaluation lives outside this crate; the writer only needs a place
//! to deliver the per-service rates each successful agent response carries.
//! Rules match tag values with [`glob_match`](crate::glob::glob_match).

/// Receives per-service sampling rates reported by the agent.
///
/// `rates_json` is a compact JSON object mapping `service:NAME,env:ENV`
/// keys to sampling rates in `[0.0, 1.0]`, exactly as extracted from the
/// agent's `rate_by_service` response field.
///
/// Implementations must be safe for concurrent calls from the writer's
/// worker thread.
pub trait Sampler: Send + Sync {
    fn configure(&self, rates_json: &str);
}

/// A [`Sampler`] that ignores rate updates.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSampler;

impl Sampler for NoopSampler {
    fn configure(&self, _rates_json: &str) {}
}
