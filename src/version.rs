//! Build metadata reported to the agent on every request.

/// Language tag reported in `Datadog-Meta-Lang`.
pub const LANG: &str = "rust";

/// Tracer version reported in `Datadog-Meta-Tracer-Version`.
pub const TRACER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Toolchain version reported in `Datadog-Meta-Lang-Version`, captured when
/// the crate was built.
pub const LANG_VERSION: &str = env!("DATADOG_TRACER_RUSTC_VERSION");
