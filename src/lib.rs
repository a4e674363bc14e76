//! Purpose: Kernels for the tabwire data-interchange library.
//! Exports: `api` (stable surface) and `core` (frame codec, quantizer, columnar transforms).
//! Role: Library backing the `tabwire` CLI and downstream integrations.
//! Invariants: Every operation is a synchronous, pure transform of its inputs.
//! Invariants: Errors are the only failure channel; nothing is logged on failure.
pub mod api;
pub mod core;
