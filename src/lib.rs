//! Frame estimates for a design canvas: a privileged controller that owns the
//! document, a sandboxed presenter that renders state, and the JSON message
//! contract between them.

pub mod channel;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod estimate;
pub mod export;
pub mod host;
pub mod presenter;
pub mod protocol;
pub mod session;
