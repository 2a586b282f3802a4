//! Middleware layered onto every route.

pub mod instrument;

pub use instrument::instrument_request;
