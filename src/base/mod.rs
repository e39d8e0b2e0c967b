//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): resolution error codes, Chromium-style
//! - [`IoResultExt`](context::IoResultExt): context helpers for IO results

pub mod context;
pub mod neterror;
