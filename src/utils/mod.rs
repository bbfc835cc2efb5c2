//! Utilities shared by both phases.
//!
//! - [`HttpClient`]: reqwest client with browser user agent and timeouts

mod http;

pub use http::{HttpClient, BROWSER_USER_AGENT};
