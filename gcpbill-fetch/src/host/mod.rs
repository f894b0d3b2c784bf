//! Host APIs.
//!
//! - [`http`] - Authenticated HTTP client for Google REST APIs
//! - [`process`] - Subprocess execution for `gcloud` and the browser opener

pub mod http;
pub mod process;

pub use http::HttpClient;
pub use process::{ProcessOutput, ProcessRunner};
