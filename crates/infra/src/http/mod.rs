//! HTTP client utilities

pub mod client;

pub use client::{remote_api_error, HttpClient, HttpClientBuilder};
