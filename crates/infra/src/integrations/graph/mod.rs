//! Microsoft Graph calendar integration
//!
//! [`GraphCalendarClient`] implements the calendar gateway port against
//! `/me/events`. Every call carries the caller's bearer token and asks Graph
//! to express times in UTC; requests are not retried.

pub mod client;
mod payloads;

pub use client::GraphCalendarClient;
