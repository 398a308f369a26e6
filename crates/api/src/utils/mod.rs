//! Shared helpers for the HTTP handlers

pub mod api_error;
pub mod command_helpers;
pub mod logging;
