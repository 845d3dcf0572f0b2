//! Application-wide constants
//!
//! This module contains constants used throughout the application.

/// Default username displayed for unauthenticated users
pub const GUEST_USERNAME: &str = "Guest";

/// Number of rows a single admin bulk action may touch.
pub const MAX_BULK_IDS: usize = 500;
