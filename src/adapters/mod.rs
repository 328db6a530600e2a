//! Vendor payload adapters
//!
//! This module provides adapters that parse raw vendor JSON payloads and map them
//! to rows of the flattened output tables.

mod garmin;

pub use garmin::{GarminSleepAdapter, GarminSleepPayload, GarminSleepScore};
