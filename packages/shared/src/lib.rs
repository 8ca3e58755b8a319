//! Utilities shared by the Tsudoi server binary and its tests.

pub mod logger;
pub mod time;
