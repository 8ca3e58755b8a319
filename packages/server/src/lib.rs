//! Tsudoi: collaborative image generation rooms over WebSocket.
//!
//! Small groups share a room, take turns editing a prompt under a room-wide
//! lock, chat, and watch images generated from the prompt appear for everyone.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
