//! UI 層
//!
//! WebSocket / HTTP のエンドポイントと、受信イベントのユースケースへの振り分け。

mod dispatcher;
mod handler;
mod server;
mod signal;
pub mod state;

pub use dispatcher::EventDispatcher;
pub use server::Server;
pub use signal::shutdown_signal;
pub use state::{AppState, Dependencies};
