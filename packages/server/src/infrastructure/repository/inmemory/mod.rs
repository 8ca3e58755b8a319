//! インメモリ実装（単一プロセス・再起動で消える）

mod connection;
mod room;

pub use connection::InMemoryConnectionRepository;
pub use room::InMemoryRoomRepository;
