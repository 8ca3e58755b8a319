//! Infrastructure 層
//!
//! ドメイン層のインターフェースの具体的な実装と、ワイヤ形式の DTO。

pub mod blob_storage;
pub mod dto;
pub mod image_generator;
pub mod message_pusher;
pub mod repository;
