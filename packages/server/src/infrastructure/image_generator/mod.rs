//! Image Generation Service の実装
//!
//! - `openai`: OpenAI Images API

pub mod openai;

pub use openai::OpenAiImageGenerator;
