//! Blob Storage Service の実装
//!
//! - `cloudinary`: Cloudinary Upload / Admin API

pub mod cloudinary;

pub use cloudinary::{CloudinaryBlobStorage, CloudinaryCredentials};
