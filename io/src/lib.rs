//! Grayscale image I/O for the equalization pipeline.
//!
//! Decoding and encoding go through the `image` crate. The pipeline itself only
//! sees the pixel [`Dataset`](cv_core::Dataset) and the [`ImageMetadata`].

pub mod gray;

pub use gray::{load_gray, store_gray, GrayFrame, ImageMetadata};

pub use cv_core::{Error, Result};
