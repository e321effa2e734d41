pub mod equalize;
pub mod histogram;
pub mod remap;

pub use equalize::*;
pub use histogram::*;
pub use remap::*;

pub use cv_core::{Error, Result};

pub type ImgprocError = Error;

pub fn validate_image_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ImgprocError::Configuration(
            "Image dimensions must be non-zero".into(),
        ));
    }
    Ok(())
}
