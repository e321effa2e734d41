use crate::{Error, Result};
use cv_core::Dataset;
use image::{DynamicImage, GrayImage, ImageFormat};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Header fields the pipeline needs from a stored grayscale image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub format: Option<ImageFormat>,
}

impl ImageMetadata {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A decoded 8-bit grayscale image.
#[derive(Debug, Clone)]
pub struct GrayFrame {
    pub metadata: ImageMetadata,
    pub pixels: Dataset<u8>,
}

impl GrayFrame {
    pub fn from_image(image: GrayImage, format: Option<ImageFormat>) -> Self {
        let (width, height) = image.dimensions();
        Self {
            metadata: ImageMetadata {
                width,
                height,
                bit_depth: 8,
                format,
            },
            pixels: Dataset::new(image.into_raw()),
        }
    }
}

/// Load an 8-bit grayscale image.
///
/// Palette images decode to RGB; they are accepted only when every pixel is
/// gray (r == g == b). Color images and deeper samples are rejected.
pub fn load_gray<P: AsRef<Path>>(path: P) -> Result<GrayFrame> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path).ok();
    let decoded = image::open(path).map_err(image_error)?;
    let color = decoded.color();

    let gray = match decoded {
        DynamicImage::ImageLuma8(gray) => gray,
        DynamicImage::ImageRgb8(rgb) => {
            let (width, height) = rgb.dimensions();
            if !rgb.pixels().all(|p| p[0] == p[1] && p[1] == p[2]) {
                return Err(Error::UnsupportedFormat(format!(
                    "{} is a color image",
                    path.display()
                )));
            }
            let luma = rgb.pixels().map(|p| p[0]).collect();
            GrayImage::from_raw(width, height, luma).ok_or_else(|| {
                Error::ImageError(format!("{} has inconsistent dimensions", path.display()))
            })?
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!(
                "{} has {:?} pixels; only 8-bit grayscale is supported",
                path.display(),
                color
            )))
        }
    };

    debug!(
        path = %path.display(),
        width = gray.width(),
        height = gray.height(),
        "loaded grayscale image"
    );
    Ok(GrayFrame::from_image(gray, format))
}

/// Write `pixels` using the dimensions in `metadata`.
///
/// The image is encoded into a temporary file next to `path` and renamed into
/// place, so a failed write never leaves a partial file behind.
pub fn store_gray<P: AsRef<Path>>(path: P, metadata: &ImageMetadata, pixels: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if pixels.len() != metadata.pixel_count() {
        return Err(Error::Configuration(format!(
            "output buffer holds {} pixels, image is {}x{}",
            pixels.len(),
            metadata.width,
            metadata.height
        )));
    }

    let format = ImageFormat::from_path(path)
        .ok()
        .or(metadata.format)
        .ok_or_else(|| {
            Error::UnsupportedFormat(format!("cannot infer an image format for {}", path.display()))
        })?;

    let image = GrayImage::from_raw(metadata.width, metadata.height, pixels.to_vec())
        .ok_or_else(|| Error::Configuration("pixel buffer does not match dimensions".into()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        image.write_to(&mut writer, format).map_err(image_error)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    debug!(path = %path.display(), "stored grayscale image");
    Ok(())
}

fn image_error(err: image::ImageError) -> Error {
    match err {
        image::ImageError::IoError(e) => Error::Io(e),
        image::ImageError::Unsupported(e) => Error::UnsupportedFormat(e.to_string()),
        other => Error::ImageError(other.to_string()),
    }
}
