use std::io;

use anyhow::{anyhow, Result as AnyhowResult};
use base64::prelude::*;
use gidc::image::{self, ImageFormat, RgbImage};

/// RGB pixels in a form that crosses the worker boundary.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageBuf {
    width: u32,
    height: u32,
    pixels_base64: String,
}

impl ImageBuf {
    pub fn new(width: u32, height: u32, pixels: impl AsRef<[u8]>) -> Self {
        let pixels_base64 = BASE64_STANDARD.encode(pixels);
        Self {
            width,
            height,
            pixels_base64,
        }
    }
    pub fn from_rgb(img: &RgbImage) -> Self {
        Self::new(img.width(), img.height(), img.as_raw())
    }
    pub fn to_rgb_image(&self) -> AnyhowResult<RgbImage> {
        let buf = BASE64_STANDARD.decode(&self.pixels_base64)?;
        RgbImage::from_vec(self.width, self.height, buf).ok_or_else(|| anyhow!("invalid ImageBuf"))
    }
}

/// `data:` URL for the uploaded bytes, typed by the sniffed image format.
pub fn bytes_data_url(bytes: &[u8]) -> AnyhowResult<String> {
    let format = image::guess_format(bytes)?;
    Ok(data_url(format, bytes))
}

pub fn png_data_url(img: &RgbImage) -> AnyhowResult<String> {
    let mut buf = io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(data_url(ImageFormat::Png, buf.get_ref()))
}

fn data_url(format: ImageFormat, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        BASE64_STANDARD.encode(bytes)
    )
}
