use std::{io, path::Path};

use image::RgbImage;

use crate::{Error, Result};

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];

pub fn is_supported_extension(file_name: &str) -> bool {
    extension(file_name).is_some_and(|ext| {
        SUPPORTED_EXTENSIONS
            .iter()
            .any(|supported| ext.eq_ignore_ascii_case(supported))
    })
}

pub fn check_extension(file_name: &str) -> Result<()> {
    if is_supported_extension(file_name) {
        return Ok(());
    }
    Err(Error::UnsupportedFormat {
        extension: extension(file_name).unwrap_or_default().to_owned(),
    })
}

/// Decodes an uploaded jpeg/png file into RGB, sniffing the actual format from
/// the bytes rather than trusting the extension.
pub fn decode_upload(file_name: &str, bytes: &[u8]) -> Result<RgbImage> {
    check_extension(file_name)?;
    let img = image::ImageReader::new(io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(Error::invalid_image)?
        .decode()
        .map_err(Error::invalid_image)?
        .into_rgb8();
    if img.is_empty() {
        return Err(Error::invalid_image("image is empty"));
    }
    Ok(img)
}

fn extension(file_name: &str) -> Option<&str> {
    Path::new(file_name).extension().and_then(|ext| ext.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    fn encode(format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(6, 4, |x, y| Rgb([x as u8 * 40, y as u8 * 60, 128]));
        let mut buf = io::Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn extension_check() {
        assert!(is_supported_extension("scan.png"));
        assert!(is_supported_extension("scan.JPG"));
        assert!(is_supported_extension("dir/scan.final.jpeg"));
        assert!(!is_supported_extension("scan.gif"));
        assert!(!is_supported_extension("scan"));
        assert!(matches!(
            check_extension("scan"),
            Err(Error::UnsupportedFormat { ref extension }) if extension.is_empty()
        ));
    }

    #[test]
    fn decodes_png_and_jpeg() {
        let img = decode_upload("a.png", &encode(ImageFormat::Png)).unwrap();
        assert_eq!(img.dimensions(), (6, 4));
        assert_eq!(img.get_pixel(5, 3).0, [200, 180, 128]);

        let img = decode_upload("a.jpg", &encode(ImageFormat::Jpeg)).unwrap();
        assert_eq!(img.dimensions(), (6, 4));
    }

    #[test]
    fn format_is_sniffed_from_content() {
        let img = decode_upload("mislabelled.jpg", &encode(ImageFormat::Png)).unwrap();
        assert_eq!(img.dimensions(), (6, 4));
    }

    #[test]
    fn rejects_unsupported_extension() {
        let err = decode_upload("a.gif", &encode(ImageFormat::Png)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { ref extension } if extension == "gif"));
    }

    #[test]
    fn rejects_corrupt_bytes() {
        let err = decode_upload("a.png", b"definitely not a png").unwrap_err();
        assert!(matches!(err, Error::InvalidImage { .. }));
    }
}
