//! # Camera Equipment Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::DynamicImage;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of encoded camera frames.
///
/// The network layer only needs an opaque byte buffer for each frame, the format of the buffer is
/// decided by the implementor.
pub trait ImageSource: Send {
    /// Capture the current frame.
    fn capture(&mut self) -> Result<Vec<u8>, CamError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible formats for camera images. This is used rather than image::ImageFormat to restrict
/// the formats that can be sent.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG image
    Png,

    /// JPEG image with a quality value between 1 and 100, where 100 is best.
    Jpeg(u8)
}

/// Errors which can occur while capturing a frame.
#[derive(Debug, thiserror::Error)]
pub enum CamError {
    #[error("No frame is available yet")]
    NoFrame,

    #[error("Could not encode the frame: {0}")]
    EncodeError(image::ImageError),

    #[error("The encoded frame is empty")]
    EmptyFrame,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode an image into a byte buffer in the given format.
pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, CamError> {
    let mut data = Vec::<u8>::new();

    // Get the output format type
    let output_format = match format {
        ImageFormat::Png => image::ImageOutputFormat::Png,
        ImageFormat::Jpeg(q) => image::ImageOutputFormat::Jpeg(q)
    };

    image.write_to(&mut data, output_format)
        .map_err(CamError::EncodeError)?;

    if data.is_empty() {
        return Err(CamError::EmptyFrame)
    }

    Ok(data)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    #[test]
    fn test_encode_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, Rgb([10, 200, 30])));
        let data = encode_image(&img, ImageFormat::Jpeg(75)).unwrap();

        // JPEG start of image marker
        assert_eq!(&data[0..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 8);
    }

    #[test]
    fn test_encode_png() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let data = encode_image(&img, ImageFormat::Png).unwrap();
        assert_eq!(&data[1..4], b"PNG");
    }
}
