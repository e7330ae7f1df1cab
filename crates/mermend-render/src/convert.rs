use image::codecs::jpeg::JpegEncoder;

use crate::RenderError;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_QUALITY: u8 = 95;

/// Image formats the rendering services can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Png,
    Svg,
}

impl RenderFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderFormat::Png => "png",
            RenderFormat::Svg => "svg",
        }
    }
}

impl std::fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `bytes` look like an image of `format`.
pub fn is_image(bytes: &[u8], format: RenderFormat) -> bool {
    match format {
        RenderFormat::Png => bytes.starts_with(PNG_MAGIC),
        RenderFormat::Svg => {
            let text = String::from_utf8_lossy(bytes);
            text.trim_start().starts_with('<') && text.contains("<svg")
        }
    }
}

pub(crate) fn check_image(
    bytes: Vec<u8>,
    format: RenderFormat,
    service: &'static str,
) -> Result<Vec<u8>, RenderError> {
    if is_image(&bytes, format) {
        Ok(bytes)
    } else {
        Err(RenderError::NotAnImage {
            service,
            format: format.as_str(),
        })
    }
}

/// Re-encode any decodable image as an RGB JPEG.
pub fn to_jpeg(bytes: &[u8]) -> Result<Vec<u8>, RenderError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;
    Ok(out)
}
