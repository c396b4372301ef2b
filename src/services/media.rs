use std::io::Cursor;

use axum::extract::Multipart;
use bytes::Bytes;
use image::{imageops::FilterType, DynamicImage, ImageFormat};

use crate::error::AppError;

/// Longest side of a gallery or trip photo thumbnail.
pub const THUMBNAIL_SIZE: u32 = 400;

/// Longest side of a stored profile picture.
pub const PROFILE_PICTURE_SIZE: u32 = 512;

/// The parts of an upload form the photo and profile endpoints accept.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
    pub caption: Option<String>,
}

/// Read a multipart form with a `file` field and an optional `caption` field.
/// Other fields are ignored.
pub async fn read_upload(mut multipart: Multipart) -> anyhow::Result<Upload> {
    let mut file: Option<(String, String, Bytes)> = None;
    let mut caption = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&filename)
                            .first_or_octet_stream()
                            .to_string()
                    });
                let data = field.bytes().await?;
                file = Some((filename, content_type, data));
            }
            "caption" => {
                caption = Some(field.text().await?.trim().to_string());
            }
            _ => {}
        }
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| AppError::validation("No file field in upload"))?;
    if data.is_empty() {
        return Err(AppError::validation("Uploaded file is empty").into());
    }
    if !content_type.starts_with("image/") {
        return Err(AppError::validation(format!("Only images can be uploaded, got {content_type}")).into());
    }

    Ok(Upload {
        filename,
        content_type,
        data,
        caption,
    })
}

/// A decoded image re-encoded as JPEG within a bounding box.
#[derive(Debug)]
pub struct Rendition {
    /// Dimensions of the source image.
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

/// Decode `bytes` and produce a JPEG no larger than `max` on either side.
/// Smaller images keep their size.
pub fn render_jpeg(bytes: &[u8], max: u32) -> anyhow::Result<Rendition> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| AppError::validation(format!("Unreadable image: {e}")))?;
    let (width, height) = (img.width(), img.height());

    let resized = if width > max || height > max {
        img.resize(max, max, FilterType::Lanczos3)
    } else {
        img
    };
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut jpeg = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;

    Ok(Rendition { width, height, jpeg })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// PNG bytes of a solid `width` x `height` image with an alpha channel.
    pub fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 80, 40, 128]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::png;
    use super::*;

    #[test]
    fn test_render_shrinks_to_bounding_box() {
        let r = render_jpeg(&png(1200, 600), THUMBNAIL_SIZE).unwrap();
        assert_eq!((r.width, r.height), (1200, 600));

        let thumb = image::load_from_memory(&r.jpeg).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (400, 200));
        assert_eq!(image::guess_format(&r.jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_render_keeps_small_images() {
        let r = render_jpeg(&png(100, 80), PROFILE_PICTURE_SIZE).unwrap();
        let out = image::load_from_memory(&r.jpeg).unwrap();
        assert_eq!((out.width(), out.height()), (100, 80));
    }

    #[test]
    fn test_render_rejects_garbage() {
        let err = render_jpeg(b"not an image", THUMBNAIL_SIZE).unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Validation(_)));
    }
}
