// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Raster images referenced from each page's XObject resources

use image::{DynamicImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::model::ExtractedImage;
use crate::Result;

/// Limit when walking `/Parent` links for inherited resources
const MAX_PARENT_DEPTH: usize = 16;

/// Sample layout of an image stream
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    /// Gray (1), RGB (3) or CMYK (4) components per pixel
    Direct(usize),
    /// One byte per pixel indexing `lookup`
    Indexed {
        channels: usize,
        hival: usize,
        lookup: Vec<u8>,
    },
}

/// Decode every image on every page, converting to RGB.
///
/// Images that cannot be decoded are skipped; this never fails.
pub(super) fn extract(pdf: &Document) -> Vec<ExtractedImage> {
    let mut images = Vec::new();

    for (number, page_id) in pdf.get_pages() {
        let Some(xobjects) = page_xobjects(pdf, page_id) else {
            continue;
        };

        let mut index_on_page = 0;
        for (name, object) in xobjects.iter() {
            let Some(stream) = image_stream(pdf, object) else {
                continue;
            };

            match decode(pdf, stream) {
                Some(pixels) => {
                    images.push(ExtractedImage::new(number, index_on_page, pixels));
                    index_on_page += 1;
                }
                None => debug!(
                    "Skipping undecodable image /{} on page {}",
                    String::from_utf8_lossy(name),
                    number
                ),
            }
        }
    }

    info!("Extracted {} images", images.len());
    images
}

/// Write each image as `page<P>_img<I>.png` under `dir`
pub fn export_png(images: &[ExtractedImage], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(images.len());
    for image in images {
        let path = dir.join(format!("page{}_img{}.png", image.page, image.index_on_page));
        image.pixels.save_with_format(&path, ImageFormat::Png)?;
        debug!("Saved {:?}", path);
        written.push(path);
    }

    Ok(written)
}

/// XObject dictionary of a page, following `/Parent` for inherited resources
fn page_xobjects(pdf: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = pdf.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_PARENT_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            let (_, resources) = pdf.dereference(resources).ok()?;
            let xobjects = resources.as_dict().ok()?.get(b"XObject").ok()?;
            let (_, xobjects) = pdf.dereference(xobjects).ok()?;
            return xobjects.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = pdf.get_dictionary(parent).ok()?;
    }

    None
}

fn image_stream<'a>(pdf: &'a Document, object: &'a Object) -> Option<&'a Stream> {
    let (_, object) = pdf.dereference(object).ok()?;
    let stream = object.as_stream().ok()?;
    (name_of(&stream.dict, b"Subtype") == Some("Image")).then_some(stream)
}

fn decode(pdf: &Document, stream: &Stream) -> Option<DynamicImage> {
    let dict = &stream.dict;
    let width = int_of(dict, b"Width")?;
    let height = int_of(dict, b"Height")?;

    let data = match filter_name(dict).as_deref() {
        Some("DCTDecode") => {
            let data = pre_codec_data(dict, &stream.content)?;
            return match image::load_from_memory_with_format(&data, ImageFormat::Jpeg) {
                Ok(img) => Some(DynamicImage::ImageRgb8(img.to_rgb8())),
                Err(e) => {
                    debug!("JPEG decode failed: {}", e);
                    None
                }
            };
        }
        Some("FlateDecode") => stream
            .decompressed_content()
            .ok()
            .or_else(|| inflate(&stream.content))?,
        None => stream.content.clone(),
        Some(other) => {
            debug!("Unsupported image filter {}", other);
            return None;
        }
    };

    let bits = int_of(dict, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        debug!("Unsupported bit depth {}", bits);
        return None;
    }

    let space = color_space(pdf, dict)?;
    let rgb = to_rgb(&space, &data, width, height)?;
    RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
}

/// zlib first, then raw deflate
fn inflate(compressed: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    if flate2::read::ZlibDecoder::new(compressed)
        .read_to_end(&mut out)
        .is_ok()
    {
        return Some(out);
    }

    out.clear();
    flate2::read::DeflateDecoder::new(compressed)
        .read_to_end(&mut out)
        .ok()
        .map(|_| out)
}

/// Filter names of a stream in application order
fn filters(dict: &Dictionary) -> Vec<String> {
    let Ok(filter) = dict.get(b"Filter") else {
        return Vec::new();
    };

    if let Ok(name) = filter.as_name() {
        return std::str::from_utf8(name).map(|n| vec![n.to_string()]).unwrap_or_default();
    }

    filter
        .as_array()
        .map(|array| {
            array
                .iter()
                .filter_map(|o| o.as_name().ok())
                .filter_map(|n| std::str::from_utf8(n).ok())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Image-relevant filter of a stream; for filter chains the image codec wins
fn filter_name(dict: &Dictionary) -> Option<String> {
    let names = filters(dict);

    names
        .iter()
        .rev()
        .find(|n| matches!(n.as_str(), "DCTDecode" | "JPXDecode" | "CCITTFaxDecode"))
        .or(names.first())
        .cloned()
}

/// Undo the filters applied before the image codec; only Flate is supported
fn pre_codec_data(dict: &Dictionary, content: &[u8]) -> Option<Vec<u8>> {
    let names = filters(dict);
    let codec = names.iter().position(|n| n == "DCTDecode").unwrap_or(names.len());

    let mut data = content.to_vec();
    for name in &names[..codec] {
        data = match name.as_str() {
            "FlateDecode" | "Fl" => inflate(&data)?,
            other => {
                debug!("Unsupported filter {} before image codec", other);
                return None;
            }
        };
    }

    Some(data)
}

fn color_space(pdf: &Document, dict: &Dictionary) -> Option<ColorSpace> {
    let Ok(object) = dict.get(b"ColorSpace") else {
        return Some(ColorSpace::Direct(3));
    };
    let (_, object) = pdf.dereference(object).ok()?;

    if let Ok(name) = object.as_name() {
        return channels_from_name(std::str::from_utf8(name).ok()?).map(ColorSpace::Direct);
    }

    let array = object.as_array().ok()?;
    let family = std::str::from_utf8(array.first()?.as_name().ok()?).ok()?;

    match family {
        "Indexed" => {
            let (_, base) = pdf.dereference(array.get(1)?).ok()?;
            let channels = match base.as_name() {
                Ok(name) => channels_from_name(std::str::from_utf8(name).ok()?)?,
                Err(_) => icc_channels(pdf, base.as_array().ok()?)?,
            };
            let hival = usize::try_from(array.get(2)?.as_i64().ok()?).ok()?;
            let (_, table) = pdf.dereference(array.get(3)?).ok()?;
            let lookup = match table {
                Object::String(bytes, _) => bytes.clone(),
                Object::Stream(s) => s.decompressed_content().unwrap_or_else(|_| s.content.clone()),
                _ => return None,
            };
            Some(ColorSpace::Indexed {
                channels,
                hival,
                lookup,
            })
        }
        "ICCBased" => icc_channels(pdf, array).map(ColorSpace::Direct),
        other => channels_from_name(other).map(ColorSpace::Direct),
    }
}

/// Component count of an `[/ICCBased stream]` array
fn icc_channels(pdf: &Document, array: &[Object]) -> Option<usize> {
    let (_, profile) = pdf.dereference(array.get(1)?).ok()?;
    let n = profile.as_stream().ok()?.dict.get(b"N").ok()?.as_i64().ok()?;
    matches!(n, 1 | 3 | 4).then_some(n as usize)
}

fn channels_from_name(name: &str) -> Option<usize> {
    match name {
        "DeviceGray" | "CalGray" | "G" => Some(1),
        "DeviceRGB" | "CalRGB" | "RGB" | "Lab" => Some(3),
        "DeviceCMYK" | "CMYK" => Some(4),
        _ => None,
    }
}

fn to_rgb(space: &ColorSpace, data: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let pixels = (width as usize).checked_mul(height as usize)?;

    match space {
        ColorSpace::Direct(channels) => {
            let needed = pixels.checked_mul(*channels)?;
            if *channels == 0 || data.len() < needed {
                debug!("Image data too short: {} < {}", data.len(), needed);
                return None;
            }
            Some(
                data[..needed]
                    .chunks_exact(*channels)
                    .flat_map(components_to_rgb)
                    .collect(),
            )
        }
        ColorSpace::Indexed {
            channels,
            hival,
            lookup,
        } => {
            let palette = hival.checked_add(1)?.checked_mul(*channels)?;
            if *channels == 0 || data.len() < pixels || lookup.len() < palette {
                debug!("Indexed image data or palette too short");
                return None;
            }
            data[..pixels]
                .iter()
                .map(|&i| {
                    let offset = (i as usize).min(*hival) * channels;
                    lookup.get(offset..offset + channels).map(components_to_rgb)
                })
                .collect::<Option<Vec<_>>>()
                .map(|rgb| rgb.concat())
        }
    }
}

fn components_to_rgb(components: &[u8]) -> [u8; 3] {
    match *components {
        [g] => [g, g, g],
        [r, g, b] => [r, g, b],
        [c, m, y, k] => cmyk_to_rgb(c, m, y, k),
        _ => [0, 0, 0],
    }
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let white = 255 - k as u16;
    let channel = |v: u8| ((255 - v as u16) * white / 255) as u8;
    [channel(c), channel(m), channel(y)]
}

fn name_of<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a str> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_name().ok())
        .and_then(|n| std::str::from_utf8(n).ok())
}

fn int_of(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, StringFormat};
    use tempfile::TempDir;

    fn name(n: &str) -> Object {
        Object::Name(n.as_bytes().to_vec())
    }

    #[test]
    fn test_cmyk_to_rgb() {
        assert_eq!(cmyk_to_rgb(0, 0, 0, 0), [255, 255, 255]);
        assert_eq!(cmyk_to_rgb(0, 0, 0, 255), [0, 0, 0]);
        assert_eq!(cmyk_to_rgb(255, 0, 0, 0), [0, 255, 255]);
    }

    #[test]
    fn test_gray_expands_to_rgb() {
        let rgb = to_rgb(&ColorSpace::Direct(1), &[0, 128], 2, 1).unwrap();
        assert_eq!(rgb, vec![0, 0, 0, 128, 128, 128]);
    }

    #[test]
    fn test_short_data_is_rejected() {
        assert!(to_rgb(&ColorSpace::Direct(3), &[1, 2, 3], 2, 1).is_none());
    }

    #[test]
    fn test_indexed_palette() {
        let pdf = Document::new();
        let dict = dictionary! {
            "ColorSpace" => vec![
                name("Indexed"),
                name("DeviceRGB"),
                Object::Integer(1),
                Object::String(vec![0, 0, 0, 255, 0, 0], StringFormat::Hexadecimal),
            ],
        };

        let space = color_space(&pdf, &dict).unwrap();
        assert_eq!(
            space,
            ColorSpace::Indexed {
                channels: 3,
                hival: 1,
                lookup: vec![0, 0, 0, 255, 0, 0],
            }
        );

        // out-of-range indices clamp to hival
        let rgb = to_rgb(&space, &[1, 0, 7], 3, 1).unwrap();
        assert_eq!(rgb, vec![255, 0, 0, 0, 0, 0, 255, 0, 0]);
    }

    #[test]
    fn test_oversized_dimensions_are_rejected() {
        assert!(to_rgb(&ColorSpace::Direct(4), &[0; 16], u32::MAX, u32::MAX).is_none());
    }

    #[test]
    fn test_huge_palette_size_is_rejected() {
        let space = ColorSpace::Indexed {
            channels: 4,
            hival: (i64::MAX / 2) as usize,
            lookup: vec![0; 8],
        };
        assert!(to_rgb(&space, &[200, 0], 2, 1).is_none());

        let space = ColorSpace::Indexed {
            channels: 4,
            hival: usize::MAX,
            lookup: vec![0; 8],
        };
        assert!(to_rgb(&space, &[200, 0], 2, 1).is_none());
    }

    #[test]
    fn test_flate_wrapped_jpeg_decodes() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::{Cursor, Write};

        let mut jpeg = Vec::new();
        DynamicImage::new_rgb8(4, 3)
            .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&jpeg).unwrap();
        let compressed = encoder.finish().unwrap();

        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 4,
                "Height" => 3,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => vec![name("FlateDecode"), name("DCTDecode")],
            },
            compressed,
        );

        let decoded = decode(&Document::new(), &stream).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn test_missing_color_space_defaults_to_rgb() {
        let pdf = Document::new();
        assert_eq!(color_space(&pdf, &Dictionary::new()), Some(ColorSpace::Direct(3)));
        let cmyk = dictionary! { "ColorSpace" => "DeviceCMYK" };
        assert_eq!(color_space(&pdf, &cmyk), Some(ColorSpace::Direct(4)));
    }

    #[test]
    fn test_filter_chain_prefers_image_codec() {
        let dict = dictionary! {
            "Filter" => vec![name("FlateDecode"), name("DCTDecode")],
        };
        assert_eq!(filter_name(&dict).as_deref(), Some("DCTDecode"));

        let single = dictionary! { "Filter" => "FlateDecode" };
        assert_eq!(filter_name(&single).as_deref(), Some("FlateDecode"));
        assert_eq!(filter_name(&Dictionary::new()), None);
    }

    #[test]
    fn test_inflate_zlib() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[9u8; 64]).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(inflate(&compressed), Some(vec![9u8; 64]));
    }

    #[test]
    fn test_export_png_names() {
        let dir = TempDir::new().unwrap();
        let images = vec![
            ExtractedImage::new(1, 0, DynamicImage::new_rgb8(3, 2)),
            ExtractedImage::new(2, 1, DynamicImage::new_rgb8(1, 1)),
        ];

        let written = export_png(&images, dir.path()).unwrap();

        assert_eq!(written[0], dir.path().join("page1_img0.png"));
        assert_eq!(written[1], dir.path().join("page2_img1.png"));
        let reloaded = image::open(&written[0]).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (3, 2));
    }
}
