//! Decode, JPEG encode, and output file naming.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageError, ImageReader, RgbImage, RgbaImage};

use crate::error::PipelineError;

/// Give up looking for a free output name after this many attempts.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Decode any supported format into RGBA8.
pub fn decode(path: &Path) -> Result<RgbaImage, PipelineError> {
    let decode_err = |source: ImageError| PipelineError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| decode_err(ImageError::IoError(e)))?;
    Ok(reader.decode().map_err(decode_err)?.to_rgba8())
}

/// Encode `image` as JPEG into a fresh file next to `source`, named
/// `<stem>_<suffix>.jpg` (or `<stem>_<suffix>_N.jpg` if taken). The source is
/// never overwritten. Returns the path written.
pub fn write_jpeg_beside(
    image: &RgbaImage,
    source: &Path,
    suffix: &str,
    quality: u8,
) -> Result<PathBuf, PipelineError> {
    let (path, file) = create_unique(source, suffix)?;
    if let Err(e) = encode_jpeg(image, file, quality) {
        // Don't leave a truncated artifact behind.
        let _ = fs::remove_file(&path);
        return Err(e);
    }
    Ok(path)
}

fn encode_jpeg(image: &RgbaImage, file: File, quality: u8) -> Result<(), PipelineError> {
    let rgb: RgbImage = image.convert();
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(PipelineError::Encode)?;
    writer.flush()?;
    Ok(())
}

fn create_unique(source: &Path, suffix: &str) -> Result<(PathBuf, File), PipelineError> {
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "capture".to_string());

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let name = if attempt == 1 {
            format!("{stem}_{suffix}.jpg")
        } else {
            format!("{stem}_{suffix}_{attempt}.jpg")
        };
        let path = dir.join(name);
        if path == source {
            continue;
        }
        match File::create_new(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free output name for `{}`", source.display()),
    )
    .into())
}
