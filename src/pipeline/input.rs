//! Input staging: normalise a path, in-memory image or byte buffer to a file path.
//!
//! ## Why stage to a temp file?
//!
//! The engine only reads images from the file system. In-memory inputs are
//! written to a uniquely named [`NamedTempFile`] in the scratch directory
//! (memory-backed `/dev/shm` when available) right before the engine is
//! spawned. The file is removed by [`StagedInput::release`] once the process
//! has exited, and by `Drop` on every other path (engine launch failure,
//! timeout, panic), so no decode call ever leaves a staged file behind.

use crate::error::DecodeError;
use image::{DynamicImage, ImageFormat};
use std::borrow::Cow;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const STAGED_PREFIX: &str = "zxing-";

/// One unit of input for a decode call.
#[derive(Debug, Clone)]
pub enum DecodeInput {
    /// An image file already on disk; passed to the engine as-is.
    Path(PathBuf),
    /// A decoded image held in memory; PNG-encoded to a staged file.
    Image(DynamicImage),
    /// The bytes of an encoded image file (PNG, JPEG, …); written verbatim.
    Bytes(Vec<u8>),
    /// Several paths at once. Never accepted by a single decode call, which
    /// reports [`DecodeError::InvalidInputKind`].
    Paths(Vec<PathBuf>),
}

impl DecodeInput {
    /// Short description used in logs and batch reports.
    pub fn describe(&self) -> String {
        match self {
            DecodeInput::Path(p) => p.display().to_string(),
            DecodeInput::Image(img) => format!("<image {}x{}>", img.width(), img.height()),
            DecodeInput::Bytes(b) => format!("<{} bytes>", b.len()),
            DecodeInput::Paths(ps) => format!("<{} paths>", ps.len()),
        }
    }
}

impl From<&str> for DecodeInput {
    fn from(s: &str) -> Self {
        DecodeInput::Path(PathBuf::from(s))
    }
}

impl From<String> for DecodeInput {
    fn from(s: String) -> Self {
        DecodeInput::Path(PathBuf::from(s))
    }
}

impl From<&Path> for DecodeInput {
    fn from(p: &Path) -> Self {
        DecodeInput::Path(p.to_path_buf())
    }
}

impl From<PathBuf> for DecodeInput {
    fn from(p: PathBuf) -> Self {
        DecodeInput::Path(p)
    }
}

impl From<DynamicImage> for DecodeInput {
    fn from(img: DynamicImage) -> Self {
        DecodeInput::Image(img)
    }
}

impl From<Vec<u8>> for DecodeInput {
    fn from(bytes: Vec<u8>) -> Self {
        DecodeInput::Bytes(bytes)
    }
}

impl From<&[u8]> for DecodeInput {
    fn from(bytes: &[u8]) -> Self {
        DecodeInput::Bytes(bytes.to_vec())
    }
}

impl From<Vec<PathBuf>> for DecodeInput {
    fn from(paths: Vec<PathBuf>) -> Self {
        DecodeInput::Paths(paths)
    }
}

/// The resolved input: a caller-owned path or a staged temp file.
#[derive(Debug)]
pub enum StagedInput {
    /// Input was already a file on disk.
    Local(PathBuf),
    /// Input was staged; the file lives until `release` or drop.
    Temp(NamedTempFile),
}

impl StagedInput {
    /// Path handed to the engine.
    pub fn path(&self) -> &Path {
        match self {
            StagedInput::Local(p) => p,
            StagedInput::Temp(tmp) => tmp.path(),
        }
    }

    pub fn is_temp(&self) -> bool {
        matches!(self, StagedInput::Temp(_))
    }

    /// Delete the staged file now. Cleanup failures are logged, not returned;
    /// they cannot change the decode result.
    pub fn release(self) {
        if let StagedInput::Temp(tmp) = self {
            let path = tmp.path().to_path_buf();
            match tmp.close() {
                Ok(()) => debug!("Removed staged input {}", path.display()),
                Err(e) => warn!("Could not remove staged input {}: {}", path.display(), e),
            }
        }
    }
}

/// Resolve `input` to a path the engine can read, staging it in `scratch_dir` if needed.
pub fn stage_input(input: &DecodeInput, scratch_dir: &Path) -> Result<StagedInput, DecodeError> {
    match input {
        DecodeInput::Path(p) => Ok(StagedInput::Local(p.clone())),
        DecodeInput::Paths(ps) => Err(DecodeError::InvalidInputKind { count: ps.len() }),
        DecodeInput::Bytes(bytes) => {
            let suffix = image::guess_format(bytes)
                .ok()
                .and_then(|f| f.extensions_str().first().copied())
                .map(|ext| format!(".{ext}"))
                .unwrap_or_else(|| ".img".to_string());
            let mut tmp = scratch_file(scratch_dir, &suffix)?;
            tmp.write_all(bytes)
                .and_then(|()| tmp.flush())
                .map_err(|source| DecodeError::StagingFailed { source })?;
            debug!("Staged {} bytes → {}", bytes.len(), tmp.path().display());
            Ok(StagedInput::Temp(tmp))
        }
        DecodeInput::Image(img) => {
            let tmp = scratch_file(scratch_dir, ".png")?;
            {
                let mut writer = BufWriter::new(tmp.as_file());
                png_compatible(img).write_to(&mut writer, ImageFormat::Png)?;
                writer
                    .flush()
                    .map_err(|source| DecodeError::StagingFailed { source })?;
            }
            debug!(
                "Staged {}x{} image → {}",
                img.width(),
                img.height(),
                tmp.path().display()
            );
            Ok(StagedInput::Temp(tmp))
        }
    }
}

/// PNG has no float samples; float images are widened to 16-bit RGBA.
fn png_compatible(img: &DynamicImage) -> Cow<'_, DynamicImage> {
    match img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            Cow::Owned(DynamicImage::ImageRgba16(img.to_rgba16()))
        }
        _ => Cow::Borrowed(img),
    }
}

fn scratch_file(dir: &Path, suffix: &str) -> Result<NamedTempFile, DecodeError> {
    tempfile::Builder::new()
        .prefix(STAGED_PREFIX)
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(|source| DecodeError::StagingFailed { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn small_image() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])))
    }

    fn png_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        small_image()
            .write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode should succeed");
        buf
    }

    #[test]
    fn path_input_is_not_staged() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage_input(&DecodeInput::from("/data/code.png"), dir.path()).unwrap();
        assert!(!staged.is_temp());
        assert_eq!(staged.path(), Path::new("/data/code.png"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn path_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = DecodeInput::from(vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
        let err = stage_input(&input, dir.path()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidInputKind { count: 2 }));
    }

    #[test]
    fn bytes_are_written_verbatim_with_sniffed_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = png_bytes();
        let staged = stage_input(&DecodeInput::from(bytes.clone()), dir.path()).unwrap();
        let path = staged.path().to_path_buf();

        assert!(staged.is_temp());
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);

        staged.release();
        assert!(!path.exists());
    }

    #[test]
    fn unknown_bytes_get_generic_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage_input(&DecodeInput::from(&b"not an image"[..]), dir.path()).unwrap();
        assert_eq!(
            staged.path().extension().and_then(|e| e.to_str()),
            Some("img")
        );
    }

    #[test]
    fn image_is_encoded_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage_input(&DecodeInput::from(small_image()), dir.path()).unwrap();
        let written = std::fs::read(staged.path()).unwrap();
        assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn float_images_are_staged_as_png() {
        let dir = tempfile::tempdir().unwrap();
        for img in [DynamicImage::new_rgb32f(4, 3), DynamicImage::new_rgba32f(4, 3)] {
            let staged = stage_input(&DecodeInput::from(img), dir.path()).unwrap();
            let written = std::fs::read(staged.path()).unwrap();
            assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Png);
            let reloaded = image::load_from_memory(&written).unwrap();
            assert_eq!((reloaded.width(), reloaded.height()), (4, 3));
        }
    }

    #[test]
    fn drop_removes_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let staged = stage_input(&DecodeInput::from(png_bytes()), dir.path()).unwrap();
            staged.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn release_tolerates_already_removed_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage_input(&DecodeInput::from(png_bytes()), dir.path()).unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        staged.release();
    }

    #[test]
    fn staged_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = stage_input(&DecodeInput::from(png_bytes()), dir.path()).unwrap();
        let b = stage_input(&DecodeInput::from(png_bytes()), dir.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn missing_scratch_dir_fails_staging() {
        let err = stage_input(
            &DecodeInput::from(png_bytes()),
            Path::new("/definitely/not/here"),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::StagingFailed { .. }));
    }

    #[test]
    fn describe_inputs() {
        assert_eq!(DecodeInput::from("a.png").describe(), "a.png");
        assert_eq!(DecodeInput::from(small_image()).describe(), "<image 8x8>");
        assert_eq!(DecodeInput::from(vec![1u8, 2, 3]).describe(), "<3 bytes>");
    }
}
