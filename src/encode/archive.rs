//! Frame-sequence archives: one PNG per frame in an LZ4-compressed container.
//!
//! Layout (little-endian):
//!
//! ```text
//! magic "FLAR" | version u16 | reserved u16 | entry_count u32
//! entry*: name_len u16 | name utf8 | raw_len u64 | packed_len u64 | lz4 block
//! ```

use std::io::{Cursor, Read};
use std::time::Instant;

use image::ImageEncoder as _;

use crate::encode::sink::{FileType, FinalizeProgress, FinishCtx, FrameSink, SinkConfig};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{LoomError, LoomResult};
use crate::foundation::events::EventSink;
use crate::foundation::math::flatten_premul_over_bg;
use crate::render::surface::Surface;

/// Leading bytes of every archive.
pub const ARCHIVE_MAGIC: &[u8; 4] = b"FLAR";
/// Container layout version.
pub const ARCHIVE_VERSION: u16 = 1;

/// Archive boundary: collects named blobs and compresses them on finalize.
pub trait ArchiveWriter: Send {
    /// Buffer one named blob. Names must be unique.
    fn add_entry(&mut self, name: &str, bytes: Vec<u8>) -> LoomResult<()>;
    /// Compress and serialize. `Ok(None)` when `cancel` fired between entries.
    fn finalize(
        &mut self,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(FinalizeProgress),
    ) -> LoomResult<Option<Vec<u8>>>;
    /// Entries buffered so far.
    fn entry_count(&self) -> usize;
    /// Drop buffered entries.
    fn clear(&mut self);
}

/// In-memory [`ArchiveWriter`] producing the `FLAR` container.
#[derive(Debug, Default)]
pub struct FrameArchive {
    entries: Vec<(String, Vec<u8>)>,
}

impl FrameArchive {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArchiveWriter for FrameArchive {
    fn add_entry(&mut self, name: &str, bytes: Vec<u8>) -> LoomResult<()> {
        if name.is_empty() || name.len() > usize::from(u16::MAX) {
            return Err(LoomError::validation(format!(
                "archive entry name length {} out of range",
                name.len()
            )));
        }
        if self.entries.iter().any(|(n, _)| n == name) {
            return Err(LoomError::validation(format!(
                "duplicate archive entry '{name}'"
            )));
        }
        self.entries.push((name.to_owned(), bytes));
        Ok(())
    }

    fn finalize(
        &mut self,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(FinalizeProgress),
    ) -> LoomResult<Option<Vec<u8>>> {
        let count = u32::try_from(self.entries.len())
            .map_err(|_| LoomError::validation("too many archive entries"))?;

        let mut out = Vec::new();
        out.extend_from_slice(ARCHIVE_MAGIC);
        out.extend_from_slice(&ARCHIVE_VERSION.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());

        let started = Instant::now();
        let total = self.entries.len().max(1);
        for (i, (name, raw)) in self.entries.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let packed = lz4_flex::compress(raw);
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&(raw.len() as u64).to_le_bytes());
            out.extend_from_slice(&(packed.len() as u64).to_le_bytes());
            out.extend_from_slice(&packed);

            let percent = (i + 1) as f32 * 100.0 / total as f32;
            on_progress(FinalizeProgress::estimate(percent, started.elapsed()));
        }
        if self.entries.is_empty() {
            on_progress(FinalizeProgress::estimate(100.0, started.elapsed()));
        }
        Ok(Some(out))
    }

    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries = Vec::new();
    }
}

/// Decode a `FLAR` container into `(name, bytes)` entries.
pub fn read_archive(bytes: &[u8]) -> LoomResult<Vec<(String, Vec<u8>)>> {
    let mut r = Cursor::new(bytes);

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != ARCHIVE_MAGIC {
        return Err(LoomError::validation("invalid archive magic bytes"));
    }
    let version = read_u16(&mut r)?;
    if version != ARCHIVE_VERSION {
        return Err(LoomError::validation(format!(
            "unsupported archive version {version}"
        )));
    }
    let _reserved = read_u16(&mut r)?;
    let count = read_u32(&mut r)?;

    let mut entries = Vec::with_capacity(count.min(4096) as usize);
    for _ in 0..count {
        let name_len = read_u16(&mut r)?;
        let mut name = vec![0u8; usize::from(name_len)];
        r.read_exact(&mut name)?;
        let name = String::from_utf8(name)
            .map_err(|_| LoomError::validation("archive entry name is not utf-8"))?;

        let raw_len = usize::try_from(read_u64(&mut r)?)
            .map_err(|_| LoomError::validation("archive entry too large"))?;
        let packed_len = usize::try_from(read_u64(&mut r)?)
            .map_err(|_| LoomError::validation("archive entry too large"))?;
        let start = r.position() as usize;
        let end = start
            .checked_add(packed_len)
            .filter(|e| *e <= bytes.len())
            .ok_or_else(|| LoomError::validation("archive entry truncated"))?;

        let raw = lz4_flex::decompress(&bytes[start..end], raw_len)
            .map_err(|e| LoomError::validation(format!("archive entry '{name}': {e}")))?;
        r.set_position(end as u64);
        entries.push((name, raw));
    }
    Ok(entries)
}

fn read_u16(r: &mut impl Read) -> LoomResult<u16> {
    let mut b = [0u8; 2];
    r.read_exact(&mut b)?;
    Ok(u16::from_le_bytes(b))
}

fn read_u32(r: &mut impl Read) -> LoomResult<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn read_u64(r: &mut impl Read) -> LoomResult<u64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(u64::from_le_bytes(b))
}

/// Archive entry name for `idx`, zero-padded to at least five digits.
pub fn frame_entry_name(idx: FrameIndex, total_frames: u64) -> String {
    let width = total_frames.saturating_sub(1).to_string().len().max(5);
    format!("frame_{:0width$}.png", idx.0, width = width)
}

/// Encode opaque RGBA8 as PNG.
pub(crate) fn encode_png(rgba: &[u8], width: u32, height: u32) -> LoomResult<Vec<u8>> {
    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png)
        .write_image(rgba, width, height, image::ExtendedColorType::Rgba8)
        .map_err(|e| LoomError::encode(format!("png encode failed: {e}")))?;
    Ok(png)
}

/// Serializes each frame to PNG and stores it in an [`ArchiveWriter`].
pub struct ArchiveSink {
    archive: Box<dyn ArchiveWriter>,
    cfg: Option<SinkConfig>,
    scratch: Vec<u8>,
}

impl ArchiveSink {
    /// Sink writing into a fresh [`FrameArchive`].
    pub fn new() -> Self {
        Self::with_writer(Box::new(FrameArchive::new()))
    }

    /// Sink writing into `archive`.
    pub fn with_writer(archive: Box<dyn ArchiveWriter>) -> Self {
        Self {
            archive,
            cfg: None,
            scratch: Vec::new(),
        }
    }
}

impl Default for ArchiveSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for ArchiveSink {
    fn file_type(&self) -> FileType {
        FileType {
            ext: "flar",
            mime: "application/x-frameloom-archive",
        }
    }

    fn begin(&mut self, cfg: &SinkConfig, _events: &dyn EventSink) -> LoomResult<()> {
        self.archive.clear();
        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.cfg = Some(cfg.clone());
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, surface: &dyn Surface) -> LoomResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| LoomError::encode("archive sink not started"))?;

        flatten_premul_over_bg(&mut self.scratch, surface.pixels(), cfg.background)?;

        let png = encode_png(&self.scratch, cfg.width, cfg.height)?;
        self.archive
            .add_entry(&frame_entry_name(idx, cfg.total_frames), png)
    }

    fn finish(&mut self, ctx: FinishCtx<'_>) -> LoomResult<Option<Vec<u8>>> {
        tracing::debug!(entries = self.archive.entry_count(), "compressing archive");
        self.archive.finalize(ctx.cancel, ctx.progress)
    }

    fn release(&mut self) {
        self.archive.clear();
        self.scratch = Vec::new();
        self.cfg = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/archive.rs"]
mod tests;
