//! Numbered frame files on disk.
//!
//! Frames are written as `frame_000000.png`, `frame_000001.png`, ... which is
//! the image2 input pattern the encoder expects. All frames of one scene carry
//! identical bytes, so a run is encoded once, written once and hard-linked for
//! the rest of its indices (plain copy when the filesystem refuses links).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use puzzle_core::timeline::FramePlan;
use serde::Serialize;
use tracing::{debug, info};

use crate::composer::FrameComposer;
use crate::error::RenderError;

const PREFIX: &str = "frame_";
const EXTENSION: &str = "png";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    /// Frame files on disk after the run
    pub frames: u64,
    /// Scene frames actually rasterized
    pub rasterized: u64,
    pub bytes_encoded: u64,
}

impl RenderStats {
    pub fn merge(&mut self, other: RenderStats) {
        self.frames += other.frames;
        self.rasterized += other.rasterized;
        self.bytes_encoded += other.bytes_encoded;
    }
}

#[derive(Debug, Clone)]
pub struct FrameSink {
    dir: PathBuf,
}

impl FrameSink {
    /// Open `dir` as the frame directory, creating it if needed and removing
    /// stale frame files from an earlier run.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, RenderError> {
        let sink = Self { dir: dir.into() };
        fs::create_dir_all(&sink.dir)?;
        let removed = sink.clear()?;
        if removed > 0 {
            debug!(dir = %sink.dir.display(), removed, "Removed stale frames");
        }
        Ok(sink)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{PREFIX}{index:06}.{EXTENSION}"))
    }

    /// printf-style pattern matching [`FrameSink::path_for`].
    pub fn input_pattern(&self) -> PathBuf {
        self.dir.join(format!("{PREFIX}%06d.{EXTENSION}"))
    }

    /// Write `png` to every index in `start..start + len`.
    pub fn write_run(&self, start: u64, len: u64, png: &[u8]) -> Result<(), RenderError> {
        if len == 0 {
            return Ok(());
        }
        let first = self.path_for(start);
        fs::write(&first, png)?;
        for index in start + 1..start + len {
            let path = self.path_for(index);
            if path.exists() {
                fs::remove_file(&path)?;
            }
            if fs::hard_link(&first, &path).is_err() {
                fs::copy(&first, &path)?;
            }
        }
        Ok(())
    }

    /// Every index in `0..total` must exist, and nothing beyond it.
    pub fn verify_contiguous(&self, total: u64) -> Result<(), RenderError> {
        for index in 0..total {
            let path = self.path_for(index);
            if !path.is_file() {
                return Err(RenderError::MissingFrame(path));
            }
        }
        let on_disk = self.frame_files()?.len() as u64;
        if on_disk != total {
            return Err(RenderError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected {total} frames in {}, found {on_disk}", self.dir.display()),
            )));
        }
        Ok(())
    }

    /// Remove every frame file. Other files in the directory are left alone.
    pub fn clear(&self) -> Result<u64, RenderError> {
        let files = self.frame_files()?;
        for path in &files {
            fs::remove_file(path)?;
        }
        Ok(files.len() as u64)
    }

    fn frame_files(&self) -> Result<Vec<PathBuf>, RenderError> {
        let mut files = Vec::new();
        if !self.dir.exists() {
            return Ok(files);
        }
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_frame = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(PREFIX) && n.ends_with(EXTENSION))
                .unwrap_or(false);
            if is_frame {
                files.push(path);
            }
        }
        Ok(files)
    }
}

/// Rasterize and write a whole plan on the current thread.
pub fn render_plan(
    plan: &FramePlan,
    composer: &FrameComposer,
    sink: &FrameSink,
) -> Result<RenderStats, RenderError> {
    let mut stats = RenderStats::default();
    for run in plan.runs() {
        let png = composer.render(&run.frame)?.to_png()?;
        sink.write_run(run.start, run.len, &png)?;
        stats.merge(RenderStats {
            frames: run.len,
            rasterized: 1,
            bytes_encoded: png.len() as u64,
        });
    }
    info!(
        frames = stats.frames,
        rasterized = stats.rasterized,
        dir = %sink.dir().display(),
        "Frames written"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::RenderConfig;
    use puzzle_core::scene::{OverlayMetadata, Scene, SceneKind};

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("puzzle_reel_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_path_naming() {
        let sink = FrameSink {
            dir: PathBuf::from("out"),
        };
        assert_eq!(sink.path_for(7), PathBuf::from("out/frame_000007.png"));
        assert_eq!(sink.input_pattern(), PathBuf::from("out/frame_%06d.png"));
    }

    #[test]
    fn test_write_run_links_identical_frames() {
        let dir = scratch_dir("sink_1");
        let sink = FrameSink::create(&dir).unwrap();
        sink.write_run(0, 3, b"abc").unwrap();
        sink.write_run(3, 2, b"xy").unwrap();

        for i in 0..3 {
            assert_eq!(fs::read(sink.path_for(i)).unwrap(), b"abc");
        }
        assert_eq!(fs::read(sink.path_for(4)).unwrap(), b"xy");
        sink.verify_contiguous(5).unwrap();
    }

    #[test]
    fn test_create_clears_stale_frames_only() {
        let dir = scratch_dir("sink_2");
        fs::write(dir.join("frame_000099.png"), b"old").unwrap();
        fs::write(dir.join("notes.txt"), b"keep").unwrap();

        let sink = FrameSink::create(&dir).unwrap();
        assert!(!sink.path_for(99).exists());
        assert!(dir.join("notes.txt").exists());
    }

    #[test]
    fn test_verify_reports_gap() {
        let dir = scratch_dir("sink_3");
        let sink = FrameSink::create(&dir).unwrap();
        sink.write_run(0, 2, b"a").unwrap();
        sink.write_run(3, 1, b"b").unwrap();

        match sink.verify_contiguous(4) {
            Err(RenderError::MissingFrame(path)) => assert_eq!(path, sink.path_for(2)),
            other => panic!("expected missing frame, got {other:?}"),
        }
    }

    #[test]
    fn test_render_plan_writes_every_frame() {
        let dir = scratch_dir("sink_4");
        let sink = FrameSink::create(&dir).unwrap();
        let composer = FrameComposer::new(RenderConfig::with_size(64), None).unwrap();

        let scenes = vec![
            Scene::new(SceneKind::Break, None, OverlayMetadata::default(), 0.5),
            Scene::new(SceneKind::Break, None, OverlayMetadata::default(), 0.2),
        ];
        let plan = FramePlan::from_scenes(&scenes, 10);
        let stats = render_plan(&plan, &composer, &sink).unwrap();

        assert_eq!(stats.frames, 7);
        assert_eq!(stats.rasterized, 2);
        sink.verify_contiguous(7).unwrap();
        assert_eq!(sink.clear().unwrap(), 7);
    }
}
