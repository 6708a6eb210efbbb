//! ffmpeg wrapper: binary discovery, argument building, invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::WorkerError;

/// Static build shipped next to the worker on hosts without a system ffmpeg.
pub const BUNDLED_FFMPEG: &str = "./ffmpeg-7.0.2-amd64-static/ffmpeg";

const STDERR_TAIL_LINES: usize = 20;

/// Optional audio tracks mixed under the video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioMix {
    pub music: Option<PathBuf>,
    pub music_volume: f32,
    pub sfx: Option<PathBuf>,
    pub sfx_volume: f32,
}

impl AudioMix {
    fn tracks(&self) -> Vec<(&Path, f32)> {
        [
            self.music.as_deref().map(|p| (p, self.music_volume)),
            self.sfx.as_deref().map(|p| (p, self.sfx_volume)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[derive(Debug, Clone)]
pub struct EncodeJob {
    /// printf-style frame pattern, e.g. `frames/frame_%06d.png`
    pub input_pattern: PathBuf,
    pub fps: u32,
    pub audio: AudioMix,
    pub output: PathBuf,
}

/// Full ffmpeg argument list for a job, without the binary itself.
pub fn build_args(job: &EncodeJob) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-framerate".into(),
        job.fps.to_string(),
        "-i".into(),
        job.input_pattern.display().to_string(),
    ];

    let tracks = job.audio.tracks();
    for (path, _) in &tracks {
        args.push("-i".into());
        args.push(path.display().to_string());
    }

    if !tracks.is_empty() {
        let mut filter: Vec<String> = tracks
            .iter()
            .enumerate()
            .map(|(i, (_, volume))| {
                let label = if tracks.len() == 1 {
                    "aout".to_string()
                } else {
                    format!("a{}", i + 1)
                };
                format!("[{}:a]volume={volume}[{label}]", i + 1)
            })
            .collect();
        if tracks.len() > 1 {
            let inputs: String = (1..=tracks.len()).map(|i| format!("[a{i}]")).collect();
            filter.push(format!(
                "{inputs}amix=inputs={}:duration=longest[aout]",
                tracks.len()
            ));
        }
        args.push("-filter_complex".into());
        args.push(filter.join(";"));
    }

    args.extend(["-map".into(), "0:v".into()]);
    if !tracks.is_empty() {
        args.extend(["-map".into(), "[aout]".into()]);
    }

    args.extend(
        [
            "-c:v", "libx264", "-pix_fmt", "yuv420p", "-preset", "medium", "-crf", "23",
        ]
        .map(String::from),
    );
    if !tracks.is_empty() {
        args.push("-shortest".into());
    }
    args.push(job.output.display().to_string());
    args
}

/// Resolve the ffmpeg binary. An explicit path must work; otherwise try
/// `ffmpeg` on PATH, then the bundled static build.
pub async fn locate_ffmpeg(explicit: Option<&Path>) -> Result<PathBuf, WorkerError> {
    if let Some(path) = explicit {
        if probe(path).await {
            return Ok(path.to_path_buf());
        }
        return Err(WorkerError::Encoder(format!(
            "FFMPEG_PATH {} is not a working ffmpeg",
            path.display()
        )));
    }

    for candidate in ["ffmpeg", BUNDLED_FFMPEG] {
        let path = PathBuf::from(candidate);
        if probe(&path).await {
            info!(ffmpeg = %path.display(), "Using ffmpeg");
            return Ok(path);
        }
    }
    Err(WorkerError::Encoder(format!(
        "ffmpeg not found on PATH or at {BUNDLED_FFMPEG}"
    )))
}

async fn probe(path: &Path) -> bool {
    Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run ffmpeg for `job`. Fails on a non-zero exit or a missing/empty output file.
pub async fn encode(ffmpeg: &Path, job: &EncodeJob) -> Result<u64, WorkerError> {
    if let Some(parent) = job.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let args = build_args(job);
    debug!(ffmpeg = %ffmpeg.display(), ?args, "Running ffmpeg");

    let output = Command::new(ffmpeg)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| WorkerError::Encoder(format!("Failed to start {}: {e}", ffmpeg.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(WorkerError::Encoder(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            stderr_tail(&stderr, STDERR_TAIL_LINES)
        )));
    }

    let size = match tokio::fs::metadata(&job.output).await {
        Ok(meta) if meta.len() > 0 => meta.len(),
        _ => return Err(WorkerError::EncoderOutputMissing(job.output.clone())),
    };
    info!(output = %job.output.display(), bytes = size, "Video encoded");
    Ok(size)
}

/// Last `n` non-empty lines of ffmpeg's stderr.
fn stderr_tail(stderr: &str, n: usize) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("puzzle_reel_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn job(audio: AudioMix) -> EncodeJob {
        EncodeJob {
            input_pattern: PathBuf::from("frames/frame_%06d.png"),
            fps: 30,
            audio,
            output: PathBuf::from("out.mp4"),
        }
    }

    #[test]
    fn test_args_without_audio() {
        let args = build_args(&job(AudioMix::default()));
        assert_eq!(
            args.join(" "),
            "-y -framerate 30 -i frames/frame_%06d.png -map 0:v -c:v libx264 \
             -pix_fmt yuv420p -preset medium -crf 23 out.mp4"
        );
    }

    #[test]
    fn test_args_with_music_and_sfx() {
        let args = build_args(&job(AudioMix {
            music: Some(PathBuf::from("bg_music.mp3")),
            music_volume: 0.2,
            sfx: Some(PathBuf::from("move.mp3")),
            sfx_volume: 0.5,
        }));
        let filter_at = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(
            args[filter_at + 1],
            "[1:a]volume=0.2[a1];[2:a]volume=0.5[a2];[a1][a2]amix=inputs=2:duration=longest[aout]"
        );
        assert!(args.windows(2).any(|w| w == ["-map", "[aout]"]));
        assert_eq!(args[args.len() - 2], "-shortest");
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_args_with_single_track() {
        let args = build_args(&job(AudioMix {
            sfx: Some(PathBuf::from("move.mp3")),
            sfx_volume: 0.5,
            ..Default::default()
        }));
        let filter_at = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(args[filter_at + 1], "[1:a]volume=0.5[aout]");
        assert!(args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn test_stderr_tail() {
        let stderr = "a\n\nb\nc\nd\n";
        assert_eq!(stderr_tail(stderr, 2), "c\nd");
        assert_eq!(stderr_tail(stderr, 10), "a\nb\nc\nd");
    }

    #[tokio::test]
    async fn test_explicit_missing_binary_is_an_error() {
        let err = locate_ffmpeg(Some(Path::new("/nonexistent/ffmpeg")))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Encoder(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_encoder_reports_exit() {
        let sh = Path::new("/bin/sh");
        if !sh.exists() {
            return;
        }
        let dir = scratch_dir("encoder_1");
        let mut job = job(AudioMix::default());
        job.output = dir.join("out.mp4");

        // sh rejects ffmpeg's flags and exits non-zero
        let err = encode(sh, &job).await.unwrap_err();
        assert!(matches!(err, WorkerError::Encoder(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_output_is_an_error() {
        let truth = Path::new("/bin/true");
        if !truth.exists() {
            return;
        }
        let dir = scratch_dir("encoder_2");
        let mut job = job(AudioMix::default());
        job.output = dir.join("nested/out.mp4");

        let err = encode(truth, &job).await.unwrap_err();
        assert!(matches!(err, WorkerError::EncoderOutputMissing(_)));
    }
}
