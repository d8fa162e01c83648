//! FFmpeg-backed video decoding and encoding.
//!
//! Frames travel as raw `rgb24` over the child process pipes. Both ends own
//! their child process and kill/reap it on drop, so every exit path releases
//! the input and output handles.

use std::{
    fs::File,
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::{FrameSink, FrameSource};
use crate::{
    config::VideoConfig,
    error::{AnalysisError, AnalysisResult},
    types::Frame,
};

const STDERR_TAIL_LINES: usize = 8;

/// Declared properties of the input video stream.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    #[serde(default)]
    tags: FfprobeTags,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

impl VideoInfo {
    /// Reads the first video stream out of `ffprobe -print_format json`
    /// output. Dimensions are the displayed ones, so a stream carrying a
    /// 90 degree rotation reports width and height swapped.
    pub fn from_ffprobe_json(json: &[u8], fallback_fps: f64) -> Result<Self, String> {
        let probe: FfprobeOutput =
            serde_json::from_slice(json).map_err(|err| format!("unreadable probe output: {err}"))?;
        let stream = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| "no video stream found".to_string())?;

        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => return Err("video stream reports no frame size".to_string()),
        };
        let (width, height) = if is_quarter_turn(stream) {
            (height, width)
        } else {
            (width, height)
        };

        let fps = stream
            .avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate));
        let fps = match fps {
            Some(fps) => fps,
            None => {
                log::warn!("FPS not detected, defaulting to {fallback_fps}");
                fallback_fps
            }
        };

        Ok(Self { width, height, fps })
    }
}

fn is_quarter_turn(stream: &FfprobeStream) -> bool {
    let rotation = stream
        .side_data_list
        .iter()
        .find_map(|sd| sd.rotation)
        .or_else(|| stream.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
        .unwrap_or(0.0);
    (rotation.round() as i64).rem_euclid(180) == 90
}

/// Parses `"30000/1001"` or `"29.97"`; zero and unparsable rates are `None`.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Runs ffprobe on `path`. Every failure here is an input error.
pub fn probe_video(config: &VideoConfig, path: &Path) -> AnalysisResult<VideoInfo> {
    if !path.exists() {
        return Err(AnalysisError::input(path, "file not found"));
    }
    let ffprobe = which::which(&config.ffprobe)
        .map_err(|_| AnalysisError::input(path, format!("{} not found in PATH", config.ffprobe)))?;

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "v:0",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|err| AnalysisError::input(path, format!("failed to run ffprobe: {err}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AnalysisError::input(
            path,
            format!("not a readable video: {}", stderr.trim()),
        ));
    }

    VideoInfo::from_ffprobe_json(&output.stdout, config.fallback_fps)
        .map_err(|message| AnalysisError::input(path, message))
}

/// Decodes every frame of a video, in order, at its native frame count.
/// FFmpeg scales any mid-stream resolution change to the probed size.
pub struct FfmpegReader {
    child: Child,
    stdout: ChildStdout,
    stderr_log: File,
    path: PathBuf,
    info: VideoInfo,
    frame_len: usize,
    next_index: u64,
    reaped: bool,
}

impl FfmpegReader {
    pub fn open(config: &VideoConfig, path: &Path) -> AnalysisResult<Self> {
        let info = probe_video(config, path)?;
        let ffmpeg = which::which(&config.ffmpeg)
            .map_err(|_| AnalysisError::input(path, format!("{} not found in PATH", config.ffmpeg)))?;
        let (stderr_log, stderr) =
            stderr_capture().map_err(|err| AnalysisError::input(path, err.to_string()))?;

        let mut child = Command::new(ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args([
                "-map", "0:v:0", "-vsync", "0", "-f", "rawvideo", "-pix_fmt", "rgb24", "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .spawn()
            .map_err(|err| AnalysisError::input(path, format!("failed to spawn ffmpeg: {err}")))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(AnalysisError::input(path, "ffmpeg stdout unavailable"));
        };

        log::info!(
            "video properties - width: {}, height: {}, fps: {:.3}",
            info.width,
            info.height,
            info.fps
        );

        Ok(Self {
            child,
            stdout,
            stderr_log,
            path: path.to_path_buf(),
            info,
            frame_len: info.width as usize * info.height as usize * 3,
            next_index: 0,
            reaped: false,
        })
    }

    fn read_frame_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(filled)
    }

    fn reap(&mut self) -> AnalysisResult<()> {
        self.reaped = true;
        let status = self.child.wait().map_err(|err| {
            AnalysisError::processing(self.next_index, format!("failed to wait for ffmpeg: {err}"))
        })?;
        if !status.success() {
            return Err(AnalysisError::processing(
                self.next_index,
                format!(
                    "decoder exited with {status}: {}",
                    stderr_tail(&mut self.stderr_log)
                ),
            ));
        }
        Ok(())
    }
}

impl FrameSource for FfmpegReader {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn next_frame(&mut self) -> AnalysisResult<Option<Frame>> {
        if self.reaped {
            return Ok(None);
        }

        let index = self.next_index;
        let mut buf = vec![0u8; self.frame_len];
        let filled = self.read_frame_bytes(&mut buf).map_err(|err| {
            AnalysisError::processing(index, format!("failed to read decoded frame: {err}"))
        })?;

        if filled == 0 {
            self.reap()?;
            return Ok(None);
        }
        if filled < self.frame_len {
            return Err(AnalysisError::processing(
                index,
                format!("truncated frame: got {filled} of {} bytes", self.frame_len),
            ));
        }

        let image = RgbImage::from_raw(self.info.width, self.info.height, buf).ok_or_else(|| {
            AnalysisError::processing(index, "decoded buffer does not match frame size")
        })?;
        self.next_index += 1;
        Ok(Some(Frame::new(index, image)))
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Encodes frames into a new video file with the input's size and rate.
pub struct FfmpegWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_log: File,
    path: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
    finished: bool,
}

impl FfmpegWriter {
    pub fn create(config: &VideoConfig, path: &Path, info: &VideoInfo) -> AnalysisResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(AnalysisError::output(
                    path,
                    format!("directory {} does not exist", parent.display()),
                ));
            }
        }
        let ffmpeg = which::which(&config.ffmpeg).map_err(|_| {
            AnalysisError::output(path, format!("{} not found in PATH", config.ffmpeg))
        })?;
        let (stderr_log, stderr) =
            stderr_capture().map_err(|err| AnalysisError::output(path, err.to_string()))?;

        let mut child = Command::new(ffmpeg)
            .args(["-v", "error", "-y", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{}x{}", info.width, info.height))
            .arg("-r")
            .arg(format!("{}", info.fps))
            .args(["-i", "-", "-an", "-c:v"])
            .arg(&config.codec)
            .arg("-q:v")
            .arg(config.quality.to_string())
            .args(["-pix_fmt", "yuv420p"])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(stderr)
            .spawn()
            .map_err(|err| AnalysisError::output(path, format!("failed to spawn ffmpeg: {err}")))?;

        let stdin = child.stdin.take();
        if stdin.is_none() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(AnalysisError::output(path, "ffmpeg stdin unavailable"));
        }

        Ok(Self {
            child,
            stdin,
            stderr_log,
            path: path.to_path_buf(),
            width: info.width,
            height: info.height,
            frames_written: 0,
            finished: false,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl FrameSink for FfmpegWriter {
    fn write_frame(&mut self, frame: &Frame) -> AnalysisResult<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(AnalysisError::processing(
                frame.index,
                format!(
                    "frame is {}x{}, encoder expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.width,
                    self.height
                ),
            ));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(AnalysisError::processing(frame.index, "encoder already closed"));
        };
        if let Err(err) = stdin.write_all(frame.image.as_raw()) {
            return Err(AnalysisError::processing(
                frame.index,
                format!(
                    "failed to encode frame: {err}: {}",
                    stderr_tail(&mut self.stderr_log)
                ),
            ));
        }
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> AnalysisResult<()> {
        // Closing stdin lets ffmpeg flush and write the trailer.
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|err| AnalysisError::output(&self.path, format!("failed to wait for ffmpeg: {err}")))?;
        if !status.success() {
            return Err(AnalysisError::output(
                &self.path,
                format!(
                    "encoder exited with {status}: {}",
                    stderr_tail(&mut self.stderr_log)
                ),
            ));
        }
        self.finished = true;
        log::info!(
            "wrote {} frames to {}",
            self.frames_written,
            self.path.display()
        );
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        if self.path.exists() {
            log::warn!("removing incomplete output {}", self.path.display());
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn stderr_capture() -> std::io::Result<(File, Stdio)> {
    let log = tempfile::tempfile()?;
    let handle = log.try_clone()?;
    Ok((log, Stdio::from(handle)))
}

fn stderr_tail(log: &mut File) -> String {
    let mut text = String::new();
    if log.seek(SeekFrom::Start(0)).is_err() || log.read_to_string(&mut text).is_err() {
        return "no diagnostics available".to_string();
    }
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return "no diagnostics available".to_string();
    }
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_json(stream: &str) -> Vec<u8> {
        format!(r#"{{"streams": [{{"codec_type": "audio"}}, {stream}]}}"#).into_bytes()
    }

    #[test]
    fn parses_declared_properties() {
        let json = probe_json(
            r#"{"codec_type": "video", "width": 1280, "height": 720,
                "avg_frame_rate": "30000/1001", "r_frame_rate": "30/1"}"#,
        );
        let info = VideoInfo::from_ffprobe_json(&json, 30.0).unwrap();
        assert_eq!((info.width, info.height), (1280, 720));
        assert!((info.fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn missing_or_zero_fps_falls_back() {
        let json = probe_json(
            r#"{"codec_type": "video", "width": 640, "height": 480,
                "avg_frame_rate": "0/0", "r_frame_rate": "0/0"}"#,
        );
        let info = VideoInfo::from_ffprobe_json(&json, 30.0).unwrap();
        assert_eq!(info.fps, 30.0);

        let json = probe_json(r#"{"codec_type": "video", "width": 640, "height": 480}"#);
        assert_eq!(VideoInfo::from_ffprobe_json(&json, 24.0).unwrap().fps, 24.0);
    }

    #[test]
    fn rotated_phone_footage_reports_display_size() {
        let json = probe_json(
            r#"{"codec_type": "video", "width": 1920, "height": 1080, "avg_frame_rate": "60/1",
                "side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]}"#,
        );
        let info = VideoInfo::from_ffprobe_json(&json, 30.0).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));

        let json = probe_json(
            r#"{"codec_type": "video", "width": 1920, "height": 1080, "avg_frame_rate": "60/1",
                "tags": {"rotate": "180"}}"#,
        );
        let info = VideoInfo::from_ffprobe_json(&json, 30.0).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
    }

    #[test]
    fn rejects_files_without_video() {
        let json = br#"{"streams": [{"codec_type": "audio"}]}"#;
        let err = VideoInfo::from_ffprobe_json(json, 30.0).unwrap_err();
        assert_eq!(err, "no video stream found");

        let json = probe_json(r#"{"codec_type": "video", "width": 0, "height": 480}"#);
        assert!(VideoInfo::from_ffprobe_json(&json, 30.0).is_err());
        assert!(VideoInfo::from_ffprobe_json(b"not json", 30.0).is_err());
    }

    #[test]
    fn frame_rate_strings() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("29.97"), Some(29.97));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("0"), None);
        assert_eq!(parse_frame_rate("n/a"), None);
    }

    /// Stands in for ffmpeg: creates the output file (its last argument),
    /// swallows stdin and exits with `code`.
    #[cfg(unix)]
    fn fake_encoder(dir: &Path, code: i32) -> VideoConfig {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join(format!("ffmpeg-exit-{code}"));
        std::fs::write(
            &script,
            format!("#!/bin/sh\nfor last; do :; done\n: > \"$last\"\ncat > /dev/null\nexit {code}\n"),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        VideoConfig {
            ffmpeg: script.to_string_lossy().into_owned(),
            ..VideoConfig::default()
        }
    }

    #[cfg(unix)]
    fn write_one_frame(config: &VideoConfig, output: &Path) -> AnalysisResult<()> {
        let info = VideoInfo {
            width: 4,
            height: 2,
            fps: 30.0,
        };
        let mut writer = FfmpegWriter::create(config, output, &info)?;
        writer.write_frame(&Frame::new(0, RgbImage::new(4, 2)))?;
        writer.finish()
    }

    #[cfg(unix)]
    #[test]
    fn failed_encoder_leaves_no_output_behind() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("skeleton_run.mp4");

        let err = write_one_frame(&fake_encoder(dir.path(), 1), &output).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Output);
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn finished_output_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("skeleton_run.mp4");

        write_one_frame(&fake_encoder(dir.path(), 0), &output).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn missing_input_is_an_input_error() {
        let err = probe_video(&VideoConfig::default(), Path::new("no/such/run.mp4")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
        assert!(err.to_string().contains("no/such/run.mp4"));
    }
}
