//! FFmpeg command builder and process runner

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Output target that writes to the child's stdout
pub const PIPE_OUTPUT: &str = "pipe:1";
/// Lines of stderr kept in a failure report
const STDERR_TAIL_LINES: usize = 20;

/// Builder for FFmpeg commands
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Arguments placed before `-i`
    input_args: Vec<String>,
    /// Arguments placed after `-i`
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Input seek, placed before `-i`
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds.max(0.0)))
    }

    /// Input read duration
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Extract a single frame
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    /// Container-level metadata entry
    pub fn metadata(self, key: &str, value: &str) -> Self {
        self.output_arg("-metadata").output_arg(format!("{}={}", key, value))
    }

    /// Write custom metadata keys as QuickTime `mdta` items
    pub fn metadata_tags(self) -> Self {
        self.output_arg("-movflags").output_arg("use_metadata_tags")
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }
        args.push("-nostdin".to_string());
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// Which external tool a runner drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
}

impl Tool {
    fn default_program(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
        }
    }

    fn not_found(&self, detail: String) -> MediaError {
        match self {
            Tool::Ffmpeg => MediaError::FfmpegNotFound(detail),
            Tool::Ffprobe => MediaError::FfprobeNotFound(detail),
        }
    }

    fn failed(&self, message: String, stderr: Option<String>, code: Option<i32>) -> MediaError {
        match self {
            Tool::Ffmpeg => MediaError::ffmpeg_failed(message, stderr, code),
            Tool::Ffprobe => MediaError::FfprobeFailed { message, stderr },
        }
    }
}

/// Runs ffmpeg or ffprobe to completion. The executable is located lazily
/// so commands that never spawn a process work without it installed.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    tool: Tool,
    program: Option<PathBuf>,
}

impl ToolRunner {
    /// Runner for `tool`, using `program` instead of a `PATH` lookup when set
    pub fn new(tool: Tool, program: Option<PathBuf>) -> Self {
        Self { tool, program }
    }

    /// Resolve the executable path
    pub fn locate(&self) -> MediaResult<PathBuf> {
        let program = self
            .program
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.tool.default_program()));
        which::which(&program).map_err(|e| self.tool.not_found(format!("{}: {}", program.display(), e)))
    }

    /// Run an FFmpeg command, discarding its stdout
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_args(&cmd.build_args()).await.map(|_| ())
    }

    /// Run an FFmpeg command and collect its stdout
    pub async fn run_capture(&self, cmd: &FfmpegCommand) -> MediaResult<Vec<u8>> {
        self.run_args(&cmd.build_args()).await
    }

    /// Run the tool with raw arguments and collect its stdout
    pub async fn run_args(&self, args: &[String]) -> MediaResult<Vec<u8>> {
        let program = self.locate()?;
        debug!("Running {} {}", program.display(), args.join(" "));

        let output = Command::new(&program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    self.tool.not_found(program.display().to_string())
                } else {
                    MediaError::Io(e)
                }
            })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            let stderr = stderr_tail(&output.stderr);
            Err(self.tool.failed(
                format!(
                    "{} exited with {}",
                    self.tool.default_program(),
                    output.status
                ),
                (!stderr.is_empty()).then_some(stderr),
                output.status.code(),
            ))
        }
    }
}

/// Last lines of a tool's stderr
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mov")
            .seek(10.0)
            .duration(3.0)
            .video_codec("libx264")
            .crf(22)
            .metadata("com.apple.quicktime.live-photo", "1");

        let args = cmd.build_args();
        let pos = |needle: &str| args.iter().position(|a| a == needle).unwrap();
        assert!(pos("-ss") < pos("-i"));
        assert_eq!(args[pos("-ss") + 1], "10.000");
        assert_eq!(args[pos("-t") + 1], "3.000");
        assert_eq!(args[pos("-c:v") + 1], "libx264");
        assert!(args.contains(&"com.apple.quicktime.live-photo=1".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("output.mov"));
    }

    #[test]
    fn test_negative_seek_clamped() {
        let args = FfmpegCommand::new("a", "b").seek(-0.2).build_args();
        assert!(args.contains(&"0.000".to_string()));
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let text: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(text.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
    }

    #[tokio::test]
    async fn test_missing_program_reported() {
        let runner = ToolRunner::new(
            Tool::Ffprobe,
            Some(PathBuf::from("/nonexistent/bin/ffprobe")),
        );
        let err = runner.run_args(&[]).await.unwrap_err();
        assert!(matches!(err, MediaError::FfprobeNotFound(_)));
    }
}
