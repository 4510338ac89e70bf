//! Command implementations

use std::fmt::Write as _;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::adapters::toml_config::ConverterConfig;
use crate::app::{AppContainer, CancelHandle};
use crate::cli::args::{ConvertArgs, InspectArgs, ReportFormat, VerifyArgs};
use crate::domain::errors::ErrorClassifier;
use crate::domain::model::{Linkage, SourceVideo};
use crate::domain::usecases::{
    BatchReport, CompatibilityReport, ConvertRequest, JobOutcome, PairVerification,
};
use crate::ports::ChannelProgress;
use crate::utils::path::PathUtils;
use crate::utils::Utils;

/// Execute the convert command. Returns whether every job succeeded.
pub async fn convert(
    container: &dyn AppContainer,
    config: &ConverterConfig,
    args: ConvertArgs,
) -> Result<bool> {
    let inputs = PathUtils::expand_inputs(&args.inputs);
    if inputs.is_empty() {
        anyhow::bail!("No video files found in the given inputs");
    }
    let profile = config.quality().context("Invalid quality profile")?;
    let request = ConvertRequest::new(inputs.into_iter().map(SourceVideo::new).collect(), profile)
        .context("Invalid convert request")?;
    info!(
        "Converting {} video(s) into {}",
        request.sources.len(),
        config.library_dir.display()
    );

    let (sink, mut updates) = ChannelProgress::new();
    let progress_task = tokio::spawn(async move {
        let mut last_percent = None;
        while let Some(update) = updates.recv().await {
            let percent = (update.fraction * 100.0).floor() as u32;
            if last_percent != Some(percent) {
                info!(job = update.job_index, "Progress {}%", percent);
                last_percent = Some(percent);
            }
        }
    });

    let (cancel, token) = CancelHandle::new();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current phase of each job");
            cancel.cancel();
        }
    });

    let report = container
        .convert_interactor()
        .execute(request, std::sync::Arc::new(sink), token)
        .await;
    interrupt.abort();
    // The interactor and its sink are gone, so the progress stream ends
    let _ = progress_task.await;

    print!("{}", render_batch(&report));
    match report.into_result() {
        Ok(ids) => {
            info!("Stored {} asset(s)", ids.len());
            Ok(true)
        }
        Err(failure) => {
            warn!("Conversion failed: {}", failure.error);
            Ok(false)
        }
    }
}

/// Execute the inspect command. Returns whether the input can be converted.
pub async fn inspect(container: &dyn AppContainer, args: InspectArgs) -> Result<bool> {
    let report = container.inspect_interactor().execute(args.input).await;
    let rendered = match args.format {
        ReportFormat::Text => render_compatibility(&report),
        ReportFormat::Json => serde_json::to_string_pretty(&report)
            .context("Failed to serialize report as JSON")?
            + "\n",
        ReportFormat::Yaml => {
            serde_yaml::to_string(&report).context("Failed to serialize report as YAML")?
        }
    };
    print!("{}", rendered);
    Ok(report.is_compatible())
}

/// Execute the verify command. Returns whether the pair is linked.
pub async fn verify(container: &dyn AppContainer, args: VerifyArgs) -> Result<bool> {
    match container
        .verify_interactor()
        .execute(&args.image, &args.clip)
        .await
    {
        Ok(check) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&check)
                        .context("Failed to serialize verification as JSON")?
                );
            } else {
                print!("{}", render_verification(&check));
            }
            Ok(check.is_linked())
        }
        Err(error) => {
            let report = ErrorClassifier::report(&error);
            println!("[{}] {}: {}", report.severity, report.kind, report.message);
            for suggestion in &report.suggestions {
                println!("  - {}", suggestion);
            }
            Ok(false)
        }
    }
}

fn render_batch(report: &BatchReport) -> String {
    let mut out = String::new();
    for job in &report.jobs {
        render_job(&mut out, job);
    }
    out
}

fn render_job(out: &mut String, job: &JobOutcome) {
    let name = job.source.display_name();
    match &job.result {
        Ok(success) => {
            let _ = writeln!(
                out,
                "OK    {}  asset {}  ({} tier, {}, {} from {})",
                name,
                success.asset_id,
                success.tier,
                match success.linkage {
                    Linkage::Linked => "linked",
                    Linkage::Degraded => "unlinked",
                },
                Utils::format_seconds(success.range.duration_seconds),
                Utils::format_seconds(success.range.start_seconds)
            );
            for warning in &success.warnings {
                let _ = writeln!(out, "      [{}] {}", warning.severity, warning.message);
            }
        }
        Err(failure) => {
            let _ = writeln!(
                out,
                "FAIL  {}  {}: {}",
                name, failure.report.title, failure.report.message
            );
            for suggestion in &failure.report.suggestions {
                let _ = writeln!(out, "      - {}", suggestion);
            }
            if failure.report.retryable {
                let _ = writeln!(out, "      (retryable)");
            }
        }
    }
}

fn render_compatibility(report: &CompatibilityReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Source: {}", report.source.display());
    if let Some(probe) = &report.probe {
        let _ = writeln!(out, "Duration: {}", Utils::format_seconds(probe.duration_seconds));
        let _ = writeln!(
            out,
            "Video: {} {} @ {:.2} fps, rotation {}",
            probe.video_codec, probe.native_size, probe.frame_rate, probe.rotation
        );
        let _ = writeln!(out, "Display size: {}", probe.display_size());
        let _ = writeln!(out, "Audio: {}", if probe.has_audio { "yes" } else { "no" });
        let _ = writeln!(out, "Tracks: {}", probe.track_format_count);
        let _ = writeln!(out, "Size: {}", Utils::format_file_size(probe.file_size));
    }
    for diagnostic in &report.diagnostics {
        let _ = writeln!(
            out,
            "[{}] {}: {}",
            diagnostic.severity, diagnostic.kind, diagnostic.message
        );
    }
    let _ = writeln!(
        out,
        "Compatible: {}",
        if report.is_compatible() { "yes" } else { "no" }
    );
    out
}

fn render_verification(check: &PairVerification) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Image content identifier: {}",
        check.image_content_id.as_deref().unwrap_or("(none)")
    );
    let _ = writeln!(
        out,
        "Clip content identifier:  {}",
        check.clip_content_id.as_deref().unwrap_or("(none)")
    );
    let _ = writeln!(
        out,
        "Still image time: image {}, clip {}",
        check
            .image_still_time
            .map(|t| t.to_string())
            .unwrap_or_else(|| "(none)".to_string()),
        check.clip_still_time.as_deref().unwrap_or("(none)")
    );
    let _ = writeln!(
        out,
        "Live-photo flag: {}",
        if check.live_photo_flag { "set" } else { "missing" }
    );
    let _ = writeln!(
        out,
        "Linked: {}",
        if check.is_linked() { "yes" } else { "no" }
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::domain::usecases::{Diagnostic, JobFailure};
    use std::path::PathBuf;

    #[test]
    fn test_render_compatibility_without_probe() {
        let report = CompatibilityReport {
            source: PathBuf::from("missing.mov"),
            probe: None,
            diagnostics: vec![Diagnostic::from_error(&DomainError::FileNotFound(
                "missing.mov".to_string(),
            ))],
        };
        let text = render_compatibility(&report);
        assert!(text.contains("FileNotFound"));
        assert!(text.ends_with("Compatible: no\n"));
    }

    #[test]
    fn test_render_failed_job_lists_suggestions() {
        let failure = JobFailure::new(DomainError::NoVideoTrack("a.m4a".to_string()), None);
        let job = JobOutcome {
            index: 0,
            source: SourceVideo::new("a.m4a"),
            result: Err(failure.clone()),
        };
        let text = render_batch(&BatchReport { jobs: vec![job] });
        assert!(text.starts_with("FAIL  a.m4a"));
        for suggestion in &failure.report.suggestions {
            assert!(text.contains(suggestion.as_str()));
        }
    }
}
