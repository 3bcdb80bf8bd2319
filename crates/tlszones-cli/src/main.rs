//! tlszones: batch CLI for tumor-margin zoning and TLS classification.
//!
//! Reads one or more annotation documents (JSON), zones each one
//! independently, and writes the zoned document back out. Per-document
//! diagnostics are printed as a report or as JSON.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin tlszones -- [OPTIONS] <DOCUMENT>...
//! ```
//!
//! Set `RUST_LOG=debug` for per-stage logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tlszones_core::{
    DuplicatePolicy, InMemoryHost, NoOverlapPolicy, StdClock, ZoneMap, ZoningConfig,
    ZoningDiagnostics, ZoningReport, run_with_diagnostics,
};

/// Zone tumor annotation documents and classify TLS regions.
///
/// Each document is zoned on its own; a failing document is reported and
/// skipped without affecting the rest of the batch.
#[derive(Parser)]
#[command(name = "tlszones", version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Annotation documents to zone.
    #[arg(required = true)]
    documents: Vec<PathBuf>,

    /// Margin distance in physical units (e.g. µm).
    #[arg(long, default_value_t = ZoningConfig::DEFAULT_MARGIN_DISTANCE)]
    margin: f64,

    /// Label identifying the tumor outline.
    #[arg(long, default_value = ZoningConfig::DEFAULT_TUMOR_LABEL)]
    tumor_label: String,

    /// Label identifying the tissue outline.
    #[arg(long, default_value = ZoningConfig::DEFAULT_TISSUE_LABEL)]
    tissue_label: String,

    /// Label identifying candidate regions.
    #[arg(long, default_value = ZoningConfig::DEFAULT_CANDIDATE_LABEL)]
    candidate_label: String,

    /// Leave the created zone annotations unlocked.
    #[arg(long)]
    no_lock: bool,

    /// Keep the tumor and tissue annotations after zoning.
    #[arg(long)]
    keep_sources: bool,

    /// Use the first annotation when a tumor or tissue label is repeated.
    #[arg(long)]
    first_match: bool,

    /// Assign candidates overlapping no zone by tie-break priority.
    #[arg(long)]
    priority_fallback: bool,

    /// Full zoning config as a JSON string.
    ///
    /// When provided, all other zoning parameter flags are ignored.
    /// The JSON must be a valid `ZoningConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Directory for zoned documents (defaults to next to each input).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Also write an SVG preview next to each zoned document.
    #[arg(long)]
    svg: bool,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,
}

/// Build a [`ZoningConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. The result is validated either
/// way so a bad config fails before any document is read.
fn config_from_cli(cli: &Cli) -> Result<ZoningConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        ZoningConfig {
            margin_distance: cli.margin,
            lock_new_annotations: !cli.no_lock,
            remove_source_annotations: !cli.keep_sources,
            tumor_label: cli.tumor_label.clone(),
            tissue_label: cli.tissue_label.clone(),
            candidate_label: cli.candidate_label.clone(),
            duplicate_policy: if cli.first_match {
                DuplicatePolicy::FirstMatch
            } else {
                DuplicatePolicy::Reject
            },
            no_overlap_policy: if cli.priority_fallback {
                NoOverlapPolicy::PriorityFallback
            } else {
                NoOverlapPolicy::Unclassified
            },
            ..ZoningConfig::default()
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Where the zoned document for `input` is written.
fn output_path(input: &Path, output_dir: Option<&Path>, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let dir = output_dir
        .or_else(|| input.parent())
        .unwrap_or_else(|| Path::new("."));
    dir.join(format!("{stem}.zoned.{extension}"))
}

/// Read, zone and write a single document.
fn process_document(
    path: &Path,
    cli: &Cli,
    config: &ZoningConfig,
) -> Result<(ZoningReport, ZoningDiagnostics), String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let mut host: InMemoryHost = serde_json::from_str(&json)
        .map_err(|e| format!("Error parsing {}: {e}", path.display()))?;
    log::info!(
        "{}: {} annotations",
        path.display(),
        host.annotations.len()
    );

    let (report, diagnostics) = run_with_diagnostics(&mut host, config, &StdClock)
        .map_err(|e| format!("Zoning error in {}: {e}", path.display()))?;

    let out = output_path(path, cli.output_dir.as_deref(), "json");
    let zoned = serde_json::to_string_pretty(&host)
        .map_err(|e| format!("Error serializing {}: {e}", path.display()))?;
    std::fs::write(&out, zoned).map_err(|e| format!("Error writing {}: {e}", out.display()))?;
    eprintln!("Zoned document written to {}", out.display());

    if cli.svg {
        write_svg(path, cli, config, &host, &report);
    }

    Ok((report, diagnostics))
}

/// Write the SVG preview. Failures are reported but do not fail the
/// document, since the zoned JSON has already been written.
fn write_svg(
    path: &Path,
    cli: &Cli,
    config: &ZoningConfig,
    host: &InMemoryHost,
    report: &ZoningReport,
) {
    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let desc = format!(
        "margin {} physical units ({:.1} px), calibration {:.4}/px",
        config.margin_distance,
        report.margin,
        report.calibration.get(),
    );
    let config_json = serde_json::to_string(config).ok();
    let metadata = tlszones_export::SvgMetadata {
        title: Some(title),
        description: Some(&desc),
        config_json: config_json.as_deref(),
    };
    let overlays = tlszones_export::candidate_overlays(host, &report.classification);
    let svg = tlszones_export::to_svg(&report.zones, &config.zone_styles, &overlays, &metadata);

    let svg_path = output_path(path, cli.output_dir.as_deref(), "svg");
    match std::fs::write(&svg_path, &svg) {
        Ok(()) => {
            eprintln!(
                "SVG written to {} ({} bytes)",
                svg_path.display(),
                svg.len(),
            );
        }
        Err(e) => {
            eprintln!("Error writing SVG to {}: {e}", svg_path.display());
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    log::debug!("config: {config:?}");

    let mut succeeded = Vec::with_capacity(cli.documents.len());
    let mut failed = 0_usize;

    for (index, path) in cli.documents.iter().enumerate() {
        if cli.documents.len() > 1 {
            eprintln!(
                "--- {} ({}/{}) ---",
                path.display(),
                index + 1,
                cli.documents.len()
            );
        }

        match process_document(path, &cli, &config) {
            Ok((_, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => eprintln!("Error serializing diagnostics: {e}"),
                    }
                } else {
                    println!("{}", diagnostics.report());
                }
                succeeded.push(diagnostics);
            }
            Err(msg) => {
                eprintln!("{msg}");
                failed += 1;
            }
        }
    }

    if cli.documents.len() > 1 {
        print_batch_summary(&succeeded, failed);
    }

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Print candidate totals across every successfully zoned document.
fn print_batch_summary(all_diagnostics: &[ZoningDiagnostics], failed: usize) {
    println!();
    println!(
        "Batch summary ({} zoned, {failed} failed)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let totals = all_diagnostics
        .iter()
        .fold(ZoneMap::<usize>::default(), |acc, d| {
            acc.map(|zone, n| n + d.summary.zone_counts.get(zone))
        });
    let outside: usize = all_diagnostics
        .iter()
        .map(|d| d.summary.no_overlap_count)
        .sum();

    println!("{:<16} {:>10}", "Zone", "Candidates");
    println!("{}", "-".repeat(28));
    for (zone, count) in totals.iter() {
        println!("{:<16} {count:>10}", zone.to_string());
    }
    println!("{:<16} {outside:>10}", "Without overlap");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tlszones").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn output_defaults_next_to_input() {
        let out = output_path(Path::new("slides/case-7.json"), None, "json");
        assert_eq!(out, PathBuf::from("slides/case-7.zoned.json"));
    }

    #[test]
    fn output_dir_overrides_location() {
        let out = output_path(Path::new("slides/case-7.json"), Some(Path::new("out")), "svg");
        assert_eq!(out, PathBuf::from("out/case-7.zoned.svg"));
    }

    #[test]
    fn flags_build_config() {
        let cli = parse(&["--margin", "250", "--keep-sources", "--first-match", "a.json"]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.margin_distance - 250.0).abs() < f64::EPSILON);
        assert!(!config.remove_source_annotations);
        assert!(config.lock_new_annotations);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::FirstMatch);
        assert_eq!(config.no_overlap_policy, NoOverlapPolicy::Unclassified);
    }

    #[test]
    fn config_json_replaces_flags() {
        let cli = parse(&[
            "--margin",
            "250",
            "--config-json",
            r#"{"margin_distance": 75.0}"#,
            "a.json",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.margin_distance - 75.0).abs() < f64::EPSILON);
        assert_eq!(config.tumor_label, ZoningConfig::DEFAULT_TUMOR_LABEL);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cli = parse(&["--margin=-5", "a.json"]);
        assert!(config_from_cli(&cli).is_err());
    }
}
