//! Export a trained model state file into a binary artifact for the inference runtime.

use std::path::PathBuf;

use tm_export::config::{LayoutOverrides, resolve_config};
use tm_export::export::{
    ArtifactHeader, ClauseLayout, ExportLayout, WeightLayout, export_snapshot, manifest_path_for,
};
use tm_export::logging;
use tm_export::model::load_model_state;

fn main() {
    if let Err(err) = logging::init("tm-export") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    let config = resolve_config(options.config_path.as_deref(), &options.overrides)
        .map_err(|err| err.to_string())?;
    let export_options = config.export_options();

    let snapshot = load_model_state(&options.model_path).map_err(|err| err.to_string())?;
    let summary = export_snapshot(&snapshot, &options.out_path, &export_options)
        .map_err(|err| err.to_string())?;

    let header = ArtifactHeader::for_snapshot(&snapshot);
    println!("Wrote {}", summary.path.display());
    println!("  size:       {} bytes", summary.bytes_written);
    println!(
        "  model:      {} clauses, {} classes, {} literals, threshold {}, boost {}",
        header.n_clauses, header.n_classes, header.n_literals, header.threshold, header.boost_flag
    );
    println!(
        "  layout:     weights={:?} clauses={:?}",
        summary.layout.weights, summary.layout.clauses
    );
    println!("  blake3:     {}", summary.checksum);
    if export_options.write_manifest {
        println!(
            "  manifest:   {}",
            manifest_path_for(&options.out_path).display()
        );
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    model_path: PathBuf,
    out_path: PathBuf,
    config_path: Option<PathBuf>,
    overrides: LayoutOverrides,
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut model_path: Option<PathBuf> = None;
    let mut out_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut overrides = LayoutOverrides::default();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model_path = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                out_path = Some(PathBuf::from(value));
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            "--preset" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--preset requires a value".to_string())?;
                overrides.preset = Some(
                    ExportLayout::preset(value)
                        .ok_or_else(|| format!("Invalid --preset value: {value}"))?,
                );
            }
            "--weights" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--weights requires a value".to_string())?;
                overrides.weights = Some(
                    WeightLayout::parse(value)
                        .ok_or_else(|| format!("Invalid --weights value: {value}"))?,
                );
            }
            "--clauses" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--clauses requires a value".to_string())?;
                overrides.clauses = Some(
                    ClauseLayout::parse(value)
                        .ok_or_else(|| format!("Invalid --clauses value: {value}"))?,
                );
            }
            "--manifest" => overrides.write_manifest = Some(true),
            "--no-manifest" => overrides.write_manifest = Some(false),
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let model_path = model_path.ok_or_else(|| format!("--model is required\n\n{}", help_text()))?;
    let out_path = out_path.ok_or_else(|| format!("--out is required\n\n{}", help_text()))?;
    Ok(Some(CliOptions {
        model_path,
        out_path,
        config_path,
        overrides,
    }))
}

fn help_text() -> String {
    [
        "tm-export",
        "",
        "Writes a trained model state (JSON) as a binary artifact for the inference runtime.",
        "",
        "Usage:",
        "  tm-export --model <state.json> --out <model.bin> [options]",
        "",
        "Options:",
        "  --config <file>        Export config (TOML). Defaults to <config dir>/.tm-export/export.toml if present.",
        "  --preset <name>        identity | transposed-interleaved",
        "  --weights <layout>     clause-major | class-major",
        "  --clauses <layout>     block | interleaved",
        "  --manifest             Write <out>.manifest.json next to the artifact (default).",
        "  --no-manifest          Skip the manifest.",
        "",
        "The layout must match what the consuming runtime expects; it is never guessed.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_layout_flags() {
        let options = parse_args(args(&[
            "--model",
            "state.json",
            "--out",
            "model.bin",
            "--weights",
            "class-major",
            "--clauses",
            "block",
            "--no-manifest",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(options.overrides.weights, Some(WeightLayout::ClassMajor));
        assert_eq!(options.overrides.clauses, Some(ClauseLayout::Block));
        assert_eq!(options.overrides.write_manifest, Some(false));
    }

    #[test]
    fn rejects_unknown_preset() {
        let err = parse_args(args(&["--preset", "auto"])).unwrap_err();
        assert!(err.contains("Invalid --preset value: auto"));
    }

    #[test]
    fn requires_output_path() {
        let err = parse_args(args(&["--model", "state.json"])).unwrap_err();
        assert!(err.starts_with("--out is required"));
    }
}
