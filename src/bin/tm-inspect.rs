//! Developer utility to inspect an exported model artifact.

use std::path::PathBuf;

use tm_export::export::{
    ArtifactHeader, ClauseLayout, ExportLayout, HEADER_LEN, ManifestCheck, WeightLayout,
    decode_artifact, load_manifest,
};
use tm_export::logging;
use tm_export::model::{ModelSnapshot, Polarity};

fn main() {
    if let Err(err) = logging::init("tm-inspect") {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    artifact_path: PathBuf,
    weights: Option<WeightLayout>,
    clauses: Option<ClauseLayout>,
    clause: Option<usize>,
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    let bytes = std::fs::read(&options.artifact_path)
        .map_err(|err| format!("Failed to read {}: {err}", options.artifact_path.display()))?;
    println!("Artifact: {}", options.artifact_path.display());
    println!("Size: {} bytes", bytes.len());

    let header_bytes = bytes
        .first_chunk::<HEADER_LEN>()
        .ok_or_else(|| format!("File is shorter than the {HEADER_LEN}-byte header"))?;
    let header = ArtifactHeader::decode(header_bytes);
    print_header(&header, bytes.len() as u64);

    let manifest = load_manifest(&options.artifact_path).map_err(|err| err.to_string())?;
    let manifest_layout = match &manifest {
        Some(manifest) => {
            let status = match manifest.verify(&bytes) {
                ManifestCheck::Match => "ok",
                ManifestCheck::LengthMismatch => "LENGTH MISMATCH",
                ManifestCheck::ChecksumMismatch => "CHECKSUM MISMATCH",
                ManifestCheck::HeaderMismatch => "HEADER MISMATCH",
            };
            println!();
            println!("Manifest: {status}");
            println!(
                "  layout: weights={:?} clauses={:?}",
                manifest.layout.weights, manifest.layout.clauses
            );
            println!("  blake3: {}", manifest.blake3);
            Some(manifest.layout)
        }
        None => {
            println!();
            println!("Manifest: none (layout unknown unless given with --weights/--clauses)");
            None
        }
    };

    let weights = options.weights.or(manifest_layout.map(|layout| layout.weights));
    let clauses = options.clauses.or(manifest_layout.map(|layout| layout.clauses));
    let (Some(weights), Some(clauses)) = (weights, clauses) else {
        return Ok(());
    };
    let snapshot = decode_artifact(&bytes, ExportLayout { weights, clauses })
        .map_err(|err| err.to_string())?;
    print_summary(&snapshot);
    if let Some(clause) = options.clause {
        print_clause(&snapshot, clause)?;
    }
    Ok(())
}

fn print_header(header: &ArtifactHeader, actual_len: u64) {
    println!();
    println!("Header:");
    println!("  threshold:  {}", header.threshold);
    println!("  n_literals: {}", header.n_literals);
    println!("  n_clauses:  {}", header.n_clauses);
    println!("  n_classes:  {}", header.n_classes);
    println!("  max_state:  {}", header.max_state);
    println!("  min_state:  {}", header.min_state);
    println!("  boost_flag: {}", header.boost_flag);
    match header.artifact_len() {
        Some(expected) if expected == actual_len => println!("  length:     ok"),
        Some(expected) => println!("  length:     expected {expected} bytes"),
        None => println!("  length:     header dimensions are negative"),
    }
}

fn print_summary(snapshot: &ModelSnapshot) {
    let weights = snapshot.weights();
    let clauses = snapshot.clauses();
    let weight_min = weights.iter().copied().min().unwrap_or_default();
    let weight_max = weights.iter().copied().max().unwrap_or_default();
    let positive_states = clauses.iter().filter(|state| **state > 0).count();
    println!();
    println!("Payloads:");
    println!("  weights: min={weight_min} max={weight_max}");
    println!(
        "  states:  {positive_states} of {} above zero",
        clauses.len()
    );
}

fn print_clause(snapshot: &ModelSnapshot, clause: usize) -> Result<(), String> {
    if clause >= snapshot.n_clauses() {
        return Err(format!(
            "Clause {clause} out of range (model has {})",
            snapshot.n_clauses()
        ));
    }
    println!();
    println!("Clause {clause} (literal: positive / negated):");
    for literal in 0..snapshot.n_literals() {
        let positive = snapshot.state(clause, literal, Polarity::Positive).unwrap_or_default();
        let negated = snapshot.state(clause, literal, Polarity::Negated).unwrap_or_default();
        println!("  {literal:>5}: {positive:>4} / {negated:>4}");
    }
    let weights = (0..snapshot.n_classes())
        .filter_map(|class| snapshot.weight(class, clause))
        .map(|weight| weight.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!("  weights: [{weights}]");
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut artifact_path: Option<PathBuf> = None;
    let mut weights = None;
    let mut clauses = None;
    let mut clause = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--artifact" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--artifact requires a value".to_string())?;
                artifact_path = Some(PathBuf::from(value));
            }
            "--weights" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--weights requires a value".to_string())?;
                weights = Some(
                    WeightLayout::parse(value)
                        .ok_or_else(|| format!("Invalid --weights value: {value}"))?,
                );
            }
            "--clauses" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--clauses requires a value".to_string())?;
                clauses = Some(
                    ClauseLayout::parse(value)
                        .ok_or_else(|| format!("Invalid --clauses value: {value}"))?,
                );
            }
            "--clause" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--clause requires a value".to_string())?;
                clause = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --clause value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let artifact_path = artifact_path.ok_or_else(help_text)?;
    Ok(Some(CliOptions {
        artifact_path,
        weights,
        clauses,
        clause,
    }))
}

fn help_text() -> String {
    [
        "tm-inspect",
        "",
        "Usage:",
        "  tm-inspect --artifact <model.bin> [options]",
        "",
        "Options:",
        "  --weights <layout>  clause-major | class-major (default: from manifest)",
        "  --clauses <layout>  block | interleaved (default: from manifest)",
        "  --clause <idx>      Print the literal states and weights of one clause.",
    ]
    .join("\n")
}
