//! End-to-end export from a model state file through to a decoded artifact.

use std::path::Path;

use tempfile::tempdir;
use tm_export::config::{LayoutOverrides, load_config, resolve_config};
use tm_export::export::{
    ClauseLayout, ExportLayout, ExportOptions, ManifestCheck, WeightLayout, export_model_state,
    load_manifest, read_artifact, read_header,
};
use tm_export::model::{Polarity, load_model_state};

const STATE_JSON: &str = r#"{
  "threshold": 1000,
  "n_literals": 3,
  "n_clauses": 2,
  "n_classes": 2,
  "boost_true_positive": true,
  "weights": [[5, -6], [7, -8]],
  "clauses": [[1, 2, 3, -1, -2, -3], [127, 0, -127, 4, 5, 6]]
}"#;

fn write_state(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("state.json");
    std::fs::write(&path, STATE_JSON).unwrap();
    path
}

#[test]
fn transposed_interleaved_artifact_bytes() {
    let dir = tempdir().unwrap();
    let state = write_state(dir.path());
    let out = dir.path().join("model.bin");
    let options = ExportOptions {
        layout: ExportLayout::TRANSPOSED_INTERLEAVED,
        write_manifest: true,
    };
    let summary = export_model_state(&state, &out, &options).unwrap();

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(bytes.len() as u64, summary.bytes_written);
    assert_eq!(bytes.len(), 28 + 2 * 2 * 2 + 2 * 2 * 3);
    assert_eq!(&bytes[0..4], &[0xE8, 0x03, 0x00, 0x00]);
    assert_eq!(&bytes[24..28], &[0x01, 0x00, 0x00, 0x00]);

    let weights: Vec<i16> = bytes[28..36]
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    assert_eq!(weights, vec![5, 7, -6, -8]);

    let clauses: Vec<i8> = bytes[36..].iter().map(|b| *b as i8).collect();
    assert_eq!(clauses, vec![1, -1, 2, -2, 3, -3, 127, 4, 0, 5, -127, 6]);

    let manifest = load_manifest(&out).unwrap().expect("manifest written");
    assert_eq!(manifest.verify(&bytes), ManifestCheck::Match);
}

#[test]
fn artifact_reads_back_to_same_model() {
    let dir = tempdir().unwrap();
    let state = write_state(dir.path());
    let original = load_model_state(&state).unwrap();
    for weights in [WeightLayout::ClauseMajor, WeightLayout::ClassMajor] {
        for clauses in [ClauseLayout::Block, ClauseLayout::Interleaved] {
            let layout = ExportLayout { weights, clauses };
            let out = dir.path().join(format!("{weights:?}-{clauses:?}.bin"));
            let options = ExportOptions {
                layout,
                write_manifest: false,
            };
            export_model_state(&state, &out, &options).unwrap();
            assert_eq!(read_artifact(&out, layout).unwrap(), original);
        }
    }
}

#[test]
fn config_file_drives_export() {
    let dir = tempdir().unwrap();
    let state = write_state(dir.path());
    let config_path = dir.path().join("export.toml");
    std::fs::write(
        &config_path,
        "[layout]\nweights = \"clause_major\"\nclauses = \"interleaved\"\n",
    )
    .unwrap();
    let config = resolve_config(Some(config_path.as_path()), &LayoutOverrides::default()).unwrap();
    assert_eq!(config, load_config(&config_path).unwrap());

    let out = dir.path().join("model.bin");
    export_model_state(&state, &out, &config.export_options()).unwrap();
    let manifest = load_manifest(&out).unwrap().unwrap();
    assert_eq!(
        manifest.layout,
        ExportLayout {
            weights: WeightLayout::ClauseMajor,
            clauses: ClauseLayout::Interleaved,
        }
    );

    let snapshot = read_artifact(&out, manifest.layout).unwrap();
    assert_eq!(snapshot.state(1, 2, Polarity::Positive), Some(-127));
    assert_eq!(snapshot.state(1, 2, Polarity::Negated), Some(6));
    assert_eq!(read_header(&out).unwrap().max_state, 127);
}

#[test]
fn reexport_truncates_larger_artifact() {
    let dir = tempdir().unwrap();
    let state = write_state(dir.path());
    let out = dir.path().join("model.bin");
    std::fs::write(&out, vec![0u8; 10_000]).unwrap();
    let options = ExportOptions {
        layout: ExportLayout::IDENTITY,
        write_manifest: false,
    };
    export_model_state(&state, &out, &options).unwrap();
    assert_eq!(std::fs::metadata(&out).unwrap().len(), 48);
}
