use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use face_cascade::models::{inspect_models_dir, read_metadata, MODEL_KINDS};
use reqwest::blocking::get;
use sha2::{Digest, Sha256};

fn models_dir() -> PathBuf {
    std::env::var("FACE_CASCADE_MODELS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models"))
}

/// Downloads `model.onnx` next to `metadata.json` when it is missing.
fn fetch_version(dir: &Path) -> Result<(), Box<dyn Error>> {
    let meta_path = dir.join("metadata.json");
    let meta = read_metadata(&meta_path).ok_or_else(|| format!("unreadable metadata: {}", meta_path.display()))?;
    if meta.url.is_empty() || meta.sha256.is_empty() || meta.sha256 == "<to-fill>" {
        println!("skip: provide valid url and sha256 in {}", meta_path.display());
        return Ok(());
    }
    let model_path = dir.join("model.onnx");
    if model_path.exists() {
        println!("model exists: {}", model_path.display());
        return Ok(());
    }

    println!("downloading {} -> {}", meta.url, model_path.display());
    let buf = get(&meta.url)?.error_for_status()?.bytes()?.to_vec();
    let digest = hex::encode(Sha256::digest(&buf));
    if digest != meta.sha256 {
        return Err(format!("checksum mismatch for {}: {} != {}", meta.name, digest, meta.sha256).into());
    }
    fs::write(&model_path, &buf)?;
    println!("saved {} ({} bytes)", model_path.display(), buf.len());
    Ok(())
}

fn main() -> ExitCode {
    let base = models_dir();
    println!("models directory: {}", base.display());
    for kind in MODEL_KINDS {
        let p = base.join(kind);
        if p.exists() {
            println!("found: {}", p.display());
        } else if let Err(err) = fs::create_dir_all(&p) {
            eprintln!("failed to create {}: {err}", p.display());
            return ExitCode::FAILURE;
        } else {
            println!("created: {}", p.display());
        }
    }

    let mut failed = false;
    for entry in inspect_models_dir(&base) {
        if entry.versions.is_empty() {
            println!("no versions for {}: add <version>/metadata.json", entry.kind);
        }
        for version in &entry.versions {
            if let Err(err) = fetch_version(&base.join(&entry.kind).join(version)) {
                eprintln!("{}/{}: {err}", entry.kind, version);
                failed = true;
            }
        }
    }
    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
