use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use uniffi_bindgen::bindings::SwiftBindingGenerator;

/// Output directory relative to the repository root, overridable by the first argument.
const DEFAULT_OUTPUT_DIR: &str = "ios/LoupeFFI/Sources/LoupeFFI";

fn main() -> Result<()> {
    let output_override = std::env::args().nth(1).map(Utf8PathBuf::from);
    generate_swift_bindings(output_override)
}

fn generate_swift_bindings(output_override: Option<Utf8PathBuf>) -> Result<()> {
    let manifest_dir = Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir
        .parent()
        .context("failed to locate repository root")?;

    let udl_path = manifest_dir.join("src/loupe_core.udl");
    let output_dir = output_override.unwrap_or_else(|| repo_root.join(DEFAULT_OUTPUT_DIR));

    std::fs::create_dir_all(output_dir.as_std_path())
        .with_context(|| format!("failed to create {output_dir}"))?;

    uniffi_bindgen::generate_bindings(
        udl_path.as_path(),
        None,
        SwiftBindingGenerator,
        Some(output_dir.as_path()),
        None,
        Some("loupe_core"),
        true,
    )
    .with_context(|| format!("failed to generate Swift bindings from {udl_path}"))?;

    println!("Generated Swift bindings in {output_dir}");

    Ok(())
}
