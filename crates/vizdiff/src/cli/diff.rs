//! The `vizdiff diff` command for a single screenshot pair.

use clap::Args;
use std::path::{Path, PathBuf};

use vizdiff_core::output::to_json;
use vizdiff_core::pipeline::encode_png;
use vizdiff_core::{Config, DiffOutput, DiffProcessor, ViewportRecord};

/// Arguments for the `diff` command.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Staging screenshot
    pub staging: PathBuf,

    /// Production screenshot
    pub production: PathBuf,

    /// Directory for the rendered diff images
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Base name of the rendered images (defaults to the staging file stem)
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Execute the diff command.
pub async fn execute(args: DiffArgs, config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let processor = DiffProcessor::new(&config);
    let (staging, production) = (args.staging.clone(), args.production.clone());

    let output = tokio::task::spawn_blocking(move || processor.diff_files(&staging, &production))
        .await??;

    let name = artifact_name(&args);
    let record = write_artifacts(output, &args.out_dir, &name)?;
    println!("{}", to_json(&record, true)?);
    Ok(())
}

fn artifact_name(args: &DiffArgs) -> String {
    args.name.clone().unwrap_or_else(|| {
        args.staging
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("page")
            .to_string()
    })
}

/// Write the rendered images and describe them in a record.
fn write_artifacts(
    output: DiffOutput,
    out_dir: &Path,
    name: &str,
) -> anyhow::Result<ViewportRecord> {
    let highlighted = out_dir.join(format!("{name}_diff.png"));
    let raw = out_dir.join(format!("{name}_diff_raw.png"));

    encode_png(&output.highlighted.into(), &highlighted)?;
    encode_png(&output.raw.into(), &raw)?;
    tracing::info!("Wrote {:?} and {:?}", highlighted, raw);

    let overlay_path = match output.overlay {
        Some(overlay) => {
            let path = out_dir.join(format!("{name}_diff_overlay.png"));
            encode_png(&overlay.into(), &path)?;
            Some(path)
        }
        None => None,
    };

    Ok(ViewportRecord {
        status: output.status,
        metrics: Some(output.metrics),
        highlighted_path: Some(highlighted),
        raw_path: Some(raw),
        overlay_path,
        error: None,
    })
}
