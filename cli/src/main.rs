use anyhow::Context;
use clap::Parser;
use sds_core::{
    parse_document, render, run_timestamp, ComposeSummary, Composer, FormatOptions,
    DEFAULT_ID_PREFIX,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Assemble a SCAP 1.2 source datastream from an XCCDF benchmark and an OVAL definitions file"
)]
struct SdsCli {
    /// XCCDF 1.2 benchmark file
    #[arg(short = 'x', long)]
    xccdf: PathBuf,
    /// OVAL definitions file
    #[arg(short = 'o', long)]
    oval: PathBuf,
    /// Output datastream file (overwritten if it exists)
    #[arg(long, visible_alias = "out")]
    output: PathBuf,
    /// Reverse-DNS prefix embedded in all generated identifiers
    #[arg(long, default_value = DEFAULT_ID_PREFIX)]
    id_prefix: String,
    /// Output the composition summary as JSON instead of a status line
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = SdsCli::parse();

    // Both inputs are parsed before anything is written, so a malformed
    // input never leaves a partial output file behind.
    let xccdf = parse_document(&cli.xccdf)?;
    let oval = parse_document(&cli.oval)?;

    let composer = Composer::new(cli.id_prefix);
    let timestamp = run_timestamp();
    let composition = composer.compose(&xccdf, &oval, &timestamp)?;

    let text = render(&composition.collection, &FormatOptions::default());
    fs::write(&cli.output, text)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    output_result(&composition.summary, &cli.output, cli.json)?;
    Ok(())
}

fn output_result(summary: &ComposeSummary, output: &Path, json: bool) -> anyhow::Result<()> {
    if json {
        let payload = json!({
            "summary": summary,
            "output": output,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "Success: created SCAP 1.2 datastream at {}",
            output.display()
        );
    }
    Ok(())
}
