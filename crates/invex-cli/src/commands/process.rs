//! Process command - extract rows from a single invoice text file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use invex_core::{ExtractionResult, ExtractionStatus};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (line-oriented invoice text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show completeness and row counts after extraction
    #[arg(long)]
    show_summary: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output (one record per extracted field)
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let service = super::load_service(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("processing file: {}", args.input.display());

    let text = fs::read_to_string(&args.input)?;
    let result = service.extract(&text);

    match result.status {
        ExtractionStatus::Error => {
            anyhow::bail!("Extraction failed: {}", result.warnings.join("; "));
        }
        ExtractionStatus::Empty => {
            eprintln!(
                "{} {}",
                style("!").yellow(),
                result.warnings.join("; ")
            );
        }
        ExtractionStatus::Success => {}
    }

    // Format output
    let output = format_result(&result, args.format)?;

    // Write output
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_summary {
        println!();
        println!(
            "{} Tenant: {} ({})",
            style("ℹ").blue(),
            result.tenant_name,
            result.tenant_key
        );
        println!(
            "{} Extracted {} rows across {} blocks",
            style("ℹ").blue(),
            result.total_rows(),
            result.blocks.len()
        );
        println!(
            "{} Completeness: {:.1}%",
            style("ℹ").blue(),
            result.completeness
        );
    }

    debug!("total processing time: {:?}", start.elapsed());

    Ok(())
}

pub(crate) fn format_result(
    result: &ExtractionResult,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

/// Long-format CSV: the field set is configuration-determined, so each
/// extracted field becomes its own record.
fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["block", "row", "field", "value"])?;

    for (block_name, rows) in &result.blocks {
        for (index, row) in rows.iter().enumerate() {
            for (field, value) in row.iter() {
                wtr.write_record([
                    block_name.as_str(),
                    &index.to_string(),
                    field.as_str(),
                    &value.to_string(),
                ])?;
            }
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &ExtractionResult) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Tenant: {} ({})\n",
        result.tenant_name, result.tenant_key
    ));
    output.push_str(&format!("Completeness: {:.1}%\n", result.completeness));

    for (block_name, rows) in &result.blocks {
        output.push_str(&format!("\nBlock '{}': {} rows\n", block_name, rows.len()));
        for (index, row) in rows.iter().enumerate() {
            let fields: Vec<String> = row
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            output.push_str(&format!("  [{}] {}\n", index, fields.join("  ")));
        }
    }

    if let Some(amount) = result.fallback_amount {
        output.push_str(&format!("\nFallback amount: {}\n", amount));
    }

    if !result.warnings.is_empty() {
        output.push_str("\nWarnings:\n");
        for warning in &result.warnings {
            output.push_str(&format!("  - {}\n", warning));
        }
    }

    output
}
