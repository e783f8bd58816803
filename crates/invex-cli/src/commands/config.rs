//! Config command - manage tenant configuration.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;
use regex::Regex;

use invex_core::{JsonConfigStore, TenantProfile};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the resolved tenant configuration
    Show,

    /// Initialize a sample tenant configuration file
    Init(InitArgs),

    /// Check the configuration for malformed patterns
    Validate,

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for the configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(config_path),
        ConfigCommand::Init(init_args) => init_config(init_args, config_path),
        ConfigCommand::Validate => validate_config(config_path),
        ConfigCommand::Path => show_path(config_path),
    }
}

fn show_config(config_path: Option<&str>) -> anyhow::Result<()> {
    let path = super::resolve_config_path(config_path);

    if !path.exists() {
        println!(
            "{} No configuration file found at {}.",
            style("ℹ").blue(),
            path.display()
        );
        println!("Run 'invex config init' to create one.");
        return Ok(());
    }

    let store = JsonConfigStore::from_path(&path)?;
    println!("{}", serde_json::to_string_pretty(store.config())?);

    Ok(())
}

fn init_config(args: InitArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let output_path = args
        .output
        .unwrap_or_else(|| super::resolve_config_path(config_path));

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    // Create parent directory if needed
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // Round-trip through the store so the sample is always loadable.
    let store = JsonConfigStore::from_json(SAMPLE_CONFIG)?;
    fs::write(
        &output_path,
        serde_json::to_string_pretty(store.config())?,
    )?;

    println!(
        "{} Created sample tenant configuration at {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

fn validate_config(config_path: Option<&str>) -> anyhow::Result<()> {
    let path = super::resolve_config_path(config_path);
    let store = JsonConfigStore::from_path(&path)?;
    let config = store.config();

    let mut issues = 0usize;

    for tenant in &config.tenants {
        issues += validate_tenant(tenant);
    }

    println!();
    println!(
        "{} {} tenants, {} code mappings",
        style("ℹ").blue(),
        config.tenants.len(),
        config.mappings.len()
    );

    if issues == 0 {
        println!("{} Configuration is valid", style("✓").green());
        Ok(())
    } else {
        anyhow::bail!("Found {} invalid patterns", issues);
    }
}

fn validate_tenant(tenant: &TenantProfile) -> usize {
    let mut issues = 0;

    let mut check = |context: String, pattern: &str| {
        if let Err(e) = Regex::new(pattern) {
            println!(
                "{} {}: {} - {}",
                style("✗").red(),
                tenant.tenant_key,
                context,
                e
            );
            issues += 1;
        }
    };

    for identifier in &tenant.identifiers {
        check("identifier".to_string(), &identifier.pattern);
    }
    for field in &tenant.field_defs {
        for pattern in &field.patterns {
            check(
                format!("field '{}/{}'", field.block_name, field.field_name),
                pattern,
            );
        }
    }
    for block in &tenant.block_configs {
        if let Some(pattern) = &block.start_pattern {
            check(format!("block '{}' start", block.block_name), pattern);
        }
    }

    issues
}

fn show_path(config_path: Option<&str>) -> anyhow::Result<()> {
    let path = super::resolve_config_path(config_path);

    println!("Configuration file: {}", path.display());

    if path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'invex config init' to create a configuration file.");
    }

    Ok(())
}

/// Sample configuration: one flat TV tenant and one context-driven radio
/// tenant with city-code mappings.
const SAMPLE_CONFIG: &str = r##"{
  "tenants": [
    {
      "tenant_key": "TV",
      "display_name": "TV Invoice",
      "identifiers": [
        {"pattern": "TELEVISION NETWORK", "weight": 10},
        {"pattern": "TELECAST", "weight": 5}
      ],
      "field_defs": [
        {"block_name": "invoice", "field_name": "date", "field_type": "date",
         "patterns": ["(\\d{2}\\.\\d{2}\\.\\d{4})"], "weight": 5, "required": true, "sort_order": 1},
        {"block_name": "invoice", "field_name": "programme", "field_type": "text",
         "patterns": ["\\d{2}:\\d{2}:\\d{2}\\s+(.+?)\\s+\\d"], "weight": 3, "sort_order": 2},
        {"block_name": "invoice", "field_name": "spots", "field_type": "integer",
         "patterns": ["\\s(\\d{1,3})\\s+[\\d,]+\\.\\d{2}"], "weight": 3, "sort_order": 3},
        {"block_name": "invoice", "field_name": "rate", "field_type": "real",
         "patterns": ["([\\d,]+\\.\\d{2})\\s+[\\d,]+\\.\\d{2}\\s*$"], "weight": 4, "sort_order": 4},
        {"block_name": "invoice", "field_name": "amount", "field_type": "real",
         "patterns": ["([\\d,]+\\.\\d{2})\\s*$"], "weight": 5, "sort_order": 5},
        {"block_name": "summary", "field_name": "finalAmount", "field_type": "real",
         "patterns": ["Net\\s+Payable\\s*:?\\s*([\\d,]+\\.\\d{2})"], "weight": 10, "sort_order": 1}
      ],
      "block_configs": [
        {"block_name": "invoice", "mode": "line_split",
         "start_pattern": "^\\d{2}\\.\\d{2}\\.\\d{4}", "min_score": 9},
        {"block_name": "summary", "mode": "global", "min_score": 10, "fallback_enabled": true}
      ],
      "calculations": [
        {"block_name": "invoice", "target_field": "amount", "kind": "multiply",
         "source_fields": ["spots", "rate"], "result_type": "real",
         "apply_only_if_missing": true, "priority": 10}
      ]
    },
    {
      "tenant_key": "RADIO_CITY",
      "display_name": "Radio City",
      "identifiers": [
        {"pattern": "RADIO CITY", "weight": 10}
      ],
      "field_defs": [
        {"block_name": "invoice", "field_name": "cityName", "field_type": "text",
         "patterns": ["^([A-Z]{3})$"], "weight": 0, "sort_order": 1,
         "is_context": true, "context_reset_on_match": true, "code_mapping": "CITY"},
        {"block_name": "invoice", "field_name": "dates", "field_type": "text",
         "patterns": ["^(\\d{2}/\\d{2}-\\d{2}/\\d{2})$"], "weight": 0, "sort_order": 2,
         "is_context": true},
        {"block_name": "invoice", "field_name": "duration", "field_type": "integer",
         "patterns": ["^\\(\\d+\\)\\s+(\\d+)"], "weight": 3, "sort_order": 3},
        {"block_name": "invoice", "field_name": "spots", "field_type": "integer",
         "patterns": ["^\\(\\d+\\)\\s+\\d+\\s+(\\d+)"], "weight": 3, "sort_order": 4},
        {"block_name": "invoice", "field_name": "amount", "field_type": "real",
         "patterns": ["([\\d,]+\\.\\d{2})\\s*$"], "weight": 4, "sort_order": 5}
      ],
      "block_configs": [
        {"block_name": "invoice", "mode": "line_split",
         "start_pattern": "^\\(\\d+\\)", "min_score": 7}
      ]
    }
  ],
  "mappings": [
    {"tenant_key": "RADIO_CITY", "mapping_type": "CITY", "code": "BOM", "display_name": "Mumbai"},
    {"tenant_key": "RADIO_CITY", "mapping_type": "CITY", "code": "DEL", "display_name": "Delhi"},
    {"tenant_key": "RADIO_CITY", "mapping_type": "CITY", "code": "BLR", "display_name": "Bengaluru"}
  ]
}
"##;
