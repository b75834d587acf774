use clap::Parser;
use octofhir_validation_support::*;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "fhir-validate")]
#[command(about = "Validate FHIR R4 JSON resources against base and implementation guide profiles")]
#[command(version)]
struct Cli {
    /// Resource files to validate
    files: Vec<PathBuf>,
    /// JSON validator configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Use the HCX v0.7 and NRCES profile set
    #[arg(long)]
    hcx: bool,
    /// Additional profile location (URL or file path), repeatable
    #[arg(short, long = "profile")]
    profiles: Vec<String>,
    /// Validate a generated CoverageEligibilityRequest and a bare Claim
    #[arg(long)]
    sample: bool,
    /// Output format (json, text)
    #[arg(short, long, default_value = "text")]
    format: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let validator = match build_validator(&cli).await {
        Ok(validator) => validator,
        Err(e) => {
            eprintln!("❌ Unable to build validator: {e}");
            return ExitCode::from(2);
        }
    };

    let mut documents = Vec::new();
    if cli.sample {
        documents.push(("sample eligibility request".to_string(), sample_request()));
        documents.push(("sample claim".to_string(), sample_claim()));
    }
    for path in &cli.files {
        match read_document(path) {
            Ok(document) => documents.push((path.display().to_string(), document)),
            Err(e) => {
                eprintln!("❌ {}: {e}", path.display());
                return ExitCode::from(2);
            }
        }
    }

    let mut all_valid = true;
    for (name, document) in &documents {
        let result = validator.validate(document);
        all_valid &= result.is_valid();
        if let Err(e) = report(name, &result, &cli.format) {
            eprintln!("❌ {name}: {e}");
            return ExitCode::from(2);
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

async fn build_validator(cli: &Cli) -> Result<std::sync::Arc<ValidationEngine>> {
    let mut config = match (&cli.config, cli.hcx) {
        (Some(path), _) => ValidatorConfig::from_json_file(path)?,
        (None, true) => ValidatorConfig::hcx(),
        (None, false) => ValidatorConfig::default(),
    };
    config.profile_locations.extend(cli.profiles.iter().cloned());

    ValidatorService::from_config(config)?.get_validator().await
}

fn read_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn report(name: &str, result: &ValidationResult, format: &str) -> Result<()> {
    match format {
        "json" => {
            let output = json!({
                "document": name,
                "valid": result.is_valid(),
                "issues": result.iter().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            if result.is_empty() {
                println!("✅ {name}: no issues");
            } else {
                let marker = if result.is_valid() { "⚠️ " } else { "❌" };
                println!("{marker} {name}: {} issue(s)", result.len());
                for issue in result.sorted_by_severity() {
                    println!(
                        "  {} [{}]: {}",
                        issue.severity.to_string().to_uppercase(),
                        issue.code,
                        issue
                    );
                }
            }
        }
    }
    Ok(())
}

/// Eligibility request without patient or insurer.
fn sample_request() -> Value {
    json!({
        "resourceType": "CoverageEligibilityRequest",
        "id": uuid::Uuid::new_v4().to_string(),
        "status": "active",
        "purpose": ["validation"],
        "created": chrono::Utc::now().format("%Y-%m-%d").to_string()
    })
}

/// Claim carrying only an id.
fn sample_claim() -> Value {
    json!({
        "resourceType": "Claim",
        "id": uuid::Uuid::new_v4().to_string()
    })
}
