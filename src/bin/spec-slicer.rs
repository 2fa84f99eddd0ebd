//! Spec Slicer CLI
//!
//! Command-line interface for slicing OpenAPI documents per endpoint,
//! generating test collections from the slices, and merging them.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use spec_slicer::{
    generate_collection_file, json_type_name, load_spec_auto,
    merge_collection_files, process_all, save_records, CollectionModel, EndpointRecord,
    GenerateError, GeneratorConfig, MergeReport, Severity, SliceOptions, DEFAULT_MAX_DEPTH,
};

/// Requirements text used when no document is given.
const NO_REQUIREMENTS: &str = "No additional requirements.";

#[derive(Parser)]
#[command(name = "spec-slicer")]
#[command(about = "Slice OpenAPI specs per endpoint and generate test collections")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a specification into one self-contained spec per endpoint
    Slice {
        /// Specification source: file path (JSON or YAML) or URL
        spec: String,

        /// Directory for the per-endpoint specs
        #[arg(long, default_value = "endpoint_specs")]
        output_dir: PathBuf,

        /// Maximum levels of schema dependencies to follow
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Fail if any endpoint has unresolved references
        #[arg(long)]
        strict: bool,

        /// Only show endpoints with problems
        #[arg(long, short)]
        quiet: bool,
    },

    /// Generate a test collection for each endpoint spec
    Generate {
        /// Endpoint spec files or directories containing them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Requirements document sent along with every endpoint
        #[arg(long)]
        requirements: Option<PathBuf>,

        /// Directory for the generated collections
        #[arg(long, default_value = "output_data")]
        output_dir: PathBuf,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Merge test collections into one collection
    Merge {
        /// Collection files or directories containing them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Merged collection file
        #[arg(long, default_value = "merged_collection.json")]
        output: PathBuf,
    },

    /// Slice, generate, and merge in one go
    Run {
        /// Specification source: file path (JSON or YAML) or URL
        spec: String,

        /// Requirements document sent along with every endpoint
        #[arg(long)]
        requirements: Option<PathBuf>,

        /// Directory for the per-endpoint specs
        #[arg(long, default_value = "endpoint_specs")]
        specs_dir: PathBuf,

        /// Directory for the generated collections
        #[arg(long, default_value = "output_data")]
        collections_dir: PathBuf,

        /// Merged collection file
        #[arg(long, default_value = "output_data/merged_regression_collection.json")]
        output: PathBuf,

        /// Maximum levels of schema dependencies to follow
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(clap::Args)]
struct ModelArgs {
    /// Model name (default: ANTHROPIC_MODEL or the built-in default)
    #[arg(long)]
    model: Option<String>,

    /// Output token limit (default: ANTHROPIC_MAX_TOKENS or 30000)
    #[arg(long)]
    max_tokens: Option<u32>,
}

fn main() -> ExitCode {
    // A missing .env file is fine; variables may come from the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Slice {
            spec,
            output_dir,
            max_depth,
            format,
            strict,
            quiet,
        } => run_slice(&spec, &output_dir, max_depth, &format, strict, quiet),

        Commands::Generate {
            inputs,
            requirements,
            output_dir,
            model,
        } => collect_json_files(&inputs)
            .and_then(|files| run_generate(files, requirements.as_deref(), &output_dir, &model)),

        Commands::Merge { inputs, output } => {
            collect_json_files(&inputs).and_then(|files| run_merge(files, &output))
        }

        Commands::Run {
            spec,
            requirements,
            specs_dir,
            collections_dir,
            output,
            max_depth,
            model,
        } => run_pipeline(RunArgs {
            spec,
            requirements,
            specs_dir,
            collections_dir,
            output,
            max_depth,
            model,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Load, slice, and save a specification. Returns the saved files.
fn slice_spec(
    spec_source: &str,
    output_dir: &Path,
    max_depth: usize,
) -> Result<(Vec<EndpointRecord>, Vec<PathBuf>), u8> {
    let spec = load_spec_auto(spec_source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if let Some(paths) = spec.get("paths").filter(|p| !p.is_object()) {
        eprintln!(
            "Error: invalid specification: paths must be an object, got {}",
            json_type_name(paths)
        );
        return Err(2);
    }

    let options = SliceOptions::new().max_depth(max_depth);
    let mut records = process_all(&spec, &options);

    let written = save_records(&mut records, output_dir).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    Ok((records, written))
}

fn run_slice(
    spec_source: &str,
    output_dir: &Path,
    max_depth: usize,
    format: &str,
    strict: bool,
    quiet: bool,
) -> Result<(), u8> {
    let (records, _) = slice_spec(spec_source, output_dir, max_depth)?;
    let invalid = records.iter().filter(|r| !r.is_valid).count();

    if format == "json" {
        let output = json!({
            "spec": spec_source,
            "endpoints": records.len(),
            "valid": records.len() - invalid,
            "invalid": invalid,
            "records": records.iter().map(|r| json!({
                "path": r.path,
                "operation": r.operation,
                "file": r.file,
                "is_valid": r.is_valid,
                "diagnostics": r.diagnostics,
            })).collect::<Vec<_>>(),
        });
        println!("{}", output);
    } else {
        if !quiet {
            println!("Slicing {} ...\n", spec_source);
        }
        print_records(&records, quiet);
        println!();
        if invalid == 0 {
            println!(
                "\x1b[32m✓ {} endpoints sliced, all references resolved\x1b[0m",
                records.len()
            );
        } else {
            println!(
                "\x1b[31m✗ {} endpoints sliced: {} valid, {} with unresolved references\x1b[0m",
                records.len(),
                records.len() - invalid,
                invalid
            );
        }
    }

    if strict && invalid > 0 {
        Err(1)
    } else {
        Ok(())
    }
}

fn print_records(records: &[EndpointRecord], quiet: bool) {
    for record in records {
        let status_icon = if record.is_valid {
            "\x1b[32m✓\x1b[0m"
        } else {
            "\x1b[31m✗\x1b[0m"
        };

        if !quiet || !record.is_valid {
            match &record.file {
                Some(file) => println!("  {} {} -> {}", status_icon, record.key(), file.display()),
                None => println!("  {} {}", status_icon, record.key()),
            }
        }

        for diag in &record.diagnostics {
            let color = match diag.severity {
                Severity::Error => "\x1b[31m",
                Severity::Warning => "\x1b[33m",
            };
            if !quiet || diag.severity == Severity::Error {
                println!(
                    "    {}{}[{}]\x1b[0m: {}",
                    color, diag.severity, diag.code, diag.message
                );
            }
        }
    }
}

fn read_requirements(path: Option<&Path>) -> Result<String, u8> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            eprintln!("Error: cannot read requirements {}: {}", path.display(), e);
            3u8
        }),
        None => Ok(NO_REQUIREMENTS.to_string()),
    }
}

fn build_model(args: &ModelArgs) -> Result<Box<dyn CollectionModel>, GenerateError> {
    let mut config = GeneratorConfig::from_env()?;
    if let Some(model) = &args.model {
        config = config.model(model.clone());
    }
    if let Some(max_tokens) = args.max_tokens {
        config = config.max_tokens(max_tokens);
    }

    #[cfg(feature = "remote")]
    {
        Ok(Box::new(spec_slicer::AnthropicClient::new(config)?))
    }
    #[cfg(not(feature = "remote"))]
    {
        let _ = config;
        Err(GenerateError::InvalidConfig {
            name: "model client",
            value: "generation requires the 'remote' feature".to_string(),
        })
    }
}

/// Generate collections for each slice file. Returns the written files;
/// failures are reported and skipped.
fn generate_all(
    files: &[PathBuf],
    requirements: Option<&Path>,
    output_dir: &Path,
    model_args: &ModelArgs,
) -> Result<(Vec<PathBuf>, usize), u8> {
    let requirements = read_requirements(requirements)?;
    let model = build_model(model_args).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let mut written = Vec::new();
    let mut failed = 0;
    for file in files {
        println!("Generating collection for {} ...", file.display());
        match generate_collection_file(model.as_ref(), file, &requirements, output_dir) {
            Ok(path) => {
                println!("  \x1b[32m✓\x1b[0m Saved: {}", path.display());
                written.push(path);
            }
            Err(e) => {
                eprintln!("  \x1b[31m✗\x1b[0m {}: {}", file.display(), e);
                failed += 1;
            }
        }
    }
    Ok((written, failed))
}

fn run_generate(
    files: Vec<PathBuf>,
    requirements: Option<&Path>,
    output_dir: &Path,
    model_args: &ModelArgs,
) -> Result<(), u8> {
    if files.is_empty() {
        eprintln!("Error: no endpoint spec files found");
        return Err(2);
    }

    let (written, failed) = generate_all(&files, requirements, output_dir, model_args)?;
    println!(
        "\n{} collections generated, {} failed",
        written.len(),
        failed
    );
    if failed > 0 {
        Err(1)
    } else {
        Ok(())
    }
}

fn run_merge(files: Vec<PathBuf>, output: &Path) -> Result<(), u8> {
    if files.is_empty() {
        eprintln!("Error: no collection files found");
        return Err(2);
    }

    let report = merge_collection_files(&files, output).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    print_merge_report(&report, output);
    Ok(())
}

fn print_merge_report(report: &MergeReport, output: &Path) {
    for (origin, reason) in &report.skipped {
        eprintln!("  \x1b[33m⚠\x1b[0m skipped {}: {}", origin, reason);
    }
    println!(
        "Merged {} collections into {}",
        report.folders,
        output.display()
    );
}

struct RunArgs {
    spec: String,
    requirements: Option<PathBuf>,
    specs_dir: PathBuf,
    collections_dir: PathBuf,
    output: PathBuf,
    max_depth: usize,
    model: ModelArgs,
}

fn run_pipeline(args: RunArgs) -> Result<(), u8> {
    let RunArgs {
        spec,
        requirements,
        specs_dir,
        collections_dir,
        output,
        max_depth,
        model,
    } = args;

    let (records, slice_files) = slice_spec(&spec, &specs_dir, max_depth)?;
    print_records(&records, true);
    println!("Sliced {} endpoints into {}", records.len(), specs_dir.display());

    if slice_files.is_empty() {
        eprintln!("Error: no endpoints found in {}", spec);
        return Err(2);
    }

    let (collections, failed) =
        generate_all(&slice_files, requirements.as_deref(), &collections_dir, &model)?;
    if collections.is_empty() {
        eprintln!("Error: no collections were generated");
        return Err(1);
    }

    run_merge(collections, &output)?;
    if failed > 0 {
        eprintln!("{} endpoints failed to generate", failed);
        Err(1)
    } else {
        Ok(())
    }
}

/// Expand files and directories into a sorted list of `.json` files.
fn collect_json_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, u8> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = std::fs::read_dir(input).map_err(|e| {
                eprintln!("Error: cannot read {}: {}", input.display(), e);
                3u8
            })?;
            let mut found: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && is_json(path))
                .collect();
            found.sort();
            files.extend(found);
        } else if input.exists() {
            files.push(input.clone());
        } else {
            eprintln!("Error: path not found: {}", input.display());
            return Err(2);
        }
    }
    Ok(files)
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}
