use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use patch_and_transform::config::{
    apply_patches, expand_patch_sets, load_from_path, Patch, PatchConfig, PatchResult,
};
use patch_and_transform::telemetry;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pnt")]
#[command(about = "Apply declarative patches between a composite resource and its environment", long_about = None)]
#[command(version)]
struct Cli {
    /// Log dispatch decisions (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a patch file to a composite resource and environment
    Apply {
        /// Patch config file (.toml or .json)
        #[arg(short, long)]
        patches: PathBuf,

        /// Observed composite resource (JSON)
        #[arg(short, long)]
        observed: PathBuf,

        /// Desired composite resource (JSON); starts empty if not given
        #[arg(long)]
        desired: Option<PathBuf>,

        /// Environment document (JSON); starts empty if not given
        #[arg(short, long)]
        environment: Option<PathBuf>,

        /// Write desired.json and environment.json here instead of updating
        /// the input files in place
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Dry run - report what would change without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changed documents
        #[arg(short, long)]
        diff: bool,
    },

    /// Load and validate patch files, including patch-set references
    Validate {
        /// Patch config files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the patch sets and patches of a patch file
    List {
        /// Patch config file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match cli.command {
        Commands::Apply {
            patches,
            observed,
            desired,
            environment,
            output_dir,
            dry_run,
            diff,
        } => cmd_apply(ApplyArgs {
            patches,
            observed,
            desired,
            environment,
            output_dir,
            dry_run,
            show_diff: diff,
        }),

        Commands::Validate { files } => cmd_validate(&files),

        Commands::List { file } => cmd_list(&file),
    }
}

struct ApplyArgs {
    patches: PathBuf,
    observed: PathBuf,
    desired: Option<PathBuf>,
    environment: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
}

/// Read a JSON document, or an empty map when no path was given.
fn read_document(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Object(Default::default()));
    };
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn render_document(doc: &Value) -> Result<String> {
    let mut text = serde_json::to_string_pretty(doc)?;
    text.push('\n');
    Ok(text)
}

/// Atomic write: tempfile in the target directory, fsync, rename.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Helper: Show unified diff between original and patched document text
fn display_diff(name: &str, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", name).dimmed());
    println!("{}", format!("+++ {} (patched)", name).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn describe(patch: &Patch) -> String {
    let from = match (&patch.combine, &patch.from_field_path) {
        (Some(combine), _) => {
            let vars: Vec<&str> = combine
                .variables
                .iter()
                .map(|v| v.from_field_path.as_str())
                .collect();
            format!("[{}]", vars.join(", "))
        }
        (None, Some(from)) => from.clone(),
        (None, None) => "?".to_string(),
    };
    match patch.patch_set_name.as_deref() {
        Some(name) if patch.combine.is_none() && patch.from_field_path.is_none() => {
            format!("{} '{}'", patch.effective_type(), name)
        }
        _ => format!(
            "{} {} -> {}",
            patch.effective_type(),
            from,
            patch.destination().unwrap_or("?")
        ),
    }
}

fn cmd_apply(args: ApplyArgs) -> Result<()> {
    let config = load_from_path(&args.patches)?;
    let observed = read_document(Some(args.observed.as_path()))?;
    let mut desired = read_document(args.desired.as_deref())?;
    let mut environment = read_document(args.environment.as_deref())?;

    let desired_before = render_document(&desired)?;
    let environment_before = render_document(&environment)?;

    println!("Loading patches from {}...", args.patches.display());
    if args.dry_run {
        println!("{}", "  [DRY RUN - nothing will be written]".cyan());
    }

    let results = apply_patches(&config, &observed, &mut desired, &mut environment)?;
    let expanded = expand_patch_sets(&config.patches, &config.patch_sets)?;

    let mut total_applied = 0;
    let mut total_skipped = 0;
    let mut total_failed = 0;

    for (index, result) in &results {
        let label = expanded
            .get(*index)
            .map(describe)
            .unwrap_or_else(|| format!("patch {index}"));
        match result {
            Ok(PatchResult::Applied { to }) => {
                let verb = if args.dry_run { "Would apply to" } else { "Applied to" };
                println!("{} [{}] {}: {} {}", "✓".green(), index, label, verb, to);
                total_applied += 1;
            }
            Ok(PatchResult::Skipped { reason }) => {
                println!("{} [{}] {}: Skipped ({})", "⊘".cyan(), index, label, reason);
                total_skipped += 1;
            }
            Err(e) => {
                eprintln!("{} [{}] {}: Error - {}", "✗".red(), index, label, e);
                total_failed += 1;
            }
        }
    }

    let desired_after = render_document(&desired)?;
    let environment_after = render_document(&environment)?;

    if args.show_diff {
        if desired_before != desired_after {
            display_diff("desired", &desired_before, &desired_after);
        }
        if environment_before != environment_after {
            display_diff("environment", &environment_before, &environment_after);
        }
    }

    if !args.dry_run {
        let outputs = [
            ("desired.json", args.desired.as_deref(), &desired_after),
            ("environment.json", args.environment.as_deref(), &environment_after),
        ];
        for (file_name, input, content) in outputs {
            let target = match (&args.output_dir, input) {
                (Some(dir), _) => dir.join(file_name),
                (None, Some(input)) => input.to_path_buf(),
                (None, None) => {
                    println!("\n{}", file_name.bold());
                    print!("{}", content);
                    continue;
                }
            };
            write_atomic(&target, content)?;
            println!("{}", format!("Wrote {}", target.display()).dimmed());
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", total_applied).green());
    println!("  {} skipped", format!("{}", total_skipped).cyan());
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn check_config(path: &Path) -> Result<PatchConfig> {
    let config = load_from_path(path)?;
    expand_patch_sets(&config.patches, &config.patch_sets)?;
    Ok(config)
}

fn cmd_validate(files: &[PathBuf]) -> Result<()> {
    let mut invalid = 0;

    for file in files {
        match check_config(file) {
            Ok(config) => println!(
                "{} {}: {} patch(es), {} patch set(s)",
                "✓".green(),
                file.display(),
                config.patches.len(),
                config.patch_sets.len()
            ),
            Err(e) => {
                eprintln!("{} {}", "✗".red(), file.display());
                for line in format!("{e:#}").lines() {
                    eprintln!("  {}", line);
                }
                invalid += 1;
            }
        }
    }

    if invalid > 0 {
        bail!("{} of {} patch file(s) invalid", invalid, files.len());
    }

    Ok(())
}

fn cmd_list(file: &Path) -> Result<()> {
    let config = load_from_path(file)?;

    if !config.meta.name.is_empty() {
        println!("{}", config.meta.name.bold());
    }
    if let Some(description) = &config.meta.description {
        println!("{}", description.dimmed());
    }

    for set in &config.patch_sets {
        println!(
            "\n{} {} ({} patches)",
            "Patch set".cyan(),
            set.name.bold(),
            set.patches.len()
        );
        for (index, patch) in set.patches.iter().enumerate() {
            println!("  {:>3}. {}", index, describe(patch));
        }
    }

    println!("\n{} ({} patches)", "Patches".cyan(), config.patches.len());
    for (index, patch) in config.patches.iter().enumerate() {
        let transforms = match patch.transforms.len() {
            0 => String::new(),
            n => format!(" [{} transform(s)]", n).dimmed().to_string(),
        };
        println!("  {:>3}. {}{}", index, describe(patch), transforms);
    }

    Ok(())
}
