use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use retrofit_patcher::{builtin, check, load_from_path, run, RunOptions, Ruleset};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "retrofit-patcher")]
#[command(about = "Apply ordered find-and-replace rulesets to source files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply rulesets and overwrite their target files
    Apply {
        #[command(flatten)]
        source: SourceArgs,

        /// Dry run - show what would change without writing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Fail without writing if any rule matches nothing
        #[arg(long)]
        strict: bool,

        /// Print the run reports as JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },

    /// Report per-rule matches without modifying anything
    Check {
        #[command(flatten)]
        source: SourceArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List built-in rulesets
    List,
}

#[derive(Args)]
struct SourceArgs {
    /// Built-in ruleset to use (server, storage, api)
    #[arg(short, long, conflicts_with = "rules")]
    builtin: Option<String>,

    /// Ruleset TOML file (otherwise every *.toml in <dir>/rulesets/ is used)
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Target file, overriding the ruleset's own target (relative to --dir)
    #[arg(short, long)]
    target: Option<PathBuf>,

    /// Directory that ruleset targets are resolved against
    #[arg(long)]
    dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("RETROFIT_PATCHER_LOG").unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            source,
            dry_run,
            diff,
            strict,
            json,
        } => cmd_apply(source, RunOptions { dry_run, strict }, diff, json),

        Commands::Check { source, json } => cmd_check(source, json),

        Commands::List => cmd_list(),
    }
}

/// Resolve the working directory targets are relative to.
///
/// Priority order:
/// 1. Explicit --dir flag
/// 2. RETROFIT_PATCHER_DIR environment variable
/// 3. Current directory
fn resolve_dir(cli_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_dir {
        return path
            .canonicalize()
            .with_context(|| format!("directory not found: {}", path.display()));
    }

    if let Ok(env_path) = env::var("RETROFIT_PATCHER_DIR") {
        let path = PathBuf::from(&env_path);
        if path.is_dir() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: RETROFIT_PATCHER_DIR is set but is not a directory: {}",
                env_path
            )
            .yellow()
        );
    }

    Ok(env::current_dir()?)
}

/// Discover all .toml rulesets in `<dir>/rulesets`, sorted by file name.
fn discover_rulesets(dir: &Path) -> Result<Vec<PathBuf>> {
    let rulesets_dir = dir.join("rulesets");
    let mut files = Vec::new();

    if rulesets_dir.is_dir() {
        for entry in WalkDir::new(&rulesets_dir).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
            {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    files.sort();

    if files.is_empty() {
        anyhow::bail!(
            "{}\n{}\n  {}\n  {}",
            format!("No .toml rulesets found in {}", rulesets_dir.display()).red(),
            "Try one of:".bold(),
            "1. Use a built-in ruleset: retrofit-patcher apply --builtin server",
            "2. Point at a ruleset file: retrofit-patcher apply --rules my-rules.toml"
        )
    }

    Ok(files)
}

/// Load the rulesets selected on the command line, each paired with its target path.
fn load_rulesets(source: &SourceArgs, dir: &Path) -> Result<Vec<(Ruleset, PathBuf)>> {
    let rulesets = if let Some(name) = &source.builtin {
        match builtin::load(name)? {
            Some(ruleset) => vec![ruleset],
            None => anyhow::bail!(
                "unknown built-in ruleset '{}' (available: {})",
                name,
                builtin::NAMES.join(", ")
            ),
        }
    } else if let Some(path) = &source.rules {
        vec![load_from_path(path)?]
    } else {
        discover_rulesets(dir)?
            .iter()
            .map(|path| load_from_path(path))
            .collect::<Result<Vec<_>, _>>()?
    };

    if source.target.is_some() && rulesets.len() > 1 {
        anyhow::bail!("--target needs a single ruleset; use --builtin or --rules");
    }

    Ok(rulesets
        .into_iter()
        .map(|ruleset| {
            let target = match &source.target {
                Some(path) => dir.join(path),
                None => dir.join(&ruleset.target),
            };
            (ruleset, target)
        })
        .collect())
}

/// Show unified diff between original and patched content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        println!("{}", hunk.header().to_string().cyan());
        for change in hunk.iter_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{}", change).red(),
                ChangeTag::Insert => format!("+{}", change).green(),
                ChangeTag::Equal => format!(" {}", change).normal(),
            };
            print!("{}", line);
            if change.missing_newline() {
                println!();
            }
        }
    }
}

fn match_label(matches: usize) -> String {
    match matches {
        1 => "1 match".to_string(),
        n => format!("{n} matches"),
    }
}

fn cmd_apply(
    source: SourceArgs,
    options: RunOptions,
    show_diff: bool,
    json: bool,
) -> Result<()> {
    let dir = resolve_dir(source.dir.clone())?;
    let rulesets = load_rulesets(&source, &dir)?;

    if json {
        let reports = rulesets
            .iter()
            .map(|(ruleset, target)| run(ruleset, target, options))
            .collect::<Result<Vec<_>, _>>()?;
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    let mut total_matched = 0;
    let mut total_noop = 0;

    for (ruleset, target) in &rulesets {
        println!(
            "Applying {} to {}...",
            ruleset.name.bold(),
            target.display()
        );

        let report = run(ruleset, target, options)?;

        for outcome in &report.rules {
            match outcome.matches {
                0 => {
                    println!("  {} {}: no match", "⊙".yellow(), outcome.rule_id);
                    total_noop += 1;
                }
                1 => {
                    println!("  {} {}: 1 match", "✓".green(), outcome.rule_id);
                    total_matched += 1;
                }
                n => {
                    println!(
                        "  {} {}: {} (every occurrence replaced)",
                        "!".red(),
                        outcome.rule_id,
                        match_label(n)
                    );
                    total_matched += 1;
                }
            }
        }

        if show_diff && report.changed() {
            display_diff(target, &report.before, &report.after);
        }

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| target.display().to_string());

        if options.dry_run {
            println!(
                "{}",
                format!("DRY RUN - {} not written ({})", file_name, ruleset.name).cyan()
            );
        } else {
            println!("{}", format!("OK - {} patched ({})", file_name, ruleset.name).green());
        }
        for summary in &report.summaries {
            println!("   - {}", summary);
        }
        println!();
    }

    println!("{}", "Summary:".bold());
    println!("  {} rules matched", format!("{}", total_matched).green());
    println!("  {} rules matched nothing", format!("{}", total_noop).yellow());

    Ok(())
}

fn cmd_check(source: SourceArgs, json: bool) -> Result<()> {
    let dir = resolve_dir(source.dir.clone())?;
    let rulesets = load_rulesets(&source, &dir)?;

    let mut reports = Vec::with_capacity(rulesets.len());
    for (ruleset, target) in &rulesets {
        reports.push(check(ruleset, target)?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        println!("{}", "Ruleset Check Report".bold());
        println!("Ruleset: {}", report.ruleset);
        println!("Target: {}", report.target.display());
        println!();

        for outcome in &report.rules {
            match outcome.matches {
                0 => println!("  {} {}: no match", "⊙".yellow(), outcome.rule_id),
                n => println!("  {} {}: {}", "✓".green(), outcome.rule_id, match_label(n)),
            }
        }

        let refiring: Vec<_> = report.refiring().collect();
        if !refiring.is_empty() {
            println!();
            println!(
                "{} {} ({} rules)",
                "↻".cyan(),
                "FIRE AGAIN ON RE-RUN".cyan().bold(),
                refiring.len()
            );
            for outcome in refiring {
                println!("  - {} ({})", outcome.rule_id, match_label(outcome.matches).dimmed());
            }
        }

        if !report.hints.is_empty() {
            println!();
            println!("{}", "Hints:".bold());
            for hint in &report.hints {
                println!("  {}", hint);
            }
        }
        println!();
    }

    Ok(())
}

fn cmd_list() -> Result<()> {
    for (name, ruleset) in builtin::all()? {
        println!(
            "{} {:<12} {:>3} rules  {}",
            format!("{:<8}", name).bold(),
            ruleset.target.display().to_string(),
            ruleset.rules.len(),
            ruleset.description.as_deref().unwrap_or("").dimmed()
        );
    }
    Ok(())
}
