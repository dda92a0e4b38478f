mod audit;
mod error;
mod ingest;
mod lexicon;
mod merge;
mod model;
mod parser;
mod pdf;
mod settings;
mod validate;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use settings::Settings;

#[derive(Parser)]
#[command(name = "script_ingest", about = "Screenplay PDFs to scene-level JSON memories")]
struct Cli {
    /// TOML settings file (default: ./script_ingest.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse every script in a folder into <name>_memory.json files
    Ingest {
        /// Folder of PDF/TXT scripts
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Folder for per-episode JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only this file name inside the input folder
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Concatenate per-episode files into one master array
    Merge {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Strict checks over scene files, with a text report
    Validate {
        /// Folder of *.json files, or a single file
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
    /// Heuristic text-quality audit
    Audit {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Episode file and merged scene counts
    Stats,
    /// Show how each line of one script is classified
    Inspect {
        file: PathBuf,
        /// Only this page (1-based)
        #[arg(short, long)]
        page: Option<usize>,
    },
    /// Ingest + merge + validate
    Run,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Ingest { input, output, file } => {
            let input = input.unwrap_or_else(|| settings.paths.scripts.clone());
            let output = output.unwrap_or_else(|| settings.paths.output.clone());
            run_ingest(&settings, input, output, file.as_deref())
        }
        Commands::Merge { input, output } => {
            let input = input.unwrap_or_else(|| settings.paths.output.clone());
            let output = output.unwrap_or_else(|| settings.paths.merged.clone());
            let summary = merge::merge_dir(&input, &output)?;
            summary.print(&output);
            Ok(())
        }
        Commands::Validate { input, report } => {
            let input = input.unwrap_or_else(|| settings.paths.output.clone());
            let report = report.unwrap_or_else(|| settings.paths.report.clone());
            run_validate(input, report)
        }
        Commands::Audit { input } => {
            let input = input.unwrap_or_else(|| settings.paths.output.clone());
            let paths = validate::json_inputs(&input)?;
            if paths.is_empty() {
                println!("No JSON files in {}.", input.display());
                return Ok(());
            }
            audit::audit_paths(&paths).print();
            Ok(())
        }
        Commands::Stats => {
            let episodes = merge::memory_files(&settings.paths.output)?;
            println!("Episode files: {}", episodes.len());
            if settings.paths.merged.is_file() {
                let scenes = model::read_scenes(&settings.paths.merged)?;
                println!("Merged scenes: {}", scenes.len());
            } else {
                println!("Merged scenes: - ({} not found)", settings.paths.merged.display());
            }
            Ok(())
        }
        Commands::Inspect { file, page } => {
            let rules = parser::Rules::from_settings(&settings)?;
            let pages = pdf::extract_pages(&file, &settings.layout)?;
            let rows = parser::inspect(&pages, &rules);

            println!("{:>4} | {:>3} | {:<13} | {}", "Page", "Ind", "Type", "Text");
            println!("{}", "-".repeat(90));
            let mut shown = 0;
            for row in rows.iter().filter(|r| page.map_or(true, |p| r.page == p)) {
                if row.raw.trim().is_empty() {
                    continue;
                }
                let (label, text) = match &row.line {
                    Some(line) => (line.label(), line.text()),
                    None => ("JUNK", row.raw.trim()),
                };
                println!(
                    "{:>4} | {:>3} | {:<13} | {}",
                    row.page,
                    row.indent,
                    label,
                    truncate(text, 64)
                );
                shown += 1;
            }
            println!("\n{} lines across {} pages", shown, pages.len());
            Ok(())
        }
        Commands::Run => {
            let t_ingest = Instant::now();
            run_ingest(
                &settings,
                settings.paths.scripts.clone(),
                settings.paths.output.clone(),
                None,
            )?;
            println!("Ingest finished in {:.1}s", t_ingest.elapsed().as_secs_f64());

            println!();
            let summary = merge::merge_dir(&settings.paths.output, &settings.paths.merged)?;
            summary.print(&settings.paths.merged);

            println!();
            run_validate(settings.paths.output.clone(), settings.paths.report.clone())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn run_ingest(
    settings: &Settings,
    input: PathBuf,
    output: PathBuf,
    file: Option<&str>,
) -> anyhow::Result<()> {
    let paths = ingest::discover(&input, file)?;
    if paths.is_empty() {
        println!("No scripts found in {}.", input.display());
        return Ok(());
    }
    println!("Processing {} scripts from {}...", paths.len(), input.display());
    let summary = ingest::ingest_all(&paths, &output, settings)?;
    summary.print();
    Ok(())
}

fn run_validate(input: PathBuf, report: PathBuf) -> anyhow::Result<()> {
    let paths = validate::json_inputs(&input)?;
    println!("Scanning {} files in {}...\n", paths.len(), input.display());
    let summary = validate::validate_paths(&paths, &report)?;
    summary.print();
    println!("Report written to {}", report.display());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
