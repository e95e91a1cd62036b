//! Playback statistics merger CLI
//!
//! Command-line tool for inspecting and merging playback statistics exports.

use clap::{Parser, Subcommand, ValueEnum};
use playstat_core::report::{write_csv, write_json};
use playstat_core::{
    scan_directory, DatasetSummary, MergeJob, MergePolicy, OutputTarget, Session,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "playstat")]
#[command(about = "Playback statistics export merger", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show statistics for export files
    Stats {
        /// Export files to read
        #[arg(short, long)]
        file: Vec<PathBuf>,

        /// Directories to scan for export files
        #[arg(short, long)]
        root: Vec<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List export files found under directories
    Scan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,
    },

    /// Merge export files into one
    Merge {
        /// Export files to merge, in order
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Directories to scan for further export files
        #[arg(short, long)]
        root: Vec<PathBuf>,

        /// Merge policy (sum, largest or smallest)
        #[arg(short, long, default_value = "sum", value_parser = parse_policy)]
        policy: MergePolicy,

        /// Output directory (defaults to the Documents folder)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output file name
        #[arg(short, long)]
        name: Option<String>,

        /// Show the merged statistics without writing a file
        #[arg(long)]
        dry_run: bool,
    },

    /// Create a merge job file
    CreateJob {
        /// Output path for the job file
        #[arg(short, long)]
        output: PathBuf,

        /// Export files to merge
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Directories to scan for export files
        #[arg(short, long)]
        root: Vec<PathBuf>,

        /// Merge policy (sum, largest or smallest)
        #[arg(short, long, default_value = "sum", value_parser = parse_policy)]
        policy: MergePolicy,

        /// Directory the merged export is written to
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Merged export file name
        #[arg(long)]
        name: Option<String>,
    },

    /// Run a merge job file
    RunJob {
        /// Path to job file (JSON)
        #[arg(short, long)]
        job: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
    Csv,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn parse_policy(s: &str) -> Result<MergePolicy, String> {
    s.parse().map_err(|e: playstat_core::Error| e.to_string())
}

fn run(command: Commands) -> playstat_core::Result<()> {
    match command {
        Commands::Stats {
            file,
            root,
            format,
            output,
        } => cmd_stats(&file, &root, format, output.as_deref()),
        Commands::Scan { root } => cmd_scan(&root),
        Commands::Merge {
            input,
            root,
            policy,
            output_dir,
            name,
            dry_run,
        } => cmd_merge(&input, &root, policy, output_target(output_dir, name), dry_run),
        Commands::CreateJob {
            output,
            input,
            root,
            policy,
            output_dir,
            name,
        } => cmd_create_job(&output, input, root, policy, output_target(output_dir, name)),
        Commands::RunJob { job } => cmd_run_job(&job),
    }
}

fn output_target(dir: Option<PathBuf>, name: Option<String>) -> OutputTarget {
    let default = OutputTarget::default();
    OutputTarget::new(dir.unwrap_or(default.dir), name.unwrap_or(default.name))
}

/// Build a session from explicit files plus scanned roots
fn load_session(files: &[PathBuf], roots: &[PathBuf]) -> playstat_core::Result<Session> {
    let job = MergeJob {
        inputs: files.to_vec(),
        roots: roots.to_vec(),
        policy: MergePolicy::default(),
        output_dir: PathBuf::new(),
        output_name: String::new(),
    };
    job.load_session()
}

fn cmd_stats(
    files: &[PathBuf],
    roots: &[PathBuf],
    format: ReportFormat,
    output: Option<&Path>,
) -> playstat_core::Result<()> {
    let session = load_session(files, roots)?;

    if session.is_empty() {
        println!("No export files given.");
        return Ok(());
    }

    let summaries: Vec<DatasetSummary> =
        session.datasets().iter().map(DatasetSummary::from).collect();

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    match format {
        ReportFormat::Text => {
            for (i, summary) in summaries.iter().enumerate() {
                if i > 0 {
                    writeln!(writer)?;
                }
                write!(writer, "{}", summary.to_text())?;
            }
        }
        ReportFormat::Json => write_json(&summaries, &mut writer)?,
        ReportFormat::Csv => write_csv(&summaries, &mut writer)?,
    }
    writer.flush()?;

    Ok(())
}

fn cmd_scan(roots: &[PathBuf]) -> playstat_core::Result<()> {
    let result = scan_directory(roots)?;

    println!("Scanned {} root(s):", result.roots.len());
    for root in &result.roots {
        println!("  {}", root.display());
    }
    println!();

    let (datasets, errors) = result.load();
    println!("Found {} export files:", result.files.len());
    for dataset in &datasets {
        println!(
            "  {} ({} entries, {} plays)",
            dataset.file_path.display(),
            dataset.entry_count(),
            dataset.total_plays()
        );
    }

    if !errors.is_empty() {
        println!("\nErrors ({}):", errors.len());
        for (path, err) in &errors {
            println!("  {}: {}", path.display(), err);
        }
    }

    Ok(())
}

fn cmd_merge(
    files: &[PathBuf],
    roots: &[PathBuf],
    policy: MergePolicy,
    target: OutputTarget,
    dry_run: bool,
) -> playstat_core::Result<()> {
    let session = load_session(files, roots)?;

    println!("Merging {} files with policy '{}':", session.len(), policy);
    for path in session.paths() {
        println!("  {}", path.display());
    }
    println!();

    let merged = if dry_run {
        session.merge(policy)?
    } else {
        let outcome = session.merge_to(policy, &target)?;
        println!("Wrote {}", outcome.output_path.display());
        println!();
        outcome.merged
    };

    print!("{}", DatasetSummary::from_merged(&merged, "(merged)").to_text());

    Ok(())
}

fn cmd_create_job(
    output: &Path,
    inputs: Vec<PathBuf>,
    roots: Vec<PathBuf>,
    policy: MergePolicy,
    target: OutputTarget,
) -> playstat_core::Result<()> {
    let job = MergeJob {
        inputs,
        roots,
        policy,
        output_dir: target.dir,
        output_name: target.name,
    };

    job.save(output)?;
    println!("Created job file: {}", output.display());
    println!("Policy: {}", job.policy);
    println!("Inputs: {}", job.inputs.len());
    println!();
    println!("Edit the file to adjust the merge, then run:");
    println!("  playstat run-job --job {}", output.display());

    Ok(())
}

fn cmd_run_job(job_path: &Path) -> playstat_core::Result<()> {
    let job = MergeJob::load(job_path)?;
    println!(
        "Running job with {} inputs and {} roots (policy '{}')",
        job.inputs.len(),
        job.roots.len(),
        job.policy
    );

    let outcome = job.run()?;

    println!("Merged {} files", outcome.merged.sources.len());
    println!("Wrote {}", outcome.output_path.display());
    println!();
    print!("{}", DatasetSummary::from_merged(&outcome.merged, "(merged)").to_text());

    Ok(())
}
