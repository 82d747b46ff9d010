//! # snapvcs CLI - Snapshot version control from the terminal
//!
//! A command-line front-end for the snapvcs library.
//!
//! ## Features
//! - Initialize a repository and snapshot the working directory
//! - Browse history, per-file history and commit contents
//! - Compare two commits
//! - Check out any commit (destructive)
//!
//! ## Usage
//! ```bash
//! # Initialize in the current directory
//! snapvcs init
//!
//! # Snapshot everything
//! snapvcs commit -m "Initial state"
//!
//! # Show history
//! snapvcs log
//!
//! # Go back to an earlier commit (prefixes accepted)
//! snapvcs checkout 3f2a9c
//! ```

use clap::{Parser, Subcommand};
use colored::*;
use humantime::format_duration;
use snapvcs::{utils, Repository, Result, VcsError, DEFAULT_SHORT_MESSAGE_LEN};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// snapvcs CLI - snapshot version control for directories
#[derive(Parser)]
#[command(name = "snapvcs")]
#[command(version)]
#[command(about = "Snapshot a directory into hash-linked commits and restore any of them")]
#[command(long_about = None)]
struct Cli {
    /// Working directory (defaults to current)
    #[arg(short = 'p', long = "path", value_name = "DIR", global = true)]
    work_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a repository in the working directory
    Init,

    /// Snapshot the whole working directory
    #[command(alias = "ci")]
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Author (defaults to $USER)
        #[arg(short, long)]
        author: Option<String>,
    },

    /// Restore the working directory to a commit (discards uncommitted files)
    #[command(alias = "co")]
    Checkout {
        /// Commit digest, unique prefix, or HEAD
        commit: String,
    },

    /// Show history from HEAD
    Log {
        /// Limit results
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show a commit and its file tree
    Show {
        /// Commit digest, unique prefix, or HEAD
        commit: String,
    },

    /// Show repository status
    Status,

    /// Show every commit containing a file
    FileLog {
        /// Path relative to the working directory
        path: PathBuf,
    },

    /// Compare two commits
    Diff {
        /// Older commit
        from: String,

        /// Newer commit
        to: String,
    },

    /// Delete a file from the working directory
    Rm {
        /// Path relative to the working directory
        path: PathBuf,
    },

    /// Show repository statistics
    Stats,
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays parseable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    let repo = Repository::new(cli.work_dir.unwrap_or_else(|| PathBuf::from(".")));

    match cli.command {
        Commands::Init => cmd_init(&repo),
        Commands::Commit { message, author } => cmd_commit(&repo, &message, author),
        Commands::Checkout { commit } => cmd_checkout(&repo, &commit),
        Commands::Log { limit } => cmd_log(&repo, limit),
        Commands::Show { commit } => cmd_show(&repo, &commit),
        Commands::Status => cmd_status(&repo),
        Commands::FileLog { path } => cmd_file_log(&repo, path),
        Commands::Diff { from, to } => cmd_diff(&repo, &from, &to),
        Commands::Rm { path } => cmd_rm(&repo, path),
        Commands::Stats => cmd_stats(&repo),
    }
}

fn cmd_init(repo: &Repository) -> Result<()> {
    let root = repo.init()?;

    println!("{} Initialized empty repository", "✓".green().bold());
    println!("  Working directory: {}", repo.work_dir().display().to_string().cyan());
    println!("  State: {}", repo.state_dir().display().to_string().cyan());
    println!("  Root commit: {}", utils::short_digest(&root).yellow());
    println!("\nNext steps:");
    println!("  - Snapshot your files: {}", "snapvcs commit -m \"Initial state\"".yellow());

    Ok(())
}

fn cmd_commit(repo: &Repository, message: &str, author: Option<String>) -> Result<()> {
    let author = author.unwrap_or_else(default_author);
    let outcome = repo.commit_with_summary(message, &author)?;

    if !outcome.created {
        println!(
            "{} Nothing changed, HEAD stays at {}",
            "=".yellow().bold(),
            utils::short_digest(&outcome.digest).yellow()
        );
        return Ok(());
    }

    println!(
        "{} Created commit {}",
        "✓".green().bold(),
        utils::short_digest(&outcome.digest).yellow().bold()
    );
    println!("  Message: {}", message.trim().cyan());
    println!("  Author: {}", author.cyan());
    println!("  Files: {}", outcome.files.to_string().cyan());
    println!("  Size: {}", utils::format_bytes(outcome.bytes).cyan());
    println!("  New objects: {}", outcome.new_objects.to_string().cyan());
    if outcome.skipped > 0 {
        println!("  Skipped: {} entries", outcome.skipped.to_string().yellow());
    }
    println!("  Time: {}", format_millis(outcome.duration_ms).cyan());

    Ok(())
}

fn cmd_checkout(repo: &Repository, rev: &str) -> Result<()> {
    let digest = repo.resolve_commit(rev)?;
    println!("{} {}", "Checking out".blue().bold(), utils::short_digest(&digest).yellow());

    let result = repo.checkout(&digest)?;

    println!("{} Checkout complete", "✓".green().bold());
    println!("  Entries removed: {}", result.entries_removed.to_string().yellow());
    println!("  Files restored: {}", result.files_restored.to_string().cyan());
    println!("  Directories created: {}", result.directories_created.to_string().cyan());
    println!("  Bytes written: {}", utils::format_bytes(result.bytes_written).cyan());
    println!("  Time: {}", format_millis(result.duration_ms).cyan());

    Ok(())
}

fn cmd_log(repo: &Repository, limit: Option<usize>) -> Result<()> {
    let history = repo.get_history()?;
    let count = limit.unwrap_or(history.len()).min(history.len());

    for (index, (digest, commit)) in history.iter().take(count).enumerate() {
        let marker = if index == 0 { "*".green().bold() } else { " ".normal() };
        println!(
            "{} {} {} {} {}",
            marker,
            utils::short_digest(digest).yellow().bold(),
            commit.formatted_timestamp().dimmed(),
            commit.author().cyan(),
            commit.short_message(DEFAULT_SHORT_MESSAGE_LEN)
        );
    }

    if count < history.len() {
        println!("{}", format!("... {} older commits", history.len() - count).dimmed());
    }

    Ok(())
}

fn cmd_show(repo: &Repository, rev: &str) -> Result<()> {
    let digest = repo.resolve_commit(rev)?;
    let commit = repo
        .get_commit(&digest)?
        .ok_or_else(|| VcsError::CommitNotFound(digest.clone()))?;

    println!("{} {}", "commit".bold(), digest.yellow());
    println!("  Author: {}", commit.author().cyan());
    println!("  Date: {}", commit.formatted_timestamp());
    match commit.parent_commit_hash() {
        Some(parent) => println!("  Parent: {}", utils::short_digest(parent).yellow()),
        None => println!("  Parent: {}", "(root commit)".dimmed()),
    }
    println!("  Files: {} ({})", commit.file_count(), utils::format_bytes(commit.total_size()));
    println!("\n    {}\n", commit.message());

    let tree = commit.file_tree();
    if tree.is_empty() {
        println!("{}", "(empty tree)".dimmed());
    } else {
        for line in tree.directory_structure() {
            println!("  {}", line);
        }
    }

    Ok(())
}

fn cmd_status(repo: &Repository) -> Result<()> {
    let status = repo.get_status()?;

    if !status.is_repository {
        println!("{}", "Not a repository".yellow());
        println!("  Run {} to create one.", "snapvcs init".yellow());
        return Ok(());
    }

    println!("{}", "Repository Status:".blue().bold());
    println!("  Working directory: {}", status.work_dir.display());
    match &status.head_digest {
        Some(head) => println!("  HEAD: {}", utils::short_digest(head).yellow()),
        None => println!("  HEAD: {}", "(none)".dimmed()),
    }
    if let Some(message) = &status.head_message {
        println!("  Message: {}", message.cyan());
    }
    println!("  Commits: {}", status.total_commits);

    Ok(())
}

fn cmd_file_log(repo: &Repository, path: PathBuf) -> Result<()> {
    let entries = repo.get_file_history(&path)?;

    if entries.is_empty() {
        println!("{}", format!("No commits contain {}", path.display()).yellow());
        return Ok(());
    }

    println!("{} {}", "History of".blue().bold(), path.display().to_string().cyan());
    for (digest, commit, node) in &entries {
        println!(
            "  {} {} {} {} {}",
            utils::short_digest(digest).yellow(),
            commit.formatted_timestamp().dimmed(),
            commit.author().cyan(),
            node.formatted_size(),
            utils::short_digest(node.content_hash().unwrap_or_default()).dimmed()
        );
    }

    Ok(())
}

fn cmd_diff(repo: &Repository, from: &str, to: &str) -> Result<()> {
    let from = repo.resolve_commit(from)?;
    let to = repo.resolve_commit(to)?;
    let diff = repo.compare_commits(&from, &to)?;

    println!(
        "{} {} -> {}",
        "Comparing".blue().bold(),
        utils::short_digest(&from).yellow(),
        utils::short_digest(&to).yellow()
    );

    for path in &diff.changes.added {
        println!("  {} {}", "+".green().bold(), path.display().to_string().green());
    }
    for path in &diff.changes.removed {
        println!("  {} {}", "-".red().bold(), path.display().to_string().red());
    }
    for file in &diff.changes.modified {
        println!(
            "  {} {} ({} -> {})",
            "~".yellow().bold(),
            file.path.display().to_string().yellow(),
            utils::format_bytes(file.old_size),
            utils::format_bytes(file.new_size)
        );
    }

    println!(
        "\n{} added, {} removed, {} modified, {} unchanged",
        diff.changes.added.len().to_string().green(),
        diff.changes.removed.len().to_string().red(),
        diff.changes.modified.len().to_string().yellow(),
        diff.changes.unchanged.len().to_string().dimmed()
    );

    Ok(())
}

fn cmd_rm(repo: &Repository, path: PathBuf) -> Result<()> {
    repo.remove_file_from_repository(&path)?;
    println!("{} Removed {}", "✓".green().bold(), path.display().to_string().cyan());
    println!("  The next commit will no longer contain it.");
    Ok(())
}

fn cmd_stats(repo: &Repository) -> Result<()> {
    let stats = repo.stats()?;

    println!("{}", "Repository Statistics:".blue().bold());
    println!("  Commits in history: {}", stats.total_commits);
    println!("  Commits stored: {}", stats.stored_commits);
    println!("  Authors: {}", stats.unique_authors.join(", ").cyan());
    println!("  Largest snapshot: {} files", stats.max_files_in_commit);
    println!("  Objects: {} ({})", stats.object_count, utils::format_bytes(stats.object_bytes));
    println!("  State directory: {}", utils::format_bytes(stats.state_dir_bytes));

    Ok(())
}

// Helper functions

/// Author from the environment, falling back to "unknown"
fn default_author() -> String {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn format_millis(millis: u64) -> String {
    format_duration(Duration::from_millis(millis)).to_string()
}
