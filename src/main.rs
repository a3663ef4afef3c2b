//! CLI entry point for `mimebox`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mimebox::config::Config;
use mimebox::export::{export_contents, ExportFilter};
use mimebox::model::{Content, ContentId, Mail};
use mimebox::parser::header::decode_encoded_words;
use mimebox::parser::mbox::MboxSplitter;
use mimebox::parser::mime::Decomposer;
use mimebox::store::loader::{load_path_with, ErrorPolicy, LoadReport};
use mimebox::store::MailBox;

#[derive(Parser)]
#[command(
    name = "mimebox",
    version,
    about = "Decompose MIME messages into bodies, attachments, and embedded parts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose messages and list their contents
    Decompose {
        /// `.eml` or mbox files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Skip messages that fail to decompose instead of stopping
        #[arg(long)]
        skip_errors: bool,
    },
    /// Write attachments and embedded parts to a directory
    Extract {
        /// `.eml` or mbox files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Leave out embedded (inline) parts
        #[arg(long)]
        no_embedded: bool,
        /// Skip messages that fail to decompose instead of stopping
        #[arg(long)]
        skip_errors: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = mimebox::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Decompose {
            inputs,
            json,
            skip_errors,
        } => cmd_decompose(&inputs, json, skip_errors, &config),
        Commands::Extract {
            inputs,
            output,
            no_embedded,
            skip_errors,
        } => cmd_extract(&inputs, output, no_embedded, skip_errors, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mimebox::config::log_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mimebox.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mimebox", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Load every input into a fresh store, with a byte progress bar per file.
fn load_inputs(
    inputs: &[PathBuf],
    skip_errors: bool,
    config: &Config,
) -> anyhow::Result<(MailBox, LoadReport)> {
    let decomposer = Decomposer::new(config.decompose.clone());
    let splitter = MboxSplitter::new(&config.performance);
    let policy = if skip_errors {
        ErrorPolicy::Skip
    } else {
        config.decompose.on_error
    };

    let mut store = MailBox::new();
    let mut report = LoadReport::default();

    for path in inputs {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
        let pb = ProgressBar::new(std::fs::metadata(path)?.len());
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} Decomposing [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                )
                .context("progress bar template")?
                .progress_chars("#>-"),
        );

        let loaded = load_path_with(
            &mut store,
            &decomposer,
            &splitter,
            path,
            policy,
            Some(&|current, total| {
                pb.set_length(total);
                pb.set_position(current);
            }),
        )
        .with_context(|| format!("Failed to decompose {}", path.display()))?;
        pb.finish_and_clear();
        report.merge(loaded);
    }

    Ok((store, report))
}

/// Decompose inputs and print the resulting mails.
fn cmd_decompose(
    inputs: &[PathBuf],
    json: bool,
    skip_errors: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let (store, report) = load_inputs(inputs, skip_errors, config)?;
    let elapsed = start.elapsed();

    if json {
        print_mails_json(&store, &report)?;
    } else {
        print_mails_table(&store, &report, elapsed);
    }
    Ok(())
}

/// Decompose inputs and write their attachments (and embeds) to disk.
fn cmd_extract(
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    no_embedded: bool,
    skip_errors: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let output = output
        .or_else(|| config.export.default_output_dir.clone())
        .context("No output directory given (use -o or set export.default_output_dir)")?;
    let (store, report) = load_inputs(inputs, skip_errors, config)?;

    let pb = ProgressBar::new(report.mail_ids.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Extracting [{bar:40.cyan/blue}] {pos}/{len}")
            .context("progress bar template")?
            .progress_chars("#>-"),
    );

    let filter = ExportFilter {
        include_embedded: config.export.include_embedded && !no_embedded,
    };
    let paths = export_contents(
        &store,
        &report.mail_ids,
        &output,
        filter,
        &|current, total| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        },
    )?;
    pb.finish_and_clear();

    print_extract_summary(&output, &paths, &report);
    Ok(())
}

fn subject(mail: &Mail) -> String {
    mail.header("Subject")
        .map(decode_encoded_words)
        .unwrap_or_default()
}

fn format_ids(ids: &[ContentId]) -> String {
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Print decomposed mails as a human-readable table.
fn print_mails_table(store: &MailBox, report: &LoadReport, elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};

    println!();
    println!(
        "  {} mail(s), {} content(s), {} decoded in {:.2?}",
        report.loaded,
        store.content_count(),
        format_size(store.total_size(), BINARY),
        elapsed
    );
    if report.skipped > 0 {
        println!("  {} message(s) skipped", report.skipped);
    }
    println!();

    if report.mail_ids.is_empty() {
        return;
    }

    println!(
        "  {:<6} {:<36} {:<12} {:<12} {:<12} {:>10}",
        "Mail", "Subject", "Body", "Attachments", "Embeds", "Size"
    );
    println!("  {}", "-".repeat(93));

    for mail in report.mail_ids.iter().filter_map(|&id| store.mail(id)) {
        let subj: String = subject(mail).chars().take(35).collect();
        let size: u64 = store.contents_of(mail.id).map(Content::size).sum();
        println!(
            "  {:<6} {:<36} {:<12} {:<12} {:<12} {:>10}",
            mail.id,
            subj,
            format_ids(&mail.body),
            format_ids(&mail.attachments),
            format_ids(&mail.embeds),
            format_size(size, BINARY)
        );
    }
    println!();
}

/// Print decomposed mails as JSON.
fn print_mails_json(store: &MailBox, report: &LoadReport) -> anyhow::Result<()> {
    let mails: Vec<serde_json::Value> = report
        .mail_ids
        .iter()
        .filter_map(|&id| store.mail(id))
        .map(|mail| {
            let contents: Vec<serde_json::Value> = mail
                .content_ids()
                .filter_map(|id| store.content(id))
                .map(|c| {
                    serde_json::json!({
                        "id": c.id,
                        "kind": c.kind,
                        "content_type": c.content_type,
                        "encoding": c.encoding,
                        "layout": c.layout,
                        "name": c.name,
                        "size": c.size(),
                    })
                })
                .collect();
            serde_json::json!({
                "id": mail.id,
                "subject": subject(mail),
                "body": mail.body,
                "attachments": mail.attachments,
                "embeds": mail.embeds,
                "contents": contents,
            })
        })
        .collect();

    let output = serde_json::json!({
        "loaded": report.loaded,
        "skipped": report.skipped,
        "mails": mails,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_extract_summary(output: &Path, paths: &[PathBuf], report: &LoadReport) {
    println!();
    println!(
        "  Extracted {} file(s) from {} mail(s) to {}",
        paths.len(),
        report.loaded,
        output.display()
    );
    if report.skipped > 0 {
        println!("  {} message(s) skipped", report.skipped);
    }
    println!();
}
