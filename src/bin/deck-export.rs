//! deck-export CLI tool
//!
//! Assembles rendered slides into one compact PDF and inspects the result.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use deck_export::export::{self, ExportOptions, NavigatorRegistry, SlideRange, ViewportSize};
use deck_export::pdf::{inspect_pdf, DocumentMetadata};
use deck_export::playback::playback;

/// deck-export - Assemble rendered slides into a single PDF
#[derive(Parser)]
#[command(name = "deck-export")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Assemble rendered slides in file-name order
    deck-export assemble -o deck.pdf \"slides/*.pdf\"

    # Only slides 1 to 3 and 5, with a title
    deck-export assemble -o deck.pdf --slides 1-3,5 --title \"Quarterly Review\" slides/*.pdf

    # Show what an assembled file contains
    deck-export info deck.pdf")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble single-page slide PDFs into one document
    Assemble {
        /// Rendered slides (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Viewport size, e.g. 1280x720
        #[arg(long, value_parser = parse_size)]
        size: Option<ViewportSize>,

        /// Delay before each slide capture, in milliseconds
        #[arg(long, default_value_t = 0)]
        pause: u64,

        /// Delay before the presentation is configured, in milliseconds
        #[arg(long, default_value_t = 0)]
        load_pause: u64,

        /// Slides to export, e.g. 1-3,5,8
        #[arg(long, value_parser = parse_slides)]
        slides: Option<SlideRange>,

        /// Maximum number of slides to export
        #[arg(long)]
        max_slides: Option<u32>,

        /// Slide capture timeout, in milliseconds
        #[arg(long, default_value_t = 30_000)]
        capture_timeout: u64,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// Document author
        #[arg(long)]
        author: Option<String>,

        /// Document subject
        #[arg(long)]
        subject: Option<String>,

        /// Drop link annotations
        #[arg(long)]
        no_links: bool,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Assemble {
            inputs, output, size, pause, load_pause, slides, max_slides,
            capture_timeout, title, author, subject, no_links, open,
        } => {
            let options = ExportOptions {
                size,
                pause: Duration::from_millis(pause),
                load_pause: Duration::from_millis(load_pause),
                slides,
                max_slides,
                capture_timeout: Duration::from_millis(capture_timeout),
                metadata: DocumentMetadata {
                    title,
                    author,
                    subject,
                    ..Default::default()
                },
                copy_links: !no_links,
                ..ExportOptions::new(output)
            };
            cmd_assemble(inputs, options, open).await
        }
        Commands::Info { input } => {
            cmd_info(&input)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn parse_size(s: &str) -> std::result::Result<ViewportSize, String> {
    s.parse().map_err(|e: deck_export::Error| e.to_string())
}

fn parse_slides(s: &str) -> std::result::Result<SlideRange, String> {
    s.parse().map_err(|e: deck_export::Error| e.to_string())
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = false;
            for entry in glob(&pattern)? {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => log::warn!("glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                bail!("No files matched pattern: {}", pattern);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    // Sort paths for consistent ordering
    paths.sort();

    Ok(paths)
}

/// Open a file with the system default application
fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

/// Replay rendered slides through the exporter
async fn cmd_assemble(inputs: Vec<String>, options: ExportOptions, open: bool) -> Result<()> {
    let inputs = expand_globs(inputs)?;

    for path in &inputs {
        if !path.exists() {
            bail!("Input file not found: {}", path.display());
        }
    }

    let (navigator, mut renderer) = playback(inputs);
    let mut registry = NavigatorRegistry::new();
    registry.register(Box::new(navigator));
    let mut navigator = registry.select().await?;

    let summary = export::run(navigator.as_mut(), &mut renderer, &options)
        .await
        .with_context(|| format!("Failed to export {}", options.output_path.display()))?;

    log::info!(
        "{} slide(s), {} distinct image(s), {} distinct font(s)",
        summary.exported_slides, summary.distinct_images, summary.distinct_fonts
    );

    if open {
        open_file(&summary.output_path)?;
    }

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: &Path) -> Result<()> {
    let summary = inspect_pdf(input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", summary.page_count);

    if let Some(title) = summary.title {
        println!("Title: {}", title);
    }
    if let Some(author) = summary.author {
        println!("Author: {}", author);
    }
    if let Some(creator) = summary.creator {
        println!("Creator: {}", creator);
    }
    println!("Images: {}", summary.image_count);
    println!("Font programs: {}", summary.font_program_count);

    Ok(())
}
