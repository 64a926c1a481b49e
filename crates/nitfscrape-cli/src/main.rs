//! nitfscrape - Inspect NITF 2.1 headers and resolve segment offsets
//!
//! This tool reads the file header of NITF 2.1 containers, reports where
//! every image, graphics, text, data extension and reserved extension
//! segment starts, and optionally decodes the segment subheaders.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use nitfscrape_core::codec::{Field, FieldRef};
use nitfscrape_core::{
    DetailsConfig, Error, FieldVisitor, NitfDetails, Record, SegmentKind, SegmentLocation,
};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Inspect NITF 2.1 headers and resolve segment offsets
#[derive(Parser, Debug)]
#[command(name = "nitfscrape")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "summary")]
    format: OutputFormat,

    /// Also decode the image, text and data extension subheaders
    #[arg(long)]
    subheaders: bool,

    /// Print a short blake3 digest of the raw file header bytes
    #[arg(long)]
    fingerprint: bool,

    /// Fail when the declared file length disagrees with the segment layout
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single NITF file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of NITF files to process
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Output format for each processed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One line per segment kind
    Summary,
    /// One line per segment with its offsets and sizes
    Offsets,
    /// Every header field
    Fields,
}

#[derive(Debug, Default)]
struct RunStats {
    processed: usize,
    skipped: usize,
    failed: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, file)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, directory)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

impl Cli {
    fn details_config(&self) -> DetailsConfig {
        DetailsConfig::new().verify_file_length(self.strict)
    }
}

/// Process a single NITF file
fn process_single_file(cli: &Cli, file: &Path) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let report = inspect_file(cli, file)?;
    print!("{}", report);
    Ok(())
}

/// Process every NITF file below a directory
fn process_directory(cli: &Cli, directory: &Path) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut stats = RunStats::default();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        // Skip hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        debug!("Processing file: {}", path.display());
        match inspect_file(cli, path) {
            Ok(report) => {
                print!("{}", report);
                stats.processed += 1;
            }
            Err(e) if is_recoverable(&e) => {
                trace!("Skipping {}: {}", path.display(), e);
                stats.skipped += 1;
            }
            Err(e) => {
                warn!("Error processing {}: {:#}", path.display(), e);
                stats.failed += 1;
            }
        }
    }

    info!(
        "Processed {} files, {} skipped as not NITF 2.1, {} failed",
        stats.processed, stats.skipped, stats.failed
    );

    Ok(())
}

fn is_recoverable(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<Error>()
        .map(Error::is_recoverable)
        .unwrap_or(false)
}

/// Reads one file and renders its report in the requested format
fn inspect_file(cli: &Cli, path: &Path) -> Result<String> {
    trace!("Reading {}", path.display());
    let details = NitfDetails::open_with_config(path, &cli.details_config())
        .with_context(|| format!("Failed to read header: {}", path.display()))?;

    for warning in details.warnings() {
        warn!("{}: {}", path.display(), warning);
    }

    let mut out = String::new();
    writeln!(out, "{}", path.display())?;

    if cli.fingerprint {
        let digest = header_fingerprint(path, details.header().header_length())?;
        writeln!(out, "  fingerprint {}", digest)?;
    }

    match cli.format {
        OutputFormat::Summary => render_summary(&details, &mut out)?,
        OutputFormat::Offsets => render_offsets(&details, &mut out)?,
        OutputFormat::Fields => {
            let mut dump = FieldDump::new(&mut out);
            details.header().visit(&mut dump);
        }
    }

    if cli.subheaders {
        render_subheaders(cli, path, &details, &mut out)?;
    }

    Ok(out)
}

/// Short blake3 digest of the first `header_length` bytes of a file
fn header_fingerprint(path: &Path, header_length: u64) -> Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut header = Vec::with_capacity(header_length as usize);
    BufReader::new(file)
        .take(header_length)
        .read_to_end(&mut header)
        .with_context(|| format!("Failed to read header bytes: {}", path.display()))?;

    let hash = blake3::hash(&header);
    Ok(hash.to_hex()[..8].to_string())
}

fn render_summary(details: &NitfDetails, out: &mut String) -> Result<()> {
    let header = details.header();
    writeln!(
        out,
        "  {} bytes, header {} bytes, title {:?}",
        header.file_length(),
        header.header_length(),
        header.title()
    )?;
    for (kind, locations) in details.layout().iter() {
        let count = locations.map_or(0, <[SegmentLocation]>::len);
        if count > 0 {
            let payload: u64 = locations.into_iter().flatten().map(|l| l.item_size).sum();
            writeln!(out, "  {:<8} {:>3} segments, {} payload bytes", kind, count, payload)?;
        }
    }

    Ok(())
}

fn render_offsets(details: &NitfDetails, out: &mut String) -> Result<()> {
    for (kind, locations) in details.layout().iter() {
        for (index, location) in locations.into_iter().flatten().enumerate() {
            writeln!(
                out,
                "  {:<8} {:>3}  subheader {:>10} +{:<6}  item {:>10} +{}",
                kind,
                index,
                location.subheader_offset,
                location.subheader_size,
                location.item_offset,
                location.item_size
            )?;
        }
    }

    Ok(())
}

fn render_subheaders(cli: &Cli, path: &Path, details: &NitfDetails, out: &mut String) -> Result<()> {
    let mut file = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?,
    );
    let layout = details.layout();

    for index in 0..layout.get(SegmentKind::Image).map_or(0, <[SegmentLocation]>::len) {
        let image = details
            .read_image_subheader(&mut file, index)
            .with_context(|| format!("Failed to decode image subheader {}", index))?;
        if cli.format == OutputFormat::Fields {
            image.visit(&mut FieldDump::new(out));
        } else {
            writeln!(
                out,
                "  image    {:>3}  {:?} {}x{} {} bands, {}",
                index,
                image.image_id(),
                image.rows(),
                image.columns(),
                image.bands().len(),
                image.compression()
            )?;
        }
    }

    for index in 0..layout.get(SegmentKind::Text).map_or(0, <[SegmentLocation]>::len) {
        let text = details
            .read_text_subheader(&mut file, index)
            .with_context(|| format!("Failed to decode text subheader {}", index))?;
        if cli.format == OutputFormat::Fields {
            text.visit(&mut FieldDump::new(out));
        } else {
            writeln!(out, "  text     {:>3}  {:?} {}", index, text.text_id(), text.format())?;
        }
    }

    for index in 0..layout.get(SegmentKind::DataExtension).map_or(0, <[SegmentLocation]>::len) {
        let extension = details
            .read_extension_subheader(&mut file, index)
            .with_context(|| format!("Failed to decode data extension subheader {}", index))?;
        if cli.format == OutputFormat::Fields {
            extension.visit(&mut FieldDump::new(out));
        } else if let Some(overflow) = extension.as_overflow() {
            writeln!(
                out,
                "  des      {:>3}  {} -> {} of item {}",
                index,
                overflow.id(),
                overflow.target(),
                overflow.item()
            )?;
        } else {
            writeln!(
                out,
                "  des      {:>3}  {} v{}, {} subheader bytes",
                index,
                extension.id(),
                extension.version(),
                extension.user_subheader().len()
            )?;
        }
    }

    Ok(())
}

/// Writes every visited field as an indented `NAME value` line
struct FieldDump<'a> {
    out: &'a mut String,
    depth: usize,
}

impl<'a> FieldDump<'a> {
    fn new(out: &'a mut String) -> Self {
        Self { out, depth: 1 }
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }
}

impl FieldVisitor for FieldDump<'_> {
    fn enter_record(&mut self, name: &'static str) {
        self.out.push_str(&format!("{}{}\n", self.indent(), name));
        self.depth += 1;
    }

    fn field(&mut self, field: &Field, value: FieldRef<'_>) {
        self.out
            .push_str(&format!("{}{:<8} {}\n", self.indent(), field.name, value));
    }

    fn blob(&mut self, name: &'static str, bytes: &[u8]) {
        self.out
            .push_str(&format!("{}{:<8} <{} bytes>\n", self.indent(), name, bytes.len()));
    }

    fn exit_record(&mut self, _name: &'static str) {
        self.depth = self.depth.saturating_sub(1);
    }
}
