//! objscope - inspect binary containers and disassemble their code
//!
//! Usage:
//!   objscope -f <file>...   File headers
//!   objscope -h <file>...   Section headers
//!   objscope -d <file>...   Disassemble code sections
//!   objscope -t <file>...   Symbol table
//!   objscope -i             Supported architectures and targets

use anyhow::{Context, Result};
use clap::{ArgGroup, CommandFactory, Parser};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

use objscope::bfd::{Bfd, Source};
use objscope::config::Config;
use objscope::core::arch::DEFAULT_TARGET;
use objscope::dump::{self, DumpOptions, Mode};
use objscope::logging;

#[derive(Parser)]
#[command(name = "objscope")]
#[command(about = dump::DESCRIPTION, long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(group(ArgGroup::new("mode").multiple(false)))]
struct Cli {
    /// Display archive member headers
    #[arg(short = 'a', long, group = "mode")]
    archive_headers: bool,

    /// Display the contents of the overall file header
    #[arg(short = 'f', long, group = "mode")]
    file_headers: bool,

    /// Display the contents of the section headers
    #[arg(short = 'h', long, group = "mode")]
    section_headers: bool,

    /// Display assembler contents of executable sections
    #[arg(short = 'd', long, group = "mode")]
    disassemble: bool,

    /// Display assembler contents of all sections
    #[arg(short = 'D', long, group = "mode")]
    disassemble_all: bool,

    /// Display the full contents of all sections
    #[arg(short = 's', long, group = "mode")]
    full_contents: bool,

    /// Display the contents of the symbol table
    #[arg(short = 't', long, group = "mode")]
    syms: bool,

    /// List object formats and architectures supported
    #[arg(short = 'i', long, group = "mode")]
    info: bool,

    /// Display this program's version number
    #[arg(short = 'v', long, group = "mode")]
    version: bool,

    /// Display this information
    #[arg(short = 'H', long, group = "mode")]
    help: bool,

    /// Decode mangled symbol names
    #[arg(short = 'C', long)]
    demangle: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Files to inspect
    files: Vec<PathBuf>,
}

impl Cli {
    fn mode(&self) -> Option<Mode> {
        let modes = [
            (self.archive_headers, Mode::ArchiveHeaders),
            (self.file_headers, Mode::FileHeaders),
            (self.section_headers, Mode::SectionHeaders),
            (self.disassemble, Mode::Disassemble),
            (self.disassemble_all, Mode::DisassembleAll),
            (self.full_contents, Mode::FullContents),
            (self.syms, Mode::Syms),
        ];
        modes.into_iter().find(|(set, _)| *set).map(|(_, m)| m)
    }
}

fn dump_file(path: &Path, mode: Mode, config: &Config, opts: &DumpOptions) -> Result<String> {
    let bfd = Bfd::open_with(Source::Path(path.to_path_buf()), DEFAULT_TARGET, config)
        .with_context(|| format!("{}", path.display()))?;
    let report = dump::render(&bfd, mode, opts)
        .with_context(|| format!("{}: report failed", path.display()))?;
    Ok(report)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_with(cli.json, "warn");

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => Config::default(),
    };

    if cli.version {
        println!("objscope {}", dump::VERSION);
        return Ok(());
    }
    if cli.info {
        print!("{}", dump::info("objscope"));
        return Ok(());
    }
    let mode = match cli.mode() {
        Some(m) if !cli.help => m,
        _ => {
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    let opts = DumpOptions {
        demangle: cli.demangle,
        max_instructions: config.disasm.max_instructions,
        prefer_backend: config.disasm.prefer_backend,
    };
    debug!(files = cli.files.len(), ?mode, "Dumping");

    let reports: Vec<Result<String>> = cli
        .files
        .par_iter()
        .map(|path| dump_file(path, mode, &config, &opts))
        .collect();

    for report in reports {
        match report {
            Ok(text) => print!("{}", text),
            Err(e) => eprintln!("objscope: {:#}", e),
        }
    }
    Ok(())
}
