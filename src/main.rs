// Copyright (c) 2026 Codegen-Link Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};

use codegen_link::logging::init_logging;
use codegen_link::serializer::write_records;
use codegen_link::toolchain::{clean_cache, BuildOptions, ToolPaths, Toolchain};
use codegen_link::utils::canonicalize_path;
use codegen_link::{ArchConfig, ArtifactPaths, LinkConfig, LinkedFile, Linker, ParseOptions};

#[derive(Parser, Debug)]
#[command(
    name = "codegen-link",
    version,
    about = "Correlate guest and host codegen with the C source lines it came from"
)]
struct Cli {
    /// Enable debug output
    #[arg(short = 'd', long = "debug", global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build every C file under a directory for both architectures and correlate them
    Link(LinkArgs),
    /// Correlate one source file against already generated artifacts
    Correlate(CorrelateArgs),
    /// Remove cached per-file build directories
    Clean(CleanArgs),
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output file prefix; records are written to <prefix>.jsonl
    #[arg(short = 'o', long = "output", default_value = "output")]
    output: String,

    /// Only write lines that produced code in at least one representation
    #[arg(long = "skip-empty", default_value_t = false)]
    skip_empty: bool,

    /// Source suffixes recognised in disassembly line annotations
    #[arg(long = "annotation-suffixes", value_delimiter = ',', default_values_t = vec!["c".to_string(), "cc".to_string(), "cpp".to_string()])]
    annotation_suffixes: Vec<String>,
}

#[derive(Args, Debug)]
struct ArchArgs {
    /// Guest architecture (arm or x86)
    #[arg(long = "guest", default_value = "arm")]
    guest: String,

    /// Host architecture (arm or x86)
    #[arg(long = "host", default_value = "x86")]
    host: String,
}

impl ArchArgs {
    fn resolve(&self) -> Result<(ArchConfig, ArchConfig)> {
        let lookup = |name: &str| {
            ArchConfig::by_name(name).ok_or_else(|| anyhow!("unknown architecture {name:?}"))
        };
        Ok((lookup(self.guest.as_str())?, lookup(self.host.as_str())?))
    }
}

#[derive(Args, Debug)]
struct LinkArgs {
    /// Input directory
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Wanted files' names, comma separated
    #[arg(long = "files", value_delimiter = ',')]
    files: Vec<String>,

    /// Optimization level
    #[arg(short = 'O', long = "opt", default_value_t = 0)]
    opt: u8,

    /// Extra cflags
    #[arg(short = 'C', long = "cflags", default_value = "", allow_hyphen_values = true)]
    cflags: String,

    /// Extra include dirs
    #[arg(short = 'I', long = "includes", num_args = 0..)]
    includes: Vec<PathBuf>,

    /// Directory holding the per-file build caches
    #[arg(long = "work-dir", default_value = "temp")]
    work_dir: PathBuf,

    /// Build into a throwaway directory instead of the cache
    #[arg(long = "no-cache", default_value_t = false)]
    no_cache: bool,

    #[arg(long = "clang", env = "CLANG_PATH")]
    clang: Option<PathBuf>,

    #[arg(long = "llc", env = "LLC_PATH")]
    llc: Option<PathBuf>,

    #[arg(long = "opt-tool", env = "OPT_PATH")]
    opt_tool: Option<PathBuf>,

    #[command(flatten)]
    arch: ArchArgs,

    #[command(flatten)]
    out: OutputArgs,
}

#[derive(Args, Debug)]
struct CorrelateArgs {
    /// C source file the artifacts were built from
    #[arg(long = "source")]
    source: PathBuf,

    #[arg(long = "guest-ir")]
    guest_ir: PathBuf,

    #[arg(long = "host-ir")]
    host_ir: PathBuf,

    #[arg(long = "guest-asm")]
    guest_asm: PathBuf,

    #[arg(long = "host-asm")]
    host_asm: PathBuf,

    #[command(flatten)]
    arch: ArchArgs,

    #[command(flatten)]
    out: OutputArgs,
}

#[derive(Args, Debug)]
struct CleanArgs {
    #[arg(long = "work-dir", default_value = "temp")]
    work_dir: PathBuf,
}

fn open_output(out: &OutputArgs) -> Result<(PathBuf, BufWriter<File>)> {
    let path = PathBuf::from(format!("{}.jsonl", out.output));
    let file = File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok((path, BufWriter::new(file)))
}

fn parse_options(out: &OutputArgs) -> ParseOptions {
    ParseOptions {
        source_suffixes: out.annotation_suffixes.clone(),
    }
}

fn run_link(args: LinkArgs, debug: bool) -> Result<()> {
    let (guest, host) = args.arch.resolve()?;
    let tools = ToolPaths {
        clang: args.clang,
        llc: args.llc,
        opt: args.opt_tool,
    };
    let options = BuildOptions {
        opt_level: args.opt,
        cflags: args.cflags.split_whitespace().map(str::to_string).collect(),
        includes: args.includes,
        force: debug,
    };
    let toolchain = Toolchain::new(&tools, options)?;

    // Held until the end of the run so the throwaway directory outlives the builds
    let scratch = if args.no_cache {
        Some(tempfile::tempdir().context("failed to create temporary work dir")?)
    } else {
        None
    };
    let work_root = match &scratch {
        Some(dir) => dir.path().to_path_buf(),
        None => args.work_dir,
    };

    let mut config = LinkConfig::new(args.input, work_root);
    config.guest = guest;
    config.host = host;
    config.wanted = args.files;
    config.parse = parse_options(&args.out);
    let linker = Linker::new(toolchain, config);

    let (out_path, mut writer) = open_output(&args.out)?;
    let mut total = 0;
    for linked in linker.link_all()? {
        let linked = linked?;
        let file = canonicalize_path(&linked.path);
        total += write_records(&mut writer, &file, linked.correlator().records(), args.out.skip_empty)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
    }
    writer.flush()?;
    log::info!("Wrote {} records to {}", total, out_path.display());
    Ok(())
}

fn run_correlate(args: CorrelateArgs) -> Result<()> {
    let (guest, host) = args.arch.resolve()?;
    // Only the metadata and listing locations are read
    let paths = |ir_info: PathBuf, asm_dump: PathBuf| ArtifactPaths {
        ir: PathBuf::new(),
        ir_info,
        asm: PathBuf::new(),
        asm_dump,
        obj: PathBuf::new(),
        tmp: PathBuf::new(),
    };
    let guest_paths = paths(args.guest_ir, args.guest_asm);
    let host_paths = paths(args.host_ir, args.host_asm);
    let linked = LinkedFile::load(
        &args.source,
        (&guest, &guest_paths),
        (&host, &host_paths),
        &parse_options(&args.out),
    )?;

    let (out_path, mut writer) = open_output(&args.out)?;
    let file = canonicalize_path(&linked.path);
    let n = write_records(&mut writer, &file, linked.correlator().records(), args.out.skip_empty)
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    writer.flush()?;
    log::info!("Wrote {} records to {}", n, out_path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _logger = init_logging(cli.debug)?;

    match cli.command {
        Commands::Link(args) => run_link(args, cli.debug),
        Commands::Correlate(args) => run_correlate(args),
        Commands::Clean(args) => {
            let removed = clean_cache(&args.work_dir)
                .with_context(|| format!("failed to clean {}", args.work_dir.display()))?;
            log::info!("Removed {} cached entries from {}", removed, args.work_dir.display());
            Ok(())
        }
    }
}
