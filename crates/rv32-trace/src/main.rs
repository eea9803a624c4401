use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rv32_trace::{
    compare, decode_listing, decode_record, parse_vhex32, read_records, GoldenRewriter, Step,
    TraceConfig, TraceRecord,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "RV32 decode traces, golden-trace preprocessing and trace diffs", long_about=None)]
struct Cli {
    /// JSON config file (fetch_base, track_writeback)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Subcommand
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the [D] record for one instruction word
    Decode {
        /// Instruction word (hex)
        word: String,
        /// Fetch address (hex)
        addr: String,
    },
    /// Emit a [D] trace for every word of a text-hex memory image
    Listing {
        /// Memory image, one hex word per token
        #[arg(value_name = "VHEX32")]
        input: PathBuf,
        /// Address of the first word (hex); overrides the config
        #[arg(long)]
        base: Option<String>,
    },
    /// Rewrite don't-care register reads in a golden trace
    Golden {
        /// Golden trace file
        #[arg(value_name = "TRACE")]
        input: PathBuf,
        /// Use the reset register values throughout instead of tracking writebacks
        #[arg(long)]
        reset_only: bool,
    },
    /// Compare a trace against a golden one, ignoring don't-care fields
    Diff {
        /// Golden trace file
        golden: PathBuf,
        /// Trace under test
        test: PathBuf,
    },
}

fn parse_hex(s: &str) -> Result<u32> {
    let s = s.trim();
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(hex, 16).with_context(|| format!("bad hex number `{s}`"))
}

fn load_trace(path: &Path) -> Result<Vec<TraceRecord>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    read_records(BufReader::new(file))
        .map(|(n, rec)| rec.with_context(|| format!("{}:{n}", path.display())))
        .collect()
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => TraceConfig::load(path)?,
        None => TraceConfig::default(),
    };

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.cmd {
        Command::Decode { word, addr } => {
            let rec = decode_record(parse_hex(&word)?, parse_hex(&addr)?)?;
            writeln!(out, "{rec}")?;
        }
        Command::Listing { input, base } => {
            let base = base.as_deref().map(parse_hex).transpose()?;
            let cfg = cfg.with_overrides(base, false);
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("read {}", input.display()))?;
            let words = parse_vhex32(&text)?;
            for rec in decode_listing(&words, cfg.fetch_base) {
                writeln!(out, "{rec}")?;
            }
        }
        Command::Golden { input, reset_only } => {
            let file = File::open(&input).with_context(|| format!("open {}", input.display()))?;
            let cfg = cfg.with_overrides(None, reset_only);
            let mut rw = GoldenRewriter::new(cfg.track_writeback);
            // Records are streamed so a trailing garbage line past the end is never parsed
            for (n, rec) in read_records(BufReader::new(file)) {
                let rec = rec.with_context(|| format!("{}:{n}", input.display()))?;
                match rw.step(rec).with_context(|| format!("{}:{n}", input.display()))? {
                    Step::Emit(r) => writeln!(out, "{r}")?,
                    Step::Drop => {}
                    Step::End => break,
                }
            }
        }
        Command::Diff { golden, test } => {
            let report = compare(load_trace(&golden)?, load_trace(&test)?)?;
            for m in &report.mismatches {
                writeln!(out, "At least one error on line {}:", m.line)?;
                writeln!(out, "  Golden: {}", m.golden)?;
                writeln!(out, "  Yours:  {}", m.test)?;
                writeln!(out, "  Errors:")?;
                for (i, e) in m.errors.iter().enumerate() {
                    writeln!(out, "    Error {}: {e}", i + 1)?;
                }
            }
            writeln!(
                out,
                "Compared {} lines, {} errors",
                report.lines_compared,
                report.error_count()
            )?;
            out.flush()?;
            if !report.is_clean() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    out.flush()?;
    Ok(ExitCode::SUCCESS)
}
