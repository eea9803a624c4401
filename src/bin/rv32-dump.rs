use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rv32_decode::disasm::{fmt_decoded, Dump};
use rv32_decode::{Decoder, Rv32iDecoder};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Dump the fields of RV32 instruction words"
)]
struct Opts {
    /// Emit one JSON object per word instead of the text dump
    #[arg(long)]
    json: bool,
    /// Instruction words in hex (0x prefix optional)
    #[arg(value_name = "WORD", required = true)]
    words: Vec<String>,
}

fn parse_word(s: &str) -> Result<u32> {
    let s = s.trim();
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(hex, 16).with_context(|| format!("bad instruction word `{s}`"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    let dec = Rv32iDecoder::new();

    let mut failed = false;
    for raw in &opts.words {
        let word = parse_word(raw)?;
        match dec.decode(word) {
            Ok(d) if opts.json => println!("{}", serde_json::to_string(&Dump::from(&d))?),
            Ok(d) => print!("{}", fmt_decoded(&d)),
            Err(e) => {
                eprintln!("{e}");
                failed = true;
            }
        }
    }

    anyhow::ensure!(!failed, "one or more words failed to decode");
    Ok(())
}
