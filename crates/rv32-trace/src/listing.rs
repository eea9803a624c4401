use rv32_decode::{decode, DecodeError, Format};
use tracing::debug;

use crate::record::TraceRecord;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Bad word `{token}` on line {line} of memory image")]
pub struct VhexError {
    pub line: usize,
    pub token: String,
}

/// Words of a text-hex memory image: whitespace separated, `//` comments
/// run to end of line.
pub fn parse_vhex32(text: &str) -> Result<Vec<u32>, VhexError> {
    let mut words = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.split("//").next().unwrap_or("");
        for token in line.split_whitespace() {
            let w = u32::from_str_radix(token, 16).map_err(|_| VhexError {
                line: i + 1,
                token: token.to_string(),
            })?;
            words.push(w);
        }
    }
    Ok(words)
}

/// The `[D]` record for one instruction word fetched at `pc`.
pub fn decode_record(word: u32, pc: u32) -> Result<TraceRecord, DecodeError> {
    let d = decode(word)?;
    let imm = match d.format() {
        Format::R => 0,
        _ => d.imm(),
    };
    Ok(TraceRecord::D {
        pc,
        opcode: d.full_opcode(),
        rd: d.rd(),
        rs1: d.rs1(),
        rs2: d.rs2(),
        funct3: d.funct3(),
        funct7: d.funct7(),
        imm,
        shamt: (imm & 0x1F) as u8,
    })
}

/// `[D]` records for consecutive words starting at `base`. An illegal word
/// ends the listing.
pub fn decode_listing(words: &[u32], base: u32) -> Vec<TraceRecord> {
    let mut out = Vec::with_capacity(words.len());
    let mut pc = base;
    for &w in words {
        match decode_record(w, pc) {
            Ok(rec) => out.push(rec),
            Err(e) => {
                debug!(pc = format_args!("{pc:#010x}"), "listing ends: {e}");
                break;
            }
        }
        pc = pc.wrapping_add(4);
    }
    out
}
