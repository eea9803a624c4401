use std::fmt::Write as _;

use serde::Serialize;

use crate::decoder::{Decoded, Format};

/// The fields of a decoded instruction that its format gives meaning to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dump {
    #[serde(rename = "type")]
    pub format: Format,
    pub opcode: u8,
    pub full_opcode: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funct3: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funct7: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rd: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rs1: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rs2: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imm: Option<u32>,
}

impl From<&Decoded> for Dump {
    fn from(d: &Decoded) -> Self {
        let mut out = Dump {
            format: d.format(),
            opcode: d.opcode().bits(),
            full_opcode: d.full_opcode(),
            funct3: None,
            funct7: None,
            rd: None,
            rs1: None,
            rs2: None,
            imm: None,
        };
        match d.format() {
            Format::R => {
                out.funct3 = Some(d.funct3());
                out.funct7 = Some(d.funct7());
                out.rd = Some(d.rd());
                out.rs1 = Some(d.rs1());
                out.rs2 = Some(d.rs2());
            }
            Format::I => {
                out.funct3 = Some(d.funct3());
                out.rd = Some(d.rd());
                out.rs1 = Some(d.rs1());
                out.imm = Some(d.imm());
            }
            Format::S | Format::B => {
                out.funct3 = Some(d.funct3());
                out.rs1 = Some(d.rs1());
                out.rs2 = Some(d.rs2());
                out.imm = Some(d.imm());
            }
            Format::U | Format::J => {
                out.rd = Some(d.rd());
                out.imm = Some(d.imm());
            }
        }
        out
    }
}

/// Multi-line `name = value` dump, one line per field of the format.
pub fn fmt_decoded(d: &Decoded) -> String {
    let dump = Dump::from(d);
    let mut s = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(s, "type   = {}", dump.format);
    let _ = writeln!(s, "opcode = {:#X}", dump.opcode);
    let _ = writeln!(s, "fullop = {:#X}", dump.full_opcode);
    if let Some(v) = dump.funct3 {
        let _ = writeln!(s, "funct3 = {v:#X}");
    }
    if let Some(v) = dump.funct7 {
        let _ = writeln!(s, "funct7 = {v:#X}");
    }
    for (name, reg) in [("rd ", dump.rd), ("rs1", dump.rs1), ("rs2", dump.rs2)] {
        if let Some(r) = reg {
            let _ = writeln!(s, "{name}    = x{r}");
        }
    }
    if let Some(v) = dump.imm {
        let _ = writeln!(s, "imm    = {v:#X}");
    }
    s
}
