use std::fmt;

use serde::{Deserialize, Serialize};

/// Encoding layout of a 32-bit instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    R,
    I,
    S,
    B,
    U,
    J,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Format::R => "R",
            Format::I => "I",
            Format::S => "S",
            Format::B => "B",
            Format::U => "U",
            Format::J => "J",
        };
        f.write_str(s)
    }
}

/// Primary opcode (bits 6:2). Only opcodes this decoder accepts exist here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Load = 0b00000,
    Custom0 = 0b00010,
    MiscMem = 0b00011,
    OpImm = 0b00100,
    Auipc = 0b00101,
    Store = 0b01000,
    Amo = 0b01011,
    Op = 0b01100,
    Lui = 0b01101,
    Branch = 0b11000,
    Jalr = 0b11001,
    Jal = 0b11011,
    System = 0b11100,
}

impl Opcode {
    pub fn from_bits(bits: u8) -> Option<Self> {
        let op = match bits {
            0b00000 => Opcode::Load,
            0b00010 => Opcode::Custom0,
            0b00011 => Opcode::MiscMem,
            0b00100 => Opcode::OpImm,
            0b00101 => Opcode::Auipc,
            0b01000 => Opcode::Store,
            0b01011 => Opcode::Amo,
            0b01100 => Opcode::Op,
            0b01101 => Opcode::Lui,
            0b11000 => Opcode::Branch,
            0b11001 => Opcode::Jalr,
            0b11011 => Opcode::Jal,
            0b11100 => Opcode::System,
            _ => return None,
        };
        Some(op)
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// The fixed opcode to format table.
    pub fn format(self) -> Format {
        match self {
            // CUSTOM_0 carries the non-standard extension instructions
            Opcode::Op | Opcode::Custom0 | Opcode::Amo => Format::R,
            Opcode::Load | Opcode::OpImm | Opcode::Jalr | Opcode::System | Opcode::MiscMem => {
                Format::I
            }
            Opcode::Store => Format::S,
            Opcode::Branch => Format::B,
            Opcode::Lui | Opcode::Auipc => Format::U,
            Opcode::Jal => Format::J,
        }
    }

    /// Name as it appears in the ISA opcode map.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Load => "LOAD",
            Opcode::Custom0 => "CUSTOM_0",
            Opcode::MiscMem => "MISC_MEM",
            Opcode::OpImm => "OP_IMM",
            Opcode::Auipc => "AUIPC",
            Opcode::Store => "STORE",
            Opcode::Amo => "AMO",
            Opcode::Op => "OP",
            Opcode::Lui => "LUI",
            Opcode::Branch => "BRANCH",
            Opcode::Jalr => "JALR",
            Opcode::Jal => "JAL",
            Opcode::System => "SYSTEM",
        }
    }
}

/// Which validation rule rejected a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalReason {
    /// All-zero or all-one word.
    Reserved,
    /// Low two bits not `11`: a 16-bit (compressed) encoding.
    NotWide,
    /// Primary opcode outside the supported table.
    UnknownOpcode(u8),
}

impl fmt::Display for IllegalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IllegalReason::Reserved => f.write_str("reserved encoding"),
            IllegalReason::NotWide => f.write_str("not a 32-bit encoding"),
            IllegalReason::UnknownOpcode(op) => write!(f, "unknown opcode {op:#07b}"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Illegal instruction {word:#010x} ({reason})")]
    IllegalInstruction { word: u32, reason: IllegalReason },
}

/// AMO funct5 for LR.W, which has no rs2 operand.
const FUNCT5_LR: u8 = 0b00010;

/// A validated instruction word with every subfield extracted.
///
/// All five immediates are computed up front, but [`Decoded::imm`] only hands
/// out the one matching [`Decoded::format`]. The register and funct getters
/// return raw bits whatever the format; use the `used_*` queries to learn
/// whether a field actually means something for this instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub(crate) word: u32,
    pub(crate) format: Format,
    pub(crate) opcode: Opcode,
    pub(crate) full_opcode: u8,
    pub(crate) funct3: u8,
    pub(crate) funct5: u8,
    pub(crate) funct7: u8,
    pub(crate) rd: u8,
    pub(crate) rs1: u8,
    pub(crate) rs2: u8,
    pub(crate) imm_i: u32,
    pub(crate) imm_s: u32,
    pub(crate) imm_b: u32,
    pub(crate) imm_u: u32,
    pub(crate) imm_j: u32,
}

impl Decoded {
    pub fn word(&self) -> u32 {
        self.word
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn full_opcode(&self) -> u8 {
        self.full_opcode
    }

    pub fn funct3(&self) -> u8 {
        self.funct3
    }

    /// # Panics
    /// If the opcode is not AMO.
    pub fn funct5(&self) -> u8 {
        assert!(
            self.opcode == Opcode::Amo,
            "funct5 read on non-AMO instruction {:#010x}",
            self.word
        );
        self.funct5
    }

    pub fn funct7(&self) -> u8 {
        self.funct7
    }

    pub fn rd(&self) -> u8 {
        self.rd
    }

    pub fn rs1(&self) -> u8 {
        self.rs1
    }

    pub fn rs2(&self) -> u8 {
        self.rs2
    }

    /// Sign-extended immediate for this instruction's format.
    ///
    /// # Panics
    /// On R-type instructions, which carry no immediate.
    pub fn imm(&self) -> u32 {
        match self.format {
            Format::R => panic!("imm read on R-type instruction {:#010x}", self.word),
            Format::I => self.imm_i,
            Format::S => self.imm_s,
            Format::B => self.imm_b,
            Format::U => self.imm_u,
            Format::J => self.imm_j,
        }
    }

    pub fn used_rd(&self) -> Option<u8> {
        match self.opcode {
            Opcode::Store | Opcode::Branch | Opcode::MiscMem => None,
            Opcode::System if self.funct3 == 0 => None,
            _ => Some(self.rd),
        }
    }

    pub fn used_rs1(&self) -> Option<u8> {
        match self.opcode {
            Opcode::Lui | Opcode::Auipc | Opcode::Jal | Opcode::MiscMem => None,
            // ECALL/EBREAK, and the CSR forms whose rs1 slot is a 5-bit immediate
            Opcode::System if self.funct3 == 0 || self.funct3 & 0b100 != 0 => None,
            _ => Some(self.rs1),
        }
    }

    pub fn used_rs2(&self) -> Option<u8> {
        match self.opcode {
            Opcode::Op | Opcode::Custom0 | Opcode::Store | Opcode::Branch => Some(self.rs2),
            Opcode::Amo if self.funct5 != FUNCT5_LR => Some(self.rs2),
            _ => None,
        }
    }

    pub fn used_funct3(&self) -> Option<u8> {
        match self.format {
            Format::U | Format::J => None,
            _ => Some(self.funct3),
        }
    }

    pub fn used_funct7(&self) -> Option<u8> {
        match self.opcode {
            Opcode::Op | Opcode::Custom0 | Opcode::Amo => Some(self.funct7),
            Opcode::OpImm if self.is_shift_imm() => Some(self.funct7),
            _ => None,
        }
    }

    pub fn used_imm(&self) -> Option<u32> {
        match self.format {
            Format::R => None,
            _ => Some(self.imm()),
        }
    }

    /// Shift amount of SLLI/SRLI/SRAI.
    pub fn shamt(&self) -> Option<u8> {
        if self.is_shift_imm() {
            Some((self.imm_i & 0x1F) as u8)
        } else {
            None
        }
    }

    pub fn is_fence(&self) -> bool {
        self.opcode == Opcode::MiscMem
    }

    pub fn is_system(&self) -> bool {
        self.opcode == Opcode::System
    }

    pub fn is_branch(&self) -> bool {
        self.format == Format::B
    }

    pub fn is_memory(&self) -> bool {
        matches!(self.opcode, Opcode::Load | Opcode::Store | Opcode::Amo)
    }

    fn is_shift_imm(&self) -> bool {
        self.opcode == Opcode::OpImm && matches!(self.funct3, 0b001 | 0b101)
    }
}

pub trait Decoder {
    fn decode(&self, word: u32) -> Result<Decoded, DecodeError>;
}
