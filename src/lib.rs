pub mod bits;
pub mod decoder;
pub mod disasm;

pub mod isa {
    pub mod rv32i; // RV32 base integer, 32-bit encodings only
}

pub use decoder::{DecodeError, Decoded, Decoder, Format, IllegalReason, Opcode};
pub use isa::rv32i::{decode, Rv32iDecoder};
