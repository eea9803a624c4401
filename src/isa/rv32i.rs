use tracing::trace;

use crate::bits::Bits;
use crate::decoder::{DecodeError, Decoded, Decoder, IllegalReason, Opcode};

/// RV32 base integer decoder (uncompressed R/I/S/B/U/J encodings).
///
/// Stateless; one value can be shared freely between threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct Rv32iDecoder;

impl Rv32iDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for Rv32iDecoder {
    fn decode(&self, word: u32) -> Result<Decoded, DecodeError> {
        let illegal = |reason: IllegalReason| {
            trace!(word = format_args!("{word:#010x}"), %reason, "rejected");
            DecodeError::IllegalInstruction { word, reason }
        };

        if word == 0 || word == u32::MAX {
            return Err(illegal(IllegalReason::Reserved));
        }
        // Low bits 11 mark a 32-bit wide encoding
        if word.bits(1, 0) != 0b11 {
            return Err(illegal(IllegalReason::NotWide));
        }
        let op_bits = word.bits(6, 2) as u8;
        let opcode =
            Opcode::from_bits(op_bits).ok_or_else(|| illegal(IllegalReason::UnknownOpcode(op_bits)))?;

        Ok(Decoded {
            word,
            format: opcode.format(),
            opcode,
            full_opcode: word.bits(6, 0) as u8,
            funct3: word.bits(14, 12) as u8,
            funct5: word.bits(31, 27) as u8,
            funct7: word.bits(31, 25) as u8,
            rd: word.bits(11, 7) as u8,
            rs1: word.bits(19, 15) as u8,
            rs2: word.bits(24, 20) as u8,
            imm_i: imm_i(word),
            imm_s: imm_s(word),
            imm_b: imm_b(word),
            imm_u: imm_u(word),
            imm_j: imm_j(word),
        })
    }
}

/// Decode one word with the RV32 base decoder.
pub fn decode(word: u32) -> Result<Decoded, DecodeError> {
    Rv32iDecoder.decode(word)
}

fn imm_i(w: u32) -> u32 {
    w.bits(31, 20).sign_extend_from(11)
}

fn imm_s(w: u32) -> u32 {
    ((w.bits(31, 25) << 5) | w.bits(11, 7)).sign_extend_from(11)
}

fn imm_b(w: u32) -> u32 {
    ((w.bit(31) << 12) | (w.bit(7) << 11) | (w.bits(30, 25) << 5) | (w.bits(11, 8) << 1))
        .sign_extend_from(12)
}

fn imm_u(w: u32) -> u32 {
    w & 0xFFFF_F000
}

fn imm_j(w: u32) -> u32 {
    ((w.bit(31) << 20) | (w.bits(19, 12) << 12) | (w.bit(20) << 11) | (w.bits(30, 21) << 1))
        .sign_extend_from(20)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s_immediate_joins_both_halves() {
        // sw x2, -4(x8): imm[11:5] = 0x7F, imm[4:0] = 0x1C
        assert_eq!(imm_s(0xFE24_2E23), (-4i32) as u32);
        // sw x5, 8(x10)
        assert_eq!(imm_s(0x0055_2423), 8);
    }

    #[test]
    fn b_immediate_scatter() {
        // beq x0, x0, -4096: only bit 31 of the scattered field set
        assert_eq!(imm_b(0x8000_0063), (-4096i32) as u32);
        // bit 7 lands at position 11
        assert_eq!(imm_b(0x0000_00E3), 0x800);
        // bits 11:8 land at positions 4:1
        assert_eq!(imm_b(0x0000_0F63), 0x1E);
    }

    #[test]
    fn j_immediate_scatter() {
        // jal x0, -4
        assert_eq!(imm_j(0xFFDF_F06F), (-4i32) as u32);
        // bit 20 lands at position 11
        assert_eq!(imm_j(0x0010_006F), 0x800);
        // bits 19:12 stay in place
        assert_eq!(imm_j(0x000F_F06F), 0x000F_F000);
    }

    #[test]
    fn u_immediate_keeps_upper_bits() {
        assert_eq!(imm_u(0x1234_5037), 0x1234_5000);
        assert_eq!(imm_u(0xFFFF_FFB7), 0xFFFF_F000);
    }
}
