use pretty_assertions::assert_eq;

use rv32_decode::{decode, DecodeError, Decoder, Format, IllegalReason, Opcode, Rv32iDecoder};

// Every 5-bit opcode this decoder accepts, with the format it must map to.
const TABLE: &[(u8, Format)] = &[
    (0b01100, Format::R), // OP
    (0b00010, Format::R), // CUSTOM_0
    (0b01011, Format::R), // AMO
    (0b00000, Format::I), // LOAD
    (0b00100, Format::I), // OP_IMM
    (0b11001, Format::I), // JALR
    (0b11100, Format::I), // SYSTEM
    (0b00011, Format::I), // MISC_MEM
    (0b01000, Format::S), // STORE
    (0b11000, Format::B), // BRANCH
    (0b01101, Format::U), // LUI
    (0b00101, Format::U), // AUIPC
    (0b11011, Format::J), // JAL
];

fn illegal_reason(word: u32) -> IllegalReason {
    match decode(word) {
        Err(DecodeError::IllegalInstruction { word: w, reason }) => {
            assert_eq!(w, word);
            reason
        }
        Ok(d) => panic!("{word:#010x} decoded as {:?}", d.format()),
    }
}

#[test]
fn reserved_patterns_are_illegal() {
    assert_eq!(illegal_reason(0x0000_0000), IllegalReason::Reserved);
    assert_eq!(illegal_reason(0xFFFF_FFFF), IllegalReason::Reserved);
}

#[test]
fn compressed_width_markers_are_illegal() {
    for low in [0b00u32, 0b01, 0b10] {
        for word in [0x0000_0090 | low, 0xFE01_0110 | low, 0xFFFF_FFFC | low] {
            assert_eq!(illegal_reason(word), IllegalReason::NotWide, "{word:#010x}");
        }
    }
}

#[test]
fn every_opcode_maps_to_its_format_or_is_rejected() {
    for op in 0u8..32 {
        let word = ((op as u32) << 2) | 0b11 | (5 << 7);
        let expected = TABLE.iter().find(|(o, _)| *o == op).map(|(_, f)| *f);
        match (decode(word), expected) {
            (Ok(d), Some(f)) => {
                assert_eq!(d.format(), f, "opcode {op:#07b}");
                assert_eq!(d.opcode().bits(), op);
                assert_eq!(d.opcode().format(), f);
                assert_eq!(d.full_opcode(), (op << 2) | 0b11);
            }
            (Err(DecodeError::IllegalInstruction { reason, .. }), None) => {
                assert_eq!(reason, IllegalReason::UnknownOpcode(op));
            }
            (got, want) => panic!("opcode {op:#07b}: got {got:?}, expected {want:?}"),
        }
    }
}

#[test]
fn format_ignores_everything_but_the_opcode() {
    // Upper bits full of noise must not change classification
    for &(op, f) in TABLE {
        let word = 0xA5A5_A580 | ((op as u32) << 2) | 0b11;
        assert_eq!(decode(word).unwrap().format(), f);
    }
}

#[test]
fn addi_zero() {
    let d = decode(0x0000_0093).unwrap();
    assert_eq!(d.format(), Format::I);
    assert_eq!(d.opcode(), Opcode::OpImm);
    assert_eq!(d.funct3(), 0);
    assert_eq!(d.rd(), 1);
    assert_eq!(d.rs1(), 0);
    assert_eq!(d.imm(), 0);
}

#[test]
fn stack_pointer_adjust_is_negative() {
    // addi sp, sp, -32
    let d = decode(0xFE01_0113).unwrap();
    assert_eq!(d.format(), Format::I);
    assert_eq!(d.opcode(), Opcode::OpImm);
    assert_eq!(d.rd(), 2);
    assert_eq!(d.rs1(), 2);
    assert_eq!(d.imm() & 0xFFF, 0xFE0);
    assert_eq!(d.imm() >> 12, 0xF_FFFF);
    assert_eq!(d.imm() as i32, -32);
}

#[test]
fn branch_with_zero_offset() {
    let d = decode(0x0000_0063).unwrap();
    assert_eq!(d.format(), Format::B);
    assert_eq!(d.opcode(), Opcode::Branch);
    assert_eq!(d.imm(), 0);
}

#[test]
fn r_type_fields() {
    // sub x3, x1, x2
    let d = decode(0x4020_81B3).unwrap();
    assert_eq!(d.format(), Format::R);
    assert_eq!(d.opcode(), Opcode::Op);
    assert_eq!(d.full_opcode(), 0x33);
    assert_eq!(d.funct3(), 0);
    assert_eq!(d.funct7(), 0x20);
    assert_eq!(d.rd(), 3);
    assert_eq!(d.rs1(), 1);
    assert_eq!(d.rs2(), 2);
}

#[test]
fn amo_funct5() {
    // amoswap.w x5, x6, (x7)
    let d = decode(0x0863_A2AF).unwrap();
    assert_eq!(d.format(), Format::R);
    assert_eq!(d.opcode(), Opcode::Amo);
    assert_eq!(d.funct5(), 0b00001);
    assert_eq!(d.funct3(), 0b010);
    assert_eq!(d.rd(), 5);
    assert_eq!(d.rs1(), 7);
    assert_eq!(d.rs2(), 6);
}

#[test]
fn decoding_is_idempotent() {
    let dec = Rv32iDecoder::new();
    for word in [0x0000_0093, 0xFE01_0113, 0x4020_81B3, 0x1234_5037, 0xFFDF_F06F, 0x0000_0073] {
        assert_eq!(dec.decode(word), dec.decode(word));
        assert_eq!(dec.decode(word), decode(word));
    }
}

#[test]
fn decoder_is_shareable_across_threads() {
    let dec = Rv32iDecoder::new();
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4u32)
            .map(|i| s.spawn(move || dec.decode(0x0000_0013 | (i << 7)).unwrap().rd()))
            .collect();
        let rds: Vec<u8> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(rds, vec![0, 1, 2, 3]);
    });
}

#[test]
fn error_message_names_the_word() {
    let err = decode(0x0000_0001).unwrap_err();
    assert_eq!(err.to_string(), "Illegal instruction 0x00000001 (not a 32-bit encoding)");
}
