use std::fmt;
use std::io::BufRead;
use std::str::{FromStr, SplitWhitespace};

/// One tagged line of a processor trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceRecord {
    /// `[F]` instruction fetch
    F { pc: u32, instr: u32 },
    /// `[D]` decoded fields
    D {
        pc: u32,
        opcode: u8,
        rd: u8,
        rs1: u8,
        rs2: u8,
        funct3: u8,
        funct7: u8,
        imm: u32,
        shamt: u8,
    },
    /// `[R]` register file read
    R {
        addr_rs1: u8,
        addr_rs2: u8,
        data_rs1: u32,
        data_rs2: u32,
    },
    /// `[E]` execute
    E {
        pc: u32,
        alu_result: u32,
        branch_taken: bool,
    },
    /// `[M]` memory access
    M {
        pc: u32,
        addr: u32,
        read_not_write: bool,
        access_size: u8,
        memory_wdata: u32,
    },
    /// `[W]` writeback
    W {
        pc: u32,
        we: bool,
        addr_rd: u8,
        data_rd: u32,
    },
}

impl TraceRecord {
    pub fn tag(&self) -> &'static str {
        match self {
            TraceRecord::F { .. } => "[F]",
            TraceRecord::D { .. } => "[D]",
            TraceRecord::R { .. } => "[R]",
            TraceRecord::E { .. } => "[E]",
            TraceRecord::M { .. } => "[M]",
            TraceRecord::W { .. } => "[W]",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("Unknown record tag `{0}`")]
    UnknownTag(String),
    #[error("Empty line")]
    Empty,
    #[error("{tag} record is missing `{field}`")]
    MissingField { tag: &'static str, field: &'static str },
    #[error("{tag} record has bad `{field}` value `{value}`")]
    BadValue {
        tag: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{tag} record has trailing data `{rest}`")]
    Trailing { tag: &'static str, rest: String },
    #[error("Read failed: {0}")]
    Io(#[from] std::io::Error),
}

struct Fields<'a> {
    tag: &'static str,
    tokens: SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn next(&mut self, field: &'static str) -> Result<&'a str, RecordError> {
        self.tokens
            .next()
            .ok_or(RecordError::MissingField { tag: self.tag, field })
    }

    fn bad(&self, field: &'static str, value: &str) -> RecordError {
        RecordError::BadValue {
            tag: self.tag,
            field,
            value: value.to_string(),
        }
    }

    fn word(&mut self, field: &'static str) -> Result<u32, RecordError> {
        let s = self.next(field)?;
        u32::from_str_radix(s, 16).map_err(|_| self.bad(field, s))
    }

    fn byte(&mut self, field: &'static str) -> Result<u8, RecordError> {
        let s = self.next(field)?;
        u8::from_str_radix(s, 16).map_err(|_| self.bad(field, s))
    }

    fn reg(&mut self, field: &'static str) -> Result<u8, RecordError> {
        let s = self.next(field)?;
        match u8::from_str_radix(s, 16) {
            Ok(r) if r < 32 => Ok(r),
            _ => Err(self.bad(field, s)),
        }
    }

    fn flag(&mut self, field: &'static str) -> Result<bool, RecordError> {
        match self.next(field)? {
            "0" => Ok(false),
            "1" => Ok(true),
            s => Err(self.bad(field, s)),
        }
    }

    fn finish(mut self) -> Result<(), RecordError> {
        let rest: Vec<&str> = self.tokens.by_ref().collect();
        if rest.is_empty() {
            Ok(())
        } else {
            Err(RecordError::Trailing { tag: self.tag, rest: rest.join(" ") })
        }
    }
}

impl FromStr for TraceRecord {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let tag = match tokens.next().ok_or(RecordError::Empty)? {
            "[F]" => "[F]",
            "[D]" => "[D]",
            "[R]" => "[R]",
            "[E]" => "[E]",
            "[M]" => "[M]",
            "[W]" => "[W]",
            other => return Err(RecordError::UnknownTag(other.to_string())),
        };
        let mut f = Fields { tag, tokens };
        let rec = match tag {
            "[F]" => TraceRecord::F {
                pc: f.word("pc")?,
                instr: f.word("instr")?,
            },
            "[D]" => TraceRecord::D {
                pc: f.word("pc")?,
                opcode: f.byte("opcode")?,
                rd: f.reg("rd")?,
                rs1: f.reg("rs1")?,
                rs2: f.reg("rs2")?,
                funct3: f.byte("funct3")?,
                funct7: f.byte("funct7")?,
                imm: f.word("imm")?,
                shamt: f.byte("shamt")?,
            },
            "[R]" => TraceRecord::R {
                addr_rs1: f.reg("addr_rs1")?,
                addr_rs2: f.reg("addr_rs2")?,
                data_rs1: f.word("data_rs1")?,
                data_rs2: f.word("data_rs2")?,
            },
            "[E]" => TraceRecord::E {
                pc: f.word("pc")?,
                alu_result: f.word("alu_result")?,
                branch_taken: f.flag("branch_taken")?,
            },
            "[M]" => TraceRecord::M {
                pc: f.word("pc")?,
                addr: f.word("addr")?,
                read_not_write: f.flag("read_not_write")?,
                access_size: f.byte("access_size")?,
                memory_wdata: f.word("memory_wdata")?,
            },
            _ => TraceRecord::W {
                pc: f.word("pc")?,
                we: f.flag("we")?,
                addr_rd: f.reg("addr_rd")?,
                data_rd: f.word("data_rd")?,
            },
        };
        f.finish()?;
        Ok(rec)
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TraceRecord::F { pc, instr } => write!(f, "[F] {pc:08x} {instr:08x}"),
            TraceRecord::D { pc, opcode, rd, rs1, rs2, funct3, funct7, imm, shamt } => write!(
                f,
                "[D] {pc:08x} {opcode:02x} {rd:02x} {rs1:02x} {rs2:02x} {funct3:x} {funct7:02x} {imm:08x} {shamt:02x}"
            ),
            TraceRecord::R { addr_rs1, addr_rs2, data_rs1, data_rs2 } => {
                write!(f, "[R] {addr_rs1:02x} {addr_rs2:02x} {data_rs1:08x} {data_rs2:08x}")
            }
            TraceRecord::E { pc, alu_result, branch_taken } => {
                write!(f, "[E] {pc:08x} {alu_result:08x} {}", branch_taken as u8)
            }
            TraceRecord::M { pc, addr, read_not_write, access_size, memory_wdata } => write!(
                f,
                "[M] {pc:08x} {addr:08x} {} {access_size:x} {memory_wdata:08x}",
                read_not_write as u8
            ),
            TraceRecord::W { pc, we, addr_rd, data_rd } => {
                write!(f, "[W] {pc:08x} {} {addr_rd:02x} {data_rd:08x}", we as u8)
            }
        }
    }
}

/// Parse every non-blank line of a trace, tagging each result with its
/// 1-based line number.
pub fn read_records<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = (usize, Result<TraceRecord, RecordError>)> {
    reader
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !matches!(line, Ok(l) if l.trim().is_empty()))
        .map(|(n, line)| (n, line.map_err(RecordError::from).and_then(|l| l.parse())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LINES: &[&str] = &[
        "[F] 01000000 fe010113",
        "[D] 01000000 13 02 02 00 0 7f ffffffe0 00",
        "[R] 02 00 01100000 00000000",
        "[E] 01000000 010fffe0 0",
        "[M] 01000004 010fffec 0 2 00000000",
        "[W] 01000000 1 02 010fffe0",
    ];

    #[test]
    fn lines_print_back_unchanged() {
        for line in LINES {
            let rec: TraceRecord = line.parse().unwrap();
            assert_eq!(rec.to_string(), *line);
        }
    }

    #[test]
    fn parses_fields() {
        let rec: TraceRecord = "[W] 01000010 1 1f deadbeef".parse().unwrap();
        assert_eq!(rec, TraceRecord::W { pc: 0x0100_0010, we: true, addr_rd: 31, data_rd: 0xDEAD_BEEF });
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!("[X] 1 2".parse::<TraceRecord>(), Err(RecordError::UnknownTag(t)) if t == "[X]"));
        assert!(matches!(
            "[F] 01000000".parse::<TraceRecord>(),
            Err(RecordError::MissingField { field: "instr", .. })
        ));
        assert!(matches!(
            "[R] 20 00 0 0".parse::<TraceRecord>(),
            Err(RecordError::BadValue { field: "addr_rs1", .. })
        ));
        assert!(matches!(
            "[E] 0 0 2".parse::<TraceRecord>(),
            Err(RecordError::BadValue { field: "branch_taken", .. })
        ));
        assert!(matches!(
            "[F] 0 13 junk".parse::<TraceRecord>(),
            Err(RecordError::Trailing { .. })
        ));
    }

    #[test]
    fn reader_skips_blank_lines_and_numbers_from_one() {
        let text = "[F] 0 13\n\n   \n[E] 0 0 1\n";
        let got: Vec<(usize, TraceRecord)> = read_records(text.as_bytes())
            .map(|(n, r)| (n, r.unwrap()))
            .collect();
        assert_eq!(
            got,
            vec![
                (1, TraceRecord::F { pc: 0, instr: 0x13 }),
                (4, TraceRecord::E { pc: 0, alu_result: 0, branch_taken: true }),
            ]
        );
    }
}
