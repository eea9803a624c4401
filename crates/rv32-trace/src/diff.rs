use rv32_decode::{decode, Decoded};

use crate::record::TraceRecord;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DiffError {
    #[error("Line {line}: golden {golden} does not line up with {test}")]
    Misaligned {
        line: usize,
        golden: &'static str,
        test: &'static str,
    },
    #[error("Line {line}: {tag} record before any fetch")]
    NoFetch { line: usize, tag: &'static str },
}

/// Every mismatch found on one pair of lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineReport {
    pub line: usize,
    pub golden: TraceRecord,
    pub test: TraceRecord,
    pub errors: Vec<&'static str>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiffReport {
    pub lines_compared: usize,
    pub mismatches: Vec<LineReport>,
}

impl DiffReport {
    pub fn error_count(&self) -> usize {
        self.mismatches.iter().map(|m| m.errors.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// What the golden trace last fetched. `decoded` is `None` when the word did
/// not decode; then nothing counts as don't-care.
#[derive(Clone, Copy)]
struct LastFetch {
    pc: u32,
    decoded: Option<Decoded>,
}

impl LastFetch {
    fn used<T>(&self, pick: impl Fn(&Decoded) -> Option<T>) -> bool {
        self.decoded.as_ref().map_or(true, |d| pick(d).is_some())
    }

    fn is(&self, pred: impl Fn(&Decoded) -> bool) -> bool {
        self.decoded.as_ref().is_some_and(pred)
    }
}

/// Compare a test trace against a golden one, line by line. Comparison stops
/// at the end of the shorter trace.
pub fn compare<G, T>(golden: G, test: T) -> Result<DiffReport, DiffError>
where
    G: IntoIterator<Item = TraceRecord>,
    T: IntoIterator<Item = TraceRecord>,
{
    let mut report = DiffReport::default();
    let mut last: Option<LastFetch> = None;

    for (i, (g, t)) in golden.into_iter().zip(test).enumerate() {
        let line = i + 1;
        let mut errors = Vec::new();
        let mut check = |same: bool, msg: &'static str| {
            if !same {
                errors.push(msg);
            }
        };
        let fetched = move |tag| last.ok_or(DiffError::NoFetch { line, tag });

        match (g, t) {
            (TraceRecord::F { pc: gp, instr: gi }, TraceRecord::F { pc: tp, instr: ti }) => {
                last = Some(LastFetch { pc: gp, decoded: decode(gi).ok() });
                check(gp == tp, "PCs do not match");
                check(gi == ti, "Instructions do not match");
            }
            (
                TraceRecord::D { pc: gp, opcode: go, rd: grd, rs1: gs1, rs2: gs2, funct3: gf3, funct7: gf7, imm: gimm, shamt: gsh },
                TraceRecord::D { pc: tp, opcode: to, rd: trd, rs1: ts1, rs2: ts2, funct3: tf3, funct7: tf7, imm: timm, shamt: tsh },
            ) => {
                let f = fetched("[D]")?;
                check(f.pc == gp, "PC changed since last fetch");
                check(gp == tp, "PCs do not match");
                check(go == to, "Opcodes do not match");
                if f.used(Decoded::used_rd) {
                    check(grd == trd, "RDs do not match");
                }
                if f.used(Decoded::used_rs1) {
                    check(gs1 == ts1, "RS1s do not match");
                }
                if f.used(Decoded::used_rs2) {
                    check(gs2 == ts2, "RS2s do not match");
                }
                if f.used(Decoded::used_funct3) {
                    check(gf3 == tf3, "Funct3s do not match");
                }
                if f.used(Decoded::used_funct7) {
                    check(gf7 == tf7, "Funct7s do not match");
                }
                if f.used(Decoded::used_imm) {
                    check(gimm == timm, "IMMs do not match");
                }
                if f.used(Decoded::shamt) {
                    check(gsh == tsh, "SHAMTs do not match");
                }
            }
            (
                TraceRecord::R { addr_rs1: ga1, addr_rs2: ga2, data_rs1: gd1, data_rs2: gd2 },
                TraceRecord::R { addr_rs1: ta1, addr_rs2: ta2, data_rs1: td1, data_rs2: td2 },
            ) => {
                let f = fetched("[R]")?;
                if f.used(Decoded::used_rs1) {
                    check(ga1 == ta1, "RS1 addresses do not match");
                    check(gd1 == td1, "RS1 data does not match");
                }
                if f.used(Decoded::used_rs2) {
                    check(ga2 == ta2, "RS2 addresses do not match");
                    check(gd2 == td2, "RS2 data does not match");
                }
            }
            (
                TraceRecord::E { pc: gp, alu_result: ga, branch_taken: gb },
                TraceRecord::E { pc: tp, alu_result: ta, branch_taken: tb },
            ) => {
                let f = fetched("[E]")?;
                check(f.pc == gp, "PC changed since last fetch");
                check(gp == tp, "PCs do not match");
                if !f.is(Decoded::is_fence) && !f.is(Decoded::is_system) {
                    check(ga == ta, "ALU results do not match");
                }
                if f.decoded.is_none() || f.is(Decoded::is_branch) {
                    check(gb == tb, "Branch taken flags do not match");
                }
            }
            (
                TraceRecord::M { pc: gp, addr: ga, read_not_write: grw, access_size: gs, memory_wdata: gd },
                TraceRecord::M { pc: tp, addr: ta, read_not_write: trw, access_size: ts, memory_wdata: td },
            ) => {
                let f = fetched("[M]")?;
                check(f.pc == gp, "PC changed since last fetch");
                check(gp == tp, "PCs do not match");
                check(grw == trw, "Read/write flags do not match");
                if f.decoded.is_none() || f.is(Decoded::is_memory) {
                    check(ga == ta, "Addresses do not match");
                    check(gs == ts, "Access sizes do not match");
                    check(gd == td, "Memory write data does not match");
                }
            }
            (
                TraceRecord::W { pc: gp, we: gwe, addr_rd: grd, data_rd: gdata },
                TraceRecord::W { pc: tp, we: twe, addr_rd: trd, data_rd: tdata },
            ) => {
                let f = fetched("[W]")?;
                check(f.pc == gp, "PC changed since last fetch");
                check(gp == tp, "PCs do not match");
                if !f.is(Decoded::is_fence) {
                    check(gwe == twe, "Write enable flags do not match");
                    if f.used(Decoded::used_rd) {
                        check(grd == trd, "RD addresses do not match");
                        check(gdata == tdata, "RD data does not match");
                    }
                }
            }
            (g, t) => {
                return Err(DiffError::Misaligned { line, golden: g.tag(), test: t.tag() });
            }
        }

        report.lines_compared += 1;
        if !errors.is_empty() {
            report.mismatches.push(LineReport { line, golden: g, test: t, errors });
        }
    }

    Ok(report)
}
