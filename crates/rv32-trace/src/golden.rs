//! Golden-trace preprocessing.
//!
//! Reference traces record register-file reads even for source slots an
//! instruction never reads. Those reads are rewritten to a fixed
//! `(register, shadow value)` pair so a comparison against another core's
//! trace does not trip over them.

use rv32_decode::{decode, DecodeError, Format};
use tracing::debug;

use crate::listing::decode_record;
use crate::record::TraceRecord;

/// Register file contents out of reset: everything zero except the stack
/// pointer, which starts at the top of a 1 MiB memory at 0x0100_0000.
pub const REGISTER_RESET: [u32; 32] = {
    let mut regs = [0u32; 32];
    regs[2] = 0x0100_0000 + 0x0010_0000;
    regs
};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GoldenError {
    #[error("{0} record before any fetch")]
    NoFetch(&'static str),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// What to do with one input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Emit(TraceRecord),
    Drop,
    /// The trace is over; ignore the rest of the input.
    End,
}

/// Per-fetch replacement for the two source reads; `None` keeps the read.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Reads {
    rs1: Option<(u8, u32)>,
    rs2: Option<(u8, u32)>,
}

#[derive(Debug, Clone, Copy)]
struct Fetch {
    pc: u32,
    instr: u32,
    is_fence: bool,
    reads: Reads,
}

pub struct GoldenRewriter {
    track_writeback: bool,
    registers: [u32; 32],
    last: Option<Fetch>,
    ended: bool,
}

impl GoldenRewriter {
    /// With `track_writeback` off the shadow table stays at
    /// [`REGISTER_RESET`], fetch records are dropped and decode records are
    /// consumed. With it on, fetches are echoed, decode records are
    /// regenerated from the fetched word and writebacks update the table.
    pub fn new(track_writeback: bool) -> Self {
        Self {
            track_writeback,
            registers: REGISTER_RESET,
            last: None,
            ended: false,
        }
    }

    pub fn registers(&self) -> &[u32; 32] {
        &self.registers
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn step(&mut self, rec: TraceRecord) -> Result<Step, GoldenError> {
        if self.ended {
            return Ok(Step::End);
        }
        let step = match rec {
            TraceRecord::F { pc, instr } => {
                let legal = self.fetch(pc, instr);
                match (self.track_writeback, legal) {
                    // echoed even when it ends the trace
                    (true, _) => Step::Emit(rec),
                    (false, true) => Step::Drop,
                    (false, false) => Step::End,
                }
            }
            TraceRecord::D { .. } if self.track_writeback => {
                let last = self.last.ok_or(GoldenError::NoFetch("[D]"))?;
                Step::Emit(decode_record(last.instr, last.pc)?)
            }
            TraceRecord::D { .. } => Step::Drop,
            TraceRecord::R { addr_rs1, addr_rs2, data_rs1, data_rs2 } => {
                let reads = self.last.map(|f| f.reads).unwrap_or_default();
                let (addr_rs1, data_rs1) = reads.rs1.unwrap_or((addr_rs1, data_rs1));
                let (addr_rs2, data_rs2) = reads.rs2.unwrap_or((addr_rs2, data_rs2));
                Step::Emit(TraceRecord::R { addr_rs1, addr_rs2, data_rs1, data_rs2 })
            }
            TraceRecord::W { pc, we, addr_rd, data_rd } if self.track_writeback => {
                // Fences never write a register
                let we = we && !self.last.is_some_and(|f| f.is_fence);
                if we && addr_rd != 0 {
                    debug!(rd = addr_rd, data = format_args!("{data_rd:#010x}"), "shadow write");
                    self.registers[addr_rd as usize & 0x1F] = data_rd;
                }
                Step::Emit(TraceRecord::W { pc, we, addr_rd, data_rd })
            }
            TraceRecord::E { .. } | TraceRecord::M { .. } | TraceRecord::W { .. } => Step::Emit(rec),
        };
        Ok(step)
    }

    /// Record the read replacements for a fetched word. Returns false, and
    /// ends the trace, when the word is not a legal instruction.
    fn fetch(&mut self, pc: u32, instr: u32) -> bool {
        let d = match decode(instr) {
            Ok(d) => d,
            Err(e) => {
                debug!(pc = format_args!("{pc:#010x}"), "trace ends: {e}");
                self.ended = true;
                return false;
            }
        };
        let regs = &self.registers;
        let shadow = |r: u8| Some((r, regs[r as usize]));
        let reads = match d.format() {
            Format::R | Format::S | Format::B => Reads::default(),
            Format::I => Reads { rs1: None, rs2: shadow(d.rs2()) },
            Format::U | Format::J => Reads { rs1: shadow(d.rs1()), rs2: shadow(d.rs2()) },
        };
        self.last = Some(Fetch { pc, instr, is_fence: d.is_fence(), reads });
        true
    }
}

/// Run a whole trace through a fresh rewriter.
pub fn rewrite_all<I>(records: I, track_writeback: bool) -> Result<Vec<TraceRecord>, GoldenError>
where
    I: IntoIterator<Item = TraceRecord>,
{
    let mut rw = GoldenRewriter::new(track_writeback);
    let mut out = Vec::new();
    for rec in records {
        match rw.step(rec)? {
            Step::Emit(r) => out.push(r),
            Step::Drop => {}
            Step::End => break,
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_table_only_sets_stack_pointer() {
        assert_eq!(REGISTER_RESET[2], 0x0110_0000);
        assert_eq!(REGISTER_RESET.iter().filter(|&&v| v != 0).count(), 1);
    }

    #[test]
    fn records_after_end_are_ignored() {
        let mut rw = GoldenRewriter::new(false);
        assert_eq!(rw.step(TraceRecord::F { pc: 0, instr: 0 }).unwrap(), Step::End);
        assert!(rw.is_ended());
        let e = TraceRecord::E { pc: 0, alu_result: 1, branch_taken: false };
        assert_eq!(rw.step(e).unwrap(), Step::End);
    }

    #[test]
    fn decode_before_fetch_is_an_error() {
        let mut rw = GoldenRewriter::new(true);
        let d: TraceRecord = "[D] 0 13 00 00 00 0 00 00000000 00".parse().unwrap();
        assert_eq!(rw.step(d), Err(GoldenError::NoFetch("[D]")));
    }

    #[test]
    fn reads_follow_the_latest_fetch() {
        let mut rw = GoldenRewriter::new(false);
        let read = TraceRecord::R { addr_rs1: 9, addr_rs2: 9, data_rs1: 1, data_rs2: 2 };
        let lui = TraceRecord::F { pc: 0, instr: 0x0001_0537 };
        let shadowed = Step::Emit(TraceRecord::R {
            addr_rs1: 2,
            addr_rs2: 0,
            data_rs1: 0x0110_0000,
            data_rs2: 0,
        });

        rw.step(lui).unwrap();
        assert_eq!(rw.step(read).unwrap(), shadowed);
        // add x1, x2, x3 reads both sources
        rw.step(TraceRecord::F { pc: 4, instr: 0x0031_00B3 }).unwrap();
        assert_eq!(rw.step(read).unwrap(), Step::Emit(read));
        // same PC fetched again
        rw.step(lui).unwrap();
        assert_eq!(rw.step(read).unwrap(), shadowed);
    }
}
