// Copyright (c) 2026 Codegen-Link Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Merge of the four line indices of one source file into per-line records.

use std::iter::Enumerate;
use std::str::Lines;
use std::sync::Arc;

use crate::artifacts::ArchArtifacts;
use crate::instr::Instruction;
use crate::ir_info::IrInstruction;
use crate::line_index::LineIndex;

/// Everything generated from one source line, for both architectures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedRecord<'a> {
    /// 0-based position in the source file
    pub index: usize,
    pub source: &'a str,
    pub guest_ir: &'a [Arc<IrInstruction>],
    pub host_ir: &'a [Arc<IrInstruction>],
    pub guest_asm: &'a [Arc<Instruction>],
    pub host_asm: &'a [Arc<Instruction>],
}

impl AlignedRecord<'_> {
    /// 1-based line number, as used by the debug annotations.
    pub fn line_number(&self) -> u32 {
        (self.index + 1) as u32
    }

    pub fn has_code(&self) -> bool {
        !(self.guest_ir.is_empty()
            && self.host_ir.is_empty()
            && self.guest_asm.is_empty()
            && self.host_asm.is_empty())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Correlator<'a> {
    source: &'a str,
    guest_ir: &'a LineIndex<Arc<IrInstruction>>,
    host_ir: &'a LineIndex<Arc<IrInstruction>>,
    guest_asm: &'a LineIndex<Arc<Instruction>>,
    host_asm: &'a LineIndex<Arc<Instruction>>,
}

impl<'a> Correlator<'a> {
    pub fn new(
        source: &'a str,
        guest_ir: &'a LineIndex<Arc<IrInstruction>>,
        host_ir: &'a LineIndex<Arc<IrInstruction>>,
        guest_asm: &'a LineIndex<Arc<Instruction>>,
        host_asm: &'a LineIndex<Arc<Instruction>>,
    ) -> Self {
        Self {
            source,
            guest_ir,
            host_ir,
            guest_asm,
            host_asm,
        }
    }

    pub fn from_artifacts(
        source: &'a str,
        guest: &'a ArchArtifacts,
        host: &'a ArchArtifacts,
    ) -> Self {
        Self::new(
            source,
            &guest.ir.line_index,
            &host.ir.line_index,
            &guest.asm.line_index,
            &host.asm.line_index,
        )
    }

    /// Lazily produce one record per source line, in line order. Can be called
    /// again to restart from the first line.
    pub fn records(&self) -> AlignedRecords<'a> {
        AlignedRecords {
            lines: self.source.lines().enumerate(),
            correlator: *self,
        }
    }
}

pub struct AlignedRecords<'a> {
    lines: Enumerate<Lines<'a>>,
    correlator: Correlator<'a>,
}

impl<'a> Iterator for AlignedRecords<'a> {
    type Item = AlignedRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, source) = self.lines.next()?;
        let line = (index + 1) as u32;
        let c = &self.correlator;
        Some(AlignedRecord {
            index,
            source,
            guest_ir: c.guest_ir.get(line),
            host_ir: c.host_ir.get(line),
            guest_asm: c.guest_asm.get(line),
            host_asm: c.host_asm.get(line),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.lines.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn ir(line: u32) -> Arc<IrInstruction> {
        Arc::new(IrInstruction {
            line,
            attrs: Map::new(),
        })
    }

    #[test]
    fn only_line_two_has_guest_ir() {
        let mut guest_ir = LineIndex::new();
        guest_ir.append(2, ir(2));
        let empty_ir = LineIndex::new();
        let empty_asm = LineIndex::new();

        let source = "int x;\nint f(void) { return x; }\n// end\n";
        let correlator = Correlator::new(source, &guest_ir, &empty_ir, &empty_asm, &empty_asm);
        let records: Vec<_> = correlator.records().collect();
        assert_eq!(records.len(), 3);

        assert_eq!(records[1].line_number(), 2);
        assert_eq!(records[1].source, "int f(void) { return x; }");
        assert_eq!(records[1].guest_ir.len(), 1);
        assert!(records[1].host_ir.is_empty());
        assert!(records[1].guest_asm.is_empty());
        assert!(records[1].host_asm.is_empty());

        for rec in [&records[0], &records[2]] {
            assert!(!rec.has_code());
        }
    }

    #[test]
    fn records_restart() {
        let empty_ir = LineIndex::new();
        let empty_asm = LineIndex::new();
        let correlator = Correlator::new("a\nb", &empty_ir, &empty_ir, &empty_asm, &empty_asm);
        let mut first = correlator.records();
        first.next();
        assert_eq!(correlator.records().next().map(|r| r.source), Some("a"));
        assert_eq!(first.next().map(|r| r.index), Some(1));
    }

    #[test]
    fn line_zero_is_never_emitted() {
        let mut guest_asm = LineIndex::new();
        guest_asm.append(
            0,
            Arc::new(Instruction::new(
                0,
                "e12fff1e".to_string(),
                "bx".to_string(),
                "lr".to_string(),
                String::new(),
            )),
        );
        let empty_ir = LineIndex::new();
        let correlator = Correlator::new("x\n", &empty_ir, &empty_ir, &guest_asm, &guest_asm);
        assert!(correlator.records().all(|r| !r.has_code()));
    }
}
