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

//! Parser for `objdump -d -l` listings.
//!
//! The listing is consumed in a single forward pass. Each line is classified
//! as an instruction, a function header (`00000000 <main>:`), a basic-block
//! header (`main():`) or a source-location annotation (`/src/foo.c:12`), and
//! applied to an explicit [`ParserState`]. Instructions are attributed to the
//! most recent annotation and collected into a [`LineIndex`].
//!
//! The running address is never reset between functions: objdump prints
//! section offsets for relocatable objects, so it keeps counting across the
//! whole `.text` section.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;

use crate::arch::Decoder;
use crate::error::ParseError;
use crate::instr::Instruction;
use crate::line_index::LineIndex;
use crate::utils::for_each_line;

/// Options for recognising source-location annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// File suffixes (without the dot) of compilation units whose
    /// `path.<suffix>:<line>` annotations update the current source line.
    pub source_suffixes: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            source_suffixes: vec!["c".to_string(), "cc".to_string(), "cpp".to_string()],
        }
    }
}

/// The header/annotation patterns. At most one may match any given line.
#[derive(Debug, Clone)]
pub struct LinePatterns {
    function: Regex,
    block: Regex,
    line_number: Regex,
    hex_start: Regex,
}

impl LinePatterns {
    pub fn new(options: &ParseOptions) -> Result<Self, regex::Error> {
        let suffixes: Vec<String> = options
            .source_suffixes
            .iter()
            .map(|s| regex::escape(s.trim_start_matches('.')))
            .collect();
        Ok(Self {
            function: Regex::new(r"^[0-9a-fA-F]+ <(.*)>:")?,
            block: Regex::new(r"^(.*)\(\):")?,
            line_number: Regex::new(&format!(r"^.*\.(?:{}):(\d+)", suffixes.join("|")))?,
            hex_start: Regex::new(r"^[0-9a-f]+:\t")?,
        })
    }
}

/// What one listing line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Instruction(Instruction),
    FunctionHeader(String),
    BlockHeader(String),
    LineAnnotation(u32),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsmBlock {
    pub name: String,
    pub insts: Vec<Arc<Instruction>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsmFunction {
    pub name: String,
    /// Set when `name` is an Itanium-mangled C++ symbol
    pub demangled: Option<String>,
    pub blocks: Vec<AsmBlock>,
}

impl AsmFunction {
    fn new(name: String) -> Self {
        let demangled = demangle(&name);
        Self {
            name,
            demangled,
            blocks: Vec::new(),
        }
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Arc<Instruction>> + '_ {
        self.blocks.iter().flat_map(|b| b.insts.iter())
    }
}

fn demangle(name: &str) -> Option<String> {
    if !name.starts_with("_Z") {
        return None;
    }
    let symbol = cpp_demangle::Symbol::new(name.as_bytes()).ok()?;
    symbol.demangle().ok()
}

/// Result of parsing one listing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AsmListing {
    pub functions: Vec<AsmFunction>,
    pub line_index: LineIndex<Arc<Instruction>>,
}

impl AsmListing {
    pub fn blocks(&self) -> impl Iterator<Item = &AsmBlock> + '_ {
        self.functions.iter().flat_map(|f| f.blocks.iter())
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks().map(|b| b.insts.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    AwaitingFunction,
    InFunction,
    InBlock,
}

/// Everything carried from one listing line to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserState {
    pub cur_address: u64,
    pub cur_line_num: u32,
    pub cursor: Cursor,
    pub listing: AsmListing,
}

impl Default for ParserState {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserState {
    pub fn new() -> Self {
        Self {
            cur_address: 0,
            cur_line_num: 0,
            cursor: Cursor::AwaitingFunction,
            listing: AsmListing::default(),
        }
    }

    /// Address prefix an instruction line must start with to be accepted.
    pub fn address_prefix(&self) -> String {
        format!("{:x}:", self.cur_address)
    }

    /// Apply one classified line. `text` is only used for error reporting.
    pub fn apply(&mut self, line_no: usize, kind: LineKind, text: &str) -> Result<(), ParseError> {
        match kind {
            LineKind::Instruction(inst) => {
                if self.cursor != Cursor::InBlock {
                    return Err(ParseError::MissingContext {
                        line_no,
                        found: "instruction",
                        expected: "basic block",
                        text: text.to_string(),
                    });
                }
                self.cur_address += inst.size();
                let inst = Arc::new(inst);
                self.listing.line_index.append(self.cur_line_num, Arc::clone(&inst));
                // InBlock guarantees a function with at least one block
                if let Some(block) = self
                    .listing
                    .functions
                    .last_mut()
                    .and_then(|f| f.blocks.last_mut())
                {
                    block.insts.push(inst);
                }
            }
            LineKind::FunctionHeader(name) => {
                self.listing.functions.push(AsmFunction::new(name));
                self.cursor = Cursor::InFunction;
            }
            LineKind::BlockHeader(name) => {
                let Some(function) = self.listing.functions.last_mut() else {
                    return Err(ParseError::MissingContext {
                        line_no,
                        found: "basic block header",
                        expected: "function",
                        text: text.to_string(),
                    });
                };
                function.blocks.push(AsmBlock {
                    name,
                    insts: Vec::new(),
                });
                self.cursor = Cursor::InBlock;
            }
            LineKind::LineAnnotation(line) => self.cur_line_num = line,
            LineKind::Other => {}
        }
        Ok(())
    }

    pub fn finish(self) -> AsmListing {
        self.listing
    }
}

/// Single-pass listing parser for one architecture.
#[derive(Debug, Clone)]
pub struct AsmParser {
    decoder: Decoder,
    patterns: LinePatterns,
}

impl AsmParser {
    pub fn new(decoder: Decoder, options: &ParseOptions) -> Result<Self, ParseError> {
        Ok(Self {
            decoder,
            patterns: LinePatterns::new(options)?,
        })
    }

    pub fn decoder(&self) -> Decoder {
        self.decoder
    }

    /// Classify one raw listing line against the current state.
    pub fn classify(
        &self,
        state: &ParserState,
        line_no: usize,
        raw: &str,
    ) -> Result<LineKind, ParseError> {
        let line = raw.trim_start();

        // Hot path: most lines are instructions at the running address.
        if line.starts_with(&state.address_prefix()) {
            return self
                .decoder
                .decode(line)
                .map(LineKind::Instruction)
                .map_err(|source| ParseError::Decode {
                    line_no,
                    text: line.to_string(),
                    source,
                });
        }

        let func = self.patterns.function.captures(line);
        let block = self.patterns.block.captures(line);
        let line_num = self.patterns.line_number.captures(line);

        let matches: Vec<&'static str> = [
            ("function header", func.is_some()),
            ("basic block header", block.is_some()),
            ("line annotation", line_num.is_some()),
        ]
        .into_iter()
        .filter(|(_, hit)| *hit)
        .map(|(name, _)| name)
        .collect();
        if matches.len() > 1 {
            return Err(ParseError::AmbiguousLine {
                line_no,
                matches,
                text: line.to_string(),
            });
        }

        if let Some(caps) = func {
            return Ok(LineKind::FunctionHeader(caps[1].to_string()));
        }
        if let Some(caps) = block {
            return Ok(LineKind::BlockHeader(caps[1].to_string()));
        }
        if let Some(caps) = line_num {
            match caps[1].parse::<u32>() {
                Ok(n) => return Ok(LineKind::LineAnnotation(n)),
                Err(_) => log::warn!("line {}: line number out of range: {:?}", line_no, line),
            }
            return Ok(LineKind::Other);
        }

        if self.patterns.hex_start.is_match(line) {
            log::trace!(
                "line {}: skipping instruction not at running address {}: {:?}",
                line_no,
                state.address_prefix(),
                line
            );
        }
        Ok(LineKind::Other)
    }

    /// Classify and apply one line.
    pub fn step(
        &self,
        state: &mut ParserState,
        line_no: usize,
        raw: &str,
    ) -> Result<(), ParseError> {
        let kind = self.classify(state, line_no, raw)?;
        state.apply(line_no, kind, raw)
    }

    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<AsmListing, ParseError> {
        let mut state = ParserState::new();
        for_each_line(reader, |line_no, line| self.step(&mut state, line_no, line))?;
        log::debug!(
            "{} listing: {} functions, {} blocks, {} instructions, ended at 0x{:x}",
            self.decoder.name(),
            state.listing.functions.len(),
            state.listing.blocks().count(),
            state.listing.instruction_count(),
            state.cur_address
        );
        Ok(state.finish())
    }

    pub fn parse_str(&self, text: &str) -> Result<AsmListing, ParseError> {
        self.parse_reader(text.as_bytes())
    }

    pub fn parse_path(&self, path: &Path) -> Result<AsmListing, ParseError> {
        let file = File::open(path)?;
        self.parse_reader(BufReader::with_capacity(64 * 1024, file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARM_DUMP: &str = "
/tmp/foo_c/arm_bc.o:     file format elf32-littlearm


Disassembly of section .text:

00000000 <add>:
add():
/src/foo.c:2
   0:\te24dd008 \tsub\tsp, sp, #8
   4:\te58d0004 \tstr\tr0, [sp, #4]
/src/foo.c:3
   8:\te59d0004 \tldr\tr0, [sp, #4]
   c:\te28dd008 \tadd\tsp, sp, #8
  10:\te12fff1e \tbx\tlr

00000014 <main>:
main():
/src/foo.c:6
  14:\te59f0004 \tldr\tr0, [pc, #4]\t; 0x20 <main+0xc>
  18:\te12fff1e \tbx\tlr
  1c:\t00000000 \tandeq\tr0, r0, r0
";

    const X86_DUMP: &str = "
00000000 <add>:
add():
/src/foo.c:2
   0:\t55                   \tpush   %ebp
   1:\t89 e5                \tmovl   %esp, %ebp
   3:\t83 ec 08             \tsubl   $0x8, %esp
/src/foo.c:3
   6:\t8b 45 08             \tmovl   0x8(%ebp), %eax
   9:\tc9                   \tleave
   a:\tc3                   \tretl   
";

    fn arm() -> AsmParser {
        AsmParser::new(Decoder::Columns, &ParseOptions::default()).unwrap()
    }

    fn x86() -> AsmParser {
        AsmParser::new(Decoder::Combined, &ParseOptions::default()).unwrap()
    }

    fn assert_monotonic(listing: &AsmListing) {
        let mut expected: Option<u64> = None;
        for inst in listing.functions.iter().flat_map(|f| f.instructions()) {
            if let Some(addr) = expected {
                assert_eq!(inst.address, addr);
            }
            expected = Some(inst.next_address());
        }
    }

    #[test]
    fn arm_listing_structure() {
        let listing = arm().parse_str(ARM_DUMP).unwrap();
        let names: Vec<_> = listing.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["add", "main"]);
        assert_eq!(listing.functions[0].blocks[0].name, "add");
        assert_eq!(listing.functions[0].blocks[0].insts.len(), 5);
        assert_eq!(listing.functions[1].blocks[0].insts.len(), 3);

        let line2: Vec<_> = listing.line_index.get(2).iter().map(|i| i.opcode.as_str()).collect();
        assert_eq!(line2, vec!["sub", "str"]);
        assert_eq!(listing.line_index.get(3).len(), 3);
        assert_eq!(listing.line_index.get(6).len(), 3);
        assert_eq!(listing.line_index.get(6)[0].annotations, "0x20 <main+0xc>");
        assert_monotonic(&listing);
    }

    #[test]
    fn x86_listing_counts_spaced_bytes() {
        let listing = x86().parse_str(X86_DUMP).unwrap();
        assert_eq!(listing.instruction_count(), 6);
        assert_eq!(listing.line_index.get(2).len(), 3);
        let line3: Vec<_> = listing.line_index.get(3).iter().map(|i| i.opcode.as_str()).collect();
        assert_eq!(line3, vec!["movl", "leave", "retl"]);
        assert_monotonic(&listing);
    }

    #[test]
    fn every_instruction_is_indexed_once() {
        let listing = arm().parse_str(ARM_DUMP).unwrap();
        assert_eq!(listing.line_index.instruction_count(), listing.instruction_count());
    }

    #[test]
    fn address_keeps_counting_across_functions() {
        let parser = arm();
        let mut state = ParserState::new();
        for (no, line) in ARM_DUMP.lines().enumerate() {
            parser.step(&mut state, no + 1, line).unwrap();
        }
        assert_eq!(state.cur_address, 0x20);
        assert_eq!(state.cursor, Cursor::InBlock);
        assert_eq!(state.cur_line_num, 6);
    }

    #[test]
    fn off_address_lines_are_ignored() {
        let dump = "00000000 <f>:\nf():\n   4:\te12fff1e \tbx\tlr\n";
        let listing = arm().parse_str(dump).unwrap();
        assert_eq!(listing.instruction_count(), 0);
    }

    #[test]
    fn instructions_before_annotation_go_to_line_zero() {
        let dump = "00000000 <f>:\nf():\n   0:\te12fff1e \tbx\tlr\n";
        let listing = arm().parse_str(dump).unwrap();
        assert_eq!(listing.line_index.get(0).len(), 1);
    }

    #[test]
    fn ambiguous_lines_are_fatal() {
        let parser = arm();
        let state = ParserState::new();
        for line in ["0 <f>:g():", "main.c:12():", "1 <foo.c:7>:"] {
            let err = parser.classify(&state, 1, line).unwrap_err();
            match err {
                ParseError::AmbiguousLine { matches, .. } => assert_eq!(matches.len(), 2),
                other => panic!("unexpected {other:?} for {line:?}"),
            }
        }
    }

    #[test]
    fn header_kinds() {
        let parser = arm();
        let state = ParserState::new();
        assert_eq!(
            parser.classify(&state, 1, "00000000 <main>:").unwrap(),
            LineKind::FunctionHeader("main".to_string())
        );
        assert_eq!(
            parser.classify(&state, 1, "main():").unwrap(),
            LineKind::BlockHeader("main".to_string())
        );
        assert_eq!(
            parser.classify(&state, 1, "/src/a.cpp:41 (discriminator 2)").unwrap(),
            LineKind::LineAnnotation(41)
        );
        assert_eq!(
            parser.classify(&state, 1, "/src/a.rs:41").unwrap(),
            LineKind::Other
        );
    }

    #[test]
    fn annotation_suffixes_are_configurable() {
        let options = ParseOptions {
            source_suffixes: vec!["rs".to_string()],
        };
        let parser = AsmParser::new(Decoder::Columns, &options).unwrap();
        let state = ParserState::new();
        assert_eq!(
            parser.classify(&state, 1, "/src/lib.rs:9").unwrap(),
            LineKind::LineAnnotation(9)
        );
        assert_eq!(parser.classify(&state, 1, "/src/a.c:9").unwrap(), LineKind::Other);
    }

    #[test]
    fn instruction_without_block_is_fatal() {
        let err = arm()
            .parse_str("00000000 <f>:\n   0:\te12fff1e \tbx\tlr\n")
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingContext { line_no: 2, found: "instruction", .. }
        ));

        let err = arm().parse_str("f():\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingContext { line_no: 1, .. }));
    }

    #[test]
    fn decoder_mismatch_is_fatal() {
        let err = x86().parse_str(ARM_DUMP).unwrap_err();
        assert!(matches!(err, ParseError::Decode { line_no: 10, .. }));
    }

    #[test]
    fn new_function_clears_block() {
        let parser = arm();
        let mut state = ParserState::new();
        parser.step(&mut state, 1, "00000000 <f>:").unwrap();
        parser.step(&mut state, 2, "f():").unwrap();
        assert_eq!(state.cursor, Cursor::InBlock);
        parser.step(&mut state, 3, "00000000 <g>:").unwrap();
        assert_eq!(state.cursor, Cursor::InFunction);
        assert!(parser.step(&mut state, 4, "   0:\te12fff1e \tbx\tlr").is_err());
    }

    #[test]
    fn reparse_is_identical() {
        let parser = arm();
        assert_eq!(parser.parse_str(ARM_DUMP).unwrap(), parser.parse_str(ARM_DUMP).unwrap());
    }

    #[test]
    fn function_headers_at_hex_addresses() {
        let dump = "
00000000 <f>:
f():
   0:\te12fff1e \tbx\tlr
   4:\te12fff1e \tbx\tlr
   8:\te12fff1e \tbx\tlr

0000000c <g>:
g():
   c:\te12fff1e \tbx\tlr
  10:\te12fff1e \tbx\tlr
  14:\te12fff1e \tbx\tlr
  18:\te12fff1e \tbx\tlr

0000001c <_Z3addii>:
_Z3addii():
  1c:\te12fff1e \tbx\tlr
";
        let listing = arm().parse_str(dump).unwrap();
        let names: Vec<_> = listing.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["f", "g", "_Z3addii"]);
        assert!(listing.functions.iter().all(|f| f.blocks.len() == 1));
        assert_eq!(listing.functions[2].demangled.as_deref(), Some("add(int, int)"));
        assert_eq!(listing.instruction_count(), 8);
    }

    #[test]
    fn mangled_names_are_demangled() {
        let dump = "00000000 <_Z3addii>:\n_Z3addii():\n";
        let listing = arm().parse_str(dump).unwrap();
        assert_eq!(listing.functions[0].name, "_Z3addii");
        assert_eq!(listing.functions[0].demangled.as_deref(), Some("add(int, int)"));
        assert_eq!(listing.functions[0].blocks[0].name, "_Z3addii");
    }
}
