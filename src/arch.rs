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

//! Per-architecture configuration: toolchain target, tool locations and the
//! rule for splitting one disassembly line into an [`Instruction`].

use std::path::{Path, PathBuf};

use crate::error::DecodeError;
use crate::instr::Instruction;

/// Column layout of the disassembler output for one architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// `addr:\tbytes\topcode\toperands[\tannotation]`, as printed for ARM.
    /// The annotation keeps everything after its two-character prefix ("; " or "@ ").
    Columns,
    /// `addr:\tbytes\topcode operands`, as printed for x86.
    Combined,
}

impl Decoder {
    pub fn name(&self) -> &'static str {
        match self {
            Decoder::Columns => "columns",
            Decoder::Combined => "combined",
        }
    }

    /// Decode one instruction line. The caller has already checked that the
    /// line starts with the expected address.
    pub fn decode(&self, line: &str) -> Result<Instruction, DecodeError> {
        let fields: Vec<&str> = line.split('\t').collect();
        match self {
            Decoder::Columns => {
                let (addr, bytes, opcode, operands, annotations) = match fields.as_slice() {
                    [addr, bytes, opcode, operands] => (*addr, *bytes, *opcode, *operands, ""),
                    [addr, bytes, opcode, operands, annotation] => (
                        *addr,
                        *bytes,
                        *opcode,
                        *operands,
                        annotation.get(2..).unwrap_or(""),
                    ),
                    _ => {
                        return Err(DecodeError::FieldCount {
                            variant: self.name(),
                            expected: "4 or 5",
                            found: fields.len(),
                        })
                    }
                };
                Ok(Instruction::new(
                    parse_address(addr)?,
                    clean_bytes(bytes),
                    opcode.to_string(),
                    operands.to_string(),
                    annotations.to_string(),
                ))
            }
            Decoder::Combined => {
                let [addr, bytes, asm_text] = fields.as_slice() else {
                    return Err(DecodeError::FieldCount {
                        variant: self.name(),
                        expected: "3",
                        found: fields.len(),
                    });
                };
                // Operand-less instructions ("ret", "nop") have no separating space.
                let (opcode, operands) = asm_text.split_once(' ').unwrap_or((*asm_text, ""));
                Ok(Instruction::new(
                    parse_address(addr)?,
                    clean_bytes(bytes),
                    opcode.to_string(),
                    operands.trim_start_matches(' ').to_string(),
                    String::new(),
                ))
            }
        }
    }
}

fn parse_address(field: &str) -> Result<u64, DecodeError> {
    let hex_str = field.trim().trim_end_matches(':');
    u64::from_str_radix(hex_str, 16).map_err(|_| DecodeError::Address(field.to_string()))
}

fn clean_bytes(field: &str) -> String {
    field.trim_matches(' ').to_string()
}

/// Everything needed to build and disassemble one source file for one target.
#[derive(Debug, Clone)]
pub struct ArchConfig {
    pub name: String,
    pub target: String,
    pub assembler: PathBuf,
    pub objdump: PathBuf,
    pub include: PathBuf,
    pub decoder: Decoder,
    pub objdump_args: Vec<String>,
    pub as_args: Vec<String>,
}

impl ArchConfig {
    pub fn arm() -> Self {
        Self {
            name: "arm".to_string(),
            target: "armv7-unknown-linux-gnueabi".to_string(),
            assembler: PathBuf::from("/usr/bin/arm-linux-gnueabi-as"),
            objdump: PathBuf::from("/usr/bin/arm-linux-gnueabi-objdump"),
            include: PathBuf::from("/usr/arm-linux-gnueabi/include"),
            decoder: Decoder::Columns,
            objdump_args: vec!["-M".to_string(), "reg-names-raw".to_string()],
            as_args: vec!["-march=armv7a".to_string()],
        }
    }

    pub fn x86() -> Self {
        Self {
            name: "x86".to_string(),
            target: "i686-unknown-linux-gnu".to_string(),
            assembler: PathBuf::from("/usr/bin/i686-linux-gnu-as"),
            objdump: PathBuf::from("/usr/bin/objdump"),
            include: PathBuf::from("/usr/i686-linux-gnu/include"),
            decoder: Decoder::Combined,
            objdump_args: vec!["-M".to_string(), "suffix".to_string()],
            as_args: Vec::new(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "arm" => Some(Self::arm()),
            "x86" => Some(Self::x86()),
            _ => None,
        }
    }

    /// Artifact locations for this architecture inside a per-file work directory.
    pub fn artifact_paths(&self, work_dir: &Path) -> ArtifactPaths {
        let bc_prefix = format!("{}_bc", self.name);
        ArtifactPaths {
            ir: work_dir.join(format!("{}.ll", self.name)),
            ir_info: work_dir.join(format!("{}-info.ll", self.name)),
            asm: work_dir.join(format!("{bc_prefix}.s")),
            asm_dump: work_dir.join(format!("{bc_prefix}_dump.s")),
            obj: work_dir.join(format!("{bc_prefix}.o")),
            tmp: work_dir.join(format!("{}.tmp", self.name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub ir: PathBuf,
    /// Metadata records, one JSON object per function
    pub ir_info: PathBuf,
    pub asm: PathBuf,
    /// Disassembler listing of the assembled object
    pub asm_dump: PathBuf,
    pub obj: PathBuf,
    pub tmp: PathBuf,
}
