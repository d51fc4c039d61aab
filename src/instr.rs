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

use serde::Serialize;

/// One decoded machine instruction from a disassembly listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    /// Byte offset as printed by the disassembler
    pub address: u64,
    pub encoded_bytes: String, // e.g. "e12fff1e" or "55 89 e5"
    pub opcode: String,
    pub operands: String, // Verbatim, never re-parsed
    pub annotations: String,
}

impl Instruction {
    pub fn new(
        address: u64,
        encoded_bytes: String,
        opcode: String,
        operands: String,
        annotations: String,
    ) -> Self {
        Self {
            address,
            encoded_bytes,
            opcode,
            operands,
            annotations,
        }
    }

    /// Size in bytes: two hex digits per byte. Separating spaces (x86 objdump
    /// prints "83 ec 08") are not counted.
    pub fn size(&self) -> u64 {
        let digits = self
            .encoded_bytes
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .count();
        (digits / 2) as u64
    }

    pub fn next_address(&self) -> u64 {
        self.address + self.size()
    }
}
