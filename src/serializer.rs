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

use std::io::Write;
use std::sync::Arc;

use serde_json::json;
use serde_json::Value;

use crate::correlate::AlignedRecord;
use crate::instr::Instruction;
use crate::ir_info::IrInstruction;

/// Serialize one `AlignedRecord` into a compact JSON object.
/// Format:
/// {
///   "file": "<source path>",
///   "line": <1-based line>,
///   "src": "<source text>",
///   "g_ir": [ {ir instruction}, ... ],
///   "h_ir": [ ... ],
///   "g_asm": [ [addr_hex, bytes, opcode, operands, annotations], ... ],
///   "h_asm": [ ... ]
/// }
pub fn serialize_aligned_record(file: &str, record: &AlignedRecord<'_>) -> Value {
    let ir = |insts: &[Arc<IrInstruction>]| -> Value {
        Value::Array(
            insts
                .iter()
                .map(|inst| serde_json::to_value(&**inst).unwrap_or(Value::Null))
                .collect(),
        )
    };
    let asm = |insts: &[Arc<Instruction>]| -> Value {
        Value::Array(insts.iter().map(|inst| compact_instruction(inst)).collect())
    };

    json!({
        "file": file,
        "line": record.line_number(),
        "src": record.source,
        "g_ir": ir(record.guest_ir),
        "h_ir": ir(record.host_ir),
        "g_asm": asm(record.guest_asm),
        "h_asm": asm(record.host_asm),
    })
}

fn compact_instruction(inst: &Instruction) -> Value {
    // Address as hex string for JS safe handling
    json!([
        format!("0x{:x}", inst.address),
        inst.encoded_bytes,
        inst.opcode,
        inst.operands,
        inst.annotations,
    ])
}

/// Write records as JSON lines. Returns the number of records written.
pub fn write_records<'a, W, I>(
    out: &mut W,
    file: &str,
    records: I,
    skip_empty: bool,
) -> std::io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = AlignedRecord<'a>>,
{
    let mut count = 0;
    for record in records {
        if skip_empty && !record.has_code() {
            continue;
        }
        serde_json::to_writer(&mut *out, &serialize_aligned_record(file, &record))?;
        out.write_all(b"\n")?;
        count += 1;
    }
    Ok(count)
}
