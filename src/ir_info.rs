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

//! Loader for the IR metadata stream: one JSON object per compiled function,
//! interleaved with free-form informational text that is skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::line_index::LineIndex;
use crate::utils::for_each_line;

/// One IR instruction. Only `line` is interpreted; every other attribute is
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrInstruction {
    pub line: u32,
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrBlock {
    pub name: String,
    pub insts: Vec<Arc<IrInstruction>>,
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrFunction {
    pub name: String,
    pub bbs: Vec<IrBlock>,
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct IrInfo {
    pub functions: Vec<IrFunction>,
    pub line_index: LineIndex<Arc<IrInstruction>>,
}

impl IrInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::with_capacity(64 * 1024, file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ParseError> {
        let mut info = Self::new();
        for_each_line(reader, |line_no, line| {
            if line.starts_with('{') {
                info.add_record(line_no, line)?;
            }
            Ok::<(), ParseError>(())
        })?;
        log::debug!(
            "IR metadata: {} functions, {} blocks, {} instructions",
            info.functions.len(),
            info.blocks().count(),
            info.line_index.instruction_count()
        );
        Ok(info)
    }

    pub fn parse_str(text: &str) -> Result<Self, ParseError> {
        Self::from_reader(text.as_bytes())
    }

    fn add_record(&mut self, line_no: usize, record: &str) -> Result<(), ParseError> {
        let function: IrFunction = serde_json::from_str(record)
            .map_err(|source| ParseError::MalformedMetadata { line_no, source })?;
        for inst in function.bbs.iter().flat_map(|bb| bb.insts.iter()) {
            self.line_index.append(inst.line, Arc::clone(inst));
        }
        self.functions.push(function);
        Ok(())
    }

    /// Every basic block of every function, in stream order.
    pub fn blocks(&self) -> impl Iterator<Item = &IrBlock> + '_ {
        self.functions.iter().flat_map(|f| f.bbs.iter())
    }
}
