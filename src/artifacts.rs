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

//! Parsed artifacts for one architecture, and concurrent loading of the
//! guest/host pair.

use std::path::Path;
use std::thread;
use std::time::Instant;

use crate::arch::{ArchConfig, ArtifactPaths, Decoder};
use crate::asm_listing::{AsmListing, AsmParser, ParseOptions};
use crate::error::ParseError;
use crate::ir_info::IrInfo;

/// IR metadata and disassembly listing of one source file for one architecture.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ArchArtifacts {
    pub ir: IrInfo,
    pub asm: AsmListing,
}

impl ArchArtifacts {
    pub fn load(
        decoder: Decoder,
        ir_info_path: &Path,
        asm_dump_path: &Path,
        options: &ParseOptions,
    ) -> Result<Self, ParseError> {
        let parser = AsmParser::new(decoder, options)?;
        Ok(Self {
            ir: IrInfo::from_path(ir_info_path)?,
            asm: parser.parse_path(asm_dump_path)?,
        })
    }
}

/// Parse the four artifacts of one source file on four threads. Each parse owns
/// its own state; nothing is shared until the results are joined.
pub fn load_pair(
    guest: (&ArchConfig, &ArtifactPaths),
    host: (&ArchConfig, &ArtifactPaths),
    options: &ParseOptions,
) -> Result<(ArchArtifacts, ArchArtifacts), ParseError> {
    let now = Instant::now();
    let guest_parser = AsmParser::new(guest.0.decoder, options)?;
    let host_parser = AsmParser::new(host.0.decoder, options)?;

    let (g_ir, h_ir, g_asm, h_asm) = thread::scope(|s| {
        let g_ir = s.spawn(|| IrInfo::from_path(&guest.1.ir_info));
        let h_ir = s.spawn(|| IrInfo::from_path(&host.1.ir_info));
        let g_asm = s.spawn(|| guest_parser.parse_path(&guest.1.asm_dump));
        let h_asm = s.spawn(|| host_parser.parse_path(&host.1.asm_dump));
        (join(g_ir), join(h_ir), join(g_asm), join(h_asm))
    });

    let guest_artifacts = ArchArtifacts {
        ir: g_ir?,
        asm: g_asm?,
    };
    let host_artifacts = ArchArtifacts {
        ir: h_ir?,
        asm: h_asm?,
    };
    log::info!(
        "Artifacts loaded: {} {}/{} and {} {}/{} IR/asm instructions in {:.2?}",
        guest.0.name,
        guest_artifacts.ir.line_index.instruction_count(),
        guest_artifacts.asm.instruction_count(),
        host.0.name,
        host_artifacts.ir.line_index.instruction_count(),
        host_artifacts.asm.instruction_count(),
        now.elapsed()
    );
    Ok((guest_artifacts, host_artifacts))
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        // A parser panic is a bug, not an artifact error
        Err(payload) => std::panic::resume_unwind(payload),
    }
}
