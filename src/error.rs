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

//! Error types for decoding and parsing the textual toolchain artifacts.
//!
//! Every parse error is fatal for the artifact it came from: an artifact is
//! parsed as a whole or not at all.

use std::path::PathBuf;

use thiserror::Error;

/// A single disassembly line could not be turned into an [`Instruction`](crate::instr::Instruction).
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("expected {expected} tab-separated fields for {variant} instruction, found {found}")]
    FieldCount {
        variant: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("invalid instruction address {0:?}")]
    Address(String),
}

/// Failure while parsing one artifact (metadata stream or disassembly listing).
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line {line_no}: malformed instruction {text:?}: {source}")]
    Decode {
        line_no: usize,
        text: String,
        #[source]
        source: DecodeError,
    },

    /// More than one of the header/annotation patterns matched the same line.
    #[error("line {line_no}: ambiguous classification, matched {matches:?}: {text:?}")]
    AmbiguousLine {
        line_no: usize,
        matches: Vec<&'static str>,
        text: String,
    },

    #[error("line {line_no}: {found} encountered with no current {expected}: {text:?}")]
    MissingContext {
        line_no: usize,
        found: &'static str,
        expected: &'static str,
        text: String,
    },

    #[error("line {line_no}: malformed metadata record: {source}")]
    MalformedMetadata {
        line_no: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid line annotation pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure while driving the external compiler toolchain.
#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("{tool} path is not configured (set {env_var} or pass it on the command line)")]
    MissingTool {
        tool: &'static str,
        env_var: &'static str,
    },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status} while producing {}", .output.display())]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        output: PathBuf,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
