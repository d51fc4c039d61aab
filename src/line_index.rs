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

use std::collections::BTreeMap;

/// Source line number -> instructions attributed to that line, in the order
/// they were encountered in the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex<T> {
    entries: BTreeMap<u32, Vec<T>>,
}

impl<T> Default for LineIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LineIndex<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn append(&mut self, line: u32, item: T) {
        self.entries.entry(line).or_default().push(item);
    }

    /// Instructions for `line`; a line with no generated code yields an empty slice.
    pub fn get(&self, line: u32) -> &[T] {
        self.entries.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[T])> + '_ {
        self.entries.iter().map(|(line, items)| (*line, items.as_slice()))
    }

    /// Total number of instructions across all lines.
    pub fn instruction_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
