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

//! End-to-end pipeline: build every source file under a directory for the
//! guest and host architectures, parse the artifacts and hand out correlators.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::arch::{ArchConfig, ArtifactPaths};
use crate::artifacts::{load_pair, ArchArtifacts};
use crate::asm_listing::ParseOptions;
use crate::correlate::Correlator;
use crate::toolchain::{prepare_work_dir, Toolchain};
use crate::utils::find_source_files;

#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub guest: ArchConfig,
    pub host: ArchConfig,
    /// Root directory walked for source files
    pub input: PathBuf,
    /// File name endings selecting which files get built
    pub file_suffixes: Vec<String>,
    /// When non-empty, only these file names are processed
    pub wanted: Vec<String>,
    pub work_root: PathBuf,
    pub parse: ParseOptions,
}

impl LinkConfig {
    pub fn new(input: PathBuf, work_root: PathBuf) -> Self {
        Self {
            guest: ArchConfig::arm(),
            host: ArchConfig::x86(),
            input,
            file_suffixes: vec![".c".to_string()],
            wanted: Vec::new(),
            work_root,
            parse: ParseOptions::default(),
        }
    }
}

/// One source file with the parsed artifacts of both architectures.
#[derive(Debug, Clone)]
pub struct LinkedFile {
    pub path: PathBuf,
    pub source: String,
    pub guest: ArchArtifacts,
    pub host: ArchArtifacts,
}

impl LinkedFile {
    /// Load already generated artifacts for `path`.
    pub fn load(
        path: &Path,
        guest: (&ArchConfig, &ArtifactPaths),
        host: (&ArchConfig, &ArtifactPaths),
        options: &ParseOptions,
    ) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read source {}", path.display()))?;
        let (guest, host) = load_pair(guest, host, options)
            .with_context(|| format!("failed to parse artifacts of {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            source,
            guest,
            host,
        })
    }

    pub fn correlator(&self) -> Correlator<'_> {
        Correlator::from_artifacts(&self.source, &self.guest, &self.host)
    }
}

pub struct Linker {
    toolchain: Toolchain,
    config: LinkConfig,
}

impl Linker {
    pub fn new(toolchain: Toolchain, config: LinkConfig) -> Self {
        Self { toolchain, config }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn source_files(&self) -> Result<Vec<PathBuf>> {
        find_source_files(
            &self.config.input,
            &self.config.file_suffixes,
            &self.config.wanted,
        )
        .with_context(|| format!("failed to scan {}", self.config.input.display()))
    }

    /// Build guest then host artifacts for one file and parse them.
    pub fn link_file(&self, path: &Path) -> Result<LinkedFile> {
        let work_dir = prepare_work_dir(&self.config.work_root, path)
            .with_context(|| format!("failed to create work dir for {}", path.display()))?;
        let guest_paths = self
            .toolchain
            .build(path, &self.config.guest, &work_dir)
            .with_context(|| format!("{} build failed for {}", self.config.guest.name, path.display()))?;
        let host_paths = self
            .toolchain
            .build(path, &self.config.host, &work_dir)
            .with_context(|| format!("{} build failed for {}", self.config.host.name, path.display()))?;
        LinkedFile::load(
            path,
            (&self.config.guest, &guest_paths),
            (&self.config.host, &host_paths),
            &self.config.parse,
        )
    }

    /// Lazily link every selected source file, one at a time.
    pub fn link_all(&self) -> Result<impl Iterator<Item = Result<LinkedFile>> + '_> {
        let files = self.source_files()?;
        log::info!(
            "Linking {} source files from {}",
            files.len(),
            self.config.input.display()
        );
        Ok(files.into_iter().map(move |path| self.link_file(&path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_prebuilt_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.c");
        fs::write(&src, "int f(void)\n{\n  return 0;\n}\n").unwrap();

        let config = LinkConfig::new(dir.path().to_path_buf(), dir.path().join("temp"));
        let guest_paths = config.guest.artifact_paths(dir.path());
        let host_paths = config.host.artifact_paths(dir.path());
        let ir = "{\"name\":\"f\",\"bbs\":[{\"name\":\"entry\",\"insts\":[{\"line\":3,\"op\":\"ret\"}]}]}\n";
        fs::write(&guest_paths.ir_info, ir).unwrap();
        fs::write(&host_paths.ir_info, ir).unwrap();
        fs::write(
            &guest_paths.asm_dump,
            "00000000 <f>:\nf():\n/t/a.c:3\n   0:\te3a00000 \tmov\tr0, #0\n   4:\te12fff1e \tbx\tlr\n",
        )
        .unwrap();
        fs::write(
            &host_paths.asm_dump,
            "00000000 <f>:\nf():\n/t/a.c:3\n   0:\t31 c0 \txorl   %eax, %eax\n   2:\tc3 \tretl\n",
        )
        .unwrap();

        let linked = LinkedFile::load(
            &src,
            (&config.guest, &guest_paths),
            (&config.host, &host_paths),
            &config.parse,
        )
        .unwrap();
        let records: Vec<_> = linked.correlator().records().collect();
        assert_eq!(records.len(), 4);
        assert_eq!(records[2].source, "  return 0;");
        assert_eq!(records[2].guest_asm.len(), 2);
        assert_eq!(records[2].host_asm.len(), 2);
        assert_eq!(records[2].guest_ir.len(), 1);
        assert!(records.iter().filter(|r| r.index != 2).all(|r| !r.has_code()));
    }
}
