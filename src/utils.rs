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

use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

/// Resolve `source_path` to an absolute path with forward slashes, falling back
/// to the joined path when the file does not exist (yet).
pub fn canonicalize_path(source_path: &Path) -> String {
    let absolute = if source_path.is_absolute() {
        source_path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(source_path)
    };
    // dunce avoids \\?\ prefixes on Windows
    let canonical = dunce::canonicalize(&absolute).unwrap_or(absolute);
    canonical.to_string_lossy().replace('\\', "/")
}

/// Stream `reader` line by line without allocating the whole artifact.
/// `f` receives the 1-based line number and the line with CR/LF removed.
/// A line that is not valid UTF-8 fails with [`io::ErrorKind::InvalidData`].
pub fn for_each_line<R, E, F>(mut reader: R, mut f: F) -> Result<(), E>
where
    R: BufRead,
    E: From<io::Error>,
    F: FnMut(usize, &str) -> Result<(), E>,
{
    let mut buf: Vec<u8> = Vec::with_capacity(8 * 1024);
    let mut line_no = 0;
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break; // EOF
        }
        line_no += 1;

        // strip trailing CR/LF
        while buf
            .last()
            .map(|b| *b == b'\n' || *b == b'\r')
            .unwrap_or(false)
        {
            buf.pop();
        }

        let line = std::str::from_utf8(&buf).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("line {line_no}: {e}"))
        })?;
        f(line_no, line)?;
    }
    Ok(())
}

/// Per-file work directory name: `foo.c` -> `foo_c`.
pub fn work_dir_name(source_path: &Path) -> String {
    source_path
        .file_name()
        .map(|n| n.to_string_lossy().replace('.', "_"))
        .unwrap_or_default()
}

/// Recursively collect files under `dir` whose names end in one of `suffixes`,
/// restricted to `wanted` names when that list is non-empty. Sorted for a
/// stable processing order.
pub fn find_source_files(
    dir: &Path,
    suffixes: &[String],
    wanted: &[String],
) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if !suffixes.iter().any(|s| name.ends_with(s.as_str())) {
                continue;
            }
            if !wanted.is_empty() && !wanted.contains(&name) {
                continue;
            }
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
