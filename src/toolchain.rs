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

//! Drives clang/opt/llc/as/objdump to produce the metadata and disassembly
//! artifacts for one source file and one architecture.
//!
//! Every step writes a single output file. A step is skipped when its output
//! already exists, unless the toolchain was configured with `force`.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::arch::{ArchConfig, ArtifactPaths};
use crate::error::ToolchainError;
use crate::utils::work_dir_name;

/// Locations of the LLVM tools. Architecture-specific binutils live in [`ArchConfig`].
#[derive(Debug, Clone, Default)]
pub struct ToolPaths {
    pub clang: Option<PathBuf>,
    pub llc: Option<PathBuf>,
    pub opt: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub opt_level: u8,
    pub cflags: Vec<String>,
    pub includes: Vec<PathBuf>,
    /// Re-run every step even when its output exists
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    Null,
    File(PathBuf),
}

impl Redirect {
    fn stdio(&self) -> io::Result<Stdio> {
        match self {
            Redirect::Null => Ok(Stdio::null()),
            Redirect::File(path) => Ok(Stdio::from(File::create(path)?)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub stdin: Option<PathBuf>,
    pub stdout: Redirect,
    pub stderr: Redirect,
}

impl fmt::Display for CommandStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        if let Some(stdin) = &self.stdin {
            write!(f, " < {}", stdin.display())?;
        }
        if let Redirect::File(path) = &self.stdout {
            write!(f, " > {}", path.display())?;
        }
        if let Redirect::File(path) = &self.stderr {
            write!(f, " 2> {}", path.display())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Run(CommandStep),
    /// Drop `.align` directives from an assembly file in place
    StripAlign,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub description: String,
    pub action: Action,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Toolchain {
    clang: PathBuf,
    llc: PathBuf,
    opt: PathBuf,
    options: BuildOptions,
}

impl Toolchain {
    pub fn new(tools: &ToolPaths, options: BuildOptions) -> Result<Self, ToolchainError> {
        fn require(
            path: &Option<PathBuf>,
            tool: &'static str,
            env_var: &'static str,
        ) -> Result<PathBuf, ToolchainError> {
            path.clone()
                .ok_or(ToolchainError::MissingTool { tool, env_var })
        }
        Ok(Self {
            clang: require(&tools.clang, "clang", "CLANG_PATH")?,
            llc: require(&tools.llc, "llc", "LLC_PATH")?,
            opt: require(&tools.opt, "opt", "OPT_PATH")?,
            options,
        })
    }

    fn compile_flags(&self, arch: &ArchConfig) -> Vec<String> {
        let mut flags = self.options.cflags.clone();
        for include in &self.options.includes {
            flags.push(format!("-I{}", include.display()));
        }
        flags.push(format!("-I{}", arch.include.display()));
        flags
    }

    /// The ordered steps turning `source` into `paths` for `arch`.
    pub fn plan(&self, source: &Path, arch: &ArchConfig, paths: &ArtifactPaths) -> Vec<Step> {
        let opt_level = format!("-O{}", self.options.opt_level);
        let target = format!("--target={}", arch.target);
        let src = source.display().to_string();
        fn path(p: &Path) -> String {
            p.display().to_string()
        }
        fn run(program: &Path, args: Vec<String>) -> CommandStep {
            CommandStep {
                program: program.to_path_buf(),
                args,
                stdin: None,
                stdout: Redirect::Null,
                stderr: Redirect::Null,
            }
        }

        let mut ir_args = vec![
            "-S".to_string(),
            src.clone(),
            "-o".to_string(),
            path(&paths.ir),
            opt_level.clone(),
            "-g".to_string(),
            "-emit-llvm".to_string(),
            "-fno-discard-value-names".to_string(),
            target.clone(),
        ];
        ir_args.extend(self.compile_flags(arch));

        // Same IR without -g, input for the ir2json pass below
        let mut plain_ir_args = vec![
            "-S".to_string(),
            src,
            "-o".to_string(),
            path(&paths.tmp),
            opt_level.clone(),
            "-emit-llvm".to_string(),
            "-fno-discard-value-names".to_string(),
            target.clone(),
        ];
        plain_ir_args.extend(self.compile_flags(arch));

        let mut as_args = vec![path(&paths.asm)];
        as_args.extend(arch.as_args.iter().cloned());
        as_args.extend(["-o".to_string(), path(&paths.obj)]);

        let mut objdump_args = vec!["-d".to_string(), "-l".to_string(), target];
        objdump_args.extend(arch.objdump_args.iter().cloned());
        objdump_args.extend(["--insn-width=8".to_string(), path(&paths.obj)]);

        vec![
            Step {
                description: format!("Generate LLVM IR using {} compiler", arch.name),
                action: Action::Run(run(&self.clang, ir_args)),
                output: paths.ir.clone(),
            },
            Step {
                description: format!("Generate plain LLVM IR using {} compiler", arch.name),
                action: Action::Run(run(&self.clang, plain_ir_args)),
                output: paths.tmp.clone(),
            },
            Step {
                description: format!("Generate LLVM IR information for {}", arch.name),
                action: Action::Run(CommandStep {
                    stdin: Some(paths.tmp.clone()),
                    stderr: Redirect::File(paths.ir_info.clone()),
                    ..run(
                        &self.opt,
                        vec![
                            "--enable-debugify".to_string(),
                            "-load".to_string(),
                            "LLVMIR2JSON.so".to_string(),
                            "-ir2json".to_string(),
                        ],
                    )
                }),
                output: paths.ir_info.clone(),
            },
            Step {
                description: format!("Generate {} asm code", arch.name),
                action: Action::Run(run(
                    &self.llc,
                    vec![
                        path(&paths.ir),
                        "-o".to_string(),
                        path(&paths.asm),
                        opt_level,
                        "--asm-show-inst".to_string(),
                        "--relocation-model=pic".to_string(),
                        "--debugify-level=location+variables".to_string(),
                        format!("--mtriple={}", arch.target),
                    ],
                )),
                output: paths.asm.clone(),
            },
            Step {
                description: "Remove align directives".to_string(),
                action: Action::StripAlign,
                output: paths.asm.clone(),
            },
            Step {
                description: "Assemble asm code to obj file".to_string(),
                action: Action::Run(run(&arch.assembler, as_args)),
                output: paths.obj.clone(),
            },
            Step {
                description: "Dump obj file to asm code".to_string(),
                action: Action::Run(CommandStep {
                    stdout: Redirect::File(paths.asm_dump.clone()),
                    ..run(&arch.objdump, objdump_args)
                }),
                output: paths.asm_dump.clone(),
            },
        ]
    }

    /// Produce every artifact for `source` under `work_dir`.
    pub fn build(
        &self,
        source: &Path,
        arch: &ArchConfig,
        work_dir: &Path,
    ) -> Result<ArtifactPaths, ToolchainError> {
        let paths = arch.artifact_paths(work_dir);
        log::info!(
            "{} (Generate input files for {})...",
            source.display(),
            arch.name
        );
        for step in self.plan(source, arch, &paths) {
            match &step.action {
                Action::StripAlign => {
                    log::debug!("   {}", step.description);
                    strip_align(&step.output)?;
                }
                Action::Run(cmd) => {
                    if !self.options.force && step.output.exists() {
                        log::debug!("   {} (cached)", step.description);
                        continue;
                    }
                    log::debug!("   {}", step.description);
                    log::debug!("   {}", cmd);
                    run_step(cmd, &step.output)?;
                }
            }
        }
        Ok(paths)
    }
}

/// Run one command. On any failure `output` is removed, so a truncated file
/// is never taken for a cached artifact by the next build.
fn run_step(cmd: &CommandStep, output: &Path) -> Result<(), ToolchainError> {
    let result = spawn_step(cmd, output);
    if result.is_err() {
        match fs::remove_file(output) {
            Ok(()) => log::debug!("   removed partial {}", output.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("could not remove {}: {}", output.display(), e),
        }
    }
    result
}

fn spawn_step(cmd: &CommandStep, output: &Path) -> Result<(), ToolchainError> {
    let program = cmd.program.display().to_string();
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdout(cmd.stdout.stdio()?)
        .stderr(cmd.stderr.stdio()?);
    if let Some(stdin) = &cmd.stdin {
        command.stdin(Stdio::from(File::open(stdin)?));
    }
    let status = command.status().map_err(|source| ToolchainError::Spawn {
        program: program.clone(),
        source,
    })?;
    if !status.success() {
        return Err(ToolchainError::Failed {
            program,
            status,
            output: output.to_path_buf(),
        });
    }
    Ok(())
}

/// Remove every line mentioning `.align` from `asm_path`. A missing or empty
/// file is left alone.
pub fn strip_align(asm_path: &Path) -> io::Result<()> {
    let file = match File::open(asm_path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let mut kept = Vec::new();
    for line in BufReader::new(file).split(b'\n') {
        let line = line?;
        if !String::from_utf8_lossy(&line).contains(".align") {
            kept.push(line);
        }
    }
    if kept.is_empty() {
        return Ok(());
    }
    let mut out = BufWriter::new(File::create(asm_path)?);
    for line in kept {
        out.write_all(&line)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Per-source-file work directory under `root`, created on demand.
pub fn prepare_work_dir(root: &Path, source: &Path) -> io::Result<PathBuf> {
    let dir = root.join(work_dir_name(source));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Delete every cached per-file directory under `root`. Returns how many were removed.
pub fn clean_cache(root: &Path) -> io::Result<usize> {
    if !root.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toolchain(force: bool) -> Toolchain {
        let tools = ToolPaths {
            clang: Some(PathBuf::from("/opt/llvm/bin/clang")),
            llc: Some(PathBuf::from("/opt/llvm/bin/llc")),
            opt: Some(PathBuf::from("/opt/llvm/bin/opt")),
        };
        let options = BuildOptions {
            opt_level: 2,
            cflags: vec!["-DNDEBUG".to_string()],
            includes: vec![PathBuf::from("/inc")],
            force,
        };
        Toolchain::new(&tools, options).unwrap()
    }

    #[test]
    fn missing_tool_is_reported() {
        let tools = ToolPaths {
            clang: Some(PathBuf::from("clang")),
            llc: None,
            opt: Some(PathBuf::from("opt")),
        };
        let err = Toolchain::new(&tools, BuildOptions::default()).unwrap_err();
        assert!(matches!(err, ToolchainError::MissingTool { tool: "llc", .. }));
    }

    #[test]
    fn plan_orders_steps_and_wires_redirects() {
        let arch = ArchConfig::arm();
        let paths = arch.artifact_paths(Path::new("w"));
        let steps = toolchain(false).plan(Path::new("src/a.c"), &arch, &paths);
        assert_eq!(steps.len(), 7);

        let Action::Run(ir) = &steps[0].action else {
            panic!("expected command");
        };
        assert_eq!(
            ir.to_string(),
            "/opt/llvm/bin/clang -S src/a.c -o w/arm.ll -O2 -g -emit-llvm \
             -fno-discard-value-names --target=armv7-unknown-linux-gnueabi \
             -DNDEBUG -I/inc -I/usr/arm-linux-gnueabi/include"
        );

        let Action::Run(info) = &steps[2].action else {
            panic!("expected command");
        };
        assert_eq!(info.stdin, Some(paths.tmp.clone()));
        assert_eq!(info.stderr, Redirect::File(paths.ir_info.clone()));
        assert_eq!(steps[2].output, paths.ir_info);

        assert_eq!(steps[4].action, Action::StripAlign);

        let Action::Run(dump) = &steps[6].action else {
            panic!("expected command");
        };
        assert_eq!(
            dump.to_string(),
            "/usr/bin/arm-linux-gnueabi-objdump -d -l --target=armv7-unknown-linux-gnueabi \
             -M reg-names-raw --insn-width=8 w/arm_bc.o > w/arm_bc_dump.s"
        );
    }

    #[test]
    fn cached_outputs_are_not_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let arch = ArchConfig::x86();
        let paths = arch.artifact_paths(dir.path());
        for p in [&paths.ir, &paths.tmp, &paths.ir_info, &paths.asm, &paths.obj, &paths.asm_dump] {
            fs::write(p, "\t.text\n\t.p2align 4\n\t.align 2\nf:\n").unwrap();
        }
        // Nothing here exists, so any spawned step would fail
        let built = toolchain(false)
            .build(Path::new("a.c"), &arch, dir.path())
            .unwrap();
        assert_eq!(built, paths);
        let asm = fs::read_to_string(&paths.asm).unwrap();
        assert_eq!(asm, "\t.text\n\t.p2align 4\nf:\n");

        let err = toolchain(true)
            .build(Path::new("a.c"), &arch, dir.path())
            .unwrap_err();
        assert!(matches!(err, ToolchainError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn run_step_captures_stdout_and_checks_status() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let ok = CommandStep {
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), "echo hello".to_string()],
            stdin: None,
            stdout: Redirect::File(out.clone()),
            stderr: Redirect::Null,
        };
        run_step(&ok, &out).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");

        let fail = CommandStep {
            args: vec!["-c".to_string(), "exit 3".to_string()],
            stdout: Redirect::Null,
            ..ok
        };
        let err = run_step(&fail, &out).unwrap_err();
        assert!(matches!(err, ToolchainError::Failed { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn failed_step_leaves_nothing_to_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let mut arch = ArchConfig::x86();
        arch.objdump = PathBuf::from("/nonexistent/objdump");
        let paths = arch.artifact_paths(dir.path());
        for p in [&paths.ir, &paths.tmp, &paths.ir_info, &paths.asm, &paths.obj] {
            fs::write(p, "f:\n").unwrap();
        }

        let err = toolchain(false)
            .build(Path::new("a.c"), &arch, dir.path())
            .unwrap_err();
        assert!(matches!(err, ToolchainError::Spawn { .. }));
        assert!(!paths.asm_dump.exists());

        // The dump is still missing, so the second build must retry and fail again
        let err = toolchain(false)
            .build(Path::new("a.c"), &arch, dir.path())
            .unwrap_err();
        assert!(matches!(err, ToolchainError::Spawn { .. }));
    }

    #[test]
    fn work_dirs_are_created_and_cleaned() {
        let root = tempfile::tempdir().unwrap();
        let dir = prepare_work_dir(root.path(), Path::new("src/foo.c")).unwrap();
        assert_eq!(dir, root.path().join("foo_c"));
        assert!(dir.is_dir());
        prepare_work_dir(root.path(), Path::new("bar.c")).unwrap();
        assert_eq!(clean_cache(root.path()).unwrap(), 2);
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
        assert_eq!(clean_cache(&root.path().join("missing")).unwrap(), 0);
    }
}
