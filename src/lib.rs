// Crate root: declare modules and control visibility
pub mod arch;
pub mod artifacts;
pub mod asm_listing;
pub mod correlate;
pub mod error;
pub mod instr;
pub mod ir_info;
pub mod line_index;
pub mod link;
pub mod logging;
pub mod serializer;
pub mod toolchain;
pub mod utils;

// Re-export commonly used API from the library for binaries/tests
pub use arch::{ArchConfig, ArtifactPaths, Decoder};
pub use artifacts::{load_pair, ArchArtifacts};
pub use asm_listing::{AsmListing, AsmParser, ParseOptions};
pub use correlate::{AlignedRecord, Correlator};
pub use error::{DecodeError, ParseError, ToolchainError};
pub use instr::Instruction;
pub use ir_info::{IrInfo, IrInstruction};
pub use line_index::LineIndex;
pub use link::{LinkConfig, LinkedFile, Linker};
