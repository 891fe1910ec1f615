//! Core of the CHILL (ITU-T Z.200) toolchain.
//!
//! Pipeline:
//!   source
//!     -> lexer (tokens + trivia)
//!     -> parser (recursive descent, precedence climbing)
//!     -> resolve (scope arena, symbol table, reference index)
//!     -> modecheck (canonical modes, constants, compatibility)
//!     -> codegen_c (C11 + POSIX threads)
//!
//! Every phase reports problems as diagnostics and keeps going; only
//! code generation refuses to run on a unit with errors.

pub mod span;
pub mod diagnostic;
pub mod error;

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod symbols;
pub mod suggest;
pub mod resolve;
pub mod modes;
pub mod modecheck;
pub mod c_runtime;
pub mod codegen_c;
pub mod compiler;

pub use compiler::{
    analyze, compile_c, compile_source, Analysis, AnalysisOptions, CompilationArtifact,
    CompileOptions,
};
pub use error::CoreError;
pub use resolve::{ExternalSymbol, Externals};
