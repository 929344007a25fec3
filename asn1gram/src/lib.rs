//! Compiles ASN.1 BER type definitions into a target-model message grammar.
//!
//! The entry point is [`compiler::convert_spec`]: given an [`ast::Spec`] (the
//! shape an ASN.1 textual parser would hand this crate) and a
//! [`asn1gram_core::CompilerConfig`], it returns the qualified-identifier →
//! target-model [`target::Type`] map described in the module docs below.

pub mod ast;
pub mod bertype;
pub mod compiler;
pub mod grammar;
pub mod ident;
pub mod prelude;
pub mod tag;
pub mod target;

pub use asn1gram_core::{CompileError, CompileResult, CompilerConfig, GrammarError};
pub use compiler::{convert_spec, Compiler};
