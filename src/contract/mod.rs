//! Contract module
//!
//! Provides contract compilation and interface descriptions.
//!
//! # Overview
//!
//! This module implements:
//! - `CompilationService` over a pluggable `ContractCompiler` (`solc` by default)
//! - Interface descriptions with a per-type ABI encode/decode table

pub mod abi;
pub mod compiler;

pub use abi::{
    AbiEntry, AbiError, AbiType, ConstructorDescriptor, EventDescriptor, Interface,
    MethodDescriptor, TypedParam,
};
pub use compiler::{
    CompilationResult, CompilationService, CompiledContract, CompilerError, CompilerOutput,
    ContractCompiler, SolcCompiler,
};
