// Copyright 2025 Johann Kempter
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
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![warn(missing_docs)]

//! # cilshader
//!
//! A cross-compiler that lowers a value-type shader method expressed as CIL
//! bytecode (or as a directly captured expression tree) into source text for
//! three native shading languages - HLSL, GLSL, and MSL - plus the host-side
//! layout metadata needed to bind buffers and vertex data to it.
//!
//! ## Features
//!
//! - **Bytecode disassembly** - CIL decoding with static opcode tables, prefix
//!   folding, and branch classification
//! - **Control-flow recovery** - basic blocks, dominance, and structured
//!   loop/conditional raising, with a label/goto fallback for shapes that
//!   cannot be raised
//! - **A fixed rewrite pipeline** - seven passes that close the dependency
//!   graph, replace field accesses and calls, eliminate object construction,
//!   and validate the result
//! - **Three independent backends** - per-target syntax tables and semantic
//!   binding, failing loudly on anything unmappable
//! - **An at-most-once compile cache** - one compile per (module, stage,
//!   backend) key under concurrent first use
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cilshader::prelude::*;
//! # fn module() -> std::sync::Arc<cilshader::ShaderModule> { unimplemented!() }
//!
//! let shader = cilshader::compile(&module(), ShaderKind::Fragment, Backend::Hlsl)?;
//! println!("{}", shader.source);
//! # Ok::<(), cilshader::Error>(())
//! ```
//!
//! ## Architecture
//!
//! Compilation flows bottom-up through the modules: [`disassembler`] decodes
//! bytecode, [`graph`] rebuilds control flow with dominance, [`compiler`]
//! raises structured IR and runs the pass pipeline over a
//! [`compiler::ShaderCompilation`], and [`codegen`] prints the finalized trees
//! per backend. [`module`] is the host-facing boundary: a validated snapshot
//! of the shader class and everything it references.

#[macro_use]
pub(crate) mod error;

pub mod prelude;

/// CIL bytecode decoding: opcode tables, operand parsing, prefix folding.
pub mod disassembler;

/// Basic blocks, branch edges, and dominance over a disassembled method.
pub mod graph;

/// The shared expression IR, shader types, and compiled entities.
pub mod ir;

/// The host object-model boundary: validated module snapshots.
pub mod module;

/// Control-flow structuring and the fixed rewrite pass pipeline.
pub mod compiler;

/// Per-backend source emission and layout metadata.
pub mod codegen;

mod cache;

/// The result type used throughout cilshader.
pub type Result<T> = std::result::Result<T, Error>;

pub use cache::ShaderCache;
pub use codegen::{Backend, GeneratedShader, ShaderLayout};
pub use error::Error;
pub use ir::ShaderKind;
pub use module::{ShaderModule, ShaderModuleBuilder, Token};

use std::sync::Arc;

/// Compiles one shader module for one pipeline stage and backend.
///
/// This is the whole uncached pipeline: the entry method is structured, the
/// seven rewrite passes run in their fixed order, and the requested backend
/// emits source plus layout metadata. Use [`ShaderCache`] when compiling from
/// render code; use this directly for one-off or offline compilation.
///
/// # Errors
///
/// Any structural, unsupported-construct, or backend-emission error from the
/// stages above. Nothing is partially produced on failure.
pub fn compile(
    module: &Arc<ShaderModule>,
    kind: ShaderKind,
    backend: Backend,
) -> Result<GeneratedShader> {
    let mut compilation = compiler::ShaderCompilation::new(Arc::clone(module), kind, backend)?;
    compiler::PassPipeline::standard().run(&mut compilation)?;
    codegen::generate(&compilation)
}
