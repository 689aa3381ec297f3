//! Structured control-flow reconstruction and the rewrite pipeline.
//!
//! Compilation starts by [`structure_method`] raising the entry method's
//! bytecode into an expression tree, then a [`PassPipeline`] of seven
//! [`CompilerPass`] steps rewrites the [`ShaderCompilation`] until every node
//! is something the backends can print: dependencies are closed over, shader
//! fields become interface variables, token calls become helper or intrinsic
//! calls, constructors are lowered to field assignments, and the result is
//! validated.
//!
//! # Key Types
//!
//! - [`ShaderCompilation`] - per-compile state: entry tree plus the dependency
//!   closure of helpers, structs, and variables
//! - [`CompilerPass`] - one rewrite step over every tree in the compilation
//! - [`PassPipeline`] - the fixed seven-pass order, each pass run exactly once

mod context;
mod pass;
pub mod passes;
mod pipeline;
mod structurer;

pub use context::ShaderCompilation;
pub use pass::CompilerPass;
pub use pipeline::PassPipeline;
pub use structurer::structure_method;
