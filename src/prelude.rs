//! # cilshader Prelude
//!
//! Convenient re-exports of the most commonly used types. Import this module
//! to get quick access to everything a host needs to register a shader module
//! and compile it.

/// The main error type for all cilshader operations
pub use crate::Error;

/// The result type used throughout cilshader
pub use crate::Result;

/// One-shot compilation entry point
pub use crate::compile;

/// The at-most-once compile cache
pub use crate::ShaderCache;

/// Target language selection and emission results
pub use crate::codegen::{Backend, FieldLayout, GeneratedShader, ShaderLayout, StructLayout, VariableLayout};

/// The host-facing module registry and its builder
pub use crate::module::{
    FieldDef, MethodBody, MethodDef, MethodSignature, ParamDef, ShaderModule, ShaderModuleBuilder,
    StructDef, Token,
};

/// Shader-side types, roles, and semantics
pub use crate::ir::{
    BuiltinSemantic, Constant, ExprRef, Expression, FieldRef, InterpolationMode, IntrinsicOp,
    ShaderKind, ShaderType, VariableRole,
};

/// Per-compile state and the pass pipeline
pub use crate::compiler::{CompilerPass, PassPipeline, ShaderCompilation};
