//! The intermediate representation shared by the structurer, the pass pipeline,
//! and the backends.
//!
//! # Key Types
//! - [`Expression`] / [`ExprRef`] - The reference-counted expression tree
//! - [`ExpressionRewriter`] - The pass-through rewriter every pass implements
//! - [`ShaderType`] / [`VariableRole`] - The restricted shader type and role model
//! - [`CompiledVariable`] / [`CompiledMethod`] / [`CompiledStruct`] - Resolved entities

mod entities;
mod expr;
mod rewriter;
mod types;

pub use entities::{CompiledMethod, CompiledStruct, CompiledVariable};
pub use expr::{BinaryOp, Constant, ExprRef, Expression, FieldRef, UnaryOp};
pub use rewriter::ExpressionRewriter;
pub use types::{
    BuiltinSemantic, InterpolationMode, IntrinsicOp, ShaderKind, ShaderType, VariableRole,
};
