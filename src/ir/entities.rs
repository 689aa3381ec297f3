//! Resolved compilation entities.
//!
//! These are the artifacts the pass pipeline produces out of raw tokens and field
//! accesses: interface variables with final linkage names, helper methods with
//! processed bodies, and plain-data structs scheduled for emission.

use crate::ir::{
    expr::ExprRef,
    types::{BuiltinSemantic, InterpolationMode, ShaderType, VariableRole},
};
use crate::module::Token;

/// A shader interface variable with its final linkage name.
#[derive(Debug, Clone)]
pub struct CompiledVariable {
    /// The name emitted into generated source. Defaults to the field name,
    /// overridden by an explicit linkage name on the field.
    pub name: String,
    /// The variable's type.
    pub ty: ShaderType,
    /// Uniform, Input, or Output.
    pub role: VariableRole,
    /// Pipeline builtin this variable maps to, if any.
    pub semantic: Option<BuiltinSemantic>,
    /// Interpolation mode, meaningful for Input/Output varyings only.
    pub interpolation: InterpolationMode,
}

/// A non-entry method whose body compiles into a helper function.
#[derive(Debug, Clone)]
pub struct CompiledMethod {
    /// Token of the source method.
    pub token: Token,
    /// Emitted function name.
    pub name: String,
    /// Return type.
    pub return_type: ShaderType,
    /// Parameters in declaration order as (name, type) pairs. An instance
    /// receiver appears as a leading `self` parameter of the declaring struct
    /// type when the source method was not static.
    pub parameters: Vec<(String, ShaderType)>,
    /// The fully processed body.
    pub body: ExprRef,
}

/// A plain-data aggregate scheduled for emission, with fields in declaration order.
#[derive(Debug, Clone)]
pub struct CompiledStruct {
    /// Token of the source type.
    pub token: Token,
    /// Emitted struct name.
    pub name: String,
    /// Fields in declaration order as (name, type) pairs. Declaration order is
    /// layout order; it is never reordered.
    pub fields: Vec<(String, ShaderType)>,
}
