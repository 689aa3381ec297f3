//! Shader-side type and role model.
//!
//! These enums describe the restricted type system the compiler accepts: scalars,
//! small vectors, a 4x4 matrix, a color type, and plain-data aggregates. Reference
//! types never appear here; they are rejected during module registration.

use strum::{Display, EnumIter};

use crate::module::Token;

/// A type as seen by the shader compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShaderType {
    /// No value (method return only).
    Void,
    /// Boolean, used by comparison results and branch conditions.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 32-bit unsigned integer.
    UInt32,
    /// 32-bit float, the dominant scalar type in shader code.
    Float32,
    /// A float vector of 2, 3, or 4 components.
    Vector {
        /// Component count, 2 through 4.
        size: u8,
    },
    /// A 4x4 float matrix.
    Matrix,
    /// An RGBA float color, laid out like a four-component vector.
    Color,
    /// A user plain-data aggregate, identified by its type token.
    Struct(Token),
    /// A reference or byref type as seen in source metadata.
    ///
    /// Never compilable; module registration rejects any signature, field, or
    /// local slot that carries one.
    Reference(Box<ShaderType>),
}

impl ShaderType {
    /// Whether this type is a scalar (bool, int, uint, or float).
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ShaderType::Bool | ShaderType::Int32 | ShaderType::UInt32 | ShaderType::Float32
        )
    }

    /// Size in bytes under declaration-order packing rules.
    ///
    /// Scalars are 4 bytes, vectors 4 per component, colors 16, matrices 64.
    /// Struct sizes depend on their fields and are computed by the layout pass.
    #[must_use]
    pub fn scalar_size(&self) -> Option<u32> {
        match self {
            ShaderType::Bool | ShaderType::Int32 | ShaderType::UInt32 | ShaderType::Float32 => {
                Some(4)
            }
            ShaderType::Vector { size } => Some(u32::from(*size) * 4),
            ShaderType::Color => Some(16),
            ShaderType::Matrix => Some(64),
            ShaderType::Void | ShaderType::Struct(_) | ShaderType::Reference(_) => None,
        }
    }

    /// Alignment in bytes under declaration-order packing rules.
    ///
    /// vec2 aligns to 8; vec3 and vec4 to 16; everything else to its size
    /// (scalars 4, colors 16, matrices 16 per column).
    #[must_use]
    pub fn scalar_align(&self) -> Option<u32> {
        match self {
            ShaderType::Bool | ShaderType::Int32 | ShaderType::UInt32 | ShaderType::Float32 => {
                Some(4)
            }
            ShaderType::Vector { size: 2 } => Some(8),
            ShaderType::Vector { .. } | ShaderType::Color | ShaderType::Matrix => Some(16),
            ShaderType::Void | ShaderType::Struct(_) | ShaderType::Reference(_) => None,
        }
    }

    /// Whether this type is or contains a reference type.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, ShaderType::Reference(_))
    }
}

/// The role a module-level variable plays in the shader interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum VariableRole {
    /// Host-provided constant, grouped into the uniform/constant buffer.
    Uniform,
    /// Per-invocation input (vertex attribute or interpolated value).
    Input,
    /// Per-invocation output (varying or render target value).
    Output,
}

/// A builtin value provided by the GPU pipeline rather than by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum BuiltinSemantic {
    /// Clip-space position output of a vertex shader.
    Position,
    /// Global thread index of a compute invocation.
    ThreadIndex,
    /// Index of the current vertex.
    VertexIndex,
    /// Index of the current instance.
    InstanceIndex,
}

/// How a varying is interpolated between the vertex and fragment stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter)]
pub enum InterpolationMode {
    /// Perspective-correct interpolation, the hardware default.
    #[default]
    Perspective,
    /// Flat (no) interpolation; the provoking vertex's value is used.
    Flat,
    /// Linear interpolation without perspective correction.
    NoPerspective,
}

/// The pipeline stage a shader entry point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ShaderKind {
    /// Vertex stage.
    Vertex,
    /// Fragment (pixel) stage.
    Fragment,
    /// Compute stage.
    Compute,
}

/// A GPU intrinsic operation that source-level calls map onto.
///
/// Each backend renders these with its own function names; the set itself is
/// backend-neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum IntrinsicOp {
    /// Dot product of two vectors.
    Dot,
    /// Cross product of two 3-vectors.
    Cross,
    /// Vector normalization.
    Normalize,
    /// Vector length.
    Length,
    /// Square root.
    Sqrt,
    /// Absolute value.
    Abs,
    /// Component-wise minimum.
    Min,
    /// Component-wise maximum.
    Max,
    /// Clamp to a range.
    Clamp,
    /// Linear interpolation.
    Lerp,
    /// Raise to a power.
    Pow,
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Tangent.
    Tan,
    /// Floor.
    Floor,
    /// Ceiling.
    Ceil,
    /// Fractional part.
    Fract,
    /// Matrix-vector or matrix-matrix multiply.
    MatrixMultiply,
    /// Texture sample (texture, sampler, coordinates).
    SampleTexture,
}

impl IntrinsicOp {
    /// Number of arguments the intrinsic consumes.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            IntrinsicOp::Normalize
            | IntrinsicOp::Length
            | IntrinsicOp::Sqrt
            | IntrinsicOp::Abs
            | IntrinsicOp::Sin
            | IntrinsicOp::Cos
            | IntrinsicOp::Tan
            | IntrinsicOp::Floor
            | IntrinsicOp::Ceil
            | IntrinsicOp::Fract => 1,
            IntrinsicOp::Dot
            | IntrinsicOp::Cross
            | IntrinsicOp::Min
            | IntrinsicOp::Max
            | IntrinsicOp::Pow
            | IntrinsicOp::MatrixMultiply => 2,
            IntrinsicOp::Clamp | IntrinsicOp::Lerp | IntrinsicOp::SampleTexture => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_sizes_and_alignment() {
        assert_eq!(ShaderType::Vector { size: 2 }.scalar_size(), Some(8));
        assert_eq!(ShaderType::Vector { size: 2 }.scalar_align(), Some(8));
        assert_eq!(ShaderType::Vector { size: 3 }.scalar_size(), Some(12));
        assert_eq!(ShaderType::Vector { size: 3 }.scalar_align(), Some(16));
        assert_eq!(ShaderType::Vector { size: 4 }.scalar_size(), Some(16));
        assert_eq!(ShaderType::Color.scalar_size(), Some(16));
        assert_eq!(ShaderType::Matrix.scalar_size(), Some(64));
    }

    #[test]
    fn struct_sizes_are_deferred() {
        assert_eq!(ShaderType::Struct(crate::module::Token::new(0x0200_0001)).scalar_size(), None);
    }
}
