//! Backend code generators.
//!
//! Each backend walks the finalized [`ShaderCompilation`] and prints, in order:
//! plain-data struct declarations, the uniform aggregate, the per-stage input
//! and output aggregates, every helper method as an ordinary function, and the
//! wrapped entry point. The shared C-like statement and expression emitter
//! lives in [`emit`]; the per-target syntax (type names, intrinsic names,
//! semantic bindings, aggregate shapes) lives in one file per backend.
//!
//! A generator fails with [`crate::Error::UnmappedNode`] on any node it cannot
//! print; nothing is ever silently dropped. That error is fatal to the
//! requesting backend only - the same compilation can still be emitted for the
//! other targets.
//!
//! # Key Types
//!
//! - [`Backend`] - the three supported target languages
//! - [`GeneratedShader`] - source text plus host-side layout metadata
//! - [`ShaderLayout`] - declaration-order packing of uniforms, stage IO, and structs

mod emit;
mod glsl;
mod hlsl;
mod layout;
mod msl;

pub use layout::{FieldLayout, ShaderLayout, StructLayout, VariableLayout};

use strum::{Display, EnumIter};

use crate::{compiler::ShaderCompilation, ir::ShaderKind, Result};

/// A target shading language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Backend {
    /// HLSL for Direct3D.
    Hlsl,
    /// GLSL for OpenGL and Vulkan.
    Glsl,
    /// MSL for Metal.
    Msl,
}

impl Backend {
    /// Conventional uppercase name, used in diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Backend::Hlsl => "HLSL",
            Backend::Glsl => "GLSL",
            Backend::Msl => "MSL",
        }
    }
}

/// The immutable result of one backend emission.
#[derive(Debug, Clone)]
pub struct GeneratedShader {
    /// The backend that produced this source.
    pub backend: Backend,
    /// The pipeline stage this source implements.
    pub kind: ShaderKind,
    /// The complete shader source text.
    pub source: String,
    /// Layout metadata for host-side buffer construction and binding.
    pub layout: ShaderLayout,
}

/// Emits source and layout metadata for the compilation's requested backend.
///
/// # Errors
///
/// Returns [`crate::Error::UnmappedNode`] when the finalized tree contains a
/// node this backend cannot print, including inline source authored for a
/// different backend, and layout errors for types with no GPU representation.
pub fn generate(compilation: &ShaderCompilation) -> Result<GeneratedShader> {
    let layout = layout::compute(compilation)?;
    let source = match compilation.backend() {
        Backend::Hlsl => hlsl::emit(compilation, &layout)?,
        Backend::Glsl => glsl::emit(compilation, &layout)?,
        Backend::Msl => msl::emit(compilation, &layout)?,
    };

    Ok(GeneratedShader {
        backend: compilation.backend(),
        kind: compilation.kind(),
        source,
        layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn backend_names_are_distinct() {
        let names: std::collections::HashSet<_> = Backend::iter().map(Backend::name).collect();
        assert_eq!(names.len(), 3);
    }
}
