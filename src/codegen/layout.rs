//! Host-side layout metadata.
//!
//! The resource layer builds uniform buffers and vertex layouts from this data,
//! so packing must be deterministic: declaration order, each field placed at the
//! next offset satisfying its alignment. Reordering declarations changes the
//! emitted offsets and nothing else.

use std::collections::HashMap;

use crate::{
    compiler::ShaderCompilation,
    ir::{BuiltinSemantic, InterpolationMode, ShaderType, VariableRole},
    module::Token,
    Result,
};

/// One packed field of a struct or uniform aggregate.
#[derive(Debug, Clone)]
pub struct FieldLayout {
    /// Field name in declaration order.
    pub name: String,
    /// The field's shader type.
    pub ty: ShaderType,
    /// Byte offset from the start of the aggregate.
    pub offset: u32,
    /// Size in bytes.
    pub size: u32,
    /// Alignment in bytes.
    pub align: u32,
}

/// The packed layout of one plain-data struct.
#[derive(Debug, Clone)]
pub struct StructLayout {
    /// Token of the source type.
    pub token: Token,
    /// Emitted struct name.
    pub name: String,
    /// Total size in bytes, rounded up to the struct's alignment.
    pub size: u32,
    /// Alignment in bytes, the largest field alignment.
    pub align: u32,
    /// Fields in declaration order.
    pub fields: Vec<FieldLayout>,
}

/// One shader interface variable with its binding information.
#[derive(Debug, Clone)]
pub struct VariableLayout {
    /// Linkage name emitted into source.
    pub name: String,
    /// The variable's type.
    pub ty: ShaderType,
    /// Uniform, Input, or Output.
    pub role: VariableRole,
    /// Pipeline builtin this variable maps to, if any.
    pub semantic: Option<BuiltinSemantic>,
    /// Interpolation mode for varyings.
    pub interpolation: InterpolationMode,
    /// Binding slot: the sequential location for generic stage IO, zero for
    /// builtins and for uniforms (which bind as one block).
    pub slot: u32,
    /// Byte offset inside the uniform block; zero for stage IO.
    pub offset: u32,
    /// Size in bytes.
    pub size: u32,
    /// Alignment in bytes.
    pub align: u32,
}

/// Ordered layout metadata for one compiled shader.
#[derive(Debug, Clone)]
pub struct ShaderLayout {
    /// Plain-data structs, dependencies before dependents.
    pub structs: Vec<StructLayout>,
    /// Uniform variables packed into one block, declaration order.
    pub uniforms: Vec<VariableLayout>,
    /// Total uniform block size, rounded up to 16 bytes.
    pub uniform_size: u32,
    /// Stage inputs in declaration order.
    pub inputs: Vec<VariableLayout>,
    /// Stage outputs in declaration order.
    pub outputs: Vec<VariableLayout>,
}

fn align_up(offset: u32, align: u32) -> u32 {
    (offset + align - 1) / align * align
}

/// Size and alignment of a type, consulting already-packed struct layouts.
fn measure(ty: &ShaderType, structs: &HashMap<Token, (u32, u32)>) -> Result<(u32, u32)> {
    if let (Some(size), Some(align)) = (ty.scalar_size(), ty.scalar_align()) {
        return Ok((size, align));
    }
    if let ShaderType::Struct(token) = ty {
        if let Some(&packed) = structs.get(token) {
            return Ok(packed);
        }
        return Err(crate::Error::UnresolvedToken(*token));
    }
    Err(crate::Error::Error(format!(
        "Type {ty:?} has no GPU layout"
    )))
}

/// Computes the full layout for a finalized compilation.
///
/// # Errors
///
/// Fails when a variable or field carries a type with no GPU representation,
/// or names a struct that dependency resolution never registered.
pub fn compute(compilation: &ShaderCompilation) -> Result<ShaderLayout> {
    let mut packed: HashMap<Token, (u32, u32)> = HashMap::new();
    let mut structs = Vec::with_capacity(compilation.structs.len());

    // Registration order lists dependencies first, so nested struct sizes are
    // always available by the time a containing struct is packed.
    for def in &compilation.structs {
        let mut fields = Vec::with_capacity(def.fields.len());
        let mut cursor = 0u32;
        let mut max_align = 4u32;
        for (name, ty) in &def.fields {
            let (size, align) = measure(ty, &packed)?;
            let offset = align_up(cursor, align);
            cursor = offset + size;
            max_align = max_align.max(align);
            fields.push(FieldLayout {
                name: name.clone(),
                ty: ty.clone(),
                offset,
                size,
                align,
            });
        }
        let size = align_up(cursor, max_align);
        packed.insert(def.token, (size, max_align));
        structs.push(StructLayout {
            token: def.token,
            name: def.name.clone(),
            size,
            align: max_align,
            fields,
        });
    }

    let mut uniforms = Vec::new();
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    let mut uniform_cursor = 0u32;
    let mut input_slot = 0u32;
    let mut output_slot = 0u32;

    for variable in &compilation.variables {
        let (size, align) = measure(&variable.ty, &packed)?;
        let mut layout = VariableLayout {
            name: variable.name.clone(),
            ty: variable.ty.clone(),
            role: variable.role,
            semantic: variable.semantic,
            interpolation: variable.interpolation,
            slot: 0,
            offset: 0,
            size,
            align,
        };
        match variable.role {
            VariableRole::Uniform => {
                layout.offset = align_up(uniform_cursor, align);
                uniform_cursor = layout.offset + size;
                uniforms.push(layout);
            }
            VariableRole::Input => {
                if layout.semantic.is_none() {
                    layout.slot = input_slot;
                    input_slot += 1;
                }
                inputs.push(layout);
            }
            VariableRole::Output => {
                if layout.semantic.is_none() {
                    layout.slot = output_slot;
                    output_slot += 1;
                }
                outputs.push(layout);
            }
        }
    }

    Ok(ShaderLayout {
        structs,
        uniforms,
        uniform_size: align_up(uniform_cursor, 16),
        inputs,
        outputs,
    })
}
