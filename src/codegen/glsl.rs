//! GLSL emission for OpenGL and Vulkan.
//!
//! GLSL is the one target whose matrix memory layout is transposed relative to
//! the IR's canonical convention, so matrix multiplies emit with swapped
//! operands. Stage IO is declared as module-scope `in`/`out` globals, which
//! also makes helper functions free to read them.

use crate::{
    codegen::{
        emit::{self, Dialect, Emitter, MatrixMultiplyStyle, SourceWriter},
        layout::{ShaderLayout, VariableLayout},
        Backend,
    },
    compiler::ShaderCompilation,
    ir::{
        BuiltinSemantic, CompiledVariable, InterpolationMode, IntrinsicOp, ShaderKind, ShaderType,
        VariableRole,
    },
    Result,
};

struct GlslDialect<'a> {
    compilation: &'a ShaderCompilation,
}

/// The `gl_*` builtin standing in for a variable, if one exists for this
/// stage. Builtins are never declared; their references print directly.
fn builtin_name(
    role: VariableRole,
    semantic: Option<BuiltinSemantic>,
    kind: ShaderKind,
) -> Option<&'static str> {
    match (role, semantic?) {
        (VariableRole::Input, BuiltinSemantic::Position) if kind == ShaderKind::Fragment => {
            Some("gl_FragCoord")
        }
        (VariableRole::Input, BuiltinSemantic::VertexIndex) => Some("gl_VertexIndex"),
        (VariableRole::Input, BuiltinSemantic::InstanceIndex) => Some("gl_InstanceIndex"),
        (VariableRole::Input, BuiltinSemantic::ThreadIndex) => Some("gl_GlobalInvocationID.x"),
        (VariableRole::Output, BuiltinSemantic::Position) => Some("gl_Position"),
        // A vertex-stage position input is an ordinary attribute.
        _ => None,
    }
}

impl Dialect for GlslDialect<'_> {
    fn backend(&self) -> Backend {
        Backend::Glsl
    }

    fn type_name(&self, ty: &ShaderType) -> Result<String> {
        Ok(match ty {
            ShaderType::Void => "void".to_string(),
            ShaderType::Bool => "bool".to_string(),
            ShaderType::Int32 => "int".to_string(),
            ShaderType::UInt32 => "uint".to_string(),
            ShaderType::Float32 => "float".to_string(),
            ShaderType::Vector { size } => format!("vec{size}"),
            ShaderType::Matrix => "mat4".to_string(),
            ShaderType::Color => "vec4".to_string(),
            ShaderType::Struct(token) => self
                .compilation
                .compiled_struct(*token)
                .ok_or(crate::Error::UnresolvedToken(*token))?
                .name
                .clone(),
            ShaderType::Reference(_) => {
                return Err(crate::Error::UnmappedNode {
                    backend: Backend::Glsl.name(),
                    node: "ReferenceType".to_string(),
                })
            }
        })
    }

    fn intrinsic_name(&self, op: IntrinsicOp) -> &'static str {
        match op {
            IntrinsicOp::Dot => "dot",
            IntrinsicOp::Cross => "cross",
            IntrinsicOp::Normalize => "normalize",
            IntrinsicOp::Length => "length",
            IntrinsicOp::Sqrt => "sqrt",
            IntrinsicOp::Abs => "abs",
            IntrinsicOp::Min => "min",
            IntrinsicOp::Max => "max",
            IntrinsicOp::Clamp => "clamp",
            IntrinsicOp::Lerp => "mix",
            IntrinsicOp::Pow => "pow",
            IntrinsicOp::Sin => "sin",
            IntrinsicOp::Cos => "cos",
            IntrinsicOp::Tan => "tan",
            IntrinsicOp::Floor => "floor",
            IntrinsicOp::Ceil => "ceil",
            IntrinsicOp::Fract => "fract",
            // Both rendered specially by the shared emitter.
            IntrinsicOp::MatrixMultiply => "*",
            IntrinsicOp::SampleTexture => "texture",
        }
    }

    fn matrix_multiply(&self) -> MatrixMultiplyStyle {
        MatrixMultiplyStyle::VecTimesMat
    }

    fn sample(&self, texture: &str, _sampler: &str, coords: &str) -> String {
        // GLSL combined samplers carry their own sampling state.
        format!("texture({texture}, {coords})")
    }

    fn variable(&self, variable: &CompiledVariable, _in_entry: bool) -> Result<String> {
        match builtin_name(variable.role, variable.semantic, self.compilation.kind()) {
            Some(name) => Ok(name.to_string()),
            None => Ok(variable.name.clone()),
        }
    }
}

fn interpolation_qualifier(mode: InterpolationMode) -> &'static str {
    match mode {
        InterpolationMode::Perspective => "",
        InterpolationMode::Flat => "flat ",
        InterpolationMode::NoPerspective => "noperspective ",
    }
}

fn declare_io(
    w: &mut SourceWriter,
    dialect: &GlslDialect<'_>,
    variables: &[VariableLayout],
    direction: &str,
    kind: ShaderKind,
) -> Result<()> {
    // Locations are assigned in declaration order over the declared (that is,
    // non-builtin) variables only, independent of the generic slot numbering.
    let mut location = 0u32;
    for variable in variables {
        if builtin_name(variable.role, variable.semantic, kind).is_some() {
            continue;
        }
        w.line(&format!(
            "layout(location = {location}) {}{direction} {} {};",
            interpolation_qualifier(variable.interpolation),
            dialect.type_name(&variable.ty)?,
            variable.name
        ));
        location += 1;
    }
    Ok(())
}

pub(crate) fn emit(compilation: &ShaderCompilation, layout: &ShaderLayout) -> Result<String> {
    let dialect = GlslDialect { compilation };
    let kind = compilation.kind();
    let mut w = SourceWriter::new();

    w.line("#version 450");
    w.blank();

    for def in &layout.structs {
        w.open(&format!("struct {}", def.name));
        for field in &def.fields {
            w.line(&format!(
                "{} {};",
                dialect.type_name(&field.ty)?,
                field.name
            ));
        }
        w.close("};");
        w.blank();
    }

    if !layout.uniforms.is_empty() {
        w.open("layout(std140, binding = 0) uniform Uniforms");
        for uniform in &layout.uniforms {
            w.line(&format!(
                "{} {};",
                dialect.type_name(&uniform.ty)?,
                uniform.name
            ));
        }
        w.close("};");
        w.blank();
    }

    if kind == ShaderKind::Compute {
        w.line("layout(local_size_x = 64, local_size_y = 1, local_size_z = 1) in;");
        w.blank();
    } else {
        declare_io(&mut w, &dialect, &layout.inputs, "in", kind)?;
        declare_io(&mut w, &dialect, &layout.outputs, "out", kind)?;
        if !layout.inputs.is_empty() || !layout.outputs.is_empty() {
            w.blank();
        }
    }

    for method in &compilation.methods {
        emit::function(&mut w, &dialect, method)?;
        w.blank();
    }

    w.open("void main()");
    let emitter = Emitter {
        dialect: &dialect,
        in_entry: true,
        entry_return: None,
    };
    emitter.body(&mut w, &compilation.root)?;
    w.close("}");

    Ok(w.finish())
}
