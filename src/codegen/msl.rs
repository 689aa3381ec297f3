//! MSL emission for Metal.
//!
//! Metal has no module-scope uniforms, so the uniform block is a struct passed
//! by `constant` reference to the entry point and threaded through every helper
//! function. Stage outputs declare in reverse declaration order to line up with
//! Metal's slot-assignment reflection.

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

struct MslDialect<'a> {
    compilation: &'a ShaderCompilation,
    has_uniforms: bool,
}

impl Dialect for MslDialect<'_> {
    fn backend(&self) -> Backend {
        Backend::Msl
    }

    fn type_name(&self, ty: &ShaderType) -> Result<String> {
        Ok(match ty {
            ShaderType::Void => "void".to_string(),
            ShaderType::Bool => "bool".to_string(),
            ShaderType::Int32 => "int".to_string(),
            ShaderType::UInt32 => "uint".to_string(),
            ShaderType::Float32 => "float".to_string(),
            ShaderType::Vector { size } => format!("float{size}"),
            ShaderType::Matrix => "float4x4".to_string(),
            ShaderType::Color => "float4".to_string(),
            ShaderType::Struct(token) => self
                .compilation
                .compiled_struct(*token)
                .ok_or(crate::Error::UnresolvedToken(*token))?
                .name
                .clone(),
            ShaderType::Reference(_) => {
                return Err(crate::Error::UnmappedNode {
                    backend: Backend::Msl.name(),
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
            IntrinsicOp::SampleTexture => "sample",
        }
    }

    fn matrix_multiply(&self) -> MatrixMultiplyStyle {
        MatrixMultiplyStyle::MatTimesVec
    }

    fn sample(&self, texture: &str, sampler: &str, coords: &str) -> String {
        format!("{texture}.sample({sampler}, {coords})")
    }

    fn variable(&self, variable: &CompiledVariable, in_entry: bool) -> Result<String> {
        match variable.role {
            VariableRole::Uniform => Ok(format!("uniforms.{}", variable.name)),
            VariableRole::Input if in_entry => {
                if self.compilation.kind() == ShaderKind::Compute {
                    Ok(variable.name.clone())
                } else {
                    Ok(format!("input_.{}", variable.name))
                }
            }
            VariableRole::Output if in_entry => Ok(format!("output_.{}", variable.name)),
            VariableRole::Input | VariableRole::Output => Err(crate::Error::UnmappedNode {
                backend: Backend::Msl.name(),
                node: format!("stage variable '{}' outside the entry point", variable.name),
            }),
        }
    }

    fn supports_goto(&self) -> bool {
        true
    }

    fn extra_parameter(&self) -> Option<&'static str> {
        self.has_uniforms.then_some("constant Uniforms& uniforms")
    }

    fn extra_argument(&self) -> Option<&'static str> {
        self.has_uniforms.then_some("uniforms")
    }
}

fn input_attribute(
    variable: &VariableLayout,
    kind: ShaderKind,
    attribute_index: u32,
) -> Result<String> {
    let mut attributes = match (kind, variable.semantic) {
        (ShaderKind::Vertex, _) => format!("[[attribute({attribute_index})]]"),
        (_, Some(BuiltinSemantic::Position)) => "[[position]]".to_string(),
        (_, Some(BuiltinSemantic::ThreadIndex)) => "[[thread_position_in_grid]]".to_string(),
        (_, Some(BuiltinSemantic::VertexIndex)) => "[[vertex_id]]".to_string(),
        (_, Some(BuiltinSemantic::InstanceIndex)) => "[[instance_id]]".to_string(),
        (_, None) => format!("[[user(locn{})]]", variable.slot),
    };
    if variable.interpolation == InterpolationMode::Flat {
        attributes.push_str(" [[flat]]");
    }
    Ok(attributes)
}

fn output_attribute(variable: &VariableLayout, kind: ShaderKind) -> String {
    match (variable.semantic, kind) {
        (Some(BuiltinSemantic::Position), _) => "[[position]]".to_string(),
        (_, ShaderKind::Fragment) => format!("[[color({})]]", variable.slot),
        _ => format!("[[user(locn{})]]", variable.slot),
    }
}

pub(crate) fn emit(compilation: &ShaderCompilation, layout: &ShaderLayout) -> Result<String> {
    let dialect = MslDialect {
        compilation,
        has_uniforms: !layout.uniforms.is_empty(),
    };
    let kind = compilation.kind();
    let mut w = SourceWriter::new();

    w.line("#include <metal_stdlib>");
    w.line("using namespace metal;");
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

    if dialect.has_uniforms {
        w.open("struct Uniforms");
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

    let io_structs = kind != ShaderKind::Compute;
    if io_structs && !layout.inputs.is_empty() {
        w.open("struct StageInput");
        for (index, input) in layout.inputs.iter().enumerate() {
            w.line(&format!(
                "{} {} {};",
                dialect.type_name(&input.ty)?,
                input.name,
                input_attribute(input, kind, index as u32)?
            ));
        }
        w.close("};");
        w.blank();
    }
    if io_structs && !layout.outputs.is_empty() {
        w.open("struct StageOutput");
        // Reverse declaration order, required by Metal's slot reflection.
        for output in layout.outputs.iter().rev() {
            w.line(&format!(
                "{} {} {};",
                dialect.type_name(&output.ty)?,
                output.name,
                output_attribute(output, kind)
            ));
        }
        w.close("};");
        w.blank();
    }

    for method in &compilation.methods {
        emit::function(&mut w, &dialect, method)?;
        w.blank();
    }

    let entry = compilation.module().entry_point(kind)?;
    let has_output = io_structs && !layout.outputs.is_empty();

    let mut parameters = Vec::new();
    match kind {
        ShaderKind::Vertex | ShaderKind::Fragment => {
            if !layout.inputs.is_empty() {
                parameters.push("StageInput input_ [[stage_in]]".to_string());
            }
        }
        ShaderKind::Compute => {
            for input in &layout.inputs {
                if input.semantic.is_none() {
                    return Err(crate::Error::UnmappedNode {
                        backend: Backend::Msl.name(),
                        node: format!("non-builtin compute input '{}'", input.name),
                    });
                }
                parameters.push(format!(
                    "{} {} {}",
                    dialect.type_name(&input.ty)?,
                    input.name,
                    input_attribute(input, kind, 0)?
                ));
            }
        }
    }
    if dialect.has_uniforms {
        parameters.push("constant Uniforms& uniforms [[buffer(0)]]".to_string());
    }

    let qualifier = match kind {
        ShaderKind::Vertex => "vertex",
        ShaderKind::Fragment => "fragment",
        ShaderKind::Compute => "kernel",
    };
    let return_type = if has_output { "StageOutput" } else { "void" };
    w.open(&format!(
        "{qualifier} {return_type} {}({})",
        entry.name,
        parameters.join(", ")
    ));

    if has_output {
        w.line("StageOutput output_;");
    }
    let emitter = Emitter {
        dialect: &dialect,
        in_entry: true,
        entry_return: has_output.then_some("output_"),
    };
    emitter.body(&mut w, &compilation.root)?;
    if has_output && !emit::ends_with_return(&compilation.root) {
        w.line("return output_;");
    }
    w.close("}");

    Ok(w.finish())
}
