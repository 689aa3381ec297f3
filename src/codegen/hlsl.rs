//! HLSL emission for Direct3D.

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

struct HlslDialect<'a> {
    compilation: &'a ShaderCompilation,
}

impl Dialect for HlslDialect<'_> {
    fn backend(&self) -> Backend {
        Backend::Hlsl
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
                    backend: Backend::Hlsl.name(),
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
            IntrinsicOp::Lerp => "lerp",
            IntrinsicOp::Pow => "pow",
            IntrinsicOp::Sin => "sin",
            IntrinsicOp::Cos => "cos",
            IntrinsicOp::Tan => "tan",
            IntrinsicOp::Floor => "floor",
            IntrinsicOp::Ceil => "ceil",
            IntrinsicOp::Fract => "frac",
            // Both rendered specially by the shared emitter.
            IntrinsicOp::MatrixMultiply => "mul",
            IntrinsicOp::SampleTexture => "Sample",
        }
    }

    fn matrix_multiply(&self) -> MatrixMultiplyStyle {
        MatrixMultiplyStyle::MulCall
    }

    fn sample(&self, texture: &str, sampler: &str, coords: &str) -> String {
        format!("{texture}.Sample({sampler}, {coords})")
    }

    fn variable(&self, variable: &CompiledVariable, in_entry: bool) -> Result<String> {
        match variable.role {
            // cbuffer members are globals, reachable from any function.
            VariableRole::Uniform => Ok(variable.name.clone()),
            VariableRole::Input if in_entry => {
                if self.compilation.kind() == ShaderKind::Compute {
                    Ok(variable.name.clone())
                } else {
                    Ok(format!("input_.{}", variable.name))
                }
            }
            VariableRole::Output if in_entry => Ok(format!("output_.{}", variable.name)),
            VariableRole::Input | VariableRole::Output => Err(crate::Error::UnmappedNode {
                backend: Backend::Hlsl.name(),
                node: format!("stage variable '{}' outside the entry point", variable.name),
            }),
        }
    }
}

fn input_semantic(variable: &VariableLayout, kind: ShaderKind) -> String {
    match variable.semantic {
        Some(BuiltinSemantic::Position) if kind == ShaderKind::Fragment => {
            "SV_Position".to_string()
        }
        Some(BuiltinSemantic::Position) => "POSITION".to_string(),
        Some(BuiltinSemantic::ThreadIndex) => "SV_DispatchThreadID".to_string(),
        Some(BuiltinSemantic::VertexIndex) => "SV_VertexID".to_string(),
        Some(BuiltinSemantic::InstanceIndex) => "SV_InstanceID".to_string(),
        None => format!("TEXCOORD{}", variable.slot),
    }
}

fn output_semantic(variable: &VariableLayout, kind: ShaderKind) -> String {
    match variable.semantic {
        Some(BuiltinSemantic::Position) => "SV_Position".to_string(),
        Some(other) => input_semantic(
            &VariableLayout {
                semantic: Some(other),
                ..variable.clone()
            },
            kind,
        ),
        None if kind == ShaderKind::Fragment => format!("SV_Target{}", variable.slot),
        None => format!("TEXCOORD{}", variable.slot),
    }
}

fn interpolation_prefix(mode: InterpolationMode) -> &'static str {
    match mode {
        InterpolationMode::Perspective => "",
        InterpolationMode::Flat => "nointerpolation ",
        InterpolationMode::NoPerspective => "noperspective ",
    }
}

pub(crate) fn emit(compilation: &ShaderCompilation, layout: &ShaderLayout) -> Result<String> {
    let dialect = HlslDialect { compilation };
    let kind = compilation.kind();
    let mut w = SourceWriter::new();

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
        w.open("cbuffer Uniforms : register(b0)");
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
        for input in &layout.inputs {
            w.line(&format!(
                "{}{} {} : {};",
                interpolation_prefix(input.interpolation),
                dialect.type_name(&input.ty)?,
                input.name,
                input_semantic(input, kind)
            ));
        }
        w.close("};");
        w.blank();
    }
    if io_structs && !layout.outputs.is_empty() {
        w.open("struct StageOutput");
        for output in &layout.outputs {
            w.line(&format!(
                "{}{} {} : {};",
                interpolation_prefix(output.interpolation),
                dialect.type_name(&output.ty)?,
                output.name,
                output_semantic(output, kind)
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

    match kind {
        ShaderKind::Vertex | ShaderKind::Fragment => {
            let return_type = if has_output { "StageOutput" } else { "void" };
            let parameter = if layout.inputs.is_empty() {
                String::new()
            } else {
                "StageInput input_".to_string()
            };
            w.open(&format!("{return_type} {}({parameter})", entry.name));
        }
        ShaderKind::Compute => {
            // Compute inputs are all pipeline builtins, declared as parameters.
            let parameters = layout
                .inputs
                .iter()
                .map(|input| {
                    Ok(format!(
                        "{} {} : {}",
                        dialect.type_name(&input.ty)?,
                        input.name,
                        input_semantic(input, kind)
                    ))
                })
                .collect::<Result<Vec<_>>>()?
                .join(", ");
            w.line("[numthreads(64, 1, 1)]");
            w.open(&format!("void {}({parameters})", entry.name));
        }
    }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codegen,
        ir::Expression,
        module::{FieldDef, MethodBody, MethodSignature, ShaderModule, Token},
    };
    use std::sync::Arc;

    const SHADER: Token = Token(0x0200_0001);
    const MAIN: Token = Token(0x0600_0001);

    fn fragment_compilation() -> ShaderCompilation {
        let module = ShaderModule::builder("test", SHADER)
            .field(FieldDef {
                token: Token(0x0400_0001),
                name: "Tint".to_string(),
                ty: ShaderType::Color,
                role: Some(VariableRole::Uniform),
                semantic: None,
                linkage_name: None,
                interpolation: InterpolationMode::default(),
            })
            .field(FieldDef {
                token: Token(0x0400_0002),
                name: "FragColor".to_string(),
                ty: ShaderType::Color,
                role: Some(VariableRole::Output),
                semantic: None,
                linkage_name: None,
                interpolation: InterpolationMode::default(),
            })
            .method(
                MAIN,
                "Main",
                SHADER,
                MethodSignature {
                    is_static: true,
                    return_type: ShaderType::Void,
                    parameters: vec![],
                },
                vec![],
                MethodBody::Tree(Expression::Block(vec![]).into_ref()),
            )
            .entry_point(ShaderKind::Fragment, MAIN)
            .finish()
            .unwrap();

        let mut compilation =
            ShaderCompilation::new(module, ShaderKind::Fragment, Backend::Hlsl).unwrap();
        let module = Arc::clone(compilation.module());
        let tint = compilation.variable_for(module.field("Tint").unwrap());
        let out = compilation.variable_for(module.field("FragColor").unwrap());
        compilation.root = Expression::Block(vec![
            Expression::Assign {
                target: Expression::CompiledVariable(out).into_ref(),
                value: Expression::CompiledVariable(tint).into_ref(),
            }
            .into_ref(),
            Expression::Return(None).into_ref(),
        ])
        .into_ref();
        compilation
    }

    #[test]
    fn uniform_lands_in_cbuffer_and_entry_assigns_output() {
        let compilation = fragment_compilation();
        let generated = codegen::generate(&compilation).unwrap();

        assert!(generated.source.contains("cbuffer Uniforms : register(b0)"));
        assert!(generated.source.contains("float4 Tint;"));
        assert!(generated.source.contains("float4 FragColor : SV_Target0;"));
        assert!(generated.source.contains("output_.FragColor = Tint;"));
        assert!(generated.source.contains("return output_;"));
        assert_eq!(generated.layout.uniforms.len(), 1);
        assert_eq!(generated.layout.uniforms[0].name, "Tint");
    }

    #[test]
    fn foreign_inline_source_fails_the_compile() {
        let mut compilation = fragment_compilation();
        compilation.root = Expression::Block(vec![Expression::InlineSource {
            backend: Backend::Glsl,
            text: "discard;".to_string(),
        }
        .into_ref()])
        .into_ref();

        assert!(matches!(
            codegen::generate(&compilation),
            Err(crate::Error::UnmappedNode { backend: "HLSL", .. })
        ));
    }

    #[test]
    fn goto_is_not_emittable() {
        let mut compilation = fragment_compilation();
        compilation.root = Expression::Block(vec![
            Expression::Label("IL_0000".to_string()).into_ref(),
            Expression::Goto("IL_0000".to_string()).into_ref(),
        ])
        .into_ref();

        assert!(matches!(
            codegen::generate(&compilation),
            Err(crate::Error::UnmappedNode { .. })
        ));
    }
}
