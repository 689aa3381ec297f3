//! End-to-end compilation scenarios across all three backends.

use std::sync::Arc;

use cilshader::prelude::*;

const SHADER: Token = Token(0x0200_0001);
const MAIN: Token = Token(0x0600_0001);
const TINT_FIELD: Token = Token(0x0400_0001);
const OUT_FIELD: Token = Token(0x0400_0002);

fn uniform_field(token: Token, name: &str, ty: ShaderType) -> FieldDef {
    FieldDef {
        token,
        name: name.to_string(),
        ty,
        role: Some(VariableRole::Uniform),
        semantic: None,
        linkage_name: None,
        interpolation: InterpolationMode::default(),
    }
}

fn static_void() -> MethodSignature {
    MethodSignature {
        is_static: true,
        return_type: ShaderType::Void,
        parameters: vec![],
    }
}

fn instance_void() -> MethodSignature {
    MethodSignature {
        is_static: false,
        return_type: ShaderType::Void,
        parameters: vec![],
    }
}

/// `uniform ColorF Tint; Main() { OutColor = Tint; }` as raw bytecode.
fn tint_passthrough_module() -> Arc<ShaderModule> {
    let code = [
        0x02, // ldarg.0 (receiver for the store)
        0x02, // ldarg.0
        0x7B, 0x01, 0x00, 0x00, 0x04, // ldfld Tint
        0x7D, 0x02, 0x00, 0x00, 0x04, // stfld OutColor
        0x2A, // ret
    ];
    ShaderModule::builder("tint", SHADER)
        .field(uniform_field(TINT_FIELD, "Tint", ShaderType::Color))
        .field(FieldDef {
            token: OUT_FIELD,
            name: "OutColor".to_string(),
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
            instance_void(),
            vec![],
            MethodBody::Bytecode(code.to_vec()),
        )
        .entry_point(ShaderKind::Fragment, MAIN)
        .finish()
        .unwrap()
}

#[test]
fn uniform_passthrough_on_every_backend() {
    let module = tint_passthrough_module();

    for backend in [Backend::Hlsl, Backend::Glsl, Backend::Msl] {
        let shader = cilshader::compile(&module, ShaderKind::Fragment, backend).unwrap();

        assert_eq!(shader.layout.uniforms.len(), 1, "{backend:?}");
        assert_eq!(shader.layout.uniforms[0].name, "Tint");
        assert_eq!(shader.layout.outputs.len(), 1);

        let assignment = match backend {
            Backend::Hlsl => "output_.OutColor = Tint;",
            Backend::Glsl => "OutColor = Tint;",
            Backend::Msl => "output_.OutColor = uniforms.Tint;",
        };
        assert!(
            shader.source.contains(assignment),
            "{backend:?} source missing the passthrough:\n{}",
            shader.source
        );
    }
}

/// `[Input] Vector3 Pos; [Output(Position)] Vector4 OutPos;
/// Main() { OutPos = new Vector4(Pos.X, Pos.Y, Pos.Z, 1.0); }`
fn vector_construction_module() -> Arc<ShaderModule> {
    let pos = |component: &str| {
        Expression::MemberAccess {
            object: Expression::MemberAccess {
                object: Expression::SelfReference.into_ref(),
                field: FieldRef {
                    declaring: SHADER,
                    name: "Pos".to_string(),
                    ty: ShaderType::Vector { size: 3 },
                },
            }
            .into_ref(),
            field: FieldRef {
                declaring: cilshader::module::VECTOR3_TOKEN,
                name: component.to_string(),
                ty: ShaderType::Float32,
            },
        }
        .into_ref()
    };

    let local = Expression::LocalVariable {
        slot: 0,
        ty: ShaderType::Vector { size: 4 },
    }
    .into_ref();

    let body = Expression::Block(vec![
        Expression::Assign {
            target: Arc::clone(&local),
            value: Expression::Construct {
                token: cilshader::module::VECTOR4_CTOR,
                arguments: vec![
                    pos("X"),
                    pos("Y"),
                    pos("Z"),
                    Expression::Constant(Constant::Float32(1.0)).into_ref(),
                ],
            }
            .into_ref(),
        }
        .into_ref(),
        Expression::Assign {
            target: Expression::MemberAccess {
                object: Expression::SelfReference.into_ref(),
                field: FieldRef {
                    declaring: SHADER,
                    name: "OutPos".to_string(),
                    ty: ShaderType::Vector { size: 4 },
                },
            }
            .into_ref(),
            value: local,
        }
        .into_ref(),
        Expression::Return(None).into_ref(),
    ])
    .into_ref();

    ShaderModule::builder("construct", SHADER)
        .field(FieldDef {
            token: TINT_FIELD,
            name: "Pos".to_string(),
            ty: ShaderType::Vector { size: 3 },
            role: Some(VariableRole::Input),
            semantic: None,
            linkage_name: None,
            interpolation: InterpolationMode::default(),
        })
        .field(FieldDef {
            token: OUT_FIELD,
            name: "OutPos".to_string(),
            ty: ShaderType::Vector { size: 4 },
            role: Some(VariableRole::Output),
            semantic: Some(BuiltinSemantic::Position),
            linkage_name: None,
            interpolation: InterpolationMode::default(),
        })
        .method(
            MAIN,
            "Main",
            SHADER,
            instance_void(),
            vec![ShaderType::Vector { size: 4 }],
            MethodBody::Tree(body),
        )
        .entry_point(ShaderKind::Vertex, MAIN)
        .finish()
        .unwrap()
}

#[test]
fn constructor_becomes_component_assignments() {
    let module = vector_construction_module();
    let shader = cilshader::compile(&module, ShaderKind::Vertex, Backend::Hlsl).unwrap();

    // The construction is gone; four component stores into the local remain.
    assert!(!shader.source.contains("Vector4"));
    assert!(shader.source.contains("local0.x = input_.Pos.x;"));
    assert!(shader.source.contains("local0.y = input_.Pos.y;"));
    assert!(shader.source.contains("local0.z = input_.Pos.z;"));
    assert!(shader.source.contains("local0.w = 1.0;"));
    assert!(shader.source.contains("output_.OutPos = local0;"));
    assert!(shader.source.contains("OutPos : SV_Position;"));
}

#[test]
fn constructor_elimination_is_backend_independent() {
    let module = vector_construction_module();

    let glsl = cilshader::compile(&module, ShaderKind::Vertex, Backend::Glsl).unwrap();
    assert!(glsl.source.contains("local0.w = 1.0;"));
    assert!(glsl.source.contains("gl_Position = local0;"));

    let msl = cilshader::compile(&module, ShaderKind::Vertex, Backend::Msl).unwrap();
    assert!(msl.source.contains("local0.w = 1.0;"));
    assert!(msl.source.contains("output_.OutPos = local0;"));
}

#[test]
fn counted_loop_compiles_to_while() {
    // i = 0; while (i < 8) { i = i + 1; } return;
    let code = [
        0x16, // ldc.i4.0
        0x0A, // stloc.0
        0x2B, 0x04, // br.s -> condition at 8
        0x06, // 4: ldloc.0
        0x17, // ldc.i4.1
        0x58, // add
        0x0A, // stloc.0
        0x06, // 8: ldloc.0
        0x1E, // ldc.i4.8
        0x32, 0xF8, // blt.s -> 4
        0x2A, // ret
    ];
    let module = ShaderModule::builder("loop", SHADER)
        .method(
            MAIN,
            "Main",
            SHADER,
            static_void(),
            vec![ShaderType::Int32],
            MethodBody::Bytecode(code.to_vec()),
        )
        .entry_point(ShaderKind::Compute, MAIN)
        .finish()
        .unwrap();

    let shader = cilshader::compile(&module, ShaderKind::Compute, Backend::Glsl).unwrap();
    assert!(shader.source.contains("while ((local0 < 8))"));
    assert!(shader.source.contains("local0 = (local0 + 1);"));
    assert!(!shader.source.contains("goto"));
}

#[test]
fn uniform_packing_follows_declaration_order() {
    let build = |first_is_float: bool| {
        let (a, b) = if first_is_float {
            (
                uniform_field(TINT_FIELD, "Time", ShaderType::Float32),
                uniform_field(OUT_FIELD, "Scale", ShaderType::Vector { size: 3 }),
            )
        } else {
            (
                uniform_field(TINT_FIELD, "Scale", ShaderType::Vector { size: 3 }),
                uniform_field(OUT_FIELD, "Time", ShaderType::Float32),
            )
        };
        let module = ShaderModule::builder("packing", SHADER)
            .field(a)
            .field(b)
            .method(
                MAIN,
                "Main",
                SHADER,
                static_void(),
                vec![],
                MethodBody::Tree(
                    Expression::Block(vec![Expression::Return(None).into_ref()]).into_ref(),
                ),
            )
            .entry_point(ShaderKind::Compute, MAIN)
            .finish()
            .unwrap();
        cilshader::compile(&module, ShaderKind::Compute, Backend::Hlsl).unwrap()
    };

    let float_first = build(true);
    let vector_first = build(false);

    // float, then vec3 realigned to 16.
    assert_eq!(float_first.layout.uniforms[0].offset, 0);
    assert_eq!(float_first.layout.uniforms[1].offset, 16);
    // vec3, then float packed into its tail padding.
    assert_eq!(vector_first.layout.uniforms[0].offset, 0);
    assert_eq!(vector_first.layout.uniforms[1].offset, 12);
}

#[test]
fn reference_types_fail_at_module_validation() {
    let reference = ShaderType::Reference(Box::new(ShaderType::Float32));

    // On a shader interface field.
    let result = ShaderModule::builder("bad", SHADER)
        .field(uniform_field(TINT_FIELD, "Broken", reference.clone()))
        .finish();
    assert!(matches!(result, Err(Error::ReferenceType(_))));

    // Inside a plain-data struct.
    let result = ShaderModule::builder("bad", SHADER)
        .struct_def(
            Token(0x0200_0002),
            "Holder",
            vec![("Data".to_string(), reference)],
        )
        .finish();
    assert!(matches!(result, Err(Error::ReferenceType(_))));
}

#[test]
fn cyclic_structs_fail_at_module_validation() {
    let a = Token(0x0200_0002);
    let b = Token(0x0200_0003);
    let result = ShaderModule::builder("cyclic", SHADER)
        .struct_def(a, "A", vec![("Next".to_string(), ShaderType::Struct(b))])
        .struct_def(b, "B", vec![("Back".to_string(), ShaderType::Struct(a))])
        .finish();
    assert!(matches!(result, Err(Error::CyclicStruct(_))));
}
