//! Shader field accesses become interface variables.

use std::sync::Arc;

use crate::{
    compiler::{context::ShaderCompilation, pass::CompilerPass, passes::for_each_tree},
    ir::{ExprRef, Expression, ExpressionRewriter},
    module::ShaderModule,
    Result,
};

/// Rewrites `self.Field` on the shader type into the interface variable the
/// field declares. After this pass the shader's own type no longer appears in
/// any tree; uniforms, inputs, and outputs are free-standing named variables
/// the backends declare at module scope.
pub struct VariableAccessReplacements;

impl CompilerPass for VariableAccessReplacements {
    fn name(&self) -> &'static str {
        "variable-access-replacements"
    }

    fn run(&self, compilation: &mut ShaderCompilation) -> Result<bool> {
        // Every interface field registers up front, so variable order (and
        // with it uniform packing) follows declaration order, not first-use
        // order, and unreferenced uniforms still land in the layout.
        let module = Arc::clone(compilation.module());
        for field in module.fields() {
            compilation.variable_for(field);
        }

        for_each_tree(compilation, |compilation, tree| {
            let module = Arc::clone(compilation.module());
            let mut rewriter = Replace {
                module,
                compilation,
            };
            rewriter.rewrite(tree)
        })
    }
}

struct Replace<'a> {
    module: Arc<ShaderModule>,
    compilation: &'a mut ShaderCompilation,
}

impl ExpressionRewriter for Replace<'_> {
    fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        if let Expression::MemberAccess { object, field } = expr.as_ref() {
            if matches!(object.as_ref(), Expression::SelfReference)
                && self.module.is_shader_type(field.declaring)
            {
                let def = self
                    .module
                    .field(&field.name)
                    .ok_or_else(|| crate::Error::RolelessField(field.name.clone()))?
                    .clone();
                let variable = self.compilation.variable_for(&def);
                return Ok(Expression::CompiledVariable(variable).into_ref());
            }
        }
        self.rewrite_children(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codegen::Backend,
        ir::{
            FieldRef, InterpolationMode, ShaderKind, ShaderType, VariableRole,
        },
        module::{FieldDef, MethodBody, MethodSignature, ShaderModule, Token},
    };

    const SHADER: Token = Token(0x0200_0001);
    const MAIN: Token = Token(0x0600_0001);

    #[test]
    fn self_field_access_becomes_variable() {
        let body = Expression::Block(vec![Expression::Return(Some(
            Expression::MemberAccess {
                object: Expression::SelfReference.into_ref(),
                field: FieldRef {
                    declaring: SHADER,
                    name: "Time".to_string(),
                    ty: ShaderType::Float32,
                },
            }
            .into_ref(),
        ))
        .into_ref()])
        .into_ref();

        let module = ShaderModule::builder("test", SHADER)
            .field(FieldDef {
                token: Token(0x0400_0001),
                name: "Time".to_string(),
                ty: ShaderType::Float32,
                role: Some(VariableRole::Uniform),
                semantic: None,
                linkage_name: Some("u_time".to_string()),
                interpolation: InterpolationMode::default(),
            })
            .method(
                MAIN,
                "Main",
                SHADER,
                MethodSignature {
                    is_static: false,
                    return_type: ShaderType::Float32,
                    parameters: vec![],
                },
                vec![],
                MethodBody::Tree(body),
            )
            .entry_point(ShaderKind::Fragment, MAIN)
            .finish()
            .unwrap();

        let mut compilation =
            ShaderCompilation::new(module, ShaderKind::Fragment, Backend::Glsl).unwrap();
        let changed = VariableAccessReplacements.run(&mut compilation).unwrap();
        assert!(changed);

        let Expression::Block(statements) = compilation.root.as_ref() else {
            panic!("expected block");
        };
        let Expression::Return(Some(value)) = statements[0].as_ref() else {
            panic!("expected return");
        };
        let Expression::CompiledVariable(variable) = value.as_ref() else {
            panic!("expected variable, got {}", value.describe());
        };
        assert_eq!(variable.name, "u_time");
        assert_eq!(variable.role, VariableRole::Uniform);
        assert_eq!(compilation.variables.len(), 1);

        // Idempotent: the variable node is a leaf for this rewriter.
        assert!(!VariableAccessReplacements.run(&mut compilation).unwrap());
    }
}
