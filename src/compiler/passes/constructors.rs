//! Constructor calls become per-component field assignments.

use std::sync::Arc;

use crate::{
    compiler::{context::ShaderCompilation, pass::CompilerPass, passes::for_each_tree, structurer::structure_method},
    ir::{Constant, ExprRef, Expression, ExpressionRewriter, FieldRef, ShaderType},
    module::{
        builtin_type, MethodBody, ShaderModule, Token, COLORF_TOKEN, VECTOR2_TOKEN, VECTOR3_TOKEN,
        VECTOR4_TOKEN,
    },
    Result,
};

/// Lowers every `target = new T(...)` into the constructor's body with `self`
/// replaced by the target and each parameter replaced by the matching argument.
/// Zero-argument constructions carrying a type token (the `initobj` form)
/// expand into recursive zero-fill assignments instead. A construction that is
/// not the value of an assignment has no target to write into and is left for
/// the validation pass to reject.
pub struct ConstructorPass;

impl CompilerPass for ConstructorPass {
    fn name(&self) -> &'static str {
        "constructor-lowering"
    }

    fn run(&self, compilation: &mut ShaderCompilation) -> Result<bool> {
        let module = Arc::clone(compilation.module());
        for_each_tree(compilation, |_, tree| {
            let mut rewriter = Lower { module: &module };
            rewriter.rewrite(tree)
        })
    }
}

struct Lower<'a> {
    module: &'a Arc<ShaderModule>,
}

impl ExpressionRewriter for Lower<'_> {
    fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        let expr = self.rewrite_children(expr)?;

        let Expression::Assign { target, value } = expr.as_ref() else {
            return Ok(expr);
        };
        let Expression::Construct { token, arguments } = value.as_ref() else {
            return Ok(expr);
        };

        if token.table() == 0x06 {
            self.inline_constructor(target, *token, arguments)
        } else {
            let ty = builtin_type(*token).unwrap_or(ShaderType::Struct(*token));
            let mut statements = Vec::new();
            self.zero_fill(target, &ty, &mut statements)?;
            Ok(Expression::Block(statements).into_ref())
        }
    }
}

impl Lower<'_> {
    fn inline_constructor(
        &mut self,
        target: &ExprRef,
        token: Token,
        arguments: &[ExprRef],
    ) -> Result<ExprRef> {
        let def = Arc::clone(self.module.method(token)?);
        if arguments.len() != def.signature.parameters.len() {
            return Err(malformed_error!(
                "Constructor {} expects {} argument(s), got {}",
                token,
                def.signature.parameters.len(),
                arguments.len()
            ));
        }

        let body = match &def.body {
            MethodBody::Tree(tree) => Arc::clone(tree),
            MethodBody::Bytecode(_) => structure_method(self.module, &def)?,
        };

        let mut inline = InlineConstructor { target, arguments };
        inline.rewrite(&body)
    }

    /// Emits `target.field = <default>` assignments down to scalar leaves.
    fn zero_fill(
        &mut self,
        target: &ExprRef,
        ty: &ShaderType,
        statements: &mut Vec<ExprRef>,
    ) -> Result<()> {
        let scalar = |value| {
            Expression::Assign {
                target: Arc::clone(target),
                value: Expression::Constant(value).into_ref(),
            }
            .into_ref()
        };

        match ty {
            ShaderType::Bool => statements.push(scalar(Constant::Bool(false))),
            ShaderType::Int32 => statements.push(scalar(Constant::Int32(0))),
            ShaderType::UInt32 => statements.push(scalar(Constant::UInt32(0))),
            ShaderType::Float32 => statements.push(scalar(Constant::Float32(0.0))),
            ShaderType::Vector { size } => {
                let (declaring, names) = match size {
                    2 => (VECTOR2_TOKEN, &["X", "Y"][..]),
                    3 => (VECTOR3_TOKEN, &["X", "Y", "Z"][..]),
                    _ => (VECTOR4_TOKEN, &["X", "Y", "Z", "W"][..]),
                };
                self.fill_components(target, declaring, names, statements);
            }
            ShaderType::Color => {
                self.fill_components(target, COLORF_TOKEN, &["R", "G", "B", "A"], statements);
            }
            ShaderType::Struct(token) => {
                let def = Arc::clone(self.module.struct_def(*token)?);
                for (name, field_ty) in &def.fields {
                    let member = Expression::MemberAccess {
                        object: Arc::clone(target),
                        field: FieldRef {
                            declaring: *token,
                            name: name.clone(),
                            ty: field_ty.clone(),
                        },
                    }
                    .into_ref();
                    self.zero_fill(&member, field_ty, statements)?;
                }
            }
            ShaderType::Matrix | ShaderType::Void | ShaderType::Reference(_) => {
                return Err(crate::Error::Error(format!(
                    "Cannot zero-initialize a value of type {ty:?}"
                )));
            }
        }
        Ok(())
    }

    fn fill_components(
        &self,
        target: &ExprRef,
        declaring: Token,
        names: &[&str],
        statements: &mut Vec<ExprRef>,
    ) {
        for name in names {
            statements.push(
                Expression::Assign {
                    target: Expression::MemberAccess {
                        object: Arc::clone(target),
                        field: FieldRef {
                            declaring,
                            name: (*name).to_string(),
                            ty: ShaderType::Float32,
                        },
                    }
                    .into_ref(),
                    value: Expression::Constant(Constant::Float32(0.0)).into_ref(),
                }
                .into_ref(),
            );
        }
    }
}

/// Substitutes the construction target for `self` and the call arguments for
/// the constructor's parameters.
struct InlineConstructor<'a> {
    target: &'a ExprRef,
    arguments: &'a [ExprRef],
}

impl ExpressionRewriter for InlineConstructor<'_> {
    fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        match expr.as_ref() {
            Expression::SelfReference => Ok(Arc::clone(self.target)),
            Expression::MethodParameter { index, .. } => self
                .arguments
                .get(usize::from(*index))
                .cloned()
                .ok_or_else(|| malformed_error!("Constructor parameter {} has no argument", index)),
            _ => self.rewrite_children(expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codegen::Backend,
        ir::ShaderKind,
        module::{MethodSignature, ShaderModule, VECTOR2_CTOR},
    };

    const SHADER: Token = Token(0x0200_0001);
    const LIGHT: Token = Token(0x0200_0002);
    const MAIN: Token = Token(0x0600_0001);

    fn compilation_with_root(root: ExprRef) -> ShaderCompilation {
        let module = ShaderModule::builder("test", SHADER)
            .struct_def(
                LIGHT,
                "Light",
                vec![
                    ("Intensity".to_string(), ShaderType::Float32),
                    ("Direction".to_string(), ShaderType::Vector { size: 3 }),
                ],
            )
            .method(
                MAIN,
                "Main",
                SHADER,
                MethodSignature {
                    is_static: true,
                    return_type: ShaderType::Void,
                    parameters: vec![],
                },
                vec![ShaderType::Vector { size: 2 }, ShaderType::Struct(LIGHT)],
                MethodBody::Tree(root),
            )
            .entry_point(ShaderKind::Vertex, MAIN)
            .finish()
            .unwrap();
        ShaderCompilation::new(module, ShaderKind::Vertex, Backend::Hlsl).unwrap()
    }

    fn local(slot: u16, ty: ShaderType) -> ExprRef {
        Expression::LocalVariable { slot, ty }.into_ref()
    }

    #[test]
    fn vector_constructor_inlines_component_assignments() {
        let root = Expression::Block(vec![Expression::Assign {
            target: local(0, ShaderType::Vector { size: 2 }),
            value: Expression::Construct {
                token: VECTOR2_CTOR,
                arguments: vec![
                    Expression::Constant(Constant::Float32(1.0)).into_ref(),
                    Expression::Constant(Constant::Float32(2.0)).into_ref(),
                ],
            }
            .into_ref(),
        }
        .into_ref()])
        .into_ref();

        let mut compilation = compilation_with_root(root);
        assert!(ConstructorPass.run(&mut compilation).unwrap());

        let Expression::Block(outer) = compilation.root.as_ref() else {
            panic!("expected block root");
        };
        let Expression::Block(assignments) = outer[0].as_ref() else {
            panic!("expected inlined constructor body");
        };
        assert_eq!(assignments.len(), 2);
        let Expression::Assign { target, value } = assignments[0].as_ref() else {
            panic!("expected assignment");
        };
        let Expression::MemberAccess { object, field } = target.as_ref() else {
            panic!("expected component access");
        };
        assert!(matches!(
            object.as_ref(),
            Expression::LocalVariable { slot: 0, .. }
        ));
        assert_eq!(field.name, "X");
        assert!(matches!(
            value.as_ref(),
            Expression::Constant(Constant::Float32(v)) if *v == 1.0
        ));
    }

    #[test]
    fn zero_initialization_fills_nested_fields() {
        let root = Expression::Block(vec![Expression::Assign {
            target: local(1, ShaderType::Struct(LIGHT)),
            value: Expression::Construct {
                token: LIGHT,
                arguments: vec![],
            }
            .into_ref(),
        }
        .into_ref()])
        .into_ref();

        let mut compilation = compilation_with_root(root);
        assert!(ConstructorPass.run(&mut compilation).unwrap());

        let Expression::Block(outer) = compilation.root.as_ref() else {
            panic!("expected block root");
        };
        let Expression::Block(fills) = outer[0].as_ref() else {
            panic!("expected zero-fill block");
        };
        // Intensity plus the three components of Direction.
        assert_eq!(fills.len(), 4);
        assert!(fills
            .iter()
            .all(|s| matches!(s.as_ref(), Expression::Assign { .. })));
    }

    #[test]
    fn construction_outside_assignment_is_left_alone() {
        let construct = Expression::Construct {
            token: VECTOR2_CTOR,
            arguments: vec![
                Expression::Constant(Constant::Float32(0.0)).into_ref(),
                Expression::Constant(Constant::Float32(0.0)).into_ref(),
            ],
        }
        .into_ref();
        let root = Expression::Block(vec![Expression::Return(Some(construct)).into_ref()]).into_ref();

        let mut compilation = compilation_with_root(root);
        assert!(!ConstructorPass.run(&mut compilation).unwrap());
        let Expression::Block(outer) = compilation.root.as_ref() else {
            panic!("expected block root");
        };
        let Expression::Return(Some(value)) = outer[0].as_ref() else {
            panic!("expected return");
        };
        assert!(matches!(value.as_ref(), Expression::Construct { .. }));
    }
}
