//! Mapped calls become GPU intrinsic operations.

use crate::{
    compiler::{context::ShaderCompilation, pass::CompilerPass, passes::for_each_tree},
    ir::{ExprRef, Expression, ExpressionRewriter},
    module::ShaderModule,
    Result,
};
use std::sync::Arc;

/// Replaces calls whose token carries an intrinsic mapping with
/// [`Expression::IntrinsicCall`] nodes. The structurer already does this for
/// bytecode bodies; this pass covers host-captured trees that still hold raw
/// token calls.
pub struct ShaderIntrinsicSubstitutions;

impl CompilerPass for ShaderIntrinsicSubstitutions {
    fn name(&self) -> &'static str {
        "shader-intrinsic-substitutions"
    }

    fn run(&self, compilation: &mut ShaderCompilation) -> Result<bool> {
        let module = Arc::clone(compilation.module());
        for_each_tree(compilation, |_, tree| {
            let mut rewriter = Substitute { module: &module };
            rewriter.rewrite(tree)
        })
    }
}

struct Substitute<'a> {
    module: &'a ShaderModule,
}

impl ExpressionRewriter for Substitute<'_> {
    fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        let expr = self.rewrite_children(expr)?;

        let Expression::Call {
            token,
            receiver,
            arguments,
        } = expr.as_ref()
        else {
            return Ok(expr);
        };
        let Some(op) = self.module.intrinsic(*token) else {
            return Ok(expr);
        };

        // Intrinsics are free functions in every target language.
        if receiver.is_some() {
            return Err(crate::Error::UnsupportedConstruct(*token));
        }
        if arguments.len() != op.arity() {
            return Err(crate::Error::Error(format!(
                "Intrinsic {op} expects {} argument(s), got {}",
                op.arity(),
                arguments.len()
            )));
        }

        Ok(Expression::IntrinsicCall {
            op,
            arguments: arguments.clone(),
        }
        .into_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codegen::Backend,
        ir::{Constant, IntrinsicOp, ShaderKind, ShaderType},
        module::{intrinsic_token, MethodBody, MethodSignature, ShaderModule, Token},
    };

    const SHADER: Token = Token(0x0200_0001);
    const MAIN: Token = Token(0x0600_0001);

    #[test]
    fn mapped_call_becomes_intrinsic() {
        let call = Expression::Call {
            token: intrinsic_token(IntrinsicOp::Sqrt),
            receiver: None,
            arguments: vec![Expression::Constant(Constant::Float32(4.0)).into_ref()],
        }
        .into_ref();

        let module = ShaderModule::builder("test", SHADER)
            .method(
                MAIN,
                "Main",
                SHADER,
                MethodSignature {
                    is_static: true,
                    return_type: ShaderType::Float32,
                    parameters: vec![],
                },
                vec![],
                MethodBody::Tree(Expression::Return(Some(call)).into_ref()),
            )
            .entry_point(ShaderKind::Compute, MAIN)
            .finish()
            .unwrap();

        let mut compilation =
            ShaderCompilation::new(module, ShaderKind::Compute, Backend::Hlsl).unwrap();
        assert!(ShaderIntrinsicSubstitutions.run(&mut compilation).unwrap());

        let Expression::Return(Some(value)) = compilation.root.as_ref() else {
            panic!("expected return");
        };
        assert!(matches!(
            value.as_ref(),
            Expression::IntrinsicCall {
                op: IntrinsicOp::Sqrt,
                ..
            }
        ));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let call = Expression::Call {
            token: intrinsic_token(IntrinsicOp::Dot),
            receiver: None,
            arguments: vec![Expression::Constant(Constant::Float32(1.0)).into_ref()],
        }
        .into_ref();

        let module = ShaderModule::builder("test", SHADER)
            .method(
                MAIN,
                "Main",
                SHADER,
                MethodSignature {
                    is_static: true,
                    return_type: ShaderType::Float32,
                    parameters: vec![],
                },
                vec![],
                MethodBody::Tree(Expression::Return(Some(call)).into_ref()),
            )
            .entry_point(ShaderKind::Compute, MAIN)
            .finish()
            .unwrap();

        let mut compilation =
            ShaderCompilation::new(module, ShaderKind::Compute, Backend::Hlsl).unwrap();
        assert!(ShaderIntrinsicSubstitutions.run(&mut compilation).is_err());
    }
}
