//! Final well-formedness check before code generation.

use crate::{
    compiler::{context::ShaderCompilation, pass::CompilerPass, passes::for_each_tree},
    ir::{ExprRef, Expression, ExpressionRewriter},
    Result,
};

/// Verifies that the earlier passes left nothing a backend cannot emit: raw
/// token calls, constructions that never got a target, and bare references to
/// the shader object must all be gone by this point. Never modifies a tree.
pub struct Validation;

impl CompilerPass for Validation {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn run(&self, compilation: &mut ShaderCompilation) -> Result<bool> {
        for_each_tree(compilation, |_, tree| {
            let mut check = Check;
            check.rewrite(tree)
        })?;
        Ok(false)
    }
}

struct Check;

impl ExpressionRewriter for Check {
    fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        match expr.as_ref() {
            Expression::Call { token, .. } | Expression::Construct { token, .. } => {
                Err(crate::Error::UnsupportedConstruct(*token))
            }
            Expression::SelfReference => Err(malformed_error!(
                "Shader object reference survived variable replacement"
            )),
            _ => self.rewrite_children(expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codegen::Backend,
        ir::{Constant, ShaderKind, ShaderType},
        module::{MethodBody, MethodSignature, ShaderModule, Token},
    };

    const SHADER: Token = Token(0x0200_0001);
    const MAIN: Token = Token(0x0600_0001);

    fn compilation_with_root(root: ExprRef) -> ShaderCompilation {
        let module = ShaderModule::builder("test", SHADER)
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
                MethodBody::Tree(root),
            )
            .entry_point(ShaderKind::Vertex, MAIN)
            .finish()
            .unwrap();
        ShaderCompilation::new(module, ShaderKind::Vertex, Backend::Hlsl).unwrap()
    }

    #[test]
    fn clean_tree_passes() {
        let root = Expression::Block(vec![Expression::Return(None).into_ref()]).into_ref();
        let mut compilation = compilation_with_root(root);
        assert!(!Validation.run(&mut compilation).unwrap());
    }

    #[test]
    fn leftover_call_is_rejected() {
        let root = Expression::Block(vec![Expression::Call {
            token: Token(0x0600_00AA),
            receiver: None,
            arguments: vec![],
        }
        .into_ref()])
        .into_ref();
        let mut compilation = compilation_with_root(root);
        assert!(matches!(
            Validation.run(&mut compilation),
            Err(crate::Error::UnsupportedConstruct(_))
        ));
    }

    #[test]
    fn leftover_construct_is_rejected() {
        let root = Expression::Block(vec![Expression::Return(Some(
            Expression::Construct {
                token: Token(0x0200_0002),
                arguments: vec![Expression::Constant(Constant::Float32(1.0)).into_ref()],
            }
            .into_ref(),
        ))
        .into_ref()])
        .into_ref();
        let mut compilation = compilation_with_root(root);
        assert!(Validation.run(&mut compilation).is_err());
    }
}
