//! Token calls become compiled helper calls.

use std::sync::Arc;

use crate::{
    compiler::{context::ShaderCompilation, pass::CompilerPass, passes::for_each_tree},
    ir::{ExprRef, Expression, ExpressionRewriter},
    Result,
};

/// Replaces every [`Expression::Call`] whose token resolved to a helper with a
/// [`Expression::CompiledCall`] naming that helper. An instance receiver on a
/// data-struct method folds in as the leading argument; a receiver on a
/// shader-type method is dropped, because those helpers read the interface
/// variables directly. Intrinsic-mapped tokens are left for the intrinsic
/// substitution pass.
pub struct CallSubstitutions;

impl CompilerPass for CallSubstitutions {
    fn name(&self) -> &'static str {
        "call-substitutions"
    }

    fn run(&self, compilation: &mut ShaderCompilation) -> Result<bool> {
        for_each_tree(compilation, |compilation, tree| {
            let mut rewriter = Substitute { compilation };
            rewriter.rewrite(tree)
        })
    }
}

struct Substitute<'a> {
    compilation: &'a mut ShaderCompilation,
}

impl ExpressionRewriter for Substitute<'_> {
    fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        // Children first so nested calls in receivers and arguments resolve.
        let expr = self.rewrite_children(expr)?;

        let Expression::Call {
            token,
            receiver,
            arguments,
        } = expr.as_ref()
        else {
            return Ok(expr);
        };
        if self.compilation.module().intrinsic(*token).is_some() {
            return Ok(expr);
        }

        let method = Arc::clone(
            self.compilation
                .compiled_method(*token)
                .ok_or(crate::Error::UnsupportedConstruct(*token))?,
        );

        let module = Arc::clone(self.compilation.module());
        let declaring = module.method(*token)?.declaring_type;
        let mut folded = Vec::with_capacity(arguments.len() + 1);
        if let Some(receiver) = receiver {
            if !module.is_shader_type(declaring) {
                folded.push(Arc::clone(receiver));
            }
        }
        folded.extend(arguments.iter().cloned());

        Ok(Expression::CompiledCall {
            method,
            arguments: folded,
        }
        .into_ref())
    }
}
