//! The individual pipeline passes.
//!
//! Each pass is an [`crate::ir::ExpressionRewriter`] applied to the entry tree
//! and every registered helper body through [`for_each_tree`], so structural
//! sharing is preserved across passes.

mod call_substitution;
mod constructors;
mod dependencies;
mod inlines;
mod intrinsics;
mod validation;
mod variable_access;

pub use call_substitution::CallSubstitutions;
pub use constructors::ConstructorPass;
pub use dependencies::DependencyResolver;
pub use inlines::IntrinsicTypeVariableInlines;
pub use intrinsics::ShaderIntrinsicSubstitutions;
pub use validation::Validation;
pub use variable_access::VariableAccessReplacements;

use std::sync::Arc;

use crate::{
    compiler::context::ShaderCompilation,
    ir::{CompiledMethod, ExprRef},
    Result,
};

/// Applies `f` to the entry tree and every helper body, writing back any tree
/// that changed. Returns whether anything changed.
pub(crate) fn for_each_tree<F>(compilation: &mut ShaderCompilation, mut f: F) -> Result<bool>
where
    F: FnMut(&mut ShaderCompilation, &ExprRef) -> Result<ExprRef>,
{
    let mut changed = false;

    let root = Arc::clone(&compilation.root);
    let new_root = f(compilation, &root)?;
    if !Arc::ptr_eq(&new_root, &root) {
        compilation.root = new_root;
        changed = true;
    }

    for index in 0..compilation.methods.len() {
        let method = Arc::clone(&compilation.methods[index]);
        let new_body = f(compilation, &method.body)?;
        if !Arc::ptr_eq(&new_body, &method.body) {
            compilation.methods[index] = Arc::new(CompiledMethod {
                token: method.token,
                name: method.name.clone(),
                return_type: method.return_type.clone(),
                parameters: method.parameters.clone(),
                body: new_body,
            });
            changed = true;
        }
    }

    Ok(changed)
}
