//! The pass-through expression rewriter.
//!
//! Every compiler pass is an [`ExpressionRewriter`]: it overrides [`ExpressionRewriter::rewrite`]
//! for the node shapes it cares about and delegates to [`ExpressionRewriter::rewrite_children`]
//! for everything else. Rewriting preserves structural sharing: a node whose
//! children all come back pointer-identical is returned as the original `Arc`
//! instead of being rebuilt.

use std::sync::Arc;

use crate::{
    ir::expr::{ExprRef, Expression},
    Result,
};

/// A bottom-up tree rewriter over [`ExprRef`] nodes.
pub trait ExpressionRewriter {
    /// Rewrites one node. The default implementation rewrites children and
    /// rebuilds this node only when a child changed.
    ///
    /// # Errors
    ///
    /// Propagates any error raised while rewriting this node or its children.
    fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        self.rewrite_children(expr)
    }

    /// Rewrites the children of `expr` without giving this rewriter another
    /// look at `expr` itself. Overrides of [`ExpressionRewriter::rewrite`] call
    /// this to recurse after (or instead of) handling a node.
    ///
    /// # Errors
    ///
    /// Propagates any error raised while rewriting children.
    fn rewrite_children(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        walk(self, expr)
    }
}

/// Rewrites every child of `expr` through `rewriter`, sharing unchanged subtrees.
fn walk<R: ExpressionRewriter + ?Sized>(rewriter: &mut R, expr: &ExprRef) -> Result<ExprRef> {
    // Rewrites one child and records whether it changed.
    let mut one = |child: &ExprRef, changed: &mut bool| -> Result<ExprRef> {
        let out = rewriter.rewrite(child)?;
        *changed |= !Arc::ptr_eq(&out, child);
        Ok(out)
    };

    let mut changed = false;
    let rebuilt = match expr.as_ref() {
        // Leaves never change through child rewriting.
        Expression::Constant(_)
        | Expression::LocalVariable { .. }
        | Expression::MethodParameter { .. }
        | Expression::SelfReference
        | Expression::Break
        | Expression::Continue
        | Expression::Label(_)
        | Expression::Goto(_)
        | Expression::CompiledVariable(_)
        | Expression::InlineSource { .. } => return Ok(Arc::clone(expr)),

        Expression::MemberAccess { object, field } => Expression::MemberAccess {
            object: one(object, &mut changed)?,
            field: field.clone(),
        },
        Expression::Binary { op, left, right } => Expression::Binary {
            op: *op,
            left: one(left, &mut changed)?,
            right: one(right, &mut changed)?,
        },
        Expression::Unary { op, operand } => Expression::Unary {
            op: *op,
            operand: one(operand, &mut changed)?,
        },
        Expression::Block(statements) => {
            let statements = statements
                .iter()
                .map(|s| one(s, &mut changed))
                .collect::<Result<Vec<_>>>()?;
            Expression::Block(statements)
        }
        Expression::Assign { target, value } => Expression::Assign {
            target: one(target, &mut changed)?,
            value: one(value, &mut changed)?,
        },
        Expression::If {
            condition,
            then_body,
            else_body,
        } => Expression::If {
            condition: one(condition, &mut changed)?,
            then_body: one(then_body, &mut changed)?,
            else_body: else_body
                .as_ref()
                .map(|e| one(e, &mut changed))
                .transpose()?,
        },
        Expression::While { condition, body } => Expression::While {
            condition: one(condition, &mut changed)?,
            body: one(body, &mut changed)?,
        },
        Expression::Call {
            token,
            receiver,
            arguments,
        } => Expression::Call {
            token: *token,
            receiver: receiver.as_ref().map(|r| one(r, &mut changed)).transpose()?,
            arguments: arguments
                .iter()
                .map(|a| one(a, &mut changed))
                .collect::<Result<Vec<_>>>()?,
        },
        Expression::Construct { token, arguments } => Expression::Construct {
            token: *token,
            arguments: arguments
                .iter()
                .map(|a| one(a, &mut changed))
                .collect::<Result<Vec<_>>>()?,
        },
        Expression::Return(value) => {
            Expression::Return(value.as_ref().map(|v| one(v, &mut changed)).transpose()?)
        }
        Expression::CompiledCall { method, arguments } => Expression::CompiledCall {
            method: Arc::clone(method),
            arguments: arguments
                .iter()
                .map(|a| one(a, &mut changed))
                .collect::<Result<Vec<_>>>()?,
        },
        Expression::IntrinsicCall { op, arguments } => Expression::IntrinsicCall {
            op: *op,
            arguments: arguments
                .iter()
                .map(|a| one(a, &mut changed))
                .collect::<Result<Vec<_>>>()?,
        },
    };

    if changed {
        Ok(Arc::new(rebuilt))
    } else {
        Ok(Arc::clone(expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::{BinaryOp, Constant, Expression};

    /// Replaces every integer constant with its increment.
    struct Increment;

    impl ExpressionRewriter for Increment {
        fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
            if let Expression::Constant(Constant::Int32(value)) = expr.as_ref() {
                return Ok(Expression::Constant(Constant::Int32(value + 1)).into_ref());
            }
            self.rewrite_children(expr)
        }
    }

    /// Touches nothing.
    struct Identity;

    impl ExpressionRewriter for Identity {}

    #[test]
    fn default_rewrite_works_through_a_trait_object() {
        let tree = Expression::Constant(Constant::Int32(1)).into_ref();
        let rewriter: &mut dyn ExpressionRewriter = &mut Identity;
        let out = rewriter.rewrite(&tree).unwrap();
        assert!(Arc::ptr_eq(&out, &tree));
    }

    #[test]
    fn identity_preserves_sharing() {
        let tree = Expression::Binary {
            op: BinaryOp::Add,
            left: Expression::Constant(Constant::Int32(1)).into_ref(),
            right: Expression::Constant(Constant::Int32(2)).into_ref(),
        }
        .into_ref();

        let out = Identity.rewrite(&tree).unwrap();
        assert!(Arc::ptr_eq(&out, &tree));
    }

    #[test]
    fn rewrite_rebuilds_only_changed_spine() {
        let unchanged = Expression::Constant(Constant::Float32(3.5)).into_ref();
        let tree = Expression::Block(vec![
            Arc::clone(&unchanged),
            Expression::Constant(Constant::Int32(7)).into_ref(),
        ])
        .into_ref();

        let out = Increment.rewrite(&tree).unwrap();
        assert!(!Arc::ptr_eq(&out, &tree));

        let Expression::Block(statements) = out.as_ref() else {
            panic!("expected block");
        };
        assert!(Arc::ptr_eq(&statements[0], &unchanged));
        assert!(matches!(
            statements[1].as_ref(),
            Expression::Constant(Constant::Int32(8))
        ));
    }

    #[test]
    fn rewrite_reaches_nested_nodes() {
        let tree = Expression::If {
            condition: Expression::Constant(Constant::Bool(true)).into_ref(),
            then_body: Expression::Return(Some(Expression::Constant(Constant::Int32(0)).into_ref())).into_ref(),
            else_body: None,
        }
        .into_ref();

        let out = Increment.rewrite(&tree).unwrap();
        let Expression::If { then_body, .. } = out.as_ref() else {
            panic!("expected if");
        };
        let Expression::Return(Some(value)) = then_body.as_ref() else {
            panic!("expected return");
        };
        assert!(matches!(
            value.as_ref(),
            Expression::Constant(Constant::Int32(1))
        ));
    }
}
