//! Copy propagation for single-assignment scalar and vector locals.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{
    compiler::{context::ShaderCompilation, pass::CompilerPass, passes::for_each_tree},
    ir::{ExprRef, Expression, ExpressionRewriter, ShaderType, VariableRole},
    Result,
};

/// Inlines locals of intrinsic (non-struct) type that are assigned exactly
/// once, at the top of the body, from a value that is safe to duplicate: a
/// constant, a parameter, or a read-only interface variable. The assignment
/// disappears and every use reads the value directly, which removes the
/// temporaries the eval-stack lowering introduces for `stloc`/`ldloc` pairs.
/// An assignment buried in a conditional or loop only happens on some paths
/// and keeps its storage.
pub struct IntrinsicTypeVariableInlines;

impl CompilerPass for IntrinsicTypeVariableInlines {
    fn name(&self) -> &'static str {
        "intrinsic-variable-inlines"
    }

    fn run(&self, compilation: &mut ShaderCompilation) -> Result<bool> {
        for_each_tree(compilation, |_, tree| {
            let mut collect = Collect::default();
            collect.collect_leading(tree)?;
            collect.rewrite(tree)?;

            let replacements = collect.into_replacements();
            if replacements.is_empty() {
                return Ok(Arc::clone(tree));
            }
            let mut inline = Inline {
                replacements: &replacements,
            };
            inline.rewrite(tree)
        })
    }
}

/// First walk: per local slot, how often it is written and with what.
#[derive(Default)]
struct Collect {
    assigns: HashMap<u16, (usize, ExprRef, ShaderType)>,
    partially_written: HashSet<u16>,
    /// Slots whose defining assignment sits in the leading run of the body
    /// block, ahead of any control flow and any earlier read of the slot.
    leading: HashSet<u16>,
}

impl Collect {
    /// Scans the run of plain local assignments at the top of the body block.
    /// A slot read before its own assignment observes the zero-initialized
    /// value and is not a candidate.
    fn collect_leading(&mut self, root: &ExprRef) -> Result<()> {
        let Expression::Block(statements) = root.as_ref() else {
            return Ok(());
        };

        let mut used = Uses::default();
        for statement in statements {
            let Expression::Assign { target, value } = statement.as_ref() else {
                break;
            };
            let Expression::LocalVariable { slot, .. } = target.as_ref() else {
                break;
            };
            used.rewrite(value)?;
            if !used.0.contains(slot) {
                self.leading.insert(*slot);
            }
        }
        Ok(())
    }

    fn into_replacements(self) -> HashMap<u16, ExprRef> {
        let Collect {
            assigns,
            partially_written,
            leading,
        } = self;
        assigns
            .into_iter()
            .filter(|(slot, (count, value, ty))| {
                *count == 1
                    && leading.contains(slot)
                    && !partially_written.contains(slot)
                    && !matches!(ty, ShaderType::Struct(_))
                    && is_simple(value)
            })
            .map(|(slot, (_, value, _))| (slot, value))
            .collect()
    }
}

/// Every local slot an expression reads.
#[derive(Default)]
struct Uses(HashSet<u16>);

impl ExpressionRewriter for Uses {
    fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        if let Expression::LocalVariable { slot, .. } = expr.as_ref() {
            self.0.insert(*slot);
        }
        self.rewrite_children(expr)
    }
}

/// Values cheap and pure enough to duplicate at every use site.
fn is_simple(value: &ExprRef) -> bool {
    match value.as_ref() {
        Expression::Constant(_) | Expression::MethodParameter { .. } => true,
        Expression::CompiledVariable(variable) => {
            matches!(variable.role, VariableRole::Uniform | VariableRole::Input)
        }
        _ => false,
    }
}

/// The local at the root of a member-access chain, if any.
fn root_local(mut expr: &ExprRef) -> Option<u16> {
    loop {
        match expr.as_ref() {
            Expression::LocalVariable { slot, .. } => return Some(*slot),
            Expression::MemberAccess { object, .. } => expr = object,
            _ => return None,
        }
    }
}

impl ExpressionRewriter for Collect {
    fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        if let Expression::Assign { target, value } = expr.as_ref() {
            match target.as_ref() {
                Expression::LocalVariable { slot, ty } => {
                    self.assigns
                        .entry(*slot)
                        .and_modify(|(count, _, _)| *count += 1)
                        .or_insert_with(|| (1, Arc::clone(value), ty.clone()));
                }
                _ => {
                    // Writing through a member access mutates the local; it
                    // must keep its storage.
                    if let Some(slot) = root_local(target) {
                        self.partially_written.insert(slot);
                    }
                }
            }
        }
        self.rewrite_children(expr)
    }
}

/// Second walk: drop the defining assignments and substitute the uses.
struct Inline<'a> {
    replacements: &'a HashMap<u16, ExprRef>,
}

impl Inline<'_> {
    fn is_dropped_assignment(&self, statement: &ExprRef) -> bool {
        let Expression::Assign { target, .. } = statement.as_ref() else {
            return false;
        };
        let Expression::LocalVariable { slot, .. } = target.as_ref() else {
            return false;
        };
        self.replacements.contains_key(slot)
    }
}

impl ExpressionRewriter for Inline<'_> {
    fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        match expr.as_ref() {
            Expression::LocalVariable { slot, .. } => {
                if let Some(value) = self.replacements.get(slot) {
                    return Ok(Arc::clone(value));
                }
                Ok(Arc::clone(expr))
            }
            Expression::Block(statements) => {
                let mut changed = false;
                let mut rebuilt = Vec::with_capacity(statements.len());
                for statement in statements {
                    if self.is_dropped_assignment(statement) {
                        changed = true;
                        continue;
                    }
                    let new = self.rewrite(statement)?;
                    changed |= !Arc::ptr_eq(&new, statement);
                    rebuilt.push(new);
                }
                if changed {
                    Ok(Expression::Block(rebuilt).into_ref())
                } else {
                    Ok(Arc::clone(expr))
                }
            }
            _ => self.rewrite_children(expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codegen::Backend,
        ir::{Constant, ShaderKind},
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
                    return_type: ShaderType::Float32,
                    parameters: vec![],
                },
                vec![ShaderType::Float32, ShaderType::Float32],
                MethodBody::Tree(root),
            )
            .entry_point(ShaderKind::Fragment, MAIN)
            .finish()
            .unwrap();
        ShaderCompilation::new(module, ShaderKind::Fragment, Backend::Hlsl).unwrap()
    }

    fn local(slot: u16) -> ExprRef {
        Expression::LocalVariable {
            slot,
            ty: ShaderType::Float32,
        }
        .into_ref()
    }

    #[test]
    fn single_constant_assignment_is_inlined() {
        let root = Expression::Block(vec![
            Expression::Assign {
                target: local(0),
                value: Expression::Constant(Constant::Float32(0.5)).into_ref(),
            }
            .into_ref(),
            Expression::Return(Some(local(0))).into_ref(),
        ])
        .into_ref();

        let mut compilation = compilation_with_root(root);
        assert!(IntrinsicTypeVariableInlines.run(&mut compilation).unwrap());

        let Expression::Block(statements) = compilation.root.as_ref() else {
            panic!("expected block");
        };
        // The defining assignment is gone.
        assert_eq!(statements.len(), 1);
        let Expression::Return(Some(value)) = statements[0].as_ref() else {
            panic!("expected return");
        };
        assert!(matches!(
            value.as_ref(),
            Expression::Constant(Constant::Float32(v)) if *v == 0.5
        ));
    }

    #[test]
    fn reassigned_local_keeps_its_storage() {
        let root = Expression::Block(vec![
            Expression::Assign {
                target: local(0),
                value: Expression::Constant(Constant::Float32(1.0)).into_ref(),
            }
            .into_ref(),
            Expression::Assign {
                target: local(0),
                value: Expression::Constant(Constant::Float32(2.0)).into_ref(),
            }
            .into_ref(),
            Expression::Return(Some(local(0))).into_ref(),
        ])
        .into_ref();

        let mut compilation = compilation_with_root(root);
        assert!(!IntrinsicTypeVariableInlines.run(&mut compilation).unwrap());
    }

    #[test]
    fn conditionally_assigned_local_keeps_its_storage() {
        // if (true) { local0 = 1.0; } return local0; -- the untaken path must
        // still observe the zero-initialized local, not the assigned value.
        let root = Expression::Block(vec![
            Expression::If {
                condition: Expression::Constant(Constant::Bool(true)).into_ref(),
                then_body: Expression::Block(vec![Expression::Assign {
                    target: local(0),
                    value: Expression::Constant(Constant::Float32(1.0)).into_ref(),
                }
                .into_ref()])
                .into_ref(),
                else_body: None,
            }
            .into_ref(),
            Expression::Return(Some(local(0))).into_ref(),
        ])
        .into_ref();

        let mut compilation = compilation_with_root(root);
        assert!(!IntrinsicTypeVariableInlines.run(&mut compilation).unwrap());

        let Expression::Block(statements) = compilation.root.as_ref() else {
            panic!("expected block");
        };
        let Expression::Return(Some(value)) = statements[1].as_ref() else {
            panic!("expected return");
        };
        assert!(matches!(
            value.as_ref(),
            Expression::LocalVariable { slot: 0, .. }
        ));
    }

    #[test]
    fn read_ahead_of_the_definition_blocks_inlining() {
        // local0 = local1 + 1.0; local1 = 2.0; return local0; -- the read of
        // local1 precedes its assignment and sees the zero-initialized value.
        let root = Expression::Block(vec![
            Expression::Assign {
                target: local(0),
                value: Expression::Binary {
                    op: crate::ir::BinaryOp::Add,
                    left: local(1),
                    right: Expression::Constant(Constant::Float32(1.0)).into_ref(),
                }
                .into_ref(),
            }
            .into_ref(),
            Expression::Assign {
                target: local(1),
                value: Expression::Constant(Constant::Float32(2.0)).into_ref(),
            }
            .into_ref(),
            Expression::Return(Some(local(0))).into_ref(),
        ])
        .into_ref();

        let mut compilation = compilation_with_root(root);
        assert!(!IntrinsicTypeVariableInlines.run(&mut compilation).unwrap());
    }

    #[test]
    fn computed_value_is_not_duplicated() {
        let sum = Expression::Binary {
            op: crate::ir::BinaryOp::Add,
            left: Expression::Constant(Constant::Float32(1.0)).into_ref(),
            right: Expression::Constant(Constant::Float32(2.0)).into_ref(),
        }
        .into_ref();
        let root = Expression::Block(vec![
            Expression::Assign {
                target: local(1),
                value: sum,
            }
            .into_ref(),
            Expression::Return(Some(local(1))).into_ref(),
        ])
        .into_ref();

        let mut compilation = compilation_with_root(root);
        assert!(!IntrinsicTypeVariableInlines.run(&mut compilation).unwrap());
    }
}
