//! The shared expression tree.
//!
//! Expressions are reference counted ([`ExprRef`]) and structurally shared: passes
//! never mutate a node in place, they build replacement nodes and re-link parents.
//! Subtrees a rewrite leaves untouched keep their original `Arc`, which is what makes
//! the pass pipeline cheap on large method bodies.

use std::sync::Arc;

use crate::{
    codegen::Backend,
    ir::{
        entities::{CompiledMethod, CompiledVariable},
        types::{IntrinsicOp, ShaderType},
    },
    module::Token,
};

/// A reference-counted expression node.
pub type ExprRef = Arc<Expression>;

/// A literal constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    /// Boolean literal.
    Bool(bool),
    /// 32-bit signed integer literal.
    Int32(i32),
    /// 32-bit unsigned integer literal.
    UInt32(u32),
    /// 32-bit float literal.
    Float32(f32),
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Remainder.
    Rem,
    /// Logical or bitwise and.
    And,
    /// Logical or bitwise or.
    Or,
    /// Bitwise exclusive or.
    Xor,
    /// Left shift.
    Shl,
    /// Arithmetic right shift.
    Shr,
    /// Equality comparison.
    Eq,
    /// Inequality comparison.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl BinaryOp {
    /// Whether the operator yields a boolean.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// The comparison with swapped truth value, used when a conditional branch
    /// skips the then-arm and the condition must be inverted.
    #[must_use]
    pub fn negated(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::Eq => Some(BinaryOp::Ne),
            BinaryOp::Ne => Some(BinaryOp::Eq),
            BinaryOp::Lt => Some(BinaryOp::Ge),
            BinaryOp::Le => Some(BinaryOp::Gt),
            BinaryOp::Gt => Some(BinaryOp::Le),
            BinaryOp::Ge => Some(BinaryOp::Lt),
            _ => None,
        }
    }
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical negation.
    Not,
}

/// A resolved field reference, carrying the declaring type for later role lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    /// Token of the declaring type.
    pub declaring: Token,
    /// Field name as declared in the source module.
    pub name: String,
    /// The field's shader type.
    pub ty: ShaderType,
}

/// One node of the expression tree.
///
/// Statement-like nodes (`Block`, `Assign`, `If`, `While`, `Return`, ...) and
/// value-like nodes share the same enum; backends decide per node whether a
/// trailing `;` is emitted.
#[derive(Debug, Clone)]
pub enum Expression {
    /// A literal constant.
    Constant(Constant),

    /// A method-local variable slot.
    LocalVariable {
        /// Slot index within the method's local signature.
        slot: u16,
        /// The slot's declared type.
        ty: ShaderType,
    },

    /// A method parameter.
    MethodParameter {
        /// Zero-based parameter index, not counting the instance receiver.
        index: u16,
        /// Parameter name.
        name: String,
        /// Parameter type.
        ty: ShaderType,
    },

    /// The instance receiver (`this`) of a shader method.
    SelfReference,

    /// Field access on an object expression.
    MemberAccess {
        /// The object whose field is read or written.
        object: ExprRef,
        /// The accessed field.
        field: FieldRef,
    },

    /// A binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: ExprRef,
        /// Right operand.
        right: ExprRef,
    },

    /// A unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: ExprRef,
    },

    /// An ordered statement sequence.
    Block(Vec<ExprRef>),

    /// An assignment statement.
    Assign {
        /// Assignment target (local, member access, or compiled variable).
        target: ExprRef,
        /// Assigned value.
        value: ExprRef,
    },

    /// A structured conditional.
    If {
        /// Branch condition.
        condition: ExprRef,
        /// Taken when the condition is true.
        then_body: ExprRef,
        /// Taken when the condition is false, if present.
        else_body: Option<ExprRef>,
    },

    /// A structured pre-test loop.
    While {
        /// Loop condition, tested before each iteration.
        condition: ExprRef,
        /// Loop body.
        body: ExprRef,
    },

    /// A call to a method identified by token, not yet substituted.
    Call {
        /// Token of the called method.
        token: Token,
        /// Instance receiver, absent for static calls.
        receiver: Option<ExprRef>,
        /// Arguments in source order.
        arguments: Vec<ExprRef>,
    },

    /// A constructor invocation, not yet lowered.
    Construct {
        /// Token of the constructed type's constructor.
        token: Token,
        /// Constructor arguments in source order.
        arguments: Vec<ExprRef>,
    },

    /// A return statement, with the returned value if the method is non-void.
    Return(Option<ExprRef>),

    /// Loop break.
    Break,

    /// Loop continue.
    Continue,

    /// A jump label, used only when control flow cannot be raised structurally.
    Label(
        /// The label's name, unique within the method.
        String,
    ),

    /// An unconditional jump to a label.
    Goto(
        /// Name of the target label.
        String,
    ),

    /// A reference to a resolved shader interface variable.
    ///
    /// Produced by the variable-access pass from `MemberAccess` on the shader's
    /// own fields; carries the final linkage name the backend emits.
    CompiledVariable(
        /// The resolved variable.
        Arc<CompiledVariable>,
    ),

    /// A call whose callee has been resolved to a compiled helper function.
    CompiledCall {
        /// The resolved method.
        method: Arc<CompiledMethod>,
        /// Arguments in source order; an instance receiver has been folded in
        /// as the leading argument where applicable.
        arguments: Vec<ExprRef>,
    },

    /// A call resolved to a GPU intrinsic.
    IntrinsicCall {
        /// The intrinsic operation.
        op: IntrinsicOp,
        /// Arguments in source order.
        arguments: Vec<ExprRef>,
    },

    /// A fragment of backend-specific source text, inserted verbatim.
    ///
    /// Backends must refuse inline source tagged for a different backend.
    InlineSource {
        /// The backend this fragment is written for.
        backend: Backend,
        /// The verbatim source text.
        text: String,
    },
}

impl Expression {
    /// Short structural description, used in diagnostics.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Expression::Constant(_) => "Constant",
            Expression::LocalVariable { .. } => "LocalVariable",
            Expression::MethodParameter { .. } => "MethodParameter",
            Expression::SelfReference => "SelfReference",
            Expression::MemberAccess { .. } => "MemberAccess",
            Expression::Binary { .. } => "Binary",
            Expression::Unary { .. } => "Unary",
            Expression::Block(_) => "Block",
            Expression::Assign { .. } => "Assign",
            Expression::If { .. } => "If",
            Expression::While { .. } => "While",
            Expression::Call { .. } => "Call",
            Expression::Construct { .. } => "Construct",
            Expression::Return(_) => "Return",
            Expression::Break => "Break",
            Expression::Continue => "Continue",
            Expression::Label(_) => "Label",
            Expression::Goto(_) => "Goto",
            Expression::CompiledVariable(_) => "CompiledVariable",
            Expression::CompiledCall { .. } => "CompiledCall",
            Expression::IntrinsicCall { .. } => "IntrinsicCall",
            Expression::InlineSource { .. } => "InlineSource",
        }
    }

    /// Wraps this expression in an [`ExprRef`].
    #[must_use]
    pub fn into_ref(self) -> ExprRef {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negated_comparisons() {
        assert_eq!(BinaryOp::Lt.negated(), Some(BinaryOp::Ge));
        assert_eq!(BinaryOp::Eq.negated(), Some(BinaryOp::Ne));
        assert_eq!(BinaryOp::Add.negated(), None);
    }

    #[test]
    fn shared_subtrees_compare_by_pointer() {
        let shared = Expression::Constant(Constant::Float32(1.0)).into_ref();
        let a = Expression::Unary {
            op: UnaryOp::Neg,
            operand: Arc::clone(&shared),
        }
        .into_ref();

        let Expression::Unary { operand, .. } = a.as_ref() else {
            panic!("expected unary");
        };
        assert!(Arc::ptr_eq(operand, &shared));
    }
}
