//! The shared C-like statement and expression emitter.
//!
//! HLSL, GLSL, and MSL share statement syntax almost entirely; what differs is
//! type names, intrinsic names, how interface variables are reached, and a few
//! capability gaps (GLSL and HLSL have no `goto`). Each backend supplies those
//! differences through [`Dialect`] and reuses everything here.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::{
    codegen::Backend,
    ir::{
        BinaryOp, CompiledMethod, CompiledVariable, Constant, ExprRef, Expression,
        ExpressionRewriter, IntrinsicOp, ShaderType, UnaryOp,
    },
    module::builtin_type,
    Result,
};

/// How a backend renders the matrix-multiply intrinsic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatrixMultiplyStyle {
    /// `mul(m, v)` function call.
    MulCall,
    /// `(m * v)` operator, canonical operand order.
    MatTimesVec,
    /// `(v * m)` operator; the target's matrix memory layout is transposed
    /// relative to the IR's convention, so the operands swap.
    VecTimesMat,
}

/// The per-target syntax a backend supplies to the shared emitter.
pub(crate) trait Dialect {
    fn backend(&self) -> Backend;

    /// The target's spelling of a type.
    fn type_name(&self, ty: &ShaderType) -> Result<String>;

    /// The target's name for an intrinsic other than matrix multiply and
    /// texture sampling.
    fn intrinsic_name(&self, op: IntrinsicOp) -> &'static str;

    fn matrix_multiply(&self) -> MatrixMultiplyStyle;

    /// Renders a texture sample from (texture, sampler, coordinates).
    fn sample(&self, texture: &str, sampler: &str, coords: &str) -> String;

    /// How an interface variable is reached from the current function.
    fn variable(&self, variable: &CompiledVariable, in_entry: bool) -> Result<String>;

    /// Whether the target supports `goto`, needed for unstructured fallback
    /// bodies.
    fn supports_goto(&self) -> bool {
        false
    }

    /// An extra parameter appended to every helper function signature, used by
    /// MSL to thread the uniform block through.
    fn extra_parameter(&self) -> Option<&'static str> {
        None
    }

    /// The matching extra argument appended at helper call sites.
    fn extra_argument(&self) -> Option<&'static str> {
        None
    }
}

/// An indentation-aware source text builder.
pub(crate) struct SourceWriter {
    out: String,
    indent: usize,
}

impl SourceWriter {
    pub(crate) fn new() -> Self {
        SourceWriter {
            out: String::new(),
            indent: 0,
        }
    }

    pub(crate) fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub(crate) fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Writes `header {` and indents.
    pub(crate) fn open(&mut self, header: &str) {
        self.line(&format!("{header} {{"));
        self.indent += 1;
    }

    /// Dedents and writes the closing delimiter (`}` or `};`).
    pub(crate) fn close(&mut self, delimiter: &str) {
        self.indent -= 1;
        self.line(delimiter);
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

/// Emits statements and expressions for one function body.
pub(crate) struct Emitter<'a, D: Dialect> {
    pub(crate) dialect: &'a D,
    /// Whether the body belongs to the wrapped entry point. Stage IO access is
    /// only well-defined there for targets without global stage variables.
    pub(crate) in_entry: bool,
    /// The expression a bare `return` returns in this body, if any (the output
    /// aggregate local of a wrapped entry point).
    pub(crate) entry_return: Option<&'a str>,
}

impl<D: Dialect> Emitter<'_, D> {
    fn unmapped(&self, node: &Expression) -> crate::Error {
        crate::Error::UnmappedNode {
            backend: self.dialect.backend().name(),
            node: node.describe().to_string(),
        }
    }

    /// Declares the body's local slots and emits its statements.
    pub(crate) fn body(&self, w: &mut SourceWriter, body: &ExprRef) -> Result<()> {
        for (slot, ty) in collect_locals(body)? {
            let name = self.dialect.type_name(&ty)?;
            w.line(&format!("{name} local{slot};"));
        }
        self.statement(w, body)
    }

    pub(crate) fn statement(&self, w: &mut SourceWriter, expr: &ExprRef) -> Result<()> {
        match expr.as_ref() {
            Expression::Block(statements) => {
                for statement in statements {
                    self.statement(w, statement)?;
                }
            }
            Expression::Assign { target, value } => {
                let target = self.expression(target)?;
                let value = self.expression(value)?;
                w.line(&format!("{target} = {value};"));
            }
            Expression::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.expression(condition)?;
                w.open(&format!("if ({condition})"));
                self.statement(w, then_body)?;
                if let Some(else_body) = else_body {
                    w.close("} else {");
                    w.indent += 1;
                    self.statement(w, else_body)?;
                }
                w.close("}");
            }
            Expression::While { condition, body } => {
                let condition = self.expression(condition)?;
                w.open(&format!("while ({condition})"));
                self.statement(w, body)?;
                w.close("}");
            }
            Expression::Return(Some(value)) => {
                let value = self.expression(value)?;
                w.line(&format!("return {value};"));
            }
            Expression::Return(None) => match self.entry_return {
                Some(name) => w.line(&format!("return {name};")),
                None => w.line("return;"),
            },
            Expression::Break => w.line("break;"),
            Expression::Continue => w.line("continue;"),
            Expression::Label(name) => {
                if !self.dialect.supports_goto() {
                    return Err(self.unmapped(expr));
                }
                w.line(&format!("{name}:;"));
            }
            Expression::Goto(name) => {
                if !self.dialect.supports_goto() {
                    return Err(self.unmapped(expr));
                }
                w.line(&format!("goto {name};"));
            }
            Expression::InlineSource { backend, text } => {
                if *backend != self.dialect.backend() {
                    return Err(crate::Error::UnmappedNode {
                        backend: self.dialect.backend().name(),
                        node: format!("InlineSource({})", backend.name()),
                    });
                }
                for line in text.lines() {
                    w.line(line);
                }
            }
            // Expression statements, e.g. a call kept for its side effects.
            Expression::CompiledCall { .. } | Expression::IntrinsicCall { .. } => {
                let value = self.expression(expr)?;
                w.line(&format!("{value};"));
            }
            _ => return Err(self.unmapped(expr)),
        }
        Ok(())
    }

    pub(crate) fn expression(&self, expr: &ExprRef) -> Result<String> {
        match expr.as_ref() {
            Expression::Constant(constant) => Ok(constant_text(*constant)),
            Expression::LocalVariable { slot, .. } => Ok(format!("local{slot}")),
            Expression::MethodParameter { name, .. } => Ok(name.clone()),
            Expression::CompiledVariable(variable) => {
                self.dialect.variable(variable, self.in_entry)
            }
            Expression::MemberAccess { object, field } => {
                let object = self.expression(object)?;
                // Builtin vector components print as single lowercase swizzle
                // letters on every target.
                let member = if builtin_type(field.declaring).is_some() {
                    field.name.to_lowercase()
                } else {
                    field.name.clone()
                };
                Ok(format!("{object}.{member}"))
            }
            Expression::Binary { op, left, right } => {
                let left = self.expression(left)?;
                let right = self.expression(right)?;
                Ok(format!("({left} {} {right})", binary_op_text(*op)))
            }
            Expression::Unary { op, operand } => {
                let operand = self.expression(operand)?;
                match op {
                    UnaryOp::Neg => Ok(format!("(-{operand})")),
                    UnaryOp::Not => Ok(format!("(!{operand})")),
                }
            }
            Expression::CompiledCall { method, arguments } => {
                let mut rendered = Vec::with_capacity(arguments.len() + 1);
                for argument in arguments {
                    rendered.push(self.expression(argument)?);
                }
                if let Some(extra) = self.dialect.extra_argument() {
                    rendered.push(extra.to_string());
                }
                Ok(format!("{}({})", method.name, rendered.join(", ")))
            }
            Expression::IntrinsicCall { op, arguments } => self.intrinsic(*op, arguments),
            Expression::InlineSource { backend, text } => {
                if *backend != self.dialect.backend() {
                    return Err(crate::Error::UnmappedNode {
                        backend: self.dialect.backend().name(),
                        node: format!("InlineSource({})", backend.name()),
                    });
                }
                Ok(text.clone())
            }
            _ => Err(self.unmapped(expr)),
        }
    }

    fn intrinsic(&self, op: IntrinsicOp, arguments: &[ExprRef]) -> Result<String> {
        // Host-captured trees can carry malformed calls the pipeline never
        // built itself.
        if arguments.len() != op.arity() {
            return Err(crate::Error::UnmappedNode {
                backend: self.dialect.backend().name(),
                node: format!("{op} with {} argument(s)", arguments.len()),
            });
        }

        let mut rendered = Vec::with_capacity(arguments.len());
        for argument in arguments {
            rendered.push(self.expression(argument)?);
        }

        match op {
            IntrinsicOp::MatrixMultiply => {
                let (m, v) = (&rendered[0], &rendered[1]);
                Ok(match self.dialect.matrix_multiply() {
                    MatrixMultiplyStyle::MulCall => format!("mul({m}, {v})"),
                    MatrixMultiplyStyle::MatTimesVec => format!("({m} * {v})"),
                    MatrixMultiplyStyle::VecTimesMat => format!("({v} * {m})"),
                })
            }
            IntrinsicOp::SampleTexture => Ok(self
                .dialect
                .sample(&rendered[0], &rendered[1], &rendered[2])),
            _ => Ok(format!(
                "{}({})",
                self.dialect.intrinsic_name(op),
                rendered.join(", ")
            )),
        }
    }
}

/// Prints a helper method as an ordinary function.
pub(crate) fn function<D: Dialect>(
    w: &mut SourceWriter,
    dialect: &D,
    method: &CompiledMethod,
) -> Result<()> {
    let mut parameters = Vec::with_capacity(method.parameters.len() + 1);
    for (name, ty) in &method.parameters {
        parameters.push(format!("{} {name}", dialect.type_name(ty)?));
    }
    if let Some(extra) = dialect.extra_parameter() {
        parameters.push(extra.to_string());
    }

    let return_type = dialect.type_name(&method.return_type)?;
    w.open(&format!(
        "{return_type} {}({})",
        method.name,
        parameters.join(", ")
    ));

    let emitter = Emitter {
        dialect,
        in_entry: false,
        entry_return: None,
    };
    emitter.body(w, &method.body)?;
    w.close("}");
    Ok(())
}

/// Whether a body's trailing statement is a return, so entry wrappers know if
/// they must append one.
pub(crate) fn ends_with_return(body: &ExprRef) -> bool {
    match body.as_ref() {
        Expression::Return(_) => true,
        Expression::Block(statements) => statements.last().is_some_and(ends_with_return),
        _ => false,
    }
}

fn constant_text(constant: Constant) -> String {
    match constant {
        Constant::Bool(value) => value.to_string(),
        Constant::Int32(value) => value.to_string(),
        Constant::UInt32(value) => format!("{value}u"),
        Constant::Float32(value) => {
            if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e9 {
                format!("{value:.1}")
            } else {
                let mut text = String::new();
                let _ = write!(text, "{value}");
                text
            }
        }
    }
}

fn binary_op_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::And => "&",
        BinaryOp::Or => "|",
        BinaryOp::Xor => "^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
    }
}

/// Every local slot a body touches, with its declared type, in slot order.
fn collect_locals(body: &ExprRef) -> Result<BTreeMap<u16, ShaderType>> {
    struct Locals(BTreeMap<u16, ShaderType>);
    impl ExpressionRewriter for Locals {
        fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
            if let Expression::LocalVariable { slot, ty } = expr.as_ref() {
                self.0.insert(*slot, ty.clone());
            }
            self.rewrite_children(expr)
        }
    }

    let mut locals = Locals(BTreeMap::new());
    locals.rewrite(body)?;
    Ok(locals.0)
}
