//! Dependency closure over called methods and used struct types.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    compiler::{context::ShaderCompilation, pass::CompilerPass, structurer::structure_method},
    ir::{CompiledMethod, CompiledStruct, ExprRef, Expression, ExpressionRewriter, ShaderType},
    module::{builtin_type, MethodDef, ShaderModule, Token},
    Result,
};

/// Call-graph depth limit; deeper chains and any cycle are rejected.
const MAX_DEPTH: usize = 32;

/// Closes the compilation over everything the entry method reaches: every
/// called method gets structured and registered as a helper (dependencies
/// before dependents), and every plain-data struct that appears in a type
/// position gets scheduled for emission. Iterates to a fixed point because a
/// newly structured helper body can name methods and structs of its own.
pub struct DependencyResolver;

impl CompilerPass for DependencyResolver {
    fn name(&self) -> &'static str {
        "dependency-resolver"
    }

    fn run(&self, compilation: &mut ShaderCompilation) -> Result<bool> {
        let module = Arc::clone(compilation.module());
        let initial = (compilation.methods.len(), compilation.structs.len());

        // Struct-typed interface fields need a layout even when no tree
        // references the struct.
        for field in module.fields() {
            if let ShaderType::Struct(token) = &field.ty {
                register_struct(compilation, &module, *token)?;
            }
        }

        loop {
            let mut scan = Scan::default();
            let root = Arc::clone(&compilation.root);
            scan.rewrite(&root)?;
            for method in compilation.methods.clone() {
                scan.rewrite(&method.body)?;
            }

            let before = (compilation.methods.len(), compilation.structs.len());

            for token in &scan.calls {
                if module.intrinsic(*token).is_none() {
                    let mut stack = Vec::new();
                    build_method(compilation, &module, *token, &mut stack)?;
                }
            }
            for token in &scan.constructs {
                // A construct names either the constructor method or (for
                // zero-fill initialization) the type itself.
                let declaring = if token.table() == 0x06 {
                    module.method(*token)?.declaring_type
                } else {
                    *token
                };
                register_struct(compilation, &module, declaring)?;
            }
            for token in &scan.types {
                register_struct(compilation, &module, *token)?;
            }

            let after = (compilation.methods.len(), compilation.structs.len());
            if after == before {
                break;
            }
        }

        Ok((compilation.methods.len(), compilation.structs.len()) != initial)
    }
}

/// Read-only tree scan collecting tokens that create dependencies.
#[derive(Default)]
struct Scan {
    calls: BTreeSet<Token>,
    constructs: BTreeSet<Token>,
    types: BTreeSet<Token>,
}

impl Scan {
    fn collect_type(&mut self, ty: &ShaderType) {
        if let ShaderType::Struct(token) = ty {
            self.types.insert(*token);
        }
    }
}

impl ExpressionRewriter for Scan {
    fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        match expr.as_ref() {
            Expression::Call { token, .. } => {
                self.calls.insert(*token);
            }
            Expression::Construct { token, .. } => {
                self.constructs.insert(*token);
            }
            Expression::LocalVariable { ty, .. } | Expression::MethodParameter { ty, .. } => {
                self.collect_type(ty);
            }
            Expression::MemberAccess { field, .. } => {
                self.collect_type(&field.ty);
            }
            _ => {}
        }
        self.rewrite_children(expr)
    }
}

/// Structures and registers one helper method, recursing into its callees
/// first so the emission order lists dependencies before dependents.
fn build_method(
    compilation: &mut ShaderCompilation,
    module: &Arc<ShaderModule>,
    token: Token,
    stack: &mut Vec<Token>,
) -> Result<()> {
    if compilation.compiled_method(token).is_some() {
        return Ok(());
    }
    if stack.contains(&token) || stack.len() >= MAX_DEPTH {
        return Err(crate::Error::RecursionLimit(stack.len()));
    }
    stack.push(token);

    let def = Arc::clone(module.method(token)?);
    if def.is_constructor {
        // Constructors never become helper functions; they are lowered to
        // field assignments at their call sites.
        stack.pop();
        return Ok(());
    }

    let raw = structure_method(module, &def)?;

    let mut scan = Scan::default();
    scan.rewrite(&raw)?;
    for callee in &scan.calls {
        if module.intrinsic(*callee).is_none() {
            build_method(compilation, module, *callee, stack)?;
        }
    }
    for ty in &scan.types {
        register_struct(compilation, module, *ty)?;
    }

    // The signature can name struct types the body never touches; the emitted
    // function signature still needs their definitions.
    for param in &def.signature.parameters {
        if let ShaderType::Struct(token) = &param.ty {
            register_struct(compilation, module, *token)?;
        }
    }
    if let ShaderType::Struct(token) = &def.signature.return_type {
        register_struct(compilation, module, *token)?;
    }
    register_struct(compilation, module, def.declaring_type)?;

    let compiled = fold_receiver(module, &def, raw)?;
    compilation.add_method(Arc::new(compiled));

    stack.pop();
    Ok(())
}

/// Builds the [`CompiledMethod`]: an instance method on a data struct gets its
/// receiver folded in as a leading `_self` parameter; methods on the shader
/// type keep their parameter list because shader fields become globals.
fn fold_receiver(
    module: &Arc<ShaderModule>,
    def: &MethodDef,
    body: ExprRef,
) -> Result<CompiledMethod> {
    let declaring_is_shader = module.is_shader_type(def.declaring_type);
    let name = match module.try_struct(def.declaring_type) {
        Some(owner) if !declaring_is_shader => format!("{}_{}", owner.name, def.name),
        _ => def.name.clone(),
    };

    let (body, parameters) = if !def.signature.is_static && !declaring_is_shader {
        let mut fold = ReceiverFold {
            declaring: def.declaring_type,
        };
        let body = fold.rewrite(&body)?;
        let mut parameters = vec![(
            "_self".to_string(),
            ShaderType::Struct(def.declaring_type),
        )];
        parameters.extend(
            def.signature
                .parameters
                .iter()
                .map(|p| (p.name.clone(), p.ty.clone())),
        );
        (body, parameters)
    } else {
        let parameters = def
            .signature
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.ty.clone()))
            .collect();
        (body, parameters)
    };

    Ok(CompiledMethod {
        token: def.token,
        name,
        return_type: def.signature.return_type.clone(),
        parameters,
        body,
    })
}

/// Rewrites `self` into parameter zero and shifts the original parameters up.
struct ReceiverFold {
    declaring: Token,
}

impl ExpressionRewriter for ReceiverFold {
    fn rewrite(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        match expr.as_ref() {
            Expression::SelfReference => Ok(Expression::MethodParameter {
                index: 0,
                name: "_self".to_string(),
                ty: ShaderType::Struct(self.declaring),
            }
            .into_ref()),
            Expression::MethodParameter { index, name, ty } => Ok(Expression::MethodParameter {
                index: index + 1,
                name: name.clone(),
                ty: ty.clone(),
            }
            .into_ref()),
            _ => self.rewrite_children(expr),
        }
    }
}

/// Schedules a struct (and its nested structs, first) for emission.
fn register_struct(
    compilation: &mut ShaderCompilation,
    module: &Arc<ShaderModule>,
    token: Token,
) -> Result<()> {
    if module.is_shader_type(token)
        || builtin_type(token).is_some()
        || compilation.compiled_struct(token).is_some()
    {
        return Ok(());
    }

    let def = Arc::clone(module.struct_def(token)?);
    for (_, ty) in &def.fields {
        if let ShaderType::Struct(inner) = ty {
            register_struct(compilation, module, *inner)?;
        }
    }

    compilation.add_struct(Arc::new(CompiledStruct {
        token,
        name: def.name.clone(),
        fields: def.fields.clone(),
    }));
    Ok(())
}
