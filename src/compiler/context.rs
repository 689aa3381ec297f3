//! Per-compile state shared by the pass pipeline.
//!
//! A [`ShaderCompilation`] is created per (module, shader kind, backend) key and
//! lives for exactly one pipeline run. It owns the entry method's expression tree
//! plus the growing dependency closure: helper methods, plain-data structs, and
//! interface variables discovered while rewriting. Compiles are single-threaded;
//! parallelism exists only across distinct cache keys.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    codegen::Backend,
    compiler::structurer::structure_method,
    ir::{CompiledMethod, CompiledStruct, CompiledVariable, ExprRef, ShaderKind},
    module::{FieldDef, ShaderModule, Token},
    Result,
};

/// The mutable state of one shader compile.
#[derive(Debug)]
pub struct ShaderCompilation {
    module: Arc<ShaderModule>,
    kind: ShaderKind,
    backend: Backend,
    /// The entry method's tree, rewritten in place by the pipeline.
    pub root: ExprRef,
    /// Helper methods in emission order (dependencies before dependents).
    pub methods: Vec<Arc<CompiledMethod>>,
    method_index: HashMap<Token, usize>,
    /// Plain-data structs in emission order.
    pub structs: Vec<Arc<CompiledStruct>>,
    struct_index: HashMap<Token, usize>,
    /// Interface variables in field declaration order.
    pub variables: Vec<Arc<CompiledVariable>>,
    variable_index: HashMap<String, usize>,
}

impl ShaderCompilation {
    /// Structures the entry method for `kind` and prepares empty closure state.
    ///
    /// # Errors
    ///
    /// Fails when the module has no entry point for `kind` or its body cannot
    /// be disassembled and structured.
    pub fn new(module: Arc<ShaderModule>, kind: ShaderKind, backend: Backend) -> Result<Self> {
        let entry = module.entry_point(kind)?;
        let root = structure_method(&module, entry)?;

        Ok(ShaderCompilation {
            module,
            kind,
            backend,
            root,
            methods: Vec::new(),
            method_index: HashMap::new(),
            structs: Vec::new(),
            struct_index: HashMap::new(),
            variables: Vec::new(),
            variable_index: HashMap::new(),
        })
    }

    /// The source module.
    #[must_use]
    pub fn module(&self) -> &Arc<ShaderModule> {
        &self.module
    }

    /// The pipeline stage being compiled.
    #[must_use]
    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    /// The backend this compile targets.
    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// The compiled helper for a method token, if registered.
    #[must_use]
    pub fn compiled_method(&self, token: Token) -> Option<&Arc<CompiledMethod>> {
        self.method_index.get(&token).map(|&i| &self.methods[i])
    }

    /// Registers a compiled helper method. Later registrations replace the
    /// stored entry but keep its emission position.
    pub fn add_method(&mut self, method: Arc<CompiledMethod>) {
        if let Some(&index) = self.method_index.get(&method.token) {
            self.methods[index] = method;
        } else {
            self.method_index.insert(method.token, self.methods.len());
            self.methods.push(method);
        }
    }

    /// The compiled struct for a type token, if registered.
    #[must_use]
    pub fn compiled_struct(&self, token: Token) -> Option<&Arc<CompiledStruct>> {
        self.struct_index.get(&token).map(|&i| &self.structs[i])
    }

    /// Registers a plain-data struct for emission.
    pub fn add_struct(&mut self, def: Arc<CompiledStruct>) {
        if !self.struct_index.contains_key(&def.token) {
            self.struct_index.insert(def.token, self.structs.len());
            self.structs.push(def);
        }
    }

    /// The interface variable for a field, created on first use.
    pub fn variable_for(&mut self, field: &FieldDef) -> Arc<CompiledVariable> {
        let name = field.linkage_name().to_string();
        if let Some(&index) = self.variable_index.get(&name) {
            return Arc::clone(&self.variables[index]);
        }

        let variable = Arc::new(CompiledVariable {
            name: name.clone(),
            ty: field.ty.clone(),
            // Roles are always resolved by module validation.
            role: field.role.unwrap_or(crate::ir::VariableRole::Uniform),
            semantic: field.semantic,
            interpolation: field.interpolation,
        });
        self.variable_index.insert(name, self.variables.len());
        self.variables.push(Arc::clone(&variable));
        variable
    }

    /// The registered variable with the given linkage name, if any.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Arc<CompiledVariable>> {
        self.variable_index.get(name).map(|&i| &self.variables[i])
    }
}
