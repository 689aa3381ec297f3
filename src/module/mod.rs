//! The source module: everything the compiler knows about the host program.
//!
//! A [`ShaderModule`] is an immutable, validated snapshot of one shader class and
//! its dependency universe: method definitions (expression trees or raw bytecode),
//! plain-data struct definitions, the shader's interface fields, intrinsic call
//! mappings, and the entry point per pipeline stage. It is built through
//! [`ShaderModuleBuilder`], which performs all structural validation up front so
//! compilation never meets a reference type, a cyclic struct, or a roleless field.
//!
//! # Key Types
//! - [`ShaderModule`] / [`ShaderModuleBuilder`] - The validated module and its builder
//! - [`MethodDef`] / [`MethodBody`] - Methods with tree or bytecode bodies
//! - [`FieldDef`] - Interface fields with roles, semantics, and linkage names
//! - [`Token`] - Metadata tokens identifying methods, fields, and types

mod stdlib;
mod token;

pub use stdlib::{
    builtin_type, component_token, intrinsic_token, COLORF_CTOR, COLORF_TOKEN, MATRIX_TOKEN,
    VECTOR2_CTOR, VECTOR2_TOKEN, VECTOR3_CTOR, VECTOR3_TOKEN, VECTOR4_CTOR, VECTOR4_TOKEN,
};
pub use token::Token;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::{
    disassembler::MethodDisassembly,
    ir::{
        BuiltinSemantic, ExprRef, FieldRef, InterpolationMode, IntrinsicOp, ShaderKind, ShaderType,
        VariableRole,
    },
    Result,
};

/// One parameter of a method signature.
#[derive(Debug, Clone)]
pub struct ParamDef {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    pub ty: ShaderType,
}

/// A method signature as registered by the host.
#[derive(Debug, Clone)]
pub struct MethodSignature {
    /// Whether the method has no instance receiver.
    pub is_static: bool,
    /// Return type ([`ShaderType::Void`] for none).
    pub return_type: ShaderType,
    /// Parameters in declaration order, not counting the receiver.
    pub parameters: Vec<ParamDef>,
}

/// The body of a registered method.
#[derive(Debug, Clone)]
pub enum MethodBody {
    /// An expression tree captured directly by the host.
    Tree(ExprRef),
    /// Raw CIL bytecode, disassembled and structured on demand.
    Bytecode(Vec<u8>),
}

/// A method definition.
#[derive(Debug)]
pub struct MethodDef {
    /// The method's metadata token.
    pub token: Token,
    /// Method name.
    pub name: String,
    /// Token of the declaring type.
    pub declaring_type: Token,
    /// Whether this is an instance constructor.
    pub is_constructor: bool,
    /// The registered signature.
    pub signature: MethodSignature,
    /// Local variable slot types, in slot order. Only meaningful for
    /// bytecode bodies.
    pub locals: Vec<ShaderType>,
    /// The method body.
    pub body: MethodBody,
    /// Memoized disassembly of a bytecode body.
    disassembly: OnceLock<Arc<MethodDisassembly>>,
}

impl MethodDef {
    /// The disassembled bytecode body, computed once and cached.
    ///
    /// # Errors
    ///
    /// Returns the decoding error for damaged bytecode, or a generic error if
    /// the method has a tree body and nothing to disassemble.
    pub fn disassembly(&self) -> Result<Arc<MethodDisassembly>> {
        if let Some(disasm) = self.disassembly.get() {
            return Ok(Arc::clone(disasm));
        }

        let MethodBody::Bytecode(code) = &self.body else {
            return Err(crate::Error::Error(format!(
                "Method {} has a tree body and cannot be disassembled",
                self.token
            )));
        };

        let disasm = Arc::new(MethodDisassembly::from_bytecode(code)?);
        // A concurrent first call may have won the race; either value is
        // identical in content.
        let _ = self.disassembly.set(Arc::clone(&disasm));
        Ok(disasm)
    }
}

/// A plain-data struct definition.
#[derive(Debug, Clone)]
pub struct StructDef {
    /// The type's metadata token.
    pub token: Token,
    /// Struct name.
    pub name: String,
    /// Fields in declaration order. Declaration order is layout order.
    pub fields: Vec<(String, ShaderType)>,
}

/// An interface field of the shader type.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// The field's metadata token.
    pub token: Token,
    /// Field name as declared.
    pub name: String,
    /// Field type.
    pub ty: ShaderType,
    /// Uniform, Input, or Output. Inferred from the builtin semantic when the
    /// host leaves it unset; a field with neither is rejected at build time.
    pub role: Option<VariableRole>,
    /// Pipeline builtin this field maps to, if any.
    pub semantic: Option<BuiltinSemantic>,
    /// Override for the name emitted into generated source.
    pub linkage_name: Option<String>,
    /// Interpolation mode for varyings.
    pub interpolation: InterpolationMode,
}

impl FieldDef {
    /// The name this field links as in generated source.
    #[must_use]
    pub fn linkage_name(&self) -> &str {
        self.linkage_name.as_deref().unwrap_or(&self.name)
    }
}

/// An immutable, validated source module.
#[derive(Debug)]
pub struct ShaderModule {
    name: String,
    shader_type: Token,
    methods: HashMap<Token, Arc<MethodDef>>,
    structs: HashMap<Token, Arc<StructDef>>,
    fields: Vec<FieldDef>,
    field_refs: HashMap<Token, FieldRef>,
    intrinsics: HashMap<Token, IntrinsicOp>,
    entry_points: HashMap<ShaderKind, Token>,
}

impl ShaderModule {
    /// Starts building a module with the given name and shader type token.
    #[must_use]
    pub fn builder(name: &str, shader_type: Token) -> ShaderModuleBuilder {
        ShaderModuleBuilder::new(name, shader_type)
    }

    /// The module name, used as part of the compilation cache key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token of the shader's declaring type.
    #[must_use]
    pub fn shader_type(&self) -> Token {
        self.shader_type
    }

    /// Looks up a method definition.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnresolvedToken`] for unknown tokens.
    pub fn method(&self, token: Token) -> Result<&Arc<MethodDef>> {
        self.methods
            .get(&token)
            .ok_or(crate::Error::UnresolvedToken(token))
    }

    /// Looks up a method definition without failing.
    #[must_use]
    pub fn try_method(&self, token: Token) -> Option<&Arc<MethodDef>> {
        self.methods.get(&token)
    }

    /// Looks up a struct definition.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnresolvedToken`] for unknown tokens.
    pub fn struct_def(&self, token: Token) -> Result<&Arc<StructDef>> {
        self.structs
            .get(&token)
            .ok_or(crate::Error::UnresolvedToken(token))
    }

    /// Looks up a struct definition without failing.
    #[must_use]
    pub fn try_struct(&self, token: Token) -> Option<&Arc<StructDef>> {
        self.structs.get(&token)
    }

    /// The intrinsic a method token maps to, if any.
    #[must_use]
    pub fn intrinsic(&self, token: Token) -> Option<IntrinsicOp> {
        self.intrinsics.get(&token).copied()
    }

    /// The shader type's interface fields, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// The interface field with the given name, if any.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The entry point method for a pipeline stage.
    ///
    /// # Errors
    ///
    /// Returns a generic error when no entry point is registered for `kind`.
    pub fn entry_point(&self, kind: ShaderKind) -> Result<&Arc<MethodDef>> {
        let token = self.entry_points.get(&kind).ok_or_else(|| {
            crate::Error::Error(format!("Module '{}' has no {kind} entry point", self.name))
        })?;
        self.method(*token)
    }

    /// Whether `token` is the shader's own declaring type.
    #[must_use]
    pub fn is_shader_type(&self, token: Token) -> bool {
        token == self.shader_type
    }

    /// Resolves a field token to the field it names.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnresolvedToken`] for unknown tokens.
    pub fn field_ref(&self, token: Token) -> Result<&FieldRef> {
        self.field_refs
            .get(&token)
            .ok_or(crate::Error::UnresolvedToken(token))
    }
}

/// Builder for [`ShaderModule`], performing structural validation on finish.
#[derive(Debug)]
pub struct ShaderModuleBuilder {
    name: String,
    shader_type: Token,
    methods: HashMap<Token, Arc<MethodDef>>,
    structs: HashMap<Token, Arc<StructDef>>,
    fields: Vec<FieldDef>,
    field_refs: HashMap<Token, FieldRef>,
    intrinsics: HashMap<Token, IntrinsicOp>,
    entry_points: HashMap<ShaderKind, Token>,
}

impl ShaderModuleBuilder {
    fn new(name: &str, shader_type: Token) -> Self {
        let mut builder = ShaderModuleBuilder {
            name: name.to_string(),
            shader_type,
            methods: HashMap::new(),
            structs: HashMap::new(),
            fields: Vec::new(),
            field_refs: HashMap::new(),
            intrinsics: HashMap::new(),
            entry_points: HashMap::new(),
        };
        stdlib::register(&mut builder);
        builder
    }

    /// Registers a method definition.
    #[must_use]
    pub fn method(
        mut self,
        token: Token,
        name: &str,
        declaring_type: Token,
        signature: MethodSignature,
        locals: Vec<ShaderType>,
        body: MethodBody,
    ) -> Self {
        self.insert_method(token, name, declaring_type, false, signature, locals, body);
        self
    }

    /// Registers an instance constructor.
    #[must_use]
    pub fn constructor(
        mut self,
        token: Token,
        declaring_type: Token,
        signature: MethodSignature,
        body: MethodBody,
    ) -> Self {
        self.insert_method(
            token,
            ".ctor",
            declaring_type,
            true,
            signature,
            Vec::new(),
            body,
        );
        self
    }

    pub(crate) fn insert_method(
        &mut self,
        token: Token,
        name: &str,
        declaring_type: Token,
        is_constructor: bool,
        signature: MethodSignature,
        locals: Vec<ShaderType>,
        body: MethodBody,
    ) {
        self.methods.insert(
            token,
            Arc::new(MethodDef {
                token,
                name: name.to_string(),
                declaring_type,
                is_constructor,
                signature,
                locals,
                body,
                disassembly: OnceLock::new(),
            }),
        );
    }

    /// Registers a plain-data struct.
    #[must_use]
    pub fn struct_def(mut self, token: Token, name: &str, fields: Vec<(String, ShaderType)>) -> Self {
        self.insert_struct(token, name, fields);
        self
    }

    pub(crate) fn insert_struct(
        &mut self,
        token: Token,
        name: &str,
        fields: Vec<(String, ShaderType)>,
    ) {
        self.structs.insert(
            token,
            Arc::new(StructDef {
                token,
                name: name.to_string(),
                fields,
            }),
        );
    }

    /// Registers an interface field of the shader type.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Registers the token of a struct field so bytecode field accesses resolve.
    #[must_use]
    pub fn data_field(mut self, token: Token, declaring: Token, name: &str, ty: ShaderType) -> Self {
        self.insert_field_ref(token, declaring, name, ty);
        self
    }

    pub(crate) fn insert_field_ref(
        &mut self,
        token: Token,
        declaring: Token,
        name: &str,
        ty: ShaderType,
    ) {
        self.field_refs.insert(
            token,
            FieldRef {
                declaring,
                name: name.to_string(),
                ty,
            },
        );
    }

    /// Maps a method token onto a GPU intrinsic.
    #[must_use]
    pub fn intrinsic(mut self, token: Token, op: IntrinsicOp) -> Self {
        self.insert_intrinsic(token, op);
        self
    }

    pub(crate) fn insert_intrinsic(&mut self, token: Token, op: IntrinsicOp) {
        self.intrinsics.insert(token, op);
    }

    /// Registers the entry point for a pipeline stage.
    #[must_use]
    pub fn entry_point(mut self, kind: ShaderKind, token: Token) -> Self {
        self.entry_points.insert(kind, token);
        self
    }

    /// Validates and freezes the module.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::ReferenceType`] when any signature, field, or local
    ///   slot carries a reference type
    /// - [`crate::Error::ShaderTypeAsData`] when the shader's own type appears
    ///   as ordinary data
    /// - [`crate::Error::RolelessField`] for interface fields with neither a
    ///   role nor a builtin semantic
    /// - [`crate::Error::CyclicStruct`] for self-containing aggregates
    /// - [`crate::Error::UnresolvedToken`] for entry points naming unknown methods
    pub fn finish(mut self) -> Result<Arc<ShaderModule>> {
        for method in self.methods.values() {
            self.check_data_type(&method.signature.return_type, &method.name)?;
            for param in &method.signature.parameters {
                self.check_data_type(&param.ty, &param.name)?;
            }
            for local in &method.locals {
                self.check_data_type(local, &method.name)?;
            }
        }

        for field in &mut self.fields {
            if field.ty.is_reference() {
                return Err(crate::Error::ReferenceType(field.name.clone()));
            }
            if field.role.is_none() {
                // Builtins imply a direction: Position is written, the index
                // builtins are read.
                field.role = match field.semantic {
                    Some(BuiltinSemantic::Position) => Some(VariableRole::Output),
                    Some(_) => Some(VariableRole::Input),
                    None => return Err(crate::Error::RolelessField(field.name.clone())),
                };
            }
        }

        for field in &self.fields {
            self.field_refs.insert(
                field.token,
                FieldRef {
                    declaring: self.shader_type,
                    name: field.name.clone(),
                    ty: field.ty.clone(),
                },
            );
        }

        for def in self.structs.values() {
            for (name, ty) in &def.fields {
                if ty.is_reference() {
                    return Err(crate::Error::ReferenceType(format!("{}.{name}", def.name)));
                }
            }
            let mut trail = Vec::new();
            self.check_struct_cycle(def, &mut trail)?;
        }

        for token in self.entry_points.values() {
            if !self.methods.contains_key(token) {
                return Err(crate::Error::UnresolvedToken(*token));
            }
        }

        Ok(Arc::new(ShaderModule {
            name: self.name,
            shader_type: self.shader_type,
            methods: self.methods,
            structs: self.structs,
            fields: self.fields,
            field_refs: self.field_refs,
            intrinsics: self.intrinsics,
            entry_points: self.entry_points,
        }))
    }

    fn check_data_type(&self, ty: &ShaderType, context: &str) -> Result<()> {
        match ty {
            ShaderType::Reference(_) => Err(crate::Error::ReferenceType(context.to_string())),
            ShaderType::Struct(token) if *token == self.shader_type => {
                Err(crate::Error::ShaderTypeAsData(context.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn check_struct_cycle(&self, def: &StructDef, trail: &mut Vec<Token>) -> Result<()> {
        if trail.contains(&def.token) {
            return Err(crate::Error::CyclicStruct(def.name.clone()));
        }
        trail.push(def.token);

        for (_, ty) in &def.fields {
            if let ShaderType::Struct(inner) = ty {
                if let Some(inner_def) = self.structs.get(inner) {
                    self.check_struct_cycle(inner_def, trail)?;
                }
            }
        }

        trail.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Expression;

    fn sig(return_type: ShaderType) -> MethodSignature {
        MethodSignature {
            is_static: false,
            return_type,
            parameters: Vec::new(),
        }
    }

    #[test]
    fn builds_a_minimal_module() {
        let shader = Token::new(0x0200_0001);
        let main = Token::new(0x0600_0001);
        let module = ShaderModule::builder("test", shader)
            .method(
                main,
                "MainFragment",
                shader,
                sig(ShaderType::Void),
                Vec::new(),
                MethodBody::Tree(Expression::Return(None).into_ref()),
            )
            .entry_point(ShaderKind::Fragment, main)
            .finish()
            .unwrap();

        assert_eq!(module.name(), "test");
        assert_eq!(
            module.entry_point(ShaderKind::Fragment).unwrap().name,
            "MainFragment"
        );
    }

    #[test]
    fn rejects_reference_types() {
        let shader = Token::new(0x0200_0001);
        let err = ShaderModule::builder("test", shader)
            .method(
                Token::new(0x0600_0001),
                "Bad",
                shader,
                MethodSignature {
                    is_static: true,
                    return_type: ShaderType::Void,
                    parameters: vec![ParamDef {
                        name: "text".into(),
                        ty: ShaderType::Reference(Box::new(ShaderType::Float32)),
                    }],
                },
                Vec::new(),
                MethodBody::Tree(Expression::Return(None).into_ref()),
            )
            .finish()
            .unwrap_err();

        assert!(matches!(err, crate::Error::ReferenceType(_)));
    }

    #[test]
    fn rejects_shader_type_as_data() {
        let shader = Token::new(0x0200_0001);
        let err = ShaderModule::builder("test", shader)
            .method(
                Token::new(0x0600_0001),
                "Bad",
                shader,
                sig(ShaderType::Struct(shader)),
                Vec::new(),
                MethodBody::Tree(Expression::Return(None).into_ref()),
            )
            .finish()
            .unwrap_err();

        assert!(matches!(err, crate::Error::ShaderTypeAsData(_)));
    }

    #[test]
    fn rejects_cyclic_structs() {
        let shader = Token::new(0x0200_0001);
        let a = Token::new(0x0200_0010);
        let b = Token::new(0x0200_0011);
        let err = ShaderModule::builder("test", shader)
            .struct_def(a, "A", vec![("inner".into(), ShaderType::Struct(b))])
            .struct_def(b, "B", vec![("back".into(), ShaderType::Struct(a))])
            .finish()
            .unwrap_err();

        assert!(matches!(err, crate::Error::CyclicStruct(_)));
    }

    #[test]
    fn rejects_roleless_fields() {
        let shader = Token::new(0x0200_0001);
        let err = ShaderModule::builder("test", shader)
            .field(FieldDef {
                token: Token::new(0x0400_0001),
                name: "Orphan".into(),
                ty: ShaderType::Float32,
                role: None,
                semantic: None,
                linkage_name: None,
                interpolation: InterpolationMode::default(),
            })
            .finish()
            .unwrap_err();

        assert!(matches!(err, crate::Error::RolelessField(_)));
    }

    #[test]
    fn infers_role_from_semantic() {
        let shader = Token::new(0x0200_0001);
        let module = ShaderModule::builder("test", shader)
            .field(FieldDef {
                token: Token::new(0x0400_0001),
                name: "Position".into(),
                ty: ShaderType::Vector { size: 4 },
                role: None,
                semantic: Some(BuiltinSemantic::Position),
                linkage_name: None,
                interpolation: InterpolationMode::default(),
            })
            .finish()
            .unwrap();

        assert_eq!(
            module.field("Position").unwrap().role,
            Some(VariableRole::Output)
        );
    }

    #[test]
    fn linkage_name_defaults_to_field_name() {
        let field = FieldDef {
            token: Token::new(0x0400_0001),
            name: "Time".into(),
            ty: ShaderType::Float32,
            role: Some(VariableRole::Uniform),
            semantic: None,
            linkage_name: Some("u_time".into()),
            interpolation: InterpolationMode::default(),
        };
        assert_eq!(field.linkage_name(), "u_time");
    }

    #[test]
    fn builtin_vector_constructors_are_preregistered() {
        let module = ShaderModule::builder("test", Token::new(0x0200_0001))
            .finish()
            .unwrap();

        let ctor = module.method(crate::module::VECTOR4_CTOR).unwrap();
        assert!(ctor.is_constructor);
        assert_eq!(ctor.signature.parameters.len(), 4);
    }
}
