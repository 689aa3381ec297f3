//! Built-in vector and color types.
//!
//! Every module starts with the small builtin universe preregistered: the vector
//! and color value types, their component constructors (as expression-tree bodies
//! that assign each component in turn), and one well-known token per GPU
//! intrinsic. Hosts map their own metadata tokens on top of these with
//! [`crate::module::ShaderModuleBuilder::intrinsic`].

use strum::IntoEnumIterator;

use crate::{
    ir::{Expression, FieldRef, IntrinsicOp, ShaderType},
    module::{MethodBody, MethodSignature, ParamDef, ShaderModuleBuilder, Token},
};

/// Type token of the builtin two-component float vector.
pub const VECTOR2_TOKEN: Token = Token(0x0200_FF02);
/// Type token of the builtin three-component float vector.
pub const VECTOR3_TOKEN: Token = Token(0x0200_FF03);
/// Type token of the builtin four-component float vector.
pub const VECTOR4_TOKEN: Token = Token(0x0200_FF04);
/// Type token of the builtin RGBA color.
pub const COLORF_TOKEN: Token = Token(0x0200_FF05);
/// Type token of the builtin 4x4 matrix.
pub const MATRIX_TOKEN: Token = Token(0x0200_FF06);

/// Constructor token for [`VECTOR2_TOKEN`].
pub const VECTOR2_CTOR: Token = Token(0x0600_FF02);
/// Constructor token for [`VECTOR3_TOKEN`].
pub const VECTOR3_CTOR: Token = Token(0x0600_FF03);
/// Constructor token for [`VECTOR4_TOKEN`].
pub const VECTOR4_CTOR: Token = Token(0x0600_FF04);
/// Constructor token for [`COLORF_TOKEN`].
pub const COLORF_CTOR: Token = Token(0x0600_FF05);

/// The well-known method token of a GPU intrinsic.
///
/// Hosts may call intrinsics through these tokens directly instead of
/// registering their own mapping.
#[must_use]
pub fn intrinsic_token(op: IntrinsicOp) -> Token {
    let index = IntrinsicOp::iter().position(|x| x == op).unwrap_or(0);
    Token(0x0600_FE00 + index as u32)
}

/// The field token of component `index` of a builtin vector or color type.
#[must_use]
pub fn component_token(type_token: Token, index: u8) -> Option<Token> {
    let base = match type_token {
        VECTOR2_TOKEN if index < 2 => 0x0400_FF20,
        VECTOR3_TOKEN if index < 3 => 0x0400_FF30,
        VECTOR4_TOKEN if index < 4 => 0x0400_FF40,
        COLORF_TOKEN if index < 4 => 0x0400_FF50,
        _ => return None,
    };
    Some(Token(base + u32::from(index)))
}

/// The shader type a builtin type token stands for, if it is one.
#[must_use]
pub fn builtin_type(token: Token) -> Option<ShaderType> {
    match token {
        VECTOR2_TOKEN => Some(ShaderType::Vector { size: 2 }),
        VECTOR3_TOKEN => Some(ShaderType::Vector { size: 3 }),
        VECTOR4_TOKEN => Some(ShaderType::Vector { size: 4 }),
        COLORF_TOKEN => Some(ShaderType::Color),
        MATRIX_TOKEN => Some(ShaderType::Matrix),
        _ => None,
    }
}

/// Registers the builtin universe into a fresh builder.
pub(crate) fn register(builder: &mut ShaderModuleBuilder) {
    let vectors = [
        (VECTOR2_TOKEN, VECTOR2_CTOR, &["X", "Y"][..]),
        (VECTOR3_TOKEN, VECTOR3_CTOR, &["X", "Y", "Z"][..]),
        (VECTOR4_TOKEN, VECTOR4_CTOR, &["X", "Y", "Z", "W"][..]),
        (COLORF_TOKEN, COLORF_CTOR, &["R", "G", "B", "A"][..]),
    ];

    for (type_token, ctor_token, components) in vectors {
        builder.insert_method(
            ctor_token,
            ".ctor",
            type_token,
            true,
            MethodSignature {
                is_static: false,
                return_type: ShaderType::Void,
                parameters: components
                    .iter()
                    .map(|name| ParamDef {
                        name: name.to_lowercase(),
                        ty: ShaderType::Float32,
                    })
                    .collect(),
            },
            Vec::new(),
            MethodBody::Tree(component_assignments(type_token, components)),
        );
    }

    for (type_token, _, components) in vectors {
        for (index, name) in components.iter().enumerate() {
            if let Some(token) = component_token(type_token, index as u8) {
                builder.insert_field_ref(token, type_token, name, ShaderType::Float32);
            }
        }
    }

    for op in IntrinsicOp::iter() {
        builder.insert_intrinsic(intrinsic_token(op), op);
    }
}

/// Builds the constructor body: one component assignment per parameter.
fn component_assignments(declaring: Token, components: &[&str]) -> crate::ir::ExprRef {
    let statements = components
        .iter()
        .enumerate()
        .map(|(index, name)| {
            Expression::Assign {
                target: Expression::MemberAccess {
                    object: Expression::SelfReference.into_ref(),
                    field: FieldRef {
                        declaring,
                        name: (*name).to_string(),
                        ty: ShaderType::Float32,
                    },
                }
                .into_ref(),
                value: Expression::MethodParameter {
                    index: index as u16,
                    name: name.to_lowercase(),
                    ty: ShaderType::Float32,
                }
                .into_ref(),
            }
            .into_ref()
        })
        .collect();

    Expression::Block(statements).into_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intrinsic_tokens_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for op in IntrinsicOp::iter() {
            assert!(seen.insert(intrinsic_token(op)));
        }
    }

    #[test]
    fn builtin_types_resolve() {
        assert_eq!(builtin_type(VECTOR3_TOKEN), Some(ShaderType::Vector { size: 3 }));
        assert_eq!(builtin_type(Token::new(0x0200_0001)), None);
    }

    #[test]
    fn constructor_assigns_each_component() {
        let body = component_assignments(VECTOR4_TOKEN, &["X", "Y", "Z", "W"]);
        let Expression::Block(statements) = body.as_ref() else {
            panic!("expected block");
        };
        assert_eq!(statements.len(), 4);
        assert!(statements
            .iter()
            .all(|s| matches!(s.as_ref(), Expression::Assign { .. })));
    }
}
