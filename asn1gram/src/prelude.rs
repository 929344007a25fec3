//! The fixed set of universal BER primitive descriptors, and the reserved
//! `"Prelude"` namespace they and the grammar's helper types live under.
//!
//! Every singleton here is a `Lazy` immutable [`BerType`], safe to share
//! across concurrent `convert_spec` invocations per §5.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::bertype::BerType;
use crate::tag::{Tag, TagForm};
use crate::target::{Literal, Type};

/// The reserved namespace every prelude type lives under; `convert_spec`
/// filters identifiers under this path out of its returned map.
pub const PRELUDE_NAME: &str = "Prelude";

fn universal_primitive(ident: &str, number: u8) -> Arc<BerType> {
    Arc::new(BerType::simple(PRELUDE_NAME, ident, Tag::universal(TagForm::Primitive, number)))
}

/// X.680 tag 2: an opaque signed-integer byte string.
pub static INTEGER: Lazy<Arc<BerType>> = Lazy::new(|| universal_primitive("INTEGER", 2));
/// X.680 tag 3: an opaque bit-string byte string.
pub static BIT_STRING: Lazy<Arc<BerType>> = Lazy::new(|| universal_primitive("BIT_STRING", 3));
/// X.680 tag 4: an opaque octet string.
pub static OCTET_STRING: Lazy<Arc<BerType>> = Lazy::new(|| universal_primitive("OCTET_STRING", 4));
/// X.680 tag 6: an opaque OID arc-encoding.
pub static OBJECT_IDENTIFIER: Lazy<Arc<BerType>> = Lazy::new(|| universal_primitive("OBJECT_IDENTIFIER", 6));
/// X.680 tag 19.
pub static PRINTABLE_STRING: Lazy<Arc<BerType>> = Lazy::new(|| universal_primitive("PrintableString", 19));
/// X.680 tag 22.
pub static IA5_STRING: Lazy<Arc<BerType>> = Lazy::new(|| universal_primitive("IA5String", 22));

/// X.680 tag 1: `FALSE = 0x00`, `TRUE = 0xFF`, any other value invalid.
pub static BOOLEAN: Lazy<Arc<BerType>> = Lazy::new(|| {
    let raw_ty = Arc::new(Type::Enumeration {
        id: format!("{PRELUDE_NAME}::RawBoolean"),
        literals: vec![Literal { name: "FALSE".to_owned(), value: 0x00 }, Literal { name: "TRUE".to_owned(), value: 0xFF }],
        size_bits: 8,
        always_valid: false,
    });
    Arc::new(BerType::definite(PRELUDE_NAME, "BOOLEAN", Tag::universal(TagForm::Primitive, 1), raw_ty, 1))
});

/// X.680 tag 5: zero octets of content.
pub static NULL: Lazy<Arc<BerType>> = Lazy::new(|| {
    let raw_ty = Arc::new(Type::Enumeration {
        id: format!("{PRELUDE_NAME}::RawNull"),
        literals: vec![],
        size_bits: 0,
        always_valid: false,
    });
    Arc::new(BerType::definite(PRELUDE_NAME, "NULL", Tag::universal(TagForm::Primitive, 5), raw_ty, 0))
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universal_tag_numbers_match_x680() {
        assert_eq!(BOOLEAN.tag().unwrap().number(), 1);
        assert_eq!(INTEGER.tag().unwrap().number(), 2);
        assert_eq!(BIT_STRING.tag().unwrap().number(), 3);
        assert_eq!(OCTET_STRING.tag().unwrap().number(), 4);
        assert_eq!(NULL.tag().unwrap().number(), 5);
        assert_eq!(OBJECT_IDENTIFIER.tag().unwrap().number(), 6);
        assert_eq!(PRINTABLE_STRING.tag().unwrap().number(), 19);
        assert_eq!(IA5_STRING.tag().unwrap().number(), 22);
    }

    #[test]
    fn prelude_types_are_materializable() {
        for ty in [&INTEGER, &OCTET_STRING, &BOOLEAN, &NULL] {
            ty.tlv_ty(true).expect("prelude singleton should materialize");
        }
    }

    #[test]
    fn boolean_lv_pins_length_to_one() {
        let lv = BOOLEAN.lv_ty().unwrap();
        let Type::Message(message) = lv.as_ref() else { panic!("expected a message") };
        assert!(message.links.iter().any(|link| link.to == crate::target::Field::named("Value")));
    }

    #[test]
    fn null_lv_has_no_value_field() {
        let lv = NULL.lv_ty().unwrap();
        let Type::Message(message) = lv.as_ref() else { panic!("expected a message") };
        assert!(!message.fields.iter().any(|(field, _)| *field == crate::target::Field::named("Value")));
    }

    #[test]
    fn null_lv_guards_length_equal_to_zero() {
        let lv = NULL.lv_ty().unwrap();
        let Type::Message(message) = lv.as_ref() else { panic!("expected a message") };
        let length_field = crate::target::Field::named("Length");
        let outgoing: Vec<_> = message.links.iter().filter(|link| link.from == length_field).collect();
        assert_eq!(outgoing.len(), 2, "Length should fan out on a guarded Length == 0 condition");
        assert!(outgoing.iter().all(|link| link.to == crate::target::Field::Final));
        assert!(outgoing.iter().any(|link| link.condition == Some(crate::target::Condition::equal("Length", 0))));
        assert!(outgoing
            .iter()
            .any(|link| link.condition == Some(crate::target::Condition::equal("Length", 0).not())));
    }
}
