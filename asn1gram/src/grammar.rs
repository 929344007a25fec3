//! Constructors for the handful of target-model shapes every `BerType`
//! materialization is built out of: the `Length` and `Tag` fields, the
//! opaque value layer, and the two message skeletons (a plain field chain,
//! and a tag-guarded union).

use std::sync::Arc;

use asn1gram_core::error::{CompileError, GrammarError};

use crate::tag::Tag;
use crate::target::{Field, Link, Message, Type};

/// The `Length` field shared by every `lv_ty`: a single-octet short-form
/// length, `0..127` (long-form lengths, `>= 0x80`, are out of scope per §1).
pub fn length_field_ty() -> Arc<Type> {
    Arc::new(Type::RangeInteger { id: "Prelude::Length".to_owned(), first: 0, last: 127, size_bits: 8 })
}

/// The `Tag` field shared by every `tlv_ty`: a three-field composite exposing
/// `Class`, `Form`, and `Num` so [`Tag::matches`] can guard on them
/// independently, matching the `Tag_Class`/`Tag_Form`/`Tag_Num` naming a
/// caller parsing the compiled grammar observes.
pub fn tag_field_ty() -> Arc<Type> {
    let class_ty = Arc::new(Type::RangeInteger { id: "Prelude::Tag_Class".to_owned(), first: 0, last: 3, size_bits: 2 });
    let form_ty = Arc::new(Type::RangeInteger { id: "Prelude::Tag_Form".to_owned(), first: 0, last: 1, size_bits: 1 });
    let num_ty = Arc::new(Type::RangeInteger { id: "Prelude::Tag_Num".to_owned(), first: 0, last: 30, size_bits: 5 });

    let fields = vec![
        (Field::named("Class"), class_ty),
        (Field::named("Form"), form_ty),
        (Field::named("Num"), num_ty),
    ];
    let links = chain_links(&fields);
    Arc::new(Type::Message(Message { id: "Prelude::Tag".to_owned(), fields, links, skip_proof: true }))
}

/// The default `v_ty`: an opaque byte run of whatever length the enclosing
/// `Length` field declares.
pub fn opaque_value_ty() -> Arc<Type> {
    Arc::new(Type::Opaque)
}

fn chain_links(fields: &[(Field, Arc<Type>)]) -> Vec<Link> {
    let mut cursor = Field::Initial;
    let mut links = Vec::with_capacity(fields.len() + 1);
    for (field, _) in fields {
        links.push(Link::new(cursor.clone(), field.clone()));
        cursor = field.clone();
    }
    links.push(Link::new(cursor, Field::Final));
    links
}

/// `Initial → f1 → f2 → … → fn → Final`, no guards.
///
/// Propagates the target model's well-formedness failure as
/// [`CompileError::InvalidGrammar`].
pub fn simple_message(id: &str, fields: Vec<(String, Arc<Type>)>, skip_proof: bool) -> Result<Message, CompileError> {
    let fields: Vec<(Field, Arc<Type>)> =
        fields.into_iter().map(|(name, ty)| (Field::named(name), ty)).collect();
    let links = chain_links(&fields);
    Message { id: id.to_owned(), fields, links, skip_proof }
        .finalize()
        .map_err(|cause| CompileError::InvalidGrammar { qualified_id: id.to_owned(), cause })
}

/// A tag-guarded union: `Tag` first, one guarded forward link per variant,
/// plus a fallback to `Final` when no variant's tag matches.
///
/// Propagates the target model's well-formedness failure as
/// [`CompileError::InvalidGrammar`].
pub fn tagged_union_message(
    id: &str,
    variants: Vec<(String, Tag, Arc<Type>)>,
    skip_proof: bool,
) -> Result<Message, CompileError> {
    let tag_field = Field::named("Tag");
    let mut fields = vec![(tag_field.clone(), tag_field_ty())];
    let mut links = vec![Link::new(Field::Initial, tag_field.clone())];

    for (name, tag, body_ty) in &variants {
        let variant_field = Field::named(name.clone());
        links.push(Link::guarded(tag_field.clone(), variant_field.clone(), tag.matches("Tag")));
        links.push(Link::new(variant_field.clone(), Field::Final));
        fields.push((variant_field, Arc::clone(body_ty)));
    }

    let none_match = variants
        .iter()
        .map(|(_, tag, _)| tag.matches("Tag").not())
        .collect::<Vec<_>>();
    if !none_match.is_empty() {
        links.push(Link::guarded(tag_field, Field::Final, crate::target::Condition::and(none_match)));
    }

    Message { id: id.to_owned(), fields, links, skip_proof }
        .finalize()
        .map_err(|cause| CompileError::InvalidGrammar { qualified_id: id.to_owned(), cause })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_message_chains_fields_in_order() {
        let message = simple_message(
            "Question",
            vec![("id".to_owned(), opaque_value_ty()), ("question".to_owned(), opaque_value_ty())],
            true,
        )
        .unwrap();

        assert_eq!(message.fields.len(), 2);
        assert_eq!(message.links.len(), 3);
        assert_eq!(message.links[0], Link::new(Field::Initial, Field::named("id")));
        assert_eq!(message.links[1], Link::new(Field::named("id"), Field::named("question")));
        assert_eq!(message.links[2], Link::new(Field::named("question"), Field::Final));
    }

    #[test]
    fn simple_message_with_no_fields_is_rejected() {
        let err = simple_message("Empty", vec![], true).unwrap_err();
        assert!(matches!(err, CompileError::InvalidGrammar { cause: GrammarError::Empty, .. }));
    }

    #[test]
    fn tagged_union_has_a_fallback_link() {
        use crate::tag::TagForm;

        let message = tagged_union_message(
            "Payload",
            vec![
                ("one".to_owned(), Tag::universal(TagForm::Primitive, 2), opaque_value_ty()),
                ("many".to_owned(), Tag::universal(TagForm::Constructed, 16), opaque_value_ty()),
            ],
            true,
        )
        .unwrap();

        // Tag, one, many
        assert_eq!(message.fields.len(), 3);
        let fallback = message
            .links
            .iter()
            .find(|link| link.from == Field::named("Tag") && link.to == Field::Final)
            .expect("fallback link to Final");
        assert!(matches!(fallback.condition, Some(crate::target::Condition::And(_))));
    }
}
