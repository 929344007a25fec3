//! `BerType`: the polymorphic descriptor every ASN.1 construct compiles down
//! to, and its three lazily-materialized grammar layers (`v_ty`/`lv_ty`/`tlv_ty`).

use std::sync::Arc;

use asn1gram_core::error::CompileError;
use once_cell::sync::OnceCell;

use crate::grammar::{length_field_ty, opaque_value_ty, simple_message, tag_field_ty, tagged_union_message};
use crate::tag::{Tag, TagClass, TagForm};
use crate::target::{Field, Link, Message, Type};

/// The closed family of BER constructors, plus the implicit-tag wrapper.
///
/// `BerType` values are pure and immutable once built; each variant's
/// memoization cells are the only interior mutability this type has, and
/// they are write-once (see [`BerType::v_ty`]).
#[derive(Debug)]
pub enum BerType {
    /// A primitive whose value layer is an opaque byte string (INTEGER,
    /// OCTET STRING, BIT STRING, PrintableString, IA5String, OID).
    Simple { path: String, ident: String, tag: Tag, cache: Memo },
    /// A primitive with a statically known value-layer type (BOOLEAN, NULL).
    ///
    /// `fixed_octets` is the value layer's fixed wire size: `1` for BOOLEAN,
    /// `0` for NULL. `lv_ty` uses it to pin `Length` and, for NULL, elide
    /// the `Value` field entirely (§4.2).
    Definite { path: String, ident: String, tag: Tag, raw_ty: Arc<Type>, fixed_octets: u8, cache: Memo },
    /// `fields` is an order-preserving mapping from field name to `BerType`.
    Sequence { path: String, ident: String, fields: Vec<(String, Arc<BerType>)>, cache: Memo },
    /// `elem_tlv` is the already-materialized TLV grammar of the element.
    SequenceOf { path: String, elem_tlv: Arc<Type>, cache: Memo },
    /// `variants` is an order-preserving mapping from alternative name to `BerType`.
    Choice { path: String, ident: String, variants: Vec<(String, Arc<BerType>)>, cache: Memo },
    /// Rewrites the effective tag of `base` without wrapping it on the wire.
    ImplicitlyTagged { base: Arc<BerType>, tag: Tag, path: String, cache: Memo },
}

/// Write-once memoization for a descriptor's three materializations.
///
/// The downstream model's full proof pass (out of scope, see `target.rs`)
/// never rejects a grammar this crate's own `skip_proof = false` path
/// wouldn't also reject, so a single cached `tlv_ty` is safe to reuse
/// regardless of which `skip_proof` value a later call passes.
#[derive(Debug, Default)]
pub struct Memo {
    v: OnceCell<Arc<Type>>,
    lv: OnceCell<Arc<Type>>,
    tlv: OnceCell<Arc<Type>>,
}

impl BerType {
    pub fn simple(path: impl Into<String>, ident: impl Into<String>, tag: Tag) -> Self {
        BerType::Simple { path: path.into(), ident: ident.into(), tag, cache: Memo::default() }
    }

    pub fn definite(path: impl Into<String>, ident: impl Into<String>, tag: Tag, raw_ty: Arc<Type>, fixed_octets: u8) -> Self {
        BerType::Definite { path: path.into(), ident: ident.into(), tag, raw_ty, fixed_octets, cache: Memo::default() }
    }

    pub fn sequence(path: impl Into<String>, ident: impl Into<String>, fields: Vec<(String, Arc<BerType>)>) -> Self {
        BerType::Sequence { path: path.into(), ident: ident.into(), fields, cache: Memo::default() }
    }

    pub fn sequence_of(path: impl Into<String>, elem_tlv: Arc<Type>) -> Self {
        BerType::SequenceOf { path: path.into(), elem_tlv, cache: Memo::default() }
    }

    pub fn choice(path: impl Into<String>, ident: impl Into<String>, variants: Vec<(String, Arc<BerType>)>) -> Self {
        BerType::Choice { path: path.into(), ident: ident.into(), variants, cache: Memo::default() }
    }

    fn cache(&self) -> &Memo {
        match self {
            BerType::Simple { cache, .. }
            | BerType::Definite { cache, .. }
            | BerType::Sequence { cache, .. }
            | BerType::SequenceOf { cache, .. }
            | BerType::Choice { cache, .. }
            | BerType::ImplicitlyTagged { cache, .. } => cache,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            BerType::Simple { path, .. }
            | BerType::Definite { path, .. }
            | BerType::Sequence { path, .. }
            | BerType::SequenceOf { path, .. }
            | BerType::Choice { path, .. }
            | BerType::ImplicitlyTagged { path, .. } => path,
        }
    }

    pub fn ident(&self) -> String {
        match self {
            BerType::Simple { ident, .. } | BerType::Definite { ident, .. } | BerType::Sequence { ident, .. } | BerType::Choice { ident, .. } => {
                ident.clone()
            }
            BerType::SequenceOf { elem_tlv, .. } => format!("SEQUENCE_OF_{}", elem_tlv.id()),
            BerType::ImplicitlyTagged { base, .. } => base.ident(),
        }
    }

    /// The qualified identifier `path ⊕ ident`.
    pub fn qualified_ident(&self) -> String {
        crate::ident::qualify(&[self.path(), &self.ident()])
    }

    /// The qualified identifier with `prefix_` spliced onto the local
    /// identifier, e.g. `World_Schema::RAW_Question`. Used so each of the
    /// three materializations gets its own name under §4.2 rather than
    /// colliding on the bare qualified identifier.
    fn prefixed_ident(&self, prefix: &str) -> String {
        if self.path().is_empty() {
            format!("{prefix}_{}", self.ident())
        } else {
            format!("{}::{prefix}_{}", self.path(), self.ident())
        }
    }

    /// The effective wire tag, or `None` for a bare `Choice` — see §4.2 and
    /// §9's open question on choice tag propagation.
    pub fn tag(&self) -> Option<Tag> {
        match self {
            BerType::Simple { tag, .. } | BerType::Definite { tag, .. } => Some(*tag),
            BerType::Sequence { .. } => Some(Tag::universal(TagForm::Constructed, 16)),
            BerType::SequenceOf { .. } => Some(Tag::universal(TagForm::Constructed, 16)),
            BerType::Choice { .. } => None,
            BerType::ImplicitlyTagged { tag, .. } => Some(*tag),
        }
    }

    /// Applies an implicit tag override, per §4.2: a `UNIVERSAL` override is
    /// a no-op (it would not let the grammar distinguish the override from
    /// the base universal tag), otherwise the wrapper's form is inherited
    /// from the base's. Re-tagging with `base`'s own effective tag is also a
    /// no-op (§3-invariant-2): `implicitly_tagged` never wraps a `BerType` in
    /// a layer that would not change its tag.
    pub fn implicitly_tagged(self: &Arc<Self>, t: Tag, path: impl Into<String>) -> Arc<BerType> {
        if t.class() == TagClass::Universal {
            return Arc::clone(self);
        }
        let base_form = self.tag().map(|tag| tag.form()).unwrap_or(TagForm::Primitive);
        let tag = Tag::new(t.class(), base_form, t.number());
        if self.tag() == Some(tag) {
            return Arc::clone(self);
        }
        Arc::new(BerType::ImplicitlyTagged { base: Arc::clone(self), tag, path: path.into(), cache: Memo::default() })
    }

    /// Wraps `base` in an anonymous single-field `Sequence{Inner: base}`,
    /// then implicit-tags the wrapper — the BER rule that EXPLICIT adds one
    /// extra TLV envelope around the original.
    pub fn explicitly_tagged(self: &Arc<Self>, t: Tag, path: impl Into<String>) -> Arc<BerType> {
        let path = path.into();
        let wrapper_ident = format!("Explicit_{}", self.ident());
        let wrapper = Arc::new(BerType::sequence(path.clone(), wrapper_ident, vec![("Inner".to_owned(), Arc::clone(self))]));
        wrapper.implicitly_tagged(t, path)
    }

    /// The raw value layer; memoized once computed.
    pub fn v_ty(&self) -> Result<Arc<Type>, CompileError> {
        if let Some(cached) = self.cache().v.get() {
            log::debug!("v_ty cache hit for {}", self.qualified_ident());
            return Ok(Arc::clone(cached));
        }
        log::debug!("materializing v_ty for {}", self.qualified_ident());
        let ty = self.build_v_ty()?;
        Ok(Arc::clone(self.cache().v.get_or_init(|| ty)))
    }

    fn build_v_ty(&self) -> Result<Arc<Type>, CompileError> {
        match self {
            BerType::Simple { .. } => Ok(opaque_value_ty()),
            BerType::Definite { raw_ty, .. } => Ok(Arc::clone(raw_ty)),
            BerType::Sequence { fields, .. } => {
                let mut tlv_fields = Vec::with_capacity(fields.len());
                for (name, field_ty) in fields {
                    tlv_fields.push((name.clone(), field_ty.tlv_ty(true)?));
                }
                let message = simple_message(&self.prefixed_ident("RAW"), tlv_fields, true)?;
                Ok(Arc::new(Type::Message(message)))
            }
            BerType::SequenceOf { elem_tlv, .. } => {
                Ok(Arc::new(Type::Sequence { id: self.prefixed_ident("RAW"), element: Arc::clone(elem_tlv) }))
            }
            BerType::Choice { variants, .. } => {
                let mut union_variants = Vec::with_capacity(variants.len());
                for (name, variant_ty) in flatten_choice_variants(variants) {
                    let Some(tag) = variant_ty.tag() else {
                        log::warn!("choice variant `{name}` of {} has no discoverable tag", self.qualified_ident());
                        return Err(CompileError::ChoiceWithoutTag(name));
                    };
                    union_variants.push((name, tag, variant_ty.lv_ty()?));
                }
                let message = tagged_union_message(&self.prefixed_ident("RAW"), union_variants, true)?;
                Ok(Arc::new(Type::Message(message)))
            }
            BerType::ImplicitlyTagged { base, .. } => base.v_ty(),
        }
    }

    /// The length-value layer; memoized once computed.
    pub fn lv_ty(&self) -> Result<Arc<Type>, CompileError> {
        if let Some(cached) = self.cache().lv.get() {
            log::debug!("lv_ty cache hit for {}", self.qualified_ident());
            return Ok(Arc::clone(cached));
        }
        log::debug!("materializing lv_ty for {}", self.qualified_ident());
        let ty = self.build_lv_ty()?;
        Ok(Arc::clone(self.cache().lv.get_or_init(|| ty)))
    }

    fn build_lv_ty(&self) -> Result<Arc<Type>, CompileError> {
        if let BerType::ImplicitlyTagged { base, .. } = self {
            return base.lv_ty();
        }

        let id = self.prefixed_ident("UNTAGGED");

        if let BerType::Definite { fixed_octets: 0, .. } = self {
            // NULL: no Value field. Length must be exactly 0x00 (§6); both
            // branches still end at Final (there is nothing to read either
            // way), but the guard keeps a non-zero Length distinguishable
            // from a valid NULL rather than accepting it unconditionally.
            let length_field = Field::named("Length");
            let fields = vec![(length_field.clone(), length_field_ty())];
            let length_is_zero = crate::target::Condition::equal("Length", 0);
            let links = vec![
                Link::new(Field::Initial, length_field.clone()),
                Link::guarded(length_field.clone(), Field::Final, length_is_zero.clone()),
                Link::guarded(length_field, Field::Final, length_is_zero.not()),
            ];
            return Ok(Arc::new(Type::Message(Message { id, fields, links, skip_proof: true })));
        }

        let value_ty = self.v_ty()?;
        let length_field = Field::named("Length");
        let value_field = Field::named("Value");
        let fields = vec![(length_field.clone(), length_field_ty()), (value_field.clone(), value_ty)];

        if let BerType::Definite { fixed_octets, .. } = self {
            // Statically-sized value layer: guard that Length equals the
            // declared size; on mismatch the message ends without reading
            // Value (BOOLEAN pins this to exactly one octet).
            let size_matches = crate::target::Condition::equal("Length", i64::from(*fixed_octets));
            let links = vec![
                Link::new(Field::Initial, length_field.clone()),
                Link::guarded(length_field.clone(), Field::Final, size_matches.clone().not()),
                Link::guarded(length_field, value_field.clone(), size_matches)
                    .sized(crate::target::SizeExpr::FieldTimesEight("Length".to_owned())),
                Link::new(value_field, Field::Final),
            ];
            return Ok(Arc::new(Type::Message(Message { id, fields, links, skip_proof: true })));
        }

        let value_link = Link::new(length_field.clone(), value_field.clone())
            .sized(crate::target::SizeExpr::FieldTimesEight("Length".to_owned()));
        let links = vec![Link::new(Field::Initial, length_field), value_link, Link::new(value_field, Field::Final)];
        Ok(Arc::new(Type::Message(Message { id, fields, links, skip_proof: true })))
    }

    /// The tag-length-value layer; memoized once computed.
    ///
    /// Degrades to [`BerType::v_ty`] when the descriptor has no tag (a bare
    /// top-level `Choice`, see §4.2/§9). `skip_proof` forwards to the
    /// top-level `Message`'s well-formedness pass, matching `convert_spec`'s
    /// `.tlv_ty(config.skip_proof)` call; see [`Memo`] for why the cache
    /// itself does not key on this value.
    pub fn tlv_ty(&self, skip_proof: bool) -> Result<Arc<Type>, CompileError> {
        if let Some(cached) = self.cache().tlv.get() {
            log::debug!("tlv_ty cache hit for {}", self.qualified_ident());
            return Ok(Arc::clone(cached));
        }
        log::debug!("materializing tlv_ty for {}", self.qualified_ident());
        let ty = self.build_tlv_ty(skip_proof)?;
        Ok(Arc::clone(self.cache().tlv.get_or_init(|| ty)))
    }

    fn build_tlv_ty(&self, skip_proof: bool) -> Result<Arc<Type>, CompileError> {
        let Some(tag) = self.tag() else {
            return self.v_ty();
        };

        let tag_field = Field::named("Tag");
        let untagged_field = Field::named("Untagged");
        let fields = vec![(tag_field.clone(), tag_field_ty()), (untagged_field.clone(), self.lv_ty()?)];
        let links = vec![
            Link::new(Field::Initial, tag_field.clone()),
            Link::guarded(tag_field.clone(), Field::Final, tag.matches("Tag").not()),
            Link::guarded(tag_field.clone(), untagged_field.clone(), tag.matches("Tag")),
            Link::new(untagged_field, Field::Final),
        ];
        let message = Message { id: self.qualified_ident(), fields, links, skip_proof };
        let message = message
            .finalize()
            .map_err(|cause| CompileError::InvalidGrammar { qualified_id: self.qualified_ident(), cause })?;
        Ok(Arc::new(Type::Message(message)))
    }
}

/// Inlines a `Choice` variant that is itself a `Choice` under a composite
/// `outer_inner` name, so the flattened union's branch set is flat and every
/// guard is locally testable (§4.2).
fn flatten_choice_variants(variants: &[(String, Arc<BerType>)]) -> Vec<(String, Arc<BerType>)> {
    let mut flat = Vec::with_capacity(variants.len());
    for (name, ty) in variants {
        match ty.as_ref() {
            BerType::Choice { variants: inner, .. } => {
                for (inner_name, inner_ty) in flatten_choice_variants(inner) {
                    flat.push((format!("{name}_{inner_name}"), inner_ty));
                }
            }
            _ => flat.push((name.clone(), Arc::clone(ty))),
        }
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integer() -> Arc<BerType> {
        Arc::new(BerType::simple("Prelude", "INTEGER", Tag::universal(TagForm::Primitive, 2)))
    }

    #[test]
    fn simple_tlv_has_tag_length_and_opaque_value() {
        let int_ty = integer();
        let tlv = int_ty.tlv_ty(true).unwrap();
        let Type::Message(message) = tlv.as_ref() else { panic!("expected a message") };
        assert_eq!(message.fields.len(), 2);
        assert!(message.fields.iter().any(|(field, _)| *field == Field::named("Tag")));
        assert!(message.fields.iter().any(|(field, _)| *field == Field::named("Untagged")));
    }

    #[test]
    fn simple_lv_sizes_value_from_length() {
        let lv = integer().lv_ty().unwrap();
        let Type::Message(message) = lv.as_ref() else { panic!("expected a message") };
        let value_link = message
            .links
            .iter()
            .find(|link| link.to == Field::named("Value"))
            .expect("a link into Value");
        assert!(matches!(&value_link.size, Some(crate::target::SizeExpr::FieldTimesEight(name)) if name == "Length"));
    }

    #[test]
    fn sequence_v_ty_chains_field_tlvs_in_order() {
        let seq = Arc::new(BerType::sequence(
            "World_Schema",
            "Question",
            vec![("id".to_owned(), integer()), ("question".to_owned(), integer())],
        ));
        let v = seq.v_ty().unwrap();
        let Type::Message(message) = v.as_ref() else { panic!("expected a message") };
        assert_eq!(message.fields.iter().map(|(field, _)| field.to_string()).collect::<Vec<_>>(), vec!["id", "question"]);
    }

    #[test]
    fn sequence_v_ty_id_does_not_collide_with_tlv_id() {
        let seq = Arc::new(BerType::sequence("World_Schema", "Question", vec![("id".to_owned(), integer())]));
        let v = seq.v_ty().unwrap();
        let tlv = seq.tlv_ty(true).unwrap();
        assert_eq!(v.id(), "World_Schema::RAW_Question");
        assert_eq!(tlv.id(), "World_Schema::Question");
        assert_ne!(v.id(), tlv.id());
    }

    #[test]
    fn sequence_of_ident_derives_from_element() {
        let elem_tlv = integer().tlv_ty(true).unwrap();
        let seq_of = BerType::sequence_of("World_Schema", elem_tlv);
        assert!(seq_of.ident().starts_with("SEQUENCE_OF_"));
    }

    #[test]
    fn nested_choice_flattens_to_a_tagged_variant() {
        let bare_choice = Arc::new(BerType::choice("World_Schema", "Inner", vec![("one".to_owned(), integer())]));
        let outer = Arc::new(BerType::choice("World_Schema", "Outer", vec![("nested".to_owned(), bare_choice)]));
        // `nested` flattens to `nested_one`, which does have a tag (INTEGER's),
        // so this succeeds rather than raising `ChoiceWithoutTag`.
        let v = outer.v_ty().unwrap();
        let Type::Message(message) = v.as_ref() else { panic!("expected a message") };
        assert!(message.fields.iter().any(|(field, _)| *field == Field::named("nested_one")));
    }

    #[test]
    fn implicit_universal_override_collapses_to_base() {
        let base = integer();
        let wrapped = base.implicitly_tagged(Tag::universal(TagForm::Primitive, 4), "World_Schema");
        assert!(Arc::ptr_eq(&base, &wrapped));
    }

    #[test]
    fn implicit_retagging_with_the_same_non_universal_tag_is_a_no_op() {
        let base = integer();
        let context_tag = Tag::new(TagClass::Context, TagForm::Primitive, 0);
        let once_tagged = base.implicitly_tagged(context_tag, "World_Schema");
        let retagged = once_tagged.implicitly_tagged(context_tag, "World_Schema");
        assert!(Arc::ptr_eq(&once_tagged, &retagged));
    }

    #[test]
    fn implicit_context_override_inherits_base_form() {
        let base = integer();
        let context_tag = Tag::new(TagClass::Context, TagForm::Constructed, 0);
        let wrapped = base.implicitly_tagged(context_tag, "World_Schema");
        let tag = wrapped.tag().unwrap();
        assert_eq!(tag.class(), TagClass::Context);
        assert_eq!(tag.form(), TagForm::Primitive); // inherited from base, not the override
        assert_eq!(tag.number(), 0);
    }

    #[test]
    fn explicit_tagging_nests_one_level_deeper_than_implicit() {
        let base = integer();
        let context_tag = Tag::new(TagClass::Context, TagForm::Constructed, 0);
        let explicit = base.explicitly_tagged(context_tag, "World_Schema");
        let Type::Message(explicit_lv) = explicit.lv_ty().unwrap().as_ref().clone() else { panic!("expected a message") };
        // The explicit wrapper's Value field holds the `Inner` sequence's own
        // TLV, one more envelope than a plain implicit tag would have.
        let value_field_ty = &explicit_lv.fields.iter().find(|(f, _)| *f == Field::named("Value")).unwrap().1;
        assert!(matches!(value_field_ty.as_ref(), Type::Message(_)));
    }
}
