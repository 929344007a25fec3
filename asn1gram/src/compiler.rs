//! Walks a compiled ASN.1 [`ast::Spec`] and dispatches each declared type to
//! a [`BerType`] constructor, assembling the full module → type map.

use std::collections::HashMap;
use std::sync::Arc;

use asn1gram_core::config::CompilerConfig;
use asn1gram_core::error::CompileError;

use crate::ast::{self, AsnType, TypeNode};
use crate::bertype::BerType;
use crate::ident::{from_asn1_name, IdentBuilder};
use crate::prelude;
use crate::tag::Tag;
use crate::target::Type;

/// Per-compilation state: just the identifier builder seeded from
/// [`CompilerConfig::base_path`]. Holds no mutable state of its own — every
/// `BerType` it produces is immutable, so a `Compiler` can be reused (or
/// dropped) freely between calls.
pub struct Compiler {
    idents: IdentBuilder,
}

impl Compiler {
    pub fn new(config: &CompilerConfig) -> Self {
        Self { idents: IdentBuilder::new(config.base_path.clone()) }
    }

    /// `convert(ast_node, relative_path) → BerType`, per §4.4's dispatch
    /// table.
    pub fn convert(&self, node: &TypeNode, relpath: &str) -> Result<Arc<BerType>, CompileError> {
        if let AsnType::ExplicitTag(explicit) = &node.ty {
            let inner = self.convert(&explicit.inner, relpath)?;
            let tag = Tag::from_byte(explicit.tag.byte)?;
            return Ok(inner.explicitly_tagged(tag, self.idents.path(relpath)));
        }

        let path = self.idents.path(relpath);
        let base = match &node.ty {
            AsnType::Boolean => Arc::clone(&prelude::BOOLEAN),
            AsnType::Null => Arc::clone(&prelude::NULL),
            AsnType::Integer => Arc::clone(&prelude::INTEGER),
            AsnType::ObjectIdentifier => Arc::clone(&prelude::OBJECT_IDENTIFIER),
            AsnType::BitString => Arc::clone(&prelude::BIT_STRING),
            AsnType::OctetString => Arc::clone(&prelude::OCTET_STRING),
            AsnType::PrintableString => Arc::clone(&prelude::PRINTABLE_STRING),
            AsnType::IA5String => Arc::clone(&prelude::IA5_STRING),
            AsnType::Sequence(seq) => {
                let mut fields = Vec::with_capacity(seq.root_members.len());
                for member in &seq.root_members {
                    fields.push((from_asn1_name(&member.name), self.convert(&member.ty, relpath)?));
                }
                Arc::new(BerType::sequence(path, from_asn1_name(&seq.name), fields))
            }
            AsnType::SequenceOf(seq_of) => {
                let elem = self.convert(&seq_of.element_type, relpath)?;
                Arc::new(BerType::sequence_of(path, elem.tlv_ty(true)?))
            }
            AsnType::Choice(choice) => {
                let mut variants = Vec::with_capacity(choice.members.len());
                for member in &choice.members {
                    variants.push((from_asn1_name(&member.name), self.convert(&member.ty, relpath)?));
                }
                Arc::new(BerType::choice(path, from_asn1_name(&choice.name), variants))
            }
            AsnType::ExplicitTag(_) => unreachable!("handled above"),
        };

        self.convert_implicit(base, node, relpath)
    }

    /// `__convert_implicit(base, ast_node, relpath)`.
    fn convert_implicit(&self, base: Arc<BerType>, node: &TypeNode, relpath: &str) -> Result<Arc<BerType>, CompileError> {
        let Some(raw_tag) = node.tag else {
            return Ok(base);
        };
        if node.tag_len != 1 {
            return Err(CompileError::LongTagUnsupported);
        }
        let tag = Tag::from_byte(raw_tag.byte)?;
        Ok(base.implicitly_tagged(tag, self.idents.path(relpath)))
    }
}

/// `convert_spec(spec, config) → Map<QualifiedId, TargetType>`.
///
/// Iterates modules in their (deterministic, `BTreeMap`-ordered) declaration
/// order; fails the whole call on the first sub-materialization error, per
/// §5's "no partial output is published".
pub fn convert_spec(spec: &ast::Spec, config: &CompilerConfig) -> Result<HashMap<String, Arc<Type>>, CompileError> {
    let compiler = Compiler::new(config);
    let mut out = HashMap::new();

    for (module_name, types) in &spec.modules {
        let relpath = from_asn1_name(module_name);
        log::debug!("compiling module {module_name} ({} types)", types.len());
        for (type_name, decl) in types {
            log::trace!("converting {module_name}::{type_name}");
            let ber = compiler.convert(&decl.ty, &relpath)?;
            let tlv = ber.tlv_ty(config.skip_proof)?;
            let qualified_id = tlv.id().to_owned();

            if qualified_id.starts_with(prelude::PRELUDE_NAME) {
                log::trace!("excluding prelude-namespaced identifier {qualified_id}");
                continue;
            }
            if out.insert(qualified_id.clone(), tlv).is_some() {
                log::warn!("qualified identifier {qualified_id} was emitted more than once");
            }
        }
    }

    Ok(out)
}
