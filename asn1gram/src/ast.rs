//! The shape of data an ASN.1 textual parser would hand this compiler.
//!
//! Parsing ASN.1 module text into these types is an external collaborator's
//! job (see §1/§6) — this module only pins down the interface the
//! [`crate::compiler::Compiler`] dispatches on, so the rest of the crate has
//! something concrete to compile against.

use std::collections::BTreeMap;

/// A single-octet BER tag as it appears on an AST node, before it has been
/// parsed into a [`crate::tag::Tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTag {
    pub byte: u8,
}

/// The closed set of ASN.1 constructs this compiler understands.
///
/// Anything else (`SET`, `ENUMERATED`, `REAL`, date/time types,
/// extensibility markers, long tags) is rejected by the compiler with
/// `UnsupportedAsnKind` rather than accepted here, per the non-goals in §1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsnType {
    Boolean,
    Null,
    Integer,
    ObjectIdentifier,
    BitString,
    OctetString,
    PrintableString,
    IA5String,
    Sequence(SequenceType),
    SequenceOf(SequenceOfType),
    Choice(ChoiceType),
    ExplicitTag(ExplicitTagType),
}

/// A named field or alternative: `(name, type)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub ty: Box<TypeNode>,
}

/// A `SEQUENCE { ... }` declaration's root-level members, in declaration
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceType {
    pub name: String,
    pub root_members: Vec<Member>,
}

/// A `SEQUENCE OF <element>` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceOfType {
    pub name: String,
    pub element_type: Box<TypeNode>,
}

/// A `CHOICE { ... }` declaration's alternatives, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceType {
    pub name: String,
    pub members: Vec<Member>,
}

/// An ASN.1 `[n] EXPLICIT <inner>` construct. Implicit tagging is instead
/// carried as the optional `tag` on every [`TypeNode`] (ASN.1's default
/// tagging environment), mirrored here as `tag`/`tag_len` per §6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitTagType {
    pub tag: RawTag,
    pub inner: Box<TypeNode>,
}

/// A type occurrence as it appears inside a module: the constructor plus an
/// optional implicit-tag override carried alongside it.
///
/// `tag_len` mirrors the upstream interface's `tag_len` attribute (§6): any
/// value other than `1` means a long-form tag, which this compiler rejects
/// via `LongTagUnsupported` rather than silently truncating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub ty: AsnType,
    pub tag: Option<RawTag>,
    pub tag_len: usize,
}

impl TypeNode {
    pub fn new(ty: AsnType) -> Self {
        Self { ty, tag: None, tag_len: 0 }
    }

    pub fn with_tag(mut self, tag: RawTag) -> Self {
        self.tag = Some(tag);
        self.tag_len = 1;
        self
    }
}

/// One module's declared types, keyed by type name; `BTreeMap` keeps
/// iteration order deterministic across runs, matching §9's determinism
/// requirement for emitted grammars.
pub type ModuleTypes = BTreeMap<String, TypeDecl>;

/// A single `<name> ::= <type>` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub ty: TypeNode,
}

/// A compiled ASN.1 specification: modules, each holding its declared types.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Spec {
    pub modules: BTreeMap<String, ModuleTypes>,
}
