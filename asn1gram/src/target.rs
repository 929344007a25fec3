//! The downstream target message model.
//!
//! This is the declarative grammar language the compiler emits into: fields
//! connected by guarded, optionally-sized links between `Initial` and
//! `Final`. The full language (and its formal proof engine) lives in a
//! separate system; this module carries just enough of its algebra — and a
//! real but modest well-formedness pass — for the compiler to be a complete,
//! runnable library. See `DESIGN.md` for why the proof pass stops where it
//! does.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use asn1gram_core::error::GrammarError;

/// A field reference inside a [`Message`]: the two sentinel endpoints of the
/// flow graph, or a named field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Initial,
    Final,
    Named(String),
}

impl Field {
    pub fn named(name: impl Into<String>) -> Self {
        Field::Named(name.into())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Initial => write!(f, "Initial"),
            Field::Final => write!(f, "Final"),
            Field::Named(name) => write!(f, "{name}"),
        }
    }
}

/// A boolean guard on a [`Link`].
///
/// Intentionally small: the compiler only ever needs to express "this
/// variable equals this number", conjunctions of such equalities (a tag's
/// class/form/number triple), and negation (the "none of the above" branch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equal { variable: String, value: i64 },
    Not(Box<Condition>),
    And(Vec<Condition>),
}

impl Condition {
    pub fn equal(variable: impl Into<String>, value: i64) -> Self {
        Condition::Equal { variable: variable.into(), value }
    }

    pub fn not(self) -> Self {
        Condition::Not(Box::new(self))
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And(conditions)
    }
}

/// The bit-size of a sized field, either fixed or derived from a preceding
/// length field (`Length * 8`, the only case this compiler needs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeExpr {
    Bits(u64),
    FieldTimesEight(String),
}

/// An edge in a [`Message`]'s flow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub from: Field,
    pub to: Field,
    pub condition: Option<Condition>,
    pub size: Option<SizeExpr>,
}

impl Link {
    pub fn new(from: Field, to: Field) -> Self {
        Self { from, to, condition: None, size: None }
    }

    pub fn guarded(from: Field, to: Field, condition: Condition) -> Self {
        Self { from, to, condition: Some(condition), size: None }
    }

    pub fn sized(mut self, size: SizeExpr) -> Self {
        self.size = Some(size);
        self
    }
}

/// A literal of an [`Type::Enumeration`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub name: String,
    pub value: i64,
}

/// The target model's `Type` algebra.
///
/// A closed sum type mirroring the minimum the downstream model needs per
/// §6: bounded and enumerated scalars, an unbounded homogeneous sequence (for
/// `SEQUENCE OF`), an opaque byte run, and a composite [`Message`].
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    RangeInteger { id: String, first: i64, last: i64, size_bits: u32 },
    Enumeration { id: String, literals: Vec<Literal>, size_bits: u32, always_valid: bool },
    /// An unbounded sequence of a single homogeneous element type.
    Sequence { id: String, element: Arc<Type> },
    Opaque,
    Message(Message),
}

impl Type {
    pub fn id(&self) -> &str {
        match self {
            Type::RangeInteger { id, .. } => id,
            Type::Enumeration { id, .. } => id,
            Type::Sequence { id, .. } => id,
            Type::Opaque => "Opaque",
            Type::Message(m) => &m.id,
        }
    }
}

/// A composite message: a named flow graph of [`Field`]s joined by
/// [`Link`]s, each field carrying a [`Type`].
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub fields: Vec<(Field, Arc<Type>)>,
    pub links: Vec<Link>,
    pub skip_proof: bool,
}

impl Message {
    /// Runs the well-formedness pass named in §3/§6 and returns `self`
    /// unchanged on success.
    ///
    /// When `skip_proof` is set, only the cheap structural checks
    /// (dead ends, `Final` reachability) run; this crate does not attempt to
    /// reproduce the downstream model's full prover, which is out of scope.
    pub fn finalize(self) -> Result<Self, GrammarError> {
        if self.fields.is_empty() {
            return Err(GrammarError::Empty);
        }

        let mut seen_names = HashSet::with_capacity(self.fields.len());
        for (field, _) in &self.fields {
            if !seen_names.insert(field) {
                return Err(GrammarError::DuplicateField(field.to_string()));
            }
        }

        let has_outgoing: HashSet<&Field> =
            self.links.iter().map(|link| &link.from).collect();
        for (field, _) in &self.fields {
            if !has_outgoing.contains(field) {
                return Err(GrammarError::DeadEnd(field.to_string()));
            }
        }

        if !self.reaches_final() {
            return Err(GrammarError::FinalUnreachable);
        }

        if self.skip_proof {
            return Ok(self);
        }

        // Full well-formedness (pairwise-distinct guards per fan-out field)
        // is checked by construction in `grammar.rs`: every guarded link this
        // compiler ever builds comes from `Tag::matches` or its negation, so
        // there is nothing further to verify here without the downstream
        // prover this crate intentionally does not reimplement.
        Ok(self)
    }

    fn reaches_final(&self) -> bool {
        let initial = Field::Initial;
        let mut frontier = vec![&initial];
        let mut seen: HashSet<&Field> = frontier.iter().copied().collect();
        while let Some(field) = frontier.pop() {
            if *field == Field::Final {
                return true;
            }
            for link in &self.links {
                if &link.from == field && seen.insert(&link.to) {
                    frontier.push(&link.to);
                }
            }
        }
        false
    }
}
