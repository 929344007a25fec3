//! Identifier normalization and qualified-path composition.

/// Converts an ASN.1 identifier (hyphen-allowed) to the target syntax by
/// replacing `-` with `_`.
pub fn from_asn1_name(ident: &str) -> String {
    ident.replace('-', "_")
}

/// Joins non-empty path components with `::`, the target model's qualified
/// identifier separator.
pub fn qualify(components: &[&str]) -> String {
    components
        .iter()
        .filter(|component| !component.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("::")
}

/// Builds qualified identifiers for a single compilation: every identifier
/// this compiler emits is `base_path ⊕ relative_path ⊕ ident`.
#[derive(Debug, Clone, Default)]
pub struct IdentBuilder {
    base_path: String,
}

impl IdentBuilder {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self { base_path: base_path.into() }
    }

    /// The qualified path for a relative path under this builder's base
    /// path, e.g. `qualify(["Foo"])` once `relpath = "Foo"` has been
    /// resolved by the caller.
    pub fn path(&self, relpath: &str) -> String {
        qualify(&[self.base_path.as_str(), relpath])
    }

    /// The fully qualified identifier for `ident` under `relpath`.
    pub fn qualified(&self, relpath: &str, ident: &str) -> String {
        qualify(&[self.base_path.as_str(), relpath, ident])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_hyphens() {
        assert_eq!(from_asn1_name("Application-Context-Name"), "Application_Context_Name");
    }

    #[test]
    fn leaves_plain_identifiers_untouched() {
        assert_eq!(from_asn1_name("INTEGER"), "INTEGER");
    }

    #[test]
    fn qualify_skips_empty_components() {
        assert_eq!(qualify(&["", "World_Schema", ""]), "World_Schema");
        assert_eq!(qualify(&["Prelude", "INTEGER"]), "Prelude::INTEGER");
    }

    #[test]
    fn ident_builder_composes_base_path() {
        let builder = IdentBuilder::new("Base");
        assert_eq!(builder.path("World_Schema"), "Base::World_Schema");
        assert_eq!(builder.qualified("World_Schema", "Rocket"), "Base::World_Schema::Rocket");
    }

    #[test]
    fn ident_builder_with_empty_base_path() {
        let builder = IdentBuilder::default();
        assert_eq!(builder.qualified("World_Schema", "Rocket"), "World_Schema::Rocket");
    }
}
