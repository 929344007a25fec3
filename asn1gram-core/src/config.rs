/// Options recognized by the compiler.
///
/// Mirrors the two knobs the source tool exposes: a path prefix applied to
/// every emitted qualified identifier, and whether to skip the downstream
/// model's (expensive) well-formedness proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Prefix prepended to every emitted qualified identifier. Empty by default.
    pub base_path: String,
    /// Forwarded to the downstream finalizer; skips model verification when `true`.
    pub skip_proof: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self { base_path: String::new(), skip_proof: true }
    }
}

impl CompilerConfig {
    pub fn new(base_path: impl Into<String>, skip_proof: bool) -> Self {
        Self { base_path: base_path.into(), skip_proof }
    }
}
