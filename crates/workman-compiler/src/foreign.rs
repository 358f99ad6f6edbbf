//! Foreign type provider interface.
//!
//! Foreign (C-header-derived) declarations enter the pipeline as
//! read-only environment seeds. Extraction itself lives outside the
//! core; this module only defines the injected interface and the result
//! shape the pipeline consumes.

use indexmap::IndexMap;

use crate::infer::adt::AdtInfo;
use crate::types::{ErrorRow, Scheme};

/// What a provider is asked for.
#[derive(Debug, Clone)]
pub struct ForeignRequest {
    /// The importing module's path.
    pub module: String,
    /// Provider-specific specifier (e.g. a header path).
    pub specifier: String,
}

/// Declarations supplied by a foreign provider.
#[derive(Debug, Clone, Default)]
pub struct ForeignTypes {
    pub values: IndexMap<String, Scheme>,
    pub types: Vec<AdtInfo>,
    pub row_aliases: IndexMap<String, ErrorRow>,
    /// Freeform provider diagnostics, surfaced as `foreign_type_error`
    /// entries with their detail string.
    pub diagnostics: Vec<String>,
}

impl ForeignTypes {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
            && self.types.is_empty()
            && self.row_aliases.is_empty()
            && self.diagnostics.is_empty()
    }
}

/// The injected provider. Implementations live with the embedder; the
/// pipeline treats the output as read-only seeds.
pub trait ForeignTypeProvider {
    fn provide(&self, request: &ForeignRequest) -> ForeignTypes;
}
