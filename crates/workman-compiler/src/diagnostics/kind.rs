//! Machine-readable diagnostic reasons.

/// The `reason` identifier carried by every diagnostic.
///
/// Grouped by the stage that emits it. The string form is part of the
/// diagnostic contract and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    // Lexer
    UnexpectedCharacter,
    UnterminatedString,

    // Parser
    ExpectedToken,
    UnexpectedKeyword,
    MissingSemicolon,
    MalformedPattern,
    UnknownOperator,
    DuplicateSpecifier,
    MatchArmNotBlock,
    FirstClassMatchScrutinee,

    // Inferencer
    UnknownIdentifier,
    UnknownTypeConstructor,
    UnknownConstructor,
    TypeMismatch,
    OccursCheck,
    NonExhaustiveMatch,
    DuplicatePatternVariable,
    TupleArityMismatch,
    ConstructorArityMismatch,
    RecursiveBindingNotFunction,

    // Solver
    UnresolvedUnification,
    InfectiousCallResultMismatch,
    BranchJoinMismatch,
    UnknownField,

    // Constraint flow
    BoundaryViolation,
    IncompatibleConstraints,

    // Module resolver
    CircularDependency,
    UnresolvedSpecifier,
    UnsupportedModuleSpecifier,
    MissingExport,

    // Foreign provider
    ForeignTypeError,

    // MIR lowering
    StringPatternUnsupported,
}

impl DiagnosticKind {
    /// Short enum-like identifier, stable across releases.
    pub fn reason(self) -> &'static str {
        match self {
            DiagnosticKind::UnexpectedCharacter => "unexpected_character",
            DiagnosticKind::UnterminatedString => "unterminated_string",
            DiagnosticKind::ExpectedToken => "expected_token",
            DiagnosticKind::UnexpectedKeyword => "unexpected_keyword",
            DiagnosticKind::MissingSemicolon => "missing_semicolon",
            DiagnosticKind::MalformedPattern => "malformed_pattern",
            DiagnosticKind::UnknownOperator => "unknown_operator",
            DiagnosticKind::DuplicateSpecifier => "duplicate_specifier",
            DiagnosticKind::MatchArmNotBlock => "match_arm_not_block",
            DiagnosticKind::FirstClassMatchScrutinee => "first_class_match_scrutinee",
            DiagnosticKind::UnknownIdentifier => "unknown_identifier",
            DiagnosticKind::UnknownTypeConstructor => "unknown_type_constructor",
            DiagnosticKind::UnknownConstructor => "unknown_constructor",
            DiagnosticKind::TypeMismatch => "type_mismatch",
            DiagnosticKind::OccursCheck => "occurs_check",
            DiagnosticKind::NonExhaustiveMatch => "non_exhaustive_match",
            DiagnosticKind::DuplicatePatternVariable => "duplicate_pattern_variable",
            DiagnosticKind::TupleArityMismatch => "tuple_arity_mismatch",
            DiagnosticKind::ConstructorArityMismatch => "constructor_arity_mismatch",
            DiagnosticKind::RecursiveBindingNotFunction => "recursive_binding_not_function",
            DiagnosticKind::UnresolvedUnification => "unresolved_unification",
            DiagnosticKind::InfectiousCallResultMismatch => "infectious_call_result_mismatch",
            DiagnosticKind::BranchJoinMismatch => "branch_join_mismatch",
            DiagnosticKind::UnknownField => "unknown_field",
            DiagnosticKind::BoundaryViolation => "boundary_violation",
            DiagnosticKind::IncompatibleConstraints => "incompatible_constraints",
            DiagnosticKind::CircularDependency => "circular_dependency",
            DiagnosticKind::UnresolvedSpecifier => "unresolved_specifier",
            DiagnosticKind::UnsupportedModuleSpecifier => "unsupported_module_specifier",
            DiagnosticKind::MissingExport => "missing_export",
            DiagnosticKind::ForeignTypeError => "foreign_type_error",
            DiagnosticKind::StringPatternUnsupported => "string_pattern_unsupported",
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}
