//! Parser: tokens to surface AST.
//!
//! Recursive descent for declarations, patterns, and types; precedence
//! climbing for expressions, driven by the operator tables that
//! `infix`/`infixl`/`infixr`/`prefix` declarations extend while the
//! module is being parsed. Unknown operators are rejected here, not at
//! inference time.
//!
//! Parse errors are fatal per module: the parser recovers just enough to
//! keep collecting diagnostics, and the caller refuses to run inference
//! when any were recorded.

pub mod ast;

mod expressions;
mod items;
mod patterns;
mod types;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use workman_core::{NodeIdGen, Span};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::lexer::{self, Token, TokenKind};

use ast::{Assoc, Expr, ExprKind, Pattern, Program};

/// Nesting limit for expressions/patterns/types.
const MAX_DEPTH: u32 = 128;

/// Operator spellings that cannot be user-declared.
const RESERVED_OPERATORS: &[&str] = &["=", "=>", "|", "->"];

/// Precedence and associativity of one infix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfixInfo {
    pub precedence: u8,
    pub assoc: Assoc,
}

/// The operator tables consulted by the expression parser.
///
/// Seeded with the prelude operators; `infix`/`prefix` declarations add
/// to them as they are parsed, affecting everything downstream of the
/// declaration.
#[derive(Debug, Clone)]
pub struct OperatorTables {
    infix: HashMap<String, InfixInfo>,
    prefix: Vec<String>,
}

impl Default for OperatorTables {
    fn default() -> Self {
        let mut infix = HashMap::new();
        let defaults: &[(&str, u8, Assoc)] = &[
            ("*", 7, Assoc::Left),
            ("/", 7, Assoc::Left),
            ("+", 6, Assoc::Left),
            ("-", 6, Assoc::Left),
            ("==", 4, Assoc::None),
            ("!=", 4, Assoc::None),
            ("<", 4, Assoc::None),
            (">", 4, Assoc::None),
            ("<=", 4, Assoc::None),
            (">=", 4, Assoc::None),
            ("&&", 3, Assoc::Right),
            ("||", 2, Assoc::Right),
        ];
        for &(op, precedence, assoc) in defaults {
            infix.insert(op.to_string(), InfixInfo { precedence, assoc });
        }
        Self {
            infix,
            prefix: vec!["!".to_string()],
        }
    }
}

impl OperatorTables {
    pub fn infix(&self, op: &str) -> Option<InfixInfo> {
        self.infix.get(op).copied()
    }

    pub fn is_prefix(&self, op: &str) -> bool {
        self.prefix.iter().any(|p| p == op)
    }

    pub fn declare_infix(&mut self, op: &str, precedence: u8, assoc: Assoc) {
        self.infix
            .insert(op.to_string(), InfixInfo { precedence, assoc });
    }

    pub fn declare_prefix(&mut self, op: &str) {
        if !self.is_prefix(op) {
            self.prefix.push(op.to_string());
        }
    }
}

/// Parse a source file into a surface AST.
///
/// Lexing happens internally; lex errors surface in the returned
/// diagnostics and suppress parsing (an empty program is returned).
pub fn parse(source: &str) -> (Program, Diagnostics) {
    let (tokens, lex_diagnostics) = lexer::lex(source);
    if lex_diagnostics.has_errors() {
        let program = Program {
            items: Vec::new(),
            span: Span::new(0, source.len() as u32),
        };
        return (program, lex_diagnostics);
    }

    let mut parser = Parser::new(source, tokens);
    let program = parser.parse_program();
    (program, parser.diagnostics)
}

pub struct Parser<'s> {
    pub(crate) source: &'s str,
    pub(crate) tokens: Vec<Token>,
    /// Current position in `tokens`. Monotonically increases, except for
    /// in-place `>`-run splitting when closing type arguments.
    pub(crate) pos: usize,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) ids: NodeIdGen,
    pub(crate) operators: OperatorTables,
    pub(crate) depth: u32,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            diagnostics: Diagnostics::new(),
            ids: NodeIdGen::new(),
            operators: OperatorTables::default(),
            depth: 0,
        }
    }

    // ---- token access -------------------------------------------------

    pub(crate) fn current(&self) -> TokenKind {
        self.nth(0)
    }

    pub(crate) fn nth(&self, lookahead: usize) -> TokenKind {
        self.tokens
            .get(self.pos + lookahead)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map_or_else(|| Span::empty(self.source.len() as u32), |t| t.span)
    }

    pub(crate) fn current_text(&self) -> &'s str {
        match self.tokens.get(self.pos) {
            Some(t) => lexer::token_text(self.source, t),
            None => "",
        }
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn eof(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    pub(crate) fn bump(&mut self) -> Span {
        let span = self.current_span();
        if !self.eof() {
            self.pos += 1;
        }
        span
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume `kind` or report `expected_token`.
    pub(crate) fn expect(&mut self, kind: TokenKind, context: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error_expected(kind.describe(), context);
        false
    }

    /// Consume a `;`, with the canonical hint when missing.
    pub(crate) fn expect_semicolon(&mut self) -> bool {
        if self.eat(TokenKind::Semicolon) {
            return true;
        }
        self.diagnostics
            .error(
                DiagnosticKind::MissingSemicolon,
                format!("expected `;`, found {}", self.current().describe()),
                self.current_span(),
            )
            .hint("Statements must be terminated with a semicolon")
            .emit();
        false
    }

    pub(crate) fn error_expected(&mut self, what: &str, context: &str) {
        let found = self.current();
        let kind = if found.is_keyword() {
            DiagnosticKind::UnexpectedKeyword
        } else {
            DiagnosticKind::ExpectedToken
        };
        self.diagnostics
            .error(
                kind,
                format!("expected {what} in {context}, found {}", found.describe()),
                self.current_span(),
            )
            .emit();
    }

    /// Skip to just past the next `;` (or a closing brace / EOF), so the
    /// next declaration can be attempted.
    pub(crate) fn recover_to_semicolon(&mut self) {
        loop {
            match self.current() {
                TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                TokenKind::Eof | TokenKind::BraceClose => return,
                TokenKind::KwLet
                | TokenKind::KwType
                | TokenKind::KwImport
                | TokenKind::KwExport
                | TokenKind::KwFrom => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    // ---- depth guard --------------------------------------------------

    pub(crate) fn enter_depth(&mut self) -> bool {
        if self.depth >= MAX_DEPTH {
            self.diagnostics
                .error(
                    DiagnosticKind::ExpectedToken,
                    "input nested too deeply",
                    self.current_span(),
                )
                .emit();
            return false;
        }
        self.depth += 1;
        true
    }

    pub(crate) fn exit_depth(&mut self) {
        self.depth -= 1;
    }

    // ---- node construction --------------------------------------------

    pub(crate) fn mk_expr(&mut self, span: Span, kind: ExprKind) -> Expr {
        Expr {
            id: self.ids.fresh(),
            span,
            kind,
        }
    }

    pub(crate) fn mk_pattern(&mut self, span: Span, kind: ast::PatKind) -> Pattern {
        Pattern {
            id: self.ids.fresh(),
            span,
            kind,
        }
    }

    pub(crate) fn mk_type(&mut self, span: Span, kind: ast::TypeExprKind) -> ast::TypeExpr {
        ast::TypeExpr {
            id: self.ids.fresh(),
            span,
            kind,
        }
    }

    pub(crate) fn mk_ident(&mut self, name: impl Into<String>, span: Span) -> ast::Ident {
        ast::Ident {
            id: self.ids.fresh(),
            name: name.into(),
            span,
        }
    }

    // ---- operators ----------------------------------------------------

    /// Text of the current token when it can act as a binary operator.
    pub(crate) fn peek_operator(&self) -> Option<(&'s str, Span)> {
        match self.current() {
            TokenKind::Operator | TokenKind::Lt | TokenKind::Gt => {
                Some((self.current_text(), self.current_span()))
            }
            _ => None,
        }
    }

    // ---- program ------------------------------------------------------

    pub fn parse_program(&mut self) -> Program {
        let mut items = Vec::new();

        while !self.eof() {
            let before = self.pos;
            if let Some(item) = self.parse_item() {
                items.push(item);
            }
            if self.pos == before {
                // No progress; drop the offending token to avoid looping.
                self.bump();
            }
        }

        let span = Span::new(0, self.source.len() as u32);
        Program { items, span }
    }
}
