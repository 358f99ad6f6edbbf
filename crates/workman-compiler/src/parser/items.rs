//! Declaration grammar: imports, re-exports, lets, types, operators.

use std::collections::HashSet;

use workman_core::Span;

use crate::diagnostics::DiagnosticKind;
use crate::lexer::{TokenKind, unescape_string};

use super::ast::{
    Assoc, Binding, Block, CtorDecl, Expr, ExprKind, Ident, ImportDecl, ImportNames,
    ImportSpecifier, InfixDecl, Item, LetDecl, Param, PrefixDecl, ReExportDecl, ReExportItem,
    TypeDecl, TypeRhs,
};
use super::{Parser, RESERVED_OPERATORS};

impl<'s> Parser<'s> {
    pub(crate) fn parse_item(&mut self) -> Option<Item> {
        match self.current() {
            TokenKind::KwFrom => self.parse_import().map(Item::Import),
            TokenKind::KwExport => {
                if self.nth(1) == TokenKind::KwFrom {
                    return self.parse_reexport().map(Item::ReExport);
                }
                self.bump();
                self.parse_decl(true)
            }
            TokenKind::KwLet
            | TokenKind::KwType
            | TokenKind::KwInfix
            | TokenKind::KwInfixl
            | TokenKind::KwInfixr
            | TokenKind::KwPrefix => self.parse_decl(false),
            _ => {
                self.error_expected("a declaration", "module body");
                self.recover_to_semicolon();
                None
            }
        }
    }

    fn parse_decl(&mut self, exported: bool) -> Option<Item> {
        match self.current() {
            TokenKind::KwLet => self.parse_let_decl(exported).map(Item::Let),
            TokenKind::KwType => self.parse_type_decl(exported).map(Item::Type),
            TokenKind::KwInfix | TokenKind::KwInfixl | TokenKind::KwInfixr => {
                self.parse_infix_decl(exported).map(Item::Infix)
            }
            TokenKind::KwPrefix => self.parse_prefix_decl(exported).map(Item::Prefix),
            _ => {
                self.error_expected("`let`, `type`, `infix`, or `prefix`", "declaration");
                self.recover_to_semicolon();
                None
            }
        }
    }

    // ---- imports ------------------------------------------------------

    /// `from "path" import { a, b as c };` | `from "path" import * as ns;`
    fn parse_import(&mut self) -> Option<ImportDecl> {
        let start = self.bump(); // `from`
        let (path, path_span) = self.parse_module_path()?;
        self.expect(TokenKind::KwImport, "import declaration");

        let names = if self.at(TokenKind::Operator) && self.current_text() == "*" {
            self.bump();
            self.expect(TokenKind::KwAs, "namespace import");
            let ns = self.parse_ident("namespace name")?;
            ImportNames::Namespace(ns)
        } else {
            self.expect(TokenKind::BraceOpen, "import list");
            let mut specifiers = Vec::new();
            let mut seen: HashSet<String> = HashSet::new();
            while !self.at(TokenKind::BraceClose) && !self.eof() {
                if let Some(spec) = self.parse_import_specifier() {
                    let local = spec.local_name().to_string();
                    if !seen.insert(local.clone()) {
                        self.diagnostics
                            .error(
                                DiagnosticKind::DuplicateSpecifier,
                                format!("duplicate import binding `{local}`"),
                                spec.name.span,
                            )
                            .emit();
                    }
                    specifiers.push(spec);
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::BraceClose, "import list");
            ImportNames::Named(specifiers)
        };

        let end = self.current_span();
        self.expect_semicolon();
        Some(ImportDecl {
            path,
            path_span,
            names,
            span: start.cover(end),
        })
    }

    fn parse_import_specifier(&mut self) -> Option<ImportSpecifier> {
        let name = match self.current() {
            TokenKind::Ident | TokenKind::Upper => {
                let span = self.current_span();
                let text = self.current_text().to_string();
                self.bump();
                self.mk_ident(text, span)
            }
            _ => {
                self.error_expected("an imported name", "import list");
                return None;
            }
        };
        let local = if self.eat(TokenKind::KwAs) {
            match self.current() {
                TokenKind::Ident | TokenKind::Upper => {
                    let span = self.current_span();
                    let text = self.current_text().to_string();
                    self.bump();
                    Some(self.mk_ident(text, span))
                }
                _ => {
                    self.error_expected("a local name", "import alias");
                    None
                }
            }
        } else {
            None
        };
        Some(ImportSpecifier { name, local })
    }

    /// `export from "path" type Name, Name(..);`
    fn parse_reexport(&mut self) -> Option<ReExportDecl> {
        let start = self.bump(); // `export`
        self.expect(TokenKind::KwFrom, "re-export");
        let (path, path_span) = self.parse_module_path()?;
        self.expect(TokenKind::KwType, "re-export");

        let mut items = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        loop {
            let name = match self.current() {
                TokenKind::Upper => {
                    let span = self.current_span();
                    let text = self.current_text().to_string();
                    self.bump();
                    self.mk_ident(text, span)
                }
                _ => {
                    self.error_expected("a type name", "re-export list");
                    break;
                }
            };
            // `Name(..)` re-exports the constructors too.
            let with_constructors = if self.at(TokenKind::ParenOpen) {
                self.bump();
                self.expect(TokenKind::Dot, "constructor re-export");
                self.expect(TokenKind::Dot, "constructor re-export");
                self.expect(TokenKind::ParenClose, "constructor re-export");
                true
            } else {
                false
            };
            if !seen.insert(name.name.clone()) {
                self.diagnostics
                    .error(
                        DiagnosticKind::DuplicateSpecifier,
                        format!("duplicate re-export `{}`", name.name),
                        name.span,
                    )
                    .emit();
            }
            items.push(ReExportItem {
                name,
                with_constructors,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        let end = self.current_span();
        self.expect_semicolon();
        Some(ReExportDecl {
            path,
            path_span,
            items,
            span: start.cover(end),
        })
    }

    fn parse_module_path(&mut self) -> Option<(String, Span)> {
        if !self.at(TokenKind::Str) {
            self.error_expected("a module path string", "import declaration");
            self.recover_to_semicolon();
            return None;
        }
        let span = self.current_span();
        let raw = self.current_text();
        let path = unescape_string(&raw[1..raw.len() - 1]);
        self.bump();
        Some((path, span))
    }

    // ---- let ----------------------------------------------------------

    /// `let [rec] binding (and binding)* ;`
    pub(crate) fn parse_let_decl(&mut self, exported: bool) -> Option<LetDecl> {
        let start = self.bump(); // `let`
        let recursive = self.eat(TokenKind::KwRec);

        let mut bindings = Vec::new();
        loop {
            if let Some(binding) = self.parse_binding() {
                bindings.push(binding);
            } else {
                self.recover_to_semicolon();
                return None;
            }
            if !self.eat(TokenKind::KwAnd) {
                break;
            }
        }

        let end = self.current_span();
        self.expect_semicolon();
        Some(LetDecl {
            exported,
            recursive,
            bindings,
            span: start.cover(end),
        })
    }

    /// `name [: type] = expr`
    fn parse_binding(&mut self) -> Option<Binding> {
        let name = self.parse_ident("binding name")?;
        let annotation = if self.eat(TokenKind::Colon) {
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq, "binding");

        let value = if self.at(TokenKind::KwMatch) {
            // First-class match: `let f = match(x) { ... }` desugars in
            // place to `let f = (x) => { match(x) { ... } }`.
            let match_expr = self.parse_match_expr()?;
            self.desugar_first_class_match(match_expr)
        } else {
            self.parse_expr()?
        };

        let span = name.span.cover(value.span);
        Some(Binding {
            name,
            annotation,
            value,
            span,
        })
    }

    /// Wrap `match(x) { ... }` into `(x) => { match(x) { ... } }`.
    /// The scrutinee must be a bare identifier.
    fn desugar_first_class_match(&mut self, match_expr: Expr) -> Expr {
        let scrutinee_name = match &match_expr.kind {
            ExprKind::Match { scrutinee, .. } => match &scrutinee.kind {
                ExprKind::Var(name) => Some(name.clone()),
                _ => None,
            },
            _ => None,
        };

        let Some(name) = scrutinee_name else {
            self.diagnostics
                .error(
                    DiagnosticKind::FirstClassMatchScrutinee,
                    "first-class match must scrutinize a bare identifier",
                    match_expr.span,
                )
                .emit();
            return match_expr;
        };

        let span = match_expr.span;
        let param_ident = self.mk_ident(name, span);
        let block = self.mk_expr(
            span,
            ExprKind::Block(Block {
                stmts: Vec::new(),
                result: Some(Box::new(match_expr)),
            }),
        );
        self.mk_expr(
            span,
            ExprKind::Arrow {
                params: vec![Param {
                    name: param_ident,
                    annotation: None,
                }],
                body: Box::new(block),
            },
        )
    }

    // ---- type declarations --------------------------------------------

    /// `type Name<P1, P2> = [|] member (| member)* ;`
    fn parse_type_decl(&mut self, exported: bool) -> Option<TypeDecl> {
        let start = self.bump(); // `type`
        let name = self.parse_upper_ident("type name")?;

        let mut params = Vec::new();
        if self.eat(TokenKind::Lt) {
            loop {
                match self.parse_upper_ident("type parameter") {
                    Some(p) => params.push(p),
                    None => break,
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            if !self.eat_angle_close() {
                self.error_expected("`>`", "type parameter list");
            }
        }

        self.expect(TokenKind::Eq, "type declaration");

        let rhs = if self.at(TokenKind::Lt) {
            // Error-row alias: `type Err = <NotMul>;`
            TypeRhs::ErrorRow(self.parse_row_type()?)
        } else {
            self.eat(TokenKind::Pipe); // optional leading `|`
            let mut members = Vec::new();
            loop {
                match self.parse_ctor_decl() {
                    Some(member) => members.push(member),
                    None => break,
                }
                if !self.eat(TokenKind::Pipe) {
                    break;
                }
            }
            TypeRhs::Constructors(members)
        };

        let end = self.current_span();
        self.expect_semicolon();
        Some(TypeDecl {
            exported,
            name,
            params,
            rhs,
            span: start.cover(end),
        })
    }

    /// `Ctor` | `Ctor<T1, T2>`
    fn parse_ctor_decl(&mut self) -> Option<CtorDecl> {
        let name = self.parse_upper_ident("constructor name")?;
        let mut fields = Vec::new();
        let mut span = name.span;
        if self.eat(TokenKind::Lt) {
            loop {
                let field = self.parse_type_expr()?;
                span = span.cover(field.span);
                fields.push(field);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            if !self.eat_angle_close() {
                self.error_expected("`>`", "constructor fields");
            }
        }
        Some(CtorDecl { name, fields, span })
    }

    // ---- operator declarations ----------------------------------------

    /// `infix[l|r] PREC OP = target ;`
    fn parse_infix_decl(&mut self, exported: bool) -> Option<InfixDecl> {
        let assoc = match self.current() {
            TokenKind::KwInfixl => Assoc::Left,
            TokenKind::KwInfixr => Assoc::Right,
            _ => Assoc::None,
        };
        let start = self.bump();

        if !self.at(TokenKind::Number) {
            self.error_expected("a precedence number", "infix declaration");
            self.recover_to_semicolon();
            return None;
        }
        let precedence = self.current_text().parse::<u8>().unwrap_or(0).min(9);
        self.bump();

        let (op, op_span) = self.parse_operator_spelling("infix declaration")?;
        self.expect(TokenKind::Eq, "infix declaration");
        let target = self.parse_ident("operator target")?;

        let end = self.current_span();
        self.expect_semicolon();

        self.operators.declare_infix(&op, precedence, assoc);
        Some(InfixDecl {
            exported,
            assoc,
            precedence,
            op,
            op_span,
            target,
            span: start.cover(end),
        })
    }

    /// `prefix OP = target ;`
    fn parse_prefix_decl(&mut self, exported: bool) -> Option<PrefixDecl> {
        let start = self.bump(); // `prefix`
        let (op, op_span) = self.parse_operator_spelling("prefix declaration")?;
        self.expect(TokenKind::Eq, "prefix declaration");
        let target = self.parse_ident("operator target")?;

        let end = self.current_span();
        self.expect_semicolon();

        self.operators.declare_prefix(&op);
        Some(PrefixDecl {
            exported,
            op,
            op_span,
            target,
            span: start.cover(end),
        })
    }

    fn parse_operator_spelling(&mut self, context: &str) -> Option<(String, Span)> {
        let (text, span) = match self.current() {
            // Structural spellings are accepted here so the reserved
            // check below can reject them with a precise message.
            TokenKind::Operator
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::Eq
            | TokenKind::FatArrow
            | TokenKind::Pipe => (self.current_text().to_string(), self.current_span()),
            _ => {
                self.error_expected("an operator", context);
                self.recover_to_semicolon();
                return None;
            }
        };
        self.bump();
        if RESERVED_OPERATORS.contains(&text.as_str()) {
            self.diagnostics
                .error(
                    DiagnosticKind::UnknownOperator,
                    format!("`{text}` is reserved and cannot be declared"),
                    span,
                )
                .emit();
        }
        Some((text, span))
    }

    // ---- shared identifier helpers ------------------------------------

    pub(crate) fn parse_ident(&mut self, what: &str) -> Option<Ident> {
        if !self.at(TokenKind::Ident) {
            self.error_expected(&format!("an identifier ({what})"), "declaration");
            return None;
        }
        let span = self.current_span();
        let text = self.current_text().to_string();
        self.bump();
        Some(self.mk_ident(text, span))
    }

    pub(crate) fn parse_upper_ident(&mut self, what: &str) -> Option<Ident> {
        if !self.at(TokenKind::Upper) {
            self.error_expected(&format!("a constructor name ({what})"), "declaration");
            return None;
        }
        let span = self.current_span();
        let text = self.current_text().to_string();
        self.bump();
        Some(self.mk_ident(text, span))
    }
}
