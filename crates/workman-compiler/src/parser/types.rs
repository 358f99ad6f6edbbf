//! Surface type grammar.
//!
//! ```text
//! type     ::= atom [ '->' type ]                  (right associative)
//! atom     ::= UPPER [ '<' type (',' type)* '>' ]
//!            | '(' ')'
//!            | '(' type (',' type)* ')'
//!            | '<' row_case (',' row_case)* '>'
//!            | '?'
//! row_case ::= UPPER [ '<' type '>' ]
//! ```
//!
//! Nested angle closers lex as one `>>` operator run; [`Parser::eat_angle_close`]
//! splits such runs in place, one `>` at a time.

use crate::lexer::TokenKind;

use super::Parser;
use super::ast::{RowCase, TypeExpr, TypeExprKind};

impl<'s> Parser<'s> {
    pub(crate) fn parse_type_expr(&mut self) -> Option<TypeExpr> {
        if !self.enter_depth() {
            return None;
        }
        let result = self.parse_type_inner();
        self.exit_depth();
        result
    }

    fn parse_type_inner(&mut self) -> Option<TypeExpr> {
        let from = self.parse_type_atom()?;

        if self.at(TokenKind::Operator) && self.current_text() == "->" {
            self.bump();
            let to = self.parse_type_expr()?;
            let span = from.span.cover(to.span);
            return Some(self.mk_type(
                span,
                TypeExprKind::Fun {
                    from: Box::new(from),
                    to: Box::new(to),
                },
            ));
        }

        Some(from)
    }

    fn parse_type_atom(&mut self) -> Option<TypeExpr> {
        match self.current() {
            TokenKind::Upper => {
                let span = self.current_span();
                let name = self.current_text().to_string();
                self.bump();

                let mut args = Vec::new();
                let mut full = span;
                if self.eat(TokenKind::Lt) {
                    loop {
                        let arg = self.parse_type_expr()?;
                        full = full.cover(arg.span);
                        args.push(arg);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    if !self.eat_angle_close() {
                        self.error_expected("`>`", "type arguments");
                    }
                }
                Some(self.mk_type(full, TypeExprKind::Name { name, args }))
            }
            TokenKind::ParenOpen => {
                let open = self.bump();
                if self.at(TokenKind::ParenClose) {
                    let close = self.bump();
                    return Some(self.mk_type(open.cover(close), TypeExprKind::Unit));
                }
                let mut elems = Vec::new();
                loop {
                    elems.push(self.parse_type_expr()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                let close = self.current_span();
                self.expect(TokenKind::ParenClose, "type");

                if elems.len() == 1 {
                    return elems.pop();
                }
                Some(self.mk_type(open.cover(close), TypeExprKind::Tuple(elems)))
            }
            TokenKind::Lt => self.parse_row_type(),
            TokenKind::Operator if self.current_text() == "?" => {
                let span = self.bump();
                Some(self.mk_type(span, TypeExprKind::Hole))
            }
            _ => {
                self.error_expected("a type", "type position");
                None
            }
        }
    }

    /// `<Case, Case<Payload>, ...>`
    pub(crate) fn parse_row_type(&mut self) -> Option<TypeExpr> {
        let open = self.bump(); // `<`
        let mut cases = Vec::new();

        while !self.eof() {
            let name = self.parse_upper_ident("error-row case")?;
            let payload = if self.eat(TokenKind::Lt) {
                let ty = self.parse_type_expr()?;
                if !self.eat_angle_close() {
                    self.error_expected("`>`", "error-row payload");
                }
                Some(ty)
            } else {
                None
            };
            cases.push(RowCase { name, payload });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        let close = self.current_span();
        if !self.eat_angle_close() {
            self.error_expected("`>`", "error-row type");
        }
        Some(self.mk_type(open.cover(close), TypeExprKind::Row(cases)))
    }

    /// Consume a single closing `>`, splitting it off an operator run
    /// (`>>`, `>=`, ...) when necessary.
    pub(crate) fn eat_angle_close(&mut self) -> bool {
        match self.current() {
            TokenKind::Gt => {
                self.bump();
                true
            }
            TokenKind::Operator => {
                let text = self.current_text();
                if !text.starts_with('>') || text.len() < 2 {
                    return false;
                }
                let rest_kind = match &text[1..] {
                    ">" => TokenKind::Gt,
                    "<" => TokenKind::Lt,
                    "=" => TokenKind::Eq,
                    "|" => TokenKind::Pipe,
                    "=>" => TokenKind::FatArrow,
                    _ => TokenKind::Operator,
                };
                let tok = &mut self.tokens[self.pos];
                tok.span.start += 1;
                tok.kind = rest_kind;
                true
            }
            _ => false,
        }
    }
}
