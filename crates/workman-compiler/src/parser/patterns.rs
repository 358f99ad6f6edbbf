//! Pattern grammar: `_ | ident | literal | Ctor(pats) | (pats)`.

use crate::diagnostics::DiagnosticKind;
use crate::lexer::{TokenKind, unescape_char, unescape_string};

use super::Parser;
use super::ast::{PatKind, Pattern};

impl<'s> Parser<'s> {
    pub(crate) fn parse_pattern(&mut self) -> Option<Pattern> {
        if !self.enter_depth() {
            return None;
        }
        let result = self.parse_pattern_inner();
        self.exit_depth();
        result
    }

    fn parse_pattern_inner(&mut self) -> Option<Pattern> {
        match self.current() {
            TokenKind::Underscore => {
                let span = self.bump();
                Some(self.mk_pattern(span, PatKind::Wildcard))
            }
            TokenKind::Ident => {
                let span = self.bump();
                let name = self.source[span.range()].to_string();
                Some(self.mk_pattern(span, PatKind::Var(name)))
            }
            TokenKind::Number => {
                let span = self.current_span();
                let value: i64 = self.current_text().parse().unwrap_or(0);
                self.bump();
                Some(self.mk_pattern(span, PatKind::Int(value)))
            }
            TokenKind::Bool => {
                let span = self.current_span();
                let value = self.current_text() == "true";
                self.bump();
                Some(self.mk_pattern(span, PatKind::Bool(value)))
            }
            TokenKind::Char => {
                let span = self.current_span();
                let raw = self.current_text();
                let value = unescape_char(&raw[1..raw.len() - 1]);
                self.bump();
                Some(self.mk_pattern(span, PatKind::Char(value)))
            }
            TokenKind::Str => {
                let span = self.current_span();
                let raw = self.current_text();
                let value = unescape_string(&raw[1..raw.len() - 1]);
                self.bump();
                Some(self.mk_pattern(span, PatKind::Str(value)))
            }
            TokenKind::Upper => {
                let span = self.current_span();
                let name = self.current_text().to_string();
                self.bump();

                let mut args = Vec::new();
                let mut full = span;
                if self.at(TokenKind::ParenOpen) {
                    self.bump();
                    while !self.at(TokenKind::ParenClose) && !self.eof() {
                        args.push(self.parse_pattern()?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    full = span.cover(self.current_span());
                    self.expect(TokenKind::ParenClose, "constructor pattern");
                }
                Some(self.mk_pattern(full, PatKind::Ctor { name, args }))
            }
            TokenKind::ParenOpen => {
                let open = self.bump();
                let mut elems = Vec::new();
                while !self.at(TokenKind::ParenClose) && !self.eof() {
                    elems.push(self.parse_pattern()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                let close = self.current_span();
                self.expect(TokenKind::ParenClose, "tuple pattern");

                if elems.len() == 1 {
                    // Grouping parens around a single pattern.
                    return elems.pop();
                }
                Some(self.mk_pattern(open.cover(close), PatKind::Tuple(elems)))
            }
            _ => {
                self.diagnostics
                    .error(
                        DiagnosticKind::MalformedPattern,
                        format!("expected a pattern, found {}", self.current().describe()),
                        self.current_span(),
                    )
                    .emit();
                None
            }
        }
    }
}
