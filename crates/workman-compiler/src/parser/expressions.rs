//! Expression grammar: precedence climbing over the operator tables,
//! postfix calls and field access, arrows, blocks, and match.

use crate::diagnostics::DiagnosticKind;
use crate::lexer::{TokenKind, unescape_char, unescape_string};

use super::Parser;
use super::ast::{Assoc, Block, Expr, ExprKind, MatchArm, Param, Stmt};

impl<'s> Parser<'s> {
    pub(crate) fn parse_expr(&mut self) -> Option<Expr> {
        if !self.enter_depth() {
            return None;
        }
        let result = self.parse_binary(0);
        self.exit_depth();
        result
    }

    fn parse_binary(&mut self, min_prec: u8) -> Option<Expr> {
        let mut lhs = self.parse_unary()?;

        loop {
            let Some((op_text, op_span)) = self.peek_operator() else {
                break;
            };
            let op = op_text.to_string();

            let Some(info) = self.operators.infix(&op) else {
                self.diagnostics
                    .error(
                        DiagnosticKind::UnknownOperator,
                        format!("unknown operator `{op}`"),
                        op_span,
                    )
                    .hint("declare it first, e.g. `infixl 6 <+> = combine;`")
                    .emit();
                self.bump();
                // Consume a right operand so parsing can continue.
                let rhs = self.parse_unary()?;
                let span = lhs.span.cover(rhs.span);
                lhs = self.mk_expr(
                    span,
                    ExprKind::Binary {
                        op,
                        op_span,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                );
                continue;
            };

            if info.precedence < min_prec {
                break;
            }
            self.bump();

            let next_min = match info.assoc {
                Assoc::Right => info.precedence,
                Assoc::Left | Assoc::None => info.precedence + 1,
            };
            let rhs = self.parse_binary_guarded(next_min)?;
            let span = lhs.span.cover(rhs.span);
            lhs = self.mk_expr(
                span,
                ExprKind::Binary {
                    op,
                    op_span,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            );
        }

        Some(lhs)
    }

    fn parse_binary_guarded(&mut self, min_prec: u8) -> Option<Expr> {
        if !self.enter_depth() {
            return None;
        }
        let result = self.parse_binary(min_prec);
        self.exit_depth();
        result
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        if let Some((op_text, op_span)) = self.peek_operator() {
            let op = op_text.to_string();
            if self.operators.is_prefix(&op) {
                self.bump();
                let operand = self.parse_unary()?;
                let span = op_span.cover(operand.span);
                return Some(self.mk_expr(
                    span,
                    ExprKind::Unary {
                        op,
                        op_span,
                        operand: Box::new(operand),
                    },
                ));
            }
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_atom()?;

        loop {
            match self.current() {
                TokenKind::ParenOpen => {
                    self.bump();
                    let mut args = Vec::new();
                    while !self.at(TokenKind::ParenClose) && !self.eof() {
                        args.push(self.parse_expr()?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    let close = self.current_span();
                    self.expect(TokenKind::ParenClose, "call arguments");
                    let span = expr.span.cover(close);
                    expr = self.mk_expr(
                        span,
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                    );
                }
                TokenKind::Dot => {
                    self.bump();
                    let field = match self.current() {
                        TokenKind::Ident | TokenKind::Upper => {
                            let span = self.current_span();
                            let text = self.current_text().to_string();
                            self.bump();
                            self.mk_ident(text, span)
                        }
                        _ => {
                            self.error_expected("a field name", "field access");
                            return Some(expr);
                        }
                    };
                    let span = expr.span.cover(field.span);
                    expr = self.mk_expr(
                        span,
                        ExprKind::Field {
                            base: Box::new(expr),
                            field,
                        },
                    );
                }
                _ => break,
            }
        }

        Some(expr)
    }

    fn parse_atom(&mut self) -> Option<Expr> {
        match self.current() {
            TokenKind::Ident => {
                let span = self.bump();
                let name = self.source[span.range()].to_string();
                Some(self.mk_expr(span, ExprKind::Var(name)))
            }
            TokenKind::Upper => {
                let span = self.bump();
                let name = self.source[span.range()].to_string();
                Some(self.mk_expr(span, ExprKind::CtorRef(name)))
            }
            TokenKind::Number => {
                let span = self.current_span();
                let value: i64 = match self.current_text().parse() {
                    Ok(v) => v,
                    Err(_) => {
                        self.diagnostics
                            .error(
                                DiagnosticKind::ExpectedToken,
                                "integer literal out of range",
                                span,
                            )
                            .emit();
                        0
                    }
                };
                self.bump();
                Some(self.mk_expr(span, ExprKind::Int(value)))
            }
            TokenKind::Bool => {
                let span = self.current_span();
                let value = self.current_text() == "true";
                self.bump();
                Some(self.mk_expr(span, ExprKind::Bool(value)))
            }
            TokenKind::Char => {
                let span = self.current_span();
                let raw = self.current_text();
                let value = unescape_char(&raw[1..raw.len() - 1]);
                self.bump();
                Some(self.mk_expr(span, ExprKind::Char(value)))
            }
            TokenKind::Str => {
                let span = self.current_span();
                let raw = self.current_text();
                let value = unescape_string(&raw[1..raw.len() - 1]);
                self.bump();
                Some(self.mk_expr(span, ExprKind::Str(value)))
            }
            TokenKind::ParenOpen => self.parse_parenthesized(),
            TokenKind::BraceOpen => self.parse_block_expr(),
            TokenKind::KwMatch => self.parse_match_expr(),
            _ => {
                self.error_expected("an expression", "expression position");
                None
            }
        }
    }

    /// `(...)` is an arrow when the matching close paren is followed by
    /// `=>`; otherwise unit, grouping, or a tuple.
    fn parse_parenthesized(&mut self) -> Option<Expr> {
        if self.arrow_ahead() {
            return self.parse_arrow();
        }

        let open = self.bump(); // `(`
        if self.at(TokenKind::ParenClose) {
            let close = self.bump();
            return Some(self.mk_expr(open.cover(close), ExprKind::Unit));
        }

        let mut elems = Vec::new();
        loop {
            elems.push(self.parse_expr()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let close = self.current_span();
        self.expect(TokenKind::ParenClose, "parenthesized expression");

        if elems.len() == 1 {
            // Grouping parens: length-1 tuples coerce to their element.
            return elems.pop();
        }
        Some(self.mk_expr(open.cover(close), ExprKind::Tuple(elems)))
    }

    /// Token lookahead: does the paren group starting here close with a
    /// `=>` right after it?
    fn arrow_ahead(&self) -> bool {
        let mut depth = 0usize;
        let mut i = 0usize;
        loop {
            match self.nth(i) {
                TokenKind::ParenOpen => depth += 1,
                TokenKind::ParenClose => {
                    depth -= 1;
                    if depth == 0 {
                        return self.nth(i + 1) == TokenKind::FatArrow;
                    }
                }
                TokenKind::Eof | TokenKind::Semicolon => return false,
                _ => {}
            }
            i += 1;
        }
    }

    /// `(params) => { ... }`
    fn parse_arrow(&mut self) -> Option<Expr> {
        let open = self.bump(); // `(`
        let mut params = Vec::new();
        while !self.at(TokenKind::ParenClose) && !self.eof() {
            let name = self.parse_ident("parameter")?;
            let annotation = if self.eat(TokenKind::Colon) {
                Some(self.parse_type_expr()?)
            } else {
                None
            };
            params.push(Param { name, annotation });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::ParenClose, "parameter list");
        self.expect(TokenKind::FatArrow, "arrow function");

        if !self.at(TokenKind::BraceOpen) {
            self.error_expected("`{`", "arrow body");
            return None;
        }
        let body = self.parse_block_expr()?;
        let span = open.cover(body.span);
        Some(self.mk_expr(
            span,
            ExprKind::Arrow {
                params,
                body: Box::new(body),
            },
        ))
    }

    /// `{ stmt* [result] }`
    pub(crate) fn parse_block_expr(&mut self) -> Option<Expr> {
        let open = self.bump(); // `{`
        let mut stmts = Vec::new();
        let mut result = None;

        while !self.at(TokenKind::BraceClose) && !self.eof() {
            if self.at(TokenKind::KwLet) {
                let decl = self.parse_let_decl(false)?;
                stmts.push(Stmt::Let(decl));
                continue;
            }
            let expr = self.parse_expr()?;
            if self.eat(TokenKind::Semicolon) {
                stmts.push(Stmt::Expr(expr));
                continue;
            }
            result = Some(Box::new(expr));
            break;
        }

        let close = self.current_span();
        self.expect(TokenKind::BraceClose, "block");
        Some(self.mk_expr(open.cover(close), ExprKind::Block(Block { stmts, result })))
    }

    /// `match ( expr ) { arm (, arm)* [,] }`
    pub(crate) fn parse_match_expr(&mut self) -> Option<Expr> {
        let start = self.bump(); // `match`
        self.expect(TokenKind::ParenOpen, "match scrutinee");
        let scrutinee = self.parse_expr()?;
        self.expect(TokenKind::ParenClose, "match scrutinee");
        self.expect(TokenKind::BraceOpen, "match expression");

        let mut arms = Vec::new();
        while !self.at(TokenKind::BraceClose) && !self.eof() {
            match self.parse_match_arm() {
                Some(arm) => arms.push(arm),
                None => break,
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        let close = self.current_span();
        self.expect(TokenKind::BraceClose, "match expression");
        Some(self.mk_expr(
            start.cover(close),
            ExprKind::Match {
                scrutinee: Box::new(scrutinee),
                arms,
            },
        ))
    }

    fn parse_match_arm(&mut self) -> Option<MatchArm> {
        let pattern = self.parse_pattern()?;
        self.expect(TokenKind::FatArrow, "match arm");

        if !self.at(TokenKind::BraceOpen) {
            self.diagnostics
                .error(
                    DiagnosticKind::MatchArmNotBlock,
                    "match arm body must be a block",
                    self.current_span(),
                )
                .hint("write the body as a block: `pattern => { expr }`")
                .emit();
            let body = self.parse_expr()?;
            let span = pattern.span.cover(body.span);
            return Some(MatchArm {
                pattern,
                body,
                span,
            });
        }

        let body = self.parse_block_expr()?;
        let span = pattern.span.cover(body.span);
        Some(MatchArm {
            pattern,
            body,
            span,
        })
    }
}
