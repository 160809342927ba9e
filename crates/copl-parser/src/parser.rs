// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Recursive-descent parser: tokens to [`crate::ast::Program`].

use crate::ast::{
    Access, BinOp, ClassDecl, Expr, FieldDecl, FunctionDecl, Import, IncDecOp, LValue, Param,
    Program, Stmt, TypeExpr, UnOp,
};
use crate::lexer::{LexError, Lexer, Token};
use thiserror::Error;

/// A parse failure.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    /// The lexer rejected the source before the parser saw a token.
    #[error("{0}")]
    Lex(#[from] LexError),
    /// A construct expected one kind of token and got another.
    #[error("expected {expected}, found {found:?}")]
    UnexpectedToken {
        /// What the parser was looking for.
        expected: &'static str,
        /// What it actually saw.
        found: Token,
    },
    /// An assignment or increment/decrement target wasn't an lvalue shape.
    #[error("invalid assignment target: {0:?}")]
    InvalidAssignTarget(Expr),
}

/// Parse a complete Copl source file into a [`Program`].
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser { tokens, pos: 0 }.parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token, what: &'static str) -> Result<(), ParseError> {
        if self.peek() == expected {
            self.bump();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: what,
                found: self.peek().clone(),
            })
        }
    }

    fn expect_ident(&mut self, what: &'static str) -> Result<String, ParseError> {
        match self.bump() {
            Token::Ident(name) => Ok(name),
            found => Err(ParseError::UnexpectedToken { expected: what, found }),
        }
    }

    fn at(&self, tok: &Token) -> bool {
        self.peek() == tok
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.at(tok) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();
        while !self.at(&Token::Eof) {
            match self.peek() {
                Token::Import => program.imports.push(self.parse_import()?),
                Token::Class => program.classes.push(self.parse_class()?),
                Token::Def => program.functions.push(self.parse_function()?),
                found => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "'import', 'class' or 'def'",
                        found: found.clone(),
                    })
                }
            }
        }
        Ok(program)
    }

    fn parse_import(&mut self) -> Result<Import, ParseError> {
        self.expect(&Token::Import, "'import'")?;
        let path = match self.bump() {
            Token::Str(s) => s,
            found => {
                return Err(ParseError::UnexpectedToken {
                    expected: "a string literal",
                    found,
                })
            }
        };
        self.expect(&Token::As, "'as'")?;
        let alias = self.expect_ident("an alias name")?;
        self.expect(&Token::Semi, "';'")?;
        Ok(Import { path, alias })
    }

    fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        if self.eat(&Token::LBracket) {
            let inner = self.parse_type()?;
            self.expect(&Token::RBracket, "']'")?;
            return Ok(TypeExpr::Array(Box::new(inner)));
        }
        if let Token::Ident(name) = self.peek().clone() {
            if name == "lambda" {
                self.bump();
                self.expect(&Token::Arrow, "'->'")?;
                let ret = self.parse_type()?;
                return Ok(TypeExpr::Lambda(Box::new(ret)));
            }
            self.bump();
            return Ok(TypeExpr::Named(name));
        }
        Err(ParseError::UnexpectedToken {
            expected: "a type",
            found: self.peek().clone(),
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(&Token::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.at(&Token::RParen) {
            loop {
                let name = self.expect_ident("a parameter name")?;
                self.expect(&Token::Colon, "':'")?;
                let ty = self.parse_type()?;
                params.push(Param { name, ty });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(params)
    }

    fn parse_return_type(&mut self) -> Result<Option<TypeExpr>, ParseError> {
        if self.eat(&Token::Arrow) {
            Ok(Some(self.parse_type()?))
        } else {
            Ok(None)
        }
    }

    fn parse_function(&mut self) -> Result<FunctionDecl, ParseError> {
        self.expect(&Token::Def, "'def'")?;
        let name = self.expect_ident("a function name")?;
        let params = self.parse_params()?;
        let ret_ty = self.parse_return_type()?;
        let body = self.parse_block()?;
        Ok(FunctionDecl {
            name,
            params,
            ret_ty,
            body,
        })
    }

    fn parse_access(&mut self) -> Access {
        if self.eat(&Token::Private) {
            Access::Private
        } else {
            self.eat(&Token::Public);
            Access::Public
        }
    }

    fn parse_class(&mut self) -> Result<ClassDecl, ParseError> {
        self.expect(&Token::Class, "'class'")?;
        let name = self.expect_ident("a class name")?;
        self.expect(&Token::LBrace, "'{'")?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.eat(&Token::RBrace) {
            let access = self.parse_access();
            if self.at(&Token::Def) {
                methods.push(self.parse_function()?);
            } else {
                let name = self.expect_ident("a field name")?;
                self.expect(&Token::Colon, "':'")?;
                let ty = self.parse_type()?;
                self.expect(&Token::Semi, "';'")?;
                fields.push(FieldDecl { name, ty, access });
            }
        }
        Ok(ClassDecl {
            name,
            fields,
            methods,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.eat(&Token::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            Token::Let => self.parse_let(),
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::For => self.parse_for(),
            Token::Break => {
                self.bump();
                self.expect(&Token::Semi, "';'")?;
                Ok(Stmt::Break)
            }
            Token::Continue => {
                self.bump();
                self.expect(&Token::Semi, "';'")?;
                Ok(Stmt::Continue)
            }
            Token::Return => {
                self.bump();
                let value = if self.at(&Token::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(&Token::Semi, "';'")?;
                Ok(Stmt::Return(value))
            }
            Token::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(&Token::Semi, "';'")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_let(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&Token::Let, "'let'")?;
        let name = self.expect_ident("a variable name")?;
        self.expect(&Token::Colon, "':'")?;
        let ty = self.parse_type()?;
        self.expect(&Token::Assign, "'='")?;
        let init = self.parse_expr()?;
        self.expect(&Token::Semi, "';'")?;
        Ok(Stmt::Let { name, ty, init })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&Token::If, "'if'")?;
        self.expect(&Token::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen, "')'")?;
        let then = self.parse_block()?;
        let else_ = if self.eat(&Token::Else) {
            if self.at(&Token::If) {
                vec![self.parse_if()?]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If { cond, then, else_ })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&Token::While, "'while'")?;
        self.expect(&Token::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.expect(&Token::For, "'for'")?;
        self.expect(&Token::LParen, "'('")?;
        let init = if self.at(&Token::Semi) {
            None
        } else if self.at(&Token::Let) {
            Some(Box::new(self.parse_let()?))
        } else {
            let expr = self.parse_expr()?;
            self.expect(&Token::Semi, "';'")?;
            Some(Box::new(Stmt::Expr(expr)))
        };
        if init.is_none() {
            self.expect(&Token::Semi, "';'")?;
        }
        let cond = if self.at(&Token::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&Token::Semi, "';'")?;
        let step = if self.at(&Token::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&Token::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_or()?;
        let op = match self.peek() {
            Token::Assign => Some(None),
            Token::PlusAssign => Some(Some(BinOp::Add)),
            Token::MinusAssign => Some(Some(BinOp::Sub)),
            Token::StarAssign => Some(Some(BinOp::Mul)),
            Token::SlashAssign => Some(Some(BinOp::Div)),
            Token::PercentAssign => Some(Some(BinOp::Mod)),
            _ => None,
        };
        let Some(op) = op else { return Ok(expr) };
        self.bump();
        let target = to_lvalue(expr)?;
        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            target,
            op,
            value: Box::new(value),
        })
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::PipePipe) {
            let rhs = self.parse_and()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&Token::AmpAmp) {
            let rhs = self.parse_equality()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinOp::Eq,
                Token::NotEq => BinOp::Neq,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_relational()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_bitor()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_bitor()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_bitand()?;
        while self.eat(&Token::Pipe) {
            let rhs = self.parse_bitand()?;
            lhs = binary(BinOp::BOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_shift()?;
        while self.eat(&Token::Amp) {
            let rhs = self.parse_shift()?;
            lhs = binary(BinOp::BAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Shl => BinOp::Shl,
                Token::Shr => BinOp::Shr,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Token::Minus => {
                self.bump();
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    expr: Box::new(self.parse_unary()?),
                })
            }
            Token::Bang => {
                self.bump();
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    expr: Box::new(self.parse_unary()?),
                })
            }
            Token::Tilde => {
                self.bump();
                Ok(Expr::Unary {
                    op: UnOp::BNot,
                    expr: Box::new(self.parse_unary()?),
                })
            }
            Token::PlusPlus => {
                self.bump();
                let target = to_lvalue(self.parse_unary()?)?;
                Ok(Expr::PreIncDec {
                    op: IncDecOp::Inc,
                    target,
                })
            }
            Token::MinusMinus => {
                self.bump();
                let target = to_lvalue(self.parse_unary()?)?;
                Ok(Expr::PreIncDec {
                    op: IncDecOp::Dec,
                    target,
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.bump();
                    let field = self.expect_ident("a field name")?;
                    expr = Expr::Member {
                        target: Box::new(expr),
                        field,
                    };
                }
                Token::LBracket => {
                    self.bump();
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket, "']'")?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Token::LParen => {
                    self.bump();
                    let mut args = Vec::new();
                    if !self.at(&Token::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(&Token::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen, "')'")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                Token::PlusPlus => {
                    self.bump();
                    let target = to_lvalue(expr)?;
                    expr = Expr::PostIncDec {
                        op: IncDecOp::Inc,
                        target,
                    };
                }
                Token::MinusMinus => {
                    self.bump();
                    let target = to_lvalue(expr)?;
                    expr = Expr::PostIncDec {
                        op: IncDecOp::Dec,
                        target,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.bump() {
            Token::Int(i) => Ok(Expr::Int(i)),
            Token::Float(f) => Ok(Expr::Float(f)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Null => Ok(Expr::Null),
            Token::This => Ok(Expr::This),
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::LParen => {
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::LBracket => {
                let mut elements = Vec::new();
                if !self.at(&Token::RBracket) {
                    loop {
                        elements.push(self.parse_expr()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RBracket, "']'")?;
                Ok(Expr::ArrayLit(elements))
            }
            Token::New => {
                let class = self.expect_ident("a class name")?;
                self.expect(&Token::LParen, "'('")?;
                let mut args = Vec::new();
                if !self.at(&Token::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RParen, "')'")?;
                Ok(Expr::New { class, args })
            }
            Token::Dollar => {
                let params = self.parse_params()?;
                let ret_ty = self.parse_return_type()?;
                let body = self.parse_block()?;
                Ok(Expr::Lambda {
                    params,
                    ret_ty,
                    body,
                })
            }
            found => Err(ParseError::UnexpectedToken {
                expected: "an expression",
                found,
            }),
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn to_lvalue(expr: Expr) -> Result<LValue, ParseError> {
    match expr {
        Expr::Ident(name) => Ok(LValue::Name(name)),
        Expr::Member { target, field } => Ok(LValue::Member { target, field }),
        Expr::Index { target, index } => Ok(LValue::Index { target, index }),
        other => Err(ParseError::InvalidAssignTarget(other)),
    }
}
