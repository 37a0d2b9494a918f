//! Syntactic analyzer: token stream to statement tree.
//!
//! Straightforward recursive descent, one method per production.  Class
//! definitions are also recorded in a parse-time table so that `Name(args)`
//! resolves to an instantiation of a known class and `class B(A)` can link
//! its parent.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io::Read;

use crate::ast::{Comparator, Statement};
use crate::lexer::{Lexer, LexerError};
use crate::runtime::{Class, Method, Object, ObjectHolder};
use crate::token::Token;

#[derive(Debug)]
pub enum ParserError {
    Lexer(LexerError),
    UnexpectedToken { found: String, expected: String },
    UnknownClass(String),
    ExpectedLvalue,
    ExpectedExpression(String),
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::Lexer(e) => write!(f, "{}", e),
            ParserError::UnexpectedToken { found, expected } => {
                write!(f, "unexpected token '{}', expected '{}'", found, expected)
            }
            ParserError::UnknownClass(name) => write!(f, "unknown class: {}", name),
            ParserError::ExpectedLvalue => write!(f, "expected assignable expression"),
            ParserError::ExpectedExpression(found) => {
                write!(f, "expected expression, found '{}'", found)
            }
        }
    }
}

impl Error for ParserError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParserError::Lexer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LexerError> for ParserError {
    fn from(e: LexerError) -> ParserError {
        ParserError::Lexer(e)
    }
}

pub struct Parser<R: Read> {
    lexer: Lexer<R>,
    classes: HashMap<String, Class>,
}

impl<R: Read> Parser<R> {
    pub fn new(input: R) -> Result<Parser<R>, ParserError> {
        Ok(Parser {
            lexer: Lexer::new(input)?,
            classes: HashMap::new(),
        })
    }

    pub fn parse_program(&mut self) -> Result<Vec<Statement>, ParserError> {
        let mut program = vec![];
        while *self.lexer.current() != Token::Eof {
            program.push(self.statement()?);
        }
        Ok(program)
    }

    fn statement(&mut self) -> Result<Statement, ParserError> {
        match self.lexer.current() {
            Token::Class => self.class_definition(),
            Token::If => self.if_statement(),
            _ => {
                let stmt = self.simple_statement()?;
                self.consume(&Token::Newline)?;
                Ok(stmt)
            }
        }
    }

    /// Parse class definition.
    /// Current token is Token::Class.
    fn class_definition(&mut self) -> Result<Statement, ParserError> {
        self.advance()?;
        let name = self.lexer.expect_id()?.to_string();
        self.advance()?;
        let parent = if *self.lexer.current() == Token::Char('(') {
            self.advance()?;
            let parent_name = self.lexer.expect_id()?.to_string();
            self.advance()?;
            self.consume(&Token::Char(')'))?;
            match self.classes.get(&parent_name) {
                Some(parent) => Some(parent.clone()),
                None => return Err(ParserError::UnknownClass(parent_name)),
            }
        } else {
            None
        };
        self.consume(&Token::Char(':'))?;
        self.consume(&Token::Newline)?;
        self.consume(&Token::Indent)?;
        let mut methods = vec![];
        while *self.lexer.current() == Token::Def {
            methods.push(self.method_definition()?);
        }
        self.consume(&Token::Dedent)?;

        let class = Class::new(name.clone(), methods, parent);
        self.classes.insert(name, class.clone());
        Ok(Statement::ClassDefinition(class))
    }

    /// Parse method definition.
    /// Current token is Token::Def.  Methods do not declare `self`.
    fn method_definition(&mut self) -> Result<Method, ParserError> {
        self.advance()?;
        let name = self.lexer.expect_id()?.to_string();
        self.advance()?;
        self.consume(&Token::Char('('))?;
        let mut formal_params = vec![];
        if *self.lexer.current() != Token::Char(')') {
            loop {
                formal_params.push(self.lexer.expect_id()?.to_string());
                self.advance()?;
                if *self.lexer.current() != Token::Char(',') {
                    break;
                }
                self.advance()?;
            }
        }
        self.consume(&Token::Char(')'))?;
        self.consume(&Token::Char(':'))?;
        let body = self.suite()?;
        Ok(Method {
            name,
            formal_params,
            body: Statement::MethodBody(Box::new(body)),
        })
    }

    fn if_statement(&mut self) -> Result<Statement, ParserError> {
        self.advance()?;
        let condition = Box::new(self.expression()?);
        self.consume(&Token::Char(':'))?;
        let if_body = Box::new(self.suite()?);
        let else_body = if *self.lexer.current() == Token::Else {
            self.advance()?;
            self.consume(&Token::Char(':'))?;
            Some(Box::new(self.suite()?))
        } else {
            None
        };
        Ok(Statement::IfElse(condition, if_body, else_body))
    }

    /// Parse an indented block of statements.
    fn suite(&mut self) -> Result<Statement, ParserError> {
        self.consume(&Token::Newline)?;
        self.consume(&Token::Indent)?;
        let mut stmts = vec![];
        while *self.lexer.current() != Token::Dedent {
            stmts.push(self.statement()?);
        }
        self.advance()?;
        Ok(Statement::Compound(stmts))
    }

    fn simple_statement(&mut self) -> Result<Statement, ParserError> {
        match self.lexer.current() {
            Token::Return => {
                self.advance()?;
                let value = if *self.lexer.current() == Token::Newline {
                    Statement::Const(ObjectHolder::none())
                } else {
                    self.expression()?
                };
                Ok(Statement::Return(Box::new(value)))
            }
            Token::Print => {
                self.advance()?;
                let mut args = vec![];
                while *self.lexer.current() != Token::Newline {
                    args.push(self.expression()?);
                    if *self.lexer.current() == Token::Char(',') {
                        self.advance()?;
                    }
                }
                Ok(Statement::Print(args))
            }
            _ => self.assignment_or_expression(),
        }
    }

    fn assignment_or_expression(&mut self) -> Result<Statement, ParserError> {
        let lhs = self.expression()?;
        if *self.lexer.current() != Token::Char('=') {
            return Ok(lhs);
        }
        self.advance()?;
        let rhs = Box::new(self.expression()?);
        match lhs {
            Statement::VariableValue(mut ids) => match ids.pop() {
                Some(name) if ids.is_empty() => Ok(Statement::Assignment(name, rhs)),
                Some(field) => Ok(Statement::FieldAssignment(ids, field, rhs)),
                None => Err(ParserError::ExpectedLvalue),
            },
            _ => Err(ParserError::ExpectedLvalue),
        }
    }

    fn expression(&mut self) -> Result<Statement, ParserError> {
        self.or_expression()
    }

    fn or_expression(&mut self) -> Result<Statement, ParserError> {
        let mut expr = self.and_expression()?;
        while *self.lexer.current() == Token::Or {
            self.advance()?;
            expr = Statement::Or(Box::new(expr), Box::new(self.and_expression()?));
        }
        Ok(expr)
    }

    fn and_expression(&mut self) -> Result<Statement, ParserError> {
        let mut expr = self.not_expression()?;
        while *self.lexer.current() == Token::And {
            self.advance()?;
            expr = Statement::And(Box::new(expr), Box::new(self.not_expression()?));
        }
        Ok(expr)
    }

    fn not_expression(&mut self) -> Result<Statement, ParserError> {
        if *self.lexer.current() == Token::Not {
            self.advance()?;
            Ok(Statement::Not(Box::new(self.not_expression()?)))
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> Result<Statement, ParserError> {
        let lhs = self.sum()?;
        let cmp = match self.lexer.current() {
            Token::Eq => Comparator::Equal,
            Token::NotEq => Comparator::NotEqual,
            Token::Char('<') => Comparator::Less,
            Token::Char('>') => Comparator::Greater,
            Token::LessOrEq => Comparator::LessOrEqual,
            Token::GreaterOrEq => Comparator::GreaterOrEqual,
            _ => return Ok(lhs),
        };
        self.advance()?;
        let rhs = self.sum()?;
        Ok(Statement::Comparison(cmp, Box::new(lhs), Box::new(rhs)))
    }

    fn sum(&mut self) -> Result<Statement, ParserError> {
        let mut expr = self.product()?;
        loop {
            match self.lexer.current() {
                Token::Char('+') => {
                    self.advance()?;
                    expr = Statement::Add(Box::new(expr), Box::new(self.product()?));
                }
                Token::Char('-') => {
                    self.advance()?;
                    expr = Statement::Sub(Box::new(expr), Box::new(self.product()?));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn product(&mut self) -> Result<Statement, ParserError> {
        let mut expr = self.postfix()?;
        loop {
            match self.lexer.current() {
                Token::Char('*') => {
                    self.advance()?;
                    expr = Statement::Mult(Box::new(expr), Box::new(self.postfix()?));
                }
                Token::Char('/') => {
                    self.advance()?;
                    expr = Statement::Div(Box::new(expr), Box::new(self.postfix()?));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Parse `.field` and `.method(...)` chains after a primary.
    fn postfix(&mut self) -> Result<Statement, ParserError> {
        let mut expr = self.primary()?;
        while *self.lexer.current() == Token::Char('.') {
            self.advance()?;
            let name = self.lexer.expect_id()?.to_string();
            self.advance()?;
            if *self.lexer.current() == Token::Char('(') {
                let args = self.call_args()?;
                expr = Statement::MethodCall(Box::new(expr), name, args);
            } else {
                expr = match expr {
                    Statement::VariableValue(mut ids) => {
                        ids.push(name);
                        Statement::VariableValue(ids)
                    }
                    // Field reads are only defined on named chains.
                    _ => {
                        return Err(ParserError::UnexpectedToken {
                            found: self.lexer.current().to_string(),
                            expected: "(".to_string(),
                        })
                    }
                };
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Statement, ParserError> {
        match self.lexer.current().clone() {
            Token::Number(n) => {
                self.advance()?;
                Ok(Statement::Const(ObjectHolder::own(Object::Number(n))))
            }
            Token::String(s) => {
                self.advance()?;
                Ok(Statement::Const(ObjectHolder::own(Object::String(s))))
            }
            Token::True => {
                self.advance()?;
                Ok(Statement::Const(ObjectHolder::own(Object::Bool(true))))
            }
            Token::False => {
                self.advance()?;
                Ok(Statement::Const(ObjectHolder::own(Object::Bool(false))))
            }
            Token::None => {
                self.advance()?;
                Ok(Statement::Const(ObjectHolder::none()))
            }
            Token::Char('(') => {
                self.advance()?;
                let expr = self.expression()?;
                self.consume(&Token::Char(')'))?;
                Ok(expr)
            }
            Token::Id(name) => {
                self.advance()?;
                if *self.lexer.current() != Token::Char('(') {
                    return Ok(Statement::VariableValue(vec![name]));
                }
                if name == "str" {
                    self.advance()?;
                    let arg = self.expression()?;
                    self.consume(&Token::Char(')'))?;
                    return Ok(Statement::Stringify(Box::new(arg)));
                }
                let args = self.call_args()?;
                match self.classes.get(&name) {
                    Some(class) => Ok(Statement::NewInstance(class.clone(), args)),
                    None => Err(ParserError::UnknownClass(name)),
                }
            }
            other => Err(ParserError::ExpectedExpression(other.to_string())),
        }
    }

    fn call_args(&mut self) -> Result<Vec<Statement>, ParserError> {
        self.consume(&Token::Char('('))?;
        let mut args = vec![];
        if *self.lexer.current() != Token::Char(')') {
            loop {
                args.push(self.expression()?);
                if *self.lexer.current() != Token::Char(',') {
                    break;
                }
                self.advance()?;
            }
        }
        self.consume(&Token::Char(')'))?;
        Ok(args)
    }

    fn advance(&mut self) -> Result<(), ParserError> {
        self.lexer.next_token()?;
        Ok(())
    }

    fn consume(&mut self, expected: &Token) -> Result<(), ParserError> {
        self.lexer.expect(expected)?;
        self.advance()
    }
}

impl<R: Read> fmt::Debug for Parser<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("current", self.lexer.current())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Vec<Statement>, ParserError> {
        Parser::new(input.as_bytes())?.parse_program()
    }

    fn parse_single(input: &str) -> Statement {
        let mut program = parse(input).expect("parse failed");
        assert_eq!(program.len(), 1, "expected a single statement");
        program.pop().expect("no statement")
    }

    #[test]
    fn assignment() {
        match parse_single("x = 1\n") {
            Statement::Assignment(name, rhs) => {
                assert_eq!(name, "x");
                assert!(matches!(*rhs, Statement::Const(_)));
            }
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn field_assignment() {
        match parse_single("self.x = 1\n") {
            Statement::FieldAssignment(ids, field, _) => {
                assert_eq!(ids, vec!["self".to_string()]);
                assert_eq!(field, "x");
            }
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn nested_field_assignment() {
        match parse_single("a.b.c = 1\n") {
            Statement::FieldAssignment(ids, field, _) => {
                assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(field, "c");
            }
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn dotted_read() {
        match parse_single("y = a.b\n") {
            Statement::Assignment(_, rhs) => match *rhs {
                Statement::VariableValue(ids) => {
                    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
                }
                r => panic!("unexpected output: {:?}", r),
            },
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn products_bind_tighter_than_sums() {
        match parse_single("x = 1 + 2 * 3\n") {
            Statement::Assignment(_, rhs) => match *rhs {
                Statement::Add(lhs, rhs) => {
                    assert!(matches!(*lhs, Statement::Const(_)));
                    assert!(matches!(*rhs, Statement::Mult(_, _)));
                }
                r => panic!("unexpected output: {:?}", r),
            },
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn parenthesized_expression_takes_precedence() {
        match parse_single("x = (1 + 2) * 3\n") {
            Statement::Assignment(_, rhs) => match *rhs {
                Statement::Mult(lhs, _) => assert!(matches!(*lhs, Statement::Add(_, _))),
                r => panic!("unexpected output: {:?}", r),
            },
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn print_with_comma_separated_arguments() {
        match parse_single("print 1, 2\n") {
            Statement::Print(args) => assert_eq!(args.len(), 2),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn print_with_juxtaposed_arguments() {
        match parse_single("print 1 2 3\n") {
            Statement::Print(args) => assert_eq!(args.len(), 3),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn print_without_arguments() {
        match parse_single("print\n") {
            Statement::Print(args) => assert!(args.is_empty()),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn logic_operators_nest() {
        match parse_single("x = 1 or 2 and not 3\n") {
            Statement::Assignment(_, rhs) => match *rhs {
                Statement::Or(_, rhs) => match *rhs {
                    Statement::And(_, rhs) => assert!(matches!(*rhs, Statement::Not(_))),
                    r => panic!("unexpected output: {:?}", r),
                },
                r => panic!("unexpected output: {:?}", r),
            },
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn comparison_operators() {
        match parse_single("x = a < b\n") {
            Statement::Assignment(_, rhs) => match *rhs {
                Statement::Comparison(cmp, _, _) => assert_eq!(cmp, Comparator::Less),
                r => panic!("unexpected output: {:?}", r),
            },
            r => panic!("unexpected output: {:?}", r),
        }
        match parse_single("x = a >= b\n") {
            Statement::Assignment(_, rhs) => match *rhs {
                Statement::Comparison(cmp, _, _) => {
                    assert_eq!(cmp, Comparator::GreaterOrEqual)
                }
                r => panic!("unexpected output: {:?}", r),
            },
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn class_definition_and_instantiation() {
        let prg = parse("class Dog:\n  def bark(times):\n    return times\nd = Dog()\n")
            .expect("parse failed");
        assert_eq!(prg.len(), 2);
        match &prg[0] {
            Statement::ClassDefinition(class) => {
                assert_eq!(class.name(), "Dog");
                let bark = class.method("bark").expect("method not recorded");
                assert_eq!(bark.formal_params, vec!["times".to_string()]);
            }
            r => panic!("unexpected output: {:?}", r),
        }
        match &prg[1] {
            Statement::Assignment(_, rhs) => match &**rhs {
                Statement::NewInstance(class, args) => {
                    assert_eq!(class.name(), "Dog");
                    assert!(args.is_empty());
                }
                r => panic!("unexpected output: {:?}", r),
            },
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn subclass_links_its_parent() {
        let prg = parse(
            "class A:\n  def f():\n    return 1\nclass B(A):\n  def g():\n    return 2\n",
        )
        .expect("parse failed");
        match &prg[1] {
            Statement::ClassDefinition(class) => {
                assert_eq!(class.name(), "B");
                // f is inherited through the recorded parent.
                assert!(class.method("f").is_some());
            }
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn instantiating_an_unknown_class_is_an_error() {
        match parse("x = Foo()\n") {
            Err(ParserError::UnknownClass(name)) if name == "Foo" => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn deriving_from_an_unknown_class_is_an_error() {
        match parse("class B(A):\n  def f():\n    return 1\n") {
            Err(ParserError::UnknownClass(name)) if name == "A" => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn method_call_on_a_fresh_instance() {
        let prg = parse("class B:\n  def f():\n    return 1\nx = B().f()\n").expect("parse failed");
        match &prg[1] {
            Statement::Assignment(_, rhs) => match &**rhs {
                Statement::MethodCall(object, name, _) => {
                    assert_eq!(name, "f");
                    assert!(matches!(&**object, Statement::NewInstance(_, _)));
                }
                r => panic!("unexpected output: {:?}", r),
            },
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn str_builtin_becomes_stringify() {
        match parse_single("x = str(5)\n") {
            Statement::Assignment(_, rhs) => assert!(matches!(*rhs, Statement::Stringify(_))),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn if_with_else() {
        let stmt = parse_single("if 1 < 2:\n  print \"yes\"\nelse:\n  print \"no\"\n");
        match stmt {
            Statement::IfElse(cond, if_body, else_body) => {
                assert!(matches!(*cond, Statement::Comparison(_, _, _)));
                assert!(matches!(*if_body, Statement::Compound(_)));
                assert!(else_body.is_some());
            }
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn if_without_else() {
        match parse_single("if x:\n  y = 1\n") {
            Statement::IfElse(_, _, else_body) => assert!(else_body.is_none()),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn bare_return_yields_none() {
        let prg = parse("class C:\n  def f():\n    return\n").expect("parse failed");
        match &prg[0] {
            Statement::ClassDefinition(class) => {
                let f = class.method("f").expect("method not recorded");
                match &f.body {
                    Statement::MethodBody(body) => match &**body {
                        Statement::Compound(stmts) => {
                            assert!(matches!(stmts[0], Statement::Return(_)))
                        }
                        r => panic!("unexpected output: {:?}", r),
                    },
                    r => panic!("unexpected output: {:?}", r),
                }
            }
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn assigning_to_a_literal_is_an_error() {
        match parse("1 = 2\n") {
            Err(ParserError::ExpectedLvalue) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn missing_expression_is_an_error() {
        match parse("x = *\n") {
            Err(ParserError::ExpectedExpression(_)) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn missing_colon_is_a_lexer_expect_error() {
        match parse("if 1\n  x = 1\n") {
            Err(ParserError::Lexer(LexerError::UnexpectedToken { .. })) => (),
            r => panic!("unexpected output: {:?}", r),
        }
    }
}
