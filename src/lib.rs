//! An interpreter for the Mython programming language.
//!
//! Mython is a small indentation-sensitive, dynamically typed language with
//! user-defined classes, single inheritance, and a `print` statement.
//! Blocks are opened by two extra spaces of indentation; the lexer turns the
//! layout into explicit `Indent`/`Dedent`/`Newline` tokens.
//!
//! # Examples
//!
//! See [`crate::interpreter::Interpreter`].
//!
//! # Limitations
//!
//! - The lexer and parser do not attempt any error recovery.  They bail out
//! on the first encountered error.
//! - Numbers are machine integers; there are no floats, containers or loops.
//! - Reference cycles created through instance fields are leaked.

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

// TODO: report line numbers in lexer and parser errors

pub mod interpreter;

mod ast;
mod byte_reader;
mod ctx;
mod eval;
mod lexer;
mod parser;
mod runtime;
mod token;
