//! API to control the interpreter.

use std::error::Error;
use std::fmt;
use std::io::{Read, Write};
use std::ops::ControlFlow;

use crate::ctx::SimpleContext;
use crate::parser::{Parser, ParserError};
use crate::runtime::{Closure, RuntimeError};

/// Tree-walk interpreter for Mython.
///
/// Global variables persist across `eval` calls, so a program can be fed in
/// several pieces.
///
/// # Example
///
/// ```
/// # use rmython::interpreter::{Interpreter, MythonError};
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// let program = r#"
/// class Greeter:
///   def greet(name):
///     return "Hello, " + name
///
/// g = Greeter()
/// print g.greet("world")
/// "#;
/// interp.eval(program.as_bytes())?;
///
/// assert_eq!(output, b"Hello, world\n");
/// # Ok::<(), MythonError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    ctx: SimpleContext<&'t mut W>,
    globals: Closure,
}

/// Errors the interpreter can raise.
#[derive(Debug)]
pub enum MythonError {
    /// Error occurring during lexical or syntactic analysis.
    Parse(ParserError),

    /// Error occurring during evaluation.
    Runtime(RuntimeError),
}

impl fmt::Display for MythonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MythonError::Parse(e) => write!(f, "{}", e),
            MythonError::Runtime(e) => write!(f, "runtime error: {}", e),
        }
    }
}

impl Error for MythonError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MythonError::Parse(e) => Some(e),
            MythonError::Runtime(e) => Some(e),
        }
    }
}

impl From<ParserError> for MythonError {
    fn from(e: ParserError) -> MythonError {
        MythonError::Parse(e)
    }
}

impl From<RuntimeError> for MythonError {
    fn from(e: RuntimeError) -> MythonError {
        MythonError::Runtime(e)
    }
}

impl<W: Write> Interpreter<'_, W> {
    pub fn new(output: &mut W) -> Interpreter<'_, W> {
        Interpreter {
            ctx: SimpleContext::new(output),
            globals: Closure::new(),
        }
    }

    /// Parses and executes one source unit against the global environment.
    pub fn eval<R: Read>(&mut self, input: R) -> Result<(), MythonError> {
        let mut parser = Parser::new(input)?;
        let program = parser.parse_program()?;
        for stmt in &program {
            match stmt.execute(&mut self.globals, &mut self.ctx)? {
                ControlFlow::Continue(_) => (),
                ControlFlow::Break(_) => {
                    return Err(MythonError::Runtime(RuntimeError::ReturnOutsideMethod))
                }
            }
        }
        Ok(())
    }
}
