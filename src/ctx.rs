//! Runtime services available to executing programs.

use std::io::Write;

/// Services the evaluator needs from its embedder.
///
/// The only service a program can observe is the output stream that `print`
/// statements (and `__str__` conversions) write to.
pub trait Context {
    fn output(&mut self) -> &mut dyn Write;
}

/// A context that writes program output to an arbitrary sink.
#[derive(Debug)]
pub struct SimpleContext<W: Write> {
    output: W,
}

impl<W: Write> SimpleContext<W> {
    pub fn new(output: W) -> SimpleContext<W> {
        SimpleContext { output }
    }
}

impl<W: Write> Context for SimpleContext<W> {
    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_goes_to_the_sink() {
        let mut ctx = SimpleContext::new(Vec::new());
        write!(ctx.output(), "ok").unwrap();
        let SimpleContext { output } = ctx;
        assert_eq!(output, b"ok");
    }
}
