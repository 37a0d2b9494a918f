//! Integration tests running whole Mython programs.

use rmython::interpreter::{Interpreter, MythonError};

fn run(source: &str) -> Result<String, MythonError> {
    let mut output: Vec<u8> = Vec::new();
    let mut interp = Interpreter::new(&mut output);
    interp.eval(source.as_bytes())?;
    Ok(String::from_utf8(output).expect("output is not UTF-8"))
}

fn run_ok(source: &str) -> String {
    match run(source) {
        Ok(output) => output,
        Err(e) => panic!("execution failed: {}", e),
    }
}

#[test]
fn counter_accumulates_state() {
    let output = run_ok(
        r#"
class Counter:
  def __init__():
    self.count = 0
  def inc():
    self.count = self.count + 1
    return self.count

c = Counter()
c.inc()
c.inc()
print c.inc()
"#,
    );
    assert_eq!(output, "3\n");
}

#[test]
fn parent_method_reads_fields_set_by_the_subclass() {
    let output = run_ok(
        r#"
class Animal:
  def describe():
    return self.name + " says " + self.sound

class Dog(Animal):
  def __init__(name):
    self.name = name
    self.sound = "woof"

print Dog("Rex").describe()
"#,
    );
    assert_eq!(output, "Rex says woof\n");
}

#[test]
fn lt_dunder_drives_all_orderings() {
    let output = run_ok(
        r#"
class Box:
  def __init__(weight):
    self.weight = weight
  def __lt__(other):
    return self.weight < other.weight
  def __eq__(other):
    return self.weight == other.weight

light = Box(1)
heavy = Box(10)
print light < heavy
print light > heavy
print light <= light
print light >= heavy
"#,
    );
    assert_eq!(output, "True\nFalse\nTrue\nFalse\n");
}

#[test]
fn deeply_nested_blocks_unwind_correctly() {
    let output = run_ok(
        r#"
x = 3
if x > 0:
  if x > 1:
    if x > 2:
      print "three"
    print "two"
  print "one"
print "zero"
"#,
    );
    assert_eq!(output, "three\ntwo\none\nzero\n");
}

#[test]
fn blank_lines_and_comments_are_layout_neutral() {
    let output = run_ok(
        "# a counter\n\nx = 1\nif x == 1:\n\n  # inside the block\n  print \"one\"\n\n",
    );
    assert_eq!(output, "one\n");
}

#[test]
fn classes_print_their_name() {
    let output = run_ok("class Empty:\n  def noop():\n    return None\nprint Empty\n");
    assert_eq!(output, "Class Empty\n");
}

#[test]
fn truthiness_of_values_in_logic() {
    let output = run_ok(
        r#"
print "" or 0
print "x" and 1
print not None
"#,
    );
    assert_eq!(output, "False\nTrue\nTrue\n");
}

#[test]
fn str_converts_values_for_concatenation() {
    let output = run_ok("print 'answer: ' + str(6 * 7)\n");
    assert_eq!(output, "answer: 42\n");
}

#[test]
fn method_arguments_are_evaluated_left_to_right() {
    let output = run_ok(
        r#"
class Pair:
  def show(a, b):
    print a b

Pair().show(1 + 1, 2 * 2)
"#,
    );
    assert_eq!(output, "2 4\n");
}

#[test]
fn conditional_return_picks_a_branch() {
    let output = run_ok(
        r#"
class Picker:
  def max(a, b):
    if a < b:
      return b
    else:
      return a

p = Picker()
print p.max(10, 20) p.max(5, 4)
"#,
    );
    assert_eq!(output, "20 5\n");
}

#[test]
fn errors_carry_messages() {
    match run("print unknown\n") {
        Err(e) => assert_eq!(e.to_string(), "runtime error: unknown variable: unknown"),
        r => panic!("unexpected output: {:?}", r),
    }
    match run("if 1:\n   x = 1\n") {
        Err(e) => assert_eq!(e.to_string(), "Invalid Indentation"),
        r => panic!("unexpected output: {:?}", r),
    }
}
