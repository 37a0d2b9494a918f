//! Runtime object model: values, handles, classes and comparisons.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};

use crate::ast::Statement;
use crate::ctx::Context;

const STR_METHOD: &str = "__str__";
const EQ_METHOD: &str = "__eq__";
const LT_METHOD: &str = "__lt__";

/// An environment frame mapping names to handles.  Last write wins.
pub type Closure = HashMap<String, ObjectHolder>;

/// A runtime value.
#[derive(Debug)]
pub enum Object {
    Number(i32),
    String(String),
    Bool(bool),
    Class(Class),
    Instance(ClassInstance),
}

/// A uniform handle to a runtime object.
///
/// A handle is either empty, owning, or a non-owning share of a value owned
/// elsewhere.  Shares exist so that `self` can be put into a method closure
/// without creating an ownership cycle through the instance's own fields;
/// mutations of instance fields are observed through every share.
#[derive(Debug, Clone, Default)]
pub struct ObjectHolder(Repr);

#[derive(Debug, Clone, Default)]
enum Repr {
    #[default]
    Empty,
    Owned(Rc<Object>),
    Shared(Weak<Object>),
}

impl ObjectHolder {
    /// Wraps a freshly produced value, taking ownership of its lifetime.
    pub fn own(object: Object) -> ObjectHolder {
        ObjectHolder(Repr::Owned(Rc::new(object)))
    }

    /// The empty handle.
    pub fn none() -> ObjectHolder {
        ObjectHolder(Repr::Empty)
    }

    /// A non-owning handle to the same object.
    pub fn share(&self) -> ObjectHolder {
        match &self.0 {
            Repr::Empty => ObjectHolder(Repr::Empty),
            Repr::Owned(rc) => ObjectHolder(Repr::Shared(Rc::downgrade(rc))),
            Repr::Shared(weak) => ObjectHolder(Repr::Shared(weak.clone())),
        }
    }

    /// The referenced object.  An empty handle, or a share whose owner is
    /// gone, reads as `None`.
    pub fn get(&self) -> Option<Rc<Object>> {
        match &self.0 {
            Repr::Empty => None,
            Repr::Owned(rc) => Some(rc.clone()),
            Repr::Shared(weak) => weak.upgrade(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_none()
    }

    /// Writes the canonical representation of the referenced object.
    ///
    /// Empty handles print `None`.  Instances print through `__str__` when
    /// the class provides it, and an address-like identity otherwise.
    pub fn print(&self, out: &mut dyn Write, ctx: &mut dyn Context) -> Result<(), RuntimeError> {
        match self.get() {
            None => write!(out, "None")?,
            Some(object) => match &*object {
                Object::Number(n) => write!(out, "{}", n)?,
                Object::String(s) => out.write_all(s.as_bytes())?,
                Object::Bool(b) => write!(out, "{}", if *b { "True" } else { "False" })?,
                Object::Class(class) => write!(out, "Class {}", class.name())?,
                Object::Instance(instance) => {
                    if instance.has_method(STR_METHOD, 0) {
                        let rendered = self.call_method(STR_METHOD, &[], ctx)?;
                        rendered.print(out, ctx)?;
                    } else {
                        write!(out, "{:p}", Rc::as_ptr(&object))?;
                    }
                }
            },
        }
        Ok(())
    }

    /// Calls `method` on the referenced class instance.
    ///
    /// Validates that the handle refers to an instance and that the resolved
    /// method exists with the right arity, then executes the method body in
    /// a fresh closure seeded with `self` and the formal parameters.
    pub fn call_method(
        &self,
        method: &str,
        args: &[ObjectHolder],
        ctx: &mut dyn Context,
    ) -> Result<ObjectHolder, RuntimeError> {
        let object = match self.get() {
            Some(object) => object,
            None => return Err(RuntimeError::NotAnInstance),
        };
        let instance = match &*object {
            Object::Instance(instance) => instance,
            _ => return Err(RuntimeError::NotAnInstance),
        };
        let method = match instance.class().method(method) {
            Some(m) => m,
            None => return Err(RuntimeError::UnknownMethod(method.to_string())),
        };
        if method.formal_params.len() != args.len() {
            return Err(RuntimeError::BadNumberOfArguments);
        }

        let mut closure = Closure::new();
        closure.insert("self".to_string(), self.share());
        for (param, arg) in method.formal_params.iter().zip(args) {
            closure.insert(param.clone(), arg.clone());
        }
        match method.body.execute(&mut closure, ctx)? {
            ControlFlow::Continue(value) | ControlFlow::Break(value) => Ok(value),
        }
    }
}

/// A user-defined class.  Cheap to clone; clones refer to the same class.
#[derive(Clone)]
pub struct Class(Rc<ClassData>);

struct ClassData {
    name: String,
    methods: HashMap<String, Method>,
    parent: Option<Class>,
}

impl Class {
    pub fn new(name: String, methods: Vec<Method>, parent: Option<Class>) -> Class {
        let methods = methods
            .into_iter()
            .map(|method| (method.name.clone(), method))
            .collect();
        Class(Rc::new(ClassData {
            name,
            methods,
            parent,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Resolves `name`, walking up the inheritance chain.
    pub fn method(&self, name: &str) -> Option<&Method> {
        match self.0.methods.get(name) {
            Some(method) => Some(method),
            None => self.0.parent.as_ref().and_then(|parent| parent.method(name)),
        }
    }
}

// Method bodies can mention the class itself, so the derived representation
// would recurse; print the name only.
impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.0.name)
            .finish_non_exhaustive()
    }
}

/// A method of a class.
#[derive(Debug)]
pub struct Method {
    pub name: String,
    pub formal_params: Vec<String>,
    pub body: Statement,
}

/// An instance of a user-defined class: a class handle plus mutable fields.
pub struct ClassInstance {
    class: Class,
    fields: RefCell<Closure>,
}

impl ClassInstance {
    pub fn new(class: Class) -> ClassInstance {
        ClassInstance {
            class,
            fields: RefCell::new(Closure::new()),
        }
    }

    pub fn class(&self) -> &Class {
        &self.class
    }

    /// True iff the resolved method exists and takes exactly
    /// `argument_count` parameters.
    pub fn has_method(&self, name: &str, argument_count: usize) -> bool {
        self.class
            .method(name)
            .map_or(false, |method| method.formal_params.len() == argument_count)
    }

    pub fn fields(&self) -> Ref<'_, Closure> {
        self.fields.borrow()
    }

    pub fn fields_mut(&self) -> RefMut<'_, Closure> {
        self.fields.borrow_mut()
    }
}

// Fields can refer back to the instance; print the class name only.
impl fmt::Debug for ClassInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInstance")
            .field("class", &self.class.name())
            .finish_non_exhaustive()
    }
}

/// Truthiness of a handle.
///
/// Empty handles, zero, the empty string, `False`, classes and instances are
/// falsy; everything else is truthy.
pub fn is_true(object: &ObjectHolder) -> bool {
    match object.get().as_deref() {
        None => false,
        Some(Object::String(s)) => !s.is_empty(),
        Some(Object::Number(n)) => *n != 0,
        Some(Object::Bool(b)) => *b,
        Some(Object::Class(_)) | Some(Object::Instance(_)) => false,
    }
}

/// Equality of two handles.
///
/// Two empty handles are equal; a class instance with `__eq__` decides for
/// itself; otherwise only same-variant primitives compare.
pub fn equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    if lhs.is_empty() && rhs.is_empty() {
        return Ok(true);
    }
    if let Some(Object::Instance(instance)) = lhs.get().as_deref() {
        if instance.has_method(EQ_METHOD, 1) {
            return dispatch_comparison(lhs, rhs, EQ_METHOD, ctx);
        }
    }
    if let (Some(l), Some(r)) = (lhs.get(), rhs.get()) {
        match (&*l, &*r) {
            (Object::Number(a), Object::Number(b)) => return Ok(a == b),
            (Object::String(a), Object::String(b)) => return Ok(a == b),
            (Object::Bool(a), Object::Bool(b)) => return Ok(a == b),
            _ => (),
        }
    }
    Err(RuntimeError::TypeMismatch)
}

/// Strict ordering of two handles, through `__lt__` for class instances.
pub fn less(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    if let Some(Object::Instance(instance)) = lhs.get().as_deref() {
        if instance.has_method(LT_METHOD, 1) {
            return dispatch_comparison(lhs, rhs, LT_METHOD, ctx);
        }
    }
    if let (Some(l), Some(r)) = (lhs.get(), rhs.get()) {
        match (&*l, &*r) {
            (Object::Number(a), Object::Number(b)) => return Ok(a < b),
            (Object::String(a), Object::String(b)) => return Ok(a < b),
            (Object::Bool(a), Object::Bool(b)) => return Ok(a < b),
            _ => (),
        }
    }
    Err(RuntimeError::TypeMismatch)
}

pub fn not_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!equal(lhs, rhs, ctx)?)
}

pub fn greater(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!(less(lhs, rhs, ctx)? || equal(lhs, rhs, ctx)?))
}

pub fn less_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!greater(lhs, rhs, ctx)?)
}

pub fn greater_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    Ok(!less(lhs, rhs, ctx)?)
}

/// Runs a `__eq__`/`__lt__` style method and insists on a `Bool` result.
fn dispatch_comparison(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    method: &str,
    ctx: &mut dyn Context,
) -> Result<bool, RuntimeError> {
    let result = lhs.call_method(method, &[rhs.clone()], ctx)?;
    match result.get().as_deref() {
        Some(Object::Bool(b)) => Ok(*b),
        _ => Err(RuntimeError::TypeMismatch),
    }
}

/// Errors raised during evaluation.
#[derive(Debug)]
pub enum RuntimeError {
    UnknownVariable(String),
    UnknownField(String),
    NotAnInstance,
    UnknownMethod(String),
    BadNumberOfArguments,
    TypeMismatch,
    DivByZero,
    ReturnOutsideMethod,
    Io(io::Error),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UnknownVariable(name) => write!(f, "unknown variable: {}", name),
            RuntimeError::UnknownField(name) => write!(f, "unknown field: {}", name),
            RuntimeError::NotAnInstance => write!(f, "not a class instance"),
            RuntimeError::UnknownMethod(name) => write!(f, "unknown method: {}", name),
            RuntimeError::BadNumberOfArguments => write!(f, "bad number of arguments"),
            RuntimeError::TypeMismatch => write!(f, "type mismatch"),
            RuntimeError::DivByZero => write!(f, "division by zero"),
            RuntimeError::ReturnOutsideMethod => write!(f, "return outside of a method body"),
            RuntimeError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RuntimeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> RuntimeError {
        RuntimeError::Io(e)
    }
}
