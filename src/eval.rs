//! Statement execution.
//!
//! `execute` returns `ControlFlow`: `Continue` carries the statement's
//! value, `Break` carries a pending `return` travelling up to the nearest
//! enclosing method body.  Every node forwards a `Break` untouched;
//! `MethodBody` is the only one that stops it.

use std::io::Write;
use std::ops::ControlFlow;

use crate::ast::{Comparator, Statement};
use crate::ctx::Context;
use crate::runtime::{self, ClassInstance, Closure, Object, ObjectHolder, RuntimeError};

const ADD_METHOD: &str = "__add__";
const INIT_METHOD: &str = "__init__";

/// Unwraps the value of a sub-statement, forwarding a pending `return`.
macro_rules! value {
    ($flow:expr) => {
        match $flow? {
            ControlFlow::Continue(value) => value,
            flow @ ControlFlow::Break(_) => return Ok(flow),
        }
    };
}

impl Statement {
    pub fn execute(
        &self,
        closure: &mut Closure,
        ctx: &mut dyn Context,
    ) -> Result<ControlFlow<ObjectHolder, ObjectHolder>, RuntimeError> {
        match self {
            Statement::Const(value) => Ok(ControlFlow::Continue(value.clone())),

            Statement::Assignment(name, rhs) => {
                let value = value!(rhs.execute(closure, ctx));
                closure.insert(name.clone(), value.clone());
                Ok(ControlFlow::Continue(value))
            }

            Statement::VariableValue(ids) => {
                Ok(ControlFlow::Continue(resolve_variable(ids, closure)?))
            }

            Statement::FieldAssignment(ids, field, rhs) => {
                let value = value!(rhs.execute(closure, ctx));
                let object = resolve_variable(ids, closure)?;
                match object.get().as_deref() {
                    Some(Object::Instance(instance)) => {
                        instance.fields_mut().insert(field.clone(), value.clone());
                    }
                    _ => return Err(RuntimeError::NotAnInstance),
                }
                Ok(ControlFlow::Continue(value))
            }

            Statement::Print(args) => {
                let mut rendered: Vec<u8> = Vec::new();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ctx.output().write_all(b" ")?;
                    }
                    let value = value!(arg.execute(closure, ctx));
                    // A value cannot be printed straight into the context's
                    // output while the context is also handed down for
                    // __str__ dispatch, so each value is rendered on its own.
                    rendered.clear();
                    value.print(&mut rendered, ctx)?;
                    ctx.output().write_all(&rendered)?;
                }
                ctx.output().write_all(b"\n")?;
                Ok(ControlFlow::Continue(ObjectHolder::none()))
            }

            Statement::MethodCall(object, name, args) => {
                let object = value!(object.execute(closure, ctx));
                {
                    let target = match object.get() {
                        Some(target) => target,
                        None => return Err(RuntimeError::NotAnInstance),
                    };
                    let instance = match &*target {
                        Object::Instance(instance) => instance,
                        _ => return Err(RuntimeError::NotAnInstance),
                    };
                    match instance.class().method(name) {
                        None => return Err(RuntimeError::UnknownMethod(name.clone())),
                        Some(method) if method.formal_params.len() != args.len() => {
                            return Err(RuntimeError::BadNumberOfArguments)
                        }
                        Some(_) => (),
                    }
                }
                let mut actual = Vec::with_capacity(args.len());
                for arg in args {
                    actual.push(value!(arg.execute(closure, ctx)));
                }
                Ok(ControlFlow::Continue(object.call_method(name, &actual, ctx)?))
            }

            Statement::NewInstance(class, args) => {
                let object = ObjectHolder::own(Object::Instance(ClassInstance::new(class.clone())));
                let has_init = match object.get().as_deref() {
                    Some(Object::Instance(instance)) => {
                        instance.has_method(INIT_METHOD, args.len())
                    }
                    _ => false,
                };
                if has_init {
                    let mut actual = Vec::with_capacity(args.len());
                    for arg in args {
                        actual.push(value!(arg.execute(closure, ctx)));
                    }
                    object.call_method(INIT_METHOD, &actual, ctx)?;
                }
                Ok(ControlFlow::Continue(object))
            }

            Statement::Stringify(arg) => {
                let value = value!(arg.execute(closure, ctx));
                let mut buffer: Vec<u8> = Vec::new();
                value.print(&mut buffer, ctx)?;
                let rendered = String::from_utf8_lossy(&buffer).into_owned();
                Ok(ControlFlow::Continue(ObjectHolder::own(Object::String(
                    rendered,
                ))))
            }

            Statement::Add(lhs, rhs) => {
                let lhs = value!(lhs.execute(closure, ctx));
                let rhs = value!(rhs.execute(closure, ctx));
                let result = match (lhs.get().as_deref(), rhs.get().as_deref()) {
                    (Some(Object::Number(l)), Some(Object::Number(r))) => {
                        ObjectHolder::own(Object::Number(l + r))
                    }
                    (Some(Object::String(l)), Some(Object::String(r))) => {
                        let mut joined = l.clone();
                        joined.push_str(r);
                        ObjectHolder::own(Object::String(joined))
                    }
                    (Some(Object::Instance(instance)), Some(_))
                        if instance.has_method(ADD_METHOD, 1) =>
                    {
                        lhs.call_method(ADD_METHOD, &[rhs.share()], ctx)?
                    }
                    _ => return Err(RuntimeError::TypeMismatch),
                };
                Ok(ControlFlow::Continue(result))
            }

            Statement::Sub(lhs, rhs) => {
                let lhs = value!(lhs.execute(closure, ctx));
                let rhs = value!(rhs.execute(closure, ctx));
                match (lhs.get().as_deref(), rhs.get().as_deref()) {
                    (Some(Object::Number(l)), Some(Object::Number(r))) => Ok(
                        ControlFlow::Continue(ObjectHolder::own(Object::Number(l - r))),
                    ),
                    _ => Err(RuntimeError::TypeMismatch),
                }
            }

            Statement::Mult(lhs, rhs) => {
                let lhs = value!(lhs.execute(closure, ctx));
                let rhs = value!(rhs.execute(closure, ctx));
                match (lhs.get().as_deref(), rhs.get().as_deref()) {
                    (Some(Object::Number(l)), Some(Object::Number(r))) => Ok(
                        ControlFlow::Continue(ObjectHolder::own(Object::Number(l * r))),
                    ),
                    _ => Err(RuntimeError::TypeMismatch),
                }
            }

            Statement::Div(lhs, rhs) => {
                let lhs = value!(lhs.execute(closure, ctx));
                let rhs = value!(rhs.execute(closure, ctx));
                match (lhs.get().as_deref(), rhs.get().as_deref()) {
                    (Some(Object::Number(_)), Some(Object::Number(0))) => {
                        Err(RuntimeError::DivByZero)
                    }
                    (Some(Object::Number(l)), Some(Object::Number(r))) => Ok(
                        ControlFlow::Continue(ObjectHolder::own(Object::Number(l / r))),
                    ),
                    _ => Err(RuntimeError::TypeMismatch),
                }
            }

            Statement::Or(lhs, rhs) => {
                let lhs = value!(lhs.execute(closure, ctx));
                if runtime::is_true(&lhs) {
                    return Ok(ControlFlow::Continue(ObjectHolder::own(Object::Bool(true))));
                }
                let rhs = value!(rhs.execute(closure, ctx));
                Ok(ControlFlow::Continue(ObjectHolder::own(Object::Bool(
                    runtime::is_true(&rhs),
                ))))
            }

            Statement::And(lhs, rhs) => {
                let lhs = value!(lhs.execute(closure, ctx));
                if !runtime::is_true(&lhs) {
                    return Ok(ControlFlow::Continue(ObjectHolder::own(Object::Bool(
                        false,
                    ))));
                }
                let rhs = value!(rhs.execute(closure, ctx));
                Ok(ControlFlow::Continue(ObjectHolder::own(Object::Bool(
                    runtime::is_true(&rhs),
                ))))
            }

            Statement::Not(arg) => {
                let value = value!(arg.execute(closure, ctx));
                Ok(ControlFlow::Continue(ObjectHolder::own(Object::Bool(
                    !runtime::is_true(&value),
                ))))
            }

            Statement::Comparison(cmp, lhs, rhs) => {
                let lhs = value!(lhs.execute(closure, ctx));
                let rhs = value!(rhs.execute(closure, ctx));
                let result = cmp.apply(&lhs, &rhs, ctx)?;
                Ok(ControlFlow::Continue(ObjectHolder::own(Object::Bool(
                    result,
                ))))
            }

            Statement::Compound(stmts) => {
                for stmt in stmts {
                    match stmt.execute(closure, ctx)? {
                        ControlFlow::Continue(_) => (),
                        flow @ ControlFlow::Break(_) => return Ok(flow),
                    }
                }
                Ok(ControlFlow::Continue(ObjectHolder::none()))
            }

            Statement::Return(stmt) => {
                let value = value!(stmt.execute(closure, ctx));
                Ok(ControlFlow::Break(value))
            }

            Statement::ClassDefinition(class) => {
                closure.insert(
                    class.name().to_string(),
                    ObjectHolder::own(Object::Class(class.clone())),
                );
                Ok(ControlFlow::Continue(ObjectHolder::none()))
            }

            Statement::IfElse(condition, if_body, else_body) => {
                let condition = value!(condition.execute(closure, ctx));
                if runtime::is_true(&condition) {
                    if_body.execute(closure, ctx)
                } else if let Some(else_body) = else_body {
                    else_body.execute(closure, ctx)
                } else {
                    Ok(ControlFlow::Continue(ObjectHolder::none()))
                }
            }

            Statement::MethodBody(body) => match body.execute(closure, ctx)? {
                ControlFlow::Break(value) => Ok(ControlFlow::Continue(value)),
                ControlFlow::Continue(_) => Ok(ControlFlow::Continue(ObjectHolder::none())),
            },
        }
    }
}

impl Comparator {
    fn apply(
        self,
        lhs: &ObjectHolder,
        rhs: &ObjectHolder,
        ctx: &mut dyn Context,
    ) -> Result<bool, RuntimeError> {
        match self {
            Comparator::Equal => runtime::equal(lhs, rhs, ctx),
            Comparator::NotEqual => runtime::not_equal(lhs, rhs, ctx),
            Comparator::Less => runtime::less(lhs, rhs, ctx),
            Comparator::Greater => runtime::greater(lhs, rhs, ctx),
            Comparator::LessOrEqual => runtime::less_or_equal(lhs, rhs, ctx),
            Comparator::GreaterOrEqual => runtime::greater_or_equal(lhs, rhs, ctx),
        }
    }
}

/// Looks up a dotted chain of names: the head in the closure, the rest in
/// instance fields.
fn resolve_variable(ids: &[String], closure: &Closure) -> Result<ObjectHolder, RuntimeError> {
    let (first, rest) = match ids.split_first() {
        Some(parts) => parts,
        None => return Err(RuntimeError::UnknownVariable(String::new())),
    };
    let mut object = match closure.get(first) {
        Some(object) => object.clone(),
        None => return Err(RuntimeError::UnknownVariable(first.clone())),
    };
    for id in rest {
        let field = match object.get().as_deref() {
            Some(Object::Instance(instance)) => instance.fields().get(id).cloned(),
            _ => return Err(RuntimeError::NotAnInstance),
        };
        object = match field {
            Some(field) => field,
            None => return Err(RuntimeError::UnknownField(id.clone())),
        };
    }
    Ok(object)
}
