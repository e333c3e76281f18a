//! Tree-walking evaluator.
//!
//! Executes resolved statements against a chain of lexical environments.  The
//! current environment is an instance field, saved and restored around every
//! block and call frame.  Variable reads and writes consult the bindings map
//! recorded by the resolver: a resolved reference skips exactly `hops`
//! enclosing environments, an unresolved reference operates on the chain
//! root (the global scope).

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::callable::Function;
use crate::class::Class;
use crate::environment::Environment;
use crate::error::LarkError;
use crate::expr::{Expr, NodeId};
use crate::instance::Instance;
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Signal threaded through evaluation.
///
/// `Return` is non-error control flow: it unwinds to the nearest function
/// call boundary without intermediate frames opting in.  A `Return` that
/// escapes all frames is converted to a runtime error by [`Interpreter::run`].
#[derive(Debug)]
pub enum Unwind {
    Error(LarkError),

    Return {
        value: Value,
        row: usize,
        col: usize,
    },
}

impl From<LarkError> for Unwind {
    fn from(err: LarkError) -> Self {
        Unwind::Error(err)
    }
}

pub struct Interpreter {
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<NodeId, usize>,
    out: Rc<RefCell<dyn Write>>,
}

impl Interpreter {
    /// An interpreter printing to standard output.
    pub fn new() -> Self {
        let out: Rc<RefCell<dyn Write>> = Rc::new(RefCell::new(io::stdout()));

        Self::with_output(out)
    }

    /// An interpreter printing to the given sink.  Tests pass a buffer here.
    pub fn with_output(out: Rc<RefCell<dyn Write>>) -> Self {
        let environment = Rc::new(RefCell::new(Environment::new()));

        {
            let mut globals = environment.borrow_mut();

            let _ = globals.define(
                "clock",
                Value::NativeFunction {
                    name: "clock",
                    arity: 0,
                    func: clock_native,
                },
            );

            let _ = globals.define(
                "print",
                Value::NativeFunction {
                    name: "print",
                    arity: 1,
                    func: print_native,
                },
            );
        }

        info!("Interpreter initialized with native globals");

        Interpreter {
            environment,
            locals: HashMap::new(),
            out,
        }
    }

    /// Record a binding distance for a reference node.  Called by the
    /// resolver; absence of an entry means the reference is global.
    pub fn note_local(&mut self, id: NodeId, hops: usize) {
        debug!("Binding node {} at {} hop(s)", id, hops);

        self.locals.insert(id, hops);
    }

    /// Execute one top-level statement.
    ///
    /// A `Return` unwind escaping all frames surfaces here as a runtime
    /// error at the `return` token.
    pub fn run(&mut self, stmt: &Stmt) -> Result<(), LarkError> {
        match self.execute(stmt) {
            Ok(()) => Ok(()),

            Err(Unwind::Error(err)) => Err(err),

            Err(Unwind::Return { row, col, .. }) => Err(LarkError::runtime(
                row,
                col,
                "'return' used outside of a function",
            )),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<(), Unwind> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Let(declarators) => {
                for declarator in declarators {
                    let value: Value = match &declarator.initializer {
                        Some(expr) => self.evaluate(expr)?,

                        None => Value::None,
                    };

                    self.define_checked(&declarator.name, value)?;
                }

                Ok(())
            }

            Stmt::Block(statements) => {
                let block = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));

                self.execute_in(statements, block)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                let function = Function::new(declaration.clone(), self.environment.clone());

                self.define_checked(&declaration.name, Value::Function(function))?;

                Ok(())
            }

            Stmt::Return { keyword, value } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,

                    None => Value::None,
                };

                Err(Unwind::Return {
                    value,
                    row: keyword.row,
                    col: keyword.col,
                })
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let superclass: Option<Class> = match superclass {
                    Some(expr) => {
                        let value = self.evaluate(expr)?;

                        match value {
                            Value::Class(class) => Some(class),

                            other => {
                                let (row, col) = expr.position();

                                return Err(Unwind::Error(LarkError::runtime(
                                    row,
                                    col,
                                    format!("superclass must be a class, got {}", other.type_name()),
                                )));
                            }
                        }
                    }

                    None => None,
                };

                // Methods close over the environment the class is declared
                // in; the class binding below lands in that same node, which
                // is what lets method bodies refer to the class by name.
                let methods: Vec<Function> = methods
                    .iter()
                    .map(|decl| Function::new(decl.clone(), self.environment.clone()))
                    .collect();

                let class = Class::new(name.lexeme.clone(), methods, superclass);

                debug!("Declaring class '{}'", name.lexeme);

                self.define_checked(name, Value::Class(class))?;

                Ok(())
            }
        }
    }

    /// Execute `statements` with `env` as the current environment, restoring
    /// the previous environment on every exit path.
    pub fn execute_in(
        &mut self,
        statements: &[Stmt],
        env: Rc<RefCell<Environment>>,
    ) -> Result<(), Unwind> {
        let previous: Rc<RefCell<Environment>> = std::mem::replace(&mut self.environment, env);

        for stmt in statements {
            if let Err(unwind) = self.execute(stmt) {
                self.environment = previous;

                return Err(unwind);
            }
        }

        self.environment = previous;

        Ok(())
    }

    fn define_checked(&mut self, name: &Token, value: Value) -> Result<(), Unwind> {
        if !self.environment.borrow_mut().define(&name.lexeme, value) {
            return Err(Unwind::Error(LarkError::runtime(
                name.row,
                name.col,
                format!("'{}' is already declared in this scope", name.lexeme),
            )));
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, Unwind> {
        match expr {
            Expr::Literal { id, token } => self.evaluate_literal(*id, token),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary {
                op,
                operand,
                postfix,
            } => self.evaluate_unary(op, operand, *postfix),

            Expr::Binary { left, op, right } => self.evaluate_binary(left, op, right),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Assign { target, value } => self.evaluate_assign(target, value),

            Expr::Call {
                callee,
                paren,
                args,
            } => self.evaluate_call(callee, paren, args),

            Expr::Get { object, property } => self.evaluate_get(object, property),

            Expr::New { keyword, call } => self.evaluate_new(keyword, call),

            Expr::This { id, keyword } => self.lookup_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                property,
            } => self.evaluate_super(*id, keyword, property),
        }
    }

    fn evaluate_literal(&mut self, id: NodeId, token: &Token) -> Result<Value, Unwind> {
        match &token.token_type {
            TokenType::NUMBER(n) => Ok(Value::Number(*n)),

            TokenType::STRING(s) => Ok(Value::String(s.clone())),

            TokenType::TRUE => Ok(Value::Bool(true)),

            TokenType::FALSE => Ok(Value::Bool(false)),

            TokenType::NONE => Ok(Value::None),

            TokenType::IDENTIFIER => self.lookup_variable(token, id),

            _ => Err(Unwind::Error(LarkError::runtime(
                token.row,
                token.col,
                format!("invalid literal '{}'", token.lexeme),
            ))),
        }
    }

    fn evaluate_unary(&mut self, op: &Token, operand: &Expr, postfix: bool) -> Result<Value, Unwind> {
        match op.token_type {
            TokenType::PLUS_PLUS => self.evaluate_increment(op, operand, postfix, 1.0),

            TokenType::MINUS_MINUS => self.evaluate_increment(op, operand, postfix, -1.0),

            TokenType::MINUS => match self.evaluate(operand)? {
                Value::Number(n) => Ok(Value::Number(-n)),

                other => Err(numeric_operand_error(op, &other)),
            },

            TokenType::PLUS => match self.evaluate(operand)? {
                Value::Number(n) => Ok(Value::Number(n)),

                other => Err(numeric_operand_error(op, &other)),
            },

            TokenType::BANG => {
                let value: Value = self.evaluate(operand)?;

                Ok(Value::Bool(!is_truthy(&value)))
            }

            _ => Err(Unwind::Error(LarkError::runtime(
                op.row,
                op.col,
                format!("invalid unary operator '{}'", op.lexeme),
            ))),
        }
    }

    /// `++x` / `--x` / `x++` / `x--`: read, step by `delta`, write back
    /// through the bindings map.  Prefix yields the new value, postfix the
    /// old one.
    fn evaluate_increment(
        &mut self,
        op: &Token,
        operand: &Expr,
        postfix: bool,
        delta: f64,
    ) -> Result<Value, Unwind> {
        let (id, name) = match operand {
            Expr::Literal { id, token } if token.token_type == TokenType::IDENTIFIER => {
                (*id, token)
            }

            _ => {
                return Err(Unwind::Error(LarkError::runtime(
                    op.row,
                    op.col,
                    format!("operand of '{}' must be a variable", op.lexeme),
                )));
            }
        };

        let old: f64 = match self.lookup_variable(name, id)? {
            Value::Number(n) => n,

            other => return Err(numeric_operand_error(op, &other)),
        };

        let new: f64 = old + delta;

        self.assign_variable(name, id, Value::Number(new))?;

        if postfix {
            Ok(Value::Number(old))
        } else {
            Ok(Value::Number(new))
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, Unwind> {
        let left_val: Value = self.evaluate(left)?;
        let right_val: Value = self.evaluate(right)?;

        match op.token_type {
            TokenType::PLUS => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                // Either side being a string turns '+' into concatenation of
                // display forms.
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::String(format!("{}{}", left_val, right_val)))
                }

                _ => Err(Unwind::Error(LarkError::runtime(
                    op.row,
                    op.col,
                    "operands of '+' must be numbers or strings",
                ))),
            },

            TokenType::MINUS => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(numeric_operands_error(op, &left_val, &right_val)),
            },

            TokenType::STAR => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(numeric_operands_error(op, &left_val, &right_val)),
            },

            TokenType::SLASH => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => {
                    if *b == 0.0 {
                        Err(Unwind::Error(LarkError::runtime(
                            op.row,
                            op.col,
                            "division by zero",
                        )))
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }

                _ => Err(numeric_operands_error(op, &left_val, &right_val)),
            },

            TokenType::CARET => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.powf(*b))),

                _ => Err(numeric_operands_error(op, &left_val, &right_val)),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left_val, &right_val))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left_val, &right_val))),

            TokenType::LESS => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(numeric_operands_error(op, &left_val, &right_val)),
            },

            TokenType::LESS_EQUAL => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(numeric_operands_error(op, &left_val, &right_val)),
            },

            TokenType::GREATER => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(numeric_operands_error(op, &left_val, &right_val)),
            },

            TokenType::GREATER_EQUAL => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(numeric_operands_error(op, &left_val, &right_val)),
            },

            _ => Err(Unwind::Error(LarkError::runtime(
                op.row,
                op.col,
                format!("invalid binary operator '{}'", op.lexeme),
            ))),
        }
    }

    fn evaluate_assign(&mut self, target: &Expr, value: &Expr) -> Result<Value, Unwind> {
        match target {
            Expr::Literal { id, token } if token.token_type == TokenType::IDENTIFIER => {
                let value: Value = self.evaluate(value)?;

                self.assign_variable(token, *id, value.clone())?;

                Ok(value)
            }

            Expr::Get { object, property } => {
                let object: Value = self.evaluate(object)?;

                let instance: Instance = match object {
                    Value::Instance(instance) => instance,

                    other => {
                        return Err(Unwind::Error(LarkError::runtime(
                            property.row,
                            property.col,
                            format!("only instances have fields, got {}", other.type_name()),
                        )));
                    }
                };

                let value: Value = self.evaluate(value)?;

                instance.set(&property.lexeme, value.clone());

                Ok(value)
            }

            // The parser rejects other targets; anything reaching here is an
            // internal inconsistency surfaced as a runtime error.
            _ => {
                let (row, col) = target.position();

                Err(Unwind::Error(LarkError::runtime(
                    row,
                    col,
                    "invalid assignment target",
                )))
            }
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        args: &[Expr],
    ) -> Result<Value, Unwind> {
        let callee_val: Value = self.evaluate(callee)?;

        match callee_val {
            Value::NativeFunction { name, arity, func } => {
                self.check_arity(arity, args.len(), paren)?;

                let arg_values: Vec<Value> = self.evaluate_args(args)?;

                debug!("Invoking native '{}'", name);

                func(self, &arg_values)
            }

            Value::Function(function) => {
                self.check_arity(function.arity(), args.len(), paren)?;

                let arg_values: Vec<Value> = self.evaluate_args(args)?;

                function.call(self, arg_values)
            }

            Value::Class(class) => Err(Unwind::Error(LarkError::runtime(
                paren.row,
                paren.col,
                format!(
                    "class '{}' can only be instantiated using the 'new' operator",
                    class.name()
                ),
            ))),

            other => Err(Unwind::Error(LarkError::runtime(
                paren.row,
                paren.col,
                format!("value of type {} is not callable", other.type_name()),
            ))),
        }
    }

    fn evaluate_new(&mut self, keyword: &Token, call: &Expr) -> Result<Value, Unwind> {
        let (callee, paren, args) = match call {
            Expr::Call {
                callee,
                paren,
                args,
            } => (callee, paren, args),

            // The parser only builds New around a Call.
            _ => {
                return Err(Unwind::Error(LarkError::runtime(
                    keyword.row,
                    keyword.col,
                    "'new' requires a call expression",
                )));
            }
        };

        let class: Class = match self.evaluate(callee)? {
            Value::Class(class) => class,

            other => {
                return Err(Unwind::Error(LarkError::runtime(
                    keyword.row,
                    keyword.col,
                    format!("'new' requires a class, got {}", other.type_name()),
                )));
            }
        };

        self.check_arity(class.arity(), args.len(), paren)?;

        let arg_values: Vec<Value> = self.evaluate_args(args)?;

        let instance = Instance::new(class.clone());

        debug!("Instantiating class '{}'", class.name());

        if let Some(constructor) = class.constructor() {
            // The constructor's own return value is discarded.
            constructor.bind(instance.clone()).call(self, arg_values)?;
        }

        Ok(Value::Instance(instance))
    }

    fn evaluate_get(&mut self, object: &Expr, property: &Token) -> Result<Value, Unwind> {
        match self.evaluate(object)? {
            Value::Instance(instance) => Ok(instance.get(property)?),

            other => Err(Unwind::Error(LarkError::runtime(
                property.row,
                property.col,
                format!("only instances have properties, got {}", other.type_name()),
            ))),
        }
    }

    /// `super.prop`: reach the enclosing `this` through the bindings map,
    /// then look the property up on its class's superclass and bind it.
    fn evaluate_super(
        &mut self,
        id: NodeId,
        keyword: &Token,
        property: &Token,
    ) -> Result<Value, Unwind> {
        let this_val: Option<Value> = match self.locals.get(&id) {
            Some(&hops) => Environment::ancestor(self.environment.clone(), hops)
                .borrow()
                .get_local("this"),

            None => Environment::global_of(self.environment.clone())
                .borrow()
                .get_local("this"),
        };

        let instance: Instance = match this_val {
            Some(Value::Instance(instance)) => instance,

            _ => {
                return Err(Unwind::Error(LarkError::runtime(
                    keyword.row,
                    keyword.col,
                    "cannot use 'super' outside of a method",
                )));
            }
        };

        let superclass: Class = match instance.class().superclass() {
            Some(superclass) => superclass,

            None => {
                return Err(Unwind::Error(LarkError::runtime(
                    keyword.row,
                    keyword.col,
                    "cannot use 'super' in a class with no superclass",
                )));
            }
        };

        match superclass.find_method(&property.lexeme) {
            Some(method) => Ok(Value::Function(method.bind(instance))),

            None => Err(Unwind::Error(LarkError::runtime(
                property.row,
                property.col,
                format!("undefined property '{}'", property.lexeme),
            ))),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Variable access through the bindings map
    // ─────────────────────────────────────────────────────────────────────

    fn lookup_variable(&self, name: &Token, id: NodeId) -> Result<Value, Unwind> {
        let value: Option<Value> = match self.locals.get(&id) {
            Some(&hops) => Environment::ancestor(self.environment.clone(), hops)
                .borrow()
                .get_local(&name.lexeme),

            None => Environment::global_of(self.environment.clone())
                .borrow()
                .get_local(&name.lexeme),
        };

        value.ok_or_else(|| undefined_variable(name))
    }

    fn assign_variable(&mut self, name: &Token, id: NodeId, value: Value) -> Result<(), Unwind> {
        let written: bool = match self.locals.get(&id) {
            Some(&hops) => Environment::ancestor(self.environment.clone(), hops)
                .borrow_mut()
                .set_local(&name.lexeme, value),

            None => Environment::global_of(self.environment.clone())
                .borrow_mut()
                .set_local(&name.lexeme, value),
        };

        if written {
            Ok(())
        } else {
            Err(undefined_variable(name))
        }
    }

    fn evaluate_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, Unwind> {
        let mut values: Vec<Value> = Vec::with_capacity(args.len());

        for arg in args {
            values.push(self.evaluate(arg)?);
        }

        Ok(values)
    }

    fn check_arity(&self, arity: usize, provided: usize, paren: &Token) -> Result<(), Unwind> {
        if arity != provided {
            return Err(Unwind::Error(LarkError::runtime(
                paren.row,
                paren.col,
                format!("expected {} arguments but got {}", arity, provided),
            )));
        }

        Ok(())
    }

    /// The configured output sink; `print` writes here.
    pub fn output(&self) -> Rc<RefCell<dyn Write>> {
        self.out.clone()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn undefined_variable(name: &Token) -> Unwind {
    Unwind::Error(LarkError::runtime(
        name.row,
        name.col,
        format!("undefined variable '{}'", name.lexeme),
    ))
}

fn numeric_operand_error(op: &Token, value: &Value) -> Unwind {
    Unwind::Error(LarkError::runtime(
        op.row,
        op.col,
        format!(
            "operand of '{}' must be a number, got {}",
            op.lexeme,
            value.type_name()
        ),
    ))
}

fn numeric_operands_error(op: &Token, left: &Value, right: &Value) -> Unwind {
    Unwind::Error(LarkError::runtime(
        op.row,
        op.col,
        format!(
            "operands of '{}' must be numbers, got {} and {}",
            op.lexeme,
            left.type_name(),
            right.type_name()
        ),
    ))
}

/// `none`, `false`, and the number 0 are falsy; everything else (including
/// the empty string) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::None => false,

        Value::Bool(b) => *b,

        Value::Number(n) => *n != 0.0,

        _ => true,
    }
}

/// Structural equality within a kind, pointer identity for callables and
/// instances, `false` across distinct kinds.
pub fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b,

        (Value::String(a), Value::String(b)) => a == b,

        (Value::Bool(a), Value::Bool(b)) => a == b,

        (Value::None, Value::None) => true,

        (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),

        (Value::Class(a), Value::Class(b)) => a.ptr_eq(b),

        (Value::Instance(a), Value::Instance(b)) => a.ptr_eq(b),

        (
            Value::NativeFunction { name: a, .. },
            Value::NativeFunction { name: b, .. },
        ) => a == b,

        _ => false,
    }
}

fn clock_native(_interpreter: &mut Interpreter, _args: &[Value]) -> Result<Value, Unwind> {
    let millis: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| {
            Unwind::Error(LarkError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("clock error: {}", e),
            )))
        })?
        .as_millis() as f64;

    Ok(Value::Number(millis))
}

fn print_native(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, Unwind> {
    let out = interpreter.output();

    writeln!(out.borrow_mut(), "{}", args[0]).map_err(|e| Unwind::Error(LarkError::Io(e)))?;

    Ok(Value::None)
}
