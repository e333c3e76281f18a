//! Static resolution pass for the Lark interpreter.
//!
//! This module performs a single AST walk to:
//! 1. **Build lexical scopes**: maintains a stack of `HashMap<String, bool>`
//!    tracking declared (false) and fully defined (true) names in each nested
//!    block, function, or class body.
//! 2. **Enforce the one static rule**: reading a variable inside its own
//!    initializer is a syntax error.
//! 3. **Record binding distances**: for every identifier occurrence (and
//!    `this`/`super` expressions), calls back into the interpreter to note
//!    the number of environment hops between the reference and its declaring
//!    scope.  References found in no scope stay unrecorded and resolve as
//!    globals at evaluation time.
//!
//! # Workflow Overview
//!
//! 1. **Instantiation** (`Resolver::new`)
//!    - Captures a mutable reference to the `Interpreter`, where binding
//!      distances will be recorded.
//!    - Initializes an empty scope stack.
//!
//! 2. **Resolution Entry Point** (`resolve(&[Stmt])`)
//!    - Walks each top-level statement via `resolve_stmt`, halting on the
//!      first error.
//!
//! 3. **Statement Resolution** (`resolve_stmt`)
//!    - Declares and defines names for `let`, `function`, and `class`
//!      declarations; opens scopes for blocks, function bodies, and the
//!      implicit `this` of class bodies.
//!
//! 4. **Expression Resolution** (`resolve_expr`)
//!    - Recursively descends into expression nodes; identifier reads and
//!      assignment targets go through `resolve_local`.
//!
//! Dynamic rules stay dynamic: `return` outside a function, `this` outside a
//! method, and duplicate declarations are all runtime errors, not resolver
//! errors.

use std::collections::HashMap;

use log::{debug, info};

use crate::error::{LarkError, Result};
use crate::expr::{Expr, NodeId};
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

/// Resolver: tracks scopes and *records* binding distances (locals vs.
/// globals) by calling back into the interpreter.
pub struct Resolver<'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
}

impl<'interp> Resolver<'interp> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: Vec::new(),
        }
    }

    /// Walk all top-level statements.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<()> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::Let(declarators) => {
                for declarator in declarators {
                    // 1. Declare the name (marked but not yet defined)
                    self.declare(&declarator.name);

                    // 2. Resolve the initializer, if any
                    if let Some(expr) = &declarator.initializer {
                        self.resolve_expr(expr)?;
                    }

                    // 3. Define the name so it's readable in this scope
                    self.define(&declarator.name);
                }
            }

            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s)?;
                }

                self.end_scope();
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;

                self.resolve_stmt(then_branch)?;

                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;

                self.resolve_stmt(body)?;
            }

            Stmt::Function(declaration) => {
                // The name is defined immediately in the enclosing scope,
                // which is what permits recursive self-reference.
                self.define(&declaration.name);

                self.resolve_function(declaration)?;
            }

            Stmt::Return { value, .. } => {
                // Whether a 'return' has a frame to unwind to is only known
                // at evaluation time.
                if let Some(expr) = value {
                    self.resolve_expr(expr)?;
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                // 1. The superclass name is resolved in the scope outside
                //    the class's own name
                if let Some(expr) = superclass {
                    self.resolve_expr(expr)?;
                }

                // 2. Define the class name in the enclosing scope
                self.define(name);

                // 3. Open the implicit `this` scope for methods
                self.begin_scope();

                self.scopes
                    .last_mut()
                    .expect("scope just pushed")
                    .insert("this".to_string(), true);

                // 4. Resolve each method like a function body
                for method in methods {
                    self.resolve_function(method)?;
                }

                // 5. Close the `this` scope
                self.end_scope();
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal { id, token } => {
                if token.token_type == TokenType::IDENTIFIER {
                    self.resolve_identifier(*id, token)?;
                }
            }

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { operand, .. } => {
                self.resolve_expr(operand)?;
            }

            Expr::Binary { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_expr(then_branch)?;
                self.resolve_expr(else_branch)?;
            }

            Expr::Assign { target, value } => {
                // The target first: an identifier binds like a read, a
                // property target only resolves its object.
                match target.as_ref() {
                    Expr::Literal { id, token }
                        if token.token_type == TokenType::IDENTIFIER =>
                    {
                        self.resolve_identifier(*id, token)?;
                    }

                    Expr::Get { object, .. } => {
                        self.resolve_expr(object)?;
                    }

                    other => {
                        self.resolve_expr(other)?;
                    }
                }

                self.resolve_expr(value)?;
            }

            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee)?;

                for arg in args {
                    self.resolve_expr(arg)?;
                }
            }

            Expr::Get { object, .. } => {
                self.resolve_expr(object)?;
            }

            Expr::New { call, .. } => {
                self.resolve_expr(call)?;
            }

            Expr::This { id, keyword } => {
                // Bind 'this' like a local variable.
                debug!("Resolving 'this' at {}:{}", keyword.row, keyword.col);

                self.resolve_local(*id, "this");
            }

            Expr::Super { id, keyword, .. } => {
                // 'super' dispatch starts from the enclosing 'this'; the
                // evaluator walks to the superclass from there.
                debug!("Resolving 'super' at {}:{}", keyword.row, keyword.col);

                self.resolve_local(*id, "this");
            }
        }

        Ok(())
    }

    /// Identifier read or assignment target: reject a read inside the name's
    /// own initializer, then bind the occurrence at its lexical depth.
    fn resolve_identifier(&mut self, id: NodeId, token: &Token) -> Result<()> {
        if let Some(scope) = self.scopes.last() {
            if scope.get(&token.lexeme) == Some(&false) {
                return Err(LarkError::syntax(
                    token.row,
                    token.col,
                    "cannot use same variable for initialization",
                ));
            }
        }

        self.resolve_local(id, &token.lexeme);

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    ///
    /// Body statements resolve in the parameter scope; no extra block scope
    /// is layered around a body, matching the evaluator's call frames.
    fn resolve_function(&mut self, declaration: &FunctionDecl) -> Result<()> {
        self.begin_scope();

        for param in &declaration.params {
            self.define(param);
        }

        for stmt in &declaration.body {
            self.resolve_stmt(stmt)?;
        }

        self.end_scope();

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Mark the name as declared but not yet defined.  A no-op at top level;
    /// duplicate declarations are left for the runtime to reject.
    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), false);
        }
    }

    /// Mark the name as fully defined in the current scope.
    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as either a local at some hop count, or a
    /// global if no scope defines the name.
    fn resolve_local(&mut self, id: NodeId, name: &str) {
        // Search each scope from innermost outward; only fully defined
        // entries count.
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.get(name) == Some(&true) {
                debug!("Resolved '{}' at depth {}", name, depth);

                self.interpreter.note_local(id, depth);

                return;
            }
        }

        debug!("Resolved '{}' as global", name);
    }
}
