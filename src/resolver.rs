//! Static resolution pass.
//!
//! A single AST walk that:
//! 1. **Builds lexical scopes**: maintains a stack of maps tracking each
//!    local's lifecycle (declared → defined → read) in every nested block or
//!    function.
//! 2. **Enforces static rules**: redeclaration in the same scope, reading a
//!    variable in its own initializer, `return` outside a function (or with a
//!    value inside `init`), `this`/`super` placement, self-inheritance.
//! 3. **Records binding distances**: for every `Variable`, `Assign`, `This`
//!    and `Super` occurrence, calls back into the interpreter to note at what
//!    depth the name lives, so the runtime climbs exactly the right number of
//!    environment frames. Names found in no scope are left to the global
//!    late-bound lookup.
//! 4. **Warns on dead locals**: popping a scope flags every binding that was
//!    defined but never read. Warnings never fail the program.
//!
//! Unlike the runtime, the resolver does not stop at the first problem: every
//! static error in the program surfaces in one pass through the shared
//! diagnostics sink.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::diagnostics::Diagnostics;
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::token::Token;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ClassType {
    /// Not inside any class
    None,

    /// Inside a class declaration _without_ a superclass
    Class,

    /// Inside a class declaration _with_ a superclass
    Subclass,
}

/// Lifecycle of one local binding.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum VarState {
    Declared,
    Defined,
    Read,
}

#[derive(Debug, Clone)]
struct Local {
    /// Declaration site; warnings anchor here.
    token: Token,
    state: VarState,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances (locals vs. globals) by calling back into the interpreter.
pub struct Resolver<'interp, W: Write> {
    interpreter: &'interp mut Interpreter<W>,
    scopes: Vec<HashMap<String, Local>>,
    current_function: FunctionType,
    current_class: ClassType,
    diagnostics: Rc<RefCell<Diagnostics>>,
}

impl<'interp, W: Write> Resolver<'interp, W> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(
        interpreter: &'interp mut Interpreter<W>,
        diagnostics: Rc<RefCell<Diagnostics>>,
    ) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            diagnostics,
        }
    }

    /// Walk all top‑level statements, reporting every static error found.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                // 1. Declare & define the class name first so methods can
                //    refer to it.
                self.declare(name);
                self.define(name);

                // 2. Self‑inheritance guard.
                if let Some(Expr::Variable {
                    name: super_name, ..
                }) = superclass
                {
                    if super_name.lexeme == name.lexeme {
                        self.error(super_name, "A class cannot inherit from itself.");
                    }
                }

                // 3. Save and enter the class context.
                let enclosing_class: ClassType = self.current_class;

                self.current_class = if superclass.is_some() {
                    ClassType::Subclass
                } else {
                    ClassType::Class
                };

                // 4. If there is a superclass, resolve the reference and open
                //    a scope where `super` lives for every method body.
                if let Some(superclass) = superclass {
                    self.resolve_expr(superclass);

                    self.begin_scope();
                    self.insert_implicit("super", name);
                }

                // 5. Open the implicit `this` scope for methods.
                self.begin_scope();
                self.insert_implicit("this", name);

                // 6. Resolve each method body in its own function context.
                for (m_name, decl) in methods {
                    let kind: FunctionType = if m_name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };

                    self.resolve_function(decl, kind);
                }

                // 7. Close the `this` scope, then `super` if we opened it.
                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                // 8. Restore the outer class context.
                self.current_class = enclosing_class;
            }

            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s);
                }

                self.end_scope();
            }

            Stmt::Let { name, initializer } => {
                // Declared before the initializer runs, defined only after:
                // this window is what makes self-reads detectable.
                self.declare(name);

                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }

                self.define(name);
            }

            Stmt::Function { name, decl } => {
                // Define eagerly to allow recursion.
                self.declare(name);
                self.define(name);

                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Echo(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);

                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            // `break` placement is a runtime concern; nothing to bind here.
            Stmt::Break(_) => {}

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Cannot return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Cannot return a value from an initializer.");
                    }

                    self.resolve_expr(expr);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::Variable { id, name } => {
                // Reading a name whose initializer is still running is the
                // one read that must not bind.
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme).map(|local| local.state)
                        == Some(VarState::Declared)
                    {
                        self.error(
                            name,
                            "Cannot read local variable in its own initializer.",
                        );
                    }
                }

                self.resolve_local(*id, name, true);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);

                // An assignment is not a read: a local that is only ever
                // written still counts as unused.
                self.resolve_local(*id, name, false);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);

                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => {
                self.resolve_expr(object);
            }

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Cannot use 'this' outside of a class.");
                }

                self.resolve_local(*id, keyword, true);
            }

            Expr::Super { id, keyword, .. } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Cannot use 'super' outside of a class.");
                } else if self.current_class != ClassType::Subclass {
                    self.error(keyword, "Cannot use 'super' in a class with no superclass.");
                }

                self.resolve_local(*id, keyword, true);
            }

            Expr::Function(decl) => {
                self.resolve_function(decl, FunctionType::Function);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) {
        let enclosing: FunctionType = self.current_function;

        self.current_function = kind;

        self.begin_scope();

        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }

        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }

        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost scope, warning about every binding that was defined
    /// but never read.
    fn end_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for local in scope.values() {
                if local.state == VarState::Defined {
                    self.diagnostics
                        .borrow_mut()
                        .warn(&local.token, "Local variable is defined but never used.");
                }
            }
        }
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                let error: LoxError = LoxError::resolve(
                    name,
                    "Variable with this name already declared in this scope.",
                );

                self.diagnostics.borrow_mut().report(&error);
            }

            scope.insert(
                name.lexeme.clone(),
                Local {
                    token: name.clone(),
                    state: VarState::Declared,
                },
            );
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(local) = scope.get_mut(&name.lexeme) {
                local.state = VarState::Defined;
            }
        }
    }

    /// Install an implicit binding (`this`/`super`). Born read so it never
    /// trips the unused-local warning.
    fn insert_implicit(&mut self, name: &str, site: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.to_string(),
                Local {
                    token: site.clone(),
                    state: VarState::Read,
                },
            );
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at its lexical depth, or leave it
    /// for the global late-bound lookup when no scope knows the name.
    fn resolve_local(&mut self, id: ExprId, name: &Token, is_read: bool) {
        let innermost: usize = self.scopes.len();

        for (i, scope) in self.scopes.iter_mut().enumerate().rev() {
            if let Some(local) = scope.get_mut(&name.lexeme) {
                if is_read {
                    local.state = VarState::Read;
                }

                let depth: usize = innermost - 1 - i;

                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.interpreter.resolve(id, depth);

                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }

    fn error(&mut self, token: &Token, message: &str) {
        let error: LoxError = LoxError::resolve(token, message);

        self.diagnostics.borrow_mut().report(&error);
    }
}
