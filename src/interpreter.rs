//! Tree-walking evaluator.
//!
//! `execute` returns a [`Signal`] rather than throwing: `while` collapses
//! `Break`, the call boundary collapses `Return`, and anything that escapes
//! to the top of the interpret loop is reported there. Runtime errors travel
//! separately as `LoxError::Runtime` through the ordinary `Result` channel.
//! Every block swap of the environment pointer is restored on every exit
//! path; that invariant is what keeps closures honest.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::diagnostics::Diagnostics;
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use crate::value::{LoxClass, LoxFunction, LoxInstance, Value};

/// How a statement finished.
pub enum Signal {
    Normal,
    Return(Value),
    Break(Token),
}

pub struct Interpreter<W: Write> {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    /// Resolution map: expression identity → scope depth. Absence means the
    /// name is global and late-bound.
    locals: HashMap<ExprId, usize>,
    diagnostics: Rc<RefCell<Diagnostics>>,
    output: W,
}

impl<W: Write> Interpreter<W> {
    pub fn new(output: W, diagnostics: Rc<RefCell<Diagnostics>>) -> Self {
        let globals: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new()));

        {
            let mut env = globals.borrow_mut();

            env.define(
                "clock",
                Value::NativeFunction {
                    name: "clock".to_string(),
                    arity: 0,
                    func: clock_native,
                },
            );

            env.define(
                "len",
                Value::NativeFunction {
                    name: "len".to_string(),
                    arity: 1,
                    func: len_native,
                },
            );

            env.define(
                "type",
                Value::NativeFunction {
                    name: "type".to_string(),
                    arity: 1,
                    func: type_native,
                },
            );

            env.define("PI", Value::Number(std::f64::consts::PI));
        }

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            diagnostics,
            output,
        }
    }

    /// Resolver callback: remember at what depth this occurrence binds.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Current scope, for the REPL `.env` dump.
    pub fn environment(&self) -> Rc<RefCell<Environment>> {
        Rc::clone(&self.environment)
    }

    /// Run a resolved program. Runtime errors abandon the offending
    /// top-level statement and execution moves on to the next one.
    pub fn interpret(&mut self, statements: &[Stmt], repl: bool) {
        info!("Interpreting {} statement(s)", statements.len());

        for statement in statements {
            // REPL turns display top-level expression results.
            if repl {
                if let Stmt::Expression(expr) = statement {
                    match self.evaluate(expr) {
                        Ok(value) => {
                            if let Err(error) = writeln!(self.output, "{}", value) {
                                self.diagnostics.borrow_mut().report(&LoxError::from(error));
                            }
                        }

                        Err(error) => self.diagnostics.borrow_mut().report(&error),
                    }

                    continue;
                }
            }

            match self.execute(statement) {
                Ok(Signal::Normal) => {}

                Ok(Signal::Break(keyword)) => {
                    let error: LoxError = LoxError::runtime(
                        keyword.line,
                        "Break statement used outside of loop.",
                    );

                    self.diagnostics.borrow_mut().report(&error);
                }

                Ok(Signal::Return(_)) => {
                    // The resolver rejects top-level `return`.
                    debug!("return signal escaped the top level");
                }

                Err(error) => self.diagnostics.borrow_mut().report(&error),
            }
        }
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Signal> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Signal::Normal)
            }

            Stmt::Echo(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value)?;

                Ok(Signal::Normal)
            }

            Stmt::Let { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,

                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(Signal::Normal)
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, Rc::new(RefCell::new(environment)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Signal::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    match self.execute(body)? {
                        Signal::Normal => {}

                        Signal::Break(_) => break,

                        signal @ Signal::Return(_) => return Ok(signal),
                    }
                }

                Ok(Signal::Normal)
            }

            Stmt::Break(keyword) => Ok(Signal::Break(keyword.clone())),

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,

                    None => Value::Nil,
                };

                Ok(Signal::Return(value))
            }

            Stmt::Function { name, decl } => {
                let function = LoxFunction {
                    decl: Rc::clone(decl),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                };

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Function(Rc::new(function)));

                Ok(Signal::Normal)
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Run `statements` in `environment`, restoring the previous scope on
    /// every exit path: normal completion, signal, or error.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<Signal> {
        let previous: Rc<RefCell<Environment>> =
            std::mem::replace(&mut self.environment, environment);

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Signal::Normal) => {}

                other => {
                    self.environment = previous;

                    return other;
                }
            }
        }

        self.environment = previous;

        Ok(Signal::Normal)
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[(Token, Rc<FunctionDecl>)],
    ) -> Result<Signal> {
        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    let error_token: &Token = match expr {
                        Expr::Variable {
                            name: super_name, ..
                        } => super_name,

                        _ => name,
                    };

                    return Err(LoxError::runtime(
                        error_token.line,
                        "Superclass must be a class.",
                    ));
                }
            },

            None => None,
        };

        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        // Methods close over the scope where `super` lives, when there is
        // a superclass to dispatch to.
        let method_closure: Rc<RefCell<Environment>> = match &superclass_value {
            Some(class) => {
                let mut environment =
                    Environment::with_enclosing(Rc::clone(&self.environment));

                environment.define("super", Value::Class(Rc::clone(class)));

                Rc::new(RefCell::new(environment))
            }

            None => Rc::clone(&self.environment),
        };

        let mut method_map: HashMap<String, Rc<LoxFunction>> = HashMap::new();

        for (m_name, decl) in methods {
            let function = LoxFunction {
                decl: Rc::clone(decl),
                closure: Rc::clone(&method_closure),
                is_initializer: m_name.lexeme == "init",
            };

            method_map.insert(m_name.lexeme.clone(), Rc::new(function));
        }

        info!(
            "Defined class {} with {} method(s)",
            name.lexeme,
            method_map.len()
        );

        let class = LoxClass {
            name: name.lexeme.clone(),
            superclass: superclass_value,
            methods: method_map,
        };

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))?;

        Ok(Signal::Normal)
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(token) => self.evaluate_literal(token),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Conditional {
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

            Expr::Variable { id, name } => self.lookup_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(distance) => {
                        Environment::assign_at(&self.environment, *distance, name, value.clone());
                    }

                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                // Callee first, then arguments, strictly left to right.
                let callee_value: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());

                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call_value(callee_value, args, paren)
            }

            Expr::Get { object, name } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => instance.get(name),

                    _ => Err(LoxError::runtime(
                        name.line,
                        "Only instances have properties.",
                    )),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value: Value = self.evaluate(value)?;

                        instance.set(name, value.clone());

                        Ok(value)
                    }

                    _ => Err(LoxError::runtime(name.line, "Only instances have fields.")),
                }
            }

            Expr::This { id, keyword } => self.lookup_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::Function(decl) => {
                let function = LoxFunction {
                    decl: Rc::clone(decl),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                };

                Ok(Value::Function(Rc::new(function)))
            }
        }
    }

    fn evaluate_literal(&self, token: &Token) -> Result<Value> {
        match &token.token_type {
            TokenType::NUMBER(n) => Ok(Value::Number(*n)),

            TokenType::STRING(s) => Ok(Value::String(s.clone())),

            TokenType::TRUE => Ok(Value::Bool(true)),

            TokenType::FALSE => Ok(Value::Bool(false)),

            TokenType::NIL => Ok(Value::Nil),

            _ => Err(LoxError::runtime(token.line, "Invalid literal.")),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(operator.line, "Operand must be a number.")),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.")),
        }
    }

    /// `or`/`and` short-circuit and hand back the deciding operand itself,
    /// never a coerced boolean.
    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left_value: Value = self.evaluate(left)?;

        match operator.token_type {
            TokenType::OR => {
                if is_truthy(&left_value) {
                    Ok(left_value)
                } else {
                    self.evaluate(right)
                }
            }

            TokenType::AND => {
                if !is_truthy(&left_value) {
                    Ok(left_value)
                } else {
                    self.evaluate(right)
                }
            }

            _ => Err(LoxError::runtime(operator.line, "Invalid logical operator.")),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left_value: Value = self.evaluate(left)?;
        let right_value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                // One string operand stringifies the other.
                (left_value, right_value)
                    if matches!(left_value, Value::String(_))
                        || matches!(right_value, Value::String(_)) =>
                {
                    Ok(Value::String(format!("{}{}", left_value, right_value)))
                }

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::SLASH => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => {
                    if b == 0.0 {
                        Err(LoxError::runtime(
                            operator.line,
                            "Division by zero is not allowed.",
                        ))
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left_value, &right_value))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left_value, &right_value))),

            TokenType::GREATER => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::GREATER_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::LESS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            TokenType::LESS_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
            },

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.")),
        }
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance: usize = *self
            .locals
            .get(&id)
            .expect("'super' reference left unresolved");

        let superclass: Value = Environment::get_at(&self.environment, distance, "super");
        let instance: Value = Environment::get_at(&self.environment, distance - 1, "this");

        let (Value::Class(superclass), Value::Instance(instance)) = (superclass, instance) else {
            unreachable!("'super' and 'this' bindings hold a class and an instance");
        };

        debug!(
            "Dispatching super.{} on {} (line {})",
            method.lexeme, superclass.name, keyword.line
        );

        match superclass.find_method(&method.lexeme) {
            Some(function) => Ok(Value::Function(Rc::new(function.bind(instance)))),

            None => Err(LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    /// Locals read through the resolution map; everything else falls back to
    /// the late-bound globals.
    fn lookup_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(distance) => Ok(Environment::get_at(
                &self.environment,
                *distance,
                &name.lexeme,
            )),

            None => self.globals.borrow().get(name),
        }
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>, paren: &Token) -> Result<Value> {
        match callee {
            Value::NativeFunction { name, arity, func } => {
                check_arity(arity, args.len(), paren)?;

                debug!("Calling native fn {}", name);

                func(&args).map_err(|message| LoxError::runtime(paren.line, message))
            }

            Value::Function(function) => {
                check_arity(function.arity(), args.len(), paren)?;

                self.call_function(&function, args)
            }

            Value::Class(class) => {
                check_arity(class.arity(), args.len(), paren)?;

                self.instantiate(&class, args)
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }

    pub fn call_function(&mut self, function: &Rc<LoxFunction>, args: Vec<Value>) -> Result<Value> {
        debug!("Calling {:?}", function);

        let mut environment: Environment =
            Environment::with_enclosing(Rc::clone(&function.closure));

        for (param, arg) in function.decl.params.iter().zip(args) {
            environment.define(&param.lexeme, arg);
        }

        let signal: Signal =
            self.execute_block(&function.decl.body, Rc::new(RefCell::new(environment)))?;

        match signal {
            Signal::Return(value) => {
                if function.is_initializer {
                    // `return;` in an initializer still hands back `this`.
                    Ok(Environment::get_at(&function.closure, 0, "this"))
                } else {
                    Ok(value)
                }
            }

            Signal::Normal => {
                if function.is_initializer {
                    Ok(Environment::get_at(&function.closure, 0, "this"))
                } else {
                    Ok(Value::Nil)
                }
            }

            Signal::Break(keyword) => Err(LoxError::runtime(
                keyword.line,
                "Break statement used outside of loop.",
            )),
        }
    }

    fn instantiate(&mut self, class: &Rc<LoxClass>, args: Vec<Value>) -> Result<Value> {
        info!("Instantiating class {}", class.name);

        let instance: Rc<LoxInstance> = Rc::new(LoxInstance::new(Rc::clone(class)));

        if let Some(init) = class.find_method("init") {
            let bound: Rc<LoxFunction> = Rc::new(init.bind(Rc::clone(&instance)));

            self.call_function(&bound, args)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// Only `nil` and `false` are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

/// Structural on primitives, reference identity on everything callable.
fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Nil, Value::Nil) => true,

        (Value::Bool(a), Value::Bool(b)) => a == b,

        (Value::Number(a), Value::Number(b)) => a == b,

        (Value::String(a), Value::String(b)) => a == b,

        (
            Value::NativeFunction { func: a, .. },
            Value::NativeFunction { func: b, .. },
        ) => *a == *b,

        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),

        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),

        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),

        _ => false,
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> Result<()> {
    if expected != got {
        return Err(LoxError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}.", expected, got),
        ));
    }

    Ok(())
}

/// Wall-clock time in milliseconds since the Unix epoch.
fn clock_native(_args: &[Value]) -> std::result::Result<Value, String> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("Clock error: {}", e))?;

    Ok(Value::Number(elapsed.as_millis() as f64))
}

fn len_native(args: &[Value]) -> std::result::Result<Value, String> {
    match args.first() {
        Some(Value::String(s)) => Ok(Value::Number(s.chars().count() as f64)),

        _ => Err("len() expects a string argument.".to_string()),
    }
}

fn type_native(args: &[Value]) -> std::result::Result<Value, String> {
    let tag: &str = match args.first() {
        Some(Value::Nil) => "nil",

        Some(Value::Bool(_)) => "boolean",

        Some(Value::Number(_)) => "number",

        Some(Value::String(_)) => "string",

        Some(Value::NativeFunction { .. }) | Some(Value::Function(_)) => "function",

        Some(Value::Class(_)) => "class",

        Some(Value::Instance(_)) => "object",

        None => return Err("type() expects an argument.".to_string()),
    };

    Ok(Value::String(tag.to_string()))
}
