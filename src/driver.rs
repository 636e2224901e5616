//! Session driver: one `Lox` owns the interpreter, the diagnostics sink, and
//! the expression-id counter, and feeds source units through
//! scan → parse → resolve → interpret with the stage gates between them.
//!
//! The same `Lox` value serves a whole REPL session, so globals, resolved
//! references, and definitions survive between inputs.

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::rc::Rc;

use log::info;

use crate::ast::{ExprId, Stmt};
use crate::ast_printer::Ast;
use crate::diagnostics::Diagnostics;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

pub struct Lox<W: Write> {
    interpreter: Interpreter<W>,
    diagnostics: Rc<RefCell<Diagnostics>>,
    ids: Rc<Cell<ExprId>>,

    /// REPL `.ast` toggle: debug-dump parsed statements.
    pub show_ast: bool,

    /// REPL `.expr` toggle: S-expression dump of parsed statements.
    pub show_sexpr: bool,
}

impl<W: Write> Lox<W> {
    pub fn new(output: W) -> Self {
        let diagnostics: Rc<RefCell<Diagnostics>> = Rc::new(RefCell::new(Diagnostics::new()));

        Lox {
            interpreter: Interpreter::new(output, Rc::clone(&diagnostics)),
            diagnostics,
            ids: Rc::new(Cell::new(0)),
            show_ast: false,
            show_sexpr: false,
        }
    }

    /// Run one source unit. `repl` turns on expression-statement display.
    ///
    /// Stage gates: the parser always runs over whatever tokens the scanner
    /// produced, but resolution requires an error-free parse and
    /// interpretation an error-free resolve.
    pub fn run(&mut self, source: Vec<u8>, repl: bool) {
        info!("Running {} byte(s), repl={}", source.len(), repl);

        let scanner: Scanner = Scanner::new(source);
        let mut tokens: Vec<Token> = Vec::new();

        for result in scanner {
            match result {
                Ok(token) => tokens.push(token),

                Err(error) => self.diagnostics.borrow_mut().report(&error),
            }
        }

        let mut parser: Parser =
            Parser::new(tokens, Rc::clone(&self.ids), Rc::clone(&self.diagnostics));

        let statements: Vec<Stmt> = parser.parse();

        if self.diagnostics.borrow().had_error {
            return;
        }

        if self.show_ast {
            println!("{:#?}", statements);
        }

        if self.show_sexpr {
            let printer: Ast = Ast;

            for statement in &statements {
                println!("{}", printer.print_stmt(statement));
            }
        }

        let mut resolver: Resolver<'_, W> =
            Resolver::new(&mut self.interpreter, Rc::clone(&self.diagnostics));

        resolver.resolve(&statements);

        if self.diagnostics.borrow().had_error {
            return;
        }

        self.interpreter.interpret(&statements, repl);
    }

    pub fn had_error(&self) -> bool {
        self.diagnostics.borrow().had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.diagnostics.borrow().had_runtime_error
    }

    /// End-of-turn reset for the REPL; runtime errors stay sticky.
    pub fn reset_error(&mut self) {
        self.diagnostics.borrow_mut().reset();
    }

    /// REPL `.env`: debug-dump the current scope chain.
    pub fn dump_environment(&self) {
        println!("{:#?}", self.interpreter.environment());
    }
}
