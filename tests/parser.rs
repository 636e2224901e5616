#[cfg(test)]
mod parser_tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use lox::ast::Stmt;
    use lox::ast_printer::Ast;
    use lox::diagnostics::Diagnostics;
    use lox::parser::Parser;
    use lox::scanner::Scanner;
    use lox::token::Token;

    fn parse_source(source: &str) -> (Vec<Stmt>, bool) {
        let diagnostics = Rc::new(RefCell::new(Diagnostics::new()));

        let scanner = Scanner::new(source.as_bytes().to_vec());
        let mut tokens: Vec<Token> = Vec::new();

        for result in scanner {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => diagnostics.borrow_mut().report(&error),
            }
        }

        let mut parser = Parser::new(tokens, Rc::new(Cell::new(0)), Rc::clone(&diagnostics));
        let statements = parser.parse();
        let had_error = diagnostics.borrow().had_error;

        (statements, had_error)
    }

    fn first_sexpr(source: &str) -> String {
        let (statements, had_error) = parse_source(source);

        assert!(!had_error, "unexpected parse error in {:?}", source);
        assert!(!statements.is_empty(), "no statements parsed from {:?}", source);

        Ast.print_stmt(&statements[0])
    }

    #[test]
    fn test_parser_01_precedence() {
        assert_eq!(first_sexpr("1 + 2 * 3;"), "(expr (+ 1.0 (* 2.0 3.0)))");
        assert_eq!(first_sexpr("(1 + 2) * 3;"), "(expr (* (group (+ 1.0 2.0)) 3.0))");
        assert_eq!(first_sexpr("1 < 2 == true;"), "(expr (== (< 1.0 2.0) true))");
    }

    #[test]
    fn test_parser_02_unary_binds_tighter_than_factor() {
        assert_eq!(first_sexpr("-a * b;"), "(expr (* (- a) b))");
        assert_eq!(first_sexpr("!!ok;"), "(expr (! (! ok)))");
    }

    #[test]
    fn test_parser_03_ternary_is_right_associative() {
        assert_eq!(
            first_sexpr("a ? 1 : b ? 2 : 3;"),
            "(expr (?: a 1.0 (?: b 2.0 3.0)))"
        );
    }

    #[test]
    fn test_parser_04_ternary_sits_between_and_and_equality() {
        assert_eq!(
            first_sexpr("a and b == c ? 1 : 2;"),
            "(expr (and a (?: (== b c) 1.0 2.0)))"
        );
    }

    #[test]
    fn test_parser_05_logical_operators() {
        assert_eq!(first_sexpr("a or b and c;"), "(expr (or a (and b c)))");
    }

    #[test]
    fn test_parser_06_assignment_rewrites() {
        assert_eq!(first_sexpr("a = 1;"), "(expr (= a 1.0))");
        assert_eq!(first_sexpr("a.b = 1;"), "(expr (set a b 1.0))");
        assert_eq!(first_sexpr("a.b.c = 1;"), "(expr (set (get a b) c 1.0))");
    }

    #[test]
    fn test_parser_07_invalid_assignment_target_reports_but_continues() {
        let (statements, had_error) = parse_source("1 = 2;");

        assert!(had_error);

        // The statement survives as the parsed rvalue.
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_parser_08_call_and_property_chains() {
        assert_eq!(first_sexpr("f(1)(2);"), "(expr (call (call f 1.0) 2.0))");
        assert_eq!(
            first_sexpr("a.b(1).c;"),
            "(expr (get (call (get a b) 1.0) c))"
        );
    }

    #[test]
    fn test_parser_09_for_desugars_into_while() {
        assert_eq!(
            first_sexpr("for (let i = 0; i < 3; i = i + 1) echo i;"),
            "(block (let i 0.0) (while (< i 3.0) (block (echo i) (expr (= i (+ i 1.0))))))"
        );
    }

    #[test]
    fn test_parser_10_for_with_empty_clauses() {
        assert_eq!(first_sexpr("for (;;) echo 1;"), "(while true (echo 1.0))");
    }

    #[test]
    fn test_parser_11_fn_declaration_vs_lambda() {
        assert_eq!(
            first_sexpr("fn add(a, b) { return a + b; }"),
            "(fn add (a b) (return (+ a b)))"
        );

        assert_eq!(
            first_sexpr("let id = fn (x) { return x; };"),
            "(let id (fn (x) (return x)))"
        );
    }

    #[test]
    fn test_parser_12_class_with_superclass_and_methods() {
        assert_eq!(
            first_sexpr("class A < B { m() { return 1; } }"),
            "(class A (< B) (m () (return 1.0)))"
        );
    }

    #[test]
    fn test_parser_13_break_and_super() {
        assert_eq!(first_sexpr("while (true) break;"), "(while true (break))");
        assert_eq!(
            first_sexpr("class B < A { m() { return super.m; } }"),
            "(class B (< A) (m () (return (super m))))"
        );
    }

    #[test]
    fn test_parser_14_recovery_resumes_at_statement_boundary() {
        let (statements, had_error) = parse_source("echo (;\necho 1;");

        assert!(had_error);

        // The bad statement is dropped; the next one parses.
        assert_eq!(statements.len(), 1);
        assert_eq!(Ast.print_stmt(&statements[0]), "(echo 1.0)");
    }

    #[test]
    fn test_parser_15_caret_has_no_parse_rule() {
        let (_, had_error) = parse_source("echo 1 ^ 2;");

        assert!(had_error);
    }

    #[test]
    fn test_parser_16_missing_semicolon_is_an_error() {
        let (_, had_error) = parse_source("echo 1");

        assert!(had_error);
    }
}
