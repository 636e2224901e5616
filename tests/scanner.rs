#[cfg(test)]
mod scanner_tests {
    use lox::scanner::Scanner;
    use lox::token::{Token, TokenType};

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes().to_vec());
        let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

        assert_eq!(
            tokens.len(),
            expected.len(),
            "token count mismatch for {:?}",
            source
        );

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_ternary_and_caret_symbols() {
        assert_token_sequence(
            "? : ^ ;",
            &[
                (TokenType::QUESTION, "?"),
                (TokenType::COLON, ":"),
                (TokenType::CARET, "^"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_operators() {
        assert_token_sequence(
            "! != = == < <= > >= / -",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::MINUS, "-"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_keywords() {
        assert_token_sequence(
            "and break class echo else false fn for if let nil or return super this true while",
            &[
                (TokenType::AND, "and"),
                (TokenType::BREAK, "break"),
                (TokenType::CLASS, "class"),
                (TokenType::ECHO, "echo"),
                (TokenType::ELSE, "else"),
                (TokenType::FALSE, "false"),
                (TokenType::FN, "fn"),
                (TokenType::FOR, "for"),
                (TokenType::IF, "if"),
                (TokenType::LET, "let"),
                (TokenType::NIL, "nil"),
                (TokenType::OR, "or"),
                (TokenType::RETURN, "return"),
                (TokenType::SUPER, "super"),
                (TokenType::THIS, "this"),
                (TokenType::TRUE, "true"),
                (TokenType::WHILE, "while"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_identifiers_with_extended_start_chars() {
        assert_token_sequence(
            "_under $dollar @at #hash mixed_1$@#",
            &[
                (TokenType::IDENTIFIER, "_under"),
                (TokenType::IDENTIFIER, "$dollar"),
                (TokenType::IDENTIFIER, "@at"),
                (TokenType::IDENTIFIER, "#hash"),
                (TokenType::IDENTIFIER, "mixed_1$@#"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_06_numbers() {
        let scanner = Scanner::new(b"123 45.67 7.".to_vec());
        let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 5);

        match tokens[0].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 123.0),
            _ => panic!("expected number, got {:?}", tokens[0].token_type),
        }

        match tokens[1].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 45.67),
            _ => panic!("expected number, got {:?}", tokens[1].token_type),
        }

        // A trailing dot is not part of the literal.
        match tokens[2].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 7.0),
            _ => panic!("expected number, got {:?}", tokens[2].token_type),
        }

        assert_eq!(tokens[3].token_type, TokenType::DOT);
        assert_eq!(tokens[4].token_type, TokenType::EOF);
    }

    #[test]
    fn test_scanner_07_double_and_single_quoted_strings() {
        let scanner = Scanner::new(br#""hello" 'world' "it's""#.to_vec());
        let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 4);

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hello"),
            other => panic!("expected string, got {:?}", other),
        }

        match &tokens[1].token_type {
            TokenType::STRING(s) => assert_eq!(s, "world"),
            other => panic!("expected string, got {:?}", other),
        }

        // A single quote inside a double-quoted string is plain text.
        match &tokens[2].token_type {
            TokenType::STRING(s) => assert_eq!(s, "it's"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_scanner_08_multiline_string_counts_lines() {
        let scanner = Scanner::new(b"\"a\nb\" x".to_vec());
        let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 3);

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "a\nb"),
            other => panic!("expected string, got {:?}", other),
        }

        // The token ends on line 2, as does everything after it.
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_scanner_09_no_escape_sequences() {
        let scanner = Scanner::new(br#""a\nb""#.to_vec());
        let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, r"a\nb"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_scanner_10_columns_measure_token_end() {
        let scanner = Scanner::new(b"let x = 10;".to_vec());
        let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

        let columns: Vec<usize> = tokens.iter().map(|t| t.column).collect();

        // let=3, x=5, ==7, 10=10, ;=11, EOF=11
        assert_eq!(columns, vec![3, 5, 7, 10, 11, 11]);
    }

    #[test]
    fn test_scanner_11_columns_reset_after_newline() {
        let scanner = Scanner::new(b"a\nbb;".to_vec());
        let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[0].column, 1);

        assert_eq!(tokens[1].lexeme, "bb");
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 2);

        assert_eq!(tokens[2].lexeme, ";");
        assert_eq!(tokens[2].column, 3);
    }

    #[test]
    fn test_scanner_12_comments_are_skipped() {
        assert_token_sequence(
            "a // the rest is noise ,.%\nb",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_13_unexpected_chars_still_produce_surrounding_tokens() {
        let source = ",.%(&";
        let scanner = Scanner::new(source.as_bytes().to_vec());

        let results: Vec<_> = scanner.collect();

        // COMMA, DOT, error for '%', LEFT_PAREN, error for '&', EOF.
        assert_eq!(results.len(), 6, "expected 6 items in result");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "expected 2 error items");

        let tokens: Vec<Token> = results.into_iter().filter_map(Result::ok).collect();

        assert_eq!(tokens[0].token_type, TokenType::COMMA);
        assert_eq!(tokens[1].token_type, TokenType::DOT);
        assert_eq!(tokens[2].token_type, TokenType::LEFT_PAREN);
        assert_eq!(tokens[3].token_type, TokenType::EOF);
    }

    #[test]
    fn test_scanner_14_unterminated_string_errors_and_reaches_eof() {
        let scanner = Scanner::new(b"\"oops".to_vec());
        let results: Vec<_> = scanner.collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());

        match &results[1] {
            Ok(token) => assert_eq!(token.token_type, TokenType::EOF),
            Err(e) => panic!("expected EOF after error, got {}", e),
        }
    }

    #[test]
    fn test_scanner_15_mismatched_delimiters_do_not_close() {
        // A double quote inside a single-quoted string is plain text.
        let scanner = Scanner::new(b"'say \"hi\"'".to_vec());
        let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 2);

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "say \"hi\""),
            other => panic!("expected string, got {:?}", other),
        }
    }
}
