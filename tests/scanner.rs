#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;

    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let (tokens, errors) = Scanner::new(source).scan_tokens();

        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        assert_eq!(tokens.len(), expected.len());

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
    fn test_scanner_02_if_condition() {
        assert_token_sequence(
            "if (cond)",
            &[
                (TokenType::IF, "if"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::IDENTIFIER, "cond"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "class orchid fun _x1 nil",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::FUN, "fun"),
                (TokenType::IDENTIFIER, "_x1"),
                (TokenType::NIL, "nil"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_literals() {
        let (tokens, errors) = Scanner::new("\"hi\" 12.5 7").scan_tokens();
        assert!(errors.is_empty());

        assert_eq!(tokens[0].literal, Some(Literal::Str("hi".to_string())));
        assert_eq!(tokens[1].literal, Some(Literal::Number(12.5)));
        assert_eq!(tokens[2].literal, Some(Literal::Number(7.0)));

        assert_eq!(tokens[0].to_string(), "STRING \"hi\" hi");
        assert_eq!(tokens[2].to_string(), "NUMBER 7 7.0");
    }

    #[test]
    fn test_scanner_05_multiline_string_counts_lines() {
        let (tokens, errors) = Scanner::new("\"a\nb\"\nx").scan_tokens();
        assert!(errors.is_empty());

        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_unexpected_char_stops_scanning() {
        let (tokens, errors) = Scanner::new(",.$(#").scan_tokens();

        // Tokens before the error survive; nothing after it is scanned.
        let kinds: Vec<TokenType> = tokens.iter().map(|t| t.token_type).collect();
        assert_eq!(kinds, vec![TokenType::COMMA, TokenType::DOT]);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 1] Error: Unexpected character: $");
    }

    #[test]
    fn test_unterminated_string() {
        let (_, errors) = Scanner::new("print \"open").scan_tokens();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unterminated string.");
    }

    #[test]
    fn test_iterator_is_fused_after_error() {
        let mut scanner = Scanner::new("@ 1");

        assert!(matches!(scanner.next(), Some(Err(_))));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
