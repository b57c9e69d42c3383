#[cfg(test)]
mod parser_tests {
    use lox_interpreter as lox;

    use lox::ast::StmtKind;
    use lox::ast_printer::AstPrinter;
    use lox::error::LoxError;
    use lox::{ParseMode, Program};
    use pretty_assertions::assert_eq;

    fn parse_file(source: &str) -> (Program, Vec<LoxError>) {
        let tokens = lox::lex(source).expect("source should lex");
        lox::parse(tokens, ParseMode::File).expect("file mode never fails outright")
    }

    fn parse_repl(source: &str) -> Result<Program, LoxError> {
        let tokens = lox::lex_interactive(source)?;
        lox::parse(tokens, ParseMode::Repl).map(|(program, _)| program)
    }

    fn printed(source: &str) -> String {
        let (program, errors) = parse_file(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

        AstPrinter.print_program(&program)
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(printed("1 + 2 * 3;"), "(; (+ 1.0 (* 2.0 3.0)))");
        assert_eq!(printed("1 - 2 - 3;"), "(; (- (- 1.0 2.0) 3.0))");
        assert_eq!(printed("-a % 4 < 2 == !b;"), "(; (== (< (% (- a) 4.0) 2.0) (! b)))");
        assert_eq!(printed("a or b and c;"), "(; (or a (and b c)))");
        assert_eq!(printed("(1 + 2) / 3;"), "(; (/ (group (+ 1.0 2.0)) 3.0))");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(printed("a = b = 3;"), "(; (= a (= b 3.0)))");
        assert_eq!(printed("a.b.c = 1;"), "(; (.= (. a b) c 1.0))");
    }

    #[test]
    fn test_invalid_assign_target() {
        let (_, errors) = parse_file("1 = 2;");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message(), "Invalid assign target");
        assert_eq!(errors[0].index(), Some(2));
    }

    #[test]
    fn test_statements() {
        assert_eq!(
            printed("var x = \"hi\"; print x; { var y; }"),
            "(var x \"hi\")\n(print x)\n(block (var y))"
        );
        assert_eq!(
            printed("if (a) print 1; else print 2; while (b) f(1, 2);"),
            "(if a (print 1.0) (print 2.0))\n(while b (; (call f 1.0 2.0)))"
        );
    }

    #[test]
    fn test_for_is_kept_as_its_own_node() {
        let (program, _) = parse_file("for (var i = 0; i < 3; i = i + 1) print i;");

        assert!(matches!(program[0].kind, StmtKind::For { .. }));
        assert_eq!(
            AstPrinter.print_program(&program),
            "(for (var i 0.0) (< i 3.0) (= i (+ i 1.0)) (print i))"
        );
        assert_eq!(printed("for (;;) {}"), "(for _ _ _ (block))");
    }

    #[test]
    fn test_functions_and_classes() {
        assert_eq!(
            printed("fun add(a, b) { return a + b; }"),
            "(fun add (a b) (return (+ a b)))"
        );
        assert_eq!(
            printed("class B < A { m(x) { return super.m(x); } init() { this.v = 1; } }"),
            "(class B < A (m (x) (return (call (super m) x))) (init () (; (.= this v 1.0))))"
        );
    }

    #[test]
    fn test_self_inheritance_is_left_to_the_resolver() {
        let (program, errors) = parse_file("class C < C {}");

        assert!(errors.is_empty());
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn test_file_mode_collects_every_error() {
        let (program, errors) = parse_file("print 1 +; var x = ; print 2;");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message(), "Unexpected token: ';'");
        assert_eq!(errors[0].index(), Some(9));
        assert_eq!(errors[1].message(), "Unexpected token: ';'");

        // The statement after both errors still parses.
        assert_eq!(AstPrinter.print_program(&program), "(print 2.0)");
    }

    #[test]
    fn test_error_inside_body_does_not_leak_its_brace() {
        let (program, errors) = parse_file("fun f() { var = 1; print 3; }\nprint 1 +;\nprint 2;");

        let messages: Vec<String> = errors.iter().map(|e| e.message()).collect();
        assert_eq!(messages, vec!["Expected variable name", "Unexpected token: ';'"]);

        // The body keeps the statement after its error.
        assert_eq!(
            AstPrinter.print_program(&program),
            "(fun f () (print 3.0))\n(print 2.0)"
        );
    }

    #[test]
    fn test_error_in_nested_block_keeps_outer_block_open() {
        let (program, errors) = parse_file("{ { var = 1; } print 2; } { print 1 + } print 3;");

        let messages: Vec<String> = errors.iter().map(|e| e.message()).collect();
        assert_eq!(messages, vec!["Expected variable name", "Unexpected token: '}'"]);
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn test_file_mode_end_of_input() {
        let (_, errors) = parse_file("print 1");

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], LoxError::Parse { .. }));
        assert_eq!(errors[0].message(), "Expected ';' after value");
    }

    #[test]
    fn test_repl_mode_flags_unexpected_eof() {
        let err = parse_repl("print 1").unwrap_err();
        assert!(matches!(err, LoxError::UnexpectedEof { .. }));
        assert!(err.is_incomplete());

        let err = parse_repl("fun f() {").unwrap_err();
        assert!(err.is_incomplete());

        let err = parse_repl("print 1 +").unwrap_err();
        assert_eq!(err.message(), "Unexpected end of file");
        assert!(err.is_incomplete());
    }

    #[test]
    fn test_repl_mode_stops_at_first_syntax_error() {
        let err = parse_repl("print ); print );").unwrap_err();

        assert!(matches!(err, LoxError::Parse { index: 6, .. }));
        assert!(!err.is_incomplete());
        assert_eq!(err.message(), "Unexpected token: ')'");
    }

    #[test]
    fn test_arity_limits() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let (_, errors) = parse_file(&format!("fun f({}) {{}}", params.join(", ")));
        assert_eq!(errors[0].message(), "Cannot have more than 255 parameters");

        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let (_, errors) = parse_file(&format!("f({});", args.join(", ")));
        assert_eq!(errors[0].message(), "Cannot have more than 255 arguments");

        let params: Vec<String> = (0..255).map(|i| format!("p{}", i)).collect();
        let (_, errors) = parse_file(&format!("fun f({}) {{}}", params.join(", ")));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_nodes_carry_source_offsets() {
        let (program, _) = parse_file("var a = 1;\nprint a + 2;");

        assert_eq!(program[0].index, 0);
        assert_eq!(program[1].index, 11);

        let StmtKind::Print(expr) = &program[1].kind else {
            panic!("expected a print statement");
        };
        assert_eq!(expr.index, 17);
    }

    #[test]
    fn test_ast_serializes_to_json() {
        let (program, _) = parse_file("print 1;");
        let json = serde_json::to_value(&program).unwrap();

        assert_eq!(json[0]["kind"]["Print"]["kind"]["Literal"]["Number"], 1.0);
        assert_eq!(json[0]["index"], 0);
    }
}
