#[cfg(test)]
mod error_tests {
    use std::io;

    use lox_interpreter as lox;

    use lox::error::{line_col, LoxError};
    use lox::Interpreter;
    use pretty_assertions::assert_eq;

    fn run_err(source: &str) -> LoxError {
        let mut interpreter = Interpreter::with_output(io::sink());
        lox::run_source(&mut interpreter, source).unwrap_err()
    }

    #[test]
    fn test_kinds_and_display() {
        let lex = run_err("print @;");
        assert_eq!(lex.kind(), "LexError");
        assert_eq!(lex.to_string(), "LexError: Unknown character found: '@'");

        let parse = run_err("print +;");
        assert_eq!(parse.kind(), "ParseError");
        assert_eq!(parse.to_string(), "ParseError: Unexpected token: '+'");

        let resolve = run_err("{ var a; var a; }");
        assert_eq!(resolve.kind(), "ParseError");

        let runtime = run_err("print nil();");
        assert_eq!(runtime.kind(), "InterpreterError");
        assert_eq!(
            runtime.to_string(),
            "InterpreterError: 'nil' object is not callable"
        );
    }

    #[test]
    fn test_internal_error_has_no_index() {
        let err = LoxError::Internal {
            message: "maximum recursion depth exceeded".to_string(),
            trace: vec!["<function 'f'>".to_string()],
        };

        assert_eq!(err.index(), None);
        assert_eq!(err.kind(), "InternalError");
        assert_eq!(err.to_string(), "Internal Error: maximum recursion depth exceeded");
    }

    #[test]
    fn test_run_source_reports_first_syntax_error_and_runs_nothing() {
        let err = run_err("print 1 +; print );");

        assert_eq!(err.message(), "Unexpected token: ';'");
        assert_eq!(err.index(), Some(9));
    }

    #[test]
    fn test_line_col() {
        let source = "var a = 1;\nprint a +\n  nope;";

        assert_eq!(line_col(source, 0), (1, 0, "var a = 1;"));
        assert_eq!(line_col(source, 17), (2, 6, "print a +"));
        assert_eq!(line_col(source, 23), (3, 2, "  nope;"));

        // Past the end points just after the last character.
        assert_eq!(line_col(source, 1000), (3, 7, "  nope;"));
    }

    #[test]
    fn test_runtime_error_index_maps_to_source() {
        let source = "var a = 1;\nprint a +\n  nope;";
        let err = run_err(source);
        let (line, col, text) = line_col(source, err.index().unwrap());

        assert_eq!(err.message(), "Undefined variable 'nope'");
        assert_eq!((line, col, text), (3, 2, "  nope;"));
    }

    #[test]
    fn test_line_col_clamps_to_char_boundary() {
        let source = "é = 1;";

        assert_eq!(line_col(source, 1), (1, 0, "é = 1;"));
    }
}
