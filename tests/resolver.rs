#[cfg(test)]
mod resolver_tests {
    use std::io;

    use lox_interpreter as lox;

    use lox::error::LoxError;
    use lox::{Interpreter, ParseMode, Program};
    use pretty_assertions::assert_eq;

    fn program(source: &str) -> Program {
        let tokens = lox::lex(source).expect("source should lex");
        let (program, errors) = lox::parse(tokens, ParseMode::File).unwrap();
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);

        program
    }

    fn interpreter() -> Interpreter {
        Interpreter::with_output(io::sink())
    }

    fn resolve_err(source: &str) -> LoxError {
        lox::resolve(&mut interpreter(), &program(source)).unwrap_err()
    }

    fn sorted_depths(interpreter: &Interpreter) -> Vec<usize> {
        let mut depths: Vec<usize> = interpreter.locals().values().copied().collect();
        depths.sort_unstable();
        depths
    }

    #[test]
    fn test_resolution_is_a_pure_function_of_the_tree() {
        let program = program(
            "var g = 0;
             fun outer(a) {
               var b = a;
               fun inner() { return a + b + g; }
               { var c = inner(); print c; }
               return inner;
             }
             class A { m() { return this; } }
             class B < A { m() { return super.m(); } }",
        );

        let mut first = interpreter();
        let mut second = interpreter();
        lox::resolve(&mut first, &program).unwrap();
        lox::resolve(&mut second, &program).unwrap();

        assert!(!first.locals().is_empty());
        assert_eq!(first.locals(), second.locals());
    }

    #[test]
    fn test_locals_and_globals() {
        let program = program(
            "var g = 1;
             {
               var a = 1;
               fun f(x) { return x + a + g; }
             }",
        );
        let mut interp = interpreter();
        lox::resolve(&mut interp, &program).unwrap();

        // `x` is in f's own frame, `a` one frame out, `g` is global.
        assert_eq!(sorted_depths(&interp), vec![0, 1]);
    }

    #[test]
    fn test_method_scopes_line_up_with_runtime_frames() {
        let program = program(
            "class A {}
             class B < A { m() { this; super.m; } }",
        );
        let mut interp = interpreter();
        lox::resolve(&mut interp, &program).unwrap();

        // Inside the method body: `this` is one frame out, `super` two.
        assert_eq!(sorted_depths(&interp), vec![1, 2]);
    }

    #[test]
    fn test_initializer_sees_enclosing_binding() {
        let program = program("{ var a = 1; { var a = a + 1; } }");
        let mut interp = interpreter();

        lox::resolve(&mut interp, &program).unwrap();
        assert_eq!(sorted_depths(&interp), vec![1]);
    }

    #[test]
    fn test_local_redeclaration_is_rejected() {
        let err = resolve_err("{ var a = 1; var a = 2; }");

        assert!(matches!(err, LoxError::Parse { index: 17, .. }));
        assert_eq!(err.message(), "Variable 'a' already defined in this scope");

        let err = resolve_err("fun f(a, a) {}");
        assert_eq!(err.message(), "Variable 'a' already defined in this scope");
    }

    #[test]
    fn test_global_redeclaration_is_allowed() {
        let mut interp = interpreter();

        assert!(lox::resolve(&mut interp, &program("var a = 1; var a = 2;")).is_ok());
    }

    #[test]
    fn test_return_placement() {
        let err = resolve_err("return 1;");
        assert_eq!(err.message(), "Cannot return outside of a function");
        assert_eq!(err.kind(), "ParseError");

        let mut interp = interpreter();
        let nested = program("fun f(n) { if (n) { while (true) { return n; } } }");
        assert!(lox::resolve(&mut interp, &nested).is_ok());
    }

    #[test]
    fn test_this_and_super_placement() {
        assert_eq!(
            resolve_err("print this;").message(),
            "Cannot use 'this' outside of a class"
        );
        assert_eq!(
            resolve_err("fun f() { return super.x; }").message(),
            "Cannot use 'super' outside of a class"
        );
        assert_eq!(
            resolve_err("class A { m() { return super.m(); } }").message(),
            "Cannot use 'super' in a class with no superclass"
        );
    }

    #[test]
    fn test_self_inheritance() {
        let err = resolve_err("class C < C {}");

        assert_eq!(err.message(), "A class cannot inherit from itself");
        assert_eq!(err.index(), Some(10));
    }
}
