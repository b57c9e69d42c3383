#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Cursor, Write};
    use std::rc::Rc;

    use lox_interpreter as lox;

    use lox::error::LoxError;
    use lox::interpreter::MAX_CALL_DEPTH;
    use lox::Interpreter;
    use pretty_assertions::assert_eq;

    /// `Write` sink shared between the test and the interpreter.
    #[derive(Clone, Default)]
    struct Output(Rc<RefCell<Vec<u8>>>);

    impl Output {
        fn take(&self) -> String {
            String::from_utf8(self.0.borrow_mut().drain(..).collect()).unwrap()
        }
    }

    impl Write for Output {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// One interpreter session; every `run` shares globals and the depth table.
    struct Session {
        interpreter: Interpreter,
        output: Output,
    }

    impl Session {
        fn new() -> Self {
            let output = Output::default();

            Self {
                interpreter: Interpreter::with_output(output.clone()),
                output,
            }
        }

        fn run(&mut self, source: &str) -> Result<String, LoxError> {
            let result = lox::run_source(&mut self.interpreter, source);
            let printed = self.output.take();

            result.map(|()| printed)
        }
    }

    fn run(source: &str) -> String {
        Session::new()
            .run(source)
            .unwrap_or_else(|e| panic!("program failed: {}", e))
    }

    fn run_err(source: &str) -> LoxError {
        Session::new()
            .run(source)
            .expect_err("program should fail")
    }

    #[test]
    fn test_block_shadowing() {
        assert_eq!(
            run("{ var x = 1; { var x = 2; print x; } print x; }"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_counter_closures_are_independent() {
        let out = run("fun counter() {
                         var n = 0;
                         fun inc() { n = n + 1; return n; }
                         return inc;
                       }
                       var a = counter();
                       var b = counter();
                       print a(); print a(); print b(); print a();");

        assert_eq!(out, "1\n2\n1\n3\n");
    }

    #[test]
    fn test_closure_binds_at_definition_site() {
        let out = run("var a = \"global\";
                       {
                         fun show() { print a; }
                         show();
                         var a = \"block\";
                         show();
                       }");

        assert_eq!(out, "global\nglobal\n");
    }

    #[test]
    fn test_short_circuit() {
        assert_eq!(run("print false and (1/0);"), "false\n");
        assert_eq!(run("print true or (1/0);"), "true\n");
        assert_eq!(run("print nil or \"x\";"), "x\n");
        assert_eq!(run("print 1 and 2;"), "2\n");
    }

    #[test]
    fn test_truthiness_and_equality() {
        assert_eq!(
            run("if (0) print \"zero\"; if (\"\") print \"empty\"; if (nil) print \"nil\";"),
            "zero\nempty\n"
        );
        assert_eq!(
            run("print 1 == \"1\"; print nil == nil; print \"a\" == \"a\"; print nil != false;"),
            "false\ntrue\ntrue\ntrue\n"
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("print 1 + 2 * 3; print 10 / 4; print \"a\" + \"b\";"), "7\n2.5\nab\n");
        assert_eq!(run("print -7 % 3; print 7 % -3; print 7.5 % 2;"), "2\n-2\n1.5\n");
        assert_eq!(run("print -(2 - 5); print !nil;"), "3\ntrue\n");
    }

    #[test]
    fn test_division_by_zero() {
        let err = run_err("print 1 / 0;");
        assert!(matches!(err, LoxError::Runtime { index: 10, .. }));
        assert_eq!(err.to_string(), "InterpreterError: Division by zero");

        assert_eq!(run_err("print 1 % (2 - 2);").message(), "Division by zero");
    }

    #[test]
    fn test_type_errors_name_both_operands() {
        assert_eq!(
            run_err("print 2 > \"3\";").message(),
            "Unsupported types for '>': 'Number' and 'String'"
        );
        assert_eq!(
            run_err("print \"a\" + 1;").message(),
            "Unsupported types for '+': 'String' and 'Number'"
        );
        assert_eq!(
            run_err("print -\"a\";").message(),
            "Expected 'Number' for unary '-', got 'String'"
        );
    }

    #[test]
    fn test_arity_mismatch() {
        let err = run_err("fun f(a) { return a; } f();");

        assert!(err.message().contains("expected 1 arguments, got 0"));
        assert_eq!(err.message(), "<function 'f'> expected 1 arguments, got 0");
    }

    #[test]
    fn test_arguments_run_before_callability_check() {
        let mut session = Session::new();
        let err = session
            .run("var trail = \"\";
                  fun side() { trail = trail + \"s\"; return 1; }
                  var n = nil;
                  n(side(), side());")
            .unwrap_err();

        assert_eq!(err.message(), "'nil' object is not callable");
        assert_eq!(session.run("print trail;").unwrap(), "ss\n");
    }

    #[test]
    fn test_variable_errors() {
        assert_eq!(run_err("print nope;").message(), "Undefined variable 'nope'");
        assert_eq!(
            run_err("nope = 1;").message(),
            "Assigning to variable 'nope' before declaration"
        );
    }

    #[test]
    fn test_control_flow() {
        assert_eq!(
            run("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
        assert_eq!(
            run("var i = 3; while (i > 0) { print i; i = i - 1; }"),
            "3\n2\n1\n"
        );
        assert_eq!(
            run("fun first() {
                   for (var i = 0; ; i = i + 1) {
                     while (true) { if (i == 4) return i; i = i + 1; }
                   }
                 }
                 print first();"),
            "4\n"
        );
    }

    #[test]
    fn test_recursion() {
        assert_eq!(
            run("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
                 print fib(15);"),
            "610\n"
        );
    }

    #[test]
    fn test_return_without_value_and_falling_off() {
        assert_eq!(
            run("fun a() { return; } fun b() {} print a(); print b();"),
            "nil\nnil\n"
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(
            run("fun f() {} class C {} print f; print C; print C(); print clock;"),
            "<function 'f'>\n<class 'C'>\n<object of 'C'>\n<native function 'clock'>\n"
        );
        assert_eq!(run("print clock() > 0;"), "true\n");
    }

    #[test]
    fn test_inherited_method() {
        assert_eq!(
            run("class A { foo() { return \"A\"; } } class B < A {} print B().foo();"),
            "A\n"
        );
    }

    #[test]
    fn test_super_dispatch_binds_current_instance() {
        let out = run("class A {
                         foo() { return \"A\"; }
                         name() { return this.n; }
                       }
                       class B < A {
                         foo() { return \"B\" + super.foo(); }
                         name() { return \"b:\" + super.name(); }
                       }
                       class C < B {}
                       var c = C();
                       c.n = \"x\";
                       print c.foo();
                       print c.name();");

        assert_eq!(out, "BA\nb:x\n");
    }

    #[test]
    fn test_super_method_reaches_past_direct_superclass() {
        let out = run("class A { hi() { return \"hi from A\"; } }
                       class B < A {}
                       class C < B { hi() { return super.hi(); } }
                       print C().hi();");

        assert_eq!(out, "hi from A\n");
    }

    #[test]
    fn test_initializer_and_fields() {
        let out = run("class P {
                         init(x) { this.x = x; }
                         get() { return this.x; }
                       }
                       class Q < P {}
                       var p = P(3);
                       print p.x;
                       p.x = 5;
                       p.extra = \"open\";
                       print p.get();
                       print p.extra;
                       var q = Q();
                       q.x = 4;
                       print q.get();");

        assert_eq!(out, "3\n5\nopen\n4\n");

        assert_eq!(
            run_err("class P { init(x) {} } P();").message(),
            "<class 'P'> expected 1 arguments, got 0"
        );
    }

    #[test]
    fn test_subclass_without_init_takes_no_arguments() {
        let out = run("class A { init(x) { print \"A.init\"; } }
                       class B < A {}
                       class C < A { init() { super.init(1); } }
                       print B();
                       print C();");

        assert_eq!(out, "<object of 'B'>\nA.init\n<object of 'C'>\n");

        assert_eq!(
            run_err("class A { init(x) {} } class B < A {} B(1);").message(),
            "<class 'B'> expected 0 arguments, got 1"
        );
    }

    #[test]
    fn test_bound_methods_keep_this() {
        let out = run("class C {
                         init() { this.v = 1; }
                         getter() { fun inner() { return this.v; } return inner; }
                         m() { return this.v; }
                       }
                       var c = C();
                       var m = c.m;
                       c.v = 2;
                       print m();
                       print c.getter()();");

        assert_eq!(out, "2\n2\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        assert_eq!(
            run("class C { m() { return 1; } } var c = C(); c.m = 2; print c.m;"),
            "2\n"
        );
    }

    #[test]
    fn test_property_errors() {
        assert_eq!(
            run_err("fun f() {} print f.x;").message(),
            "Cannot access properties inside 'Function'"
        );
        assert_eq!(
            run_err("class C {} C.x = 1;").message(),
            "Cannot set properties on 'Class'"
        );
        assert_eq!(
            run_err("class C {} print C().x;").message(),
            "'C' object has no attribute 'x'"
        );
        assert_eq!(
            run_err("var B = true; class C < B {}").message(),
            "Can only inherit from classes, found 'Boolean'"
        );
    }

    #[test]
    fn test_runtime_error_leaves_session_usable() {
        let mut session = Session::new();

        let err = session
            .run("var before = 1; { var x = 1; print missing; }")
            .unwrap_err();
        assert_eq!(err.message(), "Undefined variable 'missing'");

        assert_eq!(session.run("print before;").unwrap(), "1\n");
        assert_eq!(
            session.run("print x;").unwrap_err().message(),
            "Undefined variable 'x'"
        );

        let err = session.run("fun f() { return 1 / 0; } f();").unwrap_err();
        assert_eq!(err.message(), "Division by zero");
        assert_eq!(session.run("var y = 2; print y;").unwrap(), "2\n");
    }

    #[test]
    fn test_closures_survive_across_runs() {
        let mut session = Session::new();

        session
            .run("fun make() { var n = 10; fun get() { n = n + 1; return n; } return get; }
                  var g = make();")
            .unwrap();

        assert_eq!(session.run("print g();").unwrap(), "11\n");
        assert_eq!(session.run("{ var n = 0; print g(); }").unwrap(), "12\n");
    }

    #[test]
    fn test_input_native() {
        let output = Output::default();
        let mut interpreter =
            Interpreter::with_io(Cursor::new("Ada\r\n".as_bytes().to_vec()), output.clone());

        lox::run_source(
            &mut interpreter,
            "var name = input(\"name? \"); print \"hi \" + name; print input(\"\");",
        )
        .unwrap();

        assert_eq!(output.take(), "name? hi Ada\nnil\n");
    }

    #[test]
    fn test_dir_native() {
        let out = run("class A { foo() {} }
                       class B < A { bar() {} foo() {} }
                       var b = B();
                       print dir;
                       print dir(b);
                       b.baz = 1;
                       b.bruh = 2;
                       print dir(b);
                       print dir(A);");

        assert_eq!(
            out,
            "<native function 'dir'>\n['bar', 'foo']\n['bar', 'baz', 'bruh', 'foo']\n['foo']\n"
        );

        assert_eq!(
            run_err("dir(1);").message(),
            "dir() expects an instance or a class, got 'Number'"
        );
    }

    #[test]
    fn test_deep_recursion_on_the_test_thread() {
        // One call short of the limit: r(0) through r(998).
        let out = run("fun r(n) { if (n >= 998) return n; return r(n + 1); } print r(0);");

        assert_eq!(out, "998\n");
    }

    #[test]
    fn test_unbounded_recursion_is_an_internal_error() {
        let mut session = Session::new();
        let err = session.run("fun r(n) { return r(n + 1); } r(0);").unwrap_err();

        match err {
            LoxError::Internal { message, trace } => {
                assert_eq!(message, "maximum recursion depth exceeded");
                assert_eq!(trace.len(), MAX_CALL_DEPTH);
                assert_eq!(trace[0], "<function 'r'>");
            }
            other => panic!("expected an internal error, got {:?}", other),
        }

        // The session is still usable afterwards.
        assert_eq!(session.run("print 1;").unwrap(), "1\n");
    }

    #[test]
    fn test_deeply_nested_source() {
        let source = format!("print {}1{};", "(".repeat(5000), ")".repeat(5000));

        assert_eq!(run(&source), "1\n");
    }
}
