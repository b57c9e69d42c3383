use crate::ast::{Expr, ExprKind, FunctionDecl, LiteralValue, Stmt, StmtKind};

/// Renders the AST as parenthesised prefix notation, e.g. `(+ 1 (* 2 3))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Binary {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                self.print(left),
                self.print(right)
            ),

            ExprKind::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, self.print(right))
            }

            ExprKind::Literal(value) => match value {
                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }

                LiteralValue::Str(s) => format!("{:?}", s),

                LiteralValue::Bool(b) => b.to_string(),

                LiteralValue::Nil => "nil".to_string(),
            },

            ExprKind::Grouping(inner) => format!("(group {})", self.print(inner)),

            ExprKind::Variable { name } => name.lexeme.clone(),

            ExprKind::Assign { name, value } => {
                format!("(= {} {})", name.lexeme, self.print(value))
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                let mut out = format!("(call {}", self.print(callee));
                for arg in arguments {
                    out.push(' ');
                    out.push_str(&self.print(arg));
                }
                out.push(')');
                out
            }

            ExprKind::Get { object, name } => {
                format!("(. {} {})", self.print(object), name.lexeme)
            }

            ExprKind::Set {
                object,
                name,
                value,
            } => format!(
                "(.= {} {} {})",
                self.print(object),
                name.lexeme,
                self.print(value)
            ),

            ExprKind::This { .. } => "this".to_string(),

            ExprKind::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match &stmt.kind {
            StmtKind::ExprStmt(expr) => format!("(; {})", self.print(expr)),

            StmtKind::Print(expr) => format!("(print {})", self.print(expr)),

            StmtKind::VarDecl { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, self.print(init)),
                None => format!("(var {})", name.lexeme),
            },

            StmtKind::Block(body) => format!("(block{})", self.print_body(body)),

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch)
                ),
            },

            StmtKind::While { condition, body } => {
                format!("(while {} {})", self.print(condition), self.print_stmt(body))
            }

            StmtKind::For {
                initializer,
                condition,
                increment,
                body,
            } => format!(
                "(for {} {} {} {})",
                initializer
                    .as_deref()
                    .map_or_else(|| "_".to_string(), |s| self.print_stmt(s)),
                condition
                    .as_ref()
                    .map_or_else(|| "_".to_string(), |c| self.print(c)),
                increment
                    .as_ref()
                    .map_or_else(|| "_".to_string(), |i| self.print(i)),
                self.print_stmt(body)
            ),

            StmtKind::Return { value, .. } => match value {
                Some(value) => format!("(return {})", self.print(value)),
                None => "(return)".to_string(),
            },

            StmtKind::FunctionDef(decl) => format!("(fun {})", self.print_function(decl)),

            StmtKind::ClassDef {
                name,
                superclass,
                methods,
            } => {
                let mut out = format!("(class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    out.push_str(&format!(" < {}", self.print(superclass)));
                }
                for method in methods {
                    out.push_str(&format!(" ({})", self.print_function(method)));
                }
                out.push(')');
                out
            }
        }
    }

    /// One line per top‑level statement.
    pub fn print_program(&self, program: &[Stmt]) -> String {
        program
            .iter()
            .map(|stmt| self.print_stmt(stmt))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn print_function(&self, decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();

        format!(
            "{} ({}){}",
            decl.name.lexeme,
            params.join(" "),
            self.print_body(&decl.body)
        )
    }

    fn print_body(&self, body: &[Stmt]) -> String {
        body.iter()
            .map(|stmt| format!(" {}", self.print_stmt(stmt)))
            .collect()
    }
}
