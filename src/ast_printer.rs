//! Prefix (S-expression) dump of the syntax tree, behind the REPL's `.expr`
//! toggle.

use crate::ast::{Expr, FunctionDecl, Stmt};
use crate::token::TokenType;

pub struct Ast;

impl Ast {
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(token) => match &token.token_type {
                TokenType::NUMBER(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }

                TokenType::STRING(s) => s.to_string(),

                TokenType::TRUE => "true".to_string(),

                TokenType::FALSE => "false".to_string(),

                TokenType::NIL => "nil".to_string(),

                _ => unreachable!("Invalid literal"),
            },

            Expr::Grouping(inner) => format!("(group {})", self.print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, self.print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                self.print(left),
                self.print(right)
            ),

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => format!(
                "(?: {} {} {})",
                self.print(condition),
                self.print(then_branch),
                self.print(else_branch)
            ),

            Expr::Variable { name, .. } => name.lexeme.to_string(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, self.print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut out: String = format!("(call {}", self.print(callee));

                for argument in arguments {
                    out.push(' ');
                    out.push_str(&self.print(argument));
                }

                out.push(')');

                out
            }

            Expr::Get { object, name } => {
                format!("(get {} {})", self.print(object), name.lexeme)
            }

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(set {} {} {})",
                self.print(object),
                name.lexeme,
                self.print(value)
            ),

            Expr::This { .. } => "this".to_string(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            Expr::Function(decl) => self.print_function("fn", decl),
        }
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(expr {})", self.print(expr)),

            Stmt::Echo(expr) => format!("(echo {})", self.print(expr)),

            Stmt::Let { name, initializer } => match initializer {
                Some(init) => format!("(let {} {})", name.lexeme, self.print(init)),

                None => format!("(let {})", name.lexeme),
            },

            Stmt::Block(statements) => {
                let mut out: String = "(block".to_string();

                for statement in statements {
                    out.push(' ');
                    out.push_str(&self.print_stmt(statement));
                }

                out.push(')');

                out
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(eb) => format!(
                    "(if {} {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(eb)
                ),

                None => format!(
                    "(if {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                self.print(condition),
                self.print_stmt(body)
            ),

            Stmt::Break(_) => "(break)".to_string(),

            Stmt::Return { value, .. } => match value {
                Some(expr) => format!("(return {})", self.print(expr)),

                None => "(return)".to_string(),
            },

            Stmt::Function { name, decl } => {
                self.print_function(&format!("fn {}", name.lexeme), decl)
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut out: String = format!("(class {}", name.lexeme);

                if let Some(Expr::Variable {
                    name: super_name, ..
                }) = superclass
                {
                    out.push_str(&format!(" (< {})", super_name.lexeme));
                }

                for (m_name, decl) in methods {
                    out.push(' ');
                    out.push_str(&self.print_function(&m_name.lexeme, decl));
                }

                out.push(')');

                out
            }
        }
    }

    fn print_function(&self, head: &str, decl: &FunctionDecl) -> String {
        let mut out: String = format!("({} (", head);

        for (i, param) in decl.params.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }

            out.push_str(&param.lexeme);
        }

        out.push(')');

        for stmt in &decl.body {
            out.push(' ');
            out.push_str(&self.print_stmt(stmt));
        }

        out.push(')');

        out
    }
}
