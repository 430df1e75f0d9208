//! lngc-sem - Semantic analysis for the lng language.
//!
//! A single walk over the AST that validates scoping, callability, and
//! arity, and checks that an entry point exists. The analyzer maintains:
//!
//! - a scope stack for variables (snapshot model, see [`scope`]);
//! - a flat function table, filled as `fn` declarations are met;
//! - a list of call sites, re-checked after the walk so calls may
//!   reference functions declared later in the file.
//!
//! All checks are fatal except the used-but-not-initialized warning,
//! which goes through the diagnostic handler and lets compilation
//! continue.

pub mod scope;

pub use scope::{ScopeStack, Variable};

use indexmap::IndexMap;
use thiserror::Error;

use lngc_bc::built_in;
use lngc_par::{Ast, Node, NodeKind};
use lngc_util::{Diagnostic, Handler, Position};

/// Semantic errors. All are fatal.
#[derive(Debug, Error)]
pub enum SemError {
    /// Use of a name that is neither a variable in scope nor a function.
    #[error("{name} is undefined")]
    Undefined {
        /// The unknown name.
        name: String,
        /// Where it was used.
        position: Position,
    },

    /// `let` of a name that already exists in the current scope.
    #[error("redeclaration of {name}")]
    Redeclaration {
        /// The re-declared name.
        name: String,
        /// Where the second declaration is.
        position: Position,
    },

    /// Calling a name that resolves to a variable.
    #[error("variable {name} is not callable")]
    NotCallable {
        /// The variable's name.
        name: String,
        /// Where the call is.
        position: Position,
    },

    /// A call with the wrong number of arguments.
    #[error("function {name} expected {expected} argument(s), but {got} are given")]
    WrongArity {
        /// The callee.
        name: String,
        /// Declared parameter count.
        expected: usize,
        /// Arguments at the call site.
        got: usize,
        /// Where the call is.
        position: Position,
    },

    /// No function named `main` exists.
    #[error("no entry point")]
    NoEntryPoint,
}

impl SemError {
    /// The source position the error points at, when it has one.
    pub fn position(&self) -> Option<&Position> {
        match self {
            SemError::Undefined { position, .. }
            | SemError::Redeclaration { position, .. }
            | SemError::NotCallable { position, .. }
            | SemError::WrongArity { position, .. } => Some(position),
            SemError::NoEntryPoint => None,
        }
    }
}

/// A user function's signature, as collected during the walk.
#[derive(Clone, Debug)]
pub struct FunctionInfo {
    /// Where the function is declared.
    pub position: Position,
    /// Parameter names in declaration order.
    pub params: Vec<String>,
}

/// A deferred call site, checked after the whole program is known.
struct CallSite {
    position: Position,
    name: String,
    argc: usize,
}

/// The semantic analyzer.
pub struct SemanticAnalyzer<'a> {
    handler: &'a Handler,
    scopes: ScopeStack,
    functions: IndexMap<String, FunctionInfo>,
    calls: Vec<CallSite>,
}

impl<'a> SemanticAnalyzer<'a> {
    /// Create an analyzer reporting warnings through `handler`.
    pub fn new(handler: &'a Handler) -> Self {
        Self {
            handler,
            scopes: ScopeStack::new(),
            functions: IndexMap::new(),
            calls: Vec::new(),
        }
    }

    /// Validate the program.
    ///
    /// On success, returns the collected function table (the code
    /// generator does not need it, but the driver exposes it for
    /// tooling).
    pub fn analyze(mut self, ast: &Ast) -> Result<IndexMap<String, FunctionInfo>, SemError> {
        for node in ast {
            self.node(node)?;
        }

        // Calls were collected during the walk so that a function may be
        // used before its declaration; resolve them now.
        for call in &self.calls {
            let Some(function) = self.functions.get(&call.name) else {
                return Err(SemError::Undefined {
                    name: call.name.clone(),
                    position: call.position.clone(),
                });
            };
            if function.params.len() != call.argc {
                return Err(SemError::WrongArity {
                    name: call.name.clone(),
                    expected: function.params.len(),
                    got: call.argc,
                    position: call.position.clone(),
                });
            }
        }

        if !self.functions.contains_key("main") {
            return Err(SemError::NoEntryPoint);
        }

        Ok(self.functions)
    }

    fn node(&mut self, node: &Node) -> Result<(), SemError> {
        match &node.kind {
            NodeKind::Int(_) | NodeKind::Float(_) | NodeKind::Str(_) | NodeKind::Nil => Ok(()),

            NodeKind::Unary { operand, .. } => self.node(operand),

            NodeKind::Binary { left, right, .. } => {
                self.node(left)?;
                self.node(right)
            },

            NodeKind::Let { name, value } => {
                if let Some(value) = value {
                    self.node(value)?;
                }
                if self.scopes.contains(name) {
                    return Err(SemError::Redeclaration {
                        name: name.clone(),
                        position: node.position.clone(),
                    });
                }
                self.scopes.declare(Variable {
                    position: node.position.clone(),
                    name: name.clone(),
                    used: false,
                    initialized: value.is_some(),
                });
                Ok(())
            },

            NodeKind::Assign { name, value } => {
                self.node(value)?;
                match self.scopes.get_mut(name) {
                    Some(variable) => {
                        variable.initialized = true;
                        Ok(())
                    },
                    None => Err(SemError::Undefined {
                        name: name.clone(),
                        position: node.position.clone(),
                    }),
                }
            },

            NodeKind::Identifier(name) => {
                let Some(variable) = self.scopes.get_mut(name) else {
                    return Err(SemError::Undefined {
                        name: name.clone(),
                        position: node.position.clone(),
                    });
                };
                if !variable.initialized {
                    let warning = Diagnostic::warning(
                        format!("variable {} was used but not initialized", name),
                        Some(node.position.clone()),
                    );
                    self.handler.emit(warning);
                }
                variable.used = true;
                Ok(())
            },

            NodeKind::Block(statements) => {
                self.scopes.enter();
                for statement in statements {
                    self.node(statement)?;
                }
                self.scopes.exit();
                Ok(())
            },

            NodeKind::Fn { name, params, body } => {
                // Registered before the body so recursion resolves.
                self.functions.insert(
                    name.clone(),
                    FunctionInfo {
                        position: node.position.clone(),
                        params: params.iter().map(|p| p.name.clone()).collect(),
                    },
                );

                self.scopes.enter();
                for param in params {
                    self.scopes.declare(Variable {
                        position: param.position.clone(),
                        name: param.name.clone(),
                        used: false,
                        initialized: true,
                    });
                }
                self.node(body)?;
                self.scopes.exit();
                Ok(())
            },

            NodeKind::If {
                condition,
                then_body,
                else_body,
            } => {
                self.node(condition)?;
                self.node(then_body)?;
                if let Some(else_body) = else_body {
                    self.node(else_body)?;
                }
                Ok(())
            },

            NodeKind::While { condition, body } | NodeKind::DoWhile { condition, body } => {
                self.node(condition)?;
                self.node(body)
            },

            NodeKind::Return(value) => self.node(value),

            NodeKind::Call { name, args } => {
                for arg in args {
                    self.node(arg)?;
                }

                if let Some(built_in) = built_in(name) {
                    if args.len() != built_in.arity {
                        return Err(SemError::WrongArity {
                            name: name.clone(),
                            expected: built_in.arity,
                            got: args.len(),
                            position: node.position.clone(),
                        });
                    }
                    return Ok(());
                }

                if !self.functions.contains_key(name) && self.scopes.contains(name) {
                    return Err(SemError::NotCallable {
                        name: name.clone(),
                        position: node.position.clone(),
                    });
                }

                self.calls.push(CallSite {
                    position: node.position.clone(),
                    name: name.clone(),
                    argc: args.len(),
                });
                Ok(())
            },

            NodeKind::List(values) => {
                for value in values {
                    self.node(value)?;
                }
                Ok(())
            },

            NodeKind::ListAccess { list, index } => {
                self.node(list)?;
                self.node(index)
            },
        }
    }
}
