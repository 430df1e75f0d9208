//! Compile-time scope table.
//!
//! Scopes are kept as a stack of variable lists. Entering a scope pushes
//! a copy of the current top, leaving pops it. Lookup only ever consults
//! the top of the stack; enclosing names are visible because they were
//! copied in, and shadowing declarations rebind only the copy.
//!
//! A consequence of the snapshot model: a name declared anywhere in an
//! enclosing scope already exists in the copy, so re-declaring it inside
//! an inner scope is a redeclaration error rather than a shadow.

use lngc_util::Position;

/// A variable record in the scope table.
#[derive(Clone, Debug)]
pub struct Variable {
    /// Where the variable was declared.
    pub position: Position,
    /// The variable's name.
    pub name: String,
    /// Whether any expression has read it.
    pub used: bool,
    /// Whether it has been given a value.
    pub initialized: bool,
}

/// The scope stack.
pub struct ScopeStack {
    scopes: Vec<Vec<Variable>>,
}

impl ScopeStack {
    /// Create a stack holding the (empty) global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Vec::new()],
        }
    }

    /// Enter a scope: push a copy of the current top.
    pub fn enter(&mut self) {
        let snapshot = self.top().to_vec();
        self.scopes.push(snapshot);
    }

    /// Leave the current scope.
    pub fn exit(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Declare a variable in the current scope.
    pub fn declare(&mut self, variable: Variable) {
        self.top_mut().push(variable);
    }

    /// Whether `name` exists in the current scope (including the names
    /// copied in from enclosing scopes).
    pub fn contains(&self, name: &str) -> bool {
        self.top().iter().any(|v| v.name == name)
    }

    /// Mutable access to `name` in the current scope.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.top_mut().iter_mut().find(|v| v.name == name)
    }

    fn top(&self) -> &[Variable] {
        self.scopes.last().map(Vec::as_slice).unwrap_or(&[])
    }

    fn top_mut(&mut self) -> &mut Vec<Variable> {
        if self.scopes.is_empty() {
            self.scopes.push(Vec::new());
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
