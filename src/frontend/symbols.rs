pub type VarId = usize;

#[derive(Clone, Debug)]
struct Symbol {
    name: String,
    id: VarId,
}

/// Why a declaration was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlreadyDeclared {
    pub existing: VarId,
}

/// Lexically scoped name table.
///
/// Bindings live in one vector, innermost last. Entering a block records the
/// current length; leaving it truncates back, dropping everything declared
/// inside. Ids come from a counter that only grows, so an id is never handed
/// out twice within one table.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    scopes: Vec<usize>,
    next_id: VarId,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(self.symbols.len());
    }

    /// Returns the names that went out of scope, innermost last.
    pub fn exit_scope(&mut self) -> Vec<String> {
        let mark = self.scopes.pop().unwrap_or(0);
        self.symbols
            .drain(mark..)
            .map(|sym| sym.name)
            .collect()
    }

    /// Register `name` with a fresh id. Any visible binding of the same name,
    /// including ones from enclosing blocks, makes this fail.
    pub fn declare(&mut self, name: &str) -> Result<VarId, AlreadyDeclared> {
        if let Some(existing) = self.lookup(name) {
            return Err(AlreadyDeclared { existing });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.symbols.push(Symbol {
            name: name.to_string(),
            id,
        });
        Ok(id)
    }

    /// Innermost visible binding for `name`.
    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.symbols
            .iter()
            .rev()
            .find(|sym| sym.name == name)
            .map(|sym| sym.id)
    }

    pub fn visible_names(&self) -> impl Iterator<Item = String> + '_ {
        self.symbols.iter().rev().map(|sym| sym.name.clone())
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{AlreadyDeclared, SymbolTable};

    #[test]
    fn declare_then_lookup() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        let a = table.declare("A").expect("declare A");
        let b = table.declare("B").expect("declare B");
        assert_eq!(table.lookup("A"), Some(a));
        assert_eq!(table.lookup("B"), Some(b));
        assert_eq!(table.lookup("C"), None);
        assert!(b > a);
    }

    #[test]
    fn redeclaration_in_nested_scope_is_rejected() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        let a = table.declare("A").expect("declare A");
        table.enter_scope();
        assert_eq!(table.declare("A"), Err(AlreadyDeclared { existing: a }));
        table.enter_scope();
        assert_eq!(table.declare("A"), Err(AlreadyDeclared { existing: a }));
    }

    #[test]
    fn exiting_scope_drops_inner_names_and_ids_stay_fresh() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        table.declare("outer").expect("outer");
        table.enter_scope();
        let first = table.declare("X").expect("X in first block");
        table.enter_scope();
        table.declare("Y").expect("Y nested");
        let dropped = table.exit_scope();
        assert_eq!(dropped, vec!["Y".to_string()]);
        let dropped = table.exit_scope();
        assert_eq!(dropped, vec!["X".to_string()]);
        assert_eq!(table.lookup("X"), None);
        assert_eq!(table.lookup("Y"), None);
        assert_eq!(table.lookup("outer"), Some(0));

        table.enter_scope();
        let second = table.declare("X").expect("X in sibling block");
        assert!(second > first, "ids must never be reused");
        assert_eq!(table.depth(), 2);
    }

    #[test]
    fn ids_strictly_increase_across_many_scopes() {
        let mut table = SymbolTable::new();
        let mut last = None;
        for round in 0..10 {
            table.enter_scope();
            let id = table.declare(&format!("v{}", round % 3)).expect("fresh");
            if let Some(prev) = last {
                assert!(id > prev);
            }
            last = Some(id);
            table.exit_scope();
        }
    }
}
