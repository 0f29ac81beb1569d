use std::collections::HashSet;

use arcstr::ArcStr;

/// Hands out unique cell names for one synthesis session.
///
/// Output formats identify cells by name, so two different cells must never
/// share one. The registry is owned by the session's [`crate::PdkLib`],
/// not kept in global state.
#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
    used: HashSet<ArcStr>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `base` if it is free; otherwise the first free `{base}_{n}`, `n >= 1`.
    pub fn unique(&mut self, base: &str) -> ArcStr {
        let mut name = ArcStr::from(base);
        let mut n = 0;
        while self.used.contains(&name) {
            n += 1;
            name = arcstr::format!("{base}_{n}");
        }
        self.used.insert(name.clone());
        name
    }

    /// Claims `name` exactly. Returns false if it was already taken.
    pub fn reserve(&mut self, name: impl Into<ArcStr>) -> bool {
        self.used.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }
}
