use std::collections::BTreeSet;

/// Deterministic source of fresh variable names.
///
/// One generator is created per synthesized operation and threaded through
/// every synthesis call, so two runs over the same operation produce the
/// same names and no process-wide counter exists.
#[derive(Clone, Debug, Default)]
pub struct NameGenerator {
    counter: u64,
    used: BTreeSet<String>,
}

impl NameGenerator {
    pub fn new() -> Self {
        NameGenerator::default()
    }

    /// Mark a name as taken without generating anything. Parameters and
    /// locals of the enclosing operation are reserved up front.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// A name based on `stem`, unused so far. The stem itself is preferred;
    /// collisions append a numeric suffix.
    pub fn fresh(&mut self, stem: &str) -> String {
        if !self.used.contains(stem) {
            self.used.insert(stem.to_string());
            return stem.to_string();
        }
        loop {
            self.counter += 1;
            let candidate = format!("{}_{}", stem, self.counter);
            if !self.used.contains(&candidate) {
                self.used.insert(candidate.clone());
                return candidate;
            }
        }
    }
}
