//! Compiler output: query text plus parameter bindings.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Parameter values referenced as `$name` in the query text.
///
/// Names derive from column names: dots become underscores, anything else
/// outside `[A-Za-z0-9_]` is replaced, and a name already taken gets a
/// numeric suffix (`status`, `status_1`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Bindings {
    values: BTreeMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameter name a column maps to before collision handling.
    pub fn param_name(hint: &str) -> String {
        let mut name: String = hint
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if name.is_empty() {
            name.push_str("param");
        } else if name.starts_with(|c: char| c.is_ascii_digit()) {
            name.insert_str(0, "p_");
        }
        name
    }

    /// Bind a value and return the parameter name it was stored under.
    pub fn bind(&mut self, hint: &str, value: Value) -> String {
        let base = Self::param_name(hint);
        let mut name = base.clone();
        let mut suffix = 1;
        while self.values.contains_key(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        self.values.insert(name.clone(), value);
        name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.values
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A compiled query. Immutable once returned; executors only read it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    cypher: String,
    bindings: Bindings,
}

impl CompiledQuery {
    pub(crate) fn new(cypher: String, bindings: Bindings) -> Self {
        Self { cypher, bindings }
    }

    /// Wrap hand-written text, e.g. schema statements.
    pub fn raw(cypher: impl Into<String>) -> Self {
        Self::new(cypher.into(), Bindings::new())
    }

    pub fn cypher(&self) -> &str {
        &self.cypher
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn into_parts(self) -> (String, Bindings) {
        (self.cypher, self.bindings)
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cypher)
    }
}
