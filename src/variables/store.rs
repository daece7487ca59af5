//! Variable scopes (global, environment, local) and the store that owns them

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single key/value entry in a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub secret: bool,
}

fn default_enabled() -> bool {
    true
}

impl Variable {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            enabled: true,
            description: None,
            secret: false,
        }
    }

    /// Create a disabled entry (stored, but invisible to resolution)
    pub fn disabled(key: &str, value: &str) -> Self {
        Self {
            enabled: false,
            ..Self::new(key, value)
        }
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

/// Which scope a variable lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableScope {
    Local,
    Environment,
    Global,
}

/// A named set of variables that can be activated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<Variable>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Environment {
    pub fn new(name: &str) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            variables: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outcome of writing a value into a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Added,
    Updated,
    Unchanged,
}

impl Change {
    pub fn is_change(self) -> bool {
        self != Change::Unchanged
    }
}

/// Owner of all variable scopes for a session.
///
/// Loaded and flushed by the persistence layer; the local scope and the
/// version counter are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableStore {
    #[serde(default)]
    globals: Vec<Variable>,
    #[serde(default)]
    environments: Vec<Environment>,
    #[serde(default)]
    active_environment: Option<String>,
    #[serde(skip)]
    locals: Vec<Variable>,
    #[serde(skip)]
    version: u64,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incremented on every mutation that changes stored data
    pub fn version(&self) -> u64 {
        self.version
    }

    fn bump(&mut self) {
        self.version += 1;
    }

    // ------------------------------------------------------------------
    // Environments
    // ------------------------------------------------------------------

    /// Create an environment and return its id
    pub fn create_environment(&mut self, name: &str) -> String {
        let env = Environment::new(name);
        let id = env.id.clone();
        self.environments.push(env);
        self.bump();
        id
    }

    /// Add a fully formed environment, replacing one with the same id
    pub fn import_environment(&mut self, env: Environment) {
        match self.environments.iter_mut().find(|e| e.id == env.id) {
            Some(existing) => *existing = env,
            None => self.environments.push(env),
        }
        self.bump();
    }

    pub fn remove_environment(&mut self, id: &str) -> bool {
        let before = self.environments.len();
        self.environments.retain(|e| e.id != id);
        if self.environments.len() == before {
            return false;
        }
        if self.active_environment.as_deref() == Some(id) {
            self.active_environment = None;
        }
        self.bump();
        true
    }

    /// Activate an environment by id (`None` deactivates). Returns false for unknown ids.
    pub fn set_active_environment(&mut self, id: Option<&str>) -> bool {
        if let Some(id) = id {
            if !self.environments.iter().any(|e| e.id == id) {
                return false;
            }
        }
        let next = id.map(str::to_string);
        if self.active_environment != next {
            self.active_environment = next;
            self.bump();
        }
        true
    }

    pub fn active_environment(&self) -> Option<&Environment> {
        let id = self.active_environment.as_deref()?;
        self.environments.iter().find(|e| e.id == id)
    }

    fn active_environment_mut(&mut self) -> Option<&mut Environment> {
        let id = self.active_environment.clone()?;
        self.environments.iter_mut().find(|e| e.id == id)
    }

    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    pub fn environment(&self, id: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.id == id)
    }

    // ------------------------------------------------------------------
    // Scoped access
    // ------------------------------------------------------------------

    /// All entries of a scope, including disabled ones.
    /// The environment scope is empty when no environment is active.
    pub fn variables(&self, scope: VariableScope) -> &[Variable] {
        match scope {
            VariableScope::Local => &self.locals,
            VariableScope::Global => &self.globals,
            VariableScope::Environment => self
                .active_environment()
                .map(|e| e.variables.as_slice())
                .unwrap_or(&[]),
        }
    }

    /// Mutable entries of a scope. Environment writes fall back to the
    /// local scope when no environment is active.
    fn variables_mut(&mut self, scope: VariableScope) -> &mut Vec<Variable> {
        match scope {
            VariableScope::Global => &mut self.globals,
            VariableScope::Local => &mut self.locals,
            VariableScope::Environment => {
                let index = self
                    .active_environment
                    .as_deref()
                    .and_then(|id| self.environments.iter().position(|e| e.id == id));
                match index {
                    Some(i) => &mut self.environments[i].variables,
                    None => {
                        tracing::debug!("No active environment, writing to local scope");
                        &mut self.locals
                    }
                }
            }
        }
    }

    fn touch(&mut self, scope: VariableScope) {
        if scope == VariableScope::Environment {
            if let Some(env) = self.active_environment_mut() {
                env.updated_at = Utc::now().timestamp_millis();
            }
        }
        self.bump();
    }

    /// Value of an enabled variable in one scope
    pub fn get(&self, scope: VariableScope, key: &str) -> Option<&str> {
        self.variables(scope)
            .iter()
            .find(|v| v.enabled && v.key == key)
            .map(|v| v.value.as_str())
    }

    /// Write a value: update the first entry with `key` in place (re-enabling it)
    /// or append a new enabled entry.
    pub fn set(&mut self, scope: VariableScope, key: &str, value: &str) -> Change {
        let vars = self.variables_mut(scope);
        let change = match vars.iter_mut().find(|v| v.key == key) {
            Some(existing) if existing.value == value && existing.enabled => Change::Unchanged,
            Some(existing) => {
                existing.value = value.to_string();
                existing.enabled = true;
                Change::Updated
            }
            None => {
                vars.push(Variable::new(key, value));
                Change::Added
            }
        };
        if change.is_change() {
            self.touch(scope);
        }
        change
    }

    /// Soft-delete: keep the entries but hide them from resolution
    pub fn disable(&mut self, scope: VariableScope, key: &str) -> bool {
        let mut changed = false;
        for var in self.variables_mut(scope).iter_mut().filter(|v| v.key == key && v.enabled) {
            var.enabled = false;
            changed = true;
        }
        if changed {
            self.touch(scope);
        }
        changed
    }

    /// Hard-delete every entry with `key`
    pub fn remove(&mut self, scope: VariableScope, key: &str) -> bool {
        let vars = self.variables_mut(scope);
        let before = vars.len();
        vars.retain(|v| v.key != key);
        let changed = vars.len() != before;
        if changed {
            self.touch(scope);
        }
        changed
    }

    /// Append entries as given (no de-duplication), like a bulk import
    pub fn import_variables<I>(&mut self, scope: VariableScope, variables: I)
    where
        I: IntoIterator<Item = Variable>,
    {
        let vars = self.variables_mut(scope);
        let before = vars.len();
        vars.extend(variables);
        if vars.len() != before {
            self.touch(scope);
        }
    }

    /// Enabled entries of a scope as an ordered map (first entry wins per key)
    pub fn enabled_map(&self, scope: VariableScope) -> IndexMap<String, String> {
        let mut map = IndexMap::new();
        for var in self.variables(scope).iter().filter(|v| v.enabled) {
            map.entry(var.key.clone()).or_insert_with(|| var.value.clone());
        }
        map
    }

    pub fn clear_locals(&mut self) {
        if !self.locals.is_empty() {
            self.locals.clear();
            self.bump();
        }
    }

    /// Resolution view over the current scopes
    pub fn scope_chain(&self) -> ScopeChain<'_> {
        ScopeChain {
            local: self.variables(VariableScope::Local),
            environment: self.variables(VariableScope::Environment),
            global: self.variables(VariableScope::Global),
        }
    }
}

/// Ordered precedence view: local, then environment, then global
#[derive(Debug, Clone, Copy)]
pub struct ScopeChain<'a> {
    pub local: &'a [Variable],
    pub environment: &'a [Variable],
    pub global: &'a [Variable],
}

impl<'a> ScopeChain<'a> {
    /// First enabled value for `key` along the chain
    pub fn get(&self, key: &str) -> Option<&'a str> {
        [self.local, self.environment, self.global]
            .into_iter()
            .find_map(|scope| scope.iter().find(|v| v.enabled && v.key == key))
            .map(|v| v.value.as_str())
    }

    /// Scope that would answer a lookup for `key`
    pub fn scope_of(&self, key: &str) -> Option<VariableScope> {
        let has = |scope: &[Variable]| scope.iter().any(|v| v.enabled && v.key == key);
        if has(self.local) {
            Some(VariableScope::Local)
        } else if has(self.environment) {
            Some(VariableScope::Environment)
        } else if has(self.global) {
            Some(VariableScope::Global)
        } else {
            None
        }
    }
}
