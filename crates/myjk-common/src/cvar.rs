// cvar.rs -- named tunables read by the world code

use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub flags: i32,
    pub value: f32,
    pub integer: i32,
}

impl Cvar {
    fn new(name: &str, string: &str, flags: i32) -> Self {
        let mut var = Cvar { name: name.to_string(), string: String::new(), flags, value: 0.0, integer: 0 };
        var.store(string);
        var
    }

    // non-numeric strings read as 0
    fn store(&mut self, string: &str) {
        self.string = string.to_string();
        self.value = string.trim().parse::<f32>().unwrap_or(0.0);
        self.integer = self.value as i32;
    }
}

/// Registry of every cvar, indexed by name.
#[derive(Debug, Default)]
pub struct CvarContext {
    vars: HashMap<String, Cvar>,
}

impl CvarContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.vars.get(name)
    }

    /// Registers `name` with `string` unless it already exists, in which
    /// case only `flags` are merged and the current value is kept.
    pub fn get(&mut self, name: &str, string: &str, flags: i32) -> &Cvar {
        let var = self.vars.entry(name.to_string()).or_insert_with(|| Cvar::new(name, string, 0));
        var.flags |= flags;
        var
    }

    /// Sets `name`, creating it with no flags if it is unknown.
    pub fn set(&mut self, name: &str, string: &str) {
        match self.vars.get_mut(name) {
            Some(var) => var.store(string),
            None => {
                self.vars.insert(name.to_string(), Cvar::new(name, string, 0));
            }
        }
    }

    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |v| v.value)
    }

    pub fn variable_integer(&self, name: &str) -> i32 {
        self.find_var(name).map_or(0, |v| v.integer)
    }

    pub fn variable_string(&self, name: &str) -> &str {
        self.find_var(name).map_or("", |v| v.string.as_str())
    }
}

// ============================================================
// Process-wide registry
// ============================================================

static CVAR_CTX: Mutex<Option<CvarContext>> = Mutex::new(None);

pub fn with_cvar_ctx<F, R>(f: F) -> R
where
    F: FnOnce(&mut CvarContext) -> R,
{
    let mut g = CVAR_CTX.lock();
    f(g.get_or_insert_with(CvarContext::new))
}

pub fn cvar_get(name: &str, string: &str, flags: i32) {
    with_cvar_ctx(|c| {
        c.get(name, string, flags);
    });
}

pub fn cvar_set(name: &str, string: &str) {
    with_cvar_ctx(|c| c.set(name, string));
}

pub fn cvar_variable_value(name: &str) -> f32 {
    with_cvar_ctx(|c| c.variable_value(name))
}

pub fn cvar_variable_integer(name: &str) -> i32 {
    with_cvar_ctx(|c| c.variable_integer(name))
}

pub fn cvar_variable_string(name: &str) -> String {
    with_cvar_ctx(|c| c.variable_string(name).to_string())
}
