//! Environment tables handed to spawned processes.
//!
//! The runner never reads the ambient environment on its own. Callers inject
//! an [`EnvironmentProvider`]; [`InheritedEnvironment`] is the documented
//! default and snapshots the current process environment each time it is
//! asked, while [`StaticEnvironment`] keeps tests independent of the host.

use std::collections::HashMap;
use std::ffi::OsString;

pub type EnvMap = HashMap<OsString, OsString>;

/// Supplies the environment used when a call does not provide its own.
pub trait EnvironmentProvider: Send + Sync {
    fn vars(&self) -> EnvMap;
}

/// Reads (never mutates) the environment of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct InheritedEnvironment;

impl EnvironmentProvider for InheritedEnvironment {
    fn vars(&self) -> EnvMap {
        std::env::vars_os().collect()
    }
}

/// A fixed environment table.
#[derive(Debug, Default, Clone)]
pub struct StaticEnvironment {
    vars: EnvMap,
}

impl StaticEnvironment {
    pub fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl EnvironmentProvider for StaticEnvironment {
    fn vars(&self) -> EnvMap {
        self.vars.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_environment_returns_its_table() {
        let env = StaticEnvironment::new([("GREETING", "hello")]);
        let vars = env.vars();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get(&OsString::from("GREETING")), Some(&OsString::from("hello")));
    }

    #[test]
    fn inherited_environment_matches_process_table() {
        let vars = InheritedEnvironment.vars();
        assert_eq!(vars.len(), std::env::vars_os().count());
    }
}
