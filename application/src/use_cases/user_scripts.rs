//! User-script repository
//!
//! The host persists user scripts as one ordered list; every mutation here
//! reads the list, edits it, and writes it back as a whole.

use crate::ports::host::HostFacade;
use luaext_domain::UserScript;
use std::sync::Arc;
use thiserror::Error;

/// How a caller names a user script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptRef {
    Name(String),
    Index(usize),
}

impl ScriptRef {
    /// Build a reference from the two mutually exclusive selectors.
    pub fn from_selectors(
        name: Option<String>,
        index: Option<usize>,
    ) -> Result<Self, ScriptLookupError> {
        match (name, index) {
            (Some(_), Some(_)) => Err(ScriptLookupError::ConflictingSelectors),
            (Some(name), None) => Ok(Self::Name(name)),
            (None, Some(index)) => Ok(Self::Index(index)),
            (None, None) => Err(ScriptLookupError::MissingSelector),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptLookupError {
    #[error("Cannot use a script id together with a script name")]
    ConflictingSelectors,

    #[error("No script or script id provided")]
    MissingSelector,

    #[error("Script not found: {0}")]
    NotFound(String),

    #[error("Script id {index} is out of range ({len} scripts)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Script name {name} matches {count} scripts; select it by id")]
    Ambiguous { name: String, count: usize },
}

pub struct UserScriptRepository {
    host: Arc<dyn HostFacade>,
}

impl UserScriptRepository {
    pub fn new(host: Arc<dyn HostFacade>) -> Self {
        Self { host }
    }

    pub fn list(&self) -> Vec<UserScript> {
        self.host.user_scripts()
    }

    /// Look a script up. Names must match exactly one script.
    pub fn find(&self, script: &ScriptRef) -> Result<(usize, UserScript), ScriptLookupError> {
        let scripts = self.list();
        match script {
            ScriptRef::Index(index) => scripts
                .get(*index)
                .cloned()
                .map(|s| (*index, s))
                .ok_or(ScriptLookupError::IndexOutOfRange {
                    index: *index,
                    len: scripts.len(),
                }),
            ScriptRef::Name(name) => {
                let mut matches = scripts
                    .into_iter()
                    .enumerate()
                    .filter(|(_, s)| &s.name == name);
                match (matches.next(), matches.count()) {
                    (Some(found), 0) => Ok(found),
                    (Some(_), rest) => Err(ScriptLookupError::Ambiguous {
                        name: name.clone(),
                        count: rest + 1,
                    }),
                    (None, _) => Err(ScriptLookupError::NotFound(name.clone())),
                }
            }
        }
    }

    /// Append a script and return its id.
    pub fn add(&self, script: UserScript) -> usize {
        let mut scripts = self.list();
        scripts.push(script);
        self.host.set_user_scripts(&scripts);
        scripts.len() - 1
    }

    /// Replace the code of an existing script.
    pub fn update(&self, script: &ScriptRef, code: String) -> Result<usize, ScriptLookupError> {
        let (index, _) = self.find(script)?;
        let mut scripts = self.list();
        scripts[index].code = code;
        self.host.set_user_scripts(&scripts);
        Ok(index)
    }

    /// Remove a script; later scripts shift down by one id.
    pub fn remove(&self, script: &ScriptRef) -> Result<UserScript, ScriptLookupError> {
        let (index, _) = self.find(script)?;
        let mut scripts = self.list();
        let removed = scripts.remove(index);
        self.host.set_user_scripts(&scripts);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHost;

    fn repository(scripts: &[(&str, &str)]) -> UserScriptRepository {
        let host = Arc::new(MockHost::new());
        let scripts: Vec<_> = scripts
            .iter()
            .map(|(n, c)| UserScript::new(*n, *c))
            .collect();
        host.set_user_scripts(&scripts);
        UserScriptRepository::new(host)
    }

    #[test]
    fn test_selectors_are_exclusive() {
        assert_eq!(
            ScriptRef::from_selectors(Some("a".into()), Some(0)),
            Err(ScriptLookupError::ConflictingSelectors)
        );
        assert_eq!(
            ScriptRef::from_selectors(None, None),
            Err(ScriptLookupError::MissingSelector)
        );
        assert_eq!(
            ScriptRef::from_selectors(None, Some(2)),
            Ok(ScriptRef::Index(2))
        );
    }

    #[test]
    fn test_find_by_name_requires_unique_match() {
        let repo = repository(&[("a", "1"), ("b", "2"), ("a", "3")]);

        assert_eq!(
            repo.find(&ScriptRef::Name("b".into())).unwrap(),
            (1, UserScript::new("b", "2"))
        );
        assert_eq!(
            repo.find(&ScriptRef::Name("a".into())),
            Err(ScriptLookupError::Ambiguous {
                name: "a".into(),
                count: 2
            })
        );
        assert_eq!(
            repo.find(&ScriptRef::Name("zzz".into())),
            Err(ScriptLookupError::NotFound("zzz".into()))
        );
    }

    #[test]
    fn test_find_by_index_checks_range() {
        let repo = repository(&[("a", "1")]);
        assert_eq!(repo.find(&ScriptRef::Index(0)).unwrap().1.name, "a");
        assert_eq!(
            repo.find(&ScriptRef::Index(1)),
            Err(ScriptLookupError::IndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_add_update_remove_rewrite_the_list() {
        let repo = repository(&[("a", "1")]);

        assert_eq!(repo.add(UserScript::new("b", "2")), 1);
        repo.update(&ScriptRef::Name("a".into()), "10".into())
            .unwrap();
        let removed = repo.remove(&ScriptRef::Index(0)).unwrap();

        assert_eq!(removed, UserScript::new("a", "10"));
        assert_eq!(repo.list(), vec![UserScript::new("b", "2")]);
    }
}
