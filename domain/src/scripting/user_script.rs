use serde::{Deserialize, Serialize};

use crate::module::{LoadBatch, Unit, UnitSource};

/// A named, user-authored script persisted by the host.
///
/// Scripts live in an ordered list; the position in that list is the
/// script's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserScript {
    pub name: String,
    #[serde(default)]
    pub code: String,
}

impl UserScript {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }

    /// Module unit for this script at position `index`.
    ///
    /// The identifier is positional so that two scripts sharing a name
    /// still form a valid batch; the namespace is the script name.
    pub fn to_unit(&self, index: usize) -> Unit {
        Unit::module(
            format!("user/{}", index),
            UnitSource::Inline(self.code.clone()),
        )
        .with_namespace(self.name.clone())
    }

    /// Load batch for a persisted script list, in list order.
    pub fn batch(scripts: &[UserScript]) -> LoadBatch {
        let units = scripts
            .iter()
            .enumerate()
            .map(|(i, s)| s.to_unit(i))
            .collect();
        // Positional identifiers are unique by construction.
        LoadBatch::new(units).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_script_deserializes_without_code() {
        let script: UserScript = serde_json::from_str(r#"{"name": "empty"}"#).unwrap();
        assert_eq!(script, UserScript::new("empty", ""));
    }

    #[test]
    fn test_batch_tolerates_duplicate_names() {
        let scripts = vec![
            UserScript::new("greet", "return 'a'"),
            UserScript::new("greet", "return 'b'"),
        ];
        let batch = UserScript::batch(&scripts);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.units()[0].identifier(), "user/0");
        assert_eq!(batch.units()[1].namespace(), "greet");
        assert!(batch.units().iter().all(|u| u.is_module()));
    }
}
