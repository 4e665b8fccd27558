//! Configuration expansion
//!
//! Turns the merged JSON tree into validated branches: template variables are
//! popped from the top level, comma-joined version keys are split, `{VAR}`
//! placeholders are substituted and every branch is classified.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::debug;

use super::{Branch, ProjectKey};
use crate::constants::{archives, projects};
use crate::errors::{ConfigError, ConfigResult};

/// Template variables available to branch templates
pub type Variables = HashMap<String, String>;

/// Whether a configuration key names a template variable
///
/// Variables are written in upper case: at least one letter, no lower-case
/// letters.
pub fn is_variable_key(key: &str) -> bool {
    key.chars().any(char::is_alphabetic) && !key.chars().any(char::is_lowercase)
}

/// Remove all upper-case keys from the top level and return them as variables
pub fn pop_variables(root: &mut Map<String, Value>) -> ConfigResult<Variables> {
    let keys: Vec<String> = root
        .keys()
        .filter(|key| is_variable_key(key))
        .cloned()
        .collect();

    let mut vars = Variables::new();
    for key in keys {
        let value = match root.remove(&key) {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(ConfigError::InvalidVariable { var: key }),
        };
        vars.insert(key, value);
    }
    Ok(vars)
}

/// Whether a remote location is itself the runnable artifact
pub fn is_frozen_remote(remote: &str) -> bool {
    remote
        .to_ascii_lowercase()
        .ends_with(archives::EXECUTABLE_EXTENSION)
}

/// Split comma-joined version keys into independent entries
///
/// `"nx10,nx1001"` becomes two keys sharing the same value. Any key produced
/// twice, or colliding with a key written on its own, is an error.
pub fn split_keys(project: ProjectKey, map: Map<String, Value>) -> ConfigResult<Map<String, Value>> {
    let mut result = Map::new();
    let (joined, single): (Vec<_>, Vec<_>) = map.into_iter().partition(|(k, _)| k.contains(','));

    for (key, value) in single {
        result.insert(key, value);
    }

    for (key, value) in joined {
        for part in key.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if result.contains_key(part) {
                return Err(ConfigError::DuplicateKey {
                    project: project.to_string(),
                    key: part.to_string(),
                });
            }
            result.insert(part.to_string(), value.clone());
        }
    }

    Ok(result)
}

/// Substitute `{NAME}` placeholders from `vars`
///
/// `{{` and `}}` produce literal braces. Missing variables and unbalanced
/// braces are errors, never left in the output.
pub fn expand_template(
    template: &str,
    vars: &Variables,
    project: ProjectKey,
    version: &str,
) -> ConfigResult<String> {
    let malformed = |reason: &str| ConfigError::MalformedTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err(malformed("nested '{'")),
                        Some(c) => name.push(c),
                        None => return Err(malformed("unclosed '{'")),
                    }
                }
                let value = vars.get(&name).ok_or_else(|| ConfigError::UndefinedVariable {
                    var: name.clone(),
                    project: project.to_string(),
                    version: version.to_string(),
                })?;
                out.push_str(value);
            }
            '}' => return Err(malformed("single '}'")),
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Expand one project's mapping into classified branches
pub fn expand_project(
    project: ProjectKey,
    raw: Value,
    globals: &Variables,
) -> ConfigResult<BTreeMap<String, Branch>> {
    let Value::Object(mut map) = raw else {
        return Err(ConfigError::NotAnObject {
            what: format!("project {}", project),
        });
    };

    let rule = match map.remove(projects::TARGET_RULE_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::String(rule)) => Some(rule),
        Some(_) => {
            return Err(ConfigError::InvalidOption {
                name: format!("{}.{}", project, projects::TARGET_RULE_KEY),
                reason: "must be a string".to_string(),
            })
        }
    };

    let map = split_keys(project, map)?;
    let mut branches = BTreeMap::new();
    for (version, entry) in map {
        let (remote, local) = branch_entry(project, &version, &entry)?;

        let mut vars = globals.clone();
        vars.insert(projects::VERSION_VAR.to_string(), version.clone());

        let remote = remote
            .map(|r| expand_template(r, &vars, project, &version))
            .transpose()?;

        let branch = match remote {
            Some(remote) if is_frozen_remote(&remote) => Branch::frozen(remote),
            remote => {
                let template = local.or(rule.as_deref()).ok_or_else(|| {
                    ConfigError::MissingTargetRule {
                        project: project.to_string(),
                        version: version.clone(),
                    }
                })?;
                let local = PathBuf::from(expand_template(template, &vars, project, &version)?);
                match remote {
                    Some(remote) => Branch::tracked(remote, local),
                    None => Branch::local_only(local),
                }
            }
        };

        debug!("{} branch {}: {:?}", project, version, branch);
        branches.insert(version, branch);
    }

    Ok(branches)
}

/// Unpack a `[remote, local?]` entry
fn branch_entry<'a>(
    project: ProjectKey,
    version: &str,
    entry: &'a Value,
) -> ConfigResult<(Option<&'a str>, Option<&'a str>)> {
    let invalid = |reason: &str| ConfigError::InvalidBranch {
        project: project.to_string(),
        version: version.to_string(),
        reason: reason.to_string(),
    };

    let items = entry
        .as_array()
        .ok_or_else(|| invalid("expected an array [remote, local]"))?;
    if items.is_empty() || items.len() > 2 {
        return Err(invalid("expected one or two elements [remote, local]"));
    }

    let location = |value: Option<&'a Value>| match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(invalid("locations must be strings or null")),
    };

    Ok((location(items.first())?, location(items.get(1))?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::environment::BranchStatus;
    use serde_json::json;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_variable_keys() {
        assert!(is_variable_key("HOME"));
        assert!(is_variable_key("NX_REMOTE_2"));
        assert!(!is_variable_key("nx10"));
        assert!(!is_variable_key("Home"));
        assert!(!is_variable_key("1003"));
    }

    #[test]
    fn test_pop_variables() {
        let mut root = object(json!({"HOME": "bar", "PORT": 21, "delete_zip": true}));
        let vars = pop_variables(&mut root).unwrap();
        assert_eq!(vars["HOME"], "bar");
        assert_eq!(vars["PORT"], "21");
        assert_eq!(root.len(), 1);
        assert!(root.contains_key("delete_zip"));

        let mut root = object(json!({"HOME": ["a"]}));
        assert!(matches!(
            pop_variables(&mut root),
            Err(ConfigError::InvalidVariable { .. })
        ));
    }

    #[test]
    fn test_expand_template() {
        let vars = vars(&[("HOME", "bar"), ("REMOTE", "foo")]);
        let expanded = expand_template("{REMOTE}/nx9", &vars, ProjectKey::Nx, "nx9").unwrap();
        assert_eq!(expanded, "foo/nx9");
        let expanded = expand_template("{{literal}}", &vars, ProjectKey::Nx, "nx9").unwrap();
        assert_eq!(expanded, "{literal}");
    }

    #[test]
    fn test_expand_template_undefined_variable() {
        let err = expand_template("{NOPE}/x", &Variables::new(), ProjectKey::Tmg, "nx9")
            .unwrap_err();
        match err {
            ConfigError::UndefinedVariable { var, project, version } => {
                assert_eq!(var, "NOPE");
                assert_eq!(project, "tmg");
                assert_eq!(version, "nx9");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_expand_template_malformed() {
        let vars = Variables::new();
        for template in ["{open", "close}", "{a{b}}"] {
            assert!(matches!(
                expand_template(template, &vars, ProjectKey::Nx, "nx9"),
                Err(ConfigError::MalformedTemplate { .. })
            ));
        }
    }

    #[test]
    fn test_split_keys() {
        let map = object(json!({"nx10,nx1001,nx1002": ["r"], "nx9": ["s"]}));
        let split = split_keys(ProjectKey::Nx, map).unwrap();
        assert_eq!(split.len(), 4);
        for key in ["nx10", "nx1001", "nx1002"] {
            assert_eq!(split[key], json!(["r"]));
        }
        assert_eq!(split["nx9"], json!(["s"]));
    }

    #[test]
    fn test_split_keys_collision() {
        let map = object(json!({"nx10,nx1001": ["r"], "nx1001": ["s"]}));
        assert!(matches!(
            split_keys(ProjectKey::Nx, map),
            Err(ConfigError::DuplicateKey { key, .. }) if key == "nx1001"
        ));

        let map = object(json!({"nx10,nx11": ["r"], "nx11,nx12": ["s"]}));
        assert!(split_keys(ProjectKey::Nx, map).is_err());
    }

    #[test]
    fn test_split_keys_untouched_without_commas() {
        let map = object(json!({"nx10": "a", "nx9": "b"}));
        let split = split_keys(ProjectKey::Tmg, map.clone()).unwrap();
        assert_eq!(split, map);
    }

    #[test]
    fn test_expand_project_round_trip() {
        let globals = vars(&[("HOME", "bar"), ("REMOTE", "foo")]);
        let raw = json!({"nx9": ["{REMOTE}/nx9", "{HOME}/nx9"]});
        let branches = expand_project(ProjectKey::Nx, raw, &globals).unwrap();
        let branch = &branches["nx9"];
        assert_eq!(branch.remote.as_deref(), Some("foo/nx9"));
        assert_eq!(branch.local, Some(PathBuf::from("bar/nx9")));
        assert_eq!(branch.status, BranchStatus::Tracked);
    }

    #[test]
    fn test_expand_project_target_rule() {
        let globals = vars(&[("HOME", "bar")]);
        let raw = json!({
            "target_rule": "{HOME}/patches/{version}",
            "nx11": ["/pub/nx11"],
            "nx10": [null, "{HOME}/own"],
        });
        let branches = expand_project(ProjectKey::Tmg, raw, &globals).unwrap();
        assert_eq!(branches.len(), 2);
        assert_eq!(
            branches["nx11"].local,
            Some(PathBuf::from("bar/patches/nx11"))
        );
        assert_eq!(branches["nx10"].status, BranchStatus::LocalOnly);
        assert_eq!(branches["nx10"].local, Some(PathBuf::from("bar/own")));
    }

    #[test]
    fn test_expand_project_missing_target_rule() {
        let raw = json!({"nx11": ["/pub/nx11"]});
        assert!(matches!(
            expand_project(ProjectKey::Tmg, raw, &Variables::new()),
            Err(ConfigError::MissingTargetRule { .. })
        ));
    }

    #[test]
    fn test_frozen_short_circuits_local() {
        let raw = json!({
            "target_rule": "{UNDEFINED}/{version}",
            "nx1001": ["C:\\NX1001\\UGII\\ugraf.exe", "{ALSO_UNDEFINED}"],
            "nx1002": ["C:\\NX1002\\ugraf.EXE"],
        });
        let branches = expand_project(ProjectKey::Nx, raw, &Variables::new()).unwrap();
        for version in ["nx1001", "nx1002"] {
            assert_eq!(branches[version].status, BranchStatus::Frozen);
            assert_eq!(branches[version].local, None);
        }
    }

    #[test]
    fn test_frozen_remote_is_expanded_before_classification() {
        let raw = json!({
            "nx12": ["{INSTALL}\\{version}\\ugraf.exe"],
        });
        let globals = vars(&[("INSTALL", "C:\\Siemens")]);
        let branches = expand_project(ProjectKey::Nx, raw, &globals).unwrap();
        assert_eq!(branches["nx12"].status, BranchStatus::Frozen);
        assert_eq!(
            branches["nx12"].remote.as_deref(),
            Some("C:\\Siemens\\nx12\\ugraf.exe")
        );
    }

    #[test]
    fn test_invalid_branch_shapes() {
        for raw in [
            json!({"nx9": "just a string"}),
            json!({"nx9": []}),
            json!({"nx9": ["a", "b", "c"]}),
            json!({"nx9": [1, "b"]}),
        ] {
            assert!(matches!(
                expand_project(ProjectKey::Nx, raw, &Variables::new()),
                Err(ConfigError::InvalidBranch { .. })
            ));
        }
    }
}
