//! Manifest Types
//!
//! Typed view of a raw `logic.json` definition and the normalization rules
//! that shape it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::{ManifestError, ManifestResult};

/// Module classification: single module or composite bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Module,
    Bundle,
}

impl Kind {
    pub const ALL: [Kind; 2] = [Kind::Module, Kind::Bundle];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Module => "module",
            Kind::Bundle => "bundle",
        }
    }
}

/// UI-facing or data-facing module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Ui,
    Db,
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::Ui, Layer::Db];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Ui => "ui",
            Layer::Db => "db",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbType {
    Core,
    Addon,
    Global,
}

impl DbType {
    pub const ALL: [DbType; 3] = [DbType::Core, DbType::Addon, DbType::Global];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::Core => "core",
            DbType::Addon => "addon",
            DbType::Global => "global",
        }
    }
}

/// Kind of dependency edge between two manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Resolved through the package registry file
    Ui,
    /// Defined inline in `dbDepsMap`
    Db,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Ui => "ui",
            EdgeKind::Db => "db",
        }
    }
}

/// Capability exchange point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub key: String,
    pub channel: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contracts {
    pub expects: Vec<Contract>,
    pub provides: Vec<Contract>,
}

/// Normalized manifest definition
///
/// Scalar fields that are absent or not strings are `None`. `kind`, `layer`
/// and `db_type` keep the raw string so validation can report unknown values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestDefinition {
    pub package_name: Option<String>,
    pub version: Option<String>,
    pub category: Option<String>,
    pub kind: Option<String>,
    pub layer: Option<String>,
    pub db_type: Option<String>,
    pub tags: Vec<String>,
    pub contracts: Contracts,
    pub business_domain: Option<String>,
    pub platform: Option<String>,
    pub structure: Option<String>,
    pub implementation: Option<String>,
    pub render_mode: Option<String>,
    pub family: Option<String>,
    pub theme: Option<String>,
    /// Explicit entry, else implementation, else structure, else platform
    pub entry: Option<String>,
    /// Declared ui dependencies (name, requested version) in source order
    pub ui_deps: Vec<(String, String)>,
    /// Inline db definitions in source order, falsy values dropped
    pub db_deps: Vec<(String, Value)>,
}

impl ManifestDefinition {
    /// Normalize a parsed JSON value
    pub fn from_value(value: &Value) -> ManifestResult<Self> {
        let obj = value.as_object().ok_or_else(|| {
            ManifestError::definition_invalid("Manifest definition must be an object.")
        })?;

        let implementation = string_field(obj, "implementation");
        let structure = string_field(obj, "structure");
        let platform = string_field(obj, "platform");
        let entry = string_field(obj, "entry")
            .or_else(|| implementation.clone())
            .or_else(|| structure.clone())
            .or_else(|| platform.clone());

        Ok(Self {
            package_name: string_field(obj, "packageName"),
            version: string_field(obj, "version"),
            category: string_field(obj, "category"),
            kind: string_field(obj, "kind"),
            layer: string_field(obj, "layer"),
            db_type: string_field(obj, "dbType"),
            tags: normalize_tags(obj.get("tags")),
            contracts: normalize_contracts(obj.get("contracts")),
            business_domain: string_field(obj, "businessDomain"),
            platform,
            structure,
            implementation,
            render_mode: string_field(obj, "renderMode"),
            family: string_field(obj, "family"),
            theme: string_field(obj, "theme"),
            entry,
            ui_deps: normalize_ui_deps(obj.get("uiDeps")),
            db_deps: normalize_db_deps(obj.get("dbDepsMap")),
        })
    }
}

/// String value of `key`; numbers and booleans keep their JSON text
fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        scalar @ (Value::Number(_) | Value::Bool(_)) => Some(scalar.to_string()),
        _ => None,
    }
}

fn normalize_tags(value: Option<&Value>) -> Vec<String> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .map(|tag| tag.trim().to_string())
        .collect()
}

fn normalize_contracts(value: Option<&Value>) -> Contracts {
    let list = |key: &str| -> Vec<Contract> {
        value
            .and_then(|c| c.get(key))
            .and_then(Value::as_array)
            .map(|items| items.iter().map(normalize_contract).collect())
            .unwrap_or_default()
    };
    Contracts {
        expects: list("expects"),
        provides: list("provides"),
    }
}

fn normalize_contract(value: &Value) -> Contract {
    let field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Contract {
        key: field("key"),
        channel: field("channel"),
        description: field("description"),
    }
}

fn normalize_ui_deps(value: Option<&Value>) -> Vec<(String, String)> {
    let Some(deps) = value.and_then(Value::as_object) else {
        return Vec::new();
    };
    deps.iter()
        .filter(|(name, _)| !name.is_empty())
        .filter_map(|(name, version)| match version.as_str() {
            Some(v) if !v.is_empty() => Some((name.clone(), v.to_string())),
            _ => None,
        })
        .collect()
}

fn normalize_db_deps(value: Option<&Value>) -> Vec<(String, Value)> {
    let Some(deps) = value.and_then(Value::as_object) else {
        return Vec::new();
    };
    deps.iter()
        .filter(|(_, def)| is_truthy(def))
        .map(|(name, def)| (name.clone(), def.clone()))
        .collect()
}

/// JSON truthiness: null, false, 0 and "" are falsy
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_rejects_non_object() {
        for raw in [json!(null), json!("logic"), json!([1, 2])] {
            let err = ManifestDefinition::from_value(&raw).unwrap_err();
            assert_eq!(err.code(), ErrorCode::DefinitionInvalid);
        }
    }

    #[test]
    fn test_entry_fallback_order() {
        let def = ManifestDefinition::from_value(&json!({
            "platform": "platform.js",
            "structure": "structure.js"
        }))
        .unwrap();
        assert_eq!(def.entry.as_deref(), Some("structure.js"));

        let def = ManifestDefinition::from_value(&json!({
            "entry": "index.js",
            "implementation": "impl.js"
        }))
        .unwrap();
        assert_eq!(def.entry.as_deref(), Some("index.js"));

        let def = ManifestDefinition::from_value(&json!({})).unwrap();
        assert!(def.entry.is_none());
    }

    #[test]
    fn test_scalar_fields_keep_json_text() {
        let def = ManifestDefinition::from_value(&json!({
            "packageName": 42,
            "version": 1,
            "theme": true,
            "family": {"nested": "object"},
            "category": null
        }))
        .unwrap();
        assert_eq!(def.package_name.as_deref(), Some("42"));
        assert_eq!(def.version.as_deref(), Some("1"));
        assert_eq!(def.theme.as_deref(), Some("true"));
        assert!(def.family.is_none());
        assert!(def.category.is_none());
    }

    #[test]
    fn test_tags_drop_non_strings_and_trim() {
        let def = ManifestDefinition::from_value(&json!({
            "tags": ["  alpha", 3, "beta  ", null, "gamma"]
        }))
        .unwrap();
        assert_eq!(def.tags, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_contracts_default_missing_fields() {
        let def = ManifestDefinition::from_value(&json!({
            "contracts": {
                "expects": [{"key": "orders"}],
                "provides": [{"key": "ui", "channel": "http", "description": "page"}]
            }
        }))
        .unwrap();
        assert_eq!(
            def.contracts.expects,
            vec![Contract {
                key: "orders".into(),
                channel: String::new(),
                description: String::new(),
            }]
        );
        assert_eq!(def.contracts.provides[0].channel, "http");
    }

    #[test]
    fn test_ui_deps_keep_order_and_drop_invalid() {
        let def = ManifestDefinition::from_value(&json!({
            "uiDeps": {
                "zeta": "1.0.0",
                "alpha": "",
                "mid": 2,
                "beta": "2.0.0"
            }
        }))
        .unwrap();
        assert_eq!(
            def.ui_deps,
            vec![
                ("zeta".to_string(), "1.0.0".to_string()),
                ("beta".to_string(), "2.0.0".to_string()),
            ]
        );
    }

    #[test]
    fn test_db_deps_drop_falsy() {
        let def = ManifestDefinition::from_value(&json!({
            "dbDepsMap": {
                "db-b": {"packageName": "db-b"},
                "disabled": false,
                "db-a": {"packageName": "db-a"},
                "empty": null
            }
        }))
        .unwrap();
        let keys: Vec<_> = def.db_deps.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["db-b", "db-a"]);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!(Kind::parse("bundle"), Some(Kind::Bundle));
        assert_eq!(Layer::parse("db"), Some(Layer::Db));
        assert_eq!(DbType::parse("addon"), Some(DbType::Addon));
        assert_eq!(DbType::parse("Core"), None);
    }
}
