#![allow(dead_code)]

use docs_build_core::config::DocsConfig;

pub const CONF_JSON: &str = r#"{
    "langs": { "en": "English", "de": "Deutsch", "fr": "Francais" },
    "vers": ["v257", "v256"],
    "version": "v257",
    "scopes": { "app": "Reference", "ui": "UI Components", "MUI": "Material UI" },
    "regHide": "^_",
    "regControl": "^(Create|Add)",
    "tname": { "num": "Number", "str": "String", "obj": "Object" },
    "tdesc": { "num_int": "integer", "str_col": "colour", "obj": "JS Object" }
}"#;

pub fn sample_config() -> DocsConfig {
    serde_json::from_str(CONF_JSON).expect("sample config should parse")
}
