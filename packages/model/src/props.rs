//! Per-type prop schemas.
//!
//! Each component type declares the props it understands together with their
//! [`TypeTag`]. Undeclared props are allowed and stay free-form (chart series
//! config, renderer hints). String values carrying a binding expression are
//! accepted for any declared tag since they resolve at render time.

use crate::component::{ComponentProps, ComponentType};
use crate::state::TypeTag;
use serde_json::{json, Value};

/// A single declared prop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropSpec {
    pub name: &'static str,
    pub tag: TypeTag,
}

const fn prop(name: &'static str, tag: TypeTag) -> PropSpec {
    PropSpec { name, tag }
}

const TEXT: &[PropSpec] = &[prop("text", TypeTag::String), prop("variant", TypeTag::String)];
const BUTTON: &[PropSpec] = &[
    prop("text", TypeTag::String),
    prop("variant", TypeTag::String),
    prop("disabled", TypeTag::Boolean),
];
const INPUT: &[PropSpec] = &[
    prop("placeholder", TypeTag::String),
    prop("inputType", TypeTag::String),
    prop("required", TypeTag::Boolean),
];
const SELECT: &[PropSpec] = &[
    prop("options", TypeTag::Array),
    prop("placeholder", TypeTag::String),
    prop("multiple", TypeTag::Boolean),
];
const CHECKBOX: &[PropSpec] = &[prop("checked", TypeTag::Boolean)];
const TABLE: &[PropSpec] = &[prop("columns", TypeTag::Array), prop("pageSize", TypeTag::Number)];
const CHART: &[PropSpec] = &[
    prop("chartType", TypeTag::String),
    prop("series", TypeTag::Array),
    prop("xKey", TypeTag::String),
];
const BADGE: &[PropSpec] = &[prop("text", TypeTag::String), prop("color", TypeTag::String)];
const TABS: &[PropSpec] = &[prop("tabs", TypeTag::Array), prop("activeTab", TypeTag::String)];
const MODAL: &[PropSpec] = &[prop("title", TypeTag::String), prop("open", TypeTag::Boolean)];
const KEYVALUE: &[PropSpec] = &[prop("items", TypeTag::Array)];
const IMAGE: &[PropSpec] = &[prop("src", TypeTag::String), prop("alt", TypeTag::String)];
const MARKDOWN: &[PropSpec] = &[prop("content", TypeTag::String)];
const ROW: &[PropSpec] = &[prop("gap", TypeTag::Number), prop("align", TypeTag::String)];
const COLUMN: &[PropSpec] = &[prop("gap", TypeTag::Number)];
const FORM: &[PropSpec] = &[prop("submitLabel", TypeTag::String)];
const ACCORDION: &[PropSpec] = &[
    prop("sections", TypeTag::Array),
    prop("allowMultiple", TypeTag::Boolean),
];

/// Declared props for one component type
#[derive(Debug, Clone, Copy)]
pub struct PropSchema {
    pub kind: ComponentType,
    pub props: &'static [PropSpec],
}

impl ComponentType {
    pub fn prop_schema(&self) -> PropSchema {
        let props = match self {
            ComponentType::Text => TEXT,
            ComponentType::Button => BUTTON,
            ComponentType::Input => INPUT,
            ComponentType::Select => SELECT,
            ComponentType::Checkbox => CHECKBOX,
            ComponentType::Table => TABLE,
            ComponentType::Chart => CHART,
            ComponentType::Badge => BADGE,
            ComponentType::Tabs => TABS,
            ComponentType::Modal => MODAL,
            ComponentType::Keyvalue => KEYVALUE,
            ComponentType::Divider => &[],
            ComponentType::Image => IMAGE,
            ComponentType::Markdown => MARKDOWN,
            ComponentType::Row => ROW,
            ComponentType::Column => COLUMN,
            ComponentType::Form => FORM,
            ComponentType::Accordion => ACCORDION,
        };
        PropSchema { kind: *self, props }
    }
}

impl PropSchema {
    pub fn spec(&self, name: &str) -> Option<&PropSpec> {
        self.props.iter().find(|spec| spec.name == name)
    }

    /// Check a value against the declared tag.
    ///
    /// Returns the expected tag when the value contradicts it. `null` always
    /// passes (it clears the prop).
    pub fn check(&self, name: &str, value: &Value) -> Result<(), TypeTag> {
        let Some(spec) = self.spec(name) else {
            return Ok(());
        };
        if value.is_null() {
            return Ok(());
        }
        if let Value::String(s) = value {
            if s.contains("{{") {
                return Ok(());
            }
        }
        if TypeTag::of(value) == spec.tag {
            Ok(())
        } else {
            Err(spec.tag)
        }
    }

    /// Props a freshly created node starts with
    pub fn default_props(&self) -> ComponentProps {
        let mut props = ComponentProps::default();
        let defaults: Vec<(&str, Value)> = match self.kind {
            ComponentType::Text => vec![("text", json!("Text"))],
            ComponentType::Button => vec![("text", json!("Button")), ("variant", json!("primary"))],
            ComponentType::Input => vec![("placeholder", json!(""))],
            ComponentType::Select => vec![("options", json!([]))],
            ComponentType::Checkbox => vec![("checked", json!(false))],
            ComponentType::Table => vec![("columns", json!([]))],
            ComponentType::Chart => vec![("chartType", json!("bar")), ("series", json!([]))],
            ComponentType::Badge => vec![("text", json!("Badge"))],
            ComponentType::Tabs => vec![("tabs", json!([]))],
            ComponentType::Modal => vec![("title", json!("Modal")), ("open", json!(false))],
            ComponentType::Keyvalue => vec![("items", json!([]))],
            ComponentType::Image => vec![("src", json!("")), ("alt", json!(""))],
            ComponentType::Markdown => vec![("content", json!(""))],
            ComponentType::Accordion => vec![("sections", json!([{ "title": "Section 1" }]))],
            ComponentType::Divider
            | ComponentType::Row
            | ComponentType::Column
            | ComponentType::Form => vec![],
        };
        for (name, value) in defaults {
            props.values.insert(name.to_string(), value);
        }
        if self.kind.is_container() {
            props.components = Some(Vec::new());
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containers_start_with_empty_children() {
        for kind in ComponentType::ALL {
            let props = kind.prop_schema().default_props();
            assert_eq!(props.components.is_some(), kind.is_container(), "{kind}");
        }
    }

    #[test]
    fn test_accordion_gets_one_default_section() {
        let props = ComponentType::Accordion.prop_schema().default_props();
        assert_eq!(props.values["sections"], json!([{ "title": "Section 1" }]));
    }

    #[test]
    fn test_check_rejects_contradicting_types() {
        let schema = ComponentType::Button.prop_schema();
        assert_eq!(schema.check("disabled", &json!("yes")), Err(TypeTag::Boolean));
        assert_eq!(schema.check("disabled", &json!(true)), Ok(()));
        assert_eq!(schema.check("disabled", &json!("{{state.busy}}")), Ok(()));
        assert_eq!(schema.check("disabled", &Value::Null), Ok(()));
        // undeclared props stay free-form
        assert_eq!(schema.check("tooltip", &json!(42)), Ok(()));
    }
}
