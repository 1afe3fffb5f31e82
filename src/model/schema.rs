//! Declared schemas for the provider block and the namespace resource.

use serde::Serialize;

use super::spec::{ATTR_DESCRIPTION, ATTR_NAME, ATTR_OWNER_EMAIL};

/// Type name under which namespaces are declared.
pub const NAMESPACE_TYPE_NAME: &str = "temporal_namespace";

/// The type of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
    /// A boolean value.
    Bool,
    /// An ordered list of strings.
    StringList,
}

/// How an attribute may be used in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AttributeFlags {
    /// Must be set in configuration.
    pub required: bool,
    /// May be set in configuration.
    pub optional: bool,
    /// Filled in from the remote side.
    pub computed: bool,
}

/// One attribute of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: &'static str,
    /// Value type.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Usage flags.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description.
    pub description: &'static str,
}

/// An ordered set of attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    /// Type name of the described block.
    pub type_name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Attributes in declaration order.
    pub attributes: Vec<Attribute>,
}

impl AttributeFlags {
    const fn required() -> Self {
        Self {
            required: true,
            optional: false,
            computed: false,
        }
    }

    const fn optional_computed() -> Self {
        Self {
            required: false,
            optional: true,
            computed: true,
        }
    }

    const fn computed() -> Self {
        Self {
            required: false,
            optional: false,
            computed: true,
        }
    }
}

impl Attribute {
    const fn new(
        name: &'static str,
        attr_type: AttributeType,
        flags: AttributeFlags,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            attr_type,
            flags,
            description,
        }
    }
}

impl Schema {
    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Names of the attributes filled in by the remote side only.
    #[must_use]
    pub fn computed_only(&self) -> Vec<&'static str> {
        self.attributes
            .iter()
            .filter(|a| a.flags.computed && !a.flags.optional)
            .map(|a| a.name)
            .collect()
    }
}

/// Schema of the provider configuration block.
#[must_use]
pub fn provider_schema() -> Schema {
    use AttributeType::String;

    Schema {
        type_name: "temporal",
        description: "Temporal frontend connection",
        attributes: vec![
            Attribute::new("host", String, AttributeFlags::required(), "Temporal Frontend Host"),
            Attribute::new("port", String, AttributeFlags::required(), "Temporal Frontend Port"),
        ],
    }
}

/// Schema of the namespace resource.
#[must_use]
pub fn namespace_schema() -> Schema {
    use AttributeType::{Bool, Int64, String, StringList};

    let computed = AttributeFlags::computed();

    Schema {
        type_name: NAMESPACE_TYPE_NAME,
        description: "Temporal Namespace resource",
        attributes: vec![
            Attribute::new(ATTR_NAME, String, AttributeFlags::required(), "Namespace name"),
            Attribute::new("id", String, computed, "Namespace identifier"),
            Attribute::new(
                ATTR_DESCRIPTION,
                String,
                AttributeFlags::optional_computed(),
                "Namespace Description. Cannot be cleared once set",
            ),
            Attribute::new(
                ATTR_OWNER_EMAIL,
                String,
                AttributeFlags::optional_computed(),
                "Namespace Owner Email. Cannot be cleared once set",
            ),
            Attribute::new("state", String, computed, "State of Namespace"),
            Attribute::new("active_cluster_name", String, computed, "Active Cluster Name"),
            Attribute::new("clusters", StringList, computed, "Temporal Clusters"),
            Attribute::new(
                "history_archival_state",
                String,
                computed,
                "History Archival State",
            ),
            Attribute::new(
                "visibility_archival_state",
                String,
                computed,
                "Visibility Archival State",
            ),
            Attribute::new("is_global_namespace", Bool, computed, "Namespace is Global"),
            Attribute::new("failover_version", Int64, computed, "Failover Version"),
            Attribute::new("failover_history", StringList, computed, "Failover History"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample_state;

    #[test]
    fn test_namespace_schema_flags() {
        let schema = namespace_schema();

        let name = schema.attribute("name").expect("name attribute");
        assert!(name.flags.required);

        let description = schema.attribute("description").expect("description attribute");
        assert!(description.flags.optional && description.flags.computed);
        assert!(description.description.contains("Cannot be cleared"));

        assert!(!schema.computed_only().contains(&"owner_email"));
        assert!(schema.computed_only().contains(&"failover_history"));
    }

    #[test]
    fn test_state_attributes_match_schema() {
        let schema = namespace_schema();
        let attributes = sample_state("billing").to_attributes();
        let rendered = attributes.as_object().expect("object");

        assert_eq!(rendered.len(), schema.attributes.len());
        for attribute in &schema.attributes {
            assert!(rendered.contains_key(attribute.name), "missing {}", attribute.name);
        }
    }

    #[test]
    fn test_provider_schema_serializes_flags_inline() {
        let json = serde_json::to_value(provider_schema()).expect("serialize");

        assert_eq!(json["attributes"][0]["name"], "host");
        assert_eq!(json["attributes"][0]["type"], "string");
        assert_eq!(json["attributes"][0]["required"], true);
    }
}
