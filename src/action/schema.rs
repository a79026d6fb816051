//! Typed parameter declarations and their JSON Schema form.
//!
//! [`ParamSchema`] is what custom actions declare their inputs with. It maps to
//! JSON Schema and back; anything the mapping cannot represent is rejected with
//! a [`SchemaError`] instead of being approximated.

use schemars::JsonSchema;
use serde_json::{Map, Value, json};

use super::ActionParameters;

/// Nesting limit for `$ref` resolution.
const MAX_REF_DEPTH: usize = 32;

/// Validation keywords kept verbatim on a node.
///
/// `enum` lands here for every kind except strings, which model it directly.
const CONSTRAINT_KEYWORDS: &[&str] = &[
    "enum",
    "format",
    "pattern",
    "minLength",
    "maxLength",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minItems",
    "maxItems",
    "uniqueItems",
    "minProperties",
    "maxProperties",
    "additionalProperties",
];

/// Errors from converting between typed schemas and JSON Schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// A schema node was not a JSON object
    #[error("schema at '{0}' is not an object")]
    NotAnObject(String),
    /// The `type` keyword names something unknown
    #[error("unsupported type '{ty}' at '{path}'")]
    UnsupportedType { path: String, ty: String },
    /// A keyword or shape the mapping does not cover
    #[error("unsupported schema at '{path}': {reason}")]
    Unsupported { path: String, reason: String },
    /// A `$ref` that does not point into the root document's definitions
    #[error("unresolved reference '{0}'")]
    UnresolvedRef(String),
    /// `$ref` chains nested deeper than the limit, usually a recursive type
    #[error("reference depth exceeded at '{0}'")]
    RefDepthExceeded(String),
}

/// The shape of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// A string, optionally restricted to a set of values
    String { enum_values: Vec<String> },
    Number,
    Integer,
    Boolean,
    Null,
    Array(Box<ParamSchema>),
    Object(ObjectSchema),
    /// Matches any of the alternatives
    AnyOf(Vec<ParamSchema>),
    /// Matches exactly one of the alternatives
    OneOf(Vec<ParamSchema>),
    /// Matches all of the parts
    AllOf(Vec<ParamSchema>),
}

/// A typed parameter declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSchema {
    pub kind: ParamKind,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    /// The value is file content the platform uploads on the caller's behalf
    pub file_uploadable: bool,
    /// Validation keywords such as `pattern` or `minimum`, in source order
    pub constraints: Map<String, Value>,
}

/// A named member of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: ParamSchema,
    pub optional: bool,
}

impl Field {
    /// A field is required unless it is optional or has a default.
    pub fn is_required(&self) -> bool {
        !self.optional && self.schema.default.is_none()
    }
}

/// An object with ordered fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub fields: Vec<Field>,
}

impl ParamSchema {
    fn of(kind: ParamKind) -> Self {
        Self {
            kind,
            title: None,
            description: None,
            default: None,
            file_uploadable: false,
            constraints: Map::new(),
        }
    }

    pub fn string() -> Self {
        Self::of(ParamKind::String {
            enum_values: Vec::new(),
        })
    }

    /// A string restricted to the given values.
    pub fn string_enum<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(ParamKind::String {
            enum_values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn number() -> Self {
        Self::of(ParamKind::Number)
    }

    pub fn integer() -> Self {
        Self::of(ParamKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(ParamKind::Boolean)
    }

    pub fn null() -> Self {
        Self::of(ParamKind::Null)
    }

    pub fn array(items: ParamSchema) -> Self {
        Self::of(ParamKind::Array(Box::new(items)))
    }

    pub fn object(object: ObjectSchema) -> Self {
        Self::of(ParamKind::Object(object))
    }

    pub fn any_of(variants: Vec<ParamSchema>) -> Self {
        Self::of(ParamKind::AnyOf(variants))
    }

    pub fn one_of(variants: Vec<ParamSchema>) -> Self {
        Self::of(ParamKind::OneOf(variants))
    }

    pub fn all_of(parts: Vec<ParamSchema>) -> Self {
        Self::of(ParamKind::AllOf(parts))
    }

    /// Adds a validation keyword, e.g. `("maxLength", json!(64))`.
    pub fn with_constraint(mut self, keyword: impl Into<String>, value: Value) -> Self {
        self.constraints.insert(keyword.into(), value);
        self
    }

    /// Sets the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the title.
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets a default, which also makes the owning field not required.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Marks the value as uploadable file content.
    pub fn file_uploadable(mut self) -> Self {
        self.file_uploadable = true;
        self
    }

    /// Renders the declaration as JSON Schema.
    pub fn to_json_schema(&self) -> Value {
        let mut node = match &self.kind {
            ParamKind::String { enum_values } => {
                let mut node = json!({"type": "string"});
                if !enum_values.is_empty() {
                    node["enum"] = json!(enum_values);
                }
                node
            }
            ParamKind::Number => json!({"type": "number"}),
            ParamKind::Integer => json!({"type": "integer"}),
            ParamKind::Boolean => json!({"type": "boolean"}),
            ParamKind::Null => json!({"type": "null"}),
            ParamKind::Array(items) => json!({"type": "array", "items": items.to_json_schema()}),
            ParamKind::Object(object) => object.to_json_schema(),
            ParamKind::AnyOf(variants) => {
                json!({"anyOf": variants.iter().map(Self::to_json_schema).collect::<Vec<_>>()})
            }
            ParamKind::OneOf(variants) => {
                json!({"oneOf": variants.iter().map(Self::to_json_schema).collect::<Vec<_>>()})
            }
            ParamKind::AllOf(parts) => {
                json!({"allOf": parts.iter().map(Self::to_json_schema).collect::<Vec<_>>()})
            }
        };

        if let Value::Object(map) = &mut node {
            for (keyword, value) in &self.constraints {
                map.insert(keyword.clone(), value.clone());
            }
            if let Some(title) = &self.title {
                map.insert("title".to_string(), json!(title));
            }
            if let Some(description) = &self.description {
                map.insert("description".to_string(), json!(description));
            }
            if let Some(default) = &self.default {
                map.insert("default".to_string(), default.clone());
            }
            if self.file_uploadable {
                map.insert("file_uploadable".to_string(), Value::Bool(true));
            }
        }
        node
    }

    /// Parses JSON Schema into a declaration.
    ///
    /// `$ref` pointers into the document's `definitions` or `$defs` are inlined.
    pub fn from_json_schema(value: &Value) -> Result<Self, SchemaError> {
        Converter { root: value }.convert(value, "#", 0)
    }

    /// Derives the declaration of a Rust type through `schemars`.
    pub fn from_type<T: JsonSchema>() -> Result<Self, SchemaError> {
        let root = schemars::schema_for!(T);
        let value = serde_json::to_value(&root).map_err(|e| SchemaError::Unsupported {
            path: "#".to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_schema(&value)
    }
}

impl ObjectSchema {
    /// Creates an object with no fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a required field.
    pub fn field(mut self, name: impl Into<String>, schema: ParamSchema) -> Self {
        self.fields.push(Field {
            name: name.into(),
            schema,
            optional: false,
        });
        self
    }

    /// Appends an optional field.
    pub fn optional(mut self, name: impl Into<String>, schema: ParamSchema) -> Self {
        self.fields.push(Field {
            name: name.into(),
            schema,
            optional: true,
        });
        self
    }

    /// Names of required fields, in declaration order.
    pub fn required(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|field| field.is_required())
            .map(|field| field.name.clone())
            .collect()
    }

    /// Property schemas keyed by field name, in declaration order.
    pub fn properties(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|field| (field.name.clone(), field.schema.to_json_schema()))
            .collect()
    }

    fn to_json_schema(&self) -> Value {
        let mut node = json!({"type": "object", "properties": self.properties()});
        let required = self.required();
        if !required.is_empty() {
            node["required"] = json!(required);
        }
        node
    }

    /// Builds the parameter block advertised for an action.
    pub fn to_action_parameters(
        &self,
        title: impl Into<String>,
        description: Option<String>,
    ) -> ActionParameters {
        ActionParameters {
            title: Some(title.into()),
            description,
            required: self.required(),
            properties: self.properties(),
            ..Default::default()
        }
    }

    /// Parses an object-typed JSON Schema.
    pub fn from_json_schema(value: &Value) -> Result<Self, SchemaError> {
        match ParamSchema::from_json_schema(value)?.kind {
            ParamKind::Object(object) => Ok(object),
            _ => Err(SchemaError::Unsupported {
                path: "#".to_string(),
                reason: "expected an object schema".to_string(),
            }),
        }
    }

    /// Derives an object schema from a Rust struct through `schemars`.
    pub fn from_type<T: JsonSchema>() -> Result<Self, SchemaError> {
        match ParamSchema::from_type::<T>()?.kind {
            ParamKind::Object(object) => Ok(object),
            _ => Err(SchemaError::Unsupported {
                path: "#".to_string(),
                reason: "expected a struct".to_string(),
            }),
        }
    }
}

struct Converter<'a> {
    root: &'a Value,
}

impl Converter<'_> {
    fn convert(&self, value: &Value, path: &str, depth: usize) -> Result<ParamSchema, SchemaError> {
        let node = value
            .as_object()
            .ok_or_else(|| SchemaError::NotAnObject(path.to_string()))?;

        let mut schema = self.convert_kind(node, path, depth)?;

        // Metadata on a referring node wins over the referenced definition.
        if let Some(title) = node.get("title").and_then(Value::as_str) {
            schema.title = Some(title.to_string());
        }
        if let Some(description) = node.get("description").and_then(Value::as_str) {
            schema.description = Some(description.to_string());
        }
        if let Some(default) = node.get("default") {
            schema.default = Some(default.clone());
        }
        if node.get("file_uploadable").and_then(Value::as_bool) == Some(true) {
            schema.file_uploadable = true;
        }
        let string_kind = matches!(schema.kind, ParamKind::String { .. });
        for keyword in CONSTRAINT_KEYWORDS {
            if *keyword == "enum" && string_kind {
                continue;
            }
            if let Some(value) = node.get(*keyword) {
                schema.constraints.insert(keyword.to_string(), value.clone());
            }
        }
        Ok(schema)
    }

    fn convert_kind(
        &self,
        node: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Result<ParamSchema, SchemaError> {
        if let Some(reference) = node.get("$ref") {
            let reference = reference
                .as_str()
                .ok_or_else(|| SchemaError::UnresolvedRef(reference.to_string()))?;
            if depth >= MAX_REF_DEPTH {
                return Err(SchemaError::RefDepthExceeded(reference.to_string()));
            }
            let target = self.resolve(reference)?;
            return self.convert(target, reference, depth + 1);
        }

        match (node.get("anyOf"), node.get("oneOf")) {
            (Some(_), Some(_)) => {
                return Err(SchemaError::Unsupported {
                    path: path.to_string(),
                    reason: "both 'anyOf' and 'oneOf'".to_string(),
                });
            }
            (Some(variants), None) => {
                return Ok(ParamSchema::any_of(self.convert_list(variants, path, "anyOf", depth)?));
            }
            (None, Some(variants)) => {
                return Ok(ParamSchema::one_of(self.convert_list(variants, path, "oneOf", depth)?));
            }
            (None, None) => {}
        }

        if let Some(parts) = node.get("allOf") {
            let mut parts = self.convert_list(parts, path, "allOf", depth)?;
            if parts.len() == 1 {
                return Ok(parts.remove(0));
            }
            return Ok(ParamSchema::all_of(parts));
        }

        for keyword in ["not", "if", "const", "patternProperties"] {
            if node.contains_key(keyword) {
                return Err(SchemaError::Unsupported {
                    path: path.to_string(),
                    reason: format!("keyword '{}'", keyword),
                });
            }
        }

        match node.get("type") {
            Some(Value::String(ty)) => self.convert_typed(ty, node, path, depth),
            Some(Value::Array(types)) => {
                let variants = types
                    .iter()
                    .map(|ty| match ty.as_str() {
                        Some(ty) => self.convert_typed(ty, node, path, depth),
                        None => Err(SchemaError::UnsupportedType {
                            path: path.to_string(),
                            ty: ty.to_string(),
                        }),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                match variants.len() {
                    1 => Ok(variants.into_iter().next().unwrap_or_else(ParamSchema::null)),
                    _ => Ok(ParamSchema::any_of(variants)),
                }
            }
            Some(other) => Err(SchemaError::UnsupportedType {
                path: path.to_string(),
                ty: other.to_string(),
            }),
            None if node.contains_key("properties") => {
                self.convert_typed("object", node, path, depth)
            }
            None if node.contains_key("enum") => self.convert_typed("string", node, path, depth),
            None => Err(SchemaError::Unsupported {
                path: path.to_string(),
                reason: "no type".to_string(),
            }),
        }
    }

    fn convert_typed(
        &self,
        ty: &str,
        node: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Result<ParamSchema, SchemaError> {
        match ty {
            "string" => {
                let enum_values = match node.get("enum") {
                    None => Vec::new(),
                    Some(Value::Array(values)) => values
                        .iter()
                        .map(|value| {
                            value.as_str().map(str::to_string).ok_or_else(|| {
                                SchemaError::Unsupported {
                                    path: path.to_string(),
                                    reason: format!("non-string enum value {}", value),
                                }
                            })
                        })
                        .collect::<Result<_, _>>()?,
                    Some(other) => {
                        return Err(SchemaError::Unsupported {
                            path: path.to_string(),
                            reason: format!("enum must be an array, got {}", other),
                        });
                    }
                };
                Ok(ParamSchema::string_enum(enum_values))
            }
            "number" => Ok(ParamSchema::number()),
            "integer" => Ok(ParamSchema::integer()),
            "boolean" => Ok(ParamSchema::boolean()),
            "null" => Ok(ParamSchema::null()),
            "array" => match node.get("items") {
                Some(items @ Value::Object(_)) => {
                    let items = self.convert(items, &format!("{}/items", path), depth)?;
                    Ok(ParamSchema::array(items))
                }
                Some(_) => Err(SchemaError::Unsupported {
                    path: path.to_string(),
                    reason: "tuple arrays".to_string(),
                }),
                None => Err(SchemaError::Unsupported {
                    path: path.to_string(),
                    reason: "array without items".to_string(),
                }),
            },
            "object" => self.convert_object(node, path, depth).map(ParamSchema::object),
            other => Err(SchemaError::UnsupportedType {
                path: path.to_string(),
                ty: other.to_string(),
            }),
        }
    }

    fn convert_object(
        &self,
        node: &Map<String, Value>,
        path: &str,
        depth: usize,
    ) -> Result<ObjectSchema, SchemaError> {
        if let Some(Value::Object(_)) = node.get("additionalProperties") {
            return Err(SchemaError::Unsupported {
                path: path.to_string(),
                reason: "map-typed additionalProperties".to_string(),
            });
        }

        let required: Vec<&str> = node
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut object = ObjectSchema::new();
        if let Some(properties) = node.get("properties") {
            let properties = properties
                .as_object()
                .ok_or_else(|| SchemaError::NotAnObject(format!("{}/properties", path)))?;
            for (name, property) in properties {
                let schema =
                    self.convert(property, &format!("{}/properties/{}", path, name), depth)?;
                object.fields.push(Field {
                    name: name.clone(),
                    schema,
                    optional: !required.contains(&name.as_str()),
                });
            }
        }
        Ok(object)
    }

    fn convert_list(
        &self,
        value: &Value,
        path: &str,
        keyword: &str,
        depth: usize,
    ) -> Result<Vec<ParamSchema>, SchemaError> {
        let items = value.as_array().ok_or_else(|| SchemaError::Unsupported {
            path: path.to_string(),
            reason: format!("'{}' must be an array", keyword),
        })?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.convert(item, &format!("{}/{}/{}", path, keyword, i), depth))
            .collect()
    }

    fn resolve(&self, reference: &str) -> Result<&Value, SchemaError> {
        let name = reference
            .strip_prefix("#/definitions/")
            .map(|name| ("definitions", name))
            .or_else(|| reference.strip_prefix("#/$defs/").map(|name| ("$defs", name)));

        name.and_then(|(section, name)| self.root.get(section)?.get(name))
            .ok_or_else(|| SchemaError::UnresolvedRef(reference.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_primitives_map_to_json_schema() {
        assert_eq!(ParamSchema::string().to_json_schema(), json!({"type": "string"}));
        assert_eq!(ParamSchema::number().to_json_schema(), json!({"type": "number"}));
        assert_eq!(ParamSchema::integer().to_json_schema(), json!({"type": "integer"}));
        assert_eq!(ParamSchema::boolean().to_json_schema(), json!({"type": "boolean"}));
        assert_eq!(ParamSchema::null().to_json_schema(), json!({"type": "null"}));
        assert_eq!(
            ParamSchema::string_enum(["asc", "desc"]).to_json_schema(),
            json!({"type": "string", "enum": ["asc", "desc"]})
        );
    }

    #[test]
    fn test_primitives_parse_from_json_schema() {
        for (ty, expected) in [
            ("string", ParamSchema::string()),
            ("number", ParamSchema::number()),
            ("integer", ParamSchema::integer()),
            ("boolean", ParamSchema::boolean()),
            ("null", ParamSchema::null()),
        ] {
            assert_eq!(ParamSchema::from_json_schema(&json!({"type": ty})).unwrap(), expected);
        }
    }

    #[test]
    fn test_object_preserves_field_order_and_required() {
        let object = ObjectSchema::new()
            .field("repo", ParamSchema::string().describe("Repository name"))
            .field("owner", ParamSchema::string())
            .optional("note", ParamSchema::string())
            .field("count", ParamSchema::integer().with_default(json!(1)));

        assert_eq!(object.required(), vec!["repo", "owner"]);

        let params = object.to_action_parameters("starRepo", Some("Star it".to_string()));
        let keys: Vec<&String> = params.properties.keys().collect();
        assert_eq!(keys, vec!["repo", "owner", "note", "count"]);
        assert_eq!(params.title.as_deref(), Some("starRepo"));
        assert_eq!(params.schema_type, "object");
        assert_eq!(params.properties["repo"]["description"], "Repository name");
        assert_eq!(params.properties["count"]["default"], 1);
    }

    #[test]
    fn test_nested_object_and_array() {
        let schema = ParamSchema::object(
            ObjectSchema::new().field(
                "labels",
                ParamSchema::array(ParamSchema::object(
                    ObjectSchema::new().field("name", ParamSchema::string()),
                )),
            ),
        );

        let value = schema.to_json_schema();
        assert_eq!(value["properties"]["labels"]["type"], "array");
        assert_eq!(
            value["properties"]["labels"]["items"]["required"],
            json!(["name"])
        );
        assert_eq!(ParamSchema::from_json_schema(&value).unwrap(), schema);
    }

    #[test]
    fn test_any_of_and_all_of() {
        let any = ParamSchema::any_of(vec![ParamSchema::string(), ParamSchema::integer()]);
        assert_eq!(
            any.to_json_schema(),
            json!({"anyOf": [{"type": "string"}, {"type": "integer"}]})
        );
        assert_eq!(ParamSchema::from_json_schema(&any.to_json_schema()).unwrap(), any);

        let all = ParamSchema::all_of(vec![
            ParamSchema::object(ObjectSchema::new().field("a", ParamSchema::string())),
            ParamSchema::object(ObjectSchema::new().field("b", ParamSchema::number())),
        ]);
        assert_eq!(ParamSchema::from_json_schema(&all.to_json_schema()).unwrap(), all);
    }

    #[test]
    fn test_one_of_keeps_exclusivity() {
        let value = json!({"oneOf": [{"type": "string"}, {"type": "integer"}]});
        let parsed = ParamSchema::from_json_schema(&value).unwrap();
        assert_eq!(
            parsed,
            ParamSchema::one_of(vec![ParamSchema::string(), ParamSchema::integer()])
        );
        assert_eq!(parsed.to_json_schema(), value);

        assert!(matches!(
            ParamSchema::from_json_schema(&json!({"anyOf": [{"type": "string"}], "oneOf": [{"type": "null"}]})),
            Err(SchemaError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_enum_on_non_string_types_round_trips() {
        let value = json!({"type": "integer", "enum": [1, 2]});
        let parsed = ParamSchema::from_json_schema(&value).unwrap();
        assert_eq!(parsed.kind, ParamKind::Integer);
        assert_eq!(parsed.constraints["enum"], json!([1, 2]));
        assert_eq!(parsed.to_json_schema(), value);

        let strings = ParamSchema::from_json_schema(&json!({"type": "string", "enum": ["a"]})).unwrap();
        assert_eq!(strings, ParamSchema::string_enum(["a"]));
        assert!(strings.constraints.is_empty());
    }

    #[test]
    fn test_string_constraints_round_trip() {
        let value = json!({"type": "string", "pattern": "^a$", "maxLength": 3, "format": "email"});
        let parsed = ParamSchema::from_json_schema(&value).unwrap();
        assert_eq!(
            parsed,
            ParamSchema::string()
                .with_constraint("pattern", json!("^a$"))
                .with_constraint("maxLength", json!(3))
                .with_constraint("format", json!("email"))
        );
        assert_eq!(parsed.to_json_schema(), value);
    }

    #[test]
    fn test_numeric_and_array_constraints_round_trip() {
        let value = json!({
            "type": "array",
            "items": {"type": "number", "minimum": 0, "exclusiveMaximum": 10},
            "minItems": 1,
            "uniqueItems": true
        });
        let parsed = ParamSchema::from_json_schema(&value).unwrap();
        let ParamKind::Array(items) = &parsed.kind else {
            panic!("expected array, got {:?}", parsed.kind);
        };
        assert_eq!(items.constraints["minimum"], 0);
        assert_eq!(parsed.constraints["minItems"], 1);
        assert_eq!(parsed.to_json_schema(), value);
    }

    #[test]
    fn test_type_array_becomes_any_of() {
        let parsed = ParamSchema::from_json_schema(&json!({"type": ["string", "null"]})).unwrap();
        assert_eq!(
            parsed,
            ParamSchema::any_of(vec![ParamSchema::string(), ParamSchema::null()])
        );
    }

    #[test]
    fn test_file_uploadable_marker_round_trips() {
        let schema = ParamSchema::string().file_uploadable().titled("Attachment");
        let value = schema.to_json_schema();
        assert_eq!(value["file_uploadable"], true);
        assert_eq!(ParamSchema::from_json_schema(&value).unwrap(), schema);
    }

    #[test]
    fn test_unsupported_shapes_are_errors() {
        assert!(matches!(
            ParamSchema::from_json_schema(&json!({"type": "date"})),
            Err(SchemaError::UnsupportedType { .. })
        ));
        assert!(matches!(
            ParamSchema::from_json_schema(&json!({"type": "array"})),
            Err(SchemaError::Unsupported { .. })
        ));
        assert!(matches!(
            ParamSchema::from_json_schema(&json!({"type": "object", "additionalProperties": {"type": "string"}})),
            Err(SchemaError::Unsupported { .. })
        ));
        assert!(matches!(
            ParamSchema::from_json_schema(&json!({"not": {"type": "string"}})),
            Err(SchemaError::Unsupported { .. })
        ));
        assert!(matches!(
            ParamSchema::from_json_schema(&json!({"$ref": "#/definitions/Missing"})),
            Err(SchemaError::UnresolvedRef(_))
        ));
        assert!(matches!(
            ParamSchema::from_json_schema(&json!(true)),
            Err(SchemaError::NotAnObject(_))
        ));
    }

    #[test]
    fn test_recursive_ref_is_bounded() {
        let schema = json!({
            "$ref": "#/definitions/Node",
            "definitions": {
                "Node": {
                    "type": "object",
                    "required": ["next"],
                    "properties": {"next": {"$ref": "#/definitions/Node"}}
                }
            }
        });
        assert!(matches!(
            ParamSchema::from_json_schema(&schema),
            Err(SchemaError::RefDepthExceeded(_))
        ));
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Owner {
        login: String,
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct StarRepoInput {
        /// Repository owner
        owner: Owner,
        repo: String,
        note: Option<String>,
    }

    #[test]
    fn test_from_type_inlines_definitions() {
        let object = ObjectSchema::from_type::<StarRepoInput>().unwrap();

        let names: Vec<&str> = object.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["owner", "repo", "note"]);
        assert_eq!(object.required(), vec!["owner", "repo"]);

        let owner = &object.fields[0].schema;
        assert_eq!(owner.description.as_deref(), Some("Repository owner"));
        match &owner.kind {
            ParamKind::Object(inner) => assert_eq!(inner.required(), vec!["login"]),
            other => panic!("expected object, got {:?}", other),
        }
    }
}
