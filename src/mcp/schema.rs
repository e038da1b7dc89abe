//! Input schema generation for tools.
//!
//! A tool's input type declares its fields explicitly as a list of
//! [`InputField`]s. Each field carries a [`TypeDescriptor`] which maps to one
//! of the JSON Schema primitive types. Schema generation is a pure function
//! over that list; no runtime reflection is involved.
//!
//! # Example
//!
//! ```
//! use mcp_tool_server::mcp::schema::{input_schema, InputField};
//!
//! let fields = vec![
//!     InputField::new::<String>("query").describe("Search text").required(),
//!     InputField::new::<Option<u32>>("max_results"),
//! ];
//! let schema = input_schema(&fields);
//! assert_eq!(schema["properties"]["maxResults"]["type"], "integer");
//! assert_eq!(schema["required"][0], "query");
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

/// Shape of a field's Rust type, as far as JSON Schema cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// Text.
    String,
    /// Any integer width.
    Integer,
    /// Floating point.
    Number,
    /// Boolean.
    Boolean,
    /// Sequence of the inner type.
    Array(Box<TypeDescriptor>),
    /// String-keyed map.
    Map,
    /// Nested struct or arbitrary JSON.
    Object,
    /// `Option<T>`; unwrapped before mapping.
    Nullable(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Strips any number of nullable wrappers.
    #[must_use]
    pub fn underlying(&self) -> &Self {
        match self {
            Self::Nullable(inner) => inner.underlying(),
            other => other,
        }
    }
}

/// JSON Schema primitive type names used in generated schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    /// `"string"`
    String,
    /// `"integer"`
    Integer,
    /// `"number"`
    Number,
    /// `"boolean"`
    Boolean,
    /// `"array"`
    Array,
    /// `"object"`
    Object,
}

impl JsonType {
    /// Returns the JSON Schema name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// Maps a type descriptor to its JSON Schema type.
#[must_use]
pub fn json_type(descriptor: &TypeDescriptor) -> JsonType {
    match descriptor.underlying() {
        TypeDescriptor::String => JsonType::String,
        TypeDescriptor::Integer => JsonType::Integer,
        TypeDescriptor::Number => JsonType::Number,
        TypeDescriptor::Boolean => JsonType::Boolean,
        TypeDescriptor::Array(_) => JsonType::Array,
        TypeDescriptor::Map | TypeDescriptor::Object | TypeDescriptor::Nullable(_) => {
            JsonType::Object
        }
    }
}

/// Rust types that can describe themselves for schema generation.
pub trait DescribeType {
    /// Returns the descriptor for this type.
    fn descriptor() -> TypeDescriptor;
}

macro_rules! describe_as {
    ($variant:ident: $($ty:ty),+ $(,)?) => {
        $(
            impl DescribeType for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::$variant
                }
            }
        )+
    };
}

describe_as!(String: String, char);
describe_as!(Integer: i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
describe_as!(Number: f32, f64);
describe_as!(Boolean: bool);
describe_as!(Object: Value);

impl<T: DescribeType> DescribeType for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Nullable(Box::new(T::descriptor()))
    }
}

impl<T: DescribeType> DescribeType for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Array(Box::new(T::descriptor()))
    }
}

impl<V, S> DescribeType for HashMap<String, V, S> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Map
    }
}

impl<V> DescribeType for BTreeMap<String, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Map
    }
}

/// One declared field of a tool's input type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputField {
    /// Field name as written in Rust; camel-cased on the wire.
    pub name: String,
    /// Type shape.
    pub descriptor: TypeDescriptor,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Whether the field must be present.
    pub required: bool,
}

impl InputField {
    /// Declares an optional field of type `T`.
    #[must_use]
    pub fn new<T: DescribeType>(name: impl Into<String>) -> Self {
        Self::with_descriptor(name, T::descriptor())
    }

    /// Declares an optional field with an explicit descriptor.
    #[must_use]
    pub fn with_descriptor(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
            description: None,
            required: false,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Name of the property in the generated schema.
    #[must_use]
    pub fn wire_name(&self) -> String {
        to_camel_case(&self.name)
    }
}

/// A deserialisable tool input with an explicit field list.
///
/// Implementors should use `#[serde(rename_all = "camelCase")]` so the
/// accepted argument names match the generated schema.
pub trait ToolInput: DeserializeOwned + Send + 'static {
    /// Returns the declared fields, in schema order.
    fn fields() -> Vec<InputField>;
}

/// The declared input type of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputType {
    /// Rust type name, for logs and diagnostics.
    pub type_name: &'static str,
    /// Declared fields.
    pub fields: Vec<InputField>,
}

impl InputType {
    /// Captures the input type of `T`.
    #[must_use]
    pub fn of<T: ToolInput>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            fields: T::fields(),
        }
    }

    /// Generates the input schema for this type.
    #[must_use]
    pub fn schema(&self) -> Value {
        input_schema(&self.fields)
    }
}

/// Schema for a tool that takes no input.
#[must_use]
pub fn empty_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

/// Generates an object schema from a field list.
///
/// `required` is only emitted when at least one field is required.
#[must_use]
pub fn input_schema(fields: &[InputField]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in fields {
        let wire_name = field.wire_name();
        let mut property = Map::new();
        property.insert(
            "type".to_string(),
            Value::from(json_type(&field.descriptor).as_str()),
        );
        if let Some(description) = &field.description {
            property.insert("description".to_string(), Value::from(description.as_str()));
        }
        if field.required {
            required.push(Value::from(wire_name.as_str()));
        }
        properties.insert(wire_name, Value::Object(property));
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::from("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    Value::Object(schema)
}

/// Converts `snake_case` or `PascalCase` to `camelCase`.
#[must_use]
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;

    for ch in name.chars() {
        if ch == '_' {
            // leading underscores are kept
            if out.is_empty() {
                out.push(ch);
            } else {
                upper_next = true;
            }
            continue;
        }
        if out.is_empty() || out.chars().all(|c| c == '_') {
            out.extend(ch.to_lowercase());
        } else if upper_next {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        upper_next = false;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_conversion() {
        assert_eq!(to_camel_case("message"), "message");
        assert_eq!(to_camel_case("max_results"), "maxResults");
        assert_eq!(to_camel_case("Query"), "query");
        assert_eq!(to_camel_case("FilePath"), "filePath");
        assert_eq!(to_camel_case("already_camelCase"), "alreadyCamelCase");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn primitive_type_mapping() {
        assert_eq!(json_type(&String::descriptor()), JsonType::String);
        assert_eq!(json_type(&i64::descriptor()), JsonType::Integer);
        assert_eq!(json_type(&u8::descriptor()), JsonType::Integer);
        assert_eq!(json_type(&f32::descriptor()), JsonType::Number);
        assert_eq!(json_type(&bool::descriptor()), JsonType::Boolean);
        assert_eq!(json_type(&Vec::<String>::descriptor()), JsonType::Array);
        assert_eq!(
            json_type(&HashMap::<String, i32>::descriptor()),
            JsonType::Object
        );
        assert_eq!(json_type(&Value::descriptor()), JsonType::Object);
    }

    #[test]
    fn nullable_unwraps_to_underlying() {
        assert_eq!(json_type(&Option::<i32>::descriptor()), JsonType::Integer);
        assert_eq!(
            json_type(&Option::<Option<bool>>::descriptor()),
            JsonType::Boolean
        );
        assert_eq!(
            json_type(&Option::<Vec<f64>>::descriptor()),
            JsonType::Array
        );
    }

    #[test]
    fn empty_schema_shape() {
        assert_eq!(empty_schema(), json!({"type": "object", "properties": {}}));
        assert_eq!(input_schema(&[]), empty_schema());
    }

    #[test]
    fn schema_properties_and_required() {
        let fields = vec![
            InputField::new::<String>("query")
                .describe("The search query")
                .required(),
            InputField::new::<Option<u32>>("max_results"),
            InputField::new::<Vec<String>>("tags"),
        ];
        let schema = input_schema(&fields);

        assert_eq!(schema["type"], "object");
        assert_eq!(
            schema["properties"]["query"],
            json!({"type": "string", "description": "The search query"})
        );
        assert_eq!(schema["properties"]["maxResults"], json!({"type": "integer"}));
        assert_eq!(schema["properties"]["tags"], json!({"type": "array"}));
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn required_omitted_when_nothing_required() {
        let schema = input_schema(&[InputField::new::<bool>("verbose")]);
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn input_type_of_uses_declared_fields() {
        #[derive(serde::Deserialize)]
        #[allow(dead_code)]
        struct Search {
            query: String,
        }

        impl ToolInput for Search {
            fn fields() -> Vec<InputField> {
                vec![InputField::new::<String>("query").required()]
            }
        }

        let input = InputType::of::<Search>();
        assert!(input.type_name.ends_with("Search"));
        assert_eq!(input.schema()["required"], json!(["query"]));
    }
}
