//! Field projection from desired state into remote request payloads.
//!
//! Projection is pure: it never touches the network and yields identical
//! output for identical input. Attributes the caller did not set are never
//! emitted, so server-side defaults stay in charge. Problems that must not
//! abort a request (malformed `inputs`, unexpected cloud specific values)
//! are returned as [`Diagnostic`]s next to the payload.

mod inputs;

use serde_json::Value;
use tracing::warn;

use crate::fields::{Fields, retain_set};
use crate::schema::{
    CLOUD_ATTRIBUTE_KEYS, CLOUD_HREF, CLOUD_SPECIFIC_ATTRIBUTES, CREATE_FIELDS, DERIVED_FIELDS,
    INPUTS, INSTANCE, UPDATE_FIELDS, allowed_cloud_values,
};

pub use inputs::InputsError;

/// Read access to the attributes of a desired-state source.
pub trait FieldSource {
    /// Returns the value of `name` when the caller set it.
    fn lookup(&self, name: &str) -> Option<&Value>;
}

impl FieldSource for Fields {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name).filter(|value| !value.is_null())
    }
}

/// Allow-list used for one kind of request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProjectionProfile {
    /// Short label used in logs.
    pub name: &'static str,
    /// Scalar and collection attributes copied when present.
    pub fields: &'static [&'static str],
    /// Whether the creation-only `inputs` list is converted and sent.
    pub accepts_inputs: bool,
}

/// Launching a raw instance.
pub const CREATE_PROFILE: ProjectionProfile = ProjectionProfile {
    name: "create",
    fields: CREATE_FIELDS,
    accepts_inputs: false,
};

/// Updating an existing instance.
pub const UPDATE_PROFILE: ProjectionProfile = ProjectionProfile {
    name: "update",
    fields: UPDATE_FIELDS,
    accepts_inputs: false,
};

/// The `instance` block of derived resource kinds (servers, server arrays).
pub const DERIVED_PROFILE: ProjectionProfile = ProjectionProfile {
    name: "derived",
    fields: DERIVED_FIELDS,
    accepts_inputs: true,
};

/// Soft failure recorded during projection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    /// Attribute the diagnostic refers to.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Payload produced by [`project`].
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    cloud_href: Option<Value>,
    instance: Fields,
    diagnostics: Vec<Diagnostic>,
}

impl Projection {
    /// Returns the request shape `{"cloud_href": .., "instance": {..}}`.
    ///
    /// `cloud_href` is omitted when the source does not set it.
    #[must_use]
    pub fn request(&self) -> Fields {
        let mut request = Fields::new();
        if let Some(cloud_href) = &self.cloud_href {
            request.insert(String::from(CLOUD_HREF), cloud_href.clone());
        }
        request.insert(
            String::from(INSTANCE),
            Value::Object(self.instance.clone()),
        );
        request
    }

    /// Returns the flat projected attributes.
    #[must_use]
    pub const fn instance(&self) -> &Fields {
        &self.instance
    }

    /// Consumes the projection, returning the flat projected attributes.
    #[must_use]
    pub fn into_instance(self) -> Fields {
        self.instance
    }

    /// Returns the soft failures recorded while projecting.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Projects `source` through `profile`.
pub fn project<S>(source: &S, profile: &ProjectionProfile) -> Projection
where
    S: FieldSource + ?Sized,
{
    let mut instance = Fields::new();
    let mut diagnostics = Vec::new();

    for field in profile.fields {
        if let Some(value) = source.lookup(field) {
            instance.insert((*field).to_owned(), value.clone());
        }
    }

    if let Some(block) = source.lookup(CLOUD_SPECIFIC_ATTRIBUTES) {
        match collapse_singleton(block) {
            Ok(Some(attributes)) => {
                diagnostics.extend(check_cloud_attributes(&attributes));
                instance.insert(
                    String::from(CLOUD_SPECIFIC_ATTRIBUTES),
                    Value::Object(attributes),
                );
            }
            Ok(None) => {}
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    if profile.accepts_inputs {
        project_inputs(source, &mut instance, &mut diagnostics);
    }

    for diagnostic in &diagnostics {
        warn!(
            profile = profile.name,
            field = %diagnostic.field,
            "{}",
            diagnostic.message
        );
    }

    Projection {
        cloud_href: source.lookup(CLOUD_HREF).cloned(),
        instance,
        diagnostics,
    }
}

fn project_inputs<S>(source: &S, instance: &mut Fields, diagnostics: &mut Vec<Diagnostic>)
where
    S: FieldSource + ?Sized,
{
    let Some(raw) = source.lookup(INPUTS) else {
        return;
    };
    let Some(entries) = raw.as_array() else {
        diagnostics.push(Diagnostic::new(INPUTS, "inputs must be a list of maps"));
        return;
    };
    if entries.is_empty() {
        return;
    }
    match inputs::convert(entries) {
        Ok(converted) => {
            instance.insert(String::from(INPUTS), converted);
        }
        Err(err) => diagnostics.push(Diagnostic::new(INPUTS, err.to_string())),
    }
}

/// Collapses the singleton list used for the nested block into one object.
fn collapse_singleton(block: &Value) -> Result<Option<Fields>, Diagnostic> {
    let element = match block {
        Value::Array(items) => match items.first() {
            Some(first) => first,
            None => return Ok(None),
        },
        other => other,
    };
    element.as_object().map_or_else(
        || {
            Err(Diagnostic::new(
                CLOUD_SPECIFIC_ATTRIBUTES,
                "cloud_specific_attributes must be a single block",
            ))
        },
        |attributes| Ok(Some(retain_set(attributes))),
    )
}

fn check_cloud_attributes(attributes: &Fields) -> Vec<Diagnostic> {
    let mut found = Vec::new();
    for (key, value) in attributes {
        if !CLOUD_ATTRIBUTE_KEYS.contains(&key.as_str()) {
            found.push(Diagnostic::new(
                CLOUD_SPECIFIC_ATTRIBUTES,
                format!("unknown cloud specific attribute '{key}'"),
            ));
            continue;
        }
        let Some(allowed) = allowed_cloud_values(key) else {
            continue;
        };
        if !value.as_str().is_some_and(|text| allowed.contains(&text)) {
            found.push(Diagnostic::new(
                CLOUD_SPECIFIC_ATTRIBUTES,
                format!("{key} must be one of {}, got {value}", allowed.join(", ")),
            ));
        }
    }
    found
}
