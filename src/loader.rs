//! Reading the documents a form is composed from.
//!
//! A form takes up to four files: the data schema, the UI schema overlay,
//! the form data and the error tree. Only the schema is mandatory; a missing
//! optional file reads as the empty document of its kind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::error::ResolveError;
use crate::error_schema::ErrorSchema;
use crate::id_schema::to_id_schema;
use crate::registry::Registry;
use crate::resolver::definitions_of;
use crate::schema_field::FormInputs;
use crate::ui_schema::UiSchema;

/// Where the documents of one form live.
#[derive(Debug, Clone, Default)]
pub struct FormFiles {
    pub schema: PathBuf,
    pub ui_schema: Option<PathBuf>,
    pub form_data: Option<PathBuf>,
    pub errors: Option<PathBuf>,
}

impl FormFiles {
    pub fn new(schema: impl Into<PathBuf>) -> Self {
        Self {
            schema: schema.into(),
            ..Self::default()
        }
    }

    pub fn ui_schema(mut self, path: Option<PathBuf>) -> Self {
        self.ui_schema = path;
        self
    }

    pub fn form_data(mut self, path: Option<PathBuf>) -> Self {
        self.form_data = path;
        self
    }

    pub fn errors(mut self, path: Option<PathBuf>) -> Self {
        self.errors = path;
        self
    }
}

/// The parsed documents of one form.
#[derive(Debug, Clone)]
pub struct FormDocuments {
    pub schema: Value,
    pub ui_schema: UiSchema,
    pub form_data: Value,
    pub error_schema: ErrorSchema,
}

impl FormDocuments {
    /// Read and parse every document named in `files`.
    ///
    /// # Errors
    ///
    /// Returns the first read, JSON or error-tree failure, in the order
    /// schema, UI schema, form data, errors.
    pub fn load(files: &FormFiles) -> Result<Self, ResolveError> {
        let schema = read_document(&files.schema)?;
        let ui_schema = read_ui_schema(files.ui_schema.as_deref())?;
        let form_data = read_optional(files.form_data.as_deref())?;
        let error_schema = read_error_schema(files.errors.as_deref())?;
        log::debug!(
            "loaded form from {} ({} error(s))",
            files.schema.display(),
            error_schema.len()
        );

        Ok(Self {
            schema,
            ui_schema,
            form_data,
            error_schema,
        })
    }

    /// Turn the documents into render inputs.
    ///
    /// The registry's definitions table is collected from the schema and the
    /// identity schema is rooted at `id_prefix`.
    ///
    /// # Errors
    ///
    /// Returns a reference error raised while building the identity schema.
    pub fn into_inputs(self, id_prefix: &str) -> Result<FormInputs, ResolveError> {
        let registry = Registry::builder()
            .definitions(definitions_of(&self.schema))
            .build();
        let id_schema = to_id_schema(
            &self.schema,
            id_prefix,
            &registry.resolver(),
            &self.form_data,
        )?;

        Ok(FormInputs::new(self.schema, Arc::new(registry))
            .ui_schema(self.ui_schema)
            .form_data(self.form_data)
            .error_schema(self.error_schema)
            .id_schema(id_schema))
    }
}

/// Read one JSON document.
///
/// # Errors
///
/// `FileNotFound` when nothing exists at `path`, `ReadError` for other IO
/// failures and `InvalidJson` when the content does not parse.
pub fn read_document(path: &Path) -> Result<Value, ResolveError> {
    let content = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ResolveError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => ResolveError::ReadError {
            path: path.to_path_buf(),
            source,
        },
    })?;
    parse_document(&content)
}

/// Parse one JSON document from text.
///
/// # Errors
///
/// Returns `ResolveError::InvalidJson` if the text is not JSON.
pub fn parse_document(content: &str) -> Result<Value, ResolveError> {
    serde_json::from_str(content).map_err(|source| ResolveError::InvalidJson { source })
}

/// Read an optional document. No path reads as `null`.
///
/// # Errors
///
/// Same as [`read_document`].
pub fn read_optional(path: Option<&Path>) -> Result<Value, ResolveError> {
    path.map_or(Ok(Value::Null), read_document)
}

/// Read a UI schema overlay. No path, or a `null` document, is the empty overlay.
///
/// # Errors
///
/// Same as [`read_document`].
pub fn read_ui_schema(path: Option<&Path>) -> Result<UiSchema, ResolveError> {
    Ok(UiSchema::from_value(&read_optional(path)?))
}

/// Read an error tree. No path, or a `null` document, is the empty tree.
///
/// # Errors
///
/// Same as [`read_document`], plus `InvalidErrorSchema` when the document
/// is not in the `{"__errors": [..], "<field>": {..}}` shape.
pub fn read_error_schema(path: Option<&Path>) -> Result<ErrorSchema, ResolveError> {
    match read_optional(path)? {
        Value::Null => Ok(ErrorSchema::default()),
        value => ErrorSchema::from_value(&value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_document_rejects_bad_json() {
        let result = parse_document("{ not json");
        assert!(matches!(result, Err(ResolveError::InvalidJson { .. })));
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = read_document(Path::new("/nonexistent/schema.json"));
        assert!(matches!(result, Err(ResolveError::FileNotFound { .. })));
    }

    #[test]
    fn absent_optional_documents_are_empty() {
        assert_eq!(read_optional(None).unwrap(), Value::Null);
        assert_eq!(read_ui_schema(None).unwrap(), UiSchema::default());
        assert!(read_error_schema(None).unwrap().is_empty());
    }

    #[test]
    fn null_error_document_is_empty_tree() {
        let file = write_temp("null");
        assert!(read_error_schema(Some(file.path())).unwrap().is_empty());
    }

    #[test]
    fn error_document_is_parsed_into_tree() {
        let file = write_temp(r#"{"__errors": ["bad form"], "name": {"__errors": ["required"]}}"#);
        let errors = read_error_schema(Some(file.path())).unwrap();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn malformed_error_document_is_rejected() {
        let file = write_temp(r#"{"__errors": "not a list"}"#);
        let result = read_error_schema(Some(file.path()));
        assert!(matches!(result, Err(ResolveError::InvalidErrorSchema { .. })));
    }

    #[test]
    fn ui_document_is_parsed_into_overlay() {
        let file = write_temp(r#"{"ui:widget": "textarea", "bio": {"ui:help": "Short"}}"#);
        let ui = read_ui_schema(Some(file.path())).unwrap();
        assert_eq!(ui.widget.as_deref(), Some("textarea"));
        assert_eq!(ui.child("bio").help.as_deref(), Some("Short"));
    }

    #[test]
    fn form_documents_become_inputs() {
        let schema = write_temp(
            r##"{
                "definitions": { "name": { "type": "string" } },
                "type": "object",
                "properties": { "first": { "$ref": "#/definitions/name" } }
            }"##,
        );
        let data = write_temp(r#"{"first": "Ada"}"#);
        let files = FormFiles::new(schema.path()).form_data(Some(data.path().to_path_buf()));

        let inputs = FormDocuments::load(&files).unwrap().into_inputs("person").unwrap();

        assert_eq!(inputs.form_data, json!({ "first": "Ada" }));
        assert!(inputs.registry.definitions().contains_key("name"));
        let ids = inputs.id_schema.unwrap();
        assert_eq!(ids.id, "person");
        assert_eq!(ids.children["first"].id, "person_first");
    }

    #[test]
    fn load_reports_the_failing_document() {
        let schema = write_temp(r#"{"type": "string"}"#);
        let files = FormFiles::new(schema.path()).errors(Some("/nonexistent/errors.json".into()));

        let result = FormDocuments::load(&files);
        assert!(matches!(
            result,
            Err(ResolveError::FileNotFound { path }) if path.ends_with("errors.json")
        ));
    }
}
