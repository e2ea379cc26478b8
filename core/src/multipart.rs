//! multipart/form-data body construction.
//!
//! # Design
//! Parts are fully materialized before the request is sent; there is no
//! streaming from disk. Scalar fields are always written before file fields,
//! each group in insertion order, so the same form with the same boundary
//! always produces the same bytes.
//!
//! Reading an attachment is all-or-nothing: if any file cannot be read the
//! whole encode fails and no partial body is returned.

use std::path::{Path, PathBuf};

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;

use crate::error::ClientError;

const CRLF: &[u8] = b"\r\n";

/// One segment of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Field {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        mime_type: String,
        bytes: Bytes,
    },
}

/// A file attachment to be read from disk.
#[derive(Debug, Clone)]
pub struct FileField {
    pub field_name: String,
    /// Name sent in the part header. Defaults to the last path component.
    pub file_name: Option<String>,
    pub path: PathBuf,
}

impl FileField {
    pub fn new(field_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: None,
            path: path.into(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// A multipart/form-data body under construction.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    fields: Vec<Part>,
    files: Vec<Part>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// Create an empty form with a fresh random boundary.
    pub fn new() -> Self {
        let token = uuid::Uuid::new_v4().to_string().to_uppercase();
        Self::with_boundary(format!("Boundary-{token}"))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            fields: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Part::Field {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add every entry of a JSON object as a scalar field.
    ///
    /// Strings are written as-is; other values are written as JSON text.
    pub fn fields(mut self, fields: &Value) -> Result<Self, ClientError> {
        let Value::Object(map) = fields else {
            return Err(ClientError::Serialization(
                "multipart fields must be a JSON object".to_string(),
            ));
        };
        for (name, value) in map {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            self = self.text(name.clone(), value);
        }
        Ok(self)
    }

    pub fn file_bytes(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        self.files.push(Part::File {
            name: name.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        });
        self
    }

    /// Read an attachment from disk and add it as a file part.
    pub async fn file(self, field: &FileField) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(&field.path)
            .await
            .map_err(|e| ClientError::FilePreparation {
                path: field.path.clone(),
                reason: e.to_string(),
            })?;
        let filename = match &field.file_name {
            Some(name) => name.clone(),
            None => base_name(&field.path),
        };
        let mime_type = mime_for_path(&field.path);
        Ok(self.file_bytes(field.field_name.clone(), filename, mime_type, bytes))
    }

    /// Scalar fields followed by file fields.
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.fields.iter().chain(self.files.iter())
    }

    pub fn build(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for part in self.parts() {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(CRLF);
            match part {
                Part::Field { name, value } => {
                    buf.put_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"").as_bytes(),
                    );
                    buf.put_slice(CRLF);
                    buf.put_slice(CRLF);
                    buf.put_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    mime_type,
                    bytes,
                } => {
                    buf.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\""
                        )
                        .as_bytes(),
                    );
                    buf.put_slice(CRLF);
                    buf.put_slice(format!("Content-Type: {mime_type}").as_bytes());
                    buf.put_slice(CRLF);
                    buf.put_slice(CRLF);
                    buf.put_slice(bytes);
                }
            }
            buf.put_slice(CRLF);
        }
        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--");
        buf.put_slice(CRLF);
        buf.freeze()
    }
}

/// Build a form from scalar fields and attachments read from disk.
pub async fn encode(fields: Option<&Value>, files: &[FileField]) -> Result<MultipartForm, ClientError> {
    encode_with(MultipartForm::new(), fields, files).await
}

/// Like `encode`, but starting from a given (usually empty) form.
pub async fn encode_with(
    form: MultipartForm,
    fields: Option<&Value>,
    files: &[FileField],
) -> Result<MultipartForm, ClientError> {
    let mut form = match fields {
        Some(fields) => form.fields(fields)?,
        None => form,
    };
    for file in files {
        form = form.file(file).await?;
    }
    Ok(form)
}

/// MIME type for a path based on its extension, or
/// `application/octet-stream` when the extension is unknown.
pub fn mime_for_path(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
