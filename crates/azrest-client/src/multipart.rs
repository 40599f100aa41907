//! Multipart form bodies for file and audio uploads
//!
//! `reqwest::multipart::Form` is consumed when sent, so forms are kept as plain
//! data and rebuilt for every attempt.

use bytes::Bytes;

use crate::error::ClientError;

#[derive(Debug, Clone)]
enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        data: Bytes,
    },
}

/// A `multipart/form-data` body
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a text field when a value is present.
    pub fn optional_text<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.text(name, v.to_string()),
            None => self,
        }
    }

    /// Add a file field. The content type is guessed from the file name.
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string();
        self.parts.push(FormPart::File {
            name: name.into(),
            filename,
            content_type,
            data: data.into(),
        });
        self
    }

    /// Names of all fields, in insertion order.
    pub fn field_names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .map(|p| match p {
                FormPart::Text { name, .. } | FormPart::File { name, .. } => name.as_str(),
            })
            .collect()
    }

    /// Value of a text field.
    pub fn text_value(&self, field: &str) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            FormPart::Text { name, value } if name == field => Some(value.as_str()),
            _ => None,
        })
    }

    /// Content type chosen for a file field.
    pub fn file_content_type(&self, field: &str) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            FormPart::File {
                name, content_type, ..
            } if name == field => Some(content_type.as_str()),
            _ => None,
        })
    }

    pub(crate) fn to_reqwest(&self) -> Result<reqwest::multipart::Form, ClientError> {
        let mut form = reqwest::multipart::Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    let part = reqwest::multipart::Part::bytes(data.to_vec())
                        .file_name(filename.clone())
                        .mime_str(content_type)
                        .map_err(|e| {
                            ClientError::InvalidParameter(format!(
                                "invalid content type {content_type}: {e}"
                            ))
                        })?;
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}
