//! Buffered multipart form parsing.
//!
//! Checkout and the admin product form mix text fields with optional files.
//! Browsers submit an empty part for a file input left blank; those are
//! dropped here so handlers only ever see real uploads.

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;

use crate::services::storage::Upload;

/// Fallback content type for file parts without one.
const OCTET_STREAM: &str = "application/octet-stream";

/// A fully read multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<(String, Upload)>,
}

impl MultipartForm {
    /// Read every part of the request body.
    ///
    /// # Errors
    ///
    /// Returns the multipart error if the body is malformed or exceeds the
    /// route's body limit.
    pub async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(ToOwned::to_owned) else {
                continue;
            };

            match field.file_name().map(ToOwned::to_owned) {
                Some(file_name) => {
                    let content_type = field.content_type().unwrap_or(OCTET_STREAM).to_owned();
                    let bytes = field.bytes().await?;
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.push_file(
                        name,
                        Upload {
                            file_name,
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    fn push_file(&mut self, name: String, upload: Upload) {
        if !upload.is_empty() {
            self.files.push((name, upload));
        }
    }

    /// A text field, or `""` when absent.
    #[must_use]
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }

    /// A text field that was submitted with a non-blank value.
    #[must_use]
    pub fn non_blank(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Whether a checkbox was ticked.
    #[must_use]
    pub fn checked(&self, name: &str) -> bool {
        self.text(name) == "on"
    }

    /// Uploaded files for an input, in submission order.
    pub fn files<'a, 'b>(&'a self, name: &'b str) -> impl Iterator<Item = &'a Upload> + use<'a, 'b> {
        self.files
            .iter()
            .filter(move |(field, _)| field == name)
            .map(|(_, upload)| upload)
    }

    /// The first uploaded file for an input.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&Upload> {
        self.files(name).next()
    }
}

#[cfg(test)]
impl MultipartForm {
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_file(mut self, name: &str, file_name: &str, bytes: &'static [u8]) -> Self {
        self.push_file(
            name.to_string(),
            Upload {
                file_name: file_name.to_string(),
                content_type: OCTET_STREAM.to_string(),
                bytes: axum::body::Bytes::from_static(bytes),
            },
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_defaults_to_empty() {
        let form = MultipartForm::default().with_field("name", "  Bob Wig ");
        assert_eq!(form.text("name"), "  Bob Wig ");
        assert_eq!(form.text("missing"), "");
        assert_eq!(form.non_blank("name"), Some("Bob Wig"));
    }

    #[test]
    fn test_blank_field_is_not_non_blank() {
        let form = MultipartForm::default().with_field("slug", "   ");
        assert_eq!(form.non_blank("slug"), None);
    }

    #[test]
    fn test_checkbox() {
        let form = MultipartForm::default().with_field("keepExistingMedia", "on");
        assert!(form.checked("keepExistingMedia"));
        assert!(!form.checked("other"));
    }

    #[test]
    fn test_files_by_field_skip_empty() {
        let form = MultipartForm::default()
            .with_file("images", "a.jpg", b"a")
            .with_file("images", "empty.jpg", b"")
            .with_file("video", "v.mp4", b"v")
            .with_file("images", "b.jpg", b"b");
        let names: Vec<_> = form.files("images").map(|u| u.file_name.as_str()).collect();
        assert_eq!(names, ["a.jpg", "b.jpg"]);
        assert_eq!(form.file("video").map(|u| u.file_name.as_str()), Some("v.mp4"));
        assert!(form.file("model").is_none());
    }
}
