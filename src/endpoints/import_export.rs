//! Bulk channel import and export.

use crate::transport::{Body, RequestOptions, Transport, TransportError};
use reqwest::{
    multipart::{Form, Part},
    Method,
};
use serde_derive::Serialize;
use serde_json::Value;

/// Lets the server sniff the playlist format.
pub const AUTO_FORMAT: &str = "auto";

/// How imported channels get merged with existing ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOptions {
    /// Replace channels which already exist instead of skipping them.
    pub overwrite: bool,
    pub auto_create_group: bool,
    /// Only import channels whose name matches this pattern.
    pub include_regex: String,
    pub exclude_regex: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            overwrite: false,
            auto_create_group: true,
            include_regex: String::new(),
            exclude_regex: String::new(),
        }
    }
}

/// Upload a playlist file.
pub async fn import_file(
    transport: &Transport,
    file_name: &str,
    contents: Vec<u8>,
    options: &ImportOptions,
) -> Result<Value, TransportError> {
    let file = Part::bytes(contents).file_name(file_name.to_string());
    let form = Form::new()
        .part("file", file)
        .text("overwrite", options.overwrite.to_string())
        .text("auto_create_group", options.auto_create_group.to_string())
        .text("include_regex", options.include_regex.clone())
        .text("exclude_regex", options.exclude_regex.clone());

    transport
        .json(
            Method::POST,
            "/import-export/import",
            Body::Multipart(form),
            &RequestOptions::default(),
        )
        .await
}

/// Import a playlist which is already in memory.
pub async fn import_content(
    transport: &Transport,
    content: &str,
    format: &str,
    options: &ImportOptions,
) -> Result<Value, TransportError> {
    let data = ImportContent {
        content,
        format,
        options,
    };
    transport.post("/import-export/import", &data).await
}

/// Have the server download and import a remote playlist.
pub async fn import_url(
    transport: &Transport,
    url: &str,
    format: &str,
    options: &ImportOptions,
) -> Result<Value, TransportError> {
    let data = ImportUrl {
        url,
        format,
        options,
    };
    transport.post("/import-export/import-url", &data).await
}

/// Download every channel as a playlist in the requested format.
pub async fn export(
    transport: &Transport,
    format: &str,
) -> Result<Vec<u8>, TransportError> {
    let options = RequestOptions::default().query("format", format);
    let response = transport
        .send(Method::GET, "/import-export/export", Body::Empty, &options)
        .await?;
    let body = response.bytes().await?;

    Ok(body.to_vec())
}

#[derive(Debug, Serialize)]
struct ImportContent<'a> {
    content: &'a str,
    format: &'a str,
    #[serde(flatten)]
    options: &'a ImportOptions,
}

#[derive(Debug, Serialize)]
struct ImportUrl<'a> {
    url: &'a str,
    format: &'a str,
    #[serde(flatten)]
    options: &'a ImportOptions,
}
