//! WebDAV multistatus and OCS response parsing.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{RemoteError, RemoteFile};

/// Request body asking only for the properties we use.
pub(crate) const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:resourcetype/>
    <d:getcontenttype/>
    <d:getcontentlength/>
  </d:prop>
</d:propfind>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Href,
    ContentType,
    ContentLength,
}

#[derive(Debug, Default)]
struct Entry {
    href: String,
    content_type: String,
    size_bytes: u64,
    is_directory: bool,
}

/// Parse a multistatus document into listing entries.
///
/// `prefix` is the decoded href of the listed root, e.g.
/// `/remote.php/dav/files/media/recording`. Hrefs are made relative to it;
/// the root itself is dropped.
pub(crate) fn parse_multistatus(xml: &str, prefix: &str) -> Result<Vec<RemoteFile>, RemoteError> {
    let mut reader = Reader::from_str(xml);
    let mut files = Vec::new();
    let mut current: Option<Entry> = None;
    let mut field = Field::None;
    let mut saw_multistatus = false;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"multistatus" => saw_multistatus = true,
                b"response" => current = Some(Entry::default()),
                b"href" => field = Field::Href,
                b"getcontenttype" => field = Field::ContentType,
                b"getcontentlength" => field = Field::ContentLength,
                b"collection" => {
                    if let Some(entry) = current.as_mut() {
                        entry.is_directory = true;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"collection" {
                    if let Some(entry) = current.as_mut() {
                        entry.is_directory = true;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let Some(entry) = current.as_mut() else {
                    continue;
                };
                let text = e
                    .unescape()
                    .map_err(|e| RemoteError::Protocol(e.to_string()))?;
                let text = text.trim();
                match field {
                    Field::Href => entry.href.push_str(text),
                    Field::ContentType => entry.content_type = text.to_string(),
                    Field::ContentLength => entry.size_bytes = text.parse().unwrap_or(0),
                    Field::None => {}
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"response" => {
                    if let Some(entry) = current.take() {
                        if let Some(file) = to_remote_file(entry, prefix) {
                            files.push(file);
                        }
                    }
                }
                b"href" | b"getcontenttype" | b"getcontentlength" => field = Field::None,
                _ => {}
            },
            Ok(_) => {}
            Err(e) => {
                return Err(RemoteError::Protocol(format!(
                    "invalid multistatus at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if !saw_multistatus {
        return Err(RemoteError::Protocol(
            "response is not a WebDAV multistatus".to_string(),
        ));
    }

    Ok(files)
}

fn to_remote_file(entry: Entry, prefix: &str) -> Option<RemoteFile> {
    let href = urlencoding::decode(&entry.href)
        .map(|h| h.into_owned())
        .unwrap_or(entry.href);

    // Hrefs may carry a leading install path such as /nextcloud
    let start = href.find(prefix)? + prefix.len();
    let relative = href[start..].trim_end_matches('/');
    if relative.is_empty() {
        return None;
    }

    let path = if relative.starts_with('/') {
        relative.to_string()
    } else {
        format!("/{}", relative)
    };

    Some(RemoteFile {
        path,
        content_type: entry.content_type,
        size_bytes: entry.size_bytes,
        is_directory: entry.is_directory,
    })
}

/// Pull the share URL out of an OCS share creation response.
pub(crate) fn parse_share_url(xml: &str) -> Result<String, RemoteError> {
    let mut reader = Reader::from_str(xml);
    let mut in_url = false;
    let mut in_message = false;
    let mut message = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"url" => in_url = true,
                b"message" => in_message = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| RemoteError::Protocol(e.to_string()))?;
                if in_url && !text.trim().is_empty() {
                    return Ok(text.trim().to_string());
                }
                if in_message {
                    message.push_str(text.trim());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"url" => in_url = false,
                b"message" => in_message = false,
                _ => {}
            },
            Ok(_) => {}
            Err(e) => return Err(RemoteError::Protocol(e.to_string())),
        }
    }

    if message.is_empty() {
        message = "share response carries no url".to_string();
    }
    Err(RemoteError::ShareCreation(message))
}
