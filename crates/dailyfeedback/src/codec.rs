//! Image attachments as base64 data URIs.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::error::{Error, Result};

/// Read an image file and encode it as `data:<mime>;base64,<payload>`.
///
/// The mime type is guessed from the file extension.
///
/// # Errors
///
/// Returns [`Error::NotAnImage`] for non-image files, or an I/O error if the
/// file cannot be read.
pub fn image_to_data_uri(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(Error::NotAnImage {
            path: path.to_path_buf(),
            mime: mime.essence_str().to_string(),
        });
    }

    let bytes = std::fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Encoded image attachment");
    Ok(encode_data_uri(mime.essence_str(), &bytes))
}

/// Encode raw bytes as a data URI.
#[must_use]
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Mime type and decoded size of a base64 data URI.
///
/// Returns `None` for anything that is not a well-formed base64 data URI.
#[must_use]
pub fn describe_data_uri(uri: &str) -> Option<(String, usize)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime.to_string(), bytes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn test_encode_data_uri() {
        assert_eq!(
            encode_data_uri("image/png", b"hello"),
            "data:image/png;base64,aGVsbG8="
        );
    }

    #[test]
    fn test_image_to_data_uri_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(PNG_HEADER)
            .unwrap();

        let uri = image_to_data_uri(&path).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(
            describe_data_uri(&uri),
            Some(("image/png".to_string(), PNG_HEADER.len()))
        );
    }

    #[test]
    fn test_image_to_data_uri_jpeg_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();

        assert!(image_to_data_uri(&path)
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_image_to_data_uri_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "text").unwrap();

        let err = image_to_data_uri(&path).unwrap_err();
        assert!(matches!(err, Error::NotAnImage { .. }));
        assert!(err.to_string().contains("text/plain"));
    }

    #[test]
    fn test_image_to_data_uri_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = image_to_data_uri(dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_describe_data_uri_rejects_garbage() {
        assert!(describe_data_uri("https://example.com/a.png").is_none());
        assert!(describe_data_uri("data:image/png,raw").is_none());
        assert!(describe_data_uri("data:image/png;base64,!!!").is_none());
    }
}
