use std::io;
use std::path::Path;

use vidtrack_core::SelectedFile;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Describe a file on disk the way a browser file input would.
pub(crate) fn selected_file(path: &Path, mime_override: Option<&str>) -> io::Result<SelectedFile> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        ));
    }
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = mime_override
        .map(str::to_string)
        .or_else(|| guess_mime(path).map(str::to_string))
        .unwrap_or_else(|| FALLBACK_MIME.to_string());
    Ok(SelectedFile::new(name, metadata.len(), mime_type, path))
}

fn guess_mime(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mpeg" | "mpg" => "video/mpeg",
        "ogv" => "video/ogg",
        "3gp" => "video/3gpp",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn video_extension_sets_mime_and_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Demo.MP4");
        std::fs::write(&path, vec![0_u8; 2048]).unwrap();

        let file = selected_file(&path, None).unwrap();
        assert_eq!(file.name, "Demo.MP4");
        assert_eq!(file.size, 2048);
        assert_eq!(file.mime_type, "video/mp4");
        assert!(file.is_video());
    }

    #[test]
    fn override_wins_and_unknown_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.bin");
        std::fs::write(&path, b"x").unwrap();

        assert_eq!(selected_file(&path, None).unwrap().mime_type, FALLBACK_MIME);
        assert_eq!(
            selected_file(&path, Some("video/mp4")).unwrap().mime_type,
            "video/mp4"
        );
    }

    #[test]
    fn directories_are_rejected() {
        let dir = TempDir::new().unwrap();
        let err = selected_file(dir.path(), None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
