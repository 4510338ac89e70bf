//! Input path expansion

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Extensions treated as video containers when walking a directory
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mov", "mp4", "m4v", "avi", "mkv", "webm", "3gp", "mts", "m2ts", "wmv", "flv", "mpg", "mpeg",
];

/// Path utilities for command-line inputs
pub struct PathUtils;

impl PathUtils {
    /// Whether `path` has a known video extension (case-insensitive)
    pub fn is_video_file(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Expand inputs into the list of videos to convert.
    ///
    /// Files are kept as given, whatever their extension, so that bad inputs
    /// surface as job failures. Directories are walked recursively for
    /// video files, sorted by path.
    pub fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
        let mut videos = Vec::new();
        for input in inputs {
            if !input.is_dir() {
                videos.push(input.clone());
                continue;
            }
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .follow_links(false)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| Self::is_video_file(entry.path()))
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            videos.extend(found);
        }
        videos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_file() {
        assert!(PathUtils::is_video_file(Path::new("a/IMG_0001.MOV")));
        assert!(PathUtils::is_video_file(Path::new("clip.mp4")));
        assert!(!PathUtils::is_video_file(Path::new("photo.jpg")));
        assert!(!PathUtils::is_video_file(Path::new("noext")));
    }

    #[test]
    fn test_expand_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("b.mov"), b"x").unwrap();
        std::fs::write(nested.join("a.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let explicit = PathBuf::from("missing.avi");
        let videos = PathUtils::expand_inputs(&[dir.path().to_path_buf(), explicit.clone()]);

        assert_eq!(
            videos,
            vec![dir.path().join("b.mov"), nested.join("a.mp4"), explicit]
        );
    }
}
