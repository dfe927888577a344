//! Client-side photo picker rules: image MIME types only, bounded size and count.

use serde::{Deserialize, Serialize};

use ekami_domain::{PhotoRef, PhotoSet};

use crate::ValidationError;

pub const DEFAULT_MAX_PHOTOS: usize = 5;
pub const DEFAULT_MAX_PHOTO_BYTES: u64 = 5 * 1024 * 1024;
const IMAGE_MIME_PREFIX: &str = "image/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoLimits {
    pub max_photos: usize,
    pub max_photo_bytes: u64,
}

impl Default for PhotoLimits {
    fn default() -> Self {
        Self {
            max_photos: DEFAULT_MAX_PHOTOS,
            max_photo_bytes: DEFAULT_MAX_PHOTO_BYTES,
        }
    }
}

/// Checks whether `photo` may join `set` under `limits`.
pub fn check_photo(
    set: &PhotoSet,
    photo: &PhotoRef,
    limits: &PhotoLimits,
) -> Result<(), ValidationError> {
    if !photo
        .mime_type
        .trim()
        .to_ascii_lowercase()
        .starts_with(IMAGE_MIME_PREFIX)
    {
        return Err(ValidationError::new(format!(
            "{} is not an image",
            photo.file_name
        )));
    }
    if photo.size_bytes > limits.max_photo_bytes {
        return Err(ValidationError::new(format!(
            "{} is larger than {}",
            photo.file_name,
            format_size(limits.max_photo_bytes)
        )));
    }
    if set.len() >= limits.max_photos {
        return Err(ValidationError::new(format!(
            "You can attach at most {} photos",
            limits.max_photos
        )));
    }
    Ok(())
}

/// Guesses an image MIME type from a file extension.
pub fn mime_from_file_name(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

fn format_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_images() {
        let set = PhotoSet::default();
        let pdf = PhotoRef::new("invoice.pdf", "application/pdf", 10);
        let err = check_photo(&set, &pdf, &PhotoLimits::default()).unwrap_err();
        assert_eq!(err.message, "invoice.pdf is not an image");
    }

    #[test]
    fn rejects_oversized_files() {
        let set = PhotoSet::default();
        let huge = PhotoRef::new("dent.jpg", "image/jpeg", DEFAULT_MAX_PHOTO_BYTES + 1);
        let err = check_photo(&set, &huge, &PhotoLimits::default()).unwrap_err();
        assert_eq!(err.message, "dent.jpg is larger than 5 MB");
    }

    #[test]
    fn caps_the_number_of_photos() {
        let limits = PhotoLimits {
            max_photos: 1,
            ..PhotoLimits::default()
        };
        let set = PhotoSet {
            photos: vec![PhotoRef::new("a.png", "image/png", 1)],
        };
        let next = PhotoRef::new("b.png", "image/png", 1);
        assert!(check_photo(&set, &next, &limits).is_err());
        assert!(check_photo(&PhotoSet::default(), &next, &limits).is_ok());
    }

    #[test]
    fn guesses_mime_types_from_extensions() {
        assert_eq!(mime_from_file_name("scratch.JPG"), Some("image/jpeg"));
        assert_eq!(mime_from_file_name("notes.txt"), None);
        assert_eq!(mime_from_file_name("noextension"), None);
    }
}
