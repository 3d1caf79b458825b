use chrono::Utc;
use uuid::Uuid;

/// Reduces a client-supplied filename to a safe, flat name.
///
/// Non-ASCII characters are dropped, path separators become word breaks,
/// whitespace runs collapse to `_`, and only `[A-Za-z0-9._-]` survives.
/// Leading and trailing `.`/`_` are stripped. May return an empty string.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Safe scratch name for an upload that has been re-encoded as JPEG: the
/// client's stem, a time-plus-random suffix so concurrent uploads of the
/// same name never share a path, and always a `.jpg` extension.
pub fn jpeg_scratch_name(filename: &str) -> String {
    let safe = secure_filename(filename);
    let (stem, _) = split_extension(&safe);
    let token = Uuid::new_v4().simple();
    format!("{}_{}_{}.jpg", stem, Utc::now().timestamp(), token)
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_components_are_flattened() {
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("C:\\Users\\me\\photo.png"), "C_Users_me_photo.png");
    }

    #[test]
    fn unsafe_characters_are_removed() {
        assert_eq!(secure_filename("my cat (1).jpg"), "my_cat_1.jpg");
        assert_eq!(secure_filename("caf\u{e9}$;.png"), "caf.png");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn suffix_is_inserted_before_extension() {
        let name = jpeg_scratch_name("holiday photo.JPG");
        assert!(name.starts_with("holiday_photo_"));
        assert!(name.ends_with(".jpg"));

        let suffix = &name["holiday_photo_".len()..name.len() - ".jpg".len()];
        let (seconds, token) = suffix.split_once('_').unwrap();
        assert!(seconds.parse::<i64>().is_ok());
        assert_eq!(token.len(), 32);
    }

    #[test]
    fn same_name_in_the_same_second_does_not_collide() {
        assert_ne!(jpeg_scratch_name("a.png"), jpeg_scratch_name("a.png"));
    }

    #[test]
    fn scratch_names_always_use_the_jpeg_extension() {
        for original in ["photo.png", "photo.PNG", "photo.jpeg", "photo"] {
            let name = jpeg_scratch_name(original);
            assert!(name.starts_with("photo_"), "{}", name);
            assert!(name.ends_with(".jpg"), "{}", name);
            assert_eq!(name.matches('.').count(), 1, "{}", name);
        }
    }

    #[test]
    fn unusable_names_still_get_a_suffix() {
        let name = jpeg_scratch_name("...");
        assert!(name.starts_with('_'));
        assert!(name.ends_with(".jpg"));
    }
}
