//! Filesystem-safe file stems for catalog entry names.

use std::collections::HashSet;

/// Stem used when nothing usable survives sanitization.
pub const PLACEHOLDER_STEM: &str = "unnamed";

/// Upper bound on a sanitized stem, in bytes. Leaves room for a collision
/// suffix and an extension under the common 255-byte name limit.
pub const MAX_STEM_BYTES: usize = 200;

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.')
}

/// Maps an arbitrary entry name to a file stem.
///
/// Characters outside letters, digits, space, `-`, `_` and `.` become `_`.
/// Whitespace runs collapse to one space, leading/trailing spaces and dots
/// are removed, and the result is cut to [`MAX_STEM_BYTES`] on a char
/// boundary. Never returns an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;

    for c in name.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(if is_allowed(c) { c } else { '_' });
    }

    let mut stem = trim_edges(&out).to_string();
    if stem.len() > MAX_STEM_BYTES {
        let mut cut = MAX_STEM_BYTES;
        while !stem.is_char_boundary(cut) {
            cut -= 1;
        }
        stem.truncate(cut);
        stem = trim_edges(&stem).to_string();
    }

    if stem.is_empty() {
        PLACEHOLDER_STEM.to_string()
    } else {
        stem
    }
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '.')
}

/// Hands out unique stems within one run.
///
/// The first entry keeps its sanitized stem; later entries that collide with
/// an already allocated stem (compared case-insensitively) get `_2`, `_3`, ...
/// Allocation order decides who keeps the bare stem, so callers allocate in
/// catalog order.
#[derive(Debug, Default)]
pub struct FilenameAllocator {
    taken: HashSet<String>,
}

impl FilenameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, name: &str) -> String {
        let stem = sanitize_filename(name);
        if self.taken.insert(stem.to_lowercase()) {
            return stem;
        }

        let mut n: u64 = 2;
        loop {
            let candidate = format!("{}_{}", stem, n);
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn assert_safe(stem: &str) {
        assert!(!stem.is_empty());
        assert!(stem.chars().all(is_allowed), "unexpected char in {:?}", stem);
        assert!(stem.len() <= MAX_STEM_BYTES);
        assert!(!stem.starts_with('.') && !stem.starts_with(' '));
        assert!(!stem.ends_with('.') && !stem.ends_with(' '));
    }

    #[test]
    fn test_plain_names_unchanged() {
        assert_eq!(sanitize_filename("Diamond Sword"), "Diamond Sword");
        assert_eq!(sanitize_filename("Bottle_o'_Enchanting"), "Bottle_o__Enchanting");
        assert_eq!(sanitize_filename("Music Disc 11"), "Music Disc 11");
    }

    #[test]
    fn test_separators_and_reserved_chars_replaced() {
        assert_eq!(sanitize_filename("Bucket/Water"), "Bucket_Water");
        assert_eq!(sanitize_filename(r"a\b:c*d?e"), "a_b_c_d_e");
        assert_eq!(sanitize_filename("<Item|Name>"), "_Item_Name_");
    }

    #[test]
    fn test_whitespace_collapsed_and_trimmed() {
        assert_eq!(sanitize_filename("  Iron \t\n Ingot  "), "Iron Ingot");
    }

    #[test]
    fn test_dots_trimmed_and_empty_input_placeholder() {
        assert_eq!(sanitize_filename(".."), PLACEHOLDER_STEM);
        assert_eq!(sanitize_filename(""), PLACEHOLDER_STEM);
        assert_eq!(sanitize_filename("   "), PLACEHOLDER_STEM);
        assert_eq!(sanitize_filename(".hidden."), "hidden");
    }

    #[test]
    fn test_unicode_letters_kept() {
        assert_eq!(sanitize_filename("Épée du Néant"), "Épée du Néant");
    }

    #[test]
    fn test_long_names_bounded_on_char_boundary() {
        let long = "é".repeat(300);
        let stem = sanitize_filename(&long);
        assert!(stem.len() <= MAX_STEM_BYTES);
        assert!(stem.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_output_always_safe() {
        let inputs = [
            "",
            "/",
            "../../etc/passwd",
            "C:\\Windows\\System32",
            "名前/テスト",
            "tab\there",
            "emoji 🎮 item",
            "\u{0}\u{7f}control",
            " . ",
            "a\"b'c`d",
        ];
        for input in inputs {
            assert_safe(&sanitize_filename(input));
        }
    }

    #[test]
    fn test_allocator_suffixes_collisions_in_order() {
        let mut allocator = FilenameAllocator::new();
        assert_eq!(allocator.allocate("Bucket/Water"), "Bucket_Water");
        assert_eq!(allocator.allocate("Bucket:Water"), "Bucket_Water_2");
        assert_eq!(allocator.allocate("Bucket?Water"), "Bucket_Water_3");
        assert_eq!(allocator.allocate("Stone"), "Stone");
    }

    #[test]
    fn test_allocator_case_insensitive() {
        let mut allocator = FilenameAllocator::new();
        assert_eq!(allocator.allocate("TNT"), "TNT");
        assert_eq!(allocator.allocate("Tnt"), "Tnt_2");
    }

    #[test]
    fn test_allocator_skips_suffix_already_taken_by_real_name() {
        let mut allocator = FilenameAllocator::new();
        assert_eq!(allocator.allocate("Item_2"), "Item_2");
        assert_eq!(allocator.allocate("Item"), "Item");
        assert_eq!(allocator.allocate("Item?"), "Item_");
        assert_eq!(allocator.allocate("Item"), "Item_3");
    }

    proptest! {
        #[test]
        fn test_any_name_yields_safe_stem(name in any::<String>()) {
            assert_safe(&sanitize_filename(&name));
        }

        #[test]
        fn test_allocated_stems_never_collide(names in prop::collection::vec(".{0,12}", 0..40)) {
            let mut allocator = FilenameAllocator::new();
            let mut stems = HashSet::new();
            for name in &names {
                let stem = allocator.allocate(name);
                prop_assert!(stems.insert(stem.to_lowercase()), "duplicate stem {:?}", stem);
            }
        }
    }
}
