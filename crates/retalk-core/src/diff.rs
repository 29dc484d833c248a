//! Unified diff rendering for whole-file before/after text.
//!
//! Hunks carry three lines of context; a created file diffs against
//! `/dev/null`.

use similar::TextDiff;

const CONTEXT: usize = 3;

/// Render a unified diff of `old` to `new` for `path`.
///
/// Returns an empty string if the texts are equal.
pub fn unified_diff(path: &str, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }
    let old_header = if old.is_empty() {
        "/dev/null".to_string()
    } else {
        format!("a/{}", path)
    };
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(CONTEXT)
        .header(&old_header, &format!("b/{}", path))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_texts_produce_no_diff() {
        assert_eq!(unified_diff("a.lgt", "x.\n", "x.\n"), "");
    }

    #[test]
    fn single_line_change_has_context() {
        let old = "a.\nb.\nc.\nd.\ne.\n";
        let new = "a.\nb.\nC.\nd.\ne.\n";
        let diff = unified_diff("f.lgt", old, new);
        assert!(diff.starts_with("--- a/f.lgt\n+++ b/f.lgt\n"));
        assert!(diff.contains("@@ -1,5 +1,5 @@"));
        assert!(diff.contains("-c.\n+C.\n"));
        assert!(diff.contains(" a.\n"));
    }

    #[test]
    fn distant_changes_make_two_hunks() {
        let old: String = (0..20).map(|i| format!("l{}.\n", i)).collect();
        let new = old.replace("l1.\n", "x1.\n").replace("l18.\n", "x18.\n");
        let diff = unified_diff("f.lgt", &old, &new);
        assert_eq!(diff.matches("@@ -").count(), 2);
    }

    #[test]
    fn new_file_diff() {
        let diff = unified_diff("n.lgt", "", "a.\nb.\n");
        assert!(diff.starts_with("--- /dev/null\n+++ b/n.lgt\n"));
        assert!(diff.contains("@@ -0,0 +1,2 @@"));
        assert!(diff.contains("+a.\n+b.\n"));
    }

    #[test]
    fn missing_final_newline_is_marked() {
        let diff = unified_diff("f.lgt", "a.\n", "a.\nb.");
        assert!(diff.contains("+b."));
        assert!(diff.contains("\\ No newline at end of file"));
    }

    #[test]
    fn inserted_line() {
        let diff = unified_diff("f.lgt", "a.\nc.\n", "a.\nb.\nc.\n");
        assert!(diff.contains("@@ -1,2 +1,3 @@"));
        assert!(diff.contains("+b.\n"));
    }
}
