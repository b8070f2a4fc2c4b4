use std::path::Path;

/// Module-path token for a source file: separators become dots, the
/// extension is dropped. `agents/video_gen.py` → `agents.video_gen`.
pub fn module_token(rel_path: &Path) -> String {
    let without_ext = rel_path.with_extension("");
    without_ext
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(".")
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Replace whole-identifier occurrences of `old` with `new`.
///
/// An occurrence only counts when the characters on both sides are outside
/// the identifier alphabet (`.` included), so `video_utils` never rewrites
/// inside `video_utils_extra` or `pkg.video_utils`. A reference is either a
/// whole-identifier match (rewritten) or a partial occurrence (untouched);
/// there is no in-between.
pub fn replace_identifier(content: &str, old: &str, new: &str) -> (String, usize) {
    if old.is_empty() || old == new {
        return (content.to_string(), 0);
    }

    let mut result = String::with_capacity(content.len());
    let mut count = 0usize;
    let mut rest = content;

    while let Some(pos) = rest.find(old) {
        let prev_char = if pos > 0 {
            rest[..pos].chars().last()
        } else {
            result.chars().last()
        };
        let before_ok = prev_char.map(|c| !is_token_char(c)).unwrap_or(true);
        let next_char = rest[pos + old.len()..].chars().next();
        let after_ok = next_char.map(|c| !is_token_char(c)).unwrap_or(true);

        result.push_str(&rest[..pos]);
        if before_ok && after_ok {
            result.push_str(new);
            count += 1;
        } else {
            result.push_str(old);
        }
        rest = &rest[pos + old.len()..];
    }
    result.push_str(rest);

    (result, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn module_token_from_relative_path() {
        assert_eq!(module_token(&PathBuf::from("video_utils.py")), "video_utils");
        assert_eq!(
            module_token(&PathBuf::from("agents/video_gen.py")),
            "agents.video_gen"
        );
    }

    #[test]
    fn whole_identifier_is_rewritten() {
        let (out, n) = replace_identifier(
            "from video_utils import encode\nimport video_utils\n",
            "video_utils",
            "src.utils.video_utils",
        );
        assert_eq!(n, 2);
        assert!(out.contains("from src.utils.video_utils import encode"));
        assert!(out.contains("import src.utils.video_utils"));
    }

    #[test]
    fn partial_occurrences_are_left_alone() {
        let (out, n) = replace_identifier(
            "import video_utils_extra\nx = my_video_utils\n",
            "video_utils",
            "src.utils.video_utils",
        );
        assert_eq!(n, 0);
        assert!(out.contains("video_utils_extra"));
        assert!(out.contains("my_video_utils"));
    }

    #[test]
    fn dotted_prefix_occurrences_are_left_alone() {
        let (out, n) = replace_identifier(
            "import pkg.video_utils\n",
            "video_utils",
            "src.utils.video_utils",
        );
        assert_eq!(n, 0);
        assert!(out.contains("pkg.video_utils"));
    }

    #[test]
    fn dotted_old_token_matches_whole_path_only() {
        let (out, n) = replace_identifier(
            "from agents.video_gen import run\nfrom other.agents.video_gen import run\n",
            "agents.video_gen",
            "src.agents.video_gen",
        );
        assert_eq!(n, 1);
        assert!(out.contains("from src.agents.video_gen import run"));
        assert!(out.contains("from other.agents.video_gen import run"));
    }

    #[test]
    fn identical_tokens_are_a_no_op() {
        let (out, n) = replace_identifier("import a\n", "a", "a");
        assert_eq!(n, 0);
        assert_eq!(out, "import a\n");
    }
}
