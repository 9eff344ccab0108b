const MAX_STEM_CHARS: usize = 100;
const FALLBACK_STEM: &str = "ownership";

/// `{display_name}_ownership_structure.{ext}`, with the name made safe for common file systems.
///
/// Path separators, `: * ? " < > |` and control characters become `_`, whitespace runs collapse
/// to a single `_`, leading/trailing dots and underscores are stripped and the stem is capped at
/// 100 characters. An empty result falls back to `ownership`.
pub fn export_file_name(display_name: &str, ext: &str) -> String {
    let mut stem = String::with_capacity(display_name.len());
    let mut in_space = false;
    for ch in display_name.trim().chars() {
        if ch.is_whitespace() {
            if !in_space {
                stem.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        let reserved = matches!(ch, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|');
        stem.push(if reserved || ch.is_control() { '_' } else { ch });
    }

    let stem: String = stem
        .trim_matches(|c| c == '.' || c == '_')
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    let stem = stem.trim_end_matches(['.', '_']);
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };

    let ext = ext.trim_start_matches('.');
    format!("{stem}_ownership_structure.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(
            export_file_name("Acme", "pdf"),
            "Acme_ownership_structure.pdf"
        );
    }

    #[test]
    fn reserved_characters_and_whitespace_are_replaced() {
        assert_eq!(
            export_file_name("  Acme / Holdings:  Ltd?  ", "pdf"),
            "Acme___Holdings__Ltd_ownership_structure.pdf"
        );
        assert_eq!(
            export_file_name("a\tb\u{7}c", ".png"),
            "a_b_c_ownership_structure.png"
        );
    }

    #[test]
    fn dots_cannot_escape_the_directory() {
        assert_eq!(
            export_file_name("../../etc/passwd", "pdf"),
            "etc_passwd_ownership_structure.pdf"
        );
    }

    #[test]
    fn empty_or_punctuation_only_names_fall_back() {
        assert_eq!(export_file_name("", "pdf"), "ownership_ownership_structure.pdf");
        assert_eq!(export_file_name(" ... ", "pdf"), "ownership_ownership_structure.pdf");
    }

    #[test]
    fn long_names_are_capped() {
        let name = "x".repeat(500);
        let out = export_file_name(&name, "pdf");
        assert_eq!(out.len(), 100 + "_ownership_structure.pdf".len());
    }

    #[test]
    fn unicode_names_are_kept() {
        assert_eq!(
            export_file_name("株式会社 東京", "pdf"),
            "株式会社_東京_ownership_structure.pdf"
        );
    }
}
