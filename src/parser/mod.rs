pub mod classify;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Unicode-aware: \W covers CJK punctuation and symbols as well as ASCII
    static ref NON_WORD: Regex = Regex::new(r"[\s\W]").unwrap();
}

/// Strips whitespace and every non-word character so punctuation-only
/// differences between releases compare equal.
///
/// Idempotent. An empty result means the text has no normalized key.
pub fn normalize(text: &str) -> String {
    NON_WORD.replace_all(text, "").into_owned()
}

pub use self::classify::{classify, Classification, VoiceType};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ascii_and_cjk_punctuation() {
        assert_eq!(normalize("Hello, world!"), "Helloworld");
        assert_eq!(normalize("「そうか……。」"), "そうか");
        assert_eq!(normalize("わ、すっごく良い絵が撮れそう❤"), "わすっごく良い絵が撮れそう");
        assert_eq!(normalize(" \t\n"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "",
            "plain",
            "  spaced   out  ",
            "《白面》のワイスマン……！",
            "mixed: これは、テスト？ yes_no 123",
            "under_score",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn keeps_word_characters() {
        assert_eq!(normalize("abc_123"), "abc_123");
        assert_eq!(normalize("ＡＢＣ"), "ＡＢＣ");
    }
}
