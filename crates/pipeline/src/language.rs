//! Response language, detected from the script of the query.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    TraditionalChinese,
    Japanese,
}

impl Language {
    /// Kana means Japanese; other CJK ideographs mean Chinese; else English.
    pub fn detect(text: &str) -> Self {
        if text.chars().any(is_kana) {
            Self::Japanese
        } else if text.chars().any(is_cjk_ideograph) {
            Self::TraditionalChinese
        } else {
            Self::English
        }
    }

    /// Name used when instructing the completion capability.
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::TraditionalChinese => "Traditional Chinese",
            Self::Japanese => "Japanese",
        }
    }
}

fn is_kana(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}')
}

fn is_cjk_ideograph(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_script() {
        assert_eq!(Language::detect("東京 linux t2.micro 價格為多少"), Language::TraditionalChinese);
        assert_eq!(Language::detect("東京のt2.microの料金は？"), Language::Japanese);
        assert_eq!(Language::detect("Tokyo linux t2.micro price"), Language::English);
        assert_eq!(Language::detect(""), Language::English);
    }

    #[test]
    fn unsupported_scripts_fall_back_to_english() {
        assert_eq!(Language::detect("도쿄 리눅스 가격"), Language::English);
    }
}
