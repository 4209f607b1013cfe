use jifra_types::Language;

/// Japanese if the text contains any kana or CJK ideograph, English otherwise.
#[must_use]
pub fn detect_language(text: &str) -> Language {
    let japanese = text.chars().any(|c| {
        matches!(c,
            '\u{3040}'..='\u{309F}' // hiragana
            | '\u{30A0}'..='\u{30FF}' // katakana
            | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        )
    });
    if japanese {
        Language::Japanese
    } else {
        Language::English
    }
}
