//! Prompt templates.
//!
//! Callers must reject blank input before getting here; taking
//! [`NonEmptyString`] makes that a type-level requirement.

use jifra_types::{Direction, NonEmptyString, Style};

use crate::detect_language;

/// Build the instruction sent to the remote model.
#[must_use]
pub fn build_prompt(style: Style, direction: Direction, input: &NonEmptyString) -> String {
    let input = input.as_str();
    match style {
        Style::PromptGen => format!(
            "\n以下のキーワードを元に、3種類の高品質なAIプロンプト（英語）を作成してください。\n\
             説明は不要です。\n\
             【入力】: {input}\n\
             【出力形式】\n\
             Midjourney風: /imagine prompt: [詳細な描写, スタイル, ライティング]\n\
             Stable Diffusion風: (masterpiece, best quality, ultra-detailed), [タグ形式の描写], [アーティスト名], --n [ネガティブ]\n\
             System Prompt風: You are a helpful assistant specialized in [分野]. Your task is to [詳細な役割]...\n"
        ),
        Style::Sns => {
            format!("SNS投稿(日・英・仏)を作成。絵文字・タグ付。空行必須。入力: {input}")
        }
        Style::Casual | Style::Formal => {
            let tone = if style == Style::Casual {
                "カジュアル"
            } else {
                "フォーマル"
            };
            let direction_hint = match direction {
                Direction::Auto => format!(
                    "{}(入力言語: {})",
                    direction.as_str(),
                    detect_language(input).code()
                ),
                other => other.as_str().to_string(),
            };
            format!(
                "プロの翻訳者として、{direction_hint}に基づき{tone}な翻訳パターンを2つ、\
                 それぞれの戻し訳と共に提示してください。余計な説明は不要。形式:\n\
                 パターン1: [翻訳]\n\
                 戻し訳1: [訳]\n\
                 パターン2: [翻訳]\n\
                 戻し訳2: [訳]\n\
                 入力: {input}"
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text: &str) -> NonEmptyString {
        NonEmptyString::new(text).unwrap()
    }

    #[test]
    fn translation_prompt_names_direction_and_tone() {
        let prompt = build_prompt(Style::Formal, Direction::JaFr, &input("お元気ですか"));
        assert!(prompt.contains("ja_fr"));
        assert!(prompt.contains("フォーマル"));
        assert!(prompt.contains("戻し訳2: [訳]"));
        assert!(prompt.ends_with("入力: お元気ですか"));
    }

    #[test]
    fn casual_tone() {
        let prompt = build_prompt(Style::Casual, Direction::FrJa, &input("Salut"));
        assert!(prompt.contains("カジュアル"));
        assert!(prompt.contains("fr_ja"));
    }

    #[test]
    fn auto_direction_includes_detected_language() {
        let ja = build_prompt(Style::Casual, Direction::Auto, &input("こんにちは"));
        assert!(ja.contains("auto(入力言語: ja)"));
        let en = build_prompt(Style::Casual, Direction::Auto, &input("hello"));
        assert!(en.contains("auto(入力言語: en)"));
    }

    #[test]
    fn sns_prompt_ignores_direction() {
        let a = build_prompt(Style::Sns, Direction::JaEn, &input("旅行"));
        let b = build_prompt(Style::Sns, Direction::Auto, &input("旅行"));
        assert_eq!(a, b);
        assert!(a.contains("SNS投稿"));
    }

    #[test]
    fn prompt_gen_lists_three_formats() {
        let prompt = build_prompt(Style::PromptGen, Direction::Auto, &input("sunset, city"));
        assert!(prompt.contains("【入力】: sunset, city"));
        assert!(prompt.contains("Midjourney風"));
        assert!(prompt.contains("Stable Diffusion風"));
        assert!(prompt.contains("System Prompt風"));
    }

    #[test]
    fn deterministic() {
        let text = input("same");
        assert_eq!(
            build_prompt(Style::Casual, Direction::JaEn, &text),
            build_prompt(Style::Casual, Direction::JaEn, &text)
        );
    }
}
