//! Terminal text sanitization.
//!
//! Model output and remote error bodies are untrusted. Escape sequences in them
//! could move the cursor, rewrite the screen or touch the clipboard, so they are
//! stripped before anything reaches the terminal.

use std::borrow::Cow;

const ESC: char = '\x1b';
const BEL: char = '\x07';

/// Strip ANSI escape sequences and control characters other than `\n` and `\t`.
///
/// Returns `Cow::Borrowed` when the input is already clean.
///
/// ```
/// use jifra_types::sanitize_terminal_text;
///
/// assert_eq!(sanitize_terminal_text("Bonjour"), "Bonjour");
/// assert_eq!(sanitize_terminal_text("Bon\x1b[2Jjour"), "Bonjour");
/// ```
#[must_use]
pub fn sanitize_terminal_text(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_disallowed) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ESC => match chars.peek() {
                Some('[') => {
                    chars.next();
                    // CSI: parameters then a final byte in 0x40..=0x7e
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    // OSC: terminated by BEL or ST (ESC \)
                    while let Some(c) = chars.next() {
                        if c == BEL {
                            break;
                        }
                        if c == ESC && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                Some(_) => {
                    chars.next();
                }
                None => {}
            },
            c if is_disallowed(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn is_disallowed(c: char) -> bool {
    let c0 = c <= '\x1f' && !matches!(c, '\n' | '\t');
    let c1 = ('\u{0080}'..='\u{009f}').contains(&c);
    c0 || c1 || c == '\x7f'
}

#[cfg(test)]
mod tests {
    use super::sanitize_terminal_text;
    use std::borrow::Cow;

    #[test]
    fn clean_text_is_borrowed() {
        assert!(matches!(
            sanitize_terminal_text("パターン1: Bonjour\n"),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn strips_csi_and_osc() {
        assert_eq!(sanitize_terminal_text("a\x1b[31mred\x1b[0m"), "ared");
        assert_eq!(
            sanitize_terminal_text("x\x1b]52;c;ZXZpbA==\x07y"),
            "xy"
        );
        assert_eq!(sanitize_terminal_text("x\x1b]8;;url\x1b\\y"), "xy");
    }

    #[test]
    fn strips_control_characters() {
        assert_eq!(sanitize_terminal_text("a\rb\x7fc\u{009b}d"), "abcd");
    }
}
