use inksac::prelude::*;
use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Error,
    Success,
    Hint,
}

/// Colours output when the terminal supports it; otherwise text passes
/// through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Highlighter {
    enabled: bool,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        let support = check_color_support().unwrap_or(ColorSupport::NoColor);
        Self {
            enabled: !matches!(support, ColorSupport::NoColor) && std::io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { enabled: false }
    }

    /// Program name in bold cyan, flags in yellow.
    pub fn command(&self, input: &str) -> String {
        if !self.enabled {
            return input.to_string();
        }

        let command_style = Style::builder().foreground(Color::Cyan).bold().build();
        let flag_style = Style::builder().foreground(Color::Yellow).build();

        input
            .split(' ')
            .enumerate()
            .map(|(i, part)| match i {
                0 => part.style(command_style).to_string(),
                _ if part.starts_with('-') => part.style(flag_style).to_string(),
                _ => part.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn paint(&self, text: &str, tone: Tone) -> String {
        if !self.enabled {
            return text.to_string();
        }

        let style = match tone {
            Tone::Error => Style::builder().foreground(Color::Red).bold().build(),
            Tone::Success => Style::builder().foreground(Color::Green).build(),
            Tone::Hint => Style::builder().foreground(Color::RGB(128, 128, 128)).build(),
        };
        text.style(style).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_passes_through() {
        let highlighter = Highlighter::plain();
        assert_eq!(highlighter.command("ls  -la /tmp"), "ls  -la /tmp");
        assert_eq!(highlighter.paint("boom", Tone::Error), "boom");
        assert_eq!(highlighter.paint("[exit 1]", Tone::Hint), "[exit 1]");
    }
}
