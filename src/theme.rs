pub use colored::{Color, Colorize};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorScheme {
    pub foreground: Option<Color>,
    pub bold: bool,
    pub dimmed: bool,
}

impl ColorScheme {
    fn fg(color: Color) -> Self {
        Self {
            foreground: Some(color),
            ..Default::default()
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn apply(&self, text: &str) -> colored::ColoredString {
        let mut colored_text: colored::ColoredString = text.into();

        if let Some(fg) = &self.foreground {
            colored_text = colored_text.color(*fg);
        }
        if self.bold {
            colored_text = colored_text.bold();
        }
        if self.dimmed {
            colored_text = colored_text.dimmed();
        }

        colored_text
    }
}

/// Styles for each kind of line the CLI prints.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub status: ColorScheme,
    pub content: ColorScheme,
    pub success: ColorScheme,
    pub notice: ColorScheme,
    pub error: ColorScheme,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            status: ColorScheme::fg(Color::Cyan),
            content: ColorScheme::default(),
            success: ColorScheme::fg(Color::Green).bold(),
            notice: ColorScheme::fg(Color::Yellow),
            error: ColorScheme::fg(Color::Red).bold(),
        }
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self::default()
    }

    pub fn light() -> Self {
        Self {
            status: ColorScheme::fg(Color::Blue),
            content: ColorScheme::fg(Color::Black),
            success: ColorScheme::fg(Color::Green),
            notice: ColorScheme::fg(Color::Magenta),
            error: ColorScheme::fg(Color::Red),
        }
    }

    pub fn monochrome() -> Self {
        Self {
            status: ColorScheme {
                dimmed: true,
                ..Default::default()
            },
            content: ColorScheme::default(),
            success: ColorScheme::default().bold(),
            notice: ColorScheme::default(),
            error: ColorScheme::default().bold(),
        }
    }

    /// Resolve a theme by its config name, falling back to the dark theme.
    pub fn named(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "light" => Self::light(),
            "monochrome" | "mono" => Self::monochrome(),
            _ => Self::dark(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_themes() {
        assert_eq!(Theme::named("Light"), Theme::light());
        assert_eq!(Theme::named("mono"), Theme::monochrome());
        assert_eq!(Theme::named("solarized"), Theme::dark());
    }

    #[test]
    fn schemes_style_text() {
        let text = Theme::dark().success.apply("done");
        assert_eq!(text.fgcolor(), Some(Color::Green));
        assert_eq!(Theme::light().notice.apply("hm").fgcolor(), Some(Color::Magenta));
    }

    #[test]
    fn monochrome_applies_no_color() {
        let text = Theme::monochrome().content.apply("plain");
        assert_eq!(text.fgcolor(), None);
    }
}
