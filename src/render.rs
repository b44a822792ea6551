use std::io::{self, Stdout, Write};

use crate::theme::Theme;

/// Line-oriented terminal output for status updates and streamed text.
///
/// Write failures are ignored; the terminal is best effort.
pub struct Renderer<W: Write = Stdout> {
    out: W,
    theme: Theme,
    streaming: bool,
}

impl Renderer<Stdout> {
    pub fn stdout(theme: Theme) -> Self {
        Self::new(io::stdout(), theme)
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, theme: Theme) -> Self {
        Self {
            out,
            theme,
            streaming: false,
        }
    }

    pub fn status(&mut self, text: &str) {
        self.end_stream();
        let line = self.theme.status.apply(&format!("⏳ {text}"));
        let _ = writeln!(self.out, "{line}");
    }

    /// Append a piece of generated text to the current block.
    pub fn delta(&mut self, text: &str) {
        if !self.streaming {
            let _ = writeln!(self.out);
            self.streaming = true;
        }
        let _ = write!(self.out, "{}", self.theme.content.apply(text));
        let _ = self.out.flush();
    }

    pub fn succeed(&mut self, text: &str) {
        self.end_stream();
        let line = self.theme.success.apply(&format!("✔ {text}"));
        let _ = writeln!(self.out, "{line}");
    }

    pub fn fail(&mut self, text: &str) {
        self.end_stream();
        let line = self.theme.error.apply(&format!("✖ {text}"));
        let _ = writeln!(self.out, "{line}");
    }

    pub fn notice(&mut self, text: &str) {
        self.end_stream();
        let line = self.theme.notice.apply(text);
        let _ = writeln!(self.out, "{line}");
    }

    /// Raw output, e.g. `git status`.
    pub fn plain(&mut self, text: &str) {
        self.end_stream();
        let _ = write!(self.out, "{text}");
        if !text.ends_with('\n') {
            let _ = writeln!(self.out);
        }
        let _ = self.out.flush();
    }

    fn end_stream(&mut self) {
        if self.streaming {
            let _ = writeln!(self.out, "\n");
            self.streaming = false;
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(f: impl FnOnce(&mut Renderer<Vec<u8>>)) -> String {
        colored::control::set_override(false);
        let mut renderer = Renderer::new(Vec::new(), Theme::monochrome());
        f(&mut renderer);
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn streamed_block_is_framed_by_blank_lines() {
        let out = render(|r| {
            r.status("Generating content...");
            r.delta("fix: ");
            r.delta("bug");
            r.succeed("Content generated!");
        });

        assert_eq!(out, "⏳ Generating content...\n\nfix: bug\n\n✔ Content generated!\n");
    }

    #[test]
    fn plain_text_gets_a_trailing_newline() {
        let out = render(|r| {
            r.plain(" M src/main.rs");
            r.plain("?? new.rs\n");
        });
        assert_eq!(out, " M src/main.rs\n?? new.rs\n");
    }
}
