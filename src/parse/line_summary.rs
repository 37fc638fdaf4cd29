use std::fmt;

const MAX_SHOWN: usize = 60;

/// Short description of an offending input line for error messages.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LineSummary {
    text: Option<String>,
}

impl fmt::Display for LineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) if text.is_empty() => write!(f, "an empty line"),
            Some(text) => write!(f, "line `{}`", text),
            None => write!(f, "end of file"),
        }
    }
}

impl LineSummary {
    pub(crate) fn new(line: &str) -> Self {
        let line = line.trim();
        let text = if line.chars().count() > MAX_SHOWN {
            let mut cut: String = line.chars().take(MAX_SHOWN).collect();
            cut.push_str("...");
            cut
        } else {
            line.to_string()
        };

        Self { text: Some(text) }
    }

    pub(crate) fn eof() -> Self {
        Self { text: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries() {
        assert_eq!(LineSummary::new("  # Begin: Header \r").to_string(), "line `# Begin: Header`");
        assert_eq!(LineSummary::eof().to_string(), "end of file");

        let long = "1 ".repeat(100);
        let shown = LineSummary::new(&long).to_string();
        assert!(shown.ends_with("...`"));
        assert!(shown.len() < 80);
    }
}
