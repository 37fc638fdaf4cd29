/// keep only the ascii alphanumerics of `text`, lowercased
///
/// header keys and `begin`/`end` values are compared in this form, so
/// `# Begin: Data Binary 4` and `#begin:databinary4` are the same record
pub(crate) fn collapse_alnum(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// drop every whitespace character and lowercase the rest
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// parse a float that may use a fortran style `d` exponent marker
pub(crate) fn parse_float(token: &str) -> Option<f64> {
    if token.contains(|c| c == 'd' || c == 'D') {
        token.replace(|c| c == 'd' || c == 'D', "e").parse().ok()
    } else {
        token.parse().ok()
    }
}

/// split a list value into its elements
///
/// elements are separated by whitespace; an element wrapped in braces or
/// double quotes may contain whitespace of its own
pub(crate) fn split_list(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = value.chars().peekable();

    loop {
        while chars.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
            chars.next();
        }

        let first = match chars.next() {
            Some(c) => c,
            None => break,
        };

        let mut element = String::new();
        match first {
            '{' => {
                let mut depth = 1;
                for c in chars.by_ref() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => (),
                    }
                    element.push(c);
                }
            }
            '"' => {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    element.push(c);
                }
            }
            c => {
                element.push(c);
                while let Some(c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    element.push(*c);
                    chars.next();
                }
            }
        }

        out.push(element);
    }

    out
}

/// inverse of [`split_list`]
pub(crate) fn merge_list<S: AsRef<str>>(elements: &[S]) -> String {
    elements
        .iter()
        .map(|element| {
            let element = element.as_ref();
            if element.is_empty() || element.contains(char::is_whitespace) {
                format!("{{{}}}", element)
            } else {
                element.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
