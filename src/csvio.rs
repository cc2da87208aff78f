//! Minimal CSV field handling shared by the allow-list store and the
//! unauthorized-device event log.
//!
//! Both files are small, flat tables with a fixed column set; this module
//! keeps the quoting rules in one place.

/// Quote a field if it contains a delimiter, quote, or line break.
pub fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join fields into one CSV record (without the trailing newline).
pub fn format_record(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Split one CSV record into fields, honoring double-quote escaping.
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields_pass_through() {
        assert_eq!(format_record(&["046d", "c52b", "unknown"]), "046d,c52b,unknown");
        assert_eq!(split_record("046d,c52b,unknown"), vec!["046d", "c52b", "unknown"]);
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let formatted = format_record(&["046d", "Logitech, Inc."]);
        assert_eq!(formatted, "046d,\"Logitech, Inc.\"");
        assert_eq!(split_record(&formatted), vec!["046d", "Logitech, Inc."]);
    }

    #[test]
    fn test_embedded_quotes_round_trip() {
        let formatted = format_record(&["a\"b", "plain"]);
        assert_eq!(split_record(&formatted), vec!["a\"b", "plain"]);
    }

    #[test]
    fn test_empty_fields_preserved() {
        assert_eq!(split_record("a,,b"), vec!["a", "", "b"]);
        assert_eq!(split_record(""), vec![""]);
    }
}
