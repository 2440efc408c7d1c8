//! Parsing of uploaded address lists
//!
//! Uploads are line-oriented UTF-8 text, one address per line, with optional
//! `#`/`//` comments. CSV rows are accepted by taking their first field. The
//! result is capped at the batch ceiling.

use mailvet_core::MAX_BATCH_SIZE;

/// Extract addresses from an uploaded TXT/CSV body.
///
/// Per line: trim; drop empty lines and comments; on a `,` take the first
/// field; keep the field only if it contains `@` and is longer than 3
/// characters. The list is truncated to the first [`MAX_BATCH_SIZE`] entries.
pub fn parse_address_list(input: &str) -> Vec<String> {
    let mut addresses = Vec::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        let field = if line.contains(',') {
            line.split(',').next().unwrap_or(line).trim()
        } else {
            line
        };

        if field.contains('@') && field.len() > 3 {
            addresses.push(field.to_string());
        }

        if addresses.len() == MAX_BATCH_SIZE {
            break;
        }
    }

    addresses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_plain_lines() {
        let input = "a@example.com\nb@example.com\n";
        assert_eq!(
            parse_address_list(input),
            vec!["a@example.com", "b@example.com"]
        );
    }

    #[test]
    fn test_trims_and_drops_empty_lines_and_comments() {
        let input = "  a@example.com  \n\n# comment\n// also a comment\nb@example.com\n";
        assert_eq!(
            parse_address_list(input),
            vec!["a@example.com", "b@example.com"]
        );
    }

    #[test]
    fn test_csv_rows_take_first_field() {
        let input = "a@example.com,Alice,active\nb@example.com , Bob\n";
        assert_eq!(
            parse_address_list(input),
            vec!["a@example.com", "b@example.com"]
        );
    }

    #[test]
    fn test_filters_fields_without_at_or_too_short() {
        let input = "not-an-address\na@b\nok@example.com\n";
        // "a@b" has an @ but is only 3 characters long
        assert_eq!(parse_address_list(input), vec!["ok@example.com"]);
    }

    #[test]
    fn test_length_filter_applies_to_csv_field_not_line() {
        // The line is long but its first field is not
        let input = "a@b,this-line-is-long-enough\n";
        assert!(parse_address_list(input).is_empty());
    }

    #[test]
    fn test_truncates_to_batch_ceiling() {
        let mut input = String::new();
        for i in 0..(MAX_BATCH_SIZE + 10) {
            input.push_str(&format!("user{i}@example.com\n"));
        }

        let addresses = parse_address_list(&input);
        assert_eq!(addresses.len(), MAX_BATCH_SIZE);
        assert_eq!(addresses[0], "user0@example.com");
        assert_eq!(
            addresses[MAX_BATCH_SIZE - 1],
            format!("user{}@example.com", MAX_BATCH_SIZE - 1)
        );
    }
}
