//! Comma separated prize lists, header row `id,name,description,prizeType`.
//!
//! A field wrapped in double quotes may contain commas, a doubled quote
//! inside it stands for one quote. One record per line.
use crate::{error::LedgerError, validation::RaffleItemDraft};

pub const COLUMNS: [&str; 4] = ["id", "name", "description", "prizeType"];

pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                quoted = true;
            }
            ',' if !quoted => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());

    fields
}

fn invalid(message: &str, errors: Vec<String>) -> LedgerError {
    LedgerError::InvalidBatch {
        message: message.to_string(),
        errors,
    }
}

/// One data row and the file line it came from, counting from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub line: usize,
    pub draft: RaffleItemDraft,
}

/// Rows keyed by header name. Unknown columns are ignored, short rows
/// leave the missing fields empty for validation to report. Blank lines
/// are skipped but still counted.
pub fn parse_items(text: &str) -> Result<Vec<CsvRow>, LedgerError> {
    let mut lines = text
        .trim_start_matches('\u{feff}')
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return Err(invalid(
            "Please select a valid CSV file.",
            vec!["The file is empty.".to_string()],
        ));
    };

    let header = split_record(header);
    let position = |column: &str| header.iter().position(|name| name == column);

    let missing: Vec<String> = COLUMNS
        .iter()
        .filter(|column| position(**column).is_none())
        .map(|column| format!("Missing column \"{column}\"."))
        .collect();
    if !missing.is_empty() {
        return Err(invalid(
            "CSV header must be id,name,description,prizeType.",
            missing,
        ));
    }

    let [id, name, description, prize_type] = COLUMNS.map(position);
    let rows: Vec<CsvRow> = lines
        .map(|(number, line)| {
            let values = split_record(line);
            let value = |index: Option<usize>| {
                index
                    .and_then(|index| values.get(index))
                    .cloned()
                    .unwrap_or_default()
            };

            CsvRow {
                line: number,
                draft: RaffleItemDraft {
                    id: value(id),
                    name: value(name),
                    description: value(description),
                    prize_type: value(prize_type),
                },
            }
        })
        .collect();

    if rows.is_empty() {
        return Err(invalid(
            "Please select a valid CSV file.",
            vec!["The file has a header row but no items.".to_string()],
        ));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields() {
        assert_eq!(split_record("P1, Toy ,A toy,minor"), ["P1", "Toy", "A toy", "minor"]);
    }

    #[test]
    fn test_quoted_fields() {
        assert_eq!(
            split_record(r#"P2,"Bike, red","Fast, light",major"#),
            ["P2", "Bike, red", "Fast, light", "major"]
        );
        assert_eq!(
            split_record(r#"P3,"The ""best"" mug",Mug,minor"#),
            ["P3", "The \"best\" mug", "Mug", "minor"]
        );
    }

    #[test]
    fn test_empty_fields_keep_their_column() {
        assert_eq!(split_record("P4,,Desc,grand"), ["P4", "", "Desc", "grand"]);
        assert_eq!(split_record("P5,Name,Desc,"), ["P5", "Name", "Desc", ""]);
    }

    #[test]
    fn test_parse_items_by_header() {
        let text = "name,id,prizeType,description\r\nToy,P1,minor,A toy\n\n\"TV, 4k\",P2,grand,Big screen\n";
        let rows = parse_items(text).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].draft.id, "P1");
        assert_eq!(rows[0].draft.description, "A toy");
        assert_eq!(rows[1].draft.name, "TV, 4k");
        assert_eq!(rows[1].draft.prize_type, "grand");
    }

    #[test]
    fn test_rows_keep_their_file_line() {
        let text = "\nid,name,description,prizeType\nP1,Toy,A toy,minor\n\n  \nP2,Mug,A mug,minor\n";
        let lines: Vec<usize> = parse_items(text).unwrap().iter().map(|row| row.line).collect();

        assert_eq!(lines, [3, 6]);
    }

    #[test]
    fn test_parse_items_rejects_bad_files() {
        assert!(matches!(
            parse_items("   \n"),
            Err(LedgerError::InvalidBatch { .. })
        ));
        assert!(matches!(
            parse_items("id,name,description,prizeType\n"),
            Err(LedgerError::InvalidBatch { .. })
        ));

        match parse_items("id,name\nP1,Toy") {
            Err(LedgerError::InvalidBatch { errors, .. }) => assert_eq!(
                errors,
                [
                    "Missing column \"description\".",
                    "Missing column \"prizeType\"."
                ]
            ),
            other => panic!("expected invalid batch, got {other:?}"),
        }
    }

    #[test]
    fn test_short_rows_leave_fields_empty() {
        let rows = parse_items("id,name,description,prizeType\nP1,Toy").unwrap();
        assert_eq!(rows[0].draft.description, "");
        assert_eq!(rows[0].draft.prize_type, "");
    }
}
