use crate::error::{Error, Result};
use crate::models::{ItemId, RatingRecord};
use crate::utils::decode_latin1;
use std::collections::HashMap;
use std::io::Read;

const RATING_FIELDS: usize = 4;

// `user \t item \t rating \t timestamp`
pub fn parse_ratings<R: Read>(reader: R) -> Result<Vec<RatingRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| csv_error(e, malformed_rating))?;
        let line = record_line(record.position());

        if record.len() != RATING_FIELDS {
            return Err(malformed_rating(
                line,
                format!("expected {} tab separated fields, found {}", RATING_FIELDS, record.len()),
            ));
        }

        let rating: RatingRecord = record
            .deserialize(None)
            .map_err(|e| malformed_rating(line, e.to_string()))?;
        if !rating.rating.is_finite() {
            return Err(malformed_rating(line, format!("invalid rating '{}'", &record[2])));
        }
        records.push(rating);
    }

    Ok(records)
}

pub fn parse_titles<R: Read>(reader: R) -> Result<HashMap<ItemId, String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut titles = HashMap::new();
    for result in reader.byte_records() {
        let record = result.map_err(|e| csv_error(e, malformed_title))?;
        let line = record_line(record.position());

        let (id, title) = match (record.get(0), record.get(1)) {
            (Some(id), Some(title)) => (decode_latin1(id), decode_latin1(title)),
            _ => return Err(malformed_title(line, "missing title column".to_string())),
        };
        let item_id: ItemId = id
            .trim()
            .parse()
            .map_err(|_| malformed_title(line, format!("invalid item id '{}'", id)))?;

        titles.insert(item_id, title);
    }

    Ok(titles)
}

fn malformed_rating(line: usize, reason: String) -> Error {
    Error::MalformedRating { line, reason }
}

fn malformed_title(line: usize, reason: String) -> Error {
    Error::MalformedTitle { line, reason }
}

fn record_line(position: Option<&csv::Position>) -> usize {
    position.map(|pos| pos.line() as usize).unwrap_or(0)
}

fn csv_error(error: csv::Error, malformed: fn(usize, String) -> Error) -> Error {
    let line = record_line(error.position());
    let reason = error.to_string();
    match error.into_kind() {
        csv::ErrorKind::Io(source) => Error::Io(source),
        _ => malformed(line, reason),
    }
}
