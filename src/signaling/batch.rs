/// Separator line written in front of every trickled candidate.
pub const ICE_SEPARATOR: &str = "------ ICE Candidate -------";

/// Line break used when appending to the outbound candidate field.
pub const CR: char = '\r';

/// Splits a pasted candidate batch into records.
///
/// Whatever precedes the first separator is not a record. Records are
/// trimmed and blank fragments are skipped, so trailing separators or the
/// `\r\n` a text area adds are harmless.
pub fn split_batch<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    text.split(separator)
        .skip(1)
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .collect()
}

/// Frames one encoded record for appending to the outbound candidate field.
pub fn frame_record(record: &str) -> String {
    format!("{CR}{ICE_SEPARATOR}{CR}{record}{CR}")
}

pub fn batch_of<S: AsRef<str>>(records: &[S]) -> String {
    records
        .iter()
        .map(|record| frame_record(record.as_ref()))
        .collect()
}
