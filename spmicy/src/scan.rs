//! Byte-level search for the `StreamTitle` field of an ICY metadata block

/// Literal that opens the title field inside a metadata block
pub const STREAM_TITLE_MARKER: &[u8] = b"StreamTitle='";

/// Byte that terminates one metadata field
pub const METADATA_TERMINATOR: u8 = b';';

/// Finds the stream title in one `;`-delimited chunk.
///
/// The marker only matches where at least one byte follows it inside the
/// chunk. The title runs from the end of the marker up to the last two bytes
/// of the chunk, which are the closing `'` and the `;` terminator:
///
/// ```
/// use spmicy::find_stream_title;
///
/// assert_eq!(
///     find_stream_title(b"StreamTitle='Miles Davis - So What';").as_deref(),
///     Some("Miles Davis - So What")
/// );
/// assert_eq!(find_stream_title(b"\x00\x17audio bytes;"), None);
/// ```
///
/// Returns `Some("")` when the marker is present but the chunk is too short
/// to hold a title.
pub fn find_stream_title(chunk: &[u8]) -> Option<String> {
    let marker_len = STREAM_TITLE_MARKER.len();
    let candidates = chunk.len().saturating_sub(marker_len);

    let pos = chunk
        .windows(marker_len)
        .take(candidates)
        .position(|window| window == STREAM_TITLE_MARKER)?;

    let start = pos + marker_len;
    let end = chunk.len().saturating_sub(2);
    let title = chunk.get(start..end).unwrap_or_default();
    Some(String::from_utf8_lossy(title).into_owned())
}
