use super::ByteSource;
use crate::error::Result;

/// Consume the stream up to and including the first occurrence of `marker`.
///
/// Returns `Ok(false)` when the stream ends without the marker, leaving it
/// consumed to EOF. Matching keeps only the marker's prefix table in memory.
pub async fn locate_array<S: ByteSource>(source: &mut S, marker: &str) -> Result<bool> {
    let pattern = marker.as_bytes();
    if pattern.is_empty() {
        return Ok(true);
    }

    let fallback = prefix_table(pattern);
    let mut matched = 0usize;

    while let Some(byte) = source.read_byte().await? {
        while matched > 0 && pattern[matched] != byte {
            matched = fallback[matched - 1];
        }
        if pattern[matched] == byte {
            matched += 1;
            if matched == pattern.len() {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

/// After one array element has been read, move past the separator.
///
/// Returns true on `,` (another element follows) and false on `]`, at EOF,
/// or when the stream fails.
pub async fn advance_past_element<S: ByteSource>(source: &mut S) -> bool {
    match source.read_until(b",]").await {
        Ok(Some(b',')) => true,
        Ok(_) => false,
        Err(e) => {
            tracing::warn!("Stream error while looking for next array element: {}", e);
            false
        }
    }
}

/// Knuth-Morris-Pratt failure function: for each prefix, the length of its
/// longest proper prefix that is also a suffix.
fn prefix_table(pattern: &[u8]) -> Vec<usize> {
    let mut table = vec![0usize; pattern.len()];
    let mut len = 0usize;

    for i in 1..pattern.len() {
        while len > 0 && pattern[i] != pattern[len] {
            len = table[len - 1];
        }
        if pattern[i] == pattern[len] {
            len += 1;
        }
        table[i] = len;
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IrrigationError;
    use crate::stream::SliceSource;

    #[tokio::test]
    async fn finds_marker_after_large_preamble() {
        let mut body = String::from("{\"metadata\":{");
        body.push_str(&"\"pad\":\"xxxxxxxxxx\",".repeat(5000));
        body.push_str("\"x\":1},\"summaries\":[{\"a\":1}]}");

        let mut src = SliceSource::new(body.as_bytes());
        assert!(locate_array(&mut src, "\"summaries\":[").await.unwrap());
        assert_eq!(src.remaining(), b"{\"a\":1}]}");
    }

    #[tokio::test]
    async fn missing_marker_consumes_to_eof() {
        let mut src = SliceSource::new(b"{\"observations\":{}}");
        assert!(!locate_array(&mut src, "\"summaries\":[").await.unwrap());
        assert!(src.remaining().is_empty());
    }

    #[tokio::test]
    async fn overlapping_partial_match_is_not_lost() {
        // "aab" inside "aaab" requires falling back rather than restarting
        let mut src = SliceSource::new(b"xaaab!");
        assert!(locate_array(&mut src, "aab").await.unwrap());
        assert_eq!(src.remaining(), b"!");
    }

    #[tokio::test]
    async fn near_miss_marker_is_skipped() {
        let mut src = SliceSource::new(b"\"summaries\":{} \"summaries\":[1]");
        assert!(locate_array(&mut src, "\"summaries\":[").await.unwrap());
        assert_eq!(src.remaining(), b"1]");
    }

    #[tokio::test]
    async fn comma_means_more_elements() {
        let mut src = SliceSource::new(b"  ,{\"b\":2}]");
        assert!(advance_past_element(&mut src).await);
        assert_eq!(src.remaining(), b"{\"b\":2}]");
    }

    #[tokio::test]
    async fn bracket_or_eof_ends_array() {
        let mut src = SliceSource::new(b" ]}");
        assert!(!advance_past_element(&mut src).await);

        let mut src = SliceSource::new(b"   ");
        assert!(!advance_past_element(&mut src).await);
    }

    struct FailingSource;

    impl ByteSource for FailingSource {
        async fn read_byte(&mut self) -> Result<Option<u8>> {
            Err(IrrigationError::ConnectionFailure("reset by peer".into()))
        }
    }

    #[tokio::test]
    async fn stream_error_ends_array() {
        assert!(!advance_past_element(&mut FailingSource).await);
        assert!(locate_array(&mut FailingSource, "x").await.is_err());
    }

    #[test]
    fn prefix_table_values() {
        assert_eq!(prefix_table(b"aab"), vec![0, 1, 0]);
        assert_eq!(prefix_table(b"abab"), vec![0, 0, 1, 2]);
    }
}
