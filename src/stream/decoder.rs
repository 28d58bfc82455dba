use super::ByteSource;
use crate::error::{IrrigationError, Result};
use crate::models::WeatherRecord;
use serde::Deserialize;

/// Largest single observation object accepted from the stream, in bytes
pub const MAX_OBJECT_BYTES: usize = 4096;

// PWS API element shape. Daily summaries carry `humidityAvg`/`tempAvg`;
// current observations report the same quantities as `humidity`/`temp`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WuObservation {
    #[serde(default)]
    obs_time_local: Option<String>,
    #[serde(alias = "humidity")]
    humidity_avg: f64,
    imperial: WuImperial,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WuImperial {
    #[serde(alias = "temp")]
    temp_avg: f64,
    precip_rate: f64,
    precip_total: f64,
}

/// Decode exactly one JSON object from the stream into a record.
///
/// Leading whitespace is skipped; whatever follows the closing brace is left
/// for the scanner. Any structural or field error fails the whole record.
pub async fn decode_one<S: ByteSource>(source: &mut S) -> Result<WeatherRecord> {
    let object = capture_object(source).await?;

    let obs: WuObservation = serde_json::from_slice(&object)
        .map_err(|e| IrrigationError::RecordMalformed(e.to_string()))?;

    Ok(WeatherRecord::new(
        obs.obs_time_local.as_deref(),
        obs.humidity_avg.round() as i32,
        obs.imperial.temp_avg,
        obs.imperial.precip_rate,
        obs.imperial.precip_total,
    ))
}

/// Copy one balanced `{...}` object off the stream into a bounded buffer
async fn capture_object<S: ByteSource>(source: &mut S) -> Result<Vec<u8>> {
    let first = loop {
        match source.read_byte().await? {
            Some(b' ' | b'\t' | b'\n' | b'\r') => continue,
            Some(b) => break b,
            None => return Err(malformed("stream ended before object")),
        }
    };

    if first != b'{' {
        return Err(malformed(&format!(
            "expected '{{', found {:?}",
            char::from(first)
        )));
    }

    let mut buf = Vec::with_capacity(512);
    buf.push(first);

    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;

    while depth > 0 {
        let byte = source
            .read_byte()
            .await?
            .ok_or_else(|| malformed("stream ended inside object"))?;

        if buf.len() >= MAX_OBJECT_BYTES {
            return Err(malformed(&format!(
                "object exceeds {} bytes",
                MAX_OBJECT_BYTES
            )));
        }
        buf.push(byte);

        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth -= 1,
            _ => {}
        }
    }

    Ok(buf)
}

fn malformed(msg: &str) -> IrrigationError {
    IrrigationError::RecordMalformed(msg.to_string())
}
