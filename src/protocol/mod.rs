//! Wire contract between the coordinator and the worker pool
//!
//! Both queues carry plain-text payloads with AMQP header metadata:
//!
//! | Message | Queue | Payload | Headers |
//! |---|---|---|---|
//! | Task | task queue | decimal file index | `sample_type` |
//! | Result (empty) | result queue | `No data` | `sample_type` |
//! | Result (data) | result queue | JSON array of serialized fragments | `sample_type`, `batch` |
//! | Termination | task queue | `fin` | none |
//!
//! A data result's payload is a JSON array of strings, each string a
//! JSON-serialized [`EventBatch`]. The `batch` header is the number of
//! sibling messages the worker split one task's output into; each sibling
//! advances completion by `1/batch`. The encode half of the contract exists
//! for workers and tests; the coordinator itself only encodes task and
//! termination messages and decodes results.

use crate::frames::{EventBatch, UnknownSample};
use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use lapin::BasicProperties;
use thiserror::Error;

/// Header naming the sample group a message belongs to
pub const SAMPLE_TYPE_HEADER: &str = "sample_type";

/// Header carrying the sibling-message count of a batch-split task output
pub const BATCH_HEADER: &str = "batch";

/// Payload of a result message for a task that produced no events
pub const NO_DATA_PAYLOAD: &str = "No data";

/// Payload of a termination sentinel
pub const FIN_PAYLOAD: &str = "fin";

/// Protocol faults
///
/// All of these are fatal to the coordinator: the producer contract is
/// violated and silently tolerating it would corrupt the completion
/// arithmetic or the per-group buckets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("message carries no headers")]
    MissingHeaders,

    #[error("message is missing the '{SAMPLE_TYPE_HEADER}' header")]
    MissingSampleType,

    #[error("data result for sample '{sample}' is missing the '{BATCH_HEADER}' header")]
    MissingBatch { sample: String },

    #[error("data result for sample '{sample}' carries non-positive batch count {value}")]
    NonPositiveBatch { sample: String, value: i64 },

    #[error(transparent)]
    UnknownSample(#[from] UnknownSample),

    #[error("malformed payload for sample '{sample}': {detail}")]
    BadPayload { sample: String, detail: String },

    #[error(
        "fragment for sample '{sample}' has {mass} mass entries but {weights} weight entries"
    )]
    ColumnLengthMismatch {
        sample: String,
        mass: usize,
        weights: usize,
    },
}

/// One task: a (sample group, file index) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMessage {
    pub sample: String,
    pub file_index: usize,
}

/// What a worker reads off the task queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    /// Process one file of one sample group
    Process(TaskMessage),
    /// Termination sentinel: finish up and exit
    Finish,
}

/// Decoded result message
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMessage {
    pub sample: String,
    pub body: ResultBody,
}

/// Result message body
#[derive(Debug, Clone, PartialEq)]
pub enum ResultBody {
    /// The task produced no events; counts as one whole completion unit
    NoData,
    /// One of `batch` sibling messages carrying this task's output. The
    /// payload's fragments are already concatenated into a single batch.
    Data { fragment: EventBatch, batch: u64 },
}

/// Encode a task message as (payload, properties)
pub fn encode_task(task: &TaskMessage) -> (Vec<u8>, BasicProperties) {
    let mut headers = FieldTable::default();
    headers.insert(
        ShortString::from(SAMPLE_TYPE_HEADER),
        AMQPValue::LongString(LongString::from(task.sample.as_str())),
    );

    (
        task.file_index.to_string().into_bytes(),
        BasicProperties::default().with_headers(headers),
    )
}

/// Encode a termination sentinel as (payload, properties)
pub fn encode_fin() -> (Vec<u8>, BasicProperties) {
    (FIN_PAYLOAD.as_bytes().to_vec(), BasicProperties::default())
}

/// Encode an empty ("no data") result as (payload, properties)
pub fn encode_no_data(sample: &str) -> (Vec<u8>, BasicProperties) {
    let mut headers = FieldTable::default();
    headers.insert(
        ShortString::from(SAMPLE_TYPE_HEADER),
        AMQPValue::LongString(LongString::from(sample)),
    );

    (
        NO_DATA_PAYLOAD.as_bytes().to_vec(),
        BasicProperties::default().with_headers(headers),
    )
}

/// Encode a data result as (payload, properties)
///
/// `batch` is the total number of sibling messages for the task, this one
/// included. The payload is a JSON array of JSON-serialized fragments.
pub fn encode_data(
    sample: &str,
    fragments: &[EventBatch],
    batch: u64,
) -> serde_json::Result<(Vec<u8>, BasicProperties)> {
    let serialized: Vec<String> = fragments
        .iter()
        .map(serde_json::to_string)
        .collect::<serde_json::Result<_>>()?;
    let payload = serde_json::to_vec(&serialized)?;

    let mut headers = FieldTable::default();
    headers.insert(
        ShortString::from(SAMPLE_TYPE_HEADER),
        AMQPValue::LongString(LongString::from(sample)),
    );
    headers.insert(
        ShortString::from(BATCH_HEADER),
        AMQPValue::LongLongInt(batch as i64),
    );

    Ok((payload, BasicProperties::default().with_headers(headers)))
}

/// Decode a delivery from the task queue (the worker side of the contract)
pub fn decode_task(
    properties: &BasicProperties,
    payload: &[u8],
) -> Result<TaskCommand, ProtocolError> {
    if payload == FIN_PAYLOAD.as_bytes() {
        return Ok(TaskCommand::Finish);
    }

    let headers = properties
        .headers()
        .as_ref()
        .ok_or(ProtocolError::MissingHeaders)?;
    let sample = header_string(headers, SAMPLE_TYPE_HEADER)
        .ok_or(ProtocolError::MissingSampleType)?;

    let text = std::str::from_utf8(payload).map_err(|e| ProtocolError::BadPayload {
        sample: sample.clone(),
        detail: e.to_string(),
    })?;
    let file_index = text.parse::<usize>().map_err(|e| ProtocolError::BadPayload {
        sample: sample.clone(),
        detail: format!("expected a decimal file index, got '{text}': {e}"),
    })?;

    Ok(TaskCommand::Process(TaskMessage { sample, file_index }))
}

/// Decode a delivery from the result queue
///
/// A missing or non-positive `batch` header on a data payload is a fault,
/// never defaulted to 1: the fractional completion arithmetic would be
/// silently wrong for the task's remaining siblings.
pub fn decode_result(
    properties: &BasicProperties,
    payload: &[u8],
) -> Result<ResultMessage, ProtocolError> {
    let headers = properties
        .headers()
        .as_ref()
        .ok_or(ProtocolError::MissingHeaders)?;
    let sample = header_string(headers, SAMPLE_TYPE_HEADER)
        .ok_or(ProtocolError::MissingSampleType)?;

    if payload == NO_DATA_PAYLOAD.as_bytes() {
        return Ok(ResultMessage {
            sample,
            body: ResultBody::NoData,
        });
    }

    let batch = match header_int(headers, BATCH_HEADER) {
        Some(value) if value >= 1 => value as u64,
        Some(value) => return Err(ProtocolError::NonPositiveBatch { sample, value }),
        None => return Err(ProtocolError::MissingBatch { sample }),
    };

    let serialized: Vec<String> =
        serde_json::from_slice(payload).map_err(|e| ProtocolError::BadPayload {
            sample: sample.clone(),
            detail: e.to_string(),
        })?;

    let mut fragments = Vec::with_capacity(serialized.len());
    for entry in &serialized {
        let fragment: EventBatch =
            serde_json::from_str(entry).map_err(|e| ProtocolError::BadPayload {
                sample: sample.clone(),
                detail: e.to_string(),
            })?;
        if !fragment.is_consistent() {
            return Err(ProtocolError::ColumnLengthMismatch {
                sample,
                mass: fragment.mass.len(),
                weights: fragment.total_weight.len(),
            });
        }
        fragments.push(fragment);
    }

    // One message, one appended fragment: the payload's pieces are merged here
    let fragment = EventBatch::concat(fragments.iter());

    Ok(ResultMessage {
        sample,
        body: ResultBody::Data { fragment, batch },
    })
}

fn header_string(headers: &FieldTable, key: &str) -> Option<String> {
    match header_value(headers, key)? {
        AMQPValue::LongString(value) => Some(value.to_string()),
        _ => None,
    }
}

fn header_int(headers: &FieldTable, key: &str) -> Option<i64> {
    match header_value(headers, key)? {
        AMQPValue::ShortShortInt(v) => Some(*v as i64),
        AMQPValue::ShortShortUInt(v) => Some(*v as i64),
        AMQPValue::ShortInt(v) => Some(*v as i64),
        AMQPValue::ShortUInt(v) => Some(*v as i64),
        AMQPValue::LongInt(v) => Some(*v as i64),
        AMQPValue::LongUInt(v) => Some(*v as i64),
        AMQPValue::LongLongInt(v) => Some(*v),
        _ => None,
    }
}

fn header_value<'a>(headers: &'a FieldTable, key: &str) -> Option<&'a AMQPValue> {
    headers
        .inner()
        .iter()
        .find(|(name, _)| name.as_str() == key)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(mass: &[f64], weight: f64) -> EventBatch {
        EventBatch {
            mass: mass.to_vec(),
            total_weight: vec![weight; mass.len()],
        }
    }

    fn props_with(entries: &[(&str, AMQPValue)]) -> BasicProperties {
        let mut headers = FieldTable::default();
        for (key, value) in entries {
            headers.insert(ShortString::from(*key), value.clone());
        }
        BasicProperties::default().with_headers(headers)
    }

    #[test]
    fn test_task_round_trip() {
        let task = TaskMessage {
            sample: "Data".to_string(),
            file_index: 7,
        };
        let (payload, properties) = encode_task(&task);
        assert_eq!(payload, b"7");

        let decoded = decode_task(&properties, &payload).unwrap();
        assert_eq!(decoded, TaskCommand::Process(task));
    }

    #[test]
    fn test_fin_decodes_without_headers() {
        let (payload, properties) = encode_fin();
        assert_eq!(payload, b"fin");
        assert_eq!(decode_task(&properties, &payload).unwrap(), TaskCommand::Finish);
    }

    #[test]
    fn test_task_rejects_bad_index() {
        let (_, properties) = encode_task(&TaskMessage {
            sample: "Data".to_string(),
            file_index: 0,
        });
        let err = decode_task(&properties, b"seven").unwrap_err();
        assert!(matches!(err, ProtocolError::BadPayload { .. }));
    }

    #[test]
    fn test_no_data_round_trip() {
        let (payload, properties) = encode_no_data("Background $ZZ^{*}$");
        let decoded = decode_result(&properties, &payload).unwrap();

        assert_eq!(decoded.sample, "Background $ZZ^{*}$");
        assert_eq!(decoded.body, ResultBody::NoData);
    }

    #[test]
    fn test_data_round_trip_merges_payload_fragments() {
        let pieces = [batch(&[124.0, 125.5], 1.0), batch(&[126.0], 0.5)];
        let (payload, properties) = encode_data("Data", &pieces, 2).unwrap();

        let decoded = decode_result(&properties, &payload).unwrap();
        assert_eq!(decoded.sample, "Data");
        match decoded.body {
            ResultBody::Data { fragment, batch } => {
                assert_eq!(batch, 2);
                assert_eq!(fragment.mass, vec![124.0, 125.5, 126.0]);
                assert_eq!(fragment.total_weight, vec![1.0, 1.0, 0.5]);
            }
            other => panic!("expected data body, got {other:?}"),
        }
    }

    #[test]
    fn test_data_missing_batch_is_fatal() {
        // A producer that omits batch must not be silently treated as batch = 1
        let (payload, _) = encode_data("Data", &[batch(&[125.0], 1.0)], 1).unwrap();
        let properties = props_with(&[(
            SAMPLE_TYPE_HEADER,
            AMQPValue::LongString(LongString::from("Data")),
        )]);

        let err = decode_result(&properties, &payload).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MissingBatch {
                sample: "Data".to_string()
            }
        );
    }

    #[test]
    fn test_data_zero_batch_is_fatal() {
        let (payload, _) = encode_data("Data", &[batch(&[125.0], 1.0)], 1).unwrap();
        let properties = props_with(&[
            (
                SAMPLE_TYPE_HEADER,
                AMQPValue::LongString(LongString::from("Data")),
            ),
            (BATCH_HEADER, AMQPValue::LongInt(0)),
        ]);

        let err = decode_result(&properties, &payload).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::NonPositiveBatch {
                sample: "Data".to_string(),
                value: 0
            }
        );
    }

    #[test]
    fn test_batch_header_accepts_any_integer_width() {
        let (payload, _) = encode_data("Data", &[batch(&[125.0], 1.0)], 1).unwrap();

        for value in [
            AMQPValue::ShortShortInt(3),
            AMQPValue::ShortInt(3),
            AMQPValue::LongInt(3),
            AMQPValue::LongLongInt(3),
            AMQPValue::LongUInt(3),
        ] {
            let properties = props_with(&[
                (
                    SAMPLE_TYPE_HEADER,
                    AMQPValue::LongString(LongString::from("Data")),
                ),
                (BATCH_HEADER, value),
            ]);
            let decoded = decode_result(&properties, &payload).unwrap();
            assert!(matches!(decoded.body, ResultBody::Data { batch: 3, .. }));
        }
    }

    #[test]
    fn test_result_without_headers_is_fatal() {
        let err = decode_result(&BasicProperties::default(), b"No data").unwrap_err();
        assert_eq!(err, ProtocolError::MissingHeaders);
    }

    #[test]
    fn test_result_without_sample_type_is_fatal() {
        let properties = props_with(&[(BATCH_HEADER, AMQPValue::LongInt(1))]);
        let err = decode_result(&properties, b"No data").unwrap_err();
        assert_eq!(err, ProtocolError::MissingSampleType);
    }

    #[test]
    fn test_malformed_payload_is_fatal() {
        let properties = props_with(&[
            (
                SAMPLE_TYPE_HEADER,
                AMQPValue::LongString(LongString::from("Data")),
            ),
            (BATCH_HEADER, AMQPValue::LongInt(1)),
        ]);

        let err = decode_result(&properties, b"{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::BadPayload { .. }));
    }

    #[test]
    fn test_mismatched_columns_are_fatal() {
        let bad = EventBatch {
            mass: vec![125.0, 126.0],
            total_weight: vec![1.0],
        };
        let (payload, properties) = encode_data("Data", &[bad], 1).unwrap();

        let err = decode_result(&properties, &payload).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::ColumnLengthMismatch {
                sample: "Data".to_string(),
                mass: 2,
                weights: 1
            }
        );
    }
}
