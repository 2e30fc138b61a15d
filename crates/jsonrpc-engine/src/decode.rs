//! Envelope detection and decoding of raw request bytes.

use std::io;

use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};

use crate::error::JsonRpcError;
use crate::request::JsonRpcRequest;

/// Lookahead buffer used to find the first significant byte
pub const DEFAULT_READ_BUFFER: usize = 128;

/// What the input turned out to be.
#[derive(Debug, Clone)]
pub enum Envelope {
    Single(JsonRpcRequest),
    /// Non-empty array of undecoded batch elements
    Batch(Vec<Box<RawValue>>),
    /// The input cannot be served; answer with this error
    Rejected(JsonRpcError),
}

/// Skip leading whitespace and report whether the next byte opens an array.
///
/// Only whitespace is consumed. Read errors and end of input count as
/// "not a batch" so the full decode reports them.
pub async fn is_batch<R>(reader: &mut R) -> bool
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let buf = match reader.fill_buf().await {
            Ok(buf) if !buf.is_empty() => buf,
            _ => return false,
        };
        let skip = buf
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
            .count();
        if skip < buf.len() {
            let first = buf[skip];
            reader.consume(skip);
            return first == b'[';
        }
        let len = buf.len();
        reader.consume(len);
    }
}

/// Read until the first complete JSON value can be decoded; anything after
/// it is left unread.
///
/// The outer `Result` carries read failures, the inner one malformed input.
async fn decode_first<T, R>(reader: &mut R) -> io::Result<Result<T, serde_json::Error>>
where
    T: DeserializeOwned,
    R: AsyncBufRead + Unpin,
{
    let mut bytes = Vec::new();
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            // End of input without a complete value: report why
            return Ok(serde_json::from_slice(&bytes));
        }
        bytes.extend_from_slice(chunk);
        let len = chunk.len();
        reader.consume(len);

        match serde_json::Deserializer::from_slice(&bytes).into_iter::<T>().next() {
            // Incomplete so far
            None => continue,
            Some(Err(err)) if err.is_eof() => continue,
            Some(result) => return Ok(result),
        }
    }
}

/// Read the first JSON value from the stream and classify it.
///
/// Returns as soon as that value is complete, without waiting for the
/// stream to close. Only I/O failures are errors here; malformed input
/// becomes [`Envelope::Rejected`].
pub async fn read_envelope<R>(reader: R, capacity: usize) -> io::Result<Envelope>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::with_capacity(capacity.max(1), reader);

    Ok(if is_batch(&mut reader).await {
        match decode_first::<Vec<Box<RawValue>>, _>(&mut reader).await? {
            Ok(elements) if elements.is_empty() => {
                Envelope::Rejected(JsonRpcError::invalid_request(None, "empty batch"))
            }
            Ok(elements) => Envelope::Batch(elements),
            Err(err) => Envelope::Rejected(JsonRpcError::parse_error(err)),
        }
    } else {
        match decode_first::<JsonRpcRequest, _>(&mut reader).await? {
            Ok(request) => Envelope::Single(request),
            Err(err) => Envelope::Rejected(JsonRpcError::parse_error(err)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestId;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    async fn read(input: &str) -> Envelope {
        read_envelope(input.as_bytes(), DEFAULT_READ_BUFFER).await.unwrap()
    }

    fn rejected_code(envelope: Envelope) -> i64 {
        match envelope {
            Envelope::Rejected(err) => {
                assert!(err.id.is_none());
                err.error.code
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_batch_detection_skips_whitespace() {
        let mut input: &[u8] = b" \t\r\n [1]";
        let mut reader = BufReader::new(&mut input);
        assert!(is_batch(&mut reader).await);

        let mut input: &[u8] = b"\n{\"a\": [1]}";
        let mut reader = BufReader::new(&mut input);
        assert!(!is_batch(&mut reader).await);

        let mut input: &[u8] = b"   ";
        let mut reader = BufReader::new(&mut input);
        assert!(!is_batch(&mut reader).await);
    }

    #[tokio::test]
    async fn test_detection_across_small_buffers() {
        let input = format!("{}[{{\"jsonrpc\":\"2.0\",\"method\":\"m\"}}]", " ".repeat(300));
        match read_envelope(input.as_bytes(), 4).await.unwrap() {
            Envelope::Batch(elements) => assert_eq!(elements.len(), 1),
            other => panic!("expected batch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_request() {
        match read(r#" {"jsonrpc":"2.0","method":"echo","params":["a"],"id":1} "#).await {
            Envelope::Single(request) => {
                assert_eq!(request.method, "echo");
                assert_eq!(request.request_id(), Some(RequestId::from(1)));
            }
            other => panic!("expected single request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trailing_bytes_are_ignored() {
        let envelope = read(r#"{"jsonrpc":"2.0","method":"echo"} garbage"#).await;
        assert!(matches!(envelope, Envelope::Single(_)));
    }

    #[tokio::test]
    async fn test_malformed_input_is_parse_error() {
        assert_eq!(rejected_code(read(r#"{"jsonrpc":"2.0","method":"#).await), -32700);
        assert_eq!(rejected_code(read("").await), -32700);
        assert_eq!(rejected_code(read("[1, 2").await), -32700);
        assert_eq!(rejected_code(read("42").await), -32700);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let envelope = read(" [ ] ").await;
        match envelope {
            Envelope::Rejected(err) => {
                assert_eq!(err.error.code, -32600);
                assert_eq!(err.error.data, Some(json!("empty batch")));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_batch_elements_stay_raw() {
        match read(r#"[{"jsonrpc":"2.0","method":"a","id":1}, 5, "x"]"#).await {
            Envelope::Batch(elements) => {
                assert_eq!(elements.len(), 3);
                assert_eq!(elements[1].get(), "5");
            }
            other => panic!("expected batch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_returns_before_the_stream_closes() {
        let (mut client, server) = tokio::io::duplex(64);
        client
            .write_all(br#"{"jsonrpc":"2.0","method":"echo","params":["a"],"id":1}"#)
            .await
            .unwrap();

        let envelope = tokio::time::timeout(Duration::from_secs(2), read_envelope(server, 8))
            .await
            .expect("decoding waited for end of input")
            .unwrap();
        assert!(matches!(envelope, Envelope::Single(_)));

        let (mut client, server) = tokio::io::duplex(64);
        client.write_all(b" [{\"jsonrpc\":\"2.0\",").await.unwrap();
        let pending = tokio::spawn(read_envelope(server, 8));
        client.write_all(b"\"method\":\"m\"}] ").await.unwrap();

        let envelope = tokio::time::timeout(Duration::from_secs(2), pending)
            .await
            .expect("decoding waited for end of input")
            .unwrap()
            .unwrap();
        match envelope {
            Envelope::Batch(elements) => assert_eq!(elements.len(), 1),
            other => panic!("expected batch, got {other:?}"),
        }
        drop(client);
    }

    #[tokio::test]
    async fn test_null_method_is_not_a_parse_error() {
        match read(r#"{"jsonrpc":"2.0","method":null,"id":5}"#).await {
            Envelope::Single(request) => assert_eq!(request.method, ""),
            other => panic!("expected single request, got {other:?}"),
        }
    }
}
