//! Minimal JSON-RPC 2.0 + LSP stdio framing.
//!
//! Only the subset the Vel server needs; keeps the crate free of a full
//! `lsp-server` / `lsp-types` dependency.

#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{BufRead, Write};

use crate::error::{Error, Result};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

#[derive(Clone, Debug)]
pub struct Request {
    pub id: RequestId,
    pub method: String,
    pub params: Value,
}

#[derive(Clone, Debug)]
pub struct Notification {
    pub method: String,
    pub params: Value,
}

#[derive(Clone, Debug)]
pub enum IncomingMessage {
    Request(Request),
    Notification(Notification),
    Response,
}

pub fn send_notification<T: Serialize>(
    writer: &mut impl Write,
    method: &str,
    params: &T,
) -> Result<()> {
    let params_value = serde_json::to_value(params)
        .map_err(|err| Error::internal(format!("failed to serialise notification params: {err}")))?;
    let mut obj = Map::<String, Value>::new();
    obj.insert("jsonrpc".into(), Value::String("2.0".into()));
    obj.insert("method".into(), Value::String(method.into()));
    obj.insert("params".into(), params_value);
    write_message(writer, &Value::Object(obj))
}

pub fn send_response(writer: &mut impl Write, id: RequestId, result: Value) -> Result<()> {
    let mut obj = Map::<String, Value>::new();
    obj.insert("jsonrpc".into(), Value::String("2.0".into()));
    obj.insert("id".into(), serde_json::to_value(id).unwrap_or(Value::Null));
    obj.insert("result".into(), result);
    write_message(writer, &Value::Object(obj))
}

pub fn send_error_response(
    writer: &mut impl Write,
    id: RequestId,
    code: i32,
    message: String,
) -> Result<()> {
    let mut err_obj = Map::<String, Value>::new();
    err_obj.insert(
        "code".into(),
        Value::Number(serde_json::Number::from(i64::from(code))),
    );
    err_obj.insert("message".into(), Value::String(message));

    let mut obj = Map::<String, Value>::new();
    obj.insert("jsonrpc".into(), Value::String("2.0".into()));
    obj.insert("id".into(), serde_json::to_value(id).unwrap_or(Value::Null));
    obj.insert("error".into(), Value::Object(err_obj));
    write_message(writer, &Value::Object(obj))
}

pub fn read_message(reader: &mut impl BufRead) -> Result<Option<IncomingMessage>> {
    let body = match read_frame(reader)? {
        Some(body) => body,
        None => return Ok(None),
    };

    let value: Value = serde_json::from_slice(&body)
        .map_err(|err| Error::internal(format!("invalid JSON-RPC body: {err}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| Error::internal("JSON-RPC message must be an object"))?;

    let method = obj
        .get("method")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);
    let id = obj.get("id").cloned();

    match (method, id) {
        (Some(method), Some(id)) => {
            let id: RequestId = serde_json::from_value(id)
                .map_err(|err| Error::internal(format!("invalid JSON-RPC request id: {err}")))?;
            let params = obj.get("params").cloned().unwrap_or(Value::Null);
            Ok(Some(IncomingMessage::Request(Request {
                id,
                method,
                params,
            })))
        }
        (Some(method), None) => {
            let params = obj.get("params").cloned().unwrap_or(Value::Null);
            Ok(Some(IncomingMessage::Notification(Notification {
                method,
                params,
            })))
        }
        (None, Some(_id)) => Ok(Some(IncomingMessage::Response)),
        (None, None) => Err(Error::internal(
            "JSON-RPC message missing both method and id",
        )),
    }
}

fn read_frame(reader: &mut impl BufRead) -> Result<Option<Vec<u8>>> {
    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }

        if line == "\r\n" {
            break;
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if let Some(value) = trimmed.strip_prefix("Content-Length:") {
            let parsed: usize = value
                .trim()
                .parse()
                .map_err(|err| Error::internal(format!("invalid Content-Length value: {err}")))?;
            content_length = Some(parsed);
        }
    }

    let len = content_length.ok_or_else(|| Error::internal("missing Content-Length header"))?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(Some(buf))
}

fn write_message(writer: &mut impl Write, message: &Value) -> Result<()> {
    let body = serde_json::to_vec(message)
        .map_err(|err| Error::internal(format!("failed to serialise JSON: {err}")))?;
    write!(writer, "Content-Length: {}\r\n\r\n", body.len())?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}
