use std::io::{BufRead, Cursor, Read, Write};

use serde_json::{json, Value};
use url::Url;
use vel::lsp;
use vel::Workspace;

mod common;
use common::{project, write_source};

fn frame(payload: &Value, out: &mut Vec<u8>) {
    let body = payload.to_string();
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(body.as_bytes());
}

fn read_frames(mut bytes: &[u8]) -> Vec<Value> {
    let mut frames = Vec::new();
    loop {
        let mut content_length = None;
        loop {
            let mut line = String::new();
            if bytes.read_line(&mut line).unwrap_or(0) == 0 {
                return frames;
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some(value) = line.strip_prefix("Content-Length:") {
                content_length = value.trim().parse::<usize>().ok();
            }
        }
        let length = content_length.unwrap_or_else(|| panic!("frame without Content-Length"));
        let mut body = vec![0_u8; length];
        bytes
            .read_exact(&mut body)
            .unwrap_or_else(|err| panic!("short frame: {err}"));
        frames.push(
            serde_json::from_slice(&body).unwrap_or_else(|err| panic!("bad frame json: {err}")),
        );
    }
}

/// Feed a scripted client session to the server and collect its replies.
fn session(messages: &[Value]) -> Vec<Value> {
    let mut input = Vec::new();
    for message in messages {
        frame(message, &mut input);
    }
    let mut reader = Cursor::new(input);
    let mut output = Vec::new();
    lsp::serve(&mut reader, &mut output, &lsp::capabilities(), Workspace::new())
        .unwrap_or_else(|err| panic!("server loop failed: {err}"));
    output.flush().unwrap_or_else(|err| panic!("flush: {err}"));
    read_frames(&output)
}

fn request(id: i64, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

fn notification(method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "method": method, "params": params })
}

fn response_for<'a>(frames: &'a [Value], id: i64) -> &'a Value {
    frames
        .iter()
        .find(|frame| frame.get("id").and_then(Value::as_i64) == Some(id))
        .unwrap_or_else(|| panic!("no response with id {id}: {frames:?}"))
}

fn published_for<'a>(frames: &'a [Value], uri: &str) -> Vec<&'a Value> {
    frames
        .iter()
        .filter(|frame| {
            frame.get("method").and_then(Value::as_str)
                == Some("textDocument/publishDiagnostics")
                && frame["params"]["uri"].as_str() == Some(uri)
        })
        .collect()
}

fn file_uri(path: &std::path::Path) -> String {
    Url::from_file_path(path)
        .unwrap_or_else(|()| panic!("non-absolute path {}", path.display()))
        .to_string()
}

fn did_open(uri: &str, text: &str) -> Value {
    notification(
        "textDocument/didOpen",
        json!({
            "textDocument": {
                "uri": uri,
                "languageId": "vel",
                "version": 1,
                "text": text,
            }
        }),
    )
}

#[test]
fn initialize_reports_the_server_capabilities() {
    let frames = session(&[request(1, "initialize", json!({}))]);
    let result = &response_for(&frames, 1)["result"];
    assert_eq!(result["capabilities"]["textDocumentSync"], json!(2));
    assert_eq!(result["capabilities"]["documentFormattingProvider"], json!(true));
    assert_eq!(result["capabilities"]["documentSymbolProvider"], json!(true));
    assert_eq!(result["serverInfo"]["name"], json!("vel-lsp"));
}

#[test]
fn did_open_publishes_diagnostics_and_did_change_refreshes_them() {
    let dir = project();
    let path = dir.path().join("main.vel");
    write_source(&path, "x = 1\n");
    let uri = file_uri(&path);

    let frames = session(&[
        request(1, "initialize", json!({})),
        did_open(&uri, "x = 1\n"),
        notification(
            "textDocument/didChange",
            json!({
                "textDocument": { "uri": uri, "version": 2 },
                "contentChanges": [{ "text": "x = \n" }],
            }),
        ),
        notification("exit", json!({})),
    ]);

    let published = published_for(&frames, &uri);
    assert_eq!(published.len(), 2, "one publish per sync event: {frames:?}");
    assert_eq!(published[0]["params"]["diagnostics"], json!([]));
    let after_edit = published[1]["params"]["diagnostics"]
        .as_array()
        .unwrap_or_else(|| panic!("diagnostics must be an array"));
    assert_eq!(after_edit.len(), 1);
    assert_eq!(after_edit[0]["severity"], json!(1));
}

#[test]
fn formatting_request_returns_one_full_document_edit() {
    let dir = project();
    let path = dir.path().join("main.vel");
    write_source(&path, "x   =  1\n");
    let uri = file_uri(&path);

    let frames = session(&[
        request(1, "initialize", json!({})),
        did_open(&uri, "x   =  1\n"),
        request(
            2,
            "textDocument/formatting",
            json!({ "textDocument": { "uri": uri }, "options": {} }),
        ),
        notification("exit", json!({})),
    ]);

    let edits = response_for(&frames, 2)["result"]
        .as_array()
        .unwrap_or_else(|| panic!("formatting result must be an array"))
        .clone();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0]["newText"], json!("x = 1\n"));
    assert_eq!(edits[0]["range"]["start"], json!({ "line": 0, "character": 0 }));
}

#[test]
fn dependency_and_symbol_extensions_answer_over_the_wire() {
    let dir = project();
    let main = dir.path().join("main.vel");
    write_source(&main, "import vel from util;\nx = 1\n");
    write_source(&dir.path().join("util.vel"), "y = 2\n");
    let uri = file_uri(&main);

    let frames = session(&[
        request(1, "initialize", json!({})),
        did_open(&uri, "import vel from util;\nx = 1\n"),
        request(
            2,
            "vel/dependencies",
            json!({ "textDocument": { "uri": uri }, "deep": false }),
        ),
        request(
            3,
            "textDocument/documentSymbol",
            json!({ "textDocument": { "uri": uri } }),
        ),
        notification("exit", json!({})),
    ]);

    let deps = response_for(&frames, 2)["result"]
        .as_array()
        .unwrap_or_else(|| panic!("dependency result must be an array"))
        .clone();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0]["target"], json!("util"));
    assert_eq!(deps[0]["tag"], json!("vel"));
    assert!(deps[0]["resolvedUri"].as_str().is_some_and(|u| u.ends_with("util.vel")));

    let symbols = response_for(&frames, 3)["result"]
        .as_array()
        .unwrap_or_else(|| panic!("symbol result must be an array"))
        .clone();
    let names: Vec<_> = symbols
        .iter()
        .filter_map(|symbol| symbol["name"].as_str())
        .collect();
    assert!(names.contains(&"x"), "missing x in {names:?}");
    assert!(names.contains(&"util"), "missing util in {names:?}");
}

#[test]
fn unknown_requests_get_a_method_not_found_error() {
    let frames = session(&[
        request(1, "initialize", json!({})),
        request(2, "workspace/unknownThing", json!({})),
        notification("exit", json!({})),
    ]);

    let error = &response_for(&frames, 2)["error"];
    assert_eq!(error["code"], json!(-32601));
}

#[test]
fn shutdown_then_exit_ends_the_session_cleanly() {
    let frames = session(&[
        request(1, "initialize", json!({})),
        request(2, "shutdown", json!(null)),
        notification("exit", json!({})),
    ]);
    assert!(response_for(&frames, 2)["result"].is_null());
}
