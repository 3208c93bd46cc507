//! Vel LSP server wiring over stdio.
//!
//! One logical worker: each incoming message is processed to completion
//! before the next is read, which also serialises workspace access per file.

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub mod rpc;
pub mod types;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::error;
use url::Url;

use self::rpc::{IncomingMessage, Notification as RpcNotification, Request as RpcRequest};
use self::types::{
    DefinitionListParams, DependencyEntry, DependencyParams, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    DocumentFormattingParams, DocumentSymbolParams, InitializeResult, Location, Position,
    PublishDiagnosticsParams, Range, ServerCapabilities, ServerInfo, SymbolInformation, Uri,
};
use crate::alerts::LineSpan;
use crate::error::Result;
use crate::symtab::SymbolKind;
use crate::workspace::Workspace;

const METHOD_NOT_FOUND: i32 = -32601;

/// Server state: the workspace plus per-document version bookkeeping.
struct Server {
    workspace: Workspace,
    versions: HashMap<Uri, i32>,
}

impl Server {
    fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            versions: HashMap::new(),
        }
    }
}

fn uri_to_path(uri: &Uri) -> PathBuf {
    Url::parse(uri)
        .ok()
        .and_then(|parsed| parsed.to_file_path().ok())
        .unwrap_or_else(|| PathBuf::from(uri))
}

fn path_to_uri(path: &Path) -> Option<Uri> {
    let url = Url::from_file_path(path).ok()?;
    Some(url.to_string())
}

fn span_to_range(span: LineSpan) -> Range {
    Range {
        start: Position::new(span.start_line, span.start_col),
        end: Position::new(span.end_line, span.end_col),
    }
}

/// Byte offset of a protocol position, counting UTF-16 code units within the
/// line the way the protocol does.
fn offset_at(text: &str, position: Position) -> usize {
    let mut offset = 0usize;
    let mut lines = text.split_inclusive('\n');
    for _ in 0..position.line {
        if let Some(line) = lines.next() {
            offset = offset.saturating_add(line.len());
        } else {
            return text.len();
        }
    }
    let line = lines.next().unwrap_or("");
    let target_units = position.character as usize;
    let mut utf16_units = 0usize;
    for (byte_idx, ch) in line.char_indices() {
        if utf16_units >= target_units {
            return offset.saturating_add(byte_idx);
        }
        utf16_units = utf16_units.saturating_add(ch.len_utf16());
    }
    offset.saturating_add(line.trim_end_matches('\n').len())
}

/// Apply protocol content changes to a buffer, full-replacement or ranged.
fn apply_changes(mut text: String, params: &DidChangeTextDocumentParams) -> String {
    for change in &params.content_changes {
        let Some(range) = change.range else {
            text = change.text.clone();
            continue;
        };
        let start = offset_at(&text, range.start);
        let end = offset_at(&text, range.end);
        if start <= end && end <= text.len() {
            text.replace_range(start..end, &change.text);
        } else if start <= text.len() {
            let len = text.len();
            text.replace_range(start..len, &change.text);
        } else {
            text.push_str(&change.text);
        }
    }
    text
}

fn parse_params<T>(value: Value) -> Option<T>
where
    T: DeserializeOwned,
{
    serde_json::from_value(value).ok()
}

fn publish_diagnostics(
    writer: &mut impl Write,
    uri: &Uri,
    version: Option<i32>,
    diagnostics: Vec<types::Diagnostic>,
) -> Result<()> {
    let params = PublishDiagnosticsParams {
        uri: uri.clone(),
        diagnostics,
        version,
    };
    rpc::send_notification(writer, types::methods::PUBLISH_DIAGNOSTICS, &params)
}

/// Push the cached diagnostics for `uri`; a no-op when the path was never
/// analyzed.
fn publish_for(writer: &mut impl Write, server: &Server, uri: &Uri) -> Result<()> {
    let path = uri_to_path(uri);
    if let Some(diags) = server.workspace.diagnostics(&path) {
        let version = server.versions.get(uri).copied();
        publish_diagnostics(writer, uri, version, diags.to_vec())?;
    }
    Ok(())
}

fn symbol_kind_to_protocol(kind: SymbolKind) -> i32 {
    match kind {
        SymbolKind::Variable => types::symbol_kinds::VARIABLE,
        SymbolKind::Block => types::symbol_kinds::FUNCTION,
        SymbolKind::Module => types::symbol_kinds::MODULE,
    }
}

fn document_symbols(server: &Server, uri: &Uri) -> Option<Vec<SymbolInformation>> {
    let path = uri_to_path(uri);
    let symbols = server.workspace.symbols(&path)?;
    let out = symbols
        .into_iter()
        .filter_map(|symbol| {
            let site = symbol.defn.first()?;
            let loc_uri = path_to_uri(&site.path).unwrap_or_else(|| uri.clone());
            Some(SymbolInformation {
                name: symbol.name,
                kind: symbol_kind_to_protocol(symbol.kind),
                location: Location::new(loc_uri, span_to_range(site.span)),
            })
        })
        .collect();
    Some(out)
}

fn definition_list(server: &Server, uri: &Uri) -> Option<Vec<Location>> {
    let path = uri_to_path(uri);
    let sites = server.workspace.definitions(&path)?;
    let out = sites
        .into_iter()
        .map(|site| {
            let loc_uri = path_to_uri(&site.path).unwrap_or_else(|| uri.clone());
            Location::new(loc_uri, span_to_range(site.span))
        })
        .collect();
    Some(out)
}

fn dependency_list(server: &Server, params: &DependencyParams) -> Option<Vec<DependencyEntry>> {
    let path = uri_to_path(&params.text_document.uri);
    let deps = server.workspace.dependencies(&path, params.deep)?;
    let out = deps
        .into_iter()
        .map(|dep| DependencyEntry {
            target: dep.target,
            tag: dep.tag,
            range: span_to_range(dep.span),
            resolved_uri: dep.resolved.as_deref().and_then(path_to_uri),
        })
        .collect();
    Some(out)
}

fn to_json_or_null<T: serde::Serialize>(value: Option<T>) -> Value {
    value
        .and_then(|v| serde_json::to_value(v).ok())
        .unwrap_or(Value::Null)
}

fn handle_request(
    writer: &mut impl Write,
    server: &mut Server,
    request: RpcRequest,
) -> Result<bool> {
    match request.method.as_str() {
        types::methods::SHUTDOWN => {
            rpc::send_response(writer, request.id, Value::Null)?;
            Ok(true)
        }
        types::methods::FORMATTING => {
            let result = parse_params::<DocumentFormattingParams>(request.params)
                .map(|params| uri_to_path(&params.text_document.uri))
                .and_then(|path| match server.workspace.format_document(&path) {
                    Ok(edit) => Some(vec![edit]),
                    Err(err) => {
                        error!(%err, "formatting request failed");
                        None
                    }
                });
            rpc::send_response(writer, request.id, to_json_or_null(result))?;
            Ok(false)
        }
        types::methods::DOCUMENT_SYMBOL => {
            let result = parse_params::<DocumentSymbolParams>(request.params)
                .and_then(|params| document_symbols(server, &params.text_document.uri));
            rpc::send_response(writer, request.id, to_json_or_null(result))?;
            Ok(false)
        }
        types::methods::DEPENDENCIES => {
            let result = parse_params::<DependencyParams>(request.params)
                .and_then(|params| dependency_list(server, &params));
            rpc::send_response(writer, request.id, to_json_or_null(result))?;
            Ok(false)
        }
        types::methods::DEFINITIONS => {
            let result = parse_params::<DefinitionListParams>(request.params)
                .and_then(|params| definition_list(server, &params.text_document.uri));
            rpc::send_response(writer, request.id, to_json_or_null(result))?;
            Ok(false)
        }
        _ => {
            rpc::send_error_response(
                writer,
                request.id,
                METHOD_NOT_FOUND,
                format!("unsupported request: {}", request.method),
            )?;
            Ok(false)
        }
    }
}

fn handle_notification(
    writer: &mut impl Write,
    server: &mut Server,
    notification: RpcNotification,
) -> Result<bool> {
    match notification.method.as_str() {
        types::methods::DID_OPEN => {
            if let Some(params) = parse_params::<DidOpenTextDocumentParams>(notification.params) {
                let uri = params.text_document.uri;
                let path = uri_to_path(&uri);
                server
                    .versions
                    .insert(uri.clone(), params.text_document.version);
                server.workspace.open_document(&path, params.text_document.text);
                server.workspace.ensure_analyzed(&path);
                publish_for(writer, server, &uri)?;
            }
            Ok(false)
        }
        types::methods::DID_CHANGE => {
            if let Some(params) = parse_params::<DidChangeTextDocumentParams>(notification.params) {
                let uri = params.text_document.uri.clone();
                let path = uri_to_path(&uri);
                server.versions.insert(uri.clone(), params.text_document.version);
                if let Some(text) = server.workspace.document_text(&path) {
                    let updated = apply_changes(text.to_string(), &params);
                    server.workspace.update_document(&path, updated);
                }
                server.workspace.ensure_fresh(&path);
                publish_for(writer, server, &uri)?;
            }
            Ok(false)
        }
        types::methods::DID_SAVE => {
            if let Some(params) = parse_params::<DidSaveTextDocumentParams>(notification.params) {
                let uri = params.text_document.uri;
                let path = uri_to_path(&uri);
                if let Some(text) = params.text {
                    server.workspace.update_document(&path, text);
                }
                server.workspace.ensure_analyzed(&path);
                publish_for(writer, server, &uri)?;
            }
            Ok(false)
        }
        types::methods::DID_CLOSE => {
            if let Some(params) = parse_params::<DidCloseTextDocumentParams>(notification.params) {
                let uri = params.text_document.uri;
                let path = uri_to_path(&uri);
                server.workspace.close_document(&path);
                server.versions.remove(&uri);
                publish_diagnostics(writer, &uri, None, Vec::new())?;
            }
            Ok(false)
        }
        types::methods::EXIT => Ok(true),
        _ => Ok(false),
    }
}

/// Drive the server over an arbitrary transport: waits for `initialize`,
/// then dispatches until `exit`, shutdown, or EOF.
pub fn serve(
    reader: &mut impl BufRead,
    writer: &mut impl Write,
    initialization: &InitializeResult,
    workspace: Workspace,
) -> Result<()> {
    loop {
        match rpc::read_message(reader)? {
            Some(IncomingMessage::Request(request))
                if request.method == types::methods::INITIALIZE =>
            {
                let init_value = serde_json::to_value(initialization).map_err(|err| {
                    crate::error::Error::internal(format!("failed to serialise capabilities: {err}"))
                })?;
                rpc::send_response(writer, request.id, init_value)?;
                break;
            }
            Some(IncomingMessage::Request(request)) => {
                rpc::send_error_response(
                    writer,
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("unsupported request before initialize: {}", request.method),
                )?;
            }
            Some(IncomingMessage::Notification(_) | IncomingMessage::Response) => {}
            None => return Ok(()),
        }
    }

    let mut server = Server::new(workspace);
    let mut shutdown_requested = false;

    while let Some(message) = rpc::read_message(reader)? {
        match message {
            IncomingMessage::Request(request) => {
                shutdown_requested =
                    handle_request(writer, &mut server, request)? || shutdown_requested;
            }
            IncomingMessage::Notification(notification) => {
                if handle_notification(writer, &mut server, notification)? {
                    break;
                }
            }
            IncomingMessage::Response => {}
        }
        if shutdown_requested {
            break;
        }
    }

    Ok(())
}

/// Run the Vel LSP server over stdio until exit or EOF.
pub fn run_stdio(initialization: InitializeResult) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = BufWriter::new(stdout.lock());
    serve(
        &mut reader,
        &mut writer,
        &initialization,
        Workspace::new(),
    )
}

/// Default server capabilities for the Vel LSP.
#[must_use]
pub fn capabilities() -> InitializeResult {
    let capabilities = ServerCapabilities {
        text_document_sync: Some(2),
        document_formatting_provider: Some(true),
        document_symbol_provider: Some(true),
    };
    InitializeResult {
        capabilities,
        server_info: Some(ServerInfo {
            name: String::from("vel-lsp"),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    }
}
