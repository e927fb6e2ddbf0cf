use std::io::{IsTerminal, Write};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use linkmux_transport::{ChannelKind, LocatorId};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Where a received message came from.
#[derive(Debug, Clone, Copy)]
pub struct Origin {
    pub locator: LocatorId,
    pub kind: ChannelKind,
    pub peer: Option<SocketAddr>,
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    locator: i32,
    kind: &'a str,
    peer: Option<String>,
    size: usize,
    payload: String,
    timestamp: String,
}

pub fn print_message(payload: &[u8], origin: &Origin, format: OutputFormat) {
    let peer = origin.peer.map(|addr| addr.to_string());
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                locator: origin.locator.get(),
                kind: origin.kind.as_str(),
                peer,
                size: payload.len(),
                payload: payload_preview(payload),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["LOCATOR", "KIND", "PEER", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    origin.locator.to_string(),
                    origin.kind.as_str().to_string(),
                    peer.unwrap_or_else(|| "-".to_string()),
                    payload.len().to_string(),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "locator={} kind={} peer={} size={} payload={}",
                origin.locator,
                origin.kind.as_str(),
                peer.as_deref().unwrap_or("-"),
                payload.len(),
                payload_preview(payload)
            );
        }
        OutputFormat::Raw => {
            print_raw(payload);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes: {}>", payload.len(), hex_preview(payload)),
    }
}

fn hex_preview(payload: &[u8]) -> String {
    const LIMIT: usize = 16;

    let mut text: String = payload
        .iter()
        .take(LIMIT)
        .map(|byte| format!("{byte:02x}"))
        .collect();
    if payload.len() > LIMIT {
        text.push_str("..");
    }
    text
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_keeps_text() {
        assert_eq!(payload_preview(b"hello"), "hello");
    }

    #[test]
    fn preview_hexes_binary() {
        assert_eq!(
            payload_preview(&[0xff, 0x00, 0x01]),
            "<binary 3 bytes: ff0001>"
        );
        let long = [0xaau8; 20];
        assert!(payload_preview(&long).ends_with("..>"));
    }
}
