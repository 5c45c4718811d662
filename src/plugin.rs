//! # Plugin Packaging
//!
//! Wraps a beat list into the XML plugin descriptor the lighting console
//! imports.
//!
//! ## Pipeline
//! 1. Substitute the beat rows into the Lua script template
//! 2. Normalize line endings (CRLF unless configured otherwise)
//! 3. Split the script into `chunk-size` character pieces
//! 4. Base64-encode each piece on its own
//! 5. Write one `<Chunk>` element per piece; the `<Script size>` attribute
//!    is the total length of the encoded pieces
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Plugin name="BeatGrid" version="1.0.0">
//!   <Script name="beatgrid_timing" size="2740">
//!     <Chunk index="1">LS0gQmVhdEdyaWQg...</Chunk>
//!     <Chunk index="2">...</Chunk>
//!   </Script>
//! </Plugin>
//! ```
//!
//! [`extract_script`] reverses steps 3 to 5.

use std::fmt::Display;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::config::{ExportConfig, LineEnding};
use crate::error::BeatGridError;
use crate::grid::Beat;
use crate::table::render_rows;

const SCRIPT_TEMPLATE: &str = r#"-- {name} beat timing
-- columns: seconds, downbeat (1/0), tempo in BPM (0 = unchanged)
local beats = {
{rows}}

local function Main(display_handle, argument)
  Printf("{name}: " .. #beats .. " beats loaded")
  return beats
end

return Main
"#;

fn xml_err<E: Display>(e: E) -> BeatGridError {
    BeatGridError::Xml(e.to_string())
}

/// Script text with the beat rows filled in and line endings normalized.
pub fn render_script(beats: &[Beat], config: &ExportConfig) -> String {
    let script = SCRIPT_TEMPLATE
        .replace("{name}", &config.plugin_name)
        .replace("{rows}", &render_rows(beats));
    normalize_line_endings(&script, config.line_ending)
}

pub fn normalize_line_endings(text: &str, ending: LineEnding) -> String {
    let unix = text.replace("\r\n", "\n").replace('\r', "\n");
    match ending {
        LineEnding::Lf => unix,
        _ => unix.replace('\n', ending.as_str()),
    }
}

/// Split into pieces of `size` characters; the last piece may be shorter.
pub fn chunk_text(text: &str, size: usize) -> Result<Vec<String>, BeatGridError> {
    if size == 0 {
        return Err(BeatGridError::Config(
            "chunk-size must be greater than 0".to_string(),
        ));
    }
    let chars: Vec<char> = text.chars().collect();
    Ok(chars.chunks(size).map(|piece| piece.iter().collect()).collect())
}

pub fn encode_chunks(chunks: &[String]) -> Vec<String> {
    chunks.iter().map(|chunk| BASE64.encode(chunk.as_bytes())).collect()
}

/// XML descriptor around already-encoded chunks.
pub fn write_descriptor(encoded: &[String], config: &ExportConfig) -> Result<String, BeatGridError> {
    let total: usize = encoded.iter().map(String::len).sum();
    let total = total.to_string();

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut plugin = BytesStart::new("Plugin");
    plugin.push_attribute(("name", config.plugin_name.as_str()));
    plugin.push_attribute(("version", config.version.as_str()));
    writer.write_event(Event::Start(plugin)).map_err(xml_err)?;

    let mut script = BytesStart::new("Script");
    script.push_attribute(("name", config.script_name.as_str()));
    script.push_attribute(("size", total.as_str()));
    writer.write_event(Event::Start(script)).map_err(xml_err)?;

    for (i, chunk) in encoded.iter().enumerate() {
        let index = (i + 1).to_string();
        let mut element = BytesStart::new("Chunk");
        element.push_attribute(("index", index.as_str()));
        writer.write_event(Event::Start(element)).map_err(xml_err)?;
        writer
            .write_event(Event::Text(BytesText::new(chunk)))
            .map_err(xml_err)?;
        writer
            .write_event(Event::End(BytesEnd::new("Chunk")))
            .map_err(xml_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("Script")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("Plugin")))
        .map_err(xml_err)?;

    let mut xml = String::from_utf8(writer.into_inner()).map_err(xml_err)?;
    xml.push('\n');
    Ok(xml)
}

/// Full descriptor for a beat list.
pub fn package(beats: &[Beat], config: &ExportConfig) -> Result<String, BeatGridError> {
    config.validate()?;
    let script = render_script(beats, config);
    let chunks = chunk_text(&script, config.chunk_size)?;
    write_descriptor(&encode_chunks(&chunks), config)
}

/// Decode and join the chunks of a descriptor.
///
/// # Errors
/// - [`BeatGridError::Xml`] if the document does not parse
/// - [`BeatGridError::Payload`] for bad base64, bad UTF-8, or a `size`
///   attribute that does not match the chunks
pub fn extract_script(xml: &str) -> Result<String, BeatGridError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut declared_size: Option<usize> = None;
    let mut encoded_size = 0usize;
    let mut in_chunk = false;
    let mut script = String::new();

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) if e.name().as_ref() == b"Script" => {
                if let Some(attr) = e.try_get_attribute("size").map_err(xml_err)? {
                    let value = attr.unescape_value().map_err(xml_err)?;
                    let size = value.parse().map_err(|_| {
                        BeatGridError::Payload(format!("invalid size attribute '{}'", value))
                    })?;
                    declared_size = Some(size);
                }
            }
            Event::Start(e) if e.name().as_ref() == b"Chunk" => in_chunk = true,
            Event::End(e) if e.name().as_ref() == b"Chunk" => in_chunk = false,
            Event::Text(e) if in_chunk => {
                let text = e.unescape().map_err(xml_err)?;
                encoded_size += text.len();
                let bytes = BASE64
                    .decode(text.as_bytes())
                    .map_err(|e| BeatGridError::Payload(e.to_string()))?;
                let piece =
                    String::from_utf8(bytes).map_err(|e| BeatGridError::Payload(e.to_string()))?;
                script.push_str(&piece);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match declared_size {
        Some(size) if size != encoded_size => Err(BeatGridError::Payload(format!(
            "size attribute is {} but chunks hold {} bytes",
            size, encoded_size
        ))),
        _ => Ok(script),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TempoMark;

    fn sample_beats() -> Vec<Beat> {
        (0..8)
            .map(|i| Beat {
                tick: i * 480,
                time_ms: i * 500,
                is_downbeat: i % 4 == 0,
                tempo: if i == 0 {
                    TempoMark::Changed(120)
                } else {
                    TempoMark::Unchanged
                },
            })
            .collect()
    }

    #[test]
    fn test_chunk_and_decode_round_trip() {
        let text = "local beats = {\r\n{0,1,120},\r\n{.5,0,0},\r\n} -- ünïcödé ♪";
        for size in [1, 3, 7, 64, 1000] {
            let chunks = chunk_text(text, size).unwrap();
            assert!(chunks.iter().all(|c| c.chars().count() <= size));
            let decoded: String = encode_chunks(&chunks)
                .iter()
                .map(|c| String::from_utf8(BASE64.decode(c).unwrap()).unwrap())
                .collect();
            assert_eq!(decoded, text);
        }
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(matches!(chunk_text("abc", 0), Err(BeatGridError::Config(_))));
    }

    #[test]
    fn test_line_endings_normalized() {
        let mixed = "a\r\nb\nc\rd";
        assert_eq!(normalize_line_endings(mixed, LineEnding::Crlf), "a\r\nb\r\nc\r\nd");
        assert_eq!(normalize_line_endings(mixed, LineEnding::Lf), "a\nb\nc\nd");
        for ending in [LineEnding::Crlf, LineEnding::Lf] {
            let joined = ["a", "b", "c", "d"].join(ending.as_str());
            assert_eq!(normalize_line_endings(mixed, ending), joined);
        }
    }

    #[test]
    fn test_render_script_contains_rows() {
        let config = ExportConfig::default();
        let script = render_script(&sample_beats(), &config);
        assert!(script.starts_with("-- BeatGrid beat timing\r\n"));
        assert!(script.contains("{0,1,120},\r\n{.5,0,0},\r\n"));
        assert!(script.contains("{2,1,0},\r\n"));
        assert!(!script.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn test_descriptor_size_matches_chunks() {
        let config = ExportConfig {
            chunk_size: 50,
            ..Default::default()
        };
        let xml = package(&sample_beats(), &config).unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<Plugin name="BeatGrid" version="1.0.0">"#));
        assert!(xml.contains(r#"<Chunk index="1">"#));
        assert!(xml.ends_with("</Plugin>\n"));

        let script = render_script(&sample_beats(), &config);
        let encoded = encode_chunks(&chunk_text(&script, 50).unwrap());
        let total: usize = encoded.iter().map(String::len).sum();
        assert!(xml.contains(&format!(r#"size="{}""#, total)));
        assert_eq!(encoded.len(), script.chars().count().div_ceil(50));
    }

    #[test]
    fn test_extract_script_round_trip() {
        let config = ExportConfig {
            chunk_size: 17,
            plugin_name: "Front & Back".to_string(),
            ..Default::default()
        };
        let xml = package(&sample_beats(), &config).unwrap();
        assert!(xml.contains("Front &amp; Back"));
        assert_eq!(extract_script(&xml).unwrap(), render_script(&sample_beats(), &config));
    }

    #[test]
    fn test_extract_rejects_bad_payload() {
        let xml = r#"<Plugin><Script size="4"><Chunk index="1">@@@@</Chunk></Script></Plugin>"#;
        assert!(matches!(extract_script(xml), Err(BeatGridError::Payload(_))));
    }

    #[test]
    fn test_extract_rejects_size_mismatch() {
        let xml = r#"<Plugin><Script size="99"><Chunk index="1">YWJj</Chunk></Script></Plugin>"#;
        let err = extract_script(xml).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid plugin payload: size attribute is 99 but chunks hold 4 bytes"
        );
    }
}
