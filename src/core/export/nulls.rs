//! Blanking of literal null markers in written attribute values
//!
//! Some sources store the text `<Null>` instead of an empty value. Any
//! attribute value containing the marker is replaced by an empty value as a
//! whole. Both functions block and rewrite the file only when a value
//! changed.

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;

/// Marker written by some sources for empty attribute values
pub const NULL_MARKER: &str = "<Null>";

/// KML elements whose text is an attribute value
const KML_VALUE_ELEMENTS: [&[u8]; 3] = [b"SimpleData", b"value", b"name"];

fn invalid_data<E>(error: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, error)
}

fn is_marked(value: &Value) -> bool {
    value.as_str().is_some_and(|s| s.contains(NULL_MARKER))
}

/// Blanks marked string values of a `properties` object under `holder`
fn blank_properties(holder: &mut Value) -> usize {
    let Some(properties) = holder.get_mut("properties").and_then(Value::as_object_mut) else {
        return 0;
    };

    let mut count = 0;
    for value in properties.values_mut() {
        if is_marked(value) {
            *value = Value::String(String::new());
            count += 1;
        }
    }
    count
}

/// Blanks marked feature properties in the GeoJSON file at `path`
///
/// Handles feature collections as well as a lone feature. Returns the
/// number of values blanked.
pub fn blank_geojson_nulls(path: &Path) -> io::Result<usize> {
    let content = fs::read_to_string(path)?;
    if !content.contains(NULL_MARKER) {
        return Ok(0);
    }

    let mut document: Value = serde_json::from_str(&content).map_err(invalid_data)?;
    let mut count = blank_properties(&mut document);
    if let Some(features) = document.get_mut("features").and_then(Value::as_array_mut) {
        count += features.iter_mut().map(blank_properties).sum::<usize>();
    }

    if count > 0 {
        fs::write(path, serde_json::to_vec(&document).map_err(invalid_data)?)?;
    }
    Ok(count)
}

/// Content of one KML value element, held back until its end tag
#[derive(Default)]
struct OpenValue<'a> {
    events: Vec<Event<'a>>,
    text: String,
    depth: usize,
}

impl<'a> OpenValue<'a> {
    /// Buffers `event`; true once the value element itself closed
    fn push(&mut self, event: Event<'a>) -> io::Result<bool> {
        let closed = match &event {
            Event::Start(_) => {
                self.depth += 1;
                false
            }
            Event::End(_) => match self.depth.checked_sub(1) {
                Some(depth) => {
                    self.depth = depth;
                    false
                }
                None => true,
            },
            Event::Text(t) => {
                self.text.push_str(&t.unescape().map_err(invalid_data)?);
                false
            }
            Event::CData(c) => {
                self.text.push_str(&String::from_utf8_lossy(c));
                false
            }
            _ => false,
        };
        self.events.push(event);
        Ok(closed)
    }

    /// Writes the buffered content, or only the end tag when marked
    fn flush(self, writer: &mut Writer<Vec<u8>>) -> io::Result<bool> {
        let marked = self.text.contains(NULL_MARKER);
        let mut events = self.events.into_iter();
        let end = events.next_back();

        if !marked {
            for event in events {
                writer.write_event(event).map_err(invalid_data)?;
            }
        }
        if let Some(end) = end {
            writer.write_event(end).map_err(invalid_data)?;
        }
        Ok(marked)
    }
}

/// Rewrites `kml` with marked values emptied, returning the blank count
fn rewrite_kml(kml: &str) -> io::Result<(Vec<u8>, usize)> {
    let mut reader = Reader::from_str(kml);
    let mut writer = Writer::new(Vec::with_capacity(kml.len()));
    let mut open: Option<OpenValue<'_>> = None;
    let mut count = 0;

    loop {
        let event = reader.read_event().map_err(invalid_data)?;
        if matches!(event, Event::Eof) {
            if open.is_some() {
                return Err(invalid_data("KML ends inside a value element"));
            }
            break;
        }

        if let Some(value) = open.as_mut() {
            if value.push(event)? {
                if let Some(value) = open.take() {
                    count += usize::from(value.flush(&mut writer)?);
                }
            }
            continue;
        }

        let opens_value = matches!(
            &event,
            Event::Start(e) if KML_VALUE_ELEMENTS.contains(&e.local_name().as_ref())
        );
        writer.write_event(event).map_err(invalid_data)?;
        if opens_value {
            open = Some(OpenValue::default());
        }
    }

    Ok((writer.into_inner(), count))
}

/// Blanks marked attribute values in the KML document at `path`
///
/// Returns the number of values blanked.
pub fn blank_kml_nulls(path: &Path) -> io::Result<usize> {
    let content = fs::read_to_string(path)?;
    // Markers inside KML text are escaped
    if !content.contains("Null") {
        return Ok(0);
    }

    let (rewritten, count) = rewrite_kml(&content)?;
    if count > 0 {
        fs::write(path, rewritten)?;
    }
    Ok(count)
}
