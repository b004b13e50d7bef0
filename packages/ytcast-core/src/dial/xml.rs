//! XML parsing for DIAL documents.
//!
//! Two documents are read: the UPnP device description (only
//! `device/friendlyName` matters) and the DIAL application information
//! (`<service>` with `name`, `state`, `options`, `link` and `additionalData`).
//! Unknown elements are ignored in both.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::reader::Reader;

use super::types::{AppInfo, AppState, DialError, DialResult};

/// Gets an attribute value from an XML element.
///
/// # Arguments
/// * `elem` - The XML element to search
/// * `attr_name` - The attribute name as bytes (e.g., `b"allowStop"`)
pub fn get_xml_attr(elem: &BytesStart, attr_name: &[u8]) -> Option<String> {
    elem.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == attr_name)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// Reads everything up to the matching end tag and returns it verbatim.
///
/// Must be called right after the `Start` event of `name` was read from a
/// reader created with [`Reader::from_str`] over `xml`.
fn read_inner_xml<'a>(
    reader: &mut Reader<&'a [u8]>,
    xml: &'a str,
    name: QName<'_>,
) -> quick_xml::Result<&'a str> {
    let span = reader.read_to_end(name)?;
    Ok(xml
        .get(span.start as usize..span.end as usize)
        .unwrap_or_default())
}

/// Reads the text content of the current element, entity-decoded and trimmed.
fn read_text<'a>(
    reader: &mut Reader<&'a [u8]>,
    xml: &'a str,
    name: QName<'_>,
) -> quick_xml::Result<String> {
    let raw = read_inner_xml(reader, xml, name)?;
    Ok(html_escape::decode_html_entities(raw).trim().to_string())
}

/// Returns the trimmed text of the first element named `element_name`
/// (namespace prefix ignored), or `None` if there is no such element.
pub fn extract_xml_text(xml: &str, element_name: &str) -> quick_xml::Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let target = element_name.as_bytes();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == target => {
                let name = e.name().as_ref().to_vec();
                return read_text(&mut reader, xml, QName(&name)).map(Some);
            }
            Event::Empty(ref e) if e.local_name().as_ref() == target => {
                return Ok(Some(String::new()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Extracts `device/friendlyName` from a UPnP device description.
///
/// The element must be a child of a `device` element that is itself a child
/// of the document root.
pub fn parse_friendly_name(xml: &str) -> DialResult<String> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let local = e.local_name().as_ref().to_vec();
                if local == b"friendlyName" && path.len() == 2 && path[1] == b"device" {
                    let name = e.name().as_ref().to_vec();
                    let friendly_name = read_text(&mut reader, xml, QName(&name))?;
                    if friendly_name.is_empty() {
                        break;
                    }
                    return Ok(friendly_name);
                }
                path.push(local);
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Err(DialError::MissingElement("device/friendlyName"))
}

/// Parses a DIAL application information document.
///
/// `run_link` is only kept when the application is running, and
/// `additional_data` is the raw inner content of `<additionalData>`.
pub fn parse_app_info(xml: &str) -> DialResult<AppInfo> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;

    let mut name = String::new();
    let mut state = String::new();
    let mut allow_stop = false;
    let mut run_link = None;
    let mut additional_data = String::new();

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) if depth == 1 => {
                let is_start = matches!(event, Event::Start(_));
                let qname = e.name().as_ref().to_vec();
                match e.local_name().as_ref() {
                    b"options" => {
                        allow_stop = get_xml_attr(e, b"allowStop")
                            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
                    }
                    b"link" => {
                        if get_xml_attr(e, b"rel").as_deref() == Some("run") {
                            run_link = get_xml_attr(e, b"href").filter(|h| !h.is_empty());
                        }
                    }
                    b"name" if is_start => {
                        name = read_text(&mut reader, xml, QName(&qname))?;
                        continue;
                    }
                    b"state" if is_start => {
                        state = read_text(&mut reader, xml, QName(&qname))?;
                        continue;
                    }
                    b"additionalData" if is_start => {
                        additional_data = read_inner_xml(&mut reader, xml, QName(&qname))?
                            .to_string();
                        continue;
                    }
                    _ => {}
                }
                if is_start {
                    depth += 1;
                }
            }
            Event::Start(_) => {
                seen_root = true;
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(DialError::MissingElement("service"));
    }

    let state = AppState::parse(&state);
    if state != AppState::Running {
        run_link = None;
    }

    Ok(AppInfo {
        name,
        state,
        allow_stop,
        run_link,
        additional_data,
    })
}
