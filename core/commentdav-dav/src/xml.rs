//! XML request parsing and multistatus / error rendering.

use std::collections::BTreeMap;

use http::StatusCode;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};
use serde::Deserialize;

use crate::properties::{split_clark, NS_DAV, NS_OWNCLOUD, NS_SABRE};
use crate::{DavError, DavResult, PropertyMap};

/// Parameters of the `filter-comments` report, as sent.
///
/// Empty elements count as absent.
#[derive(Deserialize, Debug, Default, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct FilterComments {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub datetime: Option<String>,
}

impl FilterComments {
    fn non_empty(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn limit(&self) -> Option<&str> {
        Self::non_empty(&self.limit)
    }

    pub fn offset(&self) -> Option<&str> {
        Self::non_empty(&self.offset)
    }

    pub fn datetime(&self) -> Option<&str> {
        Self::non_empty(&self.datetime)
    }
}

fn xml_error(e: impl std::fmt::Display) -> DavError {
    DavError::Xml(e.to_string())
}

fn clark(ns: &ResolveResult, local: &[u8]) -> String {
    let local = String::from_utf8_lossy(local);
    match ns {
        ResolveResult::Bound(Namespace(uri)) => {
            format!("{{{}}}{local}", String::from_utf8_lossy(uri))
        }
        _ => local.into_owned(),
    }
}

/// Clark name of the document element of a `REPORT` body.
pub fn parse_report_name(body: &[u8]) -> DavResult<String> {
    let mut reader = NsReader::from_reader(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        let (ns, event) = reader.read_resolved_event_into(&mut buf).map_err(xml_error)?;
        match event {
            Event::Start(e) | Event::Empty(e) => return Ok(clark(&ns, e.local_name().as_ref())),
            Event::Eof => return Err(DavError::BadRequest("Empty report body".to_string())),
            _ => {}
        }
        buf.clear();
    }
}

/// Deserializes a `filter-comments` report body.
pub fn parse_filter_comments(body: &[u8]) -> DavResult<FilterComments> {
    let text = std::str::from_utf8(body).map_err(xml_error)?;
    quick_xml::de::from_str(text).map_err(xml_error)
}

/// Reads a `propertyupdate` body into property mutations.
///
/// `set` entries map to `Some(text)`, `remove` entries to `None`. Nested
/// markup inside a value is flattened to its text.
pub fn parse_propertyupdate(body: &[u8]) -> DavResult<BTreeMap<String, Option<String>>> {
    let set = format!("{{{NS_DAV}}}set");
    let remove = format!("{{{NS_DAV}}}remove");
    let prop = format!("{{{NS_DAV}}}prop");

    let mut reader = NsReader::from_reader(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut mutations = BTreeMap::new();
    // true inside <set>, false inside <remove>
    let mut setting: Option<bool> = None;
    let mut in_prop = false;
    // (name, text, nesting depth below the property element)
    let mut current: Option<(String, String, usize)> = None;

    let mut record = |name: String, text: String, setting: Option<bool>| {
        let value = if setting == Some(true) { Some(text) } else { None };
        mutations.insert(name, value);
    };

    loop {
        let (ns, event) = reader.read_resolved_event_into(&mut buf).map_err(xml_error)?;
        match event {
            Event::Start(e) => {
                let name = clark(&ns, e.local_name().as_ref());
                if let Some((_, _, depth)) = current.as_mut() {
                    *depth += 1;
                } else if in_prop {
                    current = Some((name, String::new(), 0));
                } else if name == set {
                    setting = Some(true);
                } else if name == remove {
                    setting = Some(false);
                } else if name == prop && setting.is_some() {
                    in_prop = true;
                }
            }
            Event::Empty(e) => {
                if current.is_none() && in_prop {
                    record(clark(&ns, e.local_name().as_ref()), String::new(), setting);
                }
            }
            Event::Text(t) => {
                if let Some((_, text, _)) = current.as_mut() {
                    text.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(t) => {
                if let Some((_, text, _)) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(_) => match current.take() {
                Some((name, text, 0)) => record(name, text, setting),
                Some((name, text, depth)) => current = Some((name, text, depth - 1)),
                None if in_prop => in_prop = false,
                None => setting = None,
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(mutations)
}

/// Property names requested by a `PROPFIND` body. Empty for `allprop` or an
/// empty body, which both mean "everything".
pub fn parse_propfind(body: &[u8]) -> DavResult<Vec<String>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let prop = format!("{{{NS_DAV}}}prop");

    let mut reader = NsReader::from_reader(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut names = Vec::new();
    let mut depth_in_prop: Option<usize> = None;
    loop {
        let (ns, event) = reader.read_resolved_event_into(&mut buf).map_err(xml_error)?;
        match event {
            Event::Start(e) => {
                let name = clark(&ns, e.local_name().as_ref());
                match depth_in_prop.as_mut() {
                    Some(depth) => {
                        if *depth == 0 {
                            names.push(name);
                        }
                        *depth += 1;
                    }
                    None if name == prop => depth_in_prop = Some(0),
                    None => {}
                }
            }
            Event::Empty(e) => {
                if depth_in_prop == Some(0) {
                    names.push(clark(&ns, e.local_name().as_ref()));
                }
            }
            Event::End(_) => {
                depth_in_prop = match depth_in_prop {
                    Some(0) | None => None,
                    Some(depth) => Some(depth - 1),
                };
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(names)
}

fn status_line(status: StatusCode) -> String {
    format!(
        "HTTP/1.1 {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
}

fn prefixed(namespace: &str, local: &str) -> (String, Option<String>) {
    match namespace {
        NS_DAV => (format!("d:{local}"), None),
        NS_OWNCLOUD => (format!("oc:{local}"), None),
        NS_SABRE => (format!("s:{local}"), None),
        "" => (local.to_string(), None),
        other => (format!("x:{local}"), Some(other.to_string())),
    }
}

struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> DavResult<Self> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(xml_error)?;
        Ok(Self { writer })
    }

    fn root(&mut self, name: &str) -> DavResult<()> {
        let start = BytesStart::new(name).with_attributes([
            ("xmlns:d", NS_DAV),
            ("xmlns:oc", NS_OWNCLOUD),
            ("xmlns:s", NS_SABRE),
        ]);
        self.writer.write_event(Event::Start(start)).map_err(xml_error)
    }

    fn start(&mut self, name: &str) -> DavResult<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_error)
    }

    fn end(&mut self, name: &str) -> DavResult<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)
    }

    fn text_element(&mut self, name: &str, text: &str) -> DavResult<()> {
        self.start(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_error)?;
        self.end(name)
    }

    fn property(&mut self, clark_name: &str, value: Option<&str>) -> DavResult<()> {
        let (namespace, local) = split_clark(clark_name);
        let (name, xmlns) = prefixed(namespace, local);
        let mut start = BytesStart::new(name.as_str());
        if let Some(xmlns) = &xmlns {
            start.push_attribute(("xmlns:x", xmlns.as_str()));
        }
        match value {
            Some(text) if !text.is_empty() => {
                self.writer.write_event(Event::Start(start)).map_err(xml_error)?;
                self.writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(xml_error)?;
                self.end(&name)
            }
            _ => self.writer.write_event(Event::Empty(start)).map_err(xml_error),
        }
    }

    fn propstat<'v>(
        &mut self,
        props: impl IntoIterator<Item = (&'v str, Option<&'v str>)>,
        status: StatusCode,
    ) -> DavResult<()> {
        self.start("d:propstat")?;
        self.start("d:prop")?;
        for (name, value) in props {
            self.property(name, value)?;
        }
        self.end("d:prop")?;
        self.text_element("d:status", &status_line(status))?;
        self.end("d:propstat")
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Renders a `207 Multi-Status` body for `(href, properties)` pairs.
///
/// Properties with a value are reported under `200`, unset ones under `404`.
pub fn write_multistatus(responses: &[(String, PropertyMap)]) -> DavResult<Vec<u8>> {
    let mut out = XmlOut::new()?;
    out.root("d:multistatus")?;
    for (href, props) in responses {
        out.start("d:response")?;
        out.text_element("d:href", href)?;

        let found: Vec<_> = props
            .iter()
            .filter_map(|(name, value)| value.as_deref().map(|v| (name.as_str(), Some(v))))
            .collect();
        let missing: Vec<_> = props
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| (name.as_str(), None))
            .collect();

        if !found.is_empty() || missing.is_empty() {
            out.propstat(found, StatusCode::OK)?;
        }
        if !missing.is_empty() {
            out.propstat(missing, StatusCode::NOT_FOUND)?;
        }
        out.end("d:response")?;
    }
    out.end("d:multistatus")?;
    Ok(out.finish())
}

/// Renders the result of a `PROPPATCH`, grouping properties by status.
pub fn write_proppatch_multistatus(
    href: &str,
    statuses: &BTreeMap<String, StatusCode>,
) -> DavResult<Vec<u8>> {
    let mut grouped: BTreeMap<u16, Vec<&str>> = BTreeMap::new();
    for (name, status) in statuses {
        grouped.entry(status.as_u16()).or_default().push(name);
    }

    let mut out = XmlOut::new()?;
    out.root("d:multistatus")?;
    out.start("d:response")?;
    out.text_element("d:href", href)?;
    for (code, names) in grouped {
        let status = StatusCode::from_u16(code).map_err(xml_error)?;
        out.propstat(names.into_iter().map(|n| (n, None)), status)?;
    }
    out.end("d:response")?;
    out.end("d:multistatus")?;
    Ok(out.finish())
}

/// Renders the error body returned alongside a failed request.
pub fn write_error(error: &DavError) -> DavResult<Vec<u8>> {
    let mut out = XmlOut::new()?;
    out.root("d:error")?;
    out.text_element("s:exception", error.exception_name())?;
    out.text_element("s:message", &error.to_string())?;
    out.end("d:error")?;
    Ok(out.finish())
}
