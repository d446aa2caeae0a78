//! XML envelopes for the editing API. The API takes tiny hand-shaped
//! documents and answers with plain-text ids, so string assembly with
//! proper escaping beats pulling in an XML serializer.

use indexmap::IndexMap;
use std::fmt::Write;

/// Attributes of a `<node>` element write. `id` and `version` are set
/// for updates only; coordinates are omitted when the caller has none.
pub(crate) struct NodeAttrs<'a> {
    pub changeset: &'a str,
    pub id: Option<i64>,
    pub version: Option<u64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

pub(crate) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_tags<'a>(out: &mut String, tags: impl Iterator<Item = (&'a str, &'a str)>) {
    for (k, v) in tags {
        let _ = write!(out, r#"<tag k="{}" v="{}"/>"#, escape(k), escape(v));
    }
}

/// `<osm><changeset>` creation envelope with the given metadata tags.
pub(crate) fn changeset_envelope<'a>(tags: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::from("<osm><changeset>");
    push_tags(&mut out, tags);
    out.push_str("</changeset></osm>");
    out
}

/// `<osm><node>` envelope for element creates and updates.
pub(crate) fn node_envelope(attrs: &NodeAttrs<'_>, tags: &IndexMap<String, String>) -> String {
    let mut out = String::from("<osm><node");
    if let Some(id) = attrs.id {
        let _ = write!(out, r#" id="{id}""#);
    }
    if let Some(version) = attrs.version {
        let _ = write!(out, r#" version="{version}""#);
    }
    let _ = write!(out, r#" changeset="{}""#, escape(attrs.changeset));
    if let Some(lat) = attrs.lat {
        let _ = write!(out, r#" lat="{lat}""#);
    }
    if let Some(lon) = attrs.lon {
        let _ = write!(out, r#" lon="{lon}""#);
    }
    out.push('>');
    push_tags(&mut out, tags.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    out.push_str("</node></osm>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changeset_envelope_lists_tags() {
        let tags = [("comment", "add station"), ("created_by", "chargemap")];
        let xml = changeset_envelope(tags.iter().copied());
        assert_eq!(
            xml,
            r#"<osm><changeset><tag k="comment" v="add station"/><tag k="created_by" v="chargemap"/></changeset></osm>"#
        );
    }

    #[test]
    fn node_envelope_for_create_has_no_id() {
        let mut tags = IndexMap::new();
        tags.insert("name".to_string(), "X".to_string());
        let xml = node_envelope(
            &NodeAttrs {
                changeset: "42",
                id: None,
                version: None,
                lat: Some(52.52),
                lon: Some(13.405),
            },
            &tags,
        );
        assert_eq!(
            xml,
            r#"<osm><node changeset="42" lat="52.52" lon="13.405"><tag k="name" v="X"/></node></osm>"#
        );
    }

    #[test]
    fn node_envelope_for_update_carries_version() {
        let xml = node_envelope(
            &NodeAttrs {
                changeset: "42",
                id: Some(7),
                version: Some(3),
                lat: Some(1.0),
                lon: Some(2.0),
            },
            &IndexMap::new(),
        );
        assert!(xml.starts_with(r#"<osm><node id="7" version="3" changeset="42""#));
    }

    #[test]
    fn values_are_escaped() {
        let mut tags = IndexMap::new();
        tags.insert("name".to_string(), r#"Müller & <Söhne> "fast""#.to_string());
        let xml = node_envelope(
            &NodeAttrs {
                changeset: "1",
                id: None,
                version: None,
                lat: None,
                lon: None,
            },
            &tags,
        );
        assert!(xml.contains(r#"v="Müller &amp; &lt;Söhne&gt; &quot;fast&quot;""#));
    }
}
