//! Overpass QL query construction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An OSM tag filter such as `"amenity"="school"` or just `"amenity"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagFilter {
    /// Tag key.
    pub key: String,
    /// Tag value. `None` matches any value.
    #[serde(default)]
    pub value: Option<String>,
}

impl TagFilter {
    /// Filter on a key with any value.
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    /// Filter on an exact key/value pair.
    #[must_use]
    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// File-name friendly label, e.g. `amenity_school`.
    #[must_use]
    pub fn slug(&self) -> String {
        let raw = match &self.value {
            Some(value) => format!("{}_{value}", self.key),
            None => self.key.clone(),
        };
        raw.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    }

    /// The tag as `key=value` (or `key`), used as a feature property.
    #[must_use]
    pub fn property(&self) -> (String, serde_json::Value) {
        let value = self
            .value
            .as_ref()
            .map_or(serde_json::Value::Bool(true), |v| v.clone().into());
        (self.key.clone(), value)
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.key))?;
        if let Some(value) = &self.value {
            write!(f, "={}", quote(value))?;
        }
        Ok(())
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// A complete Overpass QL query for one tag filter.
///
/// Nodes, ways, and relations carrying the tag are requested with
/// `out geom`, so ways and relation members come back with inline
/// coordinates. When `area` is set (an area selector such as
/// `["ISO3166-1"="DE"][admin_level=2]`), the search is restricted to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverpassQuery {
    /// Tag to search for.
    pub filter: TagFilter,
    /// Optional area selector, without the leading `area`.
    pub area: Option<String>,
}

impl OverpassQuery {
    #[must_use]
    pub const fn new(filter: TagFilter, area: Option<String>) -> Self {
        Self { filter, area }
    }
}

impl fmt::Display for OverpassQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filter = &self.filter;
        writeln!(f, "[out:json];")?;
        let scope = match &self.area {
            Some(area) => {
                writeln!(f, "area{area}->.searchArea;")?;
                "(area.searchArea)"
            }
            None => "",
        };
        writeln!(f, "(")?;
        for element in ["node", "way", "relation"] {
            writeln!(f, "  {element}[{filter}]{scope};")?;
        }
        writeln!(f, ");")?;
        write!(f, "out geom;")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_filters() {
        assert_eq!(TagFilter::key_value("amenity", "school").to_string(), r#""amenity"="school""#);
        assert_eq!(TagFilter::key("building").to_string(), r#""building""#);
        assert_eq!(TagFilter::key(r#"odd"key"#).to_string(), r#""odd\"key""#);
    }

    #[test]
    fn renders_worldwide_query() {
        let query = OverpassQuery::new(TagFilter::key_value("amenity", "school"), None);
        assert_eq!(
            query.to_string(),
            "[out:json];\n(\n  node[\"amenity\"=\"school\"];\n  way[\"amenity\"=\"school\"];\n  relation[\"amenity\"=\"school\"];\n);\nout geom;"
        );
    }

    #[test]
    fn renders_area_query() {
        let query = OverpassQuery::new(
            TagFilter::key("leisure"),
            Some(r#"["ISO3166-1"="DE"]"#.to_string()),
        );
        let text = query.to_string();
        assert!(text.contains("area[\"ISO3166-1\"=\"DE\"]->.searchArea;"));
        assert!(text.contains("  way[\"leisure\"](area.searchArea);"));
    }

    #[test]
    fn slug_is_file_name_safe() {
        assert_eq!(TagFilter::key_value("amenity", "school").slug(), "amenity_school");
        assert_eq!(TagFilter::key_value("addr:city", "Köln").slug(), "addr_city_K_ln");
    }

    #[test]
    fn property_defaults_to_true_without_value() {
        assert_eq!(TagFilter::key("building").property(), ("building".to_string(), true.into()));
        assert_eq!(
            TagFilter::key_value("amenity", "school").property(),
            ("amenity".to_string(), "school".into())
        );
    }
}
