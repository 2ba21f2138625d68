//! Version scraping from JSON, YAML, XML and HTML documents.
//!
//! Each extractor selects exactly one string from a document, then optionally
//! post-processes it with a regular expression:
//!
//! - no pattern: the selected string is returned as-is
//! - pattern + replacement: every match is replaced with the template
//! - pattern alone: every match is replaced with `$1` (the first group)
//!
//! A pattern that does not match is an error, as is a path that selects a
//! non-string value.
//!
//! # Examples
//!
//! ```
//! use rpm_get::extract::extract_json;
//!
//! let doc = br#"[{"name":"Desktop v2025.4.2"}]"#;
//! let version = extract_json(doc, "$[0].name", Some(r"Desktop v([\d.]+)"), None).unwrap();
//! assert_eq!(version, "2025.4.2");
//! ```

use crate::error::{Result, RpmGetError};
use regex::Regex;
use serde_json::Value;
use serde_json_path::JsonPath;

/// Replacement used when a pattern is given without one.
pub const DEFAULT_REPLACEMENT: &str = "$1";

/// How to parse a document for XPath evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    Xml,
    Html,
}

/// Apply the optional pattern/replacement step to an extracted value.
pub fn apply_pattern(value: &str, pattern: Option<&str>, replacement: Option<&str>) -> Result<String> {
    let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
        return Ok(value.to_string());
    };

    let regex = Regex::new(pattern)?;
    if !regex.is_match(value) {
        return Err(RpmGetError::PatternMismatch {
            pattern: pattern.to_string(),
            value: value.to_string(),
        });
    }

    let replacement = replacement
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REPLACEMENT);
    Ok(regex.replace_all(value, replacement).into_owned())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Select one string with a JSONPath expression.
pub fn select_json(content: &[u8], path: &str) -> Result<String> {
    let json_path = JsonPath::parse(path).map_err(|e| RpmGetError::JsonPath(e.to_string()))?;
    let document: Value = serde_json::from_slice(content)?;
    select_path(&document, &json_path, path)
}

/// Select one string from a YAML document. The path uses the same `$.a.b[0]`
/// syntax as JSONPath.
pub fn select_yaml(content: &[u8], path: &str) -> Result<String> {
    let json_path = JsonPath::parse(path).map_err(|e| RpmGetError::JsonPath(e.to_string()))?;
    let document: Value = serde_yaml::from_slice(content)?;
    select_path(&document, &json_path, path)
}

fn select_path(document: &Value, json_path: &JsonPath, path: &str) -> Result<String> {
    let nodes = json_path.query(document).all();
    let node = match nodes.as_slice() {
        [node] => *node,
        [] => {
            return Err(RpmGetError::NothingSelected {
                expr: path.to_string(),
            });
        }
        many => {
            return Err(RpmGetError::JsonPath(format!(
                "{} selected {} values, expected one",
                path,
                many.len()
            )));
        }
    };

    match node {
        Value::String(s) => Ok(s.clone()),
        other => Err(RpmGetError::NotAString {
            expr: path.to_string(),
            found: json_type_name(other).to_string(),
        }),
    }
}

pub fn extract_json(
    content: &[u8],
    path: &str,
    pattern: Option<&str>,
    replacement: Option<&str>,
) -> Result<String> {
    let value = select_json(content, path)?;
    apply_pattern(&value, pattern, replacement)
}

pub fn extract_yaml(
    content: &[u8],
    path: &str,
    pattern: Option<&str>,
    replacement: Option<&str>,
) -> Result<String> {
    let value = select_yaml(content, path)?;
    apply_pattern(&value, pattern, replacement)
}

/// Select one string with an XPath expression. Node-sets yield the text of
/// their first node in document order.
pub fn select_xpath(content: &[u8], xpath: &str, markup: Markup) -> Result<String> {
    let text = String::from_utf8_lossy(content);
    let package = match markup {
        Markup::Xml => sxd_document::parser::parse(&text)
            .map_err(|e| RpmGetError::Xml(format!("{:?}", e)))?,
        Markup::Html => sxd_html::parse_html(&text),
    };
    let document = package.as_document();

    let factory = sxd_xpath::Factory::new();
    let compiled = factory
        .build(xpath)
        .map_err(|e| RpmGetError::XPath(e.to_string()))?
        .ok_or_else(|| RpmGetError::XPath(format!("empty expression '{}'", xpath)))?;
    let context = sxd_xpath::Context::new();
    let value = compiled
        .evaluate(&context, document.root())
        .map_err(|e| RpmGetError::XPath(e.to_string()))?;

    match value {
        sxd_xpath::Value::String(s) => Ok(s),
        sxd_xpath::Value::Nodeset(nodes) => match nodes.document_order_first() {
            Some(node) => Ok(node.string_value()),
            None => Err(RpmGetError::NothingSelected {
                expr: xpath.to_string(),
            }),
        },
        sxd_xpath::Value::Number(n) => Err(RpmGetError::NotAString {
            expr: xpath.to_string(),
            found: format!("number {}", n),
        }),
        sxd_xpath::Value::Boolean(b) => Err(RpmGetError::NotAString {
            expr: xpath.to_string(),
            found: format!("boolean {}", b),
        }),
    }
}

pub fn extract_xml(
    content: &[u8],
    xpath: &str,
    pattern: Option<&str>,
    replacement: Option<&str>,
) -> Result<String> {
    let value = select_xpath(content, xpath, Markup::Xml)?;
    apply_pattern(value.trim(), pattern, replacement)
}

pub fn extract_html(
    content: &[u8],
    xpath: &str,
    pattern: Option<&str>,
    replacement: Option<&str>,
) -> Result<String> {
    let value = select_xpath(content, xpath, Markup::Html)?;
    apply_pattern(value.trim(), pattern, replacement)
}

/// Text of the first element matching a CSS selector.
pub fn select_css(content: &[u8], selector: &str) -> Result<String> {
    let text = String::from_utf8_lossy(content);
    let html = scraper::Html::parse_document(&text);
    let parsed =
        scraper::Selector::parse(selector).map_err(|e| RpmGetError::Selector(e.to_string()))?;

    html.select(&parsed)
        .next()
        .map(|element| element.text().collect::<String>())
        .ok_or_else(|| RpmGetError::NothingSelected {
            expr: selector.to_string(),
        })
}

pub fn extract_css(
    content: &[u8],
    selector: &str,
    pattern: Option<&str>,
    replacement: Option<&str>,
) -> Result<String> {
    let value = select_css(content, selector)?;
    apply_pattern(value.trim(), pattern, replacement)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELEASES: &[u8] = br#"[
      {
        "tag_name": "desktop-mac-v2025.4.2",
        "name": "Desktop v2025.4.2",
        "id": 216016753,
        "draft": false
      }
    ]"#;

    #[test]
    fn test_json_first_group_by_default() {
        let v = extract_json(RELEASES, "$[0].name", Some(r"Desktop v([\d.]+)"), None).unwrap();
        assert_eq!(v, "2025.4.2");
    }

    #[test]
    fn test_json_with_replacement_template() {
        let v = extract_json(
            RELEASES,
            "$[0].tag_name",
            Some(r"desktop-mac-v(\d+)\.(\d+)\.(\d+)"),
            Some("$1.$2-$3"),
        )
        .unwrap();
        assert_eq!(v, "2025.4-2");
    }

    #[test]
    fn test_json_without_pattern_returns_value() {
        let v = extract_json(RELEASES, "$[0].tag_name", None, None).unwrap();
        assert_eq!(v, "desktop-mac-v2025.4.2");
    }

    #[test]
    fn test_json_non_string_is_error() {
        let err = extract_json(RELEASES, "$[0].id", None, None).unwrap_err();
        assert!(matches!(err, RpmGetError::NotAString { ref found, .. } if found == "number"));

        let err = extract_json(RELEASES, "$[0].draft", None, None).unwrap_err();
        assert!(matches!(err, RpmGetError::NotAString { .. }));
    }

    #[test]
    fn test_json_missing_path() {
        let err = extract_json(RELEASES, "$[0].nope", None, None).unwrap_err();
        assert!(matches!(err, RpmGetError::NothingSelected { .. }));
    }

    #[test]
    fn test_json_invalid_path() {
        let err = extract_json(RELEASES, "$[[", None, None).unwrap_err();
        assert!(matches!(err, RpmGetError::JsonPath(_)));
    }

    #[test]
    fn test_json_multiple_matches_is_error() {
        let doc = br#"{"a":[{"v":"1"},{"v":"2"}]}"#;
        let err = extract_json(doc, "$.a[*].v", None, None).unwrap_err();
        assert!(matches!(err, RpmGetError::JsonPath(_)));
    }

    #[test]
    fn test_yaml_path() {
        let index = br#"
apiVersion: v1
entries:
  ingress-nginx:
    - version: "4.11.3"
      appVersion: 1.11.3
    - version: "4.11.2"
"#;
        let v = extract_yaml(index, "$.entries['ingress-nginx'][0].version", None, None).unwrap();
        assert_eq!(v, "4.11.3");

        let v = extract_yaml(
            index,
            "$.entries['ingress-nginx'][1].version",
            Some(r"(\d+)\.(\d+)"),
            Some("$1-$2"),
        )
        .unwrap();
        assert_eq!(v, "4-11.2");
    }

    #[test]
    fn test_yaml_non_string_is_error() {
        let doc = b"release:\n  build: 42\n  stable: true\n";
        assert!(matches!(
            extract_yaml(doc, "$.release.build", None, None),
            Err(RpmGetError::NotAString { ref found, .. }) if found == "number"
        ));
        assert!(matches!(
            extract_yaml(doc, "$.release.missing", None, None),
            Err(RpmGetError::NothingSelected { .. })
        ));
        assert!(matches!(
            extract_yaml(b"a: [unclosed", "$.a", None, None),
            Err(RpmGetError::Yaml(_))
        ));
    }

    #[test]
    fn test_pattern_mismatch_is_error() {
        let err = apply_pattern("nightly", Some(r"v(\d+)"), None).unwrap_err();
        assert!(matches!(err, RpmGetError::PatternMismatch { .. }));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            apply_pattern("x", Some("("), None),
            Err(RpmGetError::Regex(_))
        ));
    }

    #[test]
    fn test_xml_xpath() {
        let feed = br#"<?xml version="1.0"?>
            <rss><channel>
              <item><title>Release 1.8.3</title></item>
              <item><title>Release 1.8.2</title></item>
            </channel></rss>"#;
        let v = extract_xml(feed, "//item/title", Some(r"Release ([\d.]+)"), None).unwrap();
        assert_eq!(v, "1.8.3");

        let v = extract_xml(feed, "string(//item[2]/title)", None, None).unwrap();
        assert_eq!(v, "Release 1.8.2");
    }

    #[test]
    fn test_xml_xpath_non_string_is_error() {
        let doc = br#"<a><b/><b/></a>"#;
        assert!(matches!(
            extract_xml(doc, "count(//b)", None, None),
            Err(RpmGetError::NotAString { .. })
        ));
        assert!(matches!(
            extract_xml(doc, "//c", None, None),
            Err(RpmGetError::NothingSelected { .. })
        ));
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(
            extract_xml(b"<a><b></a>", "//b", None, None),
            Err(RpmGetError::Xml(_))
        ));
    }

    #[test]
    fn test_css_selector() {
        let page = br#"<html><body>
            <div class="download"><span class="version"> v3.2.1 </span></div>
            <span class="version">v0.0.1</span>
        </body></html>"#;
        let v = extract_css(page, "div.download .version", Some(r"v([\d.]+)"), None).unwrap();
        assert_eq!(v, "3.2.1");
    }

    #[test]
    fn test_css_no_match() {
        let err = extract_css(b"<p>hi</p>", "span.version", None, None).unwrap_err();
        assert!(matches!(err, RpmGetError::NothingSelected { .. }));
    }
}
