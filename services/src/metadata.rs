//! Script header parsing.
//!
//! A script may open with a block comment (`"""` for Python, `/* */` for SQL) whose body
//! is a YAML mapping. Anything that does not fit that shape simply yields no metadata.

use db::models::ScriptMeta;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value as YamlValue;
use std::fs;
use std::path::Path;

use crate::collaborators::AuthorLink;

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)\A(?:"""|/\*)(.*?)(?:"""|\*/)"#).expect("header pattern is valid")
});

/// Parses the leading comment block of a script.
pub fn parse_header(text: &str) -> ScriptMeta {
    let Some(body) = HEADER.captures(text).and_then(|caps| caps.get(1)) else {
        return ScriptMeta::default();
    };

    let mapping = match serde_yaml::from_str::<YamlValue>(body.as_str()) {
        Ok(YamlValue::Mapping(mapping)) => mapping,
        Ok(_) => return ScriptMeta::default(),
        Err(e) => {
            log::debug!("Ignoring unparsable script header: {}", e);
            return ScriptMeta::default();
        }
    };

    let pairs = mapping.into_iter().filter_map(|(key, value)| {
        let key = match key {
            YamlValue::String(s) => s,
            YamlValue::Number(n) => n.to_string(),
            YamlValue::Bool(b) => b.to_string(),
            _ => return None,
        };
        serde_json::to_value(value).ok().map(|value| (key, value))
    });
    ScriptMeta::from_pairs(pairs)
}

/// Reads a script's header and attaches the author link.
///
/// The link always comes from the lookup, replacing any `link` written in the header.
pub fn extract(path: &Path, author_link: &dyn AuthorLink) -> ScriptMeta {
    let mut meta = match fs::read_to_string(path) {
        Ok(text) => parse_header(&text),
        Err(e) => {
            log::warn!("Could not read {}: {}", path.display(), e);
            ScriptMeta::default()
        }
    };

    meta.link = author_link.link(path).unwrap_or_else(|e| {
        log::debug!("No author link for {}: {}", path.display(), e);
        None
    });
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::NoAuthorLink;
    use serde_json::json;

    struct FixedLink(Result<Option<String>, String>);

    impl AuthorLink for FixedLink {
        fn link(&self, _script: &Path) -> Result<Option<String>, String> {
            self.0.clone()
        }
    }

    #[test]
    fn test_python_docstring_header() {
        let text = "\"\"\"\nAuthor: alice\nDescription: backfill emails\nTicket: 42\n\"\"\"\n\nprint(1)\n";
        let meta = parse_header(text);
        assert_eq!(meta.author.as_deref(), Some("alice"));
        assert_eq!(meta.description.as_deref(), Some("backfill emails"));
        assert_eq!(meta.extra.get("Ticket"), Some(&json!(42)));
    }

    #[test]
    fn test_sql_block_comment_header() {
        let meta = parse_header("/*\nauthor: bob\n*/\nALTER TABLE t ADD c int;\n");
        assert_eq!(meta.author.as_deref(), Some("bob"));
    }

    #[test]
    fn test_header_must_open_the_file() {
        assert!(parse_header("\n/*\nauthor: bob\n*/").is_empty());
        assert!(parse_header("-- author: bob").is_empty());
    }

    #[test]
    fn test_non_mapping_or_broken_yaml_is_empty() {
        assert!(parse_header("\"\"\"Just a docstring.\"\"\"").is_empty());
        assert!(parse_header("/* [unclosed */").is_empty());
        assert!(parse_header("/**/").is_empty());
    }

    #[test]
    fn test_extract_overrides_link() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.sql");
        fs::write(&path, "/*\nlink: stale\nauthor: carol\n*/").unwrap();

        let meta = extract(&path, &FixedLink(Ok(Some("https://x/1".into()))));
        assert_eq!(meta.link.as_deref(), Some("https://x/1"));
        assert_eq!(meta.author.as_deref(), Some("carol"));

        let meta = extract(&path, &FixedLink(Err("git failed".into())));
        assert_eq!(meta.link, None);
    }

    #[test]
    fn test_extract_unreadable_file_is_empty() {
        let meta = extract(Path::new("/definitely/not/here.sql"), &NoAuthorLink);
        assert!(meta.is_empty());
    }
}
