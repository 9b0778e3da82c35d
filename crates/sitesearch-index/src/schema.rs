//! Indexed document fields.

/// A searchable field of a [`sitesearch_types::Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Content,
    Url,
}

impl Field {
    /// Every indexed field, in export order.
    pub const ALL: [Field; 3] = [Field::Title, Field::Content, Field::Url];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Content => "content",
            Field::Url => "url",
        }
    }

    /// Parse from string, returning None for unknown fields.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "title" => Some(Field::Title),
            "content" => Some(Field::Content),
            "url" => Some(Field::Url),
            _ => None,
        }
    }

    /// Relative weight of a match in this field.
    pub fn weight(&self) -> f32 {
        match self {
            Field::Title => 2.0,
            Field::Content => 1.0,
            Field::Url => 1.0,
        }
    }

    /// Text of this field for a document.
    pub fn value<'a>(&self, doc: &'a sitesearch_types::Document) -> &'a str {
        match self {
            Field::Title => &doc.title,
            Field::Content => &doc.content,
            Field::Url => &doc.url,
        }
    }
}

impl std::str::FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown field: {}", s))
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_conversion() {
        assert_eq!(Field::Title.as_str(), "title");
        assert_eq!(Field::parse("content"), Some(Field::Content));
        assert_eq!(Field::parse("body"), None);
        assert_eq!("url".parse::<Field>().unwrap(), Field::Url);
        assert!("invalid".parse::<Field>().is_err());
    }

    #[test]
    fn test_field_value() {
        let doc = sitesearch_types::Document::new("/a", "Title A", "Body", "/a").unwrap();
        assert_eq!(Field::Title.value(&doc), "Title A");
        assert_eq!(Field::Content.value(&doc), "Body");
        assert_eq!(Field::Url.value(&doc), "/a");
    }
}
