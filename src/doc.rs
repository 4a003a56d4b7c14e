//! JSDoc blocks attached to declarations and object properties.
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@([A-Za-z][\w-]*)\s*(.*)$").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    /// First paragraph.
    pub summary: Option<String>,
    /// Everything after the first paragraph that is not a tag.
    pub description: Option<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl DocComment {
    /// Parse the cleaned body of a `/** ... */` block (the lexer already
    /// stripped the delimiters and leading `*`).
    pub fn parse(text: &str) -> Option<DocComment> {
        let mut paragraphs: Vec<Vec<&str>> = vec![Vec::new()];
        let mut tags: Vec<Tag> = Vec::new();
        let mut in_tag = false;

        for line in text.lines().map(str::trim) {
            if let Some(caps) = TAG_LINE.captures(line) {
                tags.push(Tag {
                    name: caps[1].to_string(),
                    value: caps[2].trim().to_string(),
                });
                in_tag = true;
                continue;
            }
            if in_tag {
                // continuation of a multi-line tag (e.g. a JSON @example)
                if let Some(tag) = tags.last_mut() {
                    if !line.is_empty() {
                        if !tag.value.is_empty() {
                            tag.value.push('\n');
                        }
                        tag.value.push_str(line);
                    }
                }
                continue;
            }
            if line.is_empty() {
                if paragraphs.last().is_some_and(|p| !p.is_empty()) {
                    paragraphs.push(Vec::new());
                }
            } else if let Some(p) = paragraphs.last_mut() {
                p.push(line);
            }
        }

        let mut paragraphs = paragraphs
            .into_iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.join(" "));
        let summary = paragraphs.next();
        let rest: Vec<String> = paragraphs.collect();
        let description = if rest.is_empty() { None } else { Some(rest.join("\n\n")) };

        if summary.is_none() && tags.is_empty() {
            return None;
        }
        Some(DocComment { summary, description, tags })
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.iter().find(|t| t.name == name).map(|t| t.value.as_str())
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags.iter().filter(move |t| t.name == name).map(|t| t.value.as_str())
    }

    /// Summary and description joined the way OpenAPI `description` expects.
    pub fn full_text(&self) -> Option<String> {
        match (&self.summary, &self.description) {
            (Some(s), Some(d)) => Some(format!("{s}\n\n{d}")),
            (Some(s), None) => Some(s.clone()),
            (None, Some(d)) => Some(d.clone()),
            (None, None) => None,
        }
    }
}
