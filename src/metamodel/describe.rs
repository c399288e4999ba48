//! Tree browsing over the metamodel.
//!
//! Paths walk `category/group/indicator_key`. Listings render one
//! `name:kind:description` line per child; an indicator renders as a
//! Markdown card.

use std::fmt;

use super::model::{Indicator, Metamodel};
use super::IndicatorRef;
use crate::twin::path::TwinPath;

const SHARED_PREFIX: &str = "_shared";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeEntry {
    pub name: String,
    pub kind: String,
    pub description: String,
}

impl DescribeEntry {
    fn new(name: impl Into<String>, kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for DescribeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.kind, self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    Listing(Vec<DescribeEntry>),
    Document(String),
    NotFound(String),
}

impl Description {
    pub fn is_found(&self) -> bool {
        !matches!(self, Description::NotFound(_))
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Description::Listing(entries) => {
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", entry)?;
                }
                Ok(())
            }
            Description::Document(markdown) => f.write_str(markdown),
            Description::NotFound(path) => write!(f, "Error: Path not found: {}", path),
        }
    }
}

impl Metamodel {
    pub fn describe(&self, raw_path: Option<&str>) -> Description {
        let raw = raw_path.unwrap_or_default().trim();
        let not_found = || Description::NotFound(raw.to_string());

        let Ok(path) = TwinPath::parse(raw.trim_end_matches(".md")) else {
            return not_found();
        };

        match path.segments() {
            [] => Description::Listing(self.root_entries()),
            [prefix, name] if prefix == SHARED_PREFIX => self.shared_document(name).unwrap_or_else(not_found),
            [name] if self.category(name).is_none() => self.shared_document(name).unwrap_or_else(not_found),
            [category] => self.category_entries(category).unwrap_or_else(not_found),
            [category, group] => self.group_entries(category, group).unwrap_or_else(not_found),
            [_, _, _] => self
                .resolve(&path)
                .map(|entry| Description::Document(indicator_card(&entry)))
                .unwrap_or_else(not_found),
            _ => not_found(),
        }
    }

    fn root_entries(&self) -> Vec<DescribeEntry> {
        let documents = self
            .documents
            .keys()
            .map(|name| DescribeEntry::new(name, "document", "Shared"));
        let categories = self
            .categories
            .iter()
            .map(|c| DescribeEntry::new(&c.code, "category", &c.title));
        documents.chain(categories).collect()
    }

    fn shared_document(&self, name: &str) -> Option<Description> {
        self.documents
            .get(name)
            .map(|markdown| Description::Document(markdown.clone()))
    }

    fn category_entries(&self, code: &str) -> Option<Description> {
        let category = self.category(code)?;
        let entries = category
            .groups
            .iter()
            .map(|g| DescribeEntry::new(&g.code, "group", &g.description))
            .collect();
        Some(Description::Listing(entries))
    }

    fn group_entries(&self, category: &str, group: &str) -> Option<Description> {
        let group = self
            .category(category)?
            .groups
            .iter()
            .find(|g| g.code == group)?;
        let entries = group
            .indicators
            .iter()
            .map(|ind| {
                DescribeEntry::new(
                    &ind.key,
                    format!("{}/{}", ind.kind.as_str(), ind.format),
                    short_description(ind),
                )
            })
            .collect();
        Some(Description::Listing(entries))
    }
}

fn short_description(indicator: &Indicator) -> String {
    let text = indicator.description.as_deref().unwrap_or(&indicator.name);
    text.lines().next().unwrap_or_default().trim().to_string()
}

fn indicator_card(entry: &IndicatorRef<'_>) -> String {
    let ind = entry.indicator;
    let mut lines = vec![
        format!("# {}", ind.name),
        String::new(),
        format!("**Code:** {}", ind.code),
        format!("**Name:** {}", ind.name),
    ];
    if let Some(name_en) = &ind.name_en {
        lines.push(format!("**Name (EN):** {}", name_en));
    }
    lines.push(format!("**Type:** {}", ind.kind.as_str()));
    lines.push(format!("**Format:** {}", ind.format));
    if let Some(unit) = &ind.unit {
        lines.push(format!("**Unit:** {}", unit));
    }
    if let (Some(min), Some(max)) = (ind.min, ind.max) {
        lines.push(format!("**Range:** {}..{}", min, max));
    }
    if let Some(values) = &ind.enum_values {
        let values: Vec<String> = values
            .iter()
            .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
            .collect();
        lines.push(format!("**Values:** {}", values.join(", ")));
    }
    lines.push(format!("**Group:** {}", entry.group_path()));
    lines.push(format!("**For prompts:** {}", yes_no(ind.for_prompts)));
    lines.push(format!("**For qualification:** {}", yes_no(ind.for_qualification)));
    lines.push(format!("**Trainee model:** {}", yes_no(ind.trainee_model)));
    if let Some(description) = &ind.description {
        lines.push(format!("**Description:** {}", description));
    }

    if let Some(thresholds) = ind.thresholds.as_ref().filter(|t| !t.is_empty()) {
        lines.push(String::new());
        lines.push("## Thresholds".to_string());
        lines.push(String::new());
        for (stage, threshold) in thresholds {
            let mut parts = Vec::new();
            if let Some(value) = threshold.value.as_ref().filter(|v| !v.is_null()) {
                parts.push(format!("value {}", value));
            }
            if let Some(min) = threshold.min {
                parts.push(format!("min {}", min));
            }
            if let Some(max) = threshold.max {
                parts.push(format!("max {}", max));
            }
            if let Some(weeks) = threshold.period_weeks {
                parts.push(format!("over {} weeks", weeks));
            }
            let detail = if parts.is_empty() { "-".to_string() } else { parts.join(", ") };
            lines.push(format!("- {}: {}", stage, detail));
        }
    }

    lines.join("\n")
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
