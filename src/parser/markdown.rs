use crate::parser::model::{PostFrontMatter, PostMeta};
use crate::parser::FrontMatterError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use gray_matter::{engine::YAML, Matter};
use pulldown_cmark::{html, CodeBlockKind, Event, Options as CmarkOptions, Parser, Tag, TagEnd};

// fence languages the highlighter doesn't know, mapped to ones it does
const LANGUAGE_ALIASES: &[(&str, &str)] = &[("svelte", "html")];

// extracts YAML frontmatter and returns the typed metadata alongside the raw markdown body
pub fn extract_frontmatter(
    md_content: &str,
    filename: &str,
) -> Result<(PostFrontMatter, String), FrontMatterError> {
    let matter = Matter::<YAML>::new();

    let parsed_matter = matter
        .parse::<PostFrontMatter>(md_content)
        .map_err(|e| FrontMatterError::Malformed {
            filename: filename.to_string(),
            message: e.to_string(),
        })?;

    let frontmatter = parsed_matter.data.unwrap_or_default();

    Ok((frontmatter, parsed_matter.content))
}

/// Checks the allow-listed fields and resolves them into [`PostMeta`].
///
/// Every problem in the block is reported at once so a writer can fix the file in one go.
pub fn validate_frontmatter(
    frontmatter: PostFrontMatter,
    filename: &str,
) -> Result<PostMeta, FrontMatterError> {
    let mut issues = Vec::new();

    let title = non_empty(frontmatter.title);
    if title.is_none() {
        issues.push("title: Required".to_string());
    }

    let description = non_empty(frontmatter.description);
    if description.is_none() {
        issues.push("description: Required".to_string());
    }

    let date = match frontmatter.date.as_deref() {
        None => {
            issues.push("date: Required".to_string());
            None
        }
        Some(raw) => {
            let parsed = parse_iso_date(raw);
            if parsed.is_none() {
                issues.push(format!("date: Must be a valid ISO date, got '{}'", raw));
            }
            parsed
        }
    };

    let updated = match frontmatter.updated.as_deref() {
        None => None,
        Some(raw) => {
            let parsed = parse_iso_date(raw);
            if parsed.is_none() {
                issues.push(format!("updated: Must be a valid ISO date, got '{}'", raw));
            }
            parsed
        }
    };

    let image = non_empty(frontmatter.image);
    if let Some(raw) = image.as_deref() {
        if !is_absolute_url(raw) {
            issues.push(format!("image: Invalid URL '{}'", raw));
        }
    }

    match (title, description, date) {
        (Some(title), Some(description), Some(date)) if issues.is_empty() => Ok(PostMeta {
            title,
            description,
            date,
            updated,
            image,
            link: non_empty(frontmatter.link),
            tags: frontmatter.tags.unwrap_or_default(),
            full: frontmatter.full.unwrap_or(false),
        }),
        _ => Err(FrontMatterError::Invalid {
            filename: filename.to_string(),
            issues,
        }),
    }
}

/// Extracts and validates in one step, returning the metadata and the markdown body.
pub fn parse_post(md_content: &str, filename: &str) -> Result<(PostMeta, String), FrontMatterError> {
    let (frontmatter, body) = extract_frontmatter(md_content, filename)?;
    let meta = validate_frontmatter(frontmatter, filename)?;
    Ok((meta, body))
}

// accepts RFC 3339, a naive timestamp (read as UTC) or a bare YYYY-MM-DD date
pub fn parse_iso_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn is_absolute_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// compiles markdown content into HTML with heading anchors and normalised fence languages
pub fn compile_markdown_to_html(markdown_content: &str) -> String {
    let mut options = CmarkOptions::empty();
    options.insert(CmarkOptions::ENABLE_STRIKETHROUGH);
    options.insert(CmarkOptions::ENABLE_TABLES);

    let mut events: Vec<Event> = Parser::new_ext(markdown_content, options)
        .map(|event| match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                let lang = rewrite_language(&lang)
                    .map(|alias| alias.into())
                    .unwrap_or(lang);
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang)))
            }
            other => other,
        })
        .collect();

    // headings need their text before the opening tag is emitted, so patch them in a second pass
    for start in 0..events.len() {
        let needs_id = matches!(&events[start], Event::Start(Tag::Heading { id: None, .. }));
        if !needs_id {
            continue;
        }

        let text: Vec<&str> = events[start + 1..]
            .iter()
            .take_while(|e| !matches!(e, Event::End(TagEnd::Heading(_))))
            .filter_map(|e| match e {
                Event::Text(t) | Event::Code(t) => Some(t.as_ref()),
                _ => None,
            })
            .collect();
        let anchor = heading_anchor(&text.join(" "));

        if let Event::Start(Tag::Heading { id, .. }) = &mut events[start] {
            *id = Some(anchor.into());
        }
    }

    let mut html_content = String::new();
    html::push_html(&mut html_content, events.into_iter());
    html_content
}

pub fn rewrite_language(lang: &str) -> Option<&'static str> {
    LANGUAGE_ALIASES
        .iter()
        .find(|(from, _)| lang.eq_ignore_ascii_case(from))
        .map(|(_, to)| *to)
}

// runs of anything outside [a-z0-9] collapse into a single dash
pub fn heading_anchor(text: &str) -> String {
    let mut anchor = String::with_capacity(text.len());
    let mut in_gap = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            anchor.push(c.to_ascii_lowercase());
            in_gap = false;
        } else if !in_gap {
            anchor.push('-');
            in_gap = true;
        }
    }
    anchor
}
