// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTML to Markdown extraction
//!
//! Strips page chrome (scripts, navigation, ads, cookie banners, comment
//! threads), picks the main content element and converts it to Markdown.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

use super::types::ExtractedPage;

/// Converts a fetched HTML document into title + Markdown
pub trait MarkdownExtractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractedPage;
}

const NOISE_SELECTORS: &[&str] = &[
    "script",
    "style",
    "noscript",
    "template",
    "iframe",
    "nav",
    "footer",
    "header",
    "aside",
    "form",
    "button",
    "img",
    "picture",
    "svg",
    "figure",
    "video",
    "audio",
    "[id*='comment']",
    "[class*='comment']",
    "[id='ad']",
    "[id='ads']",
    "[id^='ad-']",
    "[class~='ad']",
    "[class~='ads']",
    "[class^='ad-']",
    "[class*=' ad-']",
    "[class$='-ad']",
    "[class*='-ad ']",
    "[id*='advert']",
    "[class*='advert']",
    "[id*='banner']",
    "[class*='banner']",
    "[id*='cookie']",
    "[class*='cookie']",
    "[id*='consent']",
    "[class*='consent']",
    "[aria-label*='cookie']",
    "[aria-label*='consent']",
    "[role='dialog']",
];

/// Main content candidates, most specific first
const MAIN_SELECTORS: &[&str] = &["article", "main", "[role='main']", "body"];

fn compile(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}

fn noise_selectors() -> &'static [Selector] {
    static NOISE: OnceLock<Vec<Selector>> = OnceLock::new();
    NOISE.get_or_init(|| compile(NOISE_SELECTORS))
}

fn main_selectors() -> &'static [Selector] {
    static MAIN: OnceLock<Vec<Selector>> = OnceLock::new();
    MAIN.get_or_init(|| compile(MAIN_SELECTORS))
}

fn title_selector() -> &'static Selector {
    static TITLE: OnceLock<Selector> = OnceLock::new();
    TITLE.get_or_init(|| Selector::parse("title").expect("title selector is valid"))
}

struct MarkdownPatterns {
    image: Regex,
    link: Regex,
    trailing_space: Regex,
    blank_lines: Regex,
}

fn patterns() -> &'static MarkdownPatterns {
    static PATTERNS: OnceLock<MarkdownPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| MarkdownPatterns {
        image: Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("image pattern is valid"),
        link: Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("link pattern is valid"),
        trailing_space: Regex::new(r"[ \t]+\n").expect("whitespace pattern is valid"),
        blank_lines: Regex::new(r"\n{3,}").expect("blank line pattern is valid"),
    })
}

/// Default extractor: scraper for the DOM, html2md for conversion
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMarkdownExtractor;

impl HtmlMarkdownExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl MarkdownExtractor for HtmlMarkdownExtractor {
    fn extract(&self, html: &str) -> ExtractedPage {
        let mut document = Html::parse_document(html);
        let title = extract_title(&document);

        strip_noise(&mut document);

        let main_html = main_selectors()
            .iter()
            .find_map(|sel| document.select(sel).next())
            .map(|element| element.html());

        let markdown = match main_html {
            Some(fragment) => clean_markdown(&html2md::parse_html(&fragment)),
            None => String::new(),
        };

        ExtractedPage { title, markdown }
    }
}

fn extract_title(document: &Html) -> String {
    document
        .select(title_selector())
        .next()
        .map(|t| t.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

fn strip_noise(document: &mut Html) {
    let noise: Vec<_> = noise_selectors()
        .iter()
        .flat_map(|sel| document.select(sel).map(|e| e.id()).collect::<Vec<_>>())
        .collect();

    for id in noise {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Drop images, unwrap links and tidy whitespace
pub fn clean_markdown(markdown: &str) -> String {
    let p = patterns();
    let text = p.image.replace_all(markdown, "");
    let text = p.link.replace_all(&text, "$1");
    normalize_markdown(&text)
}

/// CRLF to LF, no trailing spaces, at most one blank line in a row
pub fn normalize_markdown(text: &str) -> String {
    let p = patterns();
    let text = text.replace("\r\n", "\n");
    let text = p.trailing_space.replace_all(&text, "\n");
    let text = p.blank_lines.replace_all(&text, "\n\n");
    text.trim().to_string()
}
