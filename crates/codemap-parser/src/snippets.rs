use crate::elements::AstNode;

/// Attaches literal source text to elements from their line ranges.
pub struct SnippetEnricher;

impl SnippetEnricher {
    /// Enrich every element (and its member copies) declared in `source`.
    /// Elements whose range falls outside the file are left untouched.
    /// Returns the number of elements that received text.
    pub fn enrich<'a, I>(elements: I, source: &str) -> usize
    where
        I: IntoIterator<Item = &'a mut AstNode>,
    {
        let lines: Vec<&str> = source.lines().collect();
        elements
            .into_iter()
            .map(|element| Self::enrich_one(element, &lines))
            .sum()
    }

    fn enrich_one(element: &mut AstNode, lines: &[&str]) -> usize {
        let mut enriched = 0;
        if let Some(text) = slice_lines(lines, element.start_line, element.end_line) {
            element.source_code = Some(text);
            enriched += 1;
        }
        for child in &mut element.children {
            enriched += Self::enrich_one(child, lines);
        }
        enriched
    }
}

fn slice_lines(lines: &[&str], start: usize, end: usize) -> Option<String> {
    if start == 0 || end == 0 || start > end || end > lines.len() {
        return None;
    }
    Some(lines[start - 1..end].join("\n"))
}
