use std::collections::HashMap;
use std::fmt::Write;

use thiserror::Error;

/// A run of code text taken verbatim from the document
///
/// `indent` is added in front of every line when the node is rendered or tokenized. When
/// `needs_strip` is set, every line still carries the block indent (one tab or four spaces) of
/// the Markdown paragraph it came from, which has to be dropped first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeNode<'a> {
    pub text: &'a str,
    pub line_no: usize,
    pub indent: usize,
    pub needs_strip: bool,
}

/// A top-level code section with all references to other sections resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub name: &'a str,
    pub code: Vec<CodeNode<'a>>,
}

impl<'a> Section<'a> {
    pub fn find<'s>(sections: &'s [Section<'a>], name: &str) -> Option<&'s Section<'a>> {
        sections.iter().find(|section| section.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SectionError {
    #[error("line {line}: section \"{name}\" is referenced {count} times")]
    MultipleReferences {
        name: String,
        count: usize,
        line: usize,
    },
    #[error("line {line}: section \"{name}\" is referenced but never defined")]
    Undefined { name: String, line: usize },
    #[error("line {line}: section \"{name}\" includes itself")]
    Cycle { name: String, line: usize },
    #[error("line {line}: section \"{name}\" is not reachable from any top-level section")]
    Unreachable { name: String, line: usize },
    #[error("line {line}: code fence is never closed")]
    UnterminatedFence { line: usize },
}

impl SectionError {
    pub fn line(&self) -> usize {
        match self {
            SectionError::MultipleReferences { line, .. }
            | SectionError::Undefined { line, .. }
            | SectionError::Cycle { line, .. }
            | SectionError::Unreachable { line, .. }
            | SectionError::UnterminatedFence { line } => *line,
        }
    }
}

/// Extract all top-level code sections from a literate document
///
/// Sections that are never referenced by another section are returned in the order in which
/// they were first mentioned. Problems with the section structure are passed to `report`;
/// extraction always runs to completion.
pub fn extract<'a, F>(text: &'a str, report: F) -> Vec<Section<'a>>
where
    F: FnMut(SectionError),
{
    let mut extractor = Extractor {
        text,
        sections: Vec::new(),
        by_name: HashMap::new(),
        report,
    };
    extractor.scan();
    extractor.finish()
}

/// Render linearized code, applying indents and dropping block indents
pub fn code_text(code: &[CodeNode]) -> String {
    let mut out = String::new();
    for node in code {
        render_node(&mut out, node);
    }
    out
}

/// Like `code_text`, but marks every jump in origin lines with a `// path:line` comment
pub fn code_text_with_lines(code: &[CodeNode], path: &str) -> String {
    let mut out = String::new();
    let mut expected = None;
    for node in code {
        if expected != Some(node.line_no) {
            // Writing into a String cannot fail
            let _ = writeln!(out, "// {}:{}", path, node.line_no);
        }
        render_node(&mut out, node);
        expected = Some(node.line_no + node.text.matches('\n').count());
    }
    out
}

fn render_node(out: &mut String, node: &CodeNode) {
    for line in node.text.split_inclusive('\n') {
        let line = if node.needs_strip {
            strip_block_indent(line)
        } else {
            line
        };
        if line.trim().is_empty() {
            if line.ends_with('\n') {
                out.push('\n');
            }
            continue;
        }
        for _ in 0..node.indent {
            out.push(' ');
        }
        out.push_str(line);
    }
}

/// Width of the block indent that marks a Markdown code paragraph
pub(crate) fn block_indent(line: &str) -> usize {
    if line.starts_with('\t') {
        1
    } else if line.starts_with("    ") {
        4
    } else {
        0
    }
}

pub(crate) fn strip_block_indent(line: &str) -> &str {
    &line[block_indent(line)..]
}

/// Visual width of leading whitespace, with tab stops every 8 columns
pub(crate) fn visual_width(ws: &str) -> usize {
    ws.chars().fold(0, |col, c| match c {
        '\t' => (col / 8 + 1) * 8,
        _ => col + 1,
    })
}

struct Line<'a> {
    start: usize,
    end: usize,
    text: &'a str,
    no: usize,
}

fn collect_lines(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        let end = start + raw.len();
        lines.push(Line {
            start,
            end,
            text: raw.trim_end_matches('\n').trim_end_matches('\r'),
            no: idx + 1,
        });
        start = end;
    }
    lines
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Returns the fence string (e.g. "```") if the line opens or closes a fenced block
fn fence_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    for fence_char in &['`', '~'] {
        let run = trimmed.len() - trimmed.trim_start_matches(*fence_char).len();
        if run >= 3 {
            return Some(&trimmed[..run]);
        }
    }
    None
}

struct Child {
    section: usize,
    indent: usize,
    line: usize,
}

struct RawNode<'a> {
    node: CodeNode<'a>,
    child: Option<Child>,
}

struct SectionRecord<'a> {
    name: &'a str,
    nodes: Vec<RawNode<'a>>,
    refs: usize,
    first_ref: usize,
    first_line: usize,
}

struct Extractor<'a, F> {
    text: &'a str,
    sections: Vec<SectionRecord<'a>>,
    by_name: HashMap<&'a str, usize>,
    report: F,
}

impl<'a, F> Extractor<'a, F>
where
    F: FnMut(SectionError),
{
    fn section(&mut self, name: &'a str, line: usize) -> usize {
        if let Some(idx) = self.by_name.get(name) {
            return *idx;
        }
        self.sections.push(SectionRecord {
            name,
            nodes: Vec::new(),
            refs: 0,
            first_ref: 0,
            first_line: line,
        });
        let idx = self.sections.len() - 1;
        self.by_name.insert(name, idx);
        idx
    }

    fn current_or_unnamed(&mut self, current: &mut Option<usize>, line: usize) -> usize {
        match current {
            Some(idx) => *idx,
            None => {
                let idx = self.section("", line);
                *current = Some(idx);
                idx
            }
        }
    }

    fn scan(&mut self) {
        let text = self.text;
        let lines = collect_lines(text);
        let mut current: Option<usize> = None;
        let mut prev_blank = true;
        let mut i = 0;

        while i < lines.len() {
            let line = &lines[i];
            if is_blank(line.text) {
                prev_blank = true;
                i += 1;
                continue;
            }
            if let Some(fence) = fence_marker(line.text) {
                let section = self.current_or_unnamed(&mut current, line.no);
                i = self.fenced_block(&lines, i, fence, section);
                prev_blank = true;
                continue;
            }
            if line.text.starts_with('#') {
                let name = line.text.trim_start_matches('#').trim();
                current = Some(self.section(name, line.no));
                prev_blank = true;
                i += 1;
                continue;
            }
            if prev_blank && block_indent(line.text) > 0 {
                let section = self.current_or_unnamed(&mut current, line.no);
                i = self.indented_block(&lines, i, section);
                prev_blank = false;
                continue;
            }
            prev_blank = false;
            i += 1;
        }
    }

    fn fenced_block(&mut self, lines: &[Line<'a>], open: usize, fence: &str, section: usize) -> usize {
        let mut close = open + 1;
        while close < lines.len() {
            if let Some(other) = fence_marker(lines[close].text) {
                if other.starts_with(fence) {
                    break;
                }
            }
            close += 1;
        }
        if close == lines.len() {
            (self.report)(SectionError::UnterminatedFence {
                line: lines[open].no,
            });
        }
        self.add_code(section, &lines[open + 1..close], false);
        close + 1
    }

    fn indented_block(&mut self, lines: &[Line<'a>], first: usize, section: usize) -> usize {
        let mut last_code = first;
        let mut j = first;
        while j < lines.len() {
            if is_blank(lines[j].text) {
                j += 1;
                continue;
            }
            if block_indent(lines[j].text) == 0 {
                break;
            }
            last_code = j;
            j += 1;
        }
        self.add_code(section, &lines[first..=last_code], true);
        last_code + 1
    }

    fn add_code(&mut self, section: usize, lines: &[Line<'a>], strip: bool) {
        let text = self.text;
        let mut start: Option<(usize, usize)> = None;

        for line in lines {
            let content = if strip {
                strip_block_indent(line.text)
            } else {
                line.text
            };
            let trimmed = content.trim_start();
            if !trimmed.starts_with("##") {
                if start.is_none() {
                    start = Some((line.start, line.no));
                }
                continue;
            }

            let name = trimmed.trim_start_matches('#').trim();
            let indent = visual_width(&content[..content.len() - trimmed.len()]);
            let child = self.section(name, line.no);
            let record = &mut self.sections[child];
            record.refs += 1;
            if record.first_ref == 0 {
                record.first_ref = line.no;
            }

            let (node_text, line_no) = match start.take() {
                Some((offset, no)) => (&text[offset..line.start], no),
                None => ("", line.no),
            };
            self.sections[section].nodes.push(RawNode {
                node: CodeNode {
                    text: node_text,
                    line_no,
                    indent: 0,
                    needs_strip: strip,
                },
                child: Some(Child {
                    section: child,
                    indent,
                    line: line.no,
                }),
            });
        }

        if let (Some((offset, no)), Some(last)) = (start, lines.last()) {
            self.sections[section].nodes.push(RawNode {
                node: CodeNode {
                    text: &text[offset..last.end],
                    line_no: no,
                    indent: 0,
                    needs_strip: strip,
                },
                child: None,
            });
        }
    }

    fn finish(mut self) -> Vec<Section<'a>> {
        for record in self.sections.iter() {
            if record.refs > 1 {
                (self.report)(SectionError::MultipleReferences {
                    name: record.name.to_owned(),
                    count: record.refs,
                    line: record.first_ref,
                });
            }
            if record.refs > 0 && record.nodes.is_empty() {
                (self.report)(SectionError::Undefined {
                    name: record.name.to_owned(),
                    line: record.first_ref,
                });
            }
        }

        let mut reached = vec![false; self.sections.len()];
        let mut roots = Vec::new();
        for idx in 0..self.sections.len() {
            let record = &self.sections[idx];
            if record.refs > 0 || record.nodes.is_empty() {
                continue;
            }
            let mut code = Vec::new();
            let mut path = Vec::new();
            linearize(
                &self.sections,
                idx,
                0,
                &mut path,
                &mut reached,
                &mut code,
                &mut self.report,
            );
            roots.push(Section {
                name: record.name,
                code,
            });
        }

        for (idx, record) in self.sections.iter().enumerate() {
            if record.refs > 0 && !record.nodes.is_empty() && !reached[idx] {
                (self.report)(SectionError::Unreachable {
                    name: record.name.to_owned(),
                    line: record.first_line,
                });
            }
        }

        log::debug!(
            "extracted {} top-level sections out of {}",
            roots.len(),
            self.sections.len()
        );
        roots
    }
}

fn linearize<'a, F>(
    sections: &[SectionRecord<'a>],
    idx: usize,
    indent: usize,
    path: &mut Vec<usize>,
    reached: &mut [bool],
    out: &mut Vec<CodeNode<'a>>,
    report: &mut F,
) where
    F: FnMut(SectionError),
{
    reached[idx] = true;
    path.push(idx);
    for raw in sections[idx].nodes.iter() {
        if !raw.node.text.is_empty() {
            out.push(CodeNode {
                indent: raw.node.indent + indent,
                ..raw.node
            });
        }
        if let Some(child) = &raw.child {
            if path.contains(&child.section) {
                report(SectionError::Cycle {
                    name: sections[child.section].name.to_owned(),
                    line: child.line,
                });
                continue;
            }
            linearize(
                sections,
                child.section,
                indent + child.indent,
                path,
                reached,
                out,
                report,
            );
        }
    }
    path.pop();
}

#[cfg(test)]
mod test {
    use super::*;
    use matches::assert_matches;

    fn extract_ok(text: &str) -> Vec<Section> {
        let mut errors = Vec::new();
        let sections = extract(text, |err| errors.push(err));
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        sections
    }

    #[test]
    fn test_indented_reference_is_spliced() {
        let doc = "# main\n\n    fn x() {\n        ## helper\n    }\n\n# helper\n\n    let y = 1;\n";
        let sections = extract_ok(doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "main");
        assert_eq!(
            code_text(&sections[0].code),
            "fn x() {\n    let y = 1;\n}\n"
        );
    }

    #[test]
    fn test_fenced_block() {
        let doc = "# a\n\nSome prose.\n\n```\nx = 1\n  y\n```\n";
        let sections = extract_ok(doc);
        assert_eq!(sections.len(), 1);
        assert!(!sections[0].code[0].needs_strip);
        assert_eq!(sections[0].code[0].line_no, 6);
        assert_eq!(code_text(&sections[0].code), "x = 1\n  y\n");
    }

    #[test]
    fn test_lazy_continuation_is_prose() {
        let doc = "# a\nSome text\n    still prose\n";
        assert!(extract_ok(doc).is_empty());
    }

    #[test]
    fn test_blank_lines_inside_block_are_kept() {
        let doc = "# a\n\n    one\n\n    two\n\nprose\n";
        let sections = extract_ok(doc);
        assert_eq!(code_text(&sections[0].code), "one\n\ntwo\n");
    }

    #[test]
    fn test_code_before_header_is_unnamed() {
        let doc = "    top\n\n# b\n\n    bottom\n";
        let sections = extract_ok(doc);
        let names: Vec<_> = sections.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["", "b"]);
    }

    #[test]
    fn test_roots_are_unreferenced_sections() {
        let doc = "# a\n\n    ## b\n    ## c\n\n# b\n\n    b\n\n# c\n\n    c\n\n# d\n\n    d\n";
        let sections = extract_ok(doc);
        let names: Vec<_> = sections.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a", "d"]);
        assert_eq!(code_text(&Section::find(&sections, "a").unwrap().code), "b\nc\n");
    }

    #[test]
    fn test_structural_errors_are_reported() {
        let doc = "# a\n\n    ## b\n    ## b\n    ## missing\n\n# b\n\n    b\n";
        let mut errors = Vec::new();
        let sections = extract(doc, |err| errors.push(err));
        assert_eq!(sections.len(), 1);
        assert_eq!(errors.len(), 2);
        assert_matches!(
            &errors[0],
            SectionError::MultipleReferences { count: 2, line: 3, .. }
        );
        assert_matches!(&errors[1], SectionError::Undefined { line: 5, .. });
        assert_eq!(code_text(&sections[0].code), "b\nb\n");
    }

    #[test]
    fn test_cycles_are_unreachable() {
        let doc = "# a\n\n    ## b\n\n# b\n\n    ## a\n";
        let mut errors = Vec::new();
        let sections = extract(doc, |err| errors.push(err));
        assert!(sections.is_empty());
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|err| matches!(err, SectionError::Unreachable { .. })));
    }

    #[test]
    fn test_unterminated_fence() {
        let doc = "# a\n\n~~~\nx\n";
        let mut errors = Vec::new();
        let sections = extract(doc, |err| errors.push(err));
        assert_eq!(errors, vec![SectionError::UnterminatedFence { line: 3 }]);
        assert_eq!(code_text(&sections[0].code), "x\n");
    }

    #[test]
    fn test_origin_lines_are_monotonic_within_a_block() {
        let doc = "# a\n\n    1\n    ## b\n    3\n    4\n\n# b\n\n    x\n    y\n";
        let sections = extract_ok(doc);
        let lines: Vec<_> = sections[0].code.iter().map(|n| n.line_no).collect();
        assert_eq!(lines, vec![3, 10, 5]);
        let annotated = code_text_with_lines(&sections[0].code, "doc.md");
        assert_eq!(
            annotated,
            "// doc.md:3\n1\n// doc.md:10\nx\ny\n// doc.md:5\n3\n4\n"
        );
    }
}
