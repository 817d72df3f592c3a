//! Tag stream parser: raw markup text into a tree of text runs and tag frames.

use crate::items::{push_text, Item, TagFrame};
use crate::lexer::{line_col, tokenize, TildeRun, Token};
use logipard_types::DiagnosticCollector;

struct OpenFrame {
    opener: String,
    items: Vec<Item>,
    offset: usize,
}

impl OpenFrame {
    fn is_emitting(&self) -> bool {
        !self.opener.starts_with("<#-") && !self.opener.starts_with("<-#")
    }

    fn into_frame(self) -> TagFrame {
        // emitting openers always start with "<#"
        TagFrame::new(&self.opener[2..], self.items)
    }
}

/// Parse raw markup into an item tree
///
/// Unmatched `#>` closers are reported and ignored. Openers left unclosed at
/// end of input are closed automatically, each reported with its position.
/// Frames of non-emitting openers (`<-#` / `<#-`) are parsed and dropped.
pub fn parse_markup(source: &str, source_file: &str, diagnostics: &mut DiagnosticCollector) -> Vec<Item> {
    let mut root: Vec<Item> = Vec::new();
    let mut stack: Vec<OpenFrame> = Vec::new();

    for spanned in tokenize(source) {
        match spanned.token {
            Token::Open(opener) => stack.push(OpenFrame {
                opener,
                items: Vec::new(),
                offset: spanned.offset,
            }),
            Token::Close => match stack.pop() {
                Some(frame) => close_frame(frame, &mut stack, &mut root),
                None => {
                    let (line, column) = line_col(source, spanned.offset + 2);
                    diagnostics.warning(
                        source_file,
                        "markup.unmatched-closer",
                        format!("unmatched #> at {}:{}", line, column),
                    );
                }
            },
            Token::Tilde(TildeRun::Opener) => stack.push(OpenFrame {
                opener: "<#".to_string(),
                items: vec![Item::Text("~".to_string())],
                offset: spanned.offset,
            }),
            Token::Text(text) | Token::Stray(text) | Token::Tilde(TildeRun::Verbatim(text)) => {
                let items = stack.last_mut().map(|f| &mut f.items).unwrap_or(&mut root);
                push_text(items, &text);
            }
        }
    }

    if !stack.is_empty() {
        diagnostics.warning(
            source_file,
            "markup.unclosed-tags",
            format!("{} unclosed <#... tags - closing automatically", stack.len()),
        );
        while let Some(frame) = stack.pop() {
            let (line, column) = line_col(source, frame.offset + frame.opener.len());
            diagnostics.warning(
                source_file,
                "markup.unclosed-tag",
                format!("unclosed <# tag at {}:{}", line, column),
            );
            close_frame(frame, &mut stack, &mut root);
        }
    }

    root
}

fn close_frame(frame: OpenFrame, stack: &mut [OpenFrame], root: &mut Vec<Item>) {
    if !frame.is_emitting() {
        return;
    }
    let parent = stack.last_mut().map(|f| &mut f.items).unwrap_or(root);
    parent.push(Item::Tag(frame.into_frame()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> (Vec<Item>, DiagnosticCollector) {
        let mut diagnostics = DiagnosticCollector::new();
        let items = parse_markup(source, "test.lpinput", &mut diagnostics);
        (items, diagnostics)
    }

    #[test]
    fn test_plain_text() {
        let (items, diags) = parse("just text");
        assert_eq!(items, vec![Item::Text("just text".into())]);
        assert!(diags.diagnostics().is_empty());
    }

    #[test]
    fn test_nested_frames() {
        let (items, _) = parse("a<#LP x: b<#REF y#>c#>d");
        assert_eq!(items.len(), 3);
        let lp = items[1].as_tag().unwrap();
        assert_eq!(lp.tag, "LP");
        assert_eq!(lp.items.len(), 3);
        assert_eq!(lp.items[1].as_tag().unwrap().tag, "REF");
    }

    #[test]
    fn test_non_emitting_frame_dropped_and_text_coalesced() {
        let (items, _) = parse("a <-#LP hidden <#LP nested#>#> b<#-x#> c");
        assert_eq!(items, vec![Item::Text("a  b c".into())]);
    }

    #[test]
    fn test_unmatched_closer_ignored() {
        let (items, diags) = parse("a\n #> b");
        assert_eq!(items, vec![Item::Text("a\n  b".into())]);
        assert_eq!(diags.diagnostics().len(), 1);
        assert!(diags.diagnostics()[0].message.contains("2:4"));
    }

    #[test]
    fn test_unclosed_opener_autoclosed() {
        let (items, diags) = parse("x\n<#LP a: <#b");
        assert_eq!(items.len(), 2);
        let lp = items[1].as_tag().unwrap();
        assert_eq!(lp.tag, "LP");
        assert_eq!(lp.items[1].as_tag().unwrap().tag, "b");
        assert!(diags.has_code("markup.unclosed-tags"));
        assert_eq!(
            diags
                .diagnostics()
                .iter()
                .filter(|d| d.code == "markup.unclosed-tag")
                .count(),
            2
        );
    }

    #[test]
    fn test_verbatim_merges_with_text() {
        let (items, _) = parse("<#LP a: x <#~~<#y#>~~#> z#>");
        let lp = items[0].as_tag().unwrap();
        assert_eq!(lp.items, vec![Item::Text(" a: x <#y#> z".into())]);
    }

    #[test]
    fn test_tilde_opener_without_delimiter() {
        let (items, diags) = parse("a<#~abc#>b");
        assert_eq!(
            items,
            vec![
                Item::Text("a".into()),
                Item::Tag(TagFrame::new("", vec![Item::Text("~abc".into())])),
                Item::Text("b".into()),
            ]
        );
        assert!(diags.diagnostics().is_empty());
    }

    #[test]
    fn test_untagged_frame() {
        let (items, _) = parse("<# a: b#>");
        assert_eq!(items[0].as_tag().unwrap().tag, "");
    }
}
