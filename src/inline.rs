// Inline pseudo-markup: **bold**, {red}colored{/red}, [text](url).

use crate::model::{StyledRun, RED};
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

lazy_static! {
    static ref INLINE_RE: Regex =
        Regex::new(r"\*\*(.+?)\*\*|\{red\}(.+?)\{/red\}|\[(.+?)\]\((.+?)\)").unwrap();
}

/// A run together with the byte range of the source text it was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    pub range: Range<usize>,
    pub run: StyledRun,
}

/// Split `text` into adjacent spans covering it exactly once, in source order.
pub fn tokenize(text: &str) -> Vec<InlineSpan> {
    let mut out = Vec::new();
    let mut last = 0;

    for cap in INLINE_RE.captures_iter(text) {
        let Some(full) = cap.get(0) else { continue };
        if full.start() > last {
            out.push(InlineSpan {
                range: last..full.start(),
                run: StyledRun::plain(&text[last..full.start()]),
            });
        }

        let run = if let Some(bold) = cap.get(1) {
            StyledRun::bold(bold.as_str())
        } else if let Some(red) = cap.get(2) {
            StyledRun::colored(red.as_str(), RED)
        } else {
            // Alternatives are exclusive; the link groups are the only ones left.
            let label = cap.get(3).map_or("", |m| m.as_str());
            let url = cap.get(4).map_or("", |m| m.as_str());
            if url.trim().is_empty() {
                // No target to link to; keep the source text as written.
                StyledRun::plain(full.as_str())
            } else {
                StyledRun::link(label, url)
            }
        };
        out.push(InlineSpan {
            range: full.range(),
            run,
        });
        last = full.end();
    }

    if last < text.len() {
        out.push(InlineSpan {
            range: last..text.len(),
            run: StyledRun::plain(&text[last..]),
        });
    }
    out
}

pub fn format_inline(text: &str) -> Vec<StyledRun> {
    tokenize(text).into_iter().map(|s| s.run).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bold_then_plain_then_red() {
        let runs = format_inline("**bold** and {red}warn{/red}");
        assert_eq!(
            runs,
            vec![
                StyledRun::bold("bold"),
                StyledRun::plain(" and "),
                StyledRun::colored("warn", RED),
            ]
        );
    }

    #[test]
    fn link_carries_url() {
        let runs = format_inline("See [docs](http://x.test) now");
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].text, "docs");
        assert_eq!(runs[1].link.as_deref(), Some("http://x.test"));
        assert_eq!(runs[2].text, " now");
    }

    #[test]
    fn link_with_blank_url_stays_plain() {
        let runs = format_inline("see [a]( ) here");
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1], StyledRun::plain("[a]( )"));
        assert!(runs.iter().all(|r| !r.is_link()));
    }

    #[test]
    fn no_markers_is_one_plain_run() {
        assert_eq!(format_inline("just text"), vec![StyledRun::plain("just text")]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(format_inline("").is_empty());
    }

    #[test]
    fn markers_do_not_nest() {
        let runs = format_inline("**{red}x{/red}**");
        assert_eq!(runs, vec![StyledRun::bold("{red}x{/red}")]);
    }

    #[test]
    fn unterminated_marker_stays_plain() {
        assert_eq!(format_inline("**open"), vec![StyledRun::plain("**open")]);
        assert_eq!(format_inline("{red}open"), vec![StyledRun::plain("{red}open")]);
    }

    #[test]
    fn inner_match_is_non_greedy() {
        let runs = format_inline("**a** **b**");
        assert_eq!(
            runs,
            vec![
                StyledRun::bold("a"),
                StyledRun::plain(" "),
                StyledRun::bold("b"),
            ]
        );
    }

    #[test]
    fn earliest_marker_wins() {
        let runs = format_inline("[**x**](u)");
        assert_eq!(runs, vec![StyledRun::link("**x**", "u")]);
    }

    proptest! {
        #[test]
        fn spans_partition_the_input(text in r"(\*\*|\{red\}|\{/red\}|\[|\]|\(|\)|[a-z ]|é){0,40}") {
            let spans = tokenize(&text);
            let mut pos = 0;
            for span in &spans {
                prop_assert_eq!(span.range.start, pos);
                prop_assert!(span.range.end > span.range.start);
                pos = span.range.end;
            }
            prop_assert_eq!(pos, text.len());

            let rebuilt: String = spans.iter().map(|s| &text[s.range.clone()]).collect();
            prop_assert_eq!(rebuilt, text.clone());
        }

        #[test]
        fn plain_text_round_trips(text in "[a-zA-Z0-9 .,]{1,60}") {
            let runs = format_inline(&text);
            let joined: String = runs.iter().map(|r| r.text.as_str()).collect();
            prop_assert_eq!(joined, text);
        }
    }
}
