use markdown_typewriter_engine::parsing::raw_prefix_len;
use markdown_typewriter_engine::rendering::{MonospaceMeasurer, VisibilityPass};
use markdown_typewriter_engine::{BlockKind, Document, EngineOptions, Selection, import_markdown};
use pretty_assertions::assert_eq;
use rstest::rstest;

const MIXED: &str = "# Groceries\n\n- milk\n- eggs\n  - brown\n1. first\n1. second\n- [ ] soap\n- [x] bread\n\n> remember the list\n\n---\n\nplain text with **bold** words\n";

const TABLE: &str = "| fruit | count | note |\n| --- | --: | :-: |\n| apple | 3 | red |\n| watermelon | 12 | big |\n";

struct Harness {
    options: EngineOptions,
    measurer: MonospaceMeasurer,
}

impl Harness {
    fn new() -> Self {
        let options = EngineOptions::default();
        let measurer = MonospaceMeasurer::new(options.char_advance);
        Self { options, measurer }
    }

    fn pass(&self, read_only: bool) -> VisibilityPass<'_> {
        VisibilityPass {
            options: &self.options,
            measurer: &self.measurer,
            read_only,
        }
    }

    /// Import and run the load-time pass with the caret at the start.
    fn load(&self, md: &str) -> Document {
        let mut doc = import_markdown(md).document;
        self.pass(false).run(&mut doc, &mut Selection::caret(0));
        doc
    }
}

fn line_starts(doc: &Document) -> Vec<usize> {
    doc.lines().iter().map(|l| l.start).collect()
}

#[rstest]
#[case::mixed(MIXED)]
#[case::table(TABLE)]
fn a_second_pass_changes_nothing(#[case] md: &str) {
    let harness = Harness::new();
    for start in line_starts(&harness.load(md)) {
        let mut doc = harness.load(md);
        let mut selection = Selection::caret(start);
        harness.pass(false).run(&mut doc, &mut selection);

        let settled = (doc.clone(), selection.clone());
        let outcome = harness.pass(false).run(&mut doc, &mut selection);

        assert!(!outcome.changed, "second pass changed the caret-{start} document");
        assert_eq!((doc, selection), settled);
    }
}

#[test]
fn each_marked_line_shows_exactly_one_marker() {
    let harness = Harness::new();
    for start in line_starts(&harness.load(MIXED)) {
        let mut doc = harness.load(MIXED);
        let mut selection = Selection::caret(start);
        harness.pass(false).run(&mut doc, &mut selection);

        for line in doc.lines() {
            let Some(kind) = line.kind().filter(|k| k.is_marker_bearing()) else {
                continue;
            };
            let raw = raw_prefix_len(kind, &line.text).is_some();
            let active = selection.touches(line.start, line.end);
            if kind.heading_level().is_some() {
                assert!(!line.has_list_marker());
                assert_eq!(raw, active, "heading line {}", line.index);
            } else {
                assert!(
                    raw != line.has_list_marker(),
                    "line {} {:?} shows {:?}",
                    line.index,
                    kind,
                    line.text
                );
                assert_eq!(raw, active, "line {}", line.index);
            }
        }
    }
}

#[test]
fn moving_the_caret_keeps_it_on_the_same_character() {
    let harness = Harness::new();
    let loaded = harness.load(MIXED);
    let text: Vec<char> = loaded.text().chars().collect();

    for (offset, c) in text.iter().enumerate().filter(|(_, c)| c.is_alphabetic()) {
        let mut doc = loaded.clone();
        let mut selection = Selection::caret(offset);
        harness.pass(false).run(&mut doc, &mut selection);

        let caret = selection.caret_offset().expect("caret");
        let after = doc.text().chars().nth(caret);
        assert_eq!(after, Some(*c), "caret from {offset} landed on {caret}");
    }
}

#[test]
fn ordinals_restart_after_an_interrupting_paragraph() {
    let harness = Harness::new();
    let doc = harness.load("intro\n\n1. a\n1. b\n1. c\n\nbreak\n\n1. d\n1. e\n");
    let ordered: Vec<String> = doc
        .lines()
        .into_iter()
        .filter(|l| l.kind() == Some(BlockKind::OrderedList))
        .map(|l| l.text)
        .collect();
    assert_eq!(ordered, vec!["1.a", "2.b", "3.c", "1.d", "2.e"]);
}

#[test]
fn table_rows_share_increasing_tab_stops() {
    let harness = Harness::new();
    let doc = harness.load(TABLE);
    let lines = doc.lines();
    assert!(lines.iter().all(|l| l.kind() == Some(BlockKind::TableRow)));
    // Table text is never rewritten.
    assert_eq!(doc.text(), "fruit\tcount\tnote\napple\t3\tred\nwatermelon\t12\tbig");

    let stops: Vec<Vec<f32>> = lines
        .iter()
        .map(|line| {
            let pieces = doc.pieces(line.span());
            let (_, _, run) = pieces.first().expect("row has text");
            run.paragraph.tab_stops.iter().map(|s| s.location).collect()
        })
        .collect();
    assert_eq!(stops[0].len(), 2);
    assert!(stops[0].windows(2).all(|w| w[0] < w[1]));
    assert!(stops.iter().all(|s| *s == stops[0]));

    // "watermelon" is the widest first-column cell: 10 columns plus insets.
    let options = EngineOptions::default();
    let first_column = 10.0 * options.char_advance + 2.0 * options.table_cell_inset;
    assert!(stops[0][0] >= first_column);
}

#[test]
fn read_only_documents_show_raw_prefixes_everywhere() {
    let harness = Harness::new();
    let mut doc = harness.load(MIXED);
    let outcome = harness.pass(true).run(&mut doc, &mut Selection::caret(0));
    assert!(outcome.changed);

    for line in doc.lines() {
        assert!(!line.has_list_marker(), "line {} keeps a glyph", line.index);
        if let Some(kind) = line.kind().filter(|k| k.is_marker_bearing()) {
            assert!(
                raw_prefix_len(kind, &line.text).is_some(),
                "line {} {:?} lacks its prefix",
                line.index,
                line.text
            );
        }
    }
}
