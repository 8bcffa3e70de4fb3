use super::University;
use crate::{to_records, utils, LinkParams, RawRecord, ScrapeError, SourceAdapter};
use itertools::Itertools;
use lazy_regex::{regex_captures, regex_is_match};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;
use std::collections::HashSet;

const TERM_TAGS: [&str; 4] = ["Fall", "Spring", "Summer", "IAP"];
const INSTRUCTOR_PREFIXES: [&str; 4] = ["Fall:", "Spring:", "Summer:", "IAP:"];
const DESCRIPTION_RULE: &str = "______";

const E: &str = "Invalid selector";
lazy_static! {
    static ref H3: Selector = Selector::parse("h3").expect(E);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MitCourse {
    pub id: String,
    pub title: String,
    pub prerequisites: Option<String>,
    pub units: Option<String>,
    pub terms: Vec<String>,
    pub description: String,
    pub instructors: Vec<String>,
}

/// Subject listing pages: one `h3` per subject followed by a flat run of sibling nodes.
#[derive(Debug)]
pub struct MitAdapter;

#[async_trait::async_trait]
impl SourceAdapter for MitAdapter {
    fn university(&self) -> University {
        University::Mit
    }

    fn links(&self, params: &LinkParams) -> Vec<String> {
        let term = params.term.as_deref().map(str::to_ascii_lowercase);
        let prefix = match term.as_deref() {
            Some("spring") => "/archive/spring",
            Some("fall") => "/archive/fall",
            _ => "",
        };

        ["a", "b", "c", "d", "e"]
            .iter()
            .map(|page| format!("https://student.mit.edu/catalog{}/m6{}.html", prefix, page))
            .collect()
    }

    fn parse(&self, html: &str) -> Result<Vec<RawRecord>, ScrapeError> {
        to_records(University::Mit, extract(html))
    }
}

pub(crate) fn extract(html: &str) -> Vec<MitCourse> {
    let doc = Html::parse_document(html);
    doc.select(&H3).filter_map(extract_course).collect()
}

enum Piece<'a> {
    Text(&'a str),
    Element(ElementRef<'a>),
}

impl<'a> Piece<'a> {
    fn name(&self) -> Option<&str> {
        match self {
            Piece::Text(_) => None,
            Piece::Element(el) => Some(el.value().name()),
        }
    }

    fn text(&self) -> String {
        match self {
            Piece::Text(text) => text.trim().to_string(),
            Piece::Element(el) => utils::stripped_text(*el),
        }
    }

    /// Next subject heading, or the named anchor that opens the next subject.
    fn ends_subject(&self) -> bool {
        match self {
            Piece::Text(_) => false,
            Piece::Element(el) => match el.value().name() {
                "h3" => true,
                "a" => el
                    .value()
                    .attr("name")
                    .map_or(false, |name| regex_is_match!(r"^\d+\.", name)),
                _ => false,
            },
        }
    }
}

/// Siblings after the heading, flattened. Comments count as text.
fn following_siblings(heading: ElementRef) -> Vec<Piece> {
    heading
        .next_siblings()
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some(Piece::Text(&**text)),
            Node::Comment(comment) => Some(Piece::Text(&**comment)),
            Node::Element(_) => ElementRef::wrap(node).map(Piece::Element),
            _ => None,
        })
        .collect()
}

fn is_instructor_line(text: &str) -> bool {
    INSTRUCTOR_PREFIXES.iter().any(|p| text.starts_with(p))
}

fn is_description(text: &str) -> bool {
    !text.starts_with("Textbooks") && text != "end"
}

/// Joins `head` with the text of every following piece up to the next line break,
/// marking each absorbed piece as consumed. Whitespace-only pieces are dropped, so the
/// parts are always separated by exactly one space.
fn take_line(pieces: &[Piece], start: usize, head: &str, consumed: &mut HashSet<usize>) -> String {
    let mut parts = vec![head.trim().to_string()];
    for (i, piece) in pieces.iter().enumerate().skip(start + 1) {
        if matches!(piece.name(), Some("br") | Some("h3")) {
            break;
        }
        parts.push(piece.text());
        consumed.insert(i);
    }
    parts.iter().filter(|p| !p.is_empty()).join(" ")
}

fn extract_course(heading: ElementRef) -> Option<MitCourse> {
    let header = utils::joined_text(heading, " ");
    let (_, id, title) = regex_captures!(r"^([\w\.]+J?)\s+(.+)", &header)?;

    let pieces = following_siblings(heading);
    let mut consumed = HashSet::new();
    let mut description_started = false;
    let mut prerequisites = None;
    let mut units = None;
    let mut terms = vec![];
    let mut description = vec![];
    let mut instructors = vec![];

    for (i, piece) in pieces.iter().enumerate() {
        if piece.ends_subject() {
            break;
        }
        if consumed.contains(&i) {
            continue;
        }

        match piece {
            Piece::Text(raw) => {
                let text = raw.trim();
                if text.is_empty() {
                    continue;
                }

                if let Some(rest) = text.strip_prefix("Prereq:") {
                    prerequisites = Some(take_line(&pieces, i, rest, &mut consumed));
                } else if let Some(rest) = text.strip_prefix("Units:") {
                    units = Some(take_line(&pieces, i, rest, &mut consumed));
                } else if description_started {
                    if is_instructor_line(text) {
                        let mut line = text.to_string();
                        if let Some(Piece::Element(em)) = pieces.get(i + 1) {
                            if em.value().name() == "i" {
                                line.push(' ');
                                line.push_str(&utils::stripped_text(*em));
                                consumed.insert(i + 1);
                            }
                        }
                        instructors.push(line);
                    } else if is_description(text) {
                        description.push(text.to_string());
                    }
                }
            }
            Piece::Element(el) => match el.value().name() {
                "img" => {
                    let alt = el.value().attr("alt").unwrap_or_default();
                    if TERM_TAGS.contains(&alt) {
                        terms.push(alt.to_string());
                    } else if alt == DESCRIPTION_RULE {
                        description_started = true;
                    }
                }
                "br" | "h3" => {}
                "a" if description_started => {
                    let text = piece.text();
                    if !text.is_empty() && is_description(&text) {
                        description.push(text);
                    }
                }
                _ if description_started => {
                    let text = piece.text();
                    if !text.is_empty() && is_description(&text) && !is_instructor_line(&text) {
                        description.push(text);
                    }
                }
                _ => {}
            },
        }
    }

    Some(MitCourse {
        id: id.to_string(),
        title: title.to_string(),
        prerequisites,
        units,
        terms: terms.into_iter().unique().collect(),
        description: description.join(" ").trim().to_string(),
        instructors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_parsing_subject_listing() {
        let html = fs::read_to_string("tests/htmls/mit.html").expect("Invalid file url");
        let courses = extract(&html);
        assert_eq!(courses.len(), 3);

        let a = &courses[0];
        assert_eq!(a.id, "6.100A");
        assert_eq!(a.title, "Introduction to Computer Science Programming in Python");
        assert_eq!(a.prerequisites.as_deref(), Some("None"));
        assert_eq!(a.units.as_deref(), Some("2-0-4"));
        assert_eq!(a.terms, vec!["Fall".to_string(), "Spring".to_string()]);
        assert!(a.description.starts_with("Introduction to computer science"));
        assert!(a.description.ends_with("Final given in the seventh week of the term."));
        assert_eq!(
            a.instructors,
            vec!["Fall: A. Bell".to_string(), "Spring: A. Bell".to_string()]
        );

        let b = &courses[1];
        assert_eq!(b.id, "6.100B");
        assert_eq!(
            b.title,
            "Introduction to Computational Thinking and Data Science"
        );
        assert_eq!(
            b.prerequisites.as_deref(),
            Some("6.100A or permission of instructor")
        );
        assert_eq!(b.units.as_deref(), Some("2-0-4"));

        assert_eq!(courses[2].id, "6.100L");
    }

    #[test]
    fn units_run_collapses_and_is_not_description() {
        let html = r#"
            <h3>6.S01 Special Subject</h3>
            <img alt="Fall"> <img alt="IAP"> <img alt="Fall">
            <br><img alt="______">
            <br>Units: <i>arranged</i> <b>[P/D/F]</b>
            <br>First part.
            <br><b>Textbooks (Fall 2025)</b>
            <br>Second part.
            <br>Fall: <i>J. Doe</i>
            <!--end-->
        "#;

        let courses = extract(html);
        let expected = MitCourse {
            id: "6.S01".to_string(),
            title: "Special Subject".to_string(),
            prerequisites: None,
            units: Some("arranged [P/D/F]".to_string()),
            terms: vec!["Fall".to_string(), "IAP".to_string()],
            description: "First part. Second part.".to_string(),
            instructors: vec!["Fall: J. Doe".to_string()],
        };
        assert_eq!(courses, vec![expected]);
    }

    #[test]
    fn whitespace_pieces_do_not_widen_a_run() {
        let html = "<h3>6.1010 Fundamentals</h3>\
            Prereq: <i>6.100A</i>   <b> </b>   <i>6.1200</i><br>\
            Units:   4-0-8   <br>";

        let courses = extract(html);
        assert_eq!(courses[0].prerequisites.as_deref(), Some("6.100A 6.1200"));
        assert_eq!(courses[0].units.as_deref(), Some("4-0-8"));
    }

    #[test]
    fn heading_without_subject_number_is_skipped() {
        let html = "<h3>Programming</h3><br><img alt=\"______\">Some text";
        assert!(extract(html).is_empty());
    }

    #[test]
    fn term_selects_url_prefix() {
        let adapter = MitAdapter;
        let links = |term: Option<&str>| {
            adapter.links(&LinkParams {
                term: term.map(ToString::to_string),
                ..LinkParams::default()
            })
        };

        assert_eq!(
            links(Some("spring")),
            vec![
                "https://student.mit.edu/catalog/archive/spring/m6a.html",
                "https://student.mit.edu/catalog/archive/spring/m6b.html",
                "https://student.mit.edu/catalog/archive/spring/m6c.html",
                "https://student.mit.edu/catalog/archive/spring/m6d.html",
                "https://student.mit.edu/catalog/archive/spring/m6e.html",
            ]
        );
        assert_eq!(
            links(Some("Fall"))[4],
            "https://student.mit.edu/catalog/archive/fall/m6e.html"
        );
        assert_eq!(links(None)[0], "https://student.mit.edu/catalog/m6a.html");
        assert_eq!(links(Some("winter")), links(None));
        for term in [None, Some("spring"), Some("fall")] {
            assert_eq!(links(term).len(), 5);
        }
    }
}
