//! Seven-column CSV exchange format for the work tree.
//!
//! `Chapter, Section, Subsection, Complexity, Editor Hours, Researcher Hours, Review Hours`
//!
//! A blank Section places the subsection directly under its chapter, which is
//! stored as a section named after the subsection. Rows whose Chapter cell
//! starts with `#` are instructions and never become data.

use super::PersistenceResult;
use crate::project::{Chapter, Complexity, Section, Subsection};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

pub const CSV_HEADER: [&str; 7] = [
    "Chapter",
    "Section",
    "Subsection",
    "Complexity",
    "Editor Hours",
    "Researcher Hours",
    "Review Hours",
];

const DEFAULT_EDITOR_HOURS: f64 = 4.0;
const DEFAULT_RESEARCHER_HOURS: f64 = 6.0;
const DEFAULT_REVIEW_HOURS: f64 = 2.0;

const TEMPLATE_NOTES: [&str; 4] = [
    "# Instructions: fill in your content structure below, then delete this row and the example rows.",
    "# Complexity: 1=Simple (definitions), 2=Moderate (standard content), 3=Complex (technical concepts)",
    "# Leave Section blank if a subsection belongs directly to the chapter",
    "# Example rows below, replace them with your content:",
];

const TEMPLATE_ROWS: [[&str; 7]; 7] = [
    ["Chapter 1: Introduction", "", "Overview of the Topic", "1", "2", "3", "1"],
    ["Chapter 1: Introduction", "", "Key Concepts", "2", "4", "6", "2"],
    ["Chapter 1: Introduction", "Historical Context", "Early Development", "2", "3", "5", "1"],
    ["Chapter 1: Introduction", "Historical Context", "Modern Evolution", "3", "5", "8", "2"],
    ["Chapter 2: Core Concepts", "", "Fundamental Principles", "2", "4", "6", "2"],
    ["Chapter 2: Core Concepts", "Technical Details", "Implementation", "3", "6", "10", "3"],
    ["Chapter 2: Core Concepts", "Technical Details", "Best Practices", "2", "4", "6", "2"],
];

struct TreeRow<'a> {
    chapter: &'a str,
    section: &'a str,
    subsection: &'a str,
    complexity: &'a str,
    editor_hours: &'a str,
    researcher_hours: &'a str,
    review_hours: &'a str,
}

impl<'a> TreeRow<'a> {
    fn from_record(record: &'a StringRecord) -> Self {
        let cell = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");
        Self {
            chapter: cell(0),
            section: cell(1),
            subsection: cell(2),
            complexity: cell(3),
            editor_hours: cell(4),
            researcher_hours: cell(5),
            review_hours: cell(6),
        }
    }

    fn is_blank(&self) -> bool {
        self.chapter.is_empty() && self.section.is_empty() && self.subsection.is_empty()
    }

    fn is_comment(&self) -> bool {
        self.chapter.starts_with('#')
    }

    fn to_subsection(&self) -> Subsection {
        Subsection::new(
            self.subsection,
            parse_complexity(self.complexity),
            parse_hours(self.editor_hours, DEFAULT_EDITOR_HOURS),
            parse_hours(self.researcher_hours, DEFAULT_RESEARCHER_HOURS),
            parse_hours(self.review_hours, DEFAULT_REVIEW_HOURS),
        )
    }
}

fn parse_complexity(input: &str) -> Complexity {
    input
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0)
        .and_then(|v| Complexity::from_tier(v as i64))
        .unwrap_or_default()
}

fn parse_hours(input: &str, fallback: f64) -> f64 {
    match input.parse::<f64>() {
        Ok(hours) if hours.is_finite() => hours.max(0.0),
        _ => fallback,
    }
}

fn section_index(chapter: &mut Chapter, name: &str) -> (usize, bool) {
    match chapter.sections.iter().position(|s| s.name == name) {
        Some(idx) => (idx, false),
        None => {
            chapter.sections.push(Section::new(name));
            (chapter.sections.len() - 1, true)
        }
    }
}

/// Builds a fresh work tree from CSV. The first row is always treated as a header.
pub fn import_chapters_from_csv<R: Read>(reader: R) -> PersistenceResult<Vec<Chapter>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut chapters: Vec<Chapter> = Vec::new();
    let mut current: Option<usize> = None;

    for record in csv_reader.records() {
        let record = record?;
        let row = TreeRow::from_record(&record);
        if row.is_blank() || row.is_comment() {
            continue;
        }

        if !row.chapter.is_empty() {
            let idx = match chapters.iter().position(|c| c.name == row.chapter) {
                Some(idx) => idx,
                None => {
                    chapters.push(Chapter::new(row.chapter));
                    chapters.len() - 1
                }
            };
            current = Some(idx);
        }

        let Some(chapter_idx) = current else {
            tracing::debug!(subsection = row.subsection, "row before any chapter ignored");
            continue;
        };
        if row.subsection.is_empty() {
            continue;
        }
        let chapter = &mut chapters[chapter_idx];

        if row.section.is_empty() {
            let (idx, created) = section_index(chapter, row.subsection);
            if created {
                chapter.sections[idx].subsections.push(row.to_subsection());
            }
        } else {
            let (idx, _) = section_index(chapter, row.section);
            let section = &mut chapter.sections[idx];
            if !section.subsections.iter().any(|s| s.name == row.subsection) {
                section.subsections.push(row.to_subsection());
            }
        }
    }

    tracing::debug!(chapters = chapters.len(), "imported work tree from csv");
    Ok(chapters)
}

/// Writes the tree in import order. Chapters without work get a chapter-only row.
pub fn export_chapters_to_csv<W: Write>(chapters: &[Chapter], writer: W) -> PersistenceResult<()> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    for chapter in chapters {
        let mut wrote_any = false;
        for section in &chapter.sections {
            let section_cell = if section.is_synthetic() {
                ""
            } else {
                section.name.as_str()
            };
            for sub in &section.subsections {
                csv_writer.write_record([
                    chapter.name.clone(),
                    section_cell.to_string(),
                    sub.name.clone(),
                    sub.complexity.to_string(),
                    sub.editor_hours.to_string(),
                    sub.researcher_hours.to_string(),
                    sub.review_hours.to_string(),
                ])?;
                wrote_any = true;
            }
        }
        if !wrote_any {
            csv_writer.write_record([chapter.name.as_str(), "", "", "", "", "", ""])?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_csv_template<W: Write>(writer: W) -> PersistenceResult<()> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    for note in TEMPLATE_NOTES {
        csv_writer.write_record([note, "", "", "", "", "", ""])?;
    }
    for row in TEMPLATE_ROWS {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn load_chapters_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Chapter>> {
    import_chapters_from_csv(File::open(path)?)
}

pub fn save_chapters_to_csv<P: AsRef<Path>>(chapters: &[Chapter], path: P) -> PersistenceResult<()> {
    export_chapters_to_csv(chapters, File::create(path)?)
}
