use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::AppError;

/// Source formats the indexer knows how to flatten into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Docx,
    Pdf,
    PlainText,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            "txt" | "md" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// Read a source document and return its flat text stream (not yet normalized).
pub fn extract_text(path: &Path) -> Result<String, AppError> {
    let format = SourceFormat::from_path(path).ok_or_else(|| {
        AppError::new("PKB_INGEST_UNSUPPORTED", "Unsupported source document format")
            .with_details(format!("path={}", path.display()))
    })?;

    let bytes = fs::read(path).map_err(|e| {
        AppError::new("PKB_INGEST_READ_FAILED", "Failed to read source document")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;

    match format {
        SourceFormat::Docx => extract_docx(&bytes).map_err(|e| {
            let inner = e.details.clone().unwrap_or_default();
            e.with_details(format!("path={}; err={}", path.display(), inner))
        }),
        SourceFormat::Pdf => pdf_extract::extract_text_from_mem(&bytes)
            .map(|t| t.replace('\u{000C}', "\n"))
            .map_err(|e| {
                AppError::new("PKB_INGEST_READ_FAILED", "Failed to extract text from PDF")
                    .with_details(format!("path={}; err={}", path.display(), e))
            }),
        SourceFormat::PlainText => String::from_utf8(bytes).map_err(|e| {
            AppError::new("PKB_INGEST_READ_FAILED", "Text document is not valid UTF-8")
                .with_details(format!("path={}; err={}", path.display(), e))
        }),
    }
}

/// Flatten a `.docx` container: body paragraphs first, then every table row as `a | b | c`.
pub fn extract_docx(bytes: &[u8]) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        AppError::new("PKB_INGEST_READ_FAILED", "Document is not a valid .docx container")
            .with_details(e.to_string())
    })?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| {
            AppError::new("PKB_INGEST_READ_FAILED", "Document is missing word/document.xml")
                .with_details(e.to_string())
        })?
        .read_to_string(&mut xml)
        .map_err(|e| {
            AppError::new("PKB_INGEST_READ_FAILED", "Failed to read word/document.xml")
                .with_details(e.to_string())
        })?;
    docx_xml_to_text(&xml)
}

/// Flatten WordprocessingML body text.
///
/// Paragraphs outside tables are emitted first, one per line; table rows follow as
/// `cell | cell`. Only the `mc:Choice` branch of `mc:AlternateContent` is read so text boxes are
/// not duplicated by their fallback rendering.
pub fn docx_xml_to_text(xml: &str) -> Result<String, AppError> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut rows: Vec<String> = Vec::new();

    let mut table_depth = 0usize;
    let mut fallback_depth = 0usize;
    let mut in_text = false;
    let mut para = String::new();
    let mut cell = String::new();
    let mut cells: Vec<String> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            AppError::new("PKB_INGEST_READ_FAILED", "word/document.xml is not well-formed XML")
                .with_details(format!("pos={}; err={}", reader.buffer_position(), e))
        })?;

        if fallback_depth > 0 {
            match &event {
                Event::Start(e) if e.name().as_ref() == b"mc:Fallback" => fallback_depth += 1,
                Event::End(e) if e.name().as_ref() == b"mc:Fallback" => fallback_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:tbl" => table_depth += 1,
                b"mc:Fallback" => fallback_depth = 1,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => para.push('\t'),
                b"w:br" | b"w:cr" => para.push('\n'),
                b"w:p" => end_paragraph(&mut para, table_depth, &mut paragraphs, &mut cell),
                _ => {}
            },
            Event::Text(t) if in_text => {
                // Entities Word never writes (e.g. `&nbsp;`) are kept verbatim.
                match t.unescape() {
                    Ok(s) => para.push_str(&s),
                    Err(_) => para.push_str(&String::from_utf8_lossy(&t)),
                }
            }
            Event::CData(c) if in_text => para.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => end_paragraph(&mut para, table_depth, &mut paragraphs, &mut cell),
                b"w:tc" if table_depth == 1 => {
                    cells.push(cell.trim().to_string());
                    cell.clear();
                }
                b"w:tr" if table_depth == 1 => {
                    let kept: Vec<&str> = cells
                        .iter()
                        .map(|c| c.as_str())
                        .filter(|c| !c.is_empty())
                        .collect();
                    if !kept.is_empty() {
                        rows.push(kept.join(" | "));
                    }
                    cells.clear();
                }
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    paragraphs.extend(rows);
    Ok(paragraphs.join("\n"))
}

fn end_paragraph(para: &mut String, table_depth: usize, paragraphs: &mut Vec<String>, cell: &mut String) {
    let t = para.trim();
    if !t.is_empty() {
        if table_depth == 0 {
            paragraphs.push(t.to_string());
        } else {
            if !cell.is_empty() {
                cell.push('\n');
            }
            cell.push_str(t);
        }
    }
    para.clear();
}
