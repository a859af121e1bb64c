use docflow_client::DocumentResults;
use docflow_core::{AnswerRecord, AppViewModel, DocumentRowView};

/// Prints one progress line per document. Renders run append-only, so
/// progress reads like a log.
pub(crate) fn render(view: &AppViewModel) {
    for row in &view.documents {
        println!("{}", format_row(row));
    }
}

fn format_row(row: &DocumentRowView) -> String {
    let mut line = format!("[{}] {}", row.job_id, row.filename);
    if let Some(error) = &row.error {
        line.push_str(&format!("  error: {error}"));
        return line;
    }
    match row.status {
        None => {
            if let Some(percent) = row.percent {
                line.push_str(&format!("  uploading {percent}%"));
            }
        }
        Some(status) => {
            line.push_str(&format!("  {status}  {}", stage_glyphs(row)));
            if row.page_count > 0 {
                line.push_str(&format!("  pages={}", row.page_count));
            }
            if row.table_count > 0 {
                line.push_str(&format!("  tables={}", row.table_count));
            }
            if let Some(secs) = row.processing_secs {
                line.push_str(&format!("  {secs:.1}s"));
            }
        }
    }
    line
}

fn stage_glyphs(row: &DocumentRowView) -> String {
    let mut glyphs = String::from("[");
    for stage in &row.stages {
        glyphs.push(if stage.is_completed {
            '#'
        } else if stage.is_active {
            '>'
        } else {
            '.'
        });
    }
    glyphs.push(']');
    glyphs
}

pub(crate) fn render_summary(view: &AppViewModel) {
    let done = view
        .documents
        .iter()
        .filter(|row| row.error.is_none())
        .count();
    let failed = view.documents.len() - done;
    println!("{done} document(s) settled, {failed} failed");
}

pub(crate) fn render_listing(view: &AppViewModel) {
    if view.documents.is_empty() {
        println!("no documents");
        return;
    }
    for row in &view.documents {
        let status = row
            .status
            .map(|status| status.as_str())
            .unwrap_or("unknown");
        println!(
            "{}  {}  {}  pages={} tables={}",
            row.document_id.as_deref().unwrap_or("-"),
            row.filename,
            status,
            row.page_count,
            row.table_count
        );
    }
}

pub(crate) fn render_answer(record: &AnswerRecord) {
    println!("{}", record.answer);
    println!(
        "confidence {:.2}, answered in {:.1}s",
        record.confidence, record.processing_secs
    );
    for citation in &record.citations {
        let table = citation
            .table_id
            .as_deref()
            .map(|id| format!(" {id}"))
            .unwrap_or_default();
        println!(
            "  - {} p.{}{}: \"{}\"",
            citation.document_id, citation.page_number, table, citation.snippet
        );
    }
}

pub(crate) fn render_results(results: &DocumentResults) {
    println!(
        "{} ({}): {} page(s), {} table(s)",
        results.metadata.original_filename,
        results.id,
        results.metadata.page_count,
        results.tables.len()
    );
    if let Some(secs) = results.processing_time {
        println!("processed in {secs:.1}s");
    }
    for table in &results.tables {
        println!(
            "  table {} on p.{}: {}x{} ({}, confidence {:.2})",
            table.table_id,
            table.page_number,
            table.rows,
            table.columns,
            table.extraction_method,
            table.confidence
        );
    }
}
