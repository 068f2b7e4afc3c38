//! Interactive duplicate review.
//!
//! Keys: `n`/`p` move, `m` toggles a mark, `i` marks every identical pair,
//! `r` replaces the existing file, `d` deletes the source, `c` commits the
//! marked deletions, `q` quits. Every destructive key asks for `y`.

use console::{style, Key, Term};
use media_organizer::core::metadata::ImageMetadataReader;
use media_organizer::core::reconcile::{
    FileDetails, PreviewLoader, ReconcileSummary, Reconciler, RecordPreview,
};
use media_organizer::core::transfer::IdentityVerdict;
use media_organizer::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// How long a render waits for file details before showing the record anyway
const PREVIEW_WAIT: Duration = Duration::from_millis(300);

/// Run the review loop until the list is empty or the operator quits
pub fn run(
    term: &Term,
    mut reconciler: Reconciler,
    reader: Arc<dyn ImageMetadataReader>,
) -> Result<ReconcileSummary> {
    let loader = PreviewLoader::new(reader)?;

    term.write_line("")?;
    term.write_line(&format!("{}", style("Duplicate Review").bold().cyan()))?;

    while let Some(record) = reconciler.current().cloned() {
        let token = reconciler.preview_token();
        loader.request(token, &record);

        term.write_line("")?;
        let marker = if reconciler.is_marked(reconciler.index()) {
            style("[marked]").red().to_string()
        } else {
            String::new()
        };
        term.write_line(&format!(
            "{} {} {}",
            style(reconciler.status_line()).bold(),
            style(format!("[{}]", record.verdict)).dim(),
            marker
        ))?;
        term.write_line(&format!("  source:   {}", record.source.display()))?;
        term.write_line(&format!("  existing: {}", record.existing.display()))?;
        match loader.wait(token, PREVIEW_WAIT) {
            Some(preview) => render_preview(term, &preview)?,
            None => term.write_line(&format!("  {}", style("(details still loading)").dim()))?,
        }
        term.write_line(&format!(
            "  {}",
            style("[n]ext [p]rev [m]ark [i]dentical [r]eplace [d]elete source [c]ommit [q]uit")
                .dim()
        ))?;

        match term.read_key()? {
            Key::Char('n') => {
                if !reconciler.next() {
                    term.write_line("  Already at the last duplicate")?;
                }
            }
            Key::Char('p') => {
                if !reconciler.prev() {
                    term.write_line("  Already at the first duplicate")?;
                }
            }
            Key::Char('m') => {
                reconciler.toggle_mark();
            }
            Key::Char('i') => {
                let added = reconciler.mark_identical();
                term.write_line(&format!("  Marked {} identical duplicates", added))?;
            }
            Key::Char('r') => {
                let prompt = "Overwrite the existing file with the source? This cannot be undone.";
                if confirm(term, prompt)? {
                    match reconciler.replace_immediate() {
                        Ok(_) => term.write_line(&format!("  {}", style("Replaced").green()))?,
                        Err(e) => term.write_line(&format!("  {} {}", style("✗").red(), e))?,
                    }
                }
            }
            Key::Char('d') => {
                if record.verdict != IdentityVerdict::Identical {
                    term.write_line(&format!(
                        "  {}",
                        style("Warning: these files were not verified identical.").yellow()
                    ))?;
                }
                if confirm(term, "Delete the source file and keep the existing one?")? {
                    match reconciler.delete_source_immediate() {
                        Ok(_) => term.write_line(&format!("  {}", style("Deleted").green()))?,
                        Err(e) => term.write_line(&format!("  {} {}", style("✗").red(), e))?,
                    }
                }
            }
            Key::Char('c') => {
                let marked = reconciler.marked_count();
                if marked == 0 {
                    term.write_line("  Nothing is marked")?;
                } else if confirm(term, &format!("Delete {} marked source files?", marked))? {
                    let deleted = reconciler.commit_marked_deletions();
                    term.write_line(&format!("  Deleted {} of {} files", deleted, marked))?;
                }
            }
            Key::Char('q') | Key::Escape => break,
            _ => {}
        }
    }

    term.write_line("")?;
    term.write_line(&reconciler.status_line())?;
    Ok(reconciler.summary())
}

fn confirm(term: &Term, prompt: &str) -> Result<bool> {
    term.write_str(&format!("  {} [y/N] ", prompt))?;
    let answer = term.read_char()?;
    term.write_line("")?;
    Ok(matches!(answer, 'y' | 'Y'))
}

fn render_preview(term: &Term, preview: &RecordPreview) -> Result<()> {
    render_details(term, "source", &preview.source)?;
    render_details(term, "existing", &preview.existing)
}

fn render_details(
    term: &Term,
    label: &str,
    details: &std::result::Result<FileDetails, String>,
) -> Result<()> {
    match details {
        Ok(d) => {
            let mut parts = vec![format!("{} bytes", d.size)];
            if let Some((w, h)) = d.dimensions {
                parts.push(format!("{}x{}", w, h));
            }
            if let Some(modified) = d.modified {
                parts.push(format!("modified {}", modified.format("%Y-%m-%d %H:%M")));
            }
            if let Some(ref camera) = d.camera {
                parts.push(camera.clone());
            }
            term.write_line(&format!(
                "  {:<9} {}",
                format!("{}:", label),
                style(parts.join(", ")).dim()
            ))?;
        }
        Err(e) => {
            term.write_line(&format!(
                "  {:<9} {}",
                format!("{}:", label),
                style(e).red()
            ))?;
        }
    }
    Ok(())
}
