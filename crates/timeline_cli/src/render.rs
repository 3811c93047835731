//! Plain-text rendering of the timeline view.

use std::fmt::Write;
use timeline_core::{TimelineEntry, TimelineView};

const EMPTY_MESSAGE: &str = "No items yet. Start building your achievement timeline!\n";

pub fn render_view(view: &TimelineView<'_>) -> String {
    match view {
        TimelineView::Empty => EMPTY_MESSAGE.to_string(),
        TimelineView::Entries(entries) => {
            let mut out = String::new();
            for entry in entries {
                render_entry(&mut out, entry);
            }
            out
        }
    }
}

fn render_entry(out: &mut String, entry: &TimelineEntry<'_>) {
    let marker = if entry.record.completed { '*' } else { 'o' };
    let _ = writeln!(
        out,
        "{marker} {:<18} [{}] {}",
        entry.display_date,
        entry.status.label(),
        entry.record.title
    );
    if !entry.record.description.is_empty() {
        let _ = writeln!(out, "    {}", entry.record.description);
    }
    let action = if entry.can_complete { "  (complete)" } else { "" };
    let _ = writeln!(out, "    id: {}{action}", entry.record.id);
}

#[cfg(test)]
mod tests {
    use super::render_view;
    use chrono::{TimeZone, Utc};
    use timeline_core::{project, TaskKind, TaskRecord};

    #[test]
    fn empty_view_renders_placeholder() {
        assert!(render_view(&project(&[])).starts_with("No items yet."));
    }

    #[test]
    fn entries_render_status_description_and_action() {
        let at = Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap();
        let records = vec![TaskRecord::new(TaskKind::Todo, "Learn TS", "generics", at).unwrap()];

        let text = render_view(&project(&records));
        assert!(text.contains("January 20, 2024"));
        assert!(text.contains("[Pending] Learn TS"));
        assert!(text.contains("    generics"));
        assert!(text.contains("(complete)"));
    }
}
