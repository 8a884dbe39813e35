//! Line diffs rendered as unified-diff text.

use std::{fmt::Write as _, ops::Range};

use imara_diff::{Algorithm, Diff, InternedInput};

/// Lines of unchanged context kept around each change.
pub const CONTEXT_LINES: usize = 3;

/// A changed region: `before` lines of the old text are replaced by `after`
/// lines of the new text. Both ranges are 0-based line indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineHunk {
    pub before: Range<usize>,
    pub after: Range<usize>,
}

/// Split text into lines, each keeping its terminator.
pub fn lines(text: &str) -> Vec<&str> {
    imara_diff::sources::lines(text).collect()
}

/// Changed regions between two texts, in order.
pub fn line_hunks(before: &str, after: &str) -> Vec<LineHunk> {
    let input = InternedInput::new(before, after);
    let mut diff = Diff::compute(Algorithm::Histogram, &input);
    diff.postprocess_lines(&input);

    diff.hunks()
        .map(|hunk| LineHunk {
            before: hunk.before.start as usize..hunk.before.end as usize,
            after: hunk.after.start as usize..hunk.after.end as usize,
        })
        .collect()
}

/// Render the change from `before` to `after` as a unified diff of `path`.
///
/// Returns an empty string when the texts are equal.
pub fn unified_diff(path: &str, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }

    let old_lines = lines(before);
    let new_lines = lines(after);
    let hunks = line_hunks(before, after);
    if hunks.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(out, "--- a/{path}");
    let _ = writeln!(out, "+++ b/{path}");

    for group in group_hunks(&hunks, old_lines.len()) {
        let first = &group.hunks[0];
        let lead = first.before.start - group.before.start;
        let after_start = first.after.start - lead;
        let after_len =
            group.before.len() as isize + group.hunks.iter().map(growth).sum::<isize>();
        let after_len = after_len.max(0) as usize;

        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            header_range(group.before.start, group.before.len()),
            header_range(after_start, after_len),
        );

        let mut pos = group.before.start;
        for hunk in group.hunks {
            push_lines(&mut out, ' ', &old_lines[pos..hunk.before.start]);
            push_lines(&mut out, '-', &old_lines[hunk.before.clone()]);
            push_lines(&mut out, '+', &new_lines[hunk.after.clone()]);
            pos = hunk.before.end;
        }
        push_lines(&mut out, ' ', &old_lines[pos..group.before.end]);
    }

    out
}

struct HunkGroup<'a> {
    before: Range<usize>,
    hunks: &'a [LineHunk],
}

/// Merge hunks whose context windows touch into single `@@` sections.
fn group_hunks(hunks: &[LineHunk], old_len: usize) -> Vec<HunkGroup<'_>> {
    let mut groups = Vec::new();
    let mut start = 0;
    while start < hunks.len() {
        let mut end = start + 1;
        while end < hunks.len()
            && hunks[end].before.start <= hunks[end - 1].before.end + 2 * CONTEXT_LINES
        {
            end += 1;
        }

        let first = &hunks[start];
        let last = &hunks[end - 1];
        groups.push(HunkGroup {
            before: first.before.start.saturating_sub(CONTEXT_LINES)
                ..(last.before.end + CONTEXT_LINES).min(old_len),
            hunks: &hunks[start..end],
        });
        start = end;
    }
    groups
}

fn growth(hunk: &LineHunk) -> isize {
    hunk.after.len() as isize - hunk.before.len() as isize
}

fn header_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{len}", start + 1),
    }
}

fn push_lines(out: &mut String, prefix: char, lines: &[&str]) {
    for line in lines {
        out.push(prefix);
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push_str("\n\\ No newline at end of file\n");
        }
    }
}
