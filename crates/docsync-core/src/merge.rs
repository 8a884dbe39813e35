//! Line-based three-way merge used to fold a local buffer onto content that
//! changed on disk underneath it.

use crate::diff::{self, LineHunk};

/// Inputs larger than this are not merged line by line.
const MAX_MERGE_LINES: usize = 20_000;

#[derive(Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    Clean(String),
    Conflicted {
        /// Whole document with `<<<<<<<`/`=======`/`>>>>>>>` blocks.
        conflict_marked: String,
        /// Whole document resolving every conflict in favour of ours.
        ours_wins: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Ours,
    Theirs,
}

/// One side's replacement of a base line range.
#[derive(Clone, Debug)]
struct Change<'a> {
    side: Side,
    base: std::ops::Range<usize>,
    lines: Vec<&'a str>,
}

/// Merge `ours` and `theirs`, both derived from `base`.
pub fn merge_three_way(base: &str, ours: &str, theirs: &str) -> MergeOutcome {
    if ours == theirs || base == theirs {
        return MergeOutcome::Clean(ours.to_owned());
    }
    if base == ours {
        return MergeOutcome::Clean(theirs.to_owned());
    }

    let base_lines = diff::lines(base);
    let ours_lines = diff::lines(ours);
    let theirs_lines = diff::lines(theirs);
    if base_lines.len().max(ours_lines.len()).max(theirs_lines.len()) > MAX_MERGE_LINES {
        let mut marked = String::new();
        push_conflict(&mut marked, ours, theirs);
        return MergeOutcome::Conflicted {
            conflict_marked: marked,
            ours_wins: ours.to_owned(),
        };
    }

    let mut changes = side_changes(Side::Ours, &diff::line_hunks(base, ours), &ours_lines);
    changes.extend(side_changes(
        Side::Theirs,
        &diff::line_hunks(base, theirs),
        &theirs_lines,
    ));
    // Stable sort keeps ours ahead of theirs for equal starts.
    changes.sort_by_key(|change| change.base.start);

    let mut merged = String::new();
    let mut marked = String::new();
    let mut conflicted = false;
    let mut pos = 0;
    let mut next = 0;

    while next < changes.len() {
        let cluster_start = changes[next].base.start;
        let mut cluster_end = changes[next].base.end;
        let first = next;
        next += 1;
        while let Some(change) = changes.get(next)
            && overlaps(change, cluster_start, cluster_end)
        {
            cluster_end = cluster_end.max(change.base.end);
            next += 1;
        }

        for line in &base_lines[pos..cluster_start] {
            merged.push_str(line);
            marked.push_str(line);
        }

        let cluster = &changes[first..next];
        let ours_chunk = render(&base_lines, cluster_start, cluster_end, cluster, Side::Ours);
        let theirs_chunk = render(&base_lines, cluster_start, cluster_end, cluster, Side::Theirs);
        let sides_touched = (
            cluster.iter().any(|c| c.side == Side::Ours),
            cluster.iter().any(|c| c.side == Side::Theirs),
        );

        match sides_touched {
            (true, false) => {
                merged.push_str(&ours_chunk);
                marked.push_str(&ours_chunk);
            }
            (false, true) => {
                merged.push_str(&theirs_chunk);
                marked.push_str(&theirs_chunk);
            }
            _ if ours_chunk == theirs_chunk => {
                merged.push_str(&ours_chunk);
                marked.push_str(&ours_chunk);
            }
            _ => {
                conflicted = true;
                merged.push_str(&ours_chunk);
                push_conflict(&mut marked, &ours_chunk, &theirs_chunk);
            }
        }

        pos = cluster_end;
    }

    for line in &base_lines[pos..] {
        merged.push_str(line);
        marked.push_str(line);
    }

    if conflicted {
        MergeOutcome::Conflicted {
            conflict_marked: marked,
            ours_wins: merged,
        }
    } else {
        MergeOutcome::Clean(merged)
    }
}

fn side_changes<'a>(side: Side, hunks: &[LineHunk], lines: &[&'a str]) -> Vec<Change<'a>> {
    hunks
        .iter()
        .map(|hunk| Change {
            side,
            base: hunk.before.clone(),
            lines: lines[hunk.after.clone()].to_vec(),
        })
        .collect()
}

/// Whether `change` collides with the cluster covering `start..end`.
///
/// Edits that merely touch do not collide; two insertions at the same point do.
fn overlaps(change: &Change<'_>, start: usize, end: usize) -> bool {
    change.base.start < end || (start == end && change.base.start == start)
}

/// Base lines `start..end` with one side's changes from `cluster` applied.
fn render(base: &[&str], start: usize, end: usize, cluster: &[Change<'_>], side: Side) -> String {
    let mut out = String::new();
    let mut pos = start;
    for change in cluster.iter().filter(|change| change.side == side) {
        for line in &base[pos..change.base.start] {
            out.push_str(line);
        }
        for line in &change.lines {
            out.push_str(line);
        }
        pos = change.base.end;
    }
    for line in &base[pos..end] {
        out.push_str(line);
    }
    out
}

fn push_conflict(out: &mut String, ours: &str, theirs: &str) {
    ensure_newline(out);
    out.push_str("<<<<<<< ours\n");
    out.push_str(ours);
    ensure_newline(out);
    out.push_str("=======\n");
    out.push_str(theirs);
    ensure_newline(out);
    out.push_str(">>>>>>> theirs\n");
}

fn ensure_newline(buf: &mut String) {
    if !buf.is_empty() && !buf.ends_with('\n') {
        buf.push('\n');
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn conflicted(base: &str, ours: &str, theirs: &str) -> (String, String) {
        match merge_three_way(base, ours, theirs) {
            MergeOutcome::Conflicted {
                conflict_marked,
                ours_wins,
            } => (conflict_marked, ours_wins),
            MergeOutcome::Clean(text) => panic!("expected conflict, merged to {text:?}"),
        }
    }

    #[test]
    fn clean_merges() {
        for (base, ours, theirs, expected) in [
            ("a\n", "b\n", "b\n", "b\n"),
            ("a\n", "b\n", "a\n", "b\n"),
            ("a\n", "a\n", "c\n", "c\n"),
            (
                "line1\nline2\nline3\n",
                "LINE1\nline2\nline3\n",
                "line1\nline2\nLINE3\n",
                "LINE1\nline2\nLINE3\n",
            ),
            ("a\nb\nc\n", "a\nX\nc\n", "a\nX\nc\n", "a\nX\nc\n"),
            ("a\nb\nc\n", "a\nb\nc\nours\n", "theirs\na\nb\nc\n", "theirs\na\nb\nc\nours\n"),
        ] {
            assert_eq!(
                merge_three_way(base, ours, theirs),
                MergeOutcome::Clean(expected.to_owned()),
                "base={base:?} ours={ours:?} theirs={theirs:?}"
            );
        }
    }

    #[test]
    fn overlapping_edits_conflict() {
        let (marked, ours_wins) = conflicted("a\nb\n", "a\nO\n", "a\nT\n");
        assert_eq!(marked, "a\n<<<<<<< ours\nO\n=======\nT\n>>>>>>> theirs\n");
        assert_eq!(ours_wins, "a\nO\n");
    }

    #[test]
    fn insertions_at_same_point_conflict() {
        let (marked, _) = conflicted("", "hello\n", "world\n");
        assert!(marked.contains("<<<<<<< ours\nhello\n=======\nworld\n>>>>>>> theirs\n"));
    }

    #[test]
    fn overlap_rules() {
        let change = |start, end| Change {
            side: Side::Theirs,
            base: start..end,
            lines: Vec::new(),
        };
        assert!(overlaps(&change(2, 2), 2, 2));
        assert!(!overlaps(&change(2, 3), 0, 2));
        assert!(overlaps(&change(2, 5), 0, 3));
        assert!(overlaps(&change(1, 1), 0, 3));
    }
}
