//! Stroke Emitter and board layout rebase (spec §4.6).

use tutor_domain::action::{Action, ActionFormat, Point, StrokeBatch};
use tutor_domain::config::{BoardConfig, LatexConfig};
use tutor_domain::handwriting;
use tutor_providers::LatexClient;

/// Result of rebasing one turn's board actions: the actions to dispatch, in
/// order (possibly with a synthesized leading `Clear`), and the session's
/// new `boardCursorY` after all of them.
pub struct RebaseOutcome {
    pub actions: Vec<Action>,
    pub final_cursor_y: i64,
}

fn line_height_for(format: ActionFormat, cfg: &LatexConfig) -> u32 {
    match format {
        ActionFormat::Text => cfg.target_height_inline,
        ActionFormat::Latex => cfg.target_height_display,
    }
}

fn place_write(
    content: &str,
    position: Point,
    format: ActionFormat,
    cursor: i64,
    board_max_y: i64,
    board_cfg: &BoardConfig,
    latex_cfg: &LatexConfig,
) -> (Point, i64) {
    let y_base = cursor.max(board_max_y + board_cfg.margin_below_student);
    let delta = y_base - board_cfg.top_margin;
    let shifted = Point {
        x: position.x,
        y: position.y + delta,
    };
    let line_count = content.lines().count().max(1);
    let extent = handwriting::estimate_extent(line_count, line_height_for(format, latex_cfg));
    let new_cursor = shifted.y + extent + board_cfg.interline_margin;
    (shifted, new_cursor)
}

/// Rebase a turn's proposed board actions against the session's current
/// cursor and known student extent (spec §4.6 steps 1-5).
pub fn rebase_turn(
    actions: &[Action],
    mut cursor: i64,
    board_max_y: i64,
    board_cfg: &BoardConfig,
    latex_cfg: &LatexConfig,
) -> RebaseOutcome {
    let mut out = Vec::with_capacity(actions.len());
    let mut last_delta = 0i64;

    for action in actions {
        match action {
            Action::Write {
                content,
                format,
                position,
                color,
            } => {
                let (mut shifted, mut new_cursor) =
                    place_write(content, *position, *format, cursor, board_max_y, board_cfg, latex_cfg);

                if new_cursor > board_cfg.max_board_height {
                    out.push(Action::Clear {});
                    cursor = board_cfg.top_margin;
                    let (shifted2, new_cursor2) = place_write(
                        content, *position, *format, cursor, board_max_y, board_cfg, latex_cfg,
                    );
                    shifted = shifted2;
                    new_cursor = new_cursor2;
                }

                last_delta = shifted.y - position.y;
                cursor = new_cursor;
                out.push(Action::Write {
                    content: content.clone(),
                    format: *format,
                    position: shifted,
                    color: color.clone(),
                });
            }
            Action::Underline { area, color } => {
                let mut shifted = *area;
                shifted.y += last_delta;
                out.push(Action::Underline {
                    area: shifted,
                    color: color.clone(),
                });
            }
            Action::Clear {} => {
                cursor = board_cfg.top_margin;
                last_delta = 0;
                out.push(Action::Clear {});
            }
        }
    }

    RebaseOutcome {
        actions: out,
        final_cursor_y: cursor,
    }
}

/// Dispatch one rebased `write` action to the handwriting synthesizer
/// (spec §4.6: text path via sampled glyph outlines, LaTeX path via the
/// renderer microservice).
pub async fn synthesize_write(
    content: &str,
    format: ActionFormat,
    color: &str,
    latex: &LatexClient,
    seed: u64,
) -> StrokeBatch {
    let paths: Vec<Vec<(f64, f64)>> = match format {
        ActionFormat::Text => sample_text_paths(content),
        ActionFormat::Latex => match latex.render(content, true).await {
            Ok(svg) => tutor_providers::latex::extract_path_data(&svg)
                .iter()
                .map(|d| sample_svg_path(d))
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "latex render failed, falling back to text path");
                sample_text_paths(content)
            }
        },
    };

    handwriting::synthesize(&paths, color, 2.0, seed)
}

/// Deterministic placeholder for glyph-outline sampling: one short
/// left-to-right stroke per line of text, scaled by line length. A real
/// implementation would sample outlines from a configured handwriting font.
fn sample_text_paths(content: &str) -> Vec<Vec<(f64, f64)>> {
    content
        .lines()
        .enumerate()
        .map(|(row, line)| {
            let y = row as f64 * 24.0;
            let width = (line.chars().count().max(1) as f64) * 8.0;
            vec![(0.0, y), (width * 0.5, y - 4.0), (width, y)]
        })
        .collect()
}

/// Sample an SVG path's `M`/`L` control points into a polyline. Curve
/// commands are approximated by their endpoints; sufficient for stroke
/// animation, which only needs a reasonable polyline, not exact geometry.
fn sample_svg_path(d: &str) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    let mut nums = d
        .split(|c: char| c.is_alphabetic() || c == ',')
        .filter_map(|tok| tok.trim().parse::<f64>().ok());
    while let (Some(x), Some(y)) = (nums.next(), nums.next()) {
        points.push((x, y));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_domain::action::Rect;

    fn cfg() -> (BoardConfig, LatexConfig) {
        (BoardConfig::default(), LatexConfig::default())
    }

    #[test]
    fn write_shifts_below_student_content() {
        let (board_cfg, latex_cfg) = cfg();
        let actions = vec![Action::Write {
            content: "hello".into(),
            format: ActionFormat::Text,
            position: Point { x: 40, y: 40 },
            color: "#000".into(),
        }];
        let outcome = rebase_turn(&actions, board_cfg.top_margin, 500, &board_cfg, &latex_cfg);
        match &outcome.actions[0] {
            Action::Write { position, .. } => {
                assert_eq!(position.y, 500 + board_cfg.margin_below_student);
            }
            _ => panic!("expected write"),
        }
    }

    #[test]
    fn cursor_is_non_decreasing_across_writes() {
        let (board_cfg, latex_cfg) = cfg();
        let actions = vec![
            Action::Write {
                content: "line one".into(),
                format: ActionFormat::Text,
                position: Point { x: 40, y: 40 },
                color: "#000".into(),
            },
            Action::Write {
                content: "line two".into(),
                format: ActionFormat::Text,
                position: Point { x: 40, y: 40 },
                color: "#000".into(),
            },
        ];
        let outcome = rebase_turn(&actions, board_cfg.top_margin, board_cfg.top_margin, &board_cfg, &latex_cfg);
        let ys: Vec<i64> = outcome
            .actions
            .iter()
            .filter_map(|a| match a {
                Action::Write { position, .. } => Some(position.y),
                _ => None,
            })
            .collect();
        assert!(ys[1] > ys[0]);
    }

    #[test]
    fn overflow_prepends_clear_and_resets_cursor() {
        let (mut board_cfg, latex_cfg) = cfg();
        board_cfg.max_board_height = 100;
        let actions = vec![Action::Write {
            content: "hi".into(),
            format: ActionFormat::Text,
            position: Point { x: 40, y: 40 },
            color: "#000".into(),
        }];
        let outcome = rebase_turn(&actions, 90, board_cfg.top_margin, &board_cfg, &latex_cfg);
        assert!(matches!(outcome.actions[0], Action::Clear {}));
    }

    #[test]
    fn underline_shifts_by_last_write_delta() {
        let (board_cfg, latex_cfg) = cfg();
        let actions = vec![
            Action::Write {
                content: "x".into(),
                format: ActionFormat::Text,
                position: Point { x: 40, y: 40 },
                color: "#000".into(),
            },
            Action::Underline {
                area: Rect { x: 40, y: 40, w: 10, h: 5 },
                color: "#f00".into(),
            },
        ];
        let outcome = rebase_turn(&actions, 500, 500, &board_cfg, &latex_cfg);
        match &outcome.actions[1] {
            Action::Underline { area, .. } => assert_eq!(area.y, 40 + (500 - board_cfg.top_margin)),
            _ => panic!("expected underline"),
        }
    }

    #[test]
    fn explicit_clear_resets_cursor_to_top_margin() {
        let (board_cfg, latex_cfg) = cfg();
        let outcome = rebase_turn(&[Action::Clear {}], 900, 900, &board_cfg, &latex_cfg);
        assert_eq!(outcome.final_cursor_y, board_cfg.top_margin);
    }
}
