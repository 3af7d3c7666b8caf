//! Integration test spanning the providers crate and the domain crate it
//! builds on: a LaTeX render response is turned into sampled path data,
//! which then feeds the handwriting synthesizer, end to end.

use tutor_domain::handwriting;
use tutor_providers::latex::extract_path_data;

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

#[test]
fn rendered_svg_paths_synthesize_into_a_stroke_batch() {
    let svg = r#"<svg><path d="M0 0 L10 0 L10 10"/><path d="M20 20 L30 30"/></svg>"#;

    let paths: Vec<_> = extract_path_data(svg).iter().map(|d| sample_svg_path(d)).collect();
    assert_eq!(paths.len(), 2);

    let batch = handwriting::synthesize(&paths, "#0a0", 2.0, 7);
    assert_eq!(batch.strokes.len(), 2);
    assert_eq!(batch.strokes[0].points.len(), 3);
    assert_eq!(batch.strokes[1].points.len(), 2);
}

#[test]
fn malformed_path_data_yields_empty_points_and_is_skipped_by_synthesis() {
    let svg = r#"<svg><path d="not-a-number"/></svg>"#;
    let paths: Vec<_> = extract_path_data(svg).iter().map(|d| sample_svg_path(d)).collect();
    let batch = handwriting::synthesize(&paths, "#000", 1.0, 1);
    assert!(batch.strokes.is_empty());
}
