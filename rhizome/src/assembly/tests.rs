//! Tests for segmentation, pruning, remaining lengths and untangling.

use super::*;
use crate::lattice::Coord;
use crate::pixel_field::FieldChecks;
use crate::testing::synthetic::{SkeletonSketch, column_points, row_points};

// =============================================================================
// Helper Functions
// =============================================================================

fn pid(field: &PixelField, y: i32, x: i32) -> PixelId {
    field.id_at(Coord::new(y, x)).unwrap()
}

/// Trunk along row 15 from x=0 to x=20 (radius 3), arm A continuing to x=30
/// (radius 3) and arm B straight down 10 pixels from the junction (radius 1).
fn y_shape() -> PixelField {
    SkeletonSketch::new()
        .chain(None, row_points(15, 0..=20, 3))
        .chain(Some(Coord::new(15, 20)), row_points(15, 21..=30, 3))
        .chain(Some(Coord::new(15, 20)), column_points(20, 16..=25, 1))
        .build(40, 30)
}

fn point(y: i32, x: i32, radius: u32) -> SkeletonPoint {
    SkeletonPoint {
        id: PixelId(0),
        coord: Coord::new(y, x),
        radius,
    }
}

fn segment_of(points: Vec<SkeletonPoint>) -> Segment {
    Segment::new(SegmentId(0), points, None)
}

// =============================================================================
// Statistics and scoring
// =============================================================================

#[test]
fn test_stats_sum_euclidean_steps() {
    let stats = SegmentStats::measure(&[point(0, 0, 1), point(1, 1, 1), point(1, 2, 3)]);
    assert!((stats.total_length - (2f64.sqrt() + 1.0)).abs() < 1e-9);
    assert!((stats.average_radius - (1.5 + 1.5 + 3.5) / 3.0).abs() < 1e-9);
}

#[test]
fn test_single_point_stats() {
    let stats = SegmentStats::measure(&[point(4, 4, 2)]);
    assert_eq!(stats.total_length, 0.0);
    assert_eq!(stats.average_radius, 2.5);
}

#[test]
fn test_score_straight_continuation_is_perfect() {
    let parent = segment_of((0..20).map(|x| point(5, x, 2)).collect());
    let straight = segment_of((19..30).map(|x| point(5, x, 2)).collect());
    assert!((parent.score_candidate(&straight) - 100.0).abs() < 1e-9);
}

#[test]
fn test_score_penalizes_turns_and_radius_jumps() {
    let parent = segment_of((0..20).map(|x| point(5, x, 2)).collect());
    let perpendicular = segment_of((5..15).map(|y| point(y, 19, 2)).collect());
    let backwards = segment_of((0..10).rev().map(|x| point(5, x, 2)).collect());
    let thin = segment_of((19..30).map(|x| point(5, x, 0)).collect());

    assert!((parent.score_candidate(&perpendicular) - 60.0).abs() < 1e-9);
    assert!((parent.score_candidate(&backwards) - 20.0).abs() < 1e-9);
    // Radius drops by 2: continuity 50.
    assert!((parent.score_candidate(&thin) - 90.0).abs() < 1e-9);
}

#[test]
fn test_score_of_single_point_candidate_uses_neutral_direction() {
    let parent = segment_of((0..20).map(|x| point(5, x, 2)).collect());
    let stub = segment_of(vec![point(5, 19, 2)]);
    assert!((parent.score_candidate(&stub) - 60.0).abs() < 1e-9);
}

// =============================================================================
// Segmentation
// =============================================================================

#[test]
fn test_line_from_end_is_one_segment() {
    let field = SkeletonSketch::new()
        .chain(None, row_points(2, 0..=19, 0))
        .build(25, 5);

    let forest = build_segments(&field, &[pid(&field, 2, 0)]).unwrap();

    assert_eq!(forest.len(), 1);
    let segment = &forest[forest.roots()[0]];
    assert_eq!(segment.len(), 20);
    assert!(segment.parent().is_none());
    assert!(segment.attachments().is_empty());
}

#[test]
fn test_y_shape_cuts_into_three_segments() {
    let field = y_shape();
    let forest = build_segments(&field, &[pid(&field, 15, 0)]).unwrap();

    assert_eq!(forest.len(), 3);
    let trunk = &forest[forest.roots()[0]];
    assert_eq!(trunk.len(), 21);
    assert_eq!(trunk.attachments().len(), 2);
    for attachment in trunk.attachments() {
        assert_eq!(attachment.index, 20);
        let child = &forest[attachment.segment];
        assert_eq!(child.first().unwrap().coord, Coord::new(15, 20));
        assert_eq!(child.len(), 11);
        assert_eq!(child.parent(), Some(trunk.id()));
    }
    // Children in coordinate order: the row arm before the column arm.
    let first_child = &forest[trunk.attachments()[0].segment];
    assert_eq!(first_child.points()[1].coord, Coord::new(15, 21));
    forest.verify().unwrap();
}

#[test]
fn test_seed_at_branch_point_yields_single_point_root() {
    let field = SkeletonSketch::new()
        .chain(None, [(Coord::new(5, 10), 1)])
        .chain(Some(Coord::new(5, 10)), row_points(5, 11..=15, 1))
        .chain(Some(Coord::new(5, 10)), (5..=9).rev().map(|x| (Coord::new(5, x), 1)))
        .build(20, 10);

    let forest = build_segments(&field, &[pid(&field, 5, 10)]).unwrap();

    assert_eq!(forest.len(), 3);
    assert_eq!(forest[forest.roots()[0]].len(), 1);
    forest.verify().unwrap();
}

// =============================================================================
// Short-segment removal
// =============================================================================

/// Trunk ending in a thick junction at (5,10); long arm to the right; a short
/// stem down to (8,10) that forks into two 1-pixel spurs.
fn pruning_fixture() -> PixelField {
    let mut trunk = row_points(5, 0..=9, 1);
    trunk.push((Coord::new(5, 10), 5));
    SkeletonSketch::new()
        .chain(None, trunk)
        .chain(Some(Coord::new(5, 10)), row_points(5, 11..=25, 1))
        .chain(Some(Coord::new(5, 10)), column_points(10, 6..=8, 3))
        .chain(Some(Coord::new(8, 10)), [(Coord::new(9, 9), 1)])
        .chain(Some(Coord::new(8, 10)), [(Coord::new(9, 11), 1)])
        .build(30, 15)
}

#[test]
fn test_short_segments_cascade_upward() {
    let mut field = pruning_fixture();
    let junction = pid(&field, 5, 10);
    let mut forest = build_segments(&field, &[pid(&field, 5, 0)]).unwrap();
    assert_eq!(forest.len(), 5);

    let removed = remove_short_segments(&mut field, &mut forest, 1.0).unwrap();

    assert_eq!(removed, 3);
    assert_eq!(forest.len(), 2);
    for coord in [(6, 10), (7, 10), (8, 10), (9, 9), (9, 11)] {
        assert!(field.pixel_at(Coord::from(coord)).is_none(), "{coord:?} survived");
    }
    assert!(field.contains(junction));
    assert_eq!(field[junction].children(), &[pid(&field, 5, 11)]);
    field
        .verify(FieldChecks {
            tree_links: true,
            ..FieldChecks::default()
        })
        .unwrap();
    forest.verify().unwrap();
}

#[test]
fn test_zero_multiplier_disables_pruning() {
    let mut field = pruning_fixture();
    let mut forest = build_segments(&field, &[pid(&field, 5, 0)]).unwrap();
    let before = field.len();

    let removed = remove_short_segments(&mut field, &mut forest, 0.0).unwrap();

    assert_eq!(removed, 0);
    assert_eq!(forest.len(), 5);
    assert_eq!(field.len(), before);
}

#[test]
fn test_root_segment_is_never_pruned() {
    let mut field = SkeletonSketch::new()
        .chain(None, row_points(2, 0..=2, 9))
        .build(5, 5);
    let mut forest = build_segments(&field, &[pid(&field, 2, 0)]).unwrap();

    assert_eq!(remove_short_segments(&mut field, &mut forest, 1.0).unwrap(), 0);
    assert_eq!(forest.len(), 1);
}

// =============================================================================
// Remaining length
// =============================================================================

#[test]
fn test_remaining_length_of_line_is_total_length() {
    let field = SkeletonSketch::new()
        .chain(None, row_points(2, 0..=19, 0))
        .build(25, 5);
    let mut forest = build_segments(&field, &[pid(&field, 2, 0)]).unwrap();

    compute_remaining_lengths(&mut forest).unwrap();

    let segment = &forest[forest.roots()[0]];
    assert_eq!(segment.remaining_length(), Some(segment.total_length()));
    assert_eq!(segment.total_length(), 19.0);
}

#[test]
fn test_remaining_length_takes_longest_child() {
    let field = SkeletonSketch::new()
        .chain(None, row_points(15, 0..=20, 3))
        .chain(Some(Coord::new(15, 20)), row_points(15, 21..=30, 3))
        .chain(Some(Coord::new(15, 20)), column_points(20, 16..=29, 1))
        .build(40, 40);
    let mut forest = build_segments(&field, &[pid(&field, 15, 0)]).unwrap();

    compute_remaining_lengths(&mut forest).unwrap();

    let trunk = &forest[forest.roots()[0]];
    assert_eq!(trunk.remaining_length(), Some(20.0 + 14.0));
    assert!(forest.iter().all(|s| s.remaining_length().is_some()));
}

// =============================================================================
// Untangling
// =============================================================================

#[test]
fn test_y_shape_merges_trunk_with_straight_arm() {
    let mut field = y_shape();
    let seeds = [pid(&field, 15, 0)];

    let (forest, outcome) = assemble(&mut field, &seeds, 1.0, BranchSelection::LongestRemaining).unwrap();

    assert_eq!(outcome.initial_segments, 3);
    assert_eq!(outcome.short_segments_removed, 0);
    assert_eq!(outcome.merges, 1);
    assert_eq!(outcome.final_segments, 2);

    let main = &forest[forest.roots()[0]];
    assert_eq!(main.len(), 31);
    assert!((main.total_length() - 30.0).abs() < 1e-9);
    assert_eq!(main.last().unwrap().coord, Coord::new(15, 30));
    assert_eq!(main.attachments().len(), 1);
    assert_eq!(main.attachments()[0].index, 20);

    let side = &forest[main.attachments()[0].segment];
    assert_eq!(side.last().unwrap().coord, Coord::new(25, 20));
    assert_eq!(side.parent(), Some(main.id()));
    forest.verify().unwrap();
}

#[test]
fn test_geometric_selection_picks_straight_arm() {
    let mut field = y_shape();
    let seeds = [pid(&field, 15, 0)];

    let (forest, _) = assemble(&mut field, &seeds, 1.0, BranchSelection::Geometric).unwrap();

    let main = &forest[forest.roots()[0]];
    assert_eq!(main.last().unwrap().coord, Coord::new(15, 30));
}

#[test]
fn test_longest_remaining_beats_geometry() {
    let mut field = SkeletonSketch::new()
        .chain(None, row_points(15, 0..=20, 3))
        .chain(Some(Coord::new(15, 20)), row_points(15, 21..=30, 3))
        .chain(Some(Coord::new(15, 20)), column_points(20, 16..=35, 1))
        .build(40, 40);
    let seeds = [pid(&field, 15, 0)];

    let (forest, _) = assemble(&mut field.clone(), &seeds, 1.0, BranchSelection::LongestRemaining).unwrap();
    assert_eq!(forest[forest.roots()[0]].last().unwrap().coord, Coord::new(35, 20));

    let (forest, _) = assemble(&mut field, &seeds, 1.0, BranchSelection::Geometric).unwrap();
    assert_eq!(forest[forest.roots()[0]].last().unwrap().coord, Coord::new(15, 30));
}

#[test]
fn test_merge_splices_grandchildren_with_offset() {
    // Trunk -> A (straight) which itself forks at its end into A1 (straight) and A2 (down).
    let mut field = SkeletonSketch::new()
        .chain(None, row_points(10, 0..=10, 2))
        .chain(Some(Coord::new(10, 10)), row_points(10, 11..=20, 2))
        .chain(Some(Coord::new(10, 10)), column_points(10, 11..=14, 2))
        .chain(Some(Coord::new(10, 20)), row_points(10, 21..=30, 2))
        .chain(Some(Coord::new(10, 20)), column_points(20, 11..=13, 2))
        .build(40, 30);
    let seeds = [pid(&field, 10, 0)];

    let (forest, outcome) = assemble(&mut field, &seeds, 1.0, BranchSelection::LongestRemaining).unwrap();

    assert_eq!(outcome.initial_segments, 5);
    assert_eq!(outcome.merges, 2);
    assert_eq!(outcome.final_segments, outcome.initial_segments - outcome.merges);

    let main = &forest[forest.roots()[0]];
    assert_eq!(main.len(), 31);
    let mut indices: Vec<usize> = main.attachments().iter().map(|a| a.index).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![10, 20]);
    for attachment in main.attachments() {
        assert_eq!(forest[attachment.segment].parent(), Some(main.id()));
    }
    forest.verify().unwrap();
}

#[test]
fn test_totals_weight_radius_by_length() {
    let mut field = y_shape();
    let seeds = [pid(&field, 15, 0)];
    let (forest, _) = assemble(&mut field, &seeds, 1.0, BranchSelection::LongestRemaining).unwrap();

    let totals = forest.totals();

    assert!((totals.total_length - 40.0).abs() < 1e-9);
    let main = &forest[forest.roots()[0]];
    let side = &forest[main.attachments()[0].segment];
    let expected = (30.0 * main.average_radius() + 10.0 * side.average_radius()) / 40.0;
    assert!((totals.average_radius - expected).abs() < 1e-9);
}

// =============================================================================
// Forest invariants
// =============================================================================

fn y_forest() -> RootForest {
    let field = y_shape();
    let forest = build_segments(&field, &[pid(&field, 15, 0)]).unwrap();
    forest.verify().unwrap();
    forest
}

fn violation(result: Result<()>) -> InvariantViolation {
    match result {
        Err(crate::Error::InvariantViolation(v)) => v,
        other => panic!("expected an invariant violation, got {other:?}"),
    }
}

#[test]
fn test_verify_detects_shifted_attachment() {
    let mut forest = y_forest();
    forest.get_mut(SegmentId(0)).unwrap().attachments[0].index = 19;

    assert!(matches!(
        violation(forest.verify()),
        InvariantViolation::SegmentDiscontinuity {
            segment: 1,
            start,
            expected,
            index: 19,
        } if start == Coord::new(15, 20) && expected == Coord::new(15, 19)
    ));
}

#[test]
fn test_verify_detects_attachment_past_end() {
    let mut forest = y_forest();
    forest.get_mut(SegmentId(0)).unwrap().attachments[1].index = 21;

    assert!(matches!(
        violation(forest.verify()),
        InvariantViolation::AttachmentOutOfBounds {
            segment: 2,
            index: 21,
            len: 21,
        }
    ));
}

#[test]
fn test_verify_detects_child_start_mismatch() {
    let mut forest = y_forest();
    forest.get_mut(SegmentId(2)).unwrap().points.remove(0);

    assert!(matches!(
        violation(forest.verify()),
        InvariantViolation::SegmentDiscontinuity {
            segment: 2,
            start,
            expected,
            index: 20,
        } if start == Coord::new(16, 20) && expected == Coord::new(15, 20)
    ));
}

#[test]
fn test_verify_detects_detached_child() {
    let mut forest = y_forest();
    forest
        .get_mut(SegmentId(0))
        .unwrap()
        .attachments
        .retain(|a| a.segment != SegmentId(2));

    assert!(matches!(
        violation(forest.verify()),
        InvariantViolation::OrphanedSegment { segment: 2, parent: 0 }
    ));
}

#[test]
fn test_merge_rejects_child_of_another_segment() {
    let mut forest = y_forest();

    assert!(matches!(
        violation(forest.merge(SegmentId(1), SegmentId(2))),
        InvariantViolation::OrphanedSegment { segment: 2, parent: 1 }
    ));
    assert_eq!(forest.len(), 3);
}

#[test]
fn test_merge_rejects_child_not_at_endpoint() {
    let mut forest = y_forest();
    forest.get_mut(SegmentId(0)).unwrap().attachments[0].index = 5;

    assert!(matches!(
        violation(forest.merge(SegmentId(0), SegmentId(1))),
        InvariantViolation::AttachmentOutOfBounds {
            segment: 1,
            index: 20,
            len: 21,
        }
    ));
    assert_eq!(forest.len(), 3);
    assert_eq!(forest[SegmentId(0)].len(), 21);
}
