use super::types::Bounds;

/// Orthogonal route between two non-overlapping boxes.
///
/// * centers level within `tolerance`: one horizontal segment between the
///   facing vertical sides;
/// * centers stacked within `tolerance`: a vertical run between the facing
///   horizontal sides, with a midpoint bend;
/// * otherwise a Z: leave the source side facing the target, turn at the
///   horizontal midpoint, enter the target's facing side.
///
/// The first point always lies on the source outline and the last on the
/// target outline.
pub fn route(source: &Bounds, target: &Bounds, tolerance: f32) -> Vec<(f32, f32)> {
    let (scx, scy) = source.center();
    let (tcx, tcy) = target.center();

    if (tcy - scy).abs() <= tolerance {
        let (exit_x, entry_x) = facing_sides_x(source, target);
        return vec![(exit_x, scy), (entry_x, scy)];
    }

    if (tcx - scx).abs() <= tolerance {
        let (exit_y, entry_y) = if tcy > scy {
            (source.bottom(), target.y)
        } else {
            (source.y, target.bottom())
        };
        let mid_y = ((exit_y + entry_y) / 2.0).round();
        return vec![(scx, exit_y), (scx, mid_y), (scx, entry_y)];
    }

    let (exit_x, entry_x) = facing_sides_x(source, target);
    let mid_x = ((exit_x + entry_x) / 2.0).round();
    vec![(exit_x, scy), (mid_x, scy), (mid_x, tcy), (entry_x, tcy)]
}

fn facing_sides_x(source: &Bounds, target: &Bounds) -> (f32, f32) {
    if target.center().0 >= source.center().0 {
        (source.right(), target.x)
    } else {
        (source.x, target.right())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, y: f32, width: f32, height: f32) -> Bounds {
        Bounds {
            x,
            y,
            width,
            height,
        }
    }

    fn is_orthogonal(points: &[(f32, f32)]) -> bool {
        points
            .windows(2)
            .all(|pair| pair[0].0 == pair[1].0 || pair[0].1 == pair[1].1)
    }

    #[test]
    fn level_boxes_get_a_straight_segment() {
        let a = rect(100.0, 100.0, 130.0, 88.0);
        let b = rect(330.0, 102.0, 130.0, 88.0);
        assert_eq!(route(&a, &b, 4.0), vec![(230.0, 144.0), (330.0, 144.0)]);
        // backwards on the same row: leave left, enter right
        assert_eq!(route(&b, &a, 4.0), vec![(330.0, 146.0), (230.0, 146.0)]);
    }

    #[test]
    fn stacked_boxes_get_a_vertical_run() {
        let a = rect(100.0, 100.0, 130.0, 88.0);
        let b = rect(102.0, 300.0, 130.0, 88.0);
        let points = route(&a, &b, 4.0);
        assert_eq!(points, vec![(165.0, 188.0), (165.0, 244.0), (165.0, 300.0)]);
        let up = route(&b, &a, 4.0);
        assert_eq!(up.first(), Some(&(167.0, 300.0)));
        assert_eq!(up.last(), Some(&(167.0, 188.0)));
    }

    #[test]
    fn offset_boxes_get_a_z_route() {
        let a = rect(100.0, 100.0, 36.0, 36.0);
        let b = rect(400.0, 300.0, 130.0, 88.0);
        let points = route(&a, &b, 4.0);
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], (136.0, 118.0));
        assert_eq!(points[1], (268.0, 118.0));
        assert_eq!(points[2], (268.0, 344.0));
        assert_eq!(points[3], (400.0, 344.0));
    }

    #[test]
    fn endpoints_always_land_on_outlines() {
        let source = rect(500.0, 500.0, 50.0, 50.0);
        let sizes = [(36.0, 36.0), (50.0, 50.0), (130.0, 88.0), (190.0, 110.0)];
        for dx in [-600.0, -230.0, -2.0, 0.0, 3.0, 230.0, 460.0] {
            for dy in [-420.0, -140.0, -3.0, 0.0, 2.0, 140.0, 280.0] {
                for (w, h) in sizes {
                    let (scx, scy) = source.center();
                    let target = rect(scx + dx - w / 2.0, scy + dy - h / 2.0, w, h);
                    if source.overlaps(&target) {
                        continue;
                    }
                    let points = route(&source, &target, 4.0);
                    assert!((2..=4).contains(&points.len()));
                    assert!(is_orthogonal(&points), "{points:?}");
                    assert!(source.touches(points[0], 0.01), "{dx},{dy}: {points:?}");
                    assert!(
                        target.touches(points[points.len() - 1], 0.01),
                        "{dx},{dy}: {points:?}"
                    );
                }
            }
        }
    }
}
