//! Rank bookkeeping for estimate points.

use chrono::{DateTime, Utc};
use pts_core::EstimatePoint;

/// Points that move down one rank once `removed` leaves the scale.
///
/// Every point of the same estimate ranked strictly above `removed` comes back
/// with its key decremented and `updated_at` set to `now`, ordered by key so
/// the writes can be applied without two points ever sharing a key.
pub fn shift_down_after(
    points: &[EstimatePoint],
    removed: &EstimatePoint,
    now: DateTime<Utc>,
) -> Vec<EstimatePoint> {
    let mut shifted: Vec<EstimatePoint> = points
        .iter()
        .filter(|p| p.estimate_id == removed.estimate_id && p.id != removed.id)
        .filter(|p| p.key > removed.key)
        .map(|p| EstimatePoint { key: p.key - 1, updated_at: now, ..p.clone() })
        .collect();
    shifted.sort_by_key(|p| p.key);
    shifted
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn point(estimate_id: Uuid, key: i32) -> EstimatePoint {
        let now = Utc::now();
        EstimatePoint {
            id: Uuid::new_v4(),
            estimate_id,
            key,
            value: key.to_string(),
            description: String::new(),
            project_id: Uuid::nil(),
            workspace_id: Uuid::nil(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_only_higher_keys_move() {
        let estimate = Uuid::new_v4();
        let points: Vec<_> = (0..3).map(|k| point(estimate, k)).collect();

        let shifted = shift_down_after(&points, &points[1], Utc::now());

        assert_eq!(shifted.len(), 1);
        assert_eq!(shifted[0].id, points[2].id);
        assert_eq!(shifted[0].key, 1);
    }

    #[test]
    fn test_removing_top_key_moves_nothing() {
        let estimate = Uuid::new_v4();
        let points: Vec<_> = (0..4).map(|k| point(estimate, k)).collect();
        assert!(shift_down_after(&points, &points[3], Utc::now()).is_empty());
    }

    #[test]
    fn test_other_estimates_are_untouched() {
        let points = vec![point(Uuid::new_v4(), 0), point(Uuid::new_v4(), 5)];
        assert!(shift_down_after(&points, &points[0], Utc::now()).is_empty());
    }
}
