use chrono::Utc;
use proptest::prelude::*;
use pts_core::EstimatePoint;
use pts_estimate::shift_down_after;
use uuid::Uuid;

fn scale(size: usize) -> Vec<EstimatePoint> {
    let estimate_id = Uuid::new_v4();
    let now = Utc::now();
    (0..size as i32)
        .map(|key| EstimatePoint {
            id: Uuid::new_v4(),
            estimate_id,
            key,
            value: key.to_string(),
            description: String::new(),
            project_id: Uuid::nil(),
            workspace_id: Uuid::nil(),
            created_at: now,
            updated_at: now,
        })
        .collect()
}

proptest! {
    #[test]
    fn keys_stay_contiguous_after_removal(size in 1usize..=13, pick in 0usize..13) {
        let points = scale(size);
        let removed = points[pick % size].clone();
        let shifted = shift_down_after(&points, &removed, Utc::now());

        let mut keys: Vec<i32> = points
            .iter()
            .filter(|p| p.id != removed.id)
            .map(|p| shifted.iter().find(|s| s.id == p.id).map_or(p.key, |s| s.key))
            .collect();
        keys.sort();

        prop_assert_eq!(keys, (0..size as i32 - 1).collect::<Vec<_>>());
        prop_assert_eq!(shifted.len(), size - 1 - removed.key as usize);
    }
}
