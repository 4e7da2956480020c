use crate::position::Position;
use glam::Vec2;

pub trait WithPosition {
    fn position(&self) -> Position;
}

#[derive(Clone, Debug)]
pub struct Cluster<T> {
    pub units: Vec<T>,
    /// Running mean of member positions
    pub centroid: Vec2,
}

impl<T> Cluster<T> {
    fn seed(unit: T, at: Vec2) -> Self {
        Self {
            units: vec![unit],
            centroid: at,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn center(&self) -> Position {
        Position::from_vec2(self.centroid)
    }
}

#[derive(Clone, Debug)]
pub struct ClusterResult<T> {
    pub clusters: Vec<Cluster<T>>,
    pub largest_index: usize,
    pub largest_count: usize,
}

impl<T> ClusterResult<T> {
    pub fn largest(&self) -> Option<&Cluster<T>> {
        self.clusters.get(self.largest_index)
    }
}

/// Naive incremental clustering: each unit joins the first cluster whose
/// running centroid is closer than `cluster_distance`, or starts its own.
///
/// The result depends on insertion order. Groups are small and the result only
/// drives the regroup decision, so that is fine.
pub fn find_clusters<T: WithPosition + Clone>(
    units: &[T],
    cluster_distance: f32,
) -> ClusterResult<T> {
    let mut clusters: Vec<Cluster<T>> = vec![];
    let mut largest_index = 0;
    let mut largest_count = 0;
    for unit in units {
        let at = unit.position().to_vec2();
        match clusters
            .iter()
            .position(|c| c.centroid.distance(at) < cluster_distance)
        {
            Some(j) => {
                let cluster = &mut clusters[j];
                let n = cluster.units.len() as f32;
                cluster.centroid = (cluster.centroid * n + at) / (n + 1.0);
                cluster.units.push(unit.clone());
                if cluster.units.len() > largest_count {
                    largest_index = j;
                    largest_count = cluster.units.len();
                }
            }
            None => {
                clusters.push(Cluster::seed(unit.clone(), at));
                if largest_count < 1 {
                    largest_index = clusters.len() - 1;
                    largest_count = 1;
                }
            }
        }
    }
    ClusterResult {
        clusters,
        largest_index,
        largest_count,
    }
}

/// Floored mean position of `units`, `None` if there are none.
pub fn centroid<T: WithPosition>(units: &[T]) -> Option<Position> {
    if units.is_empty() {
        return None;
    }
    let sum = units
        .iter()
        .fold(Vec2::ZERO, |acc, u| acc + u.position().to_vec2());
    Some(Position::from_vec2(sum / units.len() as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct TestEntity(u32, Position);

    impl WithPosition for TestEntity {
        fn position(&self) -> Position {
            self.1
        }
    }

    #[test]
    fn two_blobs_make_two_clusters() {
        let units = vec![
            TestEntity(0, Position::new(10, 10)),
            TestEntity(1, Position::new(11, 10)),
            TestEntity(2, Position::new(50, 50)),
            TestEntity(3, Position::new(10, 11)),
            TestEntity(4, Position::new(51, 51)),
        ];
        let result = find_clusters(&units, 4.0);
        assert_eq!(result.clusters.len(), 2);
        assert_eq!(result.largest_index, 0);
        assert_eq!(result.largest_count, 3);
        assert_eq!(result.largest().unwrap().center(), Position::new(10, 10));
    }

    #[test]
    fn empty_input() {
        let result = find_clusters::<TestEntity>(&[], 4.0);
        assert!(result.clusters.is_empty());
        assert_eq!(result.largest_count, 0);
        assert!(result.largest().is_none());
    }

    #[test]
    fn partition_covers_every_unit_once() {
        let mut rnd = oorandom::Rand32::new(1);
        for _ in 0..1000 {
            let n = rnd.rand_range(1..40);
            let units: Vec<_> = (0..n)
                .map(|i| {
                    TestEntity(
                        i,
                        Position::new(
                            rnd.rand_range(0..64) as i32,
                            rnd.rand_range(0..64) as i32,
                        ),
                    )
                })
                .collect();
            let distance = 1.0 + rnd.rand_range(0..12) as f32;
            let result = find_clusters(&units, distance);

            assert!(result.largest_count >= 1);
            assert!(result.largest_count <= units.len());
            assert_eq!(
                result.clusters[result.largest_index].len(),
                result.largest_count
            );
            assert!(result
                .clusters
                .iter()
                .all(|c| c.len() <= result.largest_count));

            let mut seen: Vec<u32> = result
                .clusters
                .iter()
                .flat_map(|c| c.units.iter().map(|u| u.0))
                .collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn centroid_floors() {
        let units = vec![
            TestEntity(0, Position::new(0, 0)),
            TestEntity(1, Position::new(1, 3)),
        ];
        assert_eq!(centroid(&units), Some(Position::new(0, 1)));
        assert_eq!(centroid::<TestEntity>(&[]), None);
    }
}
