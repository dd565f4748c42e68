use ndarray::ArrayView2;

pub struct StatsHelper;

impl StatsHelper {
    /// Largest finite value of a power map, `None` when there is none.
    pub fn peak(map: ArrayView2<f64>) -> Option<f64> {
        map.iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                Some(best) if best >= v => Some(best),
                _ => Some(v),
            })
    }
}
