//! Indicator trait.

/// A batch indicator over a price slice.
///
/// `calculate` returns one value per full window, so the output is
/// `data.len() - period + 1` long (empty when there is not enough data).
pub trait Indicator: Send + Sync {
    type Output;

    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Minimum number of inputs before the first output.
    fn period(&self) -> usize;

    fn name(&self) -> &str;

    /// Most recent value, if the window is full.
    fn latest(&self, data: &[f64]) -> Option<Self::Output> {
        self.calculate(data).pop()
    }
}
