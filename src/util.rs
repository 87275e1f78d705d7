use std::time::Instant;

use log::debug;

/// Run `f`, logging how long it took at debug level.
pub fn timed<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    debug!(
        "{label} took {:.3} ms",
        start.elapsed().as_secs_f64() * 1000.0
    );
    out
}

/// Concatenate nested sequences one level deep.
pub fn flatten<T, I, J>(nested: I) -> Vec<T>
where
    I: IntoIterator<Item = J>,
    J: IntoIterator<Item = T>,
{
    nested.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_returns_the_closure_result() {
        assert_eq!(timed("add", || 2 + 2), 4);
    }

    #[test]
    fn flatten_keeps_order() {
        let nested = vec![vec![1, 2], vec![], vec![3]];
        assert_eq!(flatten(nested), vec![1, 2, 3]);
    }
}
