/// Uniform-stride thinning to at most `resolution` points.
///
/// The stride is `ceil(n / resolution)`, counted back from the newest sample
/// so the latest reading is always kept. Values are picked, never averaged.
pub fn downsample<T>(samples: Vec<T>, resolution: usize) -> (Vec<T>, usize) {
    let count = samples.len();
    let resolution = resolution.max(1);
    if count <= resolution {
        return (samples, 1);
    }

    let stride = count.div_ceil(resolution);
    let kept = samples
        .into_iter()
        .enumerate()
        .filter(|(index, _)| (count - 1 - index) % stride == 0)
        .map(|(_, sample)| sample)
        .collect();

    (kept, stride)
}
