//! De-interleaving and downmixing to mono

/// Average each whole frame of `interleaved` into `mono`.
///
/// Processes `min(interleaved.len() / channels, mono.len())` frames and
/// returns that count. A trailing partial frame is ignored.
pub fn downmix_into(interleaved: &[f32], channels: usize, mono: &mut [f32]) -> usize {
    if channels == 0 {
        return 0;
    }

    let frames = (interleaved.len() / channels).min(mono.len());

    if channels == 1 {
        mono[..frames].copy_from_slice(&interleaved[..frames]);
        return frames;
    }

    let scale = channels as f32;
    for (out, frame) in mono[..frames]
        .iter_mut()
        .zip(interleaved.chunks_exact(channels))
    {
        *out = frame.iter().sum::<f32>() / scale;
    }

    frames
}

/// Allocating variant of [`downmix_into`].
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    let mut mono = vec![0.0; interleaved.len() / channels.max(1)];
    let frames = downmix_into(interleaved, channels, &mut mono);
    mono.truncate(frames);
    mono
}
