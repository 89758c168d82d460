use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Channel display styles (diagnostics only)
// ---------------------------------------------------------------------------

/// Display style for one channel in diagnostic output.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStyle {
    /// Legend label, e.g. `(a,p3)`.
    pub label: String,
    pub rgb: [u8; 3],
}

/// Generates `n` visually distinct colours using evenly spaced hues.
fn generate_palette(n: usize) -> Vec<[u8; 3]> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            [
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ]
        })
        .collect()
}

/// One style per indexed channel.
pub fn channel_styles(n: usize) -> Vec<ChannelStyle> {
    generate_palette(n)
        .into_iter()
        .enumerate()
        .map(|(i, rgb)| ChannelStyle {
            label: format!("(a,p{i})"),
            rgb,
        })
        .collect()
}

/// The secondary (two-proton) channel is always drawn black.
pub fn secondary_style() -> ChannelStyle {
    ChannelStyle {
        label: "(a,2p)".to_string(),
        rgb: [0, 0, 0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_style_per_channel() {
        let styles = channel_styles(41);
        assert_eq!(styles.len(), 41);
        assert_eq!(styles[0].label, "(a,p0)");
        assert_eq!(styles[40].label, "(a,p40)");
    }

    #[test]
    fn adjacent_channels_get_distinct_colours() {
        let styles = channel_styles(8);
        for pair in styles.windows(2) {
            assert_ne!(pair[0].rgb, pair[1].rgb);
        }
    }

    #[test]
    fn zero_channels_is_fine() {
        assert!(channel_styles(0).is_empty());
    }
}
