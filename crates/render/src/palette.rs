//! One palette shared by every frame of an animation.
//!
//! The palette is built from the union of all frames' colors, so a color
//! maps to the same index in every frame. Transparency is binary: a pixel
//! is transparent when its alpha is below [`ALPHA_THRESHOLD`], and the
//! same cutoff applies to all frames.

use std::collections::{BTreeSet, HashMap};

use color_quant::NeuQuant;
use image::RgbaImage;

/// Pixels with alpha below this are fully transparent in the output.
pub const ALPHA_THRESHOLD: u8 = 128;

/// Largest palette the GIF format allows.
pub const MAX_COLORS: usize = 256;

/// NeuQuant sampling factor: 1 is slowest and best, 30 fastest.
const SAMPLE_FACTOR: i32 = 10;

enum Mapping {
    Exact(HashMap<[u8; 3], u8>),
    Quantized {
        quantizer: NeuQuant,
        cache: HashMap<[u8; 3], u8>,
    },
}

/// Global palette plus the pixel-to-index mapping.
pub struct SharedPalette {
    rgb: Vec<u8>,
    transparent: Option<u8>,
    mapping: Mapping,
}

impl SharedPalette {
    /// Build the palette for a set of frames.
    ///
    /// When the frames use no more distinct opaque colors than fit, the
    /// palette holds them exactly (sorted, so the result does not depend on
    /// pixel order). Otherwise the colors are quantized once over all frames.
    pub fn from_frames(frames: &[RgbaImage]) -> Self {
        let transparent = frames
            .iter()
            .flat_map(|f| f.pixels())
            .any(|p| p.0[3] < ALPHA_THRESHOLD);
        let capacity = if transparent { MAX_COLORS - 1 } else { MAX_COLORS };

        let mut distinct: BTreeSet<[u8; 3]> = BTreeSet::new();
        for p in frames.iter().flat_map(|f| f.pixels()) {
            if p.0[3] >= ALPHA_THRESHOLD {
                distinct.insert([p.0[0], p.0[1], p.0[2]]);
                if distinct.len() > capacity {
                    break;
                }
            }
        }

        let (mut rgb, mapping) = if distinct.len() <= capacity {
            let mut rgb = Vec::with_capacity(distinct.len() * 3);
            let mut lookup = HashMap::with_capacity(distinct.len());
            for (i, color) in distinct.iter().enumerate() {
                rgb.extend_from_slice(color);
                lookup.insert(*color, i as u8);
            }
            (rgb, Mapping::Exact(lookup))
        } else {
            let opaque: Vec<u8> = frames
                .iter()
                .flat_map(|f| f.pixels())
                .filter(|p| p.0[3] >= ALPHA_THRESHOLD)
                .flat_map(|p| [p.0[0], p.0[1], p.0[2], 255])
                .collect();
            let quantizer = NeuQuant::new(SAMPLE_FACTOR, capacity, &opaque);
            (
                quantizer.color_map_rgb(),
                Mapping::Quantized {
                    quantizer,
                    cache: HashMap::new(),
                },
            )
        };

        let transparent = transparent.then(|| {
            let index = (rgb.len() / 3) as u8;
            rgb.extend_from_slice(&[0, 0, 0]);
            index
        });

        // A color table needs at least two entries.
        while rgb.len() < 6 {
            rgb.extend_from_slice(&[0, 0, 0]);
        }

        tracing::debug!(
            colors = rgb.len() / 3,
            quantized = matches!(mapping, Mapping::Quantized { .. }),
            transparent = transparent.is_some(),
            "Built shared palette"
        );

        Self {
            rgb,
            transparent,
            mapping,
        }
    }

    /// Flat `r, g, b` triples.
    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    pub fn len(&self) -> usize {
        self.rgb.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.rgb.is_empty()
    }

    /// Index reserved for transparent pixels, if any frame has them.
    pub fn transparent_index(&self) -> Option<u8> {
        self.transparent
    }

    pub fn is_quantized(&self) -> bool {
        matches!(self.mapping, Mapping::Quantized { .. })
    }

    /// Palette index of every pixel of `frame`, row by row.
    pub fn index_frame(&mut self, frame: &RgbaImage) -> Vec<u8> {
        let mut indices = Vec::with_capacity(frame.width() as usize * frame.height() as usize);
        for p in frame.pixels() {
            let [r, g, b, a] = p.0;
            let index = match (a < ALPHA_THRESHOLD, self.transparent) {
                (true, Some(t)) => t,
                _ => self.index_of([r, g, b]),
            };
            indices.push(index);
        }
        indices
    }

    fn index_of(&mut self, color: [u8; 3]) -> u8 {
        match &mut self.mapping {
            Mapping::Exact(lookup) => lookup.get(&color).copied().unwrap_or(0),
            Mapping::Quantized { quantizer, cache } => *cache
                .entry(color)
                .or_insert_with(|| quantizer.index_of(&[color[0], color[1], color[2], 255]) as u8),
        }
    }
}
