use vm_core::{Image, Mask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    C4,
    C8,
}

const OFFSETS_C4: [(isize, isize); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
const OFFSETS_C8: [(isize, isize); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

impl Connectivity {
    fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::C4 => &OFFSETS_C4,
            Connectivity::C8 => &OFFSETS_C8,
        }
    }
}

/// Connected components of the pixels equal to `value`.
#[derive(Debug, Clone)]
pub struct Components {
    /// Component id per pixel, `0` for pixels not labelled.
    pub labels: Image<u32>,
    /// Pixel count per component; index `id - 1`.
    pub sizes: Vec<usize>,
    /// Whether the component has a pixel on the image border.
    pub touches_border: Vec<bool>,
}

impl Components {
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

/// Labels components of pixels equal to `value` in raster order of their
/// first pixel.
pub fn label_components(mask: &Mask, value: bool, connectivity: Connectivity) -> Components {
    let (w, h) = mask.dims();
    let mut labels = Image::new_fill(w, h, 0u32);
    let mut sizes = Vec::new();
    let mut touches_border = Vec::new();
    let mut stack = Vec::new();

    for start in 0..w * h {
        if mask.data()[start] != value || labels.data()[start] != 0 {
            continue;
        }

        let id = sizes.len() as u32 + 1;
        let mut size = 0usize;
        let mut border = false;
        labels.data_mut()[start] = id;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            size += 1;
            let x = (idx % w) as isize;
            let y = (idx / w) as isize;
            if x == 0 || y == 0 || x as usize == w - 1 || y as usize == h - 1 {
                border = true;
            }

            for &(dx, dy) in connectivity.offsets() {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx as usize >= w || ny as usize >= h {
                    continue;
                }
                let nidx = ny as usize * w + nx as usize;
                if mask.data()[nidx] == value && labels.data()[nidx] == 0 {
                    labels.data_mut()[nidx] = id;
                    stack.push(nidx);
                }
            }
        }

        sizes.push(size);
        touches_border.push(border);
    }

    Components {
        labels,
        sizes,
        touches_border,
    }
}

/// Fills enclosed background regions with fewer than `max_area` pixels.
///
/// Background connectivity is 4-neighbour. Regions touching the image border
/// are never filled.
pub fn fill_holes(mask: &Mask, max_area: usize) -> Mask {
    let mut out = mask.clone();
    if max_area == 0 {
        return out;
    }

    let holes = label_components(mask, false, Connectivity::C4);
    for (dst, &label) in out.data_mut().iter_mut().zip(holes.labels.data()) {
        if label == 0 {
            continue;
        }
        let k = label as usize - 1;
        if !holes.touches_border[k] && holes.sizes[k] < max_area {
            *dst = true;
        }
    }

    out
}

/// Removes 8-connected foreground objects with fewer than `min_size` pixels.
pub fn remove_small_objects(mask: &Mask, min_size: usize) -> Mask {
    let mut out = mask.clone();
    if min_size <= 1 {
        return out;
    }

    let objects = label_components(mask, true, Connectivity::C8);
    for (dst, &label) in out.data_mut().iter_mut().zip(objects.labels.data()) {
        if label != 0 && objects.sizes[label as usize - 1] < min_size {
            *dst = false;
        }
    }

    out
}
