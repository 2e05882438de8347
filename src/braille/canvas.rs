/// Braille dot bit for pixel `(x % 2, y % 4)` inside a cell, indexed
/// `[x][y]`. Unicode Braille patterns run from U+2800 to U+28FF.
const DOT_BITS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];

const BLANK: u32 = 0x2800;

/// Braille canvas: each character cell holds a 2x4 grid of dots.
#[derive(Clone)]
pub struct BrailleCanvas {
    /// Size in characters
    cols: usize,
    rows: usize,
    /// Dot pattern per cell, row-major
    cells: Vec<u8>,
}

impl BrailleCanvas {
    /// Canvas of `cols` x `rows` characters, `cols*2` x `rows*4` pixels
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![0; cols * rows],
        }
    }

    pub fn set_pixel(&mut self, x: usize, y: usize) {
        if let Some((idx, bit)) = self.locate(x, y) {
            self.cells[idx] |= bit;
        }
    }

    /// Ignores negative coordinates
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.locate(x, y)
            .is_some_and(|(idx, bit)| self.cells[idx] & bit != 0)
    }

    fn locate(&self, x: usize, y: usize) -> Option<(usize, u8)> {
        let (col, row) = (x / 2, y / 4);
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some((row * self.cols + col, DOT_BITS[x % 2][y % 4]))
    }

    /// Pixel dimensions (width, height)
    pub fn pixel_size(&self) -> (usize, usize) {
        (self.cols * 2, self.rows * 4)
    }

    /// Number of raised dots
    pub fn dot_count(&self) -> usize {
        self.cells.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// One string of braille glyphs per character row
    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        self.cells
            .chunks(self.cols.max(1))
            .take(self.rows)
            .map(|row| row.iter().map(|&b| glyph(b)).collect())
    }
}

fn glyph(bits: u8) -> char {
    char::from_u32(BLANK + bits as u32).unwrap_or(' ')
}
