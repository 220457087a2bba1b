use std::fmt;

use crate::error::{Result, SimError};
use crate::types::Cell;

/// Square grid of cells with exactly one `Home`.
///
/// Cells are stored row-major: `cells[y * size + x]` is position (x, y).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
    home_x: usize,
    home_y: usize,
}

impl Grid {
    /// Empty grid with the home cell already placed.
    pub fn new(size: usize, home_x: usize, home_y: usize) -> Result<Self> {
        if size == 0 {
            return Err(SimError::Configuration("grid size must be at least 1".into()));
        }
        if home_x >= size || home_y >= size {
            return Err(SimError::Configuration(format!(
                "home ({home_x}, {home_y}) is outside the {size}x{size} grid"
            )));
        }

        let mut cells = vec![Cell::Empty; size * size];
        cells[home_y * size + home_x] = Cell::Home;

        Ok(Self {
            size,
            cells,
            home_x,
            home_y,
        })
    }

    /// Builds a grid from an ASCII layout, one text line per row
    /// (`.` empty, `H` home, `#` obstacle, `M` marker, `o` collected).
    /// Blank lines and surrounding whitespace are ignored.
    pub fn parse(layout: &str) -> Result<Self> {
        let rows: Vec<&str> = layout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let size = rows.len();

        let mut cells = Vec::with_capacity(size * size);
        let mut home = None;
        for (y, row) in rows.iter().enumerate() {
            let before = cells.len();
            for (x, symbol) in row.chars().enumerate() {
                let cell = Cell::from_symbol(symbol).ok_or_else(|| {
                    SimError::Configuration(format!("unknown cell symbol '{symbol}' at ({x}, {y})"))
                })?;
                if cell == Cell::Home && home.replace((x, y)).is_some() {
                    return Err(SimError::Configuration("layout has more than one home".into()));
                }
                cells.push(cell);
            }
            if cells.len() - before != size {
                return Err(SimError::Configuration(format!(
                    "row {y} has {} cells, expected {size}",
                    cells.len() - before
                )));
            }
        }

        let (home_x, home_y) =
            home.ok_or_else(|| SimError::Configuration("layout has no home".into()))?;
        Ok(Self {
            size,
            cells,
            home_x,
            home_y,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn home(&self) -> (usize, usize) {
        (self.home_x, self.home_y)
    }

    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size
    }

    pub fn cell_at(&self, x: usize, y: usize) -> Result<Cell> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Overwrites a cell. The home cell is fixed for the lifetime of the grid:
    /// it can neither be overwritten nor duplicated.
    pub fn set_cell(&mut self, x: usize, y: usize, cell: Cell) -> Result<()> {
        let i = self.index(x, y)?;
        if (x, y) == self.home() {
            if cell != Cell::Home {
                return Err(SimError::Configuration(format!(
                    "home cell ({x}, {y}) cannot become {cell:?}"
                )));
            }
        } else if cell == Cell::Home {
            return Err(SimError::Configuration(format!(
                "({x}, {y}) cannot become a second home"
            )));
        }
        self.cells[i] = cell;
        Ok(())
    }

    /// Number of cells of the given type.
    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// Row-major view of every cell.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Coordinates of every cell of the given type, row by row.
    pub fn positions_of(&self, cell: Cell) -> impl Iterator<Item = (usize, usize)> + '_ {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .filter(move |&(_, &c)| c == cell)
            .map(move |(i, _)| (i % size, i / size))
    }

    fn index(&self, x: usize, y: usize) -> Result<usize> {
        if self.in_bounds(x, y) {
            Ok(y * self.size + x)
        } else {
            Err(SimError::OutOfRange {
                x,
                y,
                size: self.size,
            })
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.size) {
            for cell in row {
                write!(f, "{}", cell.symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_has_a_single_home() {
        let grid = Grid::new(5, 2, 3).unwrap();
        assert_eq!(grid.home(), (2, 3));
        assert_eq!(grid.cell_at(2, 3).unwrap(), Cell::Home);
        assert_eq!(grid.count(Cell::Home), 1);
        assert_eq!(grid.count(Cell::Empty), 24);
    }

    #[test]
    fn rejects_home_outside_grid() {
        assert!(matches!(Grid::new(4, 4, 0), Err(SimError::Configuration(_))));
        assert!(matches!(Grid::new(0, 0, 0), Err(SimError::Configuration(_))));
    }

    #[test]
    fn out_of_range_access_fails() {
        let mut grid = Grid::new(3, 0, 0).unwrap();
        assert_eq!(
            grid.cell_at(3, 1),
            Err(SimError::OutOfRange { x: 3, y: 1, size: 3 })
        );
        assert!(matches!(
            grid.set_cell(0, 7, Cell::Marker),
            Err(SimError::OutOfRange { .. })
        ));
        assert!(!grid.in_bounds(3, 0));
        assert!(grid.in_bounds(2, 2));
    }

    #[test]
    fn home_cannot_be_overwritten_or_duplicated() {
        let mut grid = Grid::new(3, 1, 1).unwrap();
        assert!(grid.set_cell(1, 1, Cell::Marker).is_err());
        assert!(grid.set_cell(0, 0, Cell::Home).is_err());
        assert!(grid.set_cell(1, 1, Cell::Home).is_ok());
        grid.set_cell(0, 0, Cell::Marker).unwrap();
        assert_eq!(grid.cell_at(0, 0).unwrap(), Cell::Marker);
    }

    #[test]
    fn parse_and_display_agree() {
        let layout = "\
            H.#\n\
            .M.\n\
            o..\n";
        let grid = Grid::parse(layout).unwrap();
        assert_eq!(grid.size(), 3);
        assert_eq!(grid.home(), (0, 0));
        assert_eq!(grid.cell_at(2, 0).unwrap(), Cell::Obstacle);
        assert_eq!(grid.cell_at(1, 1).unwrap(), Cell::Marker);
        assert_eq!(grid.cell_at(0, 2).unwrap(), Cell::Collected);
        assert_eq!(grid.to_string(), "H.#\n.M.\no..\n");
        assert_eq!(grid.positions_of(Cell::Marker).collect::<Vec<_>>(), vec![(1, 1)]);
    }

    #[test]
    fn parse_rejects_bad_layouts() {
        assert!(Grid::parse("..\n..").is_err());
        assert!(Grid::parse("H.\n.H").is_err());
        assert!(Grid::parse("H..\n...").is_err());
        assert!(Grid::parse("Hx\n..").is_err());
    }
}
