//! Grid maps
//!
//! A map definition is a block of text: each trimmed line is a row and
//! each hexadecimal character a filled cell whose bits mark its borders
//! (top, right, bottom, left from most to least significant). Any other
//! character leaves the cell empty.

use crate::error::StoryError;
use serde::{Deserialize, Serialize};

const BORDER_TOP: u8 = 0x8;
const BORDER_RIGHT: u8 = 0x4;
const BORDER_BOTTOM: u8 = 0x2;
const BORDER_LEFT: u8 = 0x1;

/// Map collaborator driven by the map directive and the story controller
pub trait MapDisplay {
    fn set_default_map_data(&mut self, defaults: MapDefaultsPatch);
    fn add_map(&mut self, map: PassageMap);
    fn display_map(&mut self, name: &str, highlight: Option<HighlightPoint>)
    -> Result<(), StoryError>;
    fn clear(&mut self);
}

/// Drawing defaults shared by every map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDefaults {
    pub grid_cols: u32,
    pub grid_rows: u32,
    pub block_width: f64,
    pub block_height: f64,
    pub color: String,
    pub highlight_color: String,
    pub border_color: String,
}

impl Default for MapDefaults {
    fn default() -> Self {
        Self {
            grid_cols: 20,
            grid_rows: 20,
            block_width: 25.0,
            block_height: 25.0,
            color: "#ffd700".to_string(),
            highlight_color: "#fff".to_string(),
            border_color: "#333".to_string(),
        }
    }
}

/// Partial defaults, merged over the current ones
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MapDefaultsPatch {
    pub grid_cols: Option<u32>,
    pub grid_rows: Option<u32>,
    pub block_width: Option<f64>,
    pub block_height: Option<f64>,
    pub color: Option<String>,
    pub highlight_color: Option<String>,
    pub border_color: Option<String>,
}

impl MapDefaultsPatch {
    /// Parse JSON defaults as authored in a map-defaults passage
    pub fn from_json(json: &str) -> Result<Self, StoryError> {
        serde_json::from_str(json)
            .map_err(|e| StoryError::configuration(format!("invalid map defaults: {e}")))
    }

    fn apply(self, defaults: &mut MapDefaults) {
        if let Some(v) = self.grid_cols {
            defaults.grid_cols = v;
        }
        if let Some(v) = self.grid_rows {
            defaults.grid_rows = v;
        }
        if let Some(v) = self.block_width {
            defaults.block_width = v;
        }
        if let Some(v) = self.block_height {
            defaults.block_height = v;
        }
        if let Some(v) = self.color {
            defaults.color = v;
        }
        if let Some(v) = self.highlight_color {
            defaults.highlight_color = v;
        }
        if let Some(v) = self.border_color {
            defaults.border_color = v;
        }
    }
}

/// A named map definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageMap {
    pub name: String,
    pub map: String,
}

/// Cell to highlight, in grid coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightPoint {
    pub x: i64,
    pub y: i64,
}

impl HighlightPoint {
    /// Parse `"x,y"`, rounding fractional coordinates; anything
    /// non-numeric yields no highlight
    pub fn parse(raw: &str) -> Option<Self> {
        let (x, y) = raw.split_once(',')?;
        Some(Self {
            x: coordinate(x)?,
            y: coordinate(y)?,
        })
    }
}

fn coordinate(raw: &str) -> Option<i64> {
    let value: f64 = raw.trim().parse().ok()?;
    value.is_finite().then(|| value.round() as i64)
}

/// Which edges of a cell carry a border
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borders {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Borders {
    fn from_bits(bits: u8) -> Self {
        Self {
            top: bits & BORDER_TOP != 0,
            right: bits & BORDER_RIGHT != 0,
            bottom: bits & BORDER_BOTTOM != 0,
            left: bits & BORDER_LEFT != 0,
        }
    }
}

/// A filled cell of a displayed map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapCell {
    pub row: usize,
    pub col: usize,
    pub borders: Borders,
}

/// Parse a map definition into its filled cells
pub fn parse_cells(definition: &str) -> Vec<MapCell> {
    definition
        .trim()
        .lines()
        .enumerate()
        .flat_map(|(row, line)| {
            line.trim().chars().enumerate().filter_map(move |(col, c)| {
                let bits = c.to_digit(16)? as u8;
                Some(MapCell {
                    row,
                    col,
                    borders: Borders::from_bits(bits),
                })
            })
        })
        .collect()
}

/// What the map surface currently shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayedMap {
    pub name: String,
    pub cells: Vec<MapCell>,
    pub highlight: Option<HighlightPoint>,
    pub defaults: MapDefaults,
    /// Viewport translation that centres the map, or the highlighted cell
    pub offset: (f64, f64),
}

impl DisplayedMap {
    /// Text rendering: `#` filled, `@` highlighted, `.` empty
    pub fn to_text(&self) -> String {
        let rows = self.cells.iter().map(|c| c.row + 1).max().unwrap_or(0);
        let cols = self.cells.iter().map(|c| c.col + 1).max().unwrap_or(0);
        let mut grid = vec![vec!['.'; cols]; rows];
        for cell in &self.cells {
            grid[cell.row][cell.col] = '#';
        }
        if let Some(h) = self.highlight
            && let (Ok(row), Ok(col)) = (usize::try_from(h.y), usize::try_from(h.x))
            && row < rows
            && col < cols
            && grid[row][col] == '#'
        {
            grid[row][col] = '@';
        }
        grid.into_iter()
            .map(|row| row.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// In-memory grid map model
#[derive(Debug, Clone)]
pub struct GridMap {
    defaults: MapDefaults,
    maps: Vec<PassageMap>,
    current: Option<DisplayedMap>,
    viewport: (f64, f64),
}

impl Default for GridMap {
    fn default() -> Self {
        Self::new(300.0, 300.0)
    }
}

impl GridMap {
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            defaults: MapDefaults::default(),
            maps: Vec::new(),
            current: None,
            viewport: (viewport_width, viewport_height),
        }
    }

    pub fn defaults(&self) -> &MapDefaults {
        &self.defaults
    }

    pub fn current(&self) -> Option<&DisplayedMap> {
        self.current.as_ref()
    }

    pub fn map_names(&self) -> impl Iterator<Item = &str> {
        self.maps.iter().map(|m| m.name.as_str())
    }

    fn centre_offset(&self, highlight: Option<HighlightPoint>) -> (f64, f64) {
        let d = &self.defaults;
        let (view_w, view_h) = self.viewport;
        let (focus_x, focus_y) = match highlight {
            Some(h) => (
                h.x as f64 * d.block_width + d.block_width / 2.0,
                h.y as f64 * d.block_height + d.block_height / 2.0,
            ),
            None => (
                d.block_width * f64::from(d.grid_cols) / 2.0,
                d.block_height * f64::from(d.grid_rows) / 2.0,
            ),
        };
        (-focus_x + view_w / 2.0, -focus_y + view_h / 2.0)
    }
}

impl MapDisplay for GridMap {
    fn set_default_map_data(&mut self, defaults: MapDefaultsPatch) {
        defaults.apply(&mut self.defaults);
    }

    fn add_map(&mut self, map: PassageMap) {
        log::debug!("registered map {}", map.name);
        self.maps.push(map);
    }

    fn display_map(
        &mut self,
        name: &str,
        highlight: Option<HighlightPoint>,
    ) -> Result<(), StoryError> {
        let map = self
            .maps
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| StoryError::not_found("map", name))?;

        let displayed = DisplayedMap {
            name: map.name.clone(),
            cells: parse_cells(&map.map),
            highlight,
            defaults: self.defaults.clone(),
            offset: self.centre_offset(highlight),
        };
        log::debug!("displaying map {name} (highlight {highlight:?})");
        self.current = Some(displayed);
        Ok(())
    }

    fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(name: &str, grid: &str) -> PassageMap {
        PassageMap {
            name: name.to_string(),
            map: grid.to_string(),
        }
    }

    #[test]
    fn hex_cells_carry_border_bits() {
        let cells = parse_cells("a5\n x0");
        assert_eq!(cells.len(), 3);
        assert_eq!(
            cells[0].borders,
            Borders {
                top: true,
                right: false,
                bottom: true,
                left: false
            }
        );
        assert_eq!(
            cells[1].borders,
            Borders {
                top: false,
                right: true,
                bottom: false,
                left: true
            }
        );
        // Leading whitespace is trimmed per row; `x` is an empty cell
        assert_eq!((cells[2].row, cells[2].col), (1, 1));
        assert_eq!(cells[2].borders, Borders::default());
    }

    #[test]
    fn highlight_parsing_is_lenient() {
        assert_eq!(HighlightPoint::parse("2, 3"), Some(HighlightPoint { x: 2, y: 3 }));
        assert_eq!(HighlightPoint::parse("2,x"), None);
        assert_eq!(HighlightPoint::parse("7"), None);
        assert_eq!(HighlightPoint::parse("1.5,2"), Some(HighlightPoint { x: 2, y: 2 }));
        assert_eq!(HighlightPoint::parse("-0.4, 3.0"), Some(HighlightPoint { x: 0, y: 3 }));
        assert_eq!(HighlightPoint::parse("inf,1"), None);
    }

    #[test]
    fn display_unknown_map_fails() {
        let mut grid = GridMap::default();
        let err = grid.display_map("nowhere", None).unwrap_err();
        assert!(matches!(err, StoryError::NotFound { .. }));
    }

    #[test]
    fn display_centres_on_highlight() {
        let mut grid = GridMap::default();
        grid.add_map(map("cave", "88\n88"));

        grid.display_map("cave", None).unwrap();
        // 20 cols * 25px / 2 = 250 from the map centre; viewport centre is 150
        assert_eq!(grid.current().unwrap().offset, (-100.0, -100.0));

        grid.display_map("cave", Some(HighlightPoint { x: 1, y: 0 }))
            .unwrap();
        assert_eq!(grid.current().unwrap().offset, (150.0 - 37.5, 150.0 - 12.5));
        assert_eq!(grid.current().unwrap().to_text(), "#@\n##");

        grid.clear();
        assert!(grid.current().is_none());
    }

    #[test]
    fn defaults_merge_partially() {
        let mut grid = GridMap::default();
        let patch = MapDefaultsPatch::from_json(r#"{"gridCols": 5, "color": "red"}"#).unwrap();
        grid.set_default_map_data(patch);
        assert_eq!(grid.defaults().grid_cols, 5);
        assert_eq!(grid.defaults().grid_rows, 20);
        assert_eq!(grid.defaults().color, "red");
    }

    #[test]
    fn malformed_defaults_are_configuration_errors() {
        let err = MapDefaultsPatch::from_json("{gridCols: 5}").unwrap_err();
        assert!(matches!(err, StoryError::Configuration { .. }));
    }
}
