use std::path::Path;

use anyhow::{bail, Result};

use super::layout::Area;
use super::*;

const PADDING: i32 = 12;
const ROW_HEIGHT: i32 = 30;
const MARGIN: i32 = 10;

/// A grid of text cells with a header row and a label column. Highlighted
/// cells are filled with the highlight color.
#[derive(Clone, Debug, Default)]
pub struct TableImage {
    pub column_labels: Vec<String>,
    pub row_labels: Vec<String>,
    pub cells: Vec<Vec<String>>,
    pub highlighted: Vec<Vec<bool>>,
}

impl TableImage {
    fn check(&self) -> Result<()> {
        if self.cells.len() != self.row_labels.len() || self.highlighted.len() != self.row_labels.len() {
            bail!("table has {} row labels but {} rows", self.row_labels.len(), self.cells.len());
        }
        for (cells, marks) in self.cells.iter().zip(&self.highlighted) {
            if cells.len() != self.column_labels.len() || marks.len() != self.column_labels.len() {
                bail!("table row does not match {} columns", self.column_labels.len());
            }
        }
        Ok(())
    }

    /// Pixel width of the label column followed by every data column
    pub fn column_widths(&self) -> Result<Vec<i32>> {
        let mut label_width = 0;
        for label in &self.row_labels {
            label_width = label_width.max(text_size(label, LABEL)?.0);
        }
        let mut widths = vec![label_width + 2 * PADDING];
        for (j, label) in self.column_labels.iter().enumerate() {
            let mut width = text_size(label, LABEL)?.0;
            for row in &self.cells {
                width = width.max(text_size(&row[j], LABEL)?.0);
            }
            widths.push(width + 2 * PADDING);
        }
        Ok(widths)
    }

    pub fn render(&self) -> Result<Canvas> {
        self.check()?;
        let widths = self.column_widths()?;
        let width = widths.iter().sum::<i32>() + 2 * MARGIN;
        let height = ROW_HEIGHT * (self.row_labels.len() as i32 + 1) + 2 * MARGIN;
        let mut canvas = Canvas::new(width, height)?;

        // x offset of every column
        let mut offsets = vec![MARGIN];
        for w in &widths {
            offsets.push(offsets[offsets.len() - 1] + w);
        }
        let cell = |row: usize, column: usize| {
            Area::new(
                offsets[column],
                MARGIN + ROW_HEIGHT * row as i32,
                widths[column],
                ROW_HEIGHT,
            )
        };

        for (j, label) in self.column_labels.iter().enumerate() {
            let area = cell(0, j + 1);
            canvas.outline(area, BLACK)?;
            canvas.text_middle(label, area.x + area.width / 2, area.y + area.height / 2, Anchor::Center, LABEL)?;
        }
        for (i, label) in self.row_labels.iter().enumerate() {
            let area = cell(i + 1, 0);
            canvas.outline(area, BLACK)?;
            canvas.text_middle(label, area.right() - PADDING, area.y + area.height / 2, Anchor::Right, LABEL)?;

            for (j, text) in self.cells[i].iter().enumerate() {
                let area = cell(i + 1, j + 1);
                if self.highlighted[i][j] {
                    canvas.fill(area, HIGHLIGHT)?;
                }
                canvas.outline(area, BLACK)?;
                canvas.text_middle(text, area.x + area.width / 2, area.y + area.height / 2, Anchor::Center, LABEL)?;
            }
        }
        Ok(canvas)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.render()?.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableImage {
        TableImage {
            column_labels: vec!["average_overlap".to_string(), "reinit_count".to_string()],
            row_labels: vec!["CSRT".to_string(), "ModVIT".to_string()],
            cells: vec![
                vec!["0.5".to_string(), "3".to_string()],
                vec!["0.75".to_string(), "1".to_string()],
            ],
            highlighted: vec![vec![false, false], vec![true, true]],
        }
    }

    #[test]
    fn test_render_table() {
        let table = table();
        let widths = table.column_widths().unwrap();
        assert_eq!(widths.len(), 3);
        assert!(widths[1] > widths[2]);

        let canvas = table.render().unwrap();
        // inside the highlighted ModVIT / reinit_count cell
        let x = MARGIN + widths[0] + widths[1] + 3;
        let y = MARGIN + 2 * ROW_HEIGHT + 3;
        assert_eq!(canvas.pixel(x, y).unwrap(), [0x9b, 0xd9, 0xa1]);
        // CSRT / reinit_count is not
        assert_eq!(canvas.pixel(x, y - ROW_HEIGHT).unwrap(), [255, 255, 255]);
    }

    #[test]
    fn test_mismatched_table() {
        let mut table = table();
        table.cells[1].pop();
        assert!(table.render().is_err());
    }
}
