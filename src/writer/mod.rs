//! Document writers: where resolved values end up
//!
//! The projection engine hands scalars, images, and collections to a
//! [`DocumentWriter`]; how they are stored is up to the implementation.

mod xlsx;

pub use xlsx::XlsxDocument;

use crate::error::ProjectionResult;
use crate::image::{ImageEntity, ImageFormat, ImageLoader};
use crate::types::Value;
use std::collections::BTreeMap;

/// Line separator recognized in multi-line text values
pub const LINE_BREAK: &str = "\r\n";

/// Split text into the lines a writer should separate with breaks
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split(LINE_BREAK).collect()
}

/// Cell-addressed sink for projected values
pub trait DocumentWriter {
    fn write_text(&mut self, row: u32, col: u16, text: &str) -> ProjectionResult<()>;

    fn write_number(&mut self, row: u32, col: u16, value: f64) -> ProjectionResult<()>;

    fn write_bool(&mut self, row: u32, col: u16, value: bool) -> ProjectionResult<()>;

    fn write_image(
        &mut self,
        row: u32,
        col: u16,
        bytes: &[u8],
        format: ImageFormat,
        image: &ImageEntity,
    ) -> ProjectionResult<()>;

    /// Write any value at `row`/`col` and return the number of rows used
    ///
    /// Collections are written one item per row, downward. Nulls leave the
    /// cell untouched but still occupy a row.
    fn write_value(
        &mut self,
        row: u32,
        col: u16,
        value: &Value,
        loader: &dyn ImageLoader,
    ) -> ProjectionResult<u32> {
        match value {
            Value::Null => {}
            Value::Bool(b) => self.write_bool(row, col, *b)?,
            Value::Int(i) => self.write_number(row, col, *i as f64)?,
            Value::Float(x) => self.write_number(row, col, *x)?,
            Value::Image(image) => {
                let (bytes, format) = image.load(loader)?;
                self.write_image(row, col, &bytes, format, image)?;
            }
            Value::List(items) | Value::Set(items) => {
                return self.write_rows(row, col, items, loader)
            }
            Value::ListEntity(entity) => return self.write_rows(row, col, &entity.rows, loader),
            other => self.write_text(row, col, &other.to_string())?,
        }
        Ok(1)
    }

    fn write_rows(
        &mut self,
        row: u32,
        col: u16,
        items: &[Value],
        loader: &dyn ImageLoader,
    ) -> ProjectionResult<u32> {
        let mut used = 0;
        for item in items {
            used += self.write_value(row + used, col, item, loader)?;
        }
        Ok(used)
    }
}

/// A written cell, as kept by [`CellBuffer`]
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
    Image { format: ImageFormat, len: usize },
}

/// In-memory writer, handy for previews and for inspecting projections
#[derive(Debug, Default)]
pub struct CellBuffer {
    cells: BTreeMap<(u32, u16), Cell>,
}

impl CellBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl DocumentWriter for CellBuffer {
    fn write_text(&mut self, row: u32, col: u16, text: &str) -> ProjectionResult<()> {
        let joined = split_lines(text).join("\n");
        self.cells.insert((row, col), Cell::Text(joined));
        Ok(())
    }

    fn write_number(&mut self, row: u32, col: u16, value: f64) -> ProjectionResult<()> {
        self.cells.insert((row, col), Cell::Number(value));
        Ok(())
    }

    fn write_bool(&mut self, row: u32, col: u16, value: bool) -> ProjectionResult<()> {
        self.cells.insert((row, col), Cell::Bool(value));
        Ok(())
    }

    fn write_image(
        &mut self,
        row: u32,
        col: u16,
        bytes: &[u8],
        format: ImageFormat,
        _image: &ImageEntity,
    ) -> ProjectionResult<()> {
        self.cells.insert(
            (row, col),
            Cell::Image {
                format,
                len: bytes.len(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::FsImageLoader;
    use crate::types::ListEntity;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\r\nb\r\nc"), vec!["a", "b", "c"]);
        assert_eq!(split_lines("single"), vec!["single"]);
        assert_eq!(split_lines(""), vec![""]);
        assert_eq!(split_lines("a\nb"), vec!["a\nb"]);
    }

    #[test]
    fn test_write_scalars() {
        let mut buffer = CellBuffer::new();
        let loader = FsImageLoader::new();
        buffer.write_value(0, 0, &Value::text("a\r\nb"), &loader).unwrap();
        buffer.write_value(0, 1, &Value::Int(3), &loader).unwrap();
        buffer.write_value(0, 2, &Value::Bool(true), &loader).unwrap();
        assert_eq!(buffer.write_value(0, 3, &Value::Null, &loader).unwrap(), 1);

        assert_eq!(buffer.get(0, 0), Some(&Cell::Text("a\nb".to_string())));
        assert_eq!(buffer.get(0, 1), Some(&Cell::Number(3.0)));
        assert_eq!(buffer.get(0, 2), Some(&Cell::Bool(true)));
        assert_eq!(buffer.get(0, 3), None);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_write_collections_downward() {
        let mut buffer = CellBuffer::new();
        let loader = FsImageLoader::new();
        let nested = Value::List(vec![
            Value::Int(1),
            Value::List(vec![Value::Int(2), Value::Int(3)]),
            Value::text("x"),
        ]);
        assert_eq!(buffer.write_value(5, 1, &nested, &loader).unwrap(), 4);
        assert_eq!(buffer.get(5, 1), Some(&Cell::Number(1.0)));
        assert_eq!(buffer.get(7, 1), Some(&Cell::Number(3.0)));
        assert_eq!(buffer.get(8, 1), Some(&Cell::Text("x".to_string())));

        let set = Value::Set(vec![Value::text("p"), Value::text("q")]);
        assert_eq!(buffer.write_value(10, 0, &set, &loader).unwrap(), 2);
        assert_eq!(buffer.get(11, 0), Some(&Cell::Text("q".to_string())));

        let rows = Value::ListEntity(ListEntity::new("Order", vec![Value::Int(9)]));
        assert_eq!(buffer.write_value(0, 0, &rows, &loader).unwrap(), 1);
        assert_eq!(buffer.get(0, 0), Some(&Cell::Number(9.0)));
    }

    #[test]
    fn test_write_image() {
        let mut buffer = CellBuffer::new();
        let image = Value::Image(ImageEntity::from_data(b"GIF89a....".to_vec()));
        buffer.write_value(1, 1, &image, &FsImageLoader::new()).unwrap();
        assert_eq!(
            buffer.get(1, 1),
            Some(&Cell::Image {
                format: ImageFormat::Gif,
                len: 10
            })
        );
    }
}
