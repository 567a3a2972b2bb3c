//! `.xlsx` document writer

use super::{split_lines, DocumentWriter};
use crate::error::{ProjectionError, ProjectionResult};
use crate::image::{ImageEntity, ImageFormat};
use rust_xlsxwriter::{Format, Image, Workbook, Worksheet};
use std::path::Path;

/// Single-worksheet Excel workbook fed by the projection engine
pub struct XlsxDocument {
    workbook: Workbook,
    wrap: Format,
}

impl XlsxDocument {
    pub fn new(sheet_name: &str) -> ProjectionResult<Self> {
        let mut workbook = Workbook::new();
        workbook
            .add_worksheet()
            .set_name(sheet_name)
            .map_err(|e| ProjectionError::Export(format!("Failed to set worksheet name: {}", e)))?;

        Ok(Self {
            workbook,
            wrap: Format::new().set_text_wrap(),
        })
    }

    pub fn save(&mut self, output_path: &Path) -> ProjectionResult<()> {
        self.workbook
            .save(output_path)
            .map_err(|e| ProjectionError::Export(format!("Failed to save Excel file: {}", e)))
    }

    pub fn save_to_buffer(&mut self) -> ProjectionResult<Vec<u8>> {
        self.workbook
            .save_to_buffer()
            .map_err(|e| ProjectionError::Export(format!("Failed to serialize workbook: {}", e)))
    }

    fn worksheet(&mut self) -> ProjectionResult<&mut Worksheet> {
        self.workbook
            .worksheet_from_index(0)
            .map_err(|e| ProjectionError::Export(format!("Missing worksheet: {}", e)))
    }
}

impl DocumentWriter for XlsxDocument {
    fn write_text(&mut self, row: u32, col: u16, text: &str) -> ProjectionResult<()> {
        let lines = split_lines(text);
        let wrap = self.wrap.clone();
        let worksheet = self.worksheet()?;
        let written = if lines.len() > 1 {
            worksheet.write_string_with_format(row, col, lines.join("\n"), &wrap)
        } else {
            worksheet.write_string(row, col, text)
        };
        written.map_err(|e| ProjectionError::Export(format!("Failed to write text: {}", e)))?;
        Ok(())
    }

    fn write_number(&mut self, row: u32, col: u16, value: f64) -> ProjectionResult<()> {
        self.worksheet()?
            .write_number(row, col, value)
            .map_err(|e| ProjectionError::Export(format!("Failed to write number: {}", e)))?;
        Ok(())
    }

    fn write_bool(&mut self, row: u32, col: u16, value: bool) -> ProjectionResult<()> {
        self.worksheet()?
            .write_boolean(row, col, value)
            .map_err(|e| ProjectionError::Export(format!("Failed to write boolean: {}", e)))?;
        Ok(())
    }

    fn write_image(
        &mut self,
        row: u32,
        col: u16,
        bytes: &[u8],
        format: ImageFormat,
        image: &ImageEntity,
    ) -> ProjectionResult<()> {
        let mut picture = Image::new_from_buffer(bytes).map_err(|e| {
            ProjectionError::Export(format!("Unreadable {} image: {}", format.extension(), e))
        })?;
        if image.width > 0 && image.height > 0 {
            picture = picture.set_scale_to_size(image.width, image.height, true);
        }
        self.worksheet()?
            .insert_image(row, col, &picture)
            .map_err(|e| ProjectionError::Export(format!("Failed to insert image: {}", e)))?;
        Ok(())
    }
}
