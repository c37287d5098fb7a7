//! Motor de diseño de la plantilla
//!
//! Clona filas con estilo dentro de una hoja y re-ancla las celdas combinadas
//! de una sola fila. No desplaza contenido: quien llama inserta antes la fila
//! en blanco de destino con `insert_blank_row`.

use umya_spreadsheet::Worksheet;

/// Rango de celdas combinadas, coordenadas 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min_col: u32,
    pub min_row: u32,
    pub max_col: u32,
    pub max_row: u32,
}

impl CellRange {
    /// Interpreta rangos tipo `B5:D5`, `$B$5:$D$5` o una celda suelta `B5`
    pub fn parse(range: &str) -> Option<Self> {
        let (start, end) = match range.split_once(':') {
            Some((start, end)) => (start, end),
            None => (range, range),
        };
        let (start_col, start_row) = parse_cell_reference(start)?;
        let (end_col, end_row) = parse_cell_reference(end)?;

        Some(Self {
            min_col: start_col.min(end_col),
            min_row: start_row.min(end_row),
            max_col: start_col.max(end_col),
            max_row: start_row.max(end_row),
        })
    }

    pub fn is_single_row(&self) -> bool {
        self.min_row == self.max_row
    }

    /// Mismo rango de columnas anclado en otra fila
    pub fn on_row(&self, row: u32) -> Self {
        Self {
            min_row: row,
            max_row: row,
            ..*self
        }
    }

    pub fn to_a1(&self) -> String {
        format!(
            "{}{}:{}{}",
            column_letters(self.min_col),
            self.min_row,
            column_letters(self.max_col),
            self.max_row
        )
    }
}

/// Convierte un índice de columna 1-based en letras (1 -> A, 28 -> AB)
pub fn column_letters(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let remainder = (index - 1) % 26;
        letters.push(char::from(b'A' + remainder as u8));
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Convierte letras de columna en índice 1-based
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        acc.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)
    })
}

fn parse_cell_reference(reference: &str) -> Option<(u32, u32)> {
    let cleaned: String = reference.trim().chars().filter(|c| *c != '$').collect();
    let split = cleaned.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cleaned.split_at(split);
    let column = column_index(letters)?;
    let row = digits.parse::<u32>().ok().filter(|row| *row > 0)?;
    Some((column, row))
}

/// Rangos combinados actuales de la hoja
pub fn merged_ranges(sheet: &Worksheet) -> Vec<CellRange> {
    sheet
        .get_merge_cells()
        .iter()
        .filter_map(|range| CellRange::parse(&range.get_range()))
        .collect()
}

/// Inserta una fila en blanco en `row`, desplazando hacia abajo lo que había
pub fn insert_blank_row(sheet: &mut Worksheet, row: u32) {
    sheet.insert_new_row(&row, &1);
}

/// Copia la fila `source_row` sobre `target_row`: valor (con su tipo y su
/// fórmula, sin reinterpretar el texto) y estilo de cada celda hasta la última
/// columna usada, alto de fila, y las celdas combinadas que ocupan únicamente
/// la fila origen.
///
/// Los rangos combinados de varias filas no se re-anclan.
pub fn clone_row(sheet: &mut Worksheet, source_row: u32, target_row: u32) {
    let highest_column = sheet.get_highest_column();

    for column in 1..=highest_column {
        let snapshot = sheet.get_cell((column, source_row)).map(|cell| {
            (
                cell.get_cell_value().clone(),
                cell.get_formula().to_string(),
                cell.get_style().clone(),
            )
        });

        if let Some((value, formula, style)) = snapshot {
            let target = sheet.get_cell_mut((column, target_row));
            target.set_cell_value(value).set_style(style);
            if !formula.is_empty() {
                target.set_formula(formula);
            }
        }
    }

    let height = sheet
        .get_row_dimension(&source_row)
        .map(|row| *row.get_height())
        .filter(|height| *height > 0.0);
    if let Some(height) = height {
        let row = sheet.get_row_dimension_mut(&target_row);
        row.set_height(height);
        row.set_custom_height(true);
    }

    let existing = merged_ranges(sheet);
    let anchored: Vec<CellRange> = existing
        .iter()
        .filter(|range| range.is_single_row() && range.min_row == source_row)
        .map(|range| range.on_row(target_row))
        .filter(|range| !existing.contains(range))
        .collect();

    for range in anchored {
        sheet.add_merge_cells(range.to_a1());
    }
}
