//! Composición del formato de ingreso
//!
//! Llena una copia de la plantilla xlsx con los datos de una solicitud. Las
//! secciones de invitados y de equipos crecen insertando filas que clonan el
//! estilo de la fila anterior, de modo que todo lo que está debajo de cada
//! sección se desplaza hacia abajo.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info, warn};
use umya_spreadsheet::Worksheet;

use crate::config::environment::{output_file_name, EnvironmentConfig};
use crate::models::{BranchType, EntranceRequestAggregate, GuestDetail, Material, Principal};
use crate::services::layout_engine::{clone_row, insert_blank_row};
use crate::utils::errors::{config_error, AppError, AppResult};

const DATE_FORMAT: &str = "%d/%m/%Y";
const TIME_FORMAT: &str = "%H:%M";
const MARK: &str = "x";

/// Cómo se ubica el bloque de firmas respecto a las secciones que crecen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureBlockMode {
    /// Se escribe en las filas de la plantilla antes de crecer las secciones;
    /// las inserciones posteriores lo desplazan con el resto de la hoja.
    #[default]
    Fixed,
    /// Se escribe después de la sección de invitados, en la fila base más las
    /// filas insertadas para invitados.
    OffsetByGuests,
}

impl fmt::Display for SignatureBlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureBlockMode::Fixed => f.write_str("fixed"),
            SignatureBlockMode::OffsetByGuests => f.write_str("offset-by-guests"),
        }
    }
}

impl FromStr for SignatureBlockMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "fixed" => Ok(SignatureBlockMode::Fixed),
            "offset-by-guests" | "offset_by_guests" => Ok(SignatureBlockMode::OffsetByGuests),
            other => Err(config_error(
                "SIGNATURE_BLOCK_MODE",
                &format!("modo desconocido '{}'", other),
            )),
        }
    }
}

/// Celda de la plantilla, coordenadas 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAnchor {
    pub row: u32,
    pub column: u32,
}

impl CellAnchor {
    pub const fn at(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    fn shifted(&self, rows: u32) -> Self {
        Self::at(self.row + rows, self.column)
    }
}

/// Columnas de la sección de invitados
#[derive(Debug, Clone, Copy)]
pub struct GuestColumns {
    pub name: u32,
    pub health_insurer: u32,
    pub risk_insurer: u32,
    pub document_id: u32,
    pub employer: u32,
    pub entry_time: u32,
    pub departure_time: u32,
}

/// Columnas de la sección de equipos
#[derive(Debug, Clone, Copy)]
pub struct EquipmentColumns {
    pub quantity: u32,
    pub serial: u32,
    pub model: u32,
    pub description: u32,
}

/// Bloque de firmas: una fila por dato, una columna por firmante
#[derive(Debug, Clone, Copy)]
pub struct SignatureBlock {
    pub name_row: u32,
    pub unit_row: u32,
    pub position_row: u32,
    pub phone_row: u32,
    pub creator_column: u32,
    pub authorizer_column: u32,
    pub security_column: u32,
}

/// Tabla de anclas de la plantilla del formato de ingreso
#[derive(Debug, Clone, Copy)]
pub struct FormatLayout {
    pub branch_name: CellAnchor,
    pub municipality: CellAnchor,
    /// Marcada para sedes técnicas y externas
    pub technical_mark: CellAnchor,
    /// Marcada para sedes administrativas
    pub administrative_mark: CellAnchor,
    pub installation_mark: CellAnchor,
    pub uninstallation_mark: CellAnchor,
    pub entry_date: CellAnchor,
    pub departure_date: CellAnchor,
    pub reason: CellAnchor,
    pub guest_start_row: u32,
    pub guest_columns: GuestColumns,
    /// Filas entre la primera fila de invitados y la primera de equipos
    pub equipment_gap: u32,
    pub equipment_columns: EquipmentColumns,
    pub signatures: SignatureBlock,
    pub signature_block_mode: SignatureBlockMode,
}

impl Default for FormatLayout {
    fn default() -> Self {
        Self {
            branch_name: CellAnchor::at(6, 2),
            municipality: CellAnchor::at(6, 5),
            technical_mark: CellAnchor::at(5, 9),
            administrative_mark: CellAnchor::at(6, 9),
            installation_mark: CellAnchor::at(5, 11),
            uninstallation_mark: CellAnchor::at(6, 11),
            entry_date: CellAnchor::at(6, 12),
            departure_date: CellAnchor::at(6, 15),
            reason: CellAnchor::at(9, 2),
            guest_start_row: 15,
            guest_columns: GuestColumns {
                name: 2,
                health_insurer: 4,
                risk_insurer: 5,
                document_id: 7,
                employer: 8,
                entry_time: 14,
                departure_time: 16,
            },
            equipment_gap: 7,
            equipment_columns: EquipmentColumns {
                quantity: 2,
                serial: 4,
                model: 5,
                description: 10,
            },
            signatures: SignatureBlock {
                name_row: 28,
                unit_row: 29,
                position_row: 30,
                phone_row: 31,
                creator_column: 3,
                authorizer_column: 8,
                security_column: 15,
            },
            signature_block_mode: SignatureBlockMode::Fixed,
        }
    }
}

impl FormatLayout {
    pub fn with_signature_block_mode(mode: SignatureBlockMode) -> Self {
        Self {
            signature_block_mode: mode,
            ..Self::default()
        }
    }
}

/// Filas escritas e insertadas en una sección que crece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionReport {
    pub start_row: u32,
    pub rows_written: u32,
    pub rows_inserted: u32,
}

/// Resultado de llenar la hoja
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionReport {
    pub guests: SectionReport,
    pub equipment: SectionReport,
    /// Fila donde se escribieron los nombres de los firmantes, antes de las
    /// inserciones que vinieran después
    pub signature_row: u32,
}

/// Componedor de formatos: plantilla, directorio de salida y tabla de anclas
#[derive(Debug, Clone)]
pub struct DocumentComposer {
    template_path: PathBuf,
    output_dir: PathBuf,
    layout: FormatLayout,
}

impl DocumentComposer {
    pub fn new(template_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, layout: FormatLayout) -> Self {
        Self {
            template_path: template_path.into(),
            output_dir: output_dir.into(),
            layout,
        }
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self::new(
            config.template_path.clone(),
            config.output_dir.clone(),
            FormatLayout::with_signature_block_mode(config.signature_block_mode),
        )
    }

    /// Ruta del formato de una solicitud
    pub fn output_path_for(&self, request_id: i64) -> PathBuf {
        self.output_dir.join(output_file_name(request_id))
    }

    /// Genera `output_<id>.xlsx` en el directorio de salida
    pub fn compose_for(&self, aggregate: &EntranceRequestAggregate) -> AppResult<PathBuf> {
        let output_path = self.output_path_for(aggregate.id());
        compose(aggregate, &self.template_path, &output_path, &self.layout)
    }
}

/// Llena una copia de la plantilla y la deja en `output_path`.
///
/// La plantilla nunca se modifica. El archivo final aparece completo o no
/// aparece: se escribe en un temporal del mismo directorio y luego se renombra.
pub fn compose(
    aggregate: &EntranceRequestAggregate,
    template_path: &Path,
    output_path: &Path,
    layout: &FormatLayout,
) -> AppResult<PathBuf> {
    if !template_path.is_file() {
        return Err(AppError::NotFound(format!(
            "Plantilla no encontrada: {}",
            template_path.display()
        )));
    }

    let output_dir = match output_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&output_dir)?;

    let staging = tempfile::Builder::new()
        .prefix(".output_")
        .suffix(".xlsx")
        .tempfile_in(&output_dir)?;
    std::fs::copy(template_path, staging.path())?;

    let mut book = umya_spreadsheet::reader::xlsx::read(staging.path())
        .map_err(|e| AppError::Document(format!("No se pudo leer la plantilla: {}", e)))?;

    let report = fill_sheet(book.get_active_sheet_mut(), aggregate, layout);
    debug!(
        "📄 Solicitud {}: {} invitados ({} filas insertadas), {} equipos ({} filas insertadas)",
        aggregate.id(),
        report.guests.rows_written,
        report.guests.rows_inserted,
        report.equipment.rows_written,
        report.equipment.rows_inserted
    );

    umya_spreadsheet::writer::xlsx::write(&book, staging.path())
        .map_err(|e| AppError::Document(format!("No se pudo escribir el formato: {}", e)))?;

    staging.persist(output_path).map_err(|e| AppError::Io(e.error))?;

    info!(
        "✅ Formato de la solicitud {} generado en {}",
        aggregate.id(),
        output_path.display()
    );
    Ok(output_path.to_path_buf())
}

/// Escribe todos los datos de la solicitud sobre la hoja activa
pub fn fill_sheet(
    sheet: &mut Worksheet,
    aggregate: &EntranceRequestAggregate,
    layout: &FormatLayout,
) -> CompositionReport {
    fill_header(sheet, aggregate, layout);

    let mut signature_row = layout.signatures.name_row;
    if layout.signature_block_mode == SignatureBlockMode::Fixed {
        fill_signatures(sheet, aggregate, layout, 0);
    }

    let request = &aggregate.request;
    let entry_time = request.entry_date.format(TIME_FORMAT).to_string();
    let departure_time = request.departure_date.format(TIME_FORMAT).to_string();
    let guests = fill_section(sheet, layout.guest_start_row, &aggregate.guests, |sheet, row, guest| {
        write_guest(sheet, row, guest, &layout.guest_columns, &entry_time, &departure_time);
    });

    if layout.signature_block_mode == SignatureBlockMode::OffsetByGuests {
        signature_row += guests.rows_inserted;
        fill_signatures(sheet, aggregate, layout, guests.rows_inserted);
    }

    let equipment_start = layout.guest_start_row + guests.rows_inserted + layout.equipment_gap;
    let equipment = fill_section(sheet, equipment_start, &aggregate.materials, |sheet, row, material| {
        write_material(sheet, row, material, &layout.equipment_columns);
    });

    CompositionReport {
        guests,
        equipment,
        signature_row,
    }
}

fn fill_header(sheet: &mut Worksheet, aggregate: &EntranceRequestAggregate, layout: &FormatLayout) {
    let request = &aggregate.request;
    let branch = &aggregate.branch;

    write_text(sheet, layout.branch_name, branch.name.to_uppercase());
    write_text(sheet, layout.municipality, branch.municipality_name.to_uppercase());

    let administrative = branch.branch_type == BranchType::Administrative;
    write_text(sheet, layout.technical_mark, mark(!administrative));
    write_text(sheet, layout.administrative_mark, mark(administrative));
    write_text(sheet, layout.installation_mark, mark(request.is_installation));
    write_text(sheet, layout.uninstallation_mark, mark(request.is_uninstallation));

    write_text(sheet, layout.entry_date, request.entry_date.format(DATE_FORMAT).to_string());
    write_text(sheet, layout.departure_date, request.departure_date.format(DATE_FORMAT).to_string());
    write_text(sheet, layout.reason, request.reason.to_uppercase());
}

fn fill_signatures(
    sheet: &mut Worksheet,
    aggregate: &EntranceRequestAggregate,
    layout: &FormatLayout,
    offset: u32,
) {
    let block = &layout.signatures;
    let signers = [
        ("solicitante", &aggregate.creator, block.creator_column),
        ("autorizador", &aggregate.authorizer, block.authorizer_column),
        ("seguridad", &aggregate.security, block.security_column),
    ];

    for (role, principal, column) in signers {
        let Some(principal) = principal else {
            warn!("⚠️ Solicitud {} sin {} asignado, firma en blanco", aggregate.id(), role);
            continue;
        };
        write_signer(sheet, block, column, offset, principal);
    }
}

fn write_signer(sheet: &mut Worksheet, block: &SignatureBlock, column: u32, offset: u32, principal: &Principal) {
    write_text(sheet, CellAnchor::at(block.name_row, column).shifted(offset), principal.name.clone());
    write_text(sheet, CellAnchor::at(block.unit_row, column).shifted(offset), principal.unit_name.clone());
    write_text(
        sheet,
        CellAnchor::at(block.position_row, column).shifted(offset),
        principal.position_name.clone(),
    );
    write_text(
        sheet,
        CellAnchor::at(block.phone_row, column).shifted(offset),
        principal.phone_number.clone(),
    );
}

/// Llena una sección que crece. Antes de escribir cada fila que no es la
/// última se inserta una fila en blanco debajo y se clona la actual sobre
/// ella, así la siguiente fila hereda el formato y lo que sigue baja.
fn fill_section<T>(
    sheet: &mut Worksheet,
    start_row: u32,
    items: &[T],
    mut write: impl FnMut(&mut Worksheet, u32, &T),
) -> SectionReport {
    let mut rows_inserted = 0;

    for (index, item) in items.iter().enumerate() {
        let row = start_row + index as u32;
        if index + 1 < items.len() {
            insert_blank_row(sheet, row + 1);
            clone_row(sheet, row, row + 1);
            rows_inserted += 1;
        }
        write(sheet, row, item);
    }

    SectionReport {
        start_row,
        rows_written: items.len() as u32,
        rows_inserted,
    }
}

fn write_guest(
    sheet: &mut Worksheet,
    row: u32,
    guest: &GuestDetail,
    columns: &GuestColumns,
    entry_time: &str,
    departure_time: &str,
) {
    write_text(sheet, CellAnchor::at(row, columns.name), guest.name.clone());
    write_text(sheet, CellAnchor::at(row, columns.health_insurer), guest.health_insurer.clone());
    write_text(sheet, CellAnchor::at(row, columns.risk_insurer), guest.risk_insurer.clone());
    write_text(sheet, CellAnchor::at(row, columns.document_id), guest.document_id.clone());
    write_text(sheet, CellAnchor::at(row, columns.employer), guest.employer.clone());
    write_text(sheet, CellAnchor::at(row, columns.entry_time), entry_time.to_string());
    write_text(sheet, CellAnchor::at(row, columns.departure_time), departure_time.to_string());
}

fn write_material(sheet: &mut Worksheet, row: u32, material: &Material, columns: &EquipmentColumns) {
    sheet
        .get_cell_mut((columns.quantity, row))
        .set_value_number(f64::from(material.quantity));
    write_text(
        sheet,
        CellAnchor::at(row, columns.serial),
        material.serial.clone().unwrap_or_default(),
    );
    write_text(sheet, CellAnchor::at(row, columns.model), material.model.clone());
    write_text(
        sheet,
        CellAnchor::at(row, columns.description),
        material.description.clone().unwrap_or_default(),
    );
}

fn write_text(sheet: &mut Worksheet, anchor: CellAnchor, value: String) {
    sheet.get_cell_mut((anchor.column, anchor.row)).set_value_string(value);
}

fn mark(selected: bool) -> String {
    if selected {
        MARK.to_string()
    } else {
        String::new()
    }
}
