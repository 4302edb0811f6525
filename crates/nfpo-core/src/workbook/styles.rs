//! Cell formats of PO sheets.

use edit_xlsx::{FormatAlignType, FormatBorderType, FormatColor};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern};

use super::RowShade;

const FONT: &str = "Arial";

const TITLE_FILL: u32 = 0xFFFF00;
const SECTION_FILL: u32 = 0xD3D3D3;
const HEADER_FILL: u32 = 0xBDD7EE;

/// Excel column letter of each data column.
pub(crate) const COLUMN_LETTERS: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Number format of each data column: integer, date, integer, text, currency.
const NUMBER_FORMATS: [&str; 5] = ["0", "dd/mm/yyyy", "0", "@", "\"R$\" #,##0.00"];

pub(crate) const COLUMN_WIDTHS: [f64; 5] = [20.0, 20.0, 20.0, 50.0, 20.0];
pub(crate) const TITLE_HEIGHT: f64 = 30.0;
pub(crate) const SECTION_HEIGHT: f64 = 30.0;
pub(crate) const HEADER_HEIGHT: f64 = 20.0;
pub(crate) const DATA_HEIGHT: f64 = 40.0;

const SHADES: [RowShade; 4] = [
    RowShade::Plain,
    RowShade::Banded,
    RowShade::Duplicated,
    RowShade::NewDuplicate,
];

/// Formats shared by every PO sheet of a workbook.
pub(crate) struct SheetStyles {
    pub title: Format,
    pub section: Format,
    pub header: Format,
    /// Indexed by shade, then column.
    data: Vec<[Format; 5]>,
}

impl SheetStyles {
    pub fn new() -> Self {
        let data = SHADES
            .iter()
            .map(|&shade| std::array::from_fn(|col| data_format(col, shade)))
            .collect();

        Self {
            title: filled(base().set_font_size(14).set_bold(), TITLE_FILL),
            section: filled(base().set_font_size(14).set_bold(), SECTION_FILL),
            header: filled(base().set_font_size(12).set_bold(), HEADER_FILL),
            data,
        }
    }

    pub fn data(&self, col: usize, shade: RowShade) -> &Format {
        let index = SHADES.iter().position(|&s| s == shade).unwrap_or(0);
        &self.data[index][col]
    }
}

fn base() -> Format {
    Format::new()
        .set_font_name(FONT)
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
}

fn filled(format: Format, rgb: u32) -> Format {
    format
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(rgb))
}

fn data_format(col: usize, shade: RowShade) -> Format {
    let format = base()
        .set_font_size(12)
        .set_text_wrap()
        .set_num_format(NUMBER_FORMATS[col]);
    match shade.fill() {
        Some(rgb) => filled(format, rgb),
        None => format,
    }
}

/// Formats for sheets edited in place.
///
/// edit_xlsx has no number formats or text wrap, so data cells carry font,
/// border, alignment and fill only.
pub(crate) struct EditStyles {
    pub title: edit_xlsx::Format,
    pub section: edit_xlsx::Format,
    pub header: edit_xlsx::Format,
    data: Vec<edit_xlsx::Format>,
}

impl EditStyles {
    pub fn new() -> Self {
        Self {
            title: edit_filled(edit_base().set_size(14).set_bold(), TITLE_FILL),
            section: edit_filled(edit_base().set_size(14).set_bold(), SECTION_FILL),
            header: edit_filled(edit_base().set_size(12).set_bold(), HEADER_FILL),
            data: SHADES
                .iter()
                .map(|&shade| {
                    let format = edit_base().set_size(12);
                    match shade.fill() {
                        Some(rgb) => edit_filled(format, rgb),
                        None => format,
                    }
                })
                .collect(),
        }
    }

    pub fn data(&self, shade: RowShade) -> &edit_xlsx::Format {
        let index = SHADES.iter().position(|&s| s == shade).unwrap_or(0);
        &self.data[index]
    }
}

fn edit_base() -> edit_xlsx::Format {
    edit_xlsx::Format::default()
        .set_font(FONT)
        .set_border(FormatBorderType::Thin)
        .set_align(FormatAlignType::Center)
        .set_align(FormatAlignType::VerticalCenter)
}

fn edit_filled(format: edit_xlsx::Format, rgb: u32) -> edit_xlsx::Format {
    let [_, r, g, b] = rgb.to_be_bytes();
    format.set_background_color(FormatColor::RGB(r, g, b))
}
