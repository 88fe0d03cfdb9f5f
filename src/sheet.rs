/// Sheet sizes understood by the report templates. Dimensions are landscape,
/// matching how wiring sheets are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetSize {
    #[default]
    A4,
    A3,
    A2,
    Letter,
    Legal,
    Tabloid,
}

impl SheetSize {
    pub fn from_name(name: &str) -> Option<SheetSize> {
        match name.trim().to_uppercase().as_str() {
            "A4" => Some(SheetSize::A4),
            "A3" => Some(SheetSize::A3),
            "A2" => Some(SheetSize::A2),
            "LETTER" => Some(SheetSize::Letter),
            "LEGAL" => Some(SheetSize::Legal),
            "TABLOID" => Some(SheetSize::Tabloid),
            _ => None,
        }
    }

    /// Physical landscape dimensions in millimeters, for engines that take
    /// explicit page geometry.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            SheetSize::A4 => (297.0, 210.0),
            SheetSize::A3 => (420.0, 297.0),
            SheetSize::A2 => (594.0, 420.0),
            SheetSize::Letter => (279.4, 215.9),
            SheetSize::Legal => (355.6, 215.9),
            SheetSize::Tabloid => (431.8, 279.4),
        }
    }

    /// Named preset as understood by `@page size` and by wkhtmltopdf.
    pub fn css_name(self) -> &'static str {
        match self {
            SheetSize::A4 => "A4",
            SheetSize::A3 => "A3",
            SheetSize::A2 => "A2",
            SheetSize::Letter => "Letter",
            SheetSize::Legal => "Legal",
            SheetSize::Tabloid => "Tabloid",
        }
    }
}
