//! Human-readable rendering of views.
//!
//! Bare views render as `<42 == 0x2A == (0b101010)>`; a mask appends
//! `& 0b…` inside the parentheses. Mapped views add one aligned
//! `name = …` line per field and recurse into nested blocks.

use std::fmt;

use crate::view::BitView;

/// Renders views with a configurable indent step and nesting depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formatter {
    indent_step: usize,
    max_indent: usize,
}

impl Default for Formatter {
    fn default() -> Self {
        Formatter {
            indent_step: 2,
            max_indent: 20,
        }
    }
}

impl Formatter {
    /// Past `max_indent`, mapped views fall back to the bare form.
    pub fn new(indent_step: usize, max_indent: usize) -> Self {
        Formatter {
            indent_step,
            max_indent,
        }
    }

    pub fn format(&self, view: &BitView) -> String {
        self.element(view, 0, false)
    }

    fn element(&self, view: &BitView, indent: usize, no_indent_start: bool) -> String {
        let value = view.value();
        let mask = view
            .mask()
            .map(|mask| format!(" & 0b{mask:b}"))
            .unwrap_or_default();
        let hex_width = view.byte_len() as usize * 2;
        let bin_width = view.bit_width() as usize;
        let head = format!("<{value} == 0x{value:0hex_width$X} == (0b{value:0bin_width$b}{mask})");

        if let Some(mapping) = view.mapping()
            && indent < self.max_indent
        {
            let max_len = mapping.names().map(str::len).max().unwrap_or(0);
            let field_indent = indent + self.indent_step;
            let mut fields = String::new();

            for name in mapping.names() {
                let nested = match view.get(name) {
                    Ok(child) => self.element(&child, indent + 2 * self.indent_step, true),
                    Err(err) => format!("<unreadable: {err}>"),
                };
                fields.push_str(&format!("\n{:field_indent$}{name:max_len$} = {nested}", ""));
            }

            let newline = if no_indent_start { "\n" } else { "" };
            return format!("{newline}{:indent$}{head}{fields}\n{:indent$}>", "", "");
        }

        let indent = if no_indent_start { 0 } else { indent };
        format!("{:indent$}{head}>", "")
    }
}

impl fmt::Display for BitView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Formatter::default().format(self))
    }
}

/// `Name(x=0x2A, base=16)`; linked views as `<Name(x=0x01, base=16) at bit 3>`.
impl fmt::Debug for BitView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.byte_len() as usize * 2;
        let body = format!(
            "{}(x=0x{:0width$X}, base=16)",
            self.view_type().name(),
            self.value()
        );

        match self.offset() {
            Some(offset) => write!(f, "<{body} at bit {offset}>"),
            None => f.write_str(&body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field::RawMapping, view_type::ViewType};

    #[test]
    fn test_bare_form() {
        assert_eq!(BitView::new(255).to_string(), "<255 == 0xFF == (0b11111111)>");
        assert_eq!(BitView::new(0).to_string(), "<0 == 0x00 == (0b0)>");
    }

    #[test]
    fn test_masked_form() {
        let view = BitView::with_size(5, 4).unwrap();
        assert_eq!(view.to_string(), "<5 == 0x05 == (0b0101 & 0b1111)>");
    }

    #[test]
    fn test_nested_form() {
        let ty = ViewType::builder("NestedMapped")
            .size(8)
            .fields(
                RawMapping::new().bit("test_index", 0).nested(
                    "nested_block",
                    1,
                    6,
                    RawMapping::new().bit("single_bit", 0).range("multiple", 1, 3),
                ),
            )
            .build()
            .unwrap();
        let view = ty.view(0b11001101);

        assert_eq!(
            view.to_string(),
            "<205 == 0xCD == (0b11001101 & 0b11111111)\n\
             \x20 test_index   = <1 == 0x01 == (0b1 & 0b1)>\n\
             \x20 nested_block = \n\
             \x20   <6 == 0x06 == (0b00110 & 0b11111)\n\
             \x20     single_bit = <0 == 0x00 == (0b0 & 0b1)>\n\
             \x20     multiple   = <3 == 0x03 == (0b11 & 0b11)>\n\
             \x20   >\n\
             >"
        );
    }

    #[test]
    fn test_max_indent_falls_back_to_bare() {
        let ty = ViewType::builder("Shallow")
            .size(4)
            .fields(RawMapping::new().nested("inner", 0, 4, RawMapping::new().bit("a", 0)))
            .build()
            .unwrap();
        let formatter = Formatter::new(2, 4);
        assert_eq!(
            formatter.format(&ty.view(1)),
            "<1 == 0x01 == (0b0001 & 0b1111)\n  inner = <1 == 0x01 == (0b0001 & 0b1111)>\n>"
        );
    }

    #[test]
    fn test_unsized_open_field_is_rendered() {
        let ty = ViewType::builder("Frame")
            .fields(RawMapping::new().range("kind", 0, 4).open("payload", 4))
            .build()
            .unwrap();
        assert_eq!(
            ty.view(3).to_string(),
            "<3 == 0x03 == (0b11)\n\
             \x20 kind    = <3 == 0x03 == (0b0011 & 0b1111)>\n\
             \x20 payload = <0 == 0x00 == (0b0 & 0b1)>\n\
             >"
        );
    }

    #[test]
    fn test_debug() {
        let view = BitView::new(42);
        assert_eq!(format!("{view:?}"), "BitView(x=0x2A, base=16)");

        let child = view.get(3).unwrap();
        assert_eq!(format!("{child:?}"), "<BitView_index_3(x=0x01, base=16) at bit 3>");
    }
}
