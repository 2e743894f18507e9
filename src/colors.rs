use ansi_term::Style;

#[cfg(feature = "color")]
fn paint(color: u8) -> Style {
    ansi_term::Color::Fixed(color).bold()
}

#[cfg(not(feature = "color"))]
fn paint(_color: u8) -> Style {
    Style::new()
}

lazy_static! {
    pub static ref RED: Style = paint(9);
    pub static ref GREEN: Style = paint(10);
    pub static ref YELLOW: Style = paint(11);
    pub static ref BLUE: Style = paint(12);
    pub static ref CYAN: Style = paint(14);
    pub static ref WHITE: Style = paint(15);
}
